//! Immutable head/tail views over input sequences.
//!
//! A `Stream` is the engine's notion of "remaining input". Rules never
//! mutate a stream; consuming an item means returning the stream's tail,
//! which shares structure with the original thanks to `im::Vector`.

use std::fmt;

use im::Vector;
use serde::{Deserialize, Serialize};

/// An immutable ordered view over input items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream<T: Clone> {
    items: Vector<T>,
}

impl<T: Clone> Stream<T> {
    pub fn new() -> Self {
        Self { items: Vector::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// The first item, if any.
    pub fn head(&self) -> Option<&T> {
        self.items.front()
    }

    /// Everything after the first item; `None` on an empty stream.
    pub fn tail(&self) -> Option<Self> {
        self.split().map(|(_, rest)| rest)
    }

    /// Head and tail together, the shape most rules consume.
    pub fn split(&self) -> Option<(&T, Self)> {
        let head = self.items.front()?;
        let mut rest = self.items.clone();
        rest.pop_front();
        Some((head, Self { items: rest }))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Clone> Default for Stream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FromIterator<T> for Stream<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self { items: iter.into_iter().collect() }
    }
}

impl<T: Clone> From<Vec<T>> for Stream<T> {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<'a, T: Clone> IntoIterator for &'a Stream<T> {
    type Item = &'a T;
    type IntoIter = im::vector::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Clone + fmt::Display> fmt::Display for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_and_tail() {
        let stream: Stream<u8> = vec![1, 2, 3].into();
        assert_eq!(stream.head(), Some(&1));
        let tail = stream.tail().unwrap();
        assert_eq!(tail.head(), Some(&2));
        assert_eq!(tail.len(), 2);
        // the original view is untouched
        assert_eq!(stream.len(), 3);
    }

    #[test]
    fn empty_stream_has_no_head() {
        let stream: Stream<u8> = Stream::new();
        assert!(stream.is_empty());
        assert_eq!(stream.head(), None);
        assert!(stream.tail().is_none());
        assert!(stream.split().is_none());
    }

    #[test]
    fn split_returns_both_parts() {
        let stream: Stream<char> = "ab".chars().collect();
        let (head, rest) = stream.split().unwrap();
        assert_eq!(*head, 'a');
        assert_eq!(rest.head(), Some(&'b'));
    }
}
