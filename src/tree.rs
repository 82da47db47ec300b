//! The tree-shaped output of every rule application.
//!
//! A `ParseTree` node carries an optional leaf value, an optional rule-name
//! tag, and an ordered list of children. Rules build unnamed structural
//! wrappers freely; `simplify` collapses them after every named-rule
//! application so nesting depth tracks the grammar, not the combinator
//! plumbing. The `select` family is how downstream code queries a tree
//! without caring about intermediate structure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A nameable, nestable parse result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseTree<V> {
    pub value: Option<V>,
    pub rule_name: Option<String>,
    pub children: Vec<ParseTree<V>>,
}

impl<V> Default for ParseTree<V> {
    fn default() -> Self {
        Self { value: None, rule_name: None, children: Vec::new() }
    }
}

impl<V> ParseTree<V> {
    /// A node with no value, name, or children.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn leaf(value: V) -> Self {
        Self { value: Some(value), ..Self::default() }
    }

    pub fn node(children: Vec<ParseTree<V>>) -> Self {
        Self { children, ..Self::default() }
    }

    pub fn tagged(rule_name: impl Into<String>, children: Vec<ParseTree<V>>) -> Self {
        Self { rule_name: Some(rule_name.into()), children, ..Self::default() }
    }

    /// Replace this node's rule-name tag.
    pub fn with_rule_name(mut self, rule_name: impl Into<String>) -> Self {
        self.rule_name = Some(rule_name.into());
        self
    }

    /// Nest this tree as the sole child of a fresh untagged node, so the
    /// caller can annotate the wrapper without touching the original.
    pub fn wrap(self) -> Self {
        Self::node(vec![self])
    }

    /// Drop this node's own value and tag, keeping only its children.
    pub fn skip(&self) -> Self
    where
        V: Clone,
    {
        Self::node(self.children.clone())
    }

    /// A node carrying no information at any depth.
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.rule_name.is_none()
            && self.children.iter().all(ParseTree::is_empty)
    }

    /// Collapse an untagged, unvalued single-child wrapper into its child;
    /// otherwise simplify children and drop empty ones.
    pub fn simplify(mut self) -> Self {
        if self.value.is_none() && self.rule_name.is_none() && self.children.len() == 1 {
            return self.children.remove(0);
        }
        Self {
            value: self.value,
            rule_name: self.rule_name,
            children: self
                .children
                .into_iter()
                .filter(|child| !child.is_empty())
                .map(ParseTree::simplify)
                .collect(),
        }
    }

    /// Merge the children of several trees into one untagged node.
    pub fn merge_children(parts: impl IntoIterator<Item = ParseTree<V>>) -> Self {
        Self::node(parts.into_iter().flat_map(|part| part.children).collect())
    }

    /// Collect every node matching `pred`, each wrapped as a child of a
    /// fresh untagged root. Matching stops descending at a match, so outer
    /// nodes shadow anything nested inside them.
    pub fn select<F>(&self, pred: F) -> Self
    where
        V: Clone,
        F: Fn(&Self) -> bool + Copy,
    {
        if pred(self) {
            return self.clone().wrap();
        }
        Self::merge_children(self.children.iter().map(|child| child.select(pred)))
    }

    /// Like `select`, but fails unless exactly `n` nodes match.
    pub fn select_n<F>(&self, pred: F, n: usize) -> Result<Self, ParseError>
    where
        V: Clone,
        F: Fn(&Self) -> bool + Copy,
    {
        let found = self.select(pred);
        if found.children.len() != n {
            return Err(ParseError::message(format!(
                "expected {n} results, got {}",
                found.children.len()
            )));
        }
        Ok(found)
    }

    /// The single node matching `pred`, unwrapped.
    pub fn select_one<F>(&self, pred: F) -> Result<Self, ParseError>
    where
        V: Clone,
        F: Fn(&Self) -> bool + Copy,
    {
        let mut found = self.select_n(pred, 1)?;
        Ok(found.children.remove(0))
    }

    /// All nodes tagged `name`, under a fresh root.
    pub fn named(&self, name: &str) -> Self
    where
        V: Clone,
    {
        self.select(move |tree| tree.rule_name.as_deref() == Some(name))
    }

    pub fn named_one(&self, name: &str) -> Result<Self, ParseError>
    where
        V: Clone,
    {
        self.select_one(move |tree| tree.rule_name.as_deref() == Some(name))
    }

    pub fn named_n(&self, name: &str, n: usize) -> Result<Self, ParseError>
    where
        V: Clone,
    {
        self.select_n(move |tree| tree.rule_name.as_deref() == Some(name), n)
    }

    /// Predicate for `select`: the node carries a leaf value.
    pub fn has_value(tree: &Self) -> bool {
        tree.value.is_some()
    }

    /// Predicate for `select`: the node carries a rule-name tag.
    pub fn has_rule_name(tree: &Self) -> bool {
        tree.rule_name.is_some()
    }

    /// Every leaf value in this tree, depth-first.
    pub fn all_values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.select(Self::has_value)
            .children
            .into_iter()
            .filter_map(|child| child.value)
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParseTree<V>> {
        self.children.iter()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }
}

impl<'a, V> IntoIterator for &'a ParseTree<V> {
    type Item = &'a ParseTree<V>;
    type IntoIter = std::slice::Iter<'a, ParseTree<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}

impl<V: fmt::Display> ParseTree<V> {
    fn render(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        write!(f, "{}", "  ".repeat(indent))?;
        if let Some(rule_name) = &self.rule_name {
            write!(f, "{rule_name}")?;
        }
        if let Some(value) = &self.value {
            write!(f, "({value})")?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.render(f, indent + 1)?;
        }
        Ok(())
    }
}

impl<V: fmt::Display> fmt::Display for ParseTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        self.render(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leafy(value: char) -> ParseTree<char> {
        ParseTree::leaf(value)
    }

    #[test]
    fn simplify_collapses_single_child_wrappers() {
        let tree = leafy('a').wrap().wrap().wrap();
        assert_eq!(tree.simplify(), leafy('a').wrap().wrap());
        // tagged wrappers survive
        let tagged = leafy('a').wrap().with_rule_name("x").wrap();
        assert_eq!(
            tagged.simplify(),
            ParseTree::tagged("x", vec![leafy('a')])
        );
    }

    #[test]
    fn simplify_drops_empty_children() {
        let tree = ParseTree::tagged("x", vec![ParseTree::empty(), leafy('a'), ParseTree::empty()]);
        assert_eq!(tree.simplify(), ParseTree::tagged("x", vec![leafy('a')]));
    }

    #[test]
    fn select_stops_at_outermost_match() {
        let inner = ParseTree::tagged("hit", vec![leafy('b')]);
        let outer = ParseTree::tagged("hit", vec![inner.clone()]);
        let root = ParseTree::node(vec![outer.clone()]);
        let found = root.named("hit");
        assert_eq!(found.children, vec![outer]);
    }

    #[test]
    fn select_n_enforces_cardinality() {
        let root: ParseTree<char> = ParseTree::node(vec![
            ParseTree::tagged("x", vec![]),
            ParseTree::tagged("x", vec![]),
        ]);
        assert!(root.named_n("x", 2).is_ok());
        let err = root.named_one("x").unwrap_err();
        assert!(err.message.unwrap().contains("expected 1 results, got 2"));
    }

    #[test]
    fn all_values_are_depth_first() {
        let tree = ParseTree::node(vec![
            ParseTree::tagged("l", vec![leafy('a'), leafy('b')]),
            leafy('c'),
        ]);
        assert_eq!(tree.all_values(), vec!['a', 'b', 'c']);
    }

    #[test]
    fn trees_serialize_to_json() {
        let tree = ParseTree::tagged("pair", vec![leafy('a'), leafy('b')]);
        let json = serde_json::to_string(&tree).unwrap();
        let back: ParseTree<char> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
