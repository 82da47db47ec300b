//! Error handling for the engine and its public surface.
//!
//! Failures inside the engine are trees: every combinator that unwinds a
//! failure wraps the inner cause in a context node carrying its rule name,
//! the rule's rendering, and the input position, so the final error mirrors
//! the shape of the attempted parse. The public surface wraps that tree in
//! a `VyakaError`, which carries the offending source text and renders a
//! labeled span through miette.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use thiserror::Error;

use crate::position::Position;

// ============================================================================
// SOURCE CONTEXT
// ============================================================================

/// The input text an error points into, named for diagnostic rendering.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    pub fn from_text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self { name: name.into(), content: content.into() }
    }

    pub fn to_named_source(&self) -> NamedSource<String> {
        NamedSource::new(self.name.clone(), self.content.clone())
    }
}

// ============================================================================
// CAUSE TREE
// ============================================================================

/// One node in a failure cause tree.
///
/// All fields are optional: a node with nothing but children is a pure
/// grouping node and is skipped during rendering. `rule` holds the
/// regex-like rendering of the combinator that failed; `position` is where
/// in the input the failure was observed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseError {
    pub message: Option<String>,
    pub rule_name: Option<String>,
    pub rule: Option<String>,
    pub position: Option<Position>,
    pub causes: Vec<ParseError>,
}

impl ParseError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self { message: Some(msg.into()), ..Self::default() }
    }

    pub fn at(msg: impl Into<String>, position: Option<Position>) -> Self {
        Self { message: Some(msg.into()), position, ..Self::default() }
    }

    /// A failure of a specific rule, with the causes that led to it.
    pub fn for_rule(rule: String, position: Option<Position>, causes: Vec<ParseError>) -> Self {
        Self { rule: Some(rule), position, causes, ..Self::default() }
    }

    /// A context node: `msg` above an existing cause.
    pub fn context(msg: impl Into<String>, cause: ParseError) -> Self {
        Self { message: Some(msg.into()), causes: vec![cause], ..Self::default() }
    }

    /// Re-tag this error with the rule name it is unwinding through.
    pub fn with_rule_name(mut self, rule_name: &str) -> Self {
        self.rule_name = Some(rule_name.to_string());
        self
    }

    /// Nest this error as the sole cause of a fresh node, so a caller can
    /// annotate the wrapper without disturbing the original.
    pub fn wrap(self) -> Self {
        Self { causes: vec![self], ..Self::default() }
    }

    /// A node with no local information, only children.
    pub fn is_empty(&self) -> bool {
        self.message.is_none()
            && self.rule_name.is_none()
            && self.rule.is_none()
            && self.position.is_none()
    }

    /// The furthest input position mentioned anywhere in this tree.
    ///
    /// Backtracking means the tree records many abandoned attempts; the
    /// deepest one is almost always the diagnosis the user wants.
    pub fn deepest_position(&self) -> Option<Position> {
        self.causes
            .iter()
            .filter_map(ParseError::deepest_position)
            .chain(self.position)
            .max()
    }

    /// A one-line summary of the most relevant failure, for span labels.
    pub fn summary(&self) -> String {
        let target = self.deepest_position();
        match self.find_at(target) {
            Some(node) => node.render_line(),
            None => "no match".to_string(),
        }
    }

    fn find_at(&self, target: Option<Position>) -> Option<&ParseError> {
        for cause in &self.causes {
            if let Some(found) = cause.find_at(target) {
                return Some(found);
            }
        }
        if self.position == target && !self.is_empty() {
            return Some(self);
        }
        None
    }

    fn render_line(&self) -> String {
        let mut line = String::new();
        if let Some(rule_name) = &self.rule_name {
            line.push_str(rule_name);
        }
        if let Some(message) = &self.message {
            line.push_str(&format!("({message})"));
        }
        if let Some(position) = &self.position {
            line.push_str(&format!(" at {position}"));
        }
        if let Some(rule) = &self.rule {
            line.push_str(&format!(" for {rule}"));
        }
        line.trim_start().to_string()
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        if self.is_empty() {
            for cause in &self.causes {
                cause.render(f, indent)?;
            }
        } else {
            writeln!(f, "{}{}", "  ".repeat(indent), self.render_line())?;
            for cause in &self.causes {
                cause.render(f, indent + 1)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        self.render(f, 0)
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// PUBLIC ERROR SURFACE
// ============================================================================

/// The error type surfaced by `Lexer::apply`, `Parser::apply`, and the
/// loader.
#[derive(Debug, Error)]
pub enum VyakaError {
    /// Input text failed to lex or parse; the full cause tree is kept for
    /// callers that want more than the rendered diagnostic.
    #[error("{phase} error: {summary}")]
    Syntax {
        phase: &'static str,
        summary: String,
        src: Arc<NamedSource<String>>,
        span: SourceSpan,
        trace: ParseError,
    },

    /// A lexer, parser, or grammar was misconfigured; no input position
    /// applies.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl VyakaError {
    pub(crate) fn syntax(phase: &'static str, source: &SourceContext, trace: ParseError) -> Self {
        let position = trace.deepest_position().unwrap_or_default();
        let offset = position.offset_in(&source.content);
        let end = source.content[offset..]
            .chars()
            .next()
            .map_or(offset, |ch| offset + ch.len_utf8());
        Self::Syntax {
            phase,
            summary: trace.summary(),
            src: Arc::new(source.to_named_source()),
            span: (offset..end).into(),
            trace,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// The underlying cause tree, when this is a syntax error.
    pub fn trace(&self) -> Option<&ParseError> {
        match self {
            Self::Syntax { trace, .. } => Some(trace),
            Self::Config { .. } => None,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

impl Diagnostic for VyakaError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        match self {
            Self::Syntax { phase, .. } => Some(Box::new(format!("vyaka::{phase}"))),
            Self::Config { .. } => Some(Box::new("vyaka::config")),
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            Self::Syntax { summary, span, .. } => Some(Box::new(std::iter::once(
                LabeledSpan::new_with_span(Some(summary.clone()), *span),
            ))),
            Self::Config { .. } => None,
        }
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        match self {
            Self::Syntax { src, .. } => Some(&**src),
            Self::Config { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_nodes_are_skipped_in_rendering() {
        let inner = ParseError::at("failed a", Some(Position::new(0, 3)));
        let wrapped = inner.wrap().with_rule_name("token");
        let rendered = wrapped.to_string();
        assert!(rendered.contains("token"));
        assert!(rendered.contains("failed a"));
        assert!(rendered.contains("0:3"));
    }

    #[test]
    fn deepest_position_wins() {
        let shallow = ParseError::at("shallow", Some(Position::new(0, 1)));
        let deep = ParseError::at("deep", Some(Position::new(2, 0)));
        let tree = ParseError::for_rule("(a | b)".to_string(), None, vec![shallow, deep]);
        assert_eq!(tree.deepest_position(), Some(Position::new(2, 0)));
        assert!(tree.summary().contains("deep"));
    }

    #[test]
    fn config_errors_have_no_trace() {
        let err = VyakaError::config("duplicate rule name a");
        assert!(err.is_config());
        assert!(err.trace().is_none());
        assert!(err.to_string().contains("duplicate rule name a"));
    }
}
