//! The token-level engine instantiation.
//!
//! A `Parser` owns a `Lexer` and a grammar over the tokens it produces.
//! Lexer and parser rules share one namespace: every lexer rule name is
//! also registered as a parser rule matching one token of that kind, so a
//! grammar can reference `int` or `id` directly without declaring a
//! terminal wrapper for it. A parser rule shadowing a lexer rule name is a
//! configuration error rather than a silent override.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{Processor, Rule, Terminal};
use crate::error::{ParseError, SourceContext, VyakaError};
use crate::lexer::{Lexer, Token};
use crate::stream::Stream;
use crate::tree::ParseTree;

/// A terminal matching one token by the lexer rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRule {
    pub rule_name: String,
}

impl TokenRule {
    pub fn new(rule_name: impl Into<String>) -> Self {
        Self { rule_name: rule_name.into() }
    }
}

impl Terminal for TokenRule {
    type Item = Token;

    fn matches(&self, head: &Token) -> bool {
        head.rule_name == self.rule_name
    }
}

impl fmt::Display for TokenRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rule_name)
    }
}

/// A rule over tokens.
pub type GrammarRule = Rule<TokenRule>;

/// A lexer plus a grammar over its tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Parser {
    proc: Processor<TokenRule>,
    lexer: Lexer,
}

impl Parser {
    /// Build a parser over `lexer` with the given named rules and root.
    ///
    /// Fails on duplicate rule names and on parser rules that shadow a
    /// lexer rule name.
    pub fn new(
        root: impl Into<String>,
        rules: impl IntoIterator<Item = (String, GrammarRule)>,
        lexer: Lexer,
    ) -> Result<Self, VyakaError> {
        let mut map: HashMap<String, GrammarRule> = lexer
            .rule_names()
            .iter()
            .map(|name| (name.clone(), Rule::Term(TokenRule::new(name.clone()))))
            .collect();
        for (name, rule) in rules {
            if lexer.rule_names().contains(&name) {
                return Err(VyakaError::config(format!(
                    "parser rule {name} shadows a lexer rule of the same name"
                )));
            }
            if map.insert(name.clone(), rule).is_some() {
                return Err(VyakaError::config(format!(
                    "duplicate parser rule name {name}"
                )));
            }
        }
        Ok(Self { proc: Processor::new(root, map), lexer })
    }

    pub fn root(&self) -> &str {
        self.proc.root()
    }

    pub fn rules(&self) -> &HashMap<String, GrammarRule> {
        self.proc.rules()
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    /// Lex and parse `text` in one call.
    ///
    /// Lex failures surface under a `lex error` context node so callers
    /// can tell the two phases apart in the cause tree.
    pub fn apply(&self, text: &str) -> Result<ParseTree<Token>, VyakaError> {
        let source = SourceContext::from_text("<input>", text);
        let tokens = self.lexer.lex(text).map_err(|trace| {
            VyakaError::syntax("lex", &source, ParseError::context("lex error", trace))
        })?;
        self.proc
            .parse(tokens)
            .map_err(|trace| VyakaError::syntax("parse", &source, trace))
    }

    /// Parse already-lexed tokens, keeping the raw cause tree on failure.
    pub fn parse_tokens(&self, tokens: Stream<Token>) -> Result<ParseTree<Token>, ParseError> {
        self.proc.parse(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::literal;

    fn ab_lexer() -> Lexer {
        Lexer::new(vec![
            ("a".to_string(), literal('a')),
            ("b".to_string(), literal('b')),
        ])
        .unwrap()
    }

    #[test]
    fn lexer_rules_are_registered_as_terminals() {
        let parser = Parser::new(
            "pair",
            vec![(
                "pair".to_string(),
                Rule::And(vec![Rule::Ref("a".to_string()), Rule::Ref("b".to_string())]),
            )],
            ab_lexer(),
        )
        .unwrap();
        let tree = parser.apply("ab").unwrap();
        assert_eq!(tree.rule_name.as_deref(), Some("pair"));
        assert_eq!(
            tree.all_values().iter().map(|t| t.value.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn shadowing_a_lexer_rule_is_rejected() {
        let err = Parser::new(
            "a",
            vec![("a".to_string(), Rule::Ref("b".to_string()))],
            ab_lexer(),
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn duplicate_parser_rules_are_rejected() {
        let err = Parser::new(
            "x",
            vec![
                ("x".to_string(), Rule::Ref("a".to_string())),
                ("x".to_string(), Rule::Ref("b".to_string())),
            ],
            ab_lexer(),
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn lex_failures_are_wrapped() {
        let parser = Parser::new(
            "a",
            std::iter::empty::<(String, GrammarRule)>(),
            ab_lexer(),
        )
        .unwrap();
        let err = parser.apply("z").unwrap_err();
        let trace = err.trace().unwrap();
        assert_eq!(trace.message.as_deref(), Some("lex error"));
    }
}
