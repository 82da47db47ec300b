//! The character-level engine instantiation: text in, tokens out.
//!
//! A `Lexer` is built from an ordered list of named rules over characters.
//! Construction synthesizes a two-rule wrapper grammar around them: the
//! root repeats a token rule until the input is exhausted, and the token
//! rule is an ordered choice over the user rules, so earlier declarations
//! win ties. Each match becomes one `Token` tagged with the rule that
//! produced it; rules whose names start with `_` match and consume input
//! but emit nothing.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{Processor, Rule, Terminal};
use crate::error::{ParseError, SourceContext, VyakaError};
use crate::position::{Located, Position};
use crate::stream::Stream;
use crate::tree::ParseTree;

/// Rules named with this prefix lex normally but produce no tokens.
pub const EXCLUDE_PREFIX: &str = "_";

const INTERNAL_PREFIX: &str = "_lexer_";
const ROOT_RULE: &str = "_lexer_root";
const TOKEN_RULE: &str = "_lexer_token";

// ============================================================================
// ITEMS
// ============================================================================

/// One input character with its document position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Char {
    pub value: char,
    pub position: Position,
}

impl Char {
    pub fn new(value: char, position: Position) -> Self {
        Self { value, position }
    }

    /// Annotate every character of `text` with its position.
    pub fn stream(text: &str) -> Stream<Char> {
        let mut position = Position::start();
        text.chars()
            .map(|value| {
                let ch = Char::new(value, position);
                position = position.advance(value);
                ch
            })
            .collect()
    }
}

impl Located for Char {
    fn position(&self) -> Position {
        self.position
    }
}

impl fmt::Display for Char {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.value, self.position)
    }
}

/// One lexed token: the rule that matched it, the text it covers, and the
/// position of its first character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub rule_name: String,
    pub value: String,
    pub position: Position,
}

impl Token {
    pub fn new(
        rule_name: impl Into<String>,
        value: impl Into<String>,
        position: Position,
    ) -> Self {
        Self { rule_name: rule_name.into(), value: value.into(), position }
    }
}

impl Located for Token {
    fn position(&self) -> Position {
        self.position
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})@{}", self.rule_name, self.value, self.position)
    }
}

// ============================================================================
// CHARACTER TERMINALS
// ============================================================================

/// The terminal matchers available at the character level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharRule {
    /// Exactly one specific character.
    Literal(char),
    /// Any character in the set.
    Class(BTreeSet<char>),
    /// Any character in `min..=max`, inclusive at both ends.
    Range(char, char),
}

impl Terminal for CharRule {
    type Item = Char;

    fn matches(&self, head: &Char) -> bool {
        match self {
            CharRule::Literal(ch) => head.value == *ch,
            CharRule::Class(chars) => chars.contains(&head.value),
            CharRule::Range(min, max) => (*min..=*max).contains(&head.value),
        }
    }
}

impl fmt::Display for CharRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharRule::Literal(ch) => write!(f, "{ch}"),
            CharRule::Class(chars) if *chars == whitespace_chars() => write!(f, "\\w"),
            CharRule::Class(chars) => {
                write!(f, "[")?;
                for ch in chars {
                    write!(f, "{ch}")?;
                }
                write!(f, "]")
            }
            CharRule::Range(min, max) => write!(f, "[{min}-{max}]"),
        }
    }
}

/// A rule over characters.
pub type LexRule = Rule<CharRule>;

fn whitespace_chars() -> BTreeSet<char> {
    " \t\n\r\x0b\x0c".chars().collect()
}

/// Match one specific character.
pub fn literal(ch: char) -> LexRule {
    Rule::Term(CharRule::Literal(ch))
}

/// Match any one of the given characters.
pub fn class(chars: &str) -> LexRule {
    Rule::Term(CharRule::Class(chars.chars().collect()))
}

/// Match any one whitespace character.
pub fn whitespace() -> LexRule {
    Rule::Term(CharRule::Class(whitespace_chars()))
}

/// Match any character between `min` and `max`, inclusive.
pub fn range(min: char, max: char) -> Result<LexRule, VyakaError> {
    if min >= max {
        return Err(VyakaError::config(format!(
            "invalid range [{min}-{max}]: min must be less than max"
        )));
    }
    Ok(Rule::Term(CharRule::Range(min, max)))
}

/// Match any one character.
pub fn any() -> LexRule {
    Rule::Any
}

/// Match any one character the given rule would reject.
pub fn not(rule: LexRule) -> LexRule {
    Rule::Not(Box::new(rule))
}

// ============================================================================
// LEXER
// ============================================================================

/// A tokenizer assembled from named character rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexer {
    names: Vec<String>,
    proc: Processor<CharRule>,
}

impl Lexer {
    /// Build a lexer from named rules, in priority order.
    ///
    /// Fails on duplicate names and on names colliding with the internal
    /// wrapper rules.
    pub fn new(rules: Vec<(String, LexRule)>) -> Result<Self, VyakaError> {
        let mut names = Vec::with_capacity(rules.len());
        let mut seen = HashSet::new();
        let mut map = HashMap::new();
        for (name, rule) in rules {
            if name.starts_with(INTERNAL_PREFIX) {
                return Err(VyakaError::config(format!(
                    "lexer rule name {name} uses the reserved prefix {INTERNAL_PREFIX}"
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(VyakaError::config(format!(
                    "duplicate lexer rule name {name}"
                )));
            }
            map.insert(name.clone(), rule);
            names.push(name);
        }
        map.insert(
            TOKEN_RULE.to_string(),
            Rule::Or(names.iter().map(|name| Rule::Ref(name.clone())).collect()),
        );
        map.insert(
            ROOT_RULE.to_string(),
            Rule::UntilEmpty(Box::new(Rule::Ref(TOKEN_RULE.to_string()))),
        );
        Ok(Self { names, proc: Processor::new(ROOT_RULE, map) })
    }

    /// The user rule names, in priority order.
    pub fn rule_names(&self) -> &[String] {
        &self.names
    }

    /// The user rules, in priority order.
    pub fn user_rules(&self) -> Vec<(&str, &LexRule)> {
        self.names
            .iter()
            .filter_map(|name| self.proc.rule(name).map(|rule| (name.as_str(), rule)))
            .collect()
    }

    /// Tokenize `text`, keeping the raw cause tree on failure.
    pub(crate) fn lex(&self, text: &str) -> Result<Stream<Token>, ParseError> {
        let tree = self.proc.parse(Char::stream(text))?;
        self.collect_tokens(&tree)
    }

    /// Tokenize `text`, rendering failures as labeled diagnostics.
    pub fn apply(&self, text: &str) -> Result<Stream<Token>, VyakaError> {
        self.lex(text).map_err(|trace| {
            VyakaError::syntax("lex", &SourceContext::from_text("<input>", text), trace)
        })
    }

    /// Walk the lex tree: each token-rule match becomes one token named by
    /// the user rule that matched, valued with its characters in order.
    fn collect_tokens(&self, tree: &ParseTree<Char>) -> Result<Stream<Token>, ParseError> {
        let mut tokens = Vec::new();
        for group in &tree.named(TOKEN_RULE) {
            let matched = group.skip().select_one(ParseTree::has_rule_name)?;
            let name = matched
                .rule_name
                .clone()
                .ok_or_else(|| ParseError::message("token match lost its rule name"))?;
            if name.starts_with(EXCLUDE_PREFIX) {
                continue;
            }
            let chars = matched.all_values();
            let position = chars
                .first()
                .map(|ch| ch.position)
                .ok_or_else(|| ParseError::message(format!("rule {name} matched no characters")))?;
            let value: String = chars.iter().map(|ch| ch.value).collect();
            tokens.push(Token::new(name, value, position));
        }
        Ok(tokens.into_iter().collect())
    }
}

impl fmt::Display for Lexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, rule) in self.user_rules() {
            writeln!(f, "{name} = \"{rule}\";")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_stream_tracks_positions() {
        let stream = Char::stream("a\nb");
        let chars: Vec<_> = stream.iter().copied().collect();
        assert_eq!(chars[0], Char::new('a', Position::new(0, 0)));
        assert_eq!(chars[1], Char::new('\n', Position::new(0, 1)));
        assert_eq!(chars[2], Char::new('b', Position::new(1, 0)));
    }

    #[test]
    fn reserved_prefix_is_rejected() {
        let err = Lexer::new(vec![("_lexer_x".to_string(), literal('x'))]).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = Lexer::new(vec![
            ("a".to_string(), literal('a')),
            ("a".to_string(), literal('b')),
        ])
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!(range('z', 'a').unwrap_err().is_config());
        assert!(range('a', 'a').unwrap_err().is_config());
        assert!(range('a', 'z').is_ok());
    }
}
