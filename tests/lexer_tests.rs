//! End-to-end tokenization against a fixture covering every lex rule kind.

use vyaka::lexer::{any, class, literal, not, range};
use vyaka::{Lexer, Position, Rule, Token};

fn fixture() -> Lexer {
    Lexer::new(vec![
        ("a".to_string(), literal('a')),
        ("b".to_string(), Rule::And(vec![literal('b'), literal('b')])),
        ("c".to_string(), Rule::Or(vec![literal('c'), literal('C')])),
        (
            "d".to_string(),
            Rule::And(vec![literal('d'), Rule::ZeroOrMore(Box::new(literal('D')))]),
        ),
        (
            "e".to_string(),
            Rule::And(vec![literal('e'), Rule::ZeroOrOne(Box::new(literal('E')))]),
        ),
        ("f".to_string(), Rule::OneOrMore(Box::new(literal('f')))),
        ("_g".to_string(), literal('g')),
        (
            "int".to_string(),
            Rule::OneOrMore(Box::new(class("0123456789"))),
        ),
        (
            "h".to_string(),
            Rule::And(vec![literal('h'), not(literal('h'))]),
        ),
        ("i".to_string(), Rule::And(vec![literal('i'), any()])),
        (
            "j".to_string(),
            Rule::OneOrMore(Box::new(range('j', 'l').unwrap())),
        ),
    ])
    .unwrap()
}

fn tokens(input: &str) -> Vec<Token> {
    fixture().apply(input).unwrap().iter().cloned().collect()
}

fn token(rule_name: &str, value: &str, line: usize, column: usize) -> Token {
    Token::new(rule_name, value, Position::new(line, column))
}

#[test]
fn single_rules() {
    assert_eq!(tokens("a"), vec![token("a", "a", 0, 0)]);
    assert_eq!(tokens("bb"), vec![token("b", "bb", 0, 0)]);
    assert_eq!(tokens("d"), vec![token("d", "d", 0, 0)]);
    assert_eq!(tokens("dDDD"), vec![token("d", "dDDD", 0, 0)]);
    assert_eq!(tokens("e"), vec![token("e", "e", 0, 0)]);
    assert_eq!(tokens("eE"), vec![token("e", "eE", 0, 0)]);
    assert_eq!(tokens("f"), vec![token("f", "f", 0, 0)]);
    assert_eq!(tokens("fff"), vec![token("f", "fff", 0, 0)]);
    assert_eq!(tokens("123"), vec![token("int", "123", 0, 0)]);
    assert_eq!(tokens("jkl"), vec![token("j", "jkl", 0, 0)]);
}

#[test]
fn alternation_produces_one_token_per_match() {
    assert_eq!(
        tokens("cC"),
        vec![token("c", "c", 0, 0), token("c", "C", 0, 1)]
    );
}

#[test]
fn tokens_carry_running_positions() {
    assert_eq!(
        tokens("abba"),
        vec![
            token("a", "a", 0, 0),
            token("b", "bb", 0, 1),
            token("a", "a", 0, 3),
        ]
    );
}

#[test]
fn underscore_rules_consume_but_emit_nothing() {
    assert_eq!(
        tokens("aga"),
        vec![token("a", "a", 0, 0), token("a", "a", 0, 2)]
    );
}

#[test]
fn negation_and_wildcard_consume_the_following_char() {
    assert_eq!(tokens("hz"), vec![token("h", "hz", 0, 0)]);
    assert_eq!(tokens("iz"), vec![token("i", "iz", 0, 0)]);
}

#[test]
fn unmatchable_input_fails() {
    let lexer = fixture();
    // no rule starts with 'z'
    assert!(lexer.apply("z").is_err());
    // 'h' must not be followed by another 'h'
    assert!(lexer.apply("hh").is_err());
    // 'i' requires one more char after it
    assert!(lexer.apply("i").is_err());
}

#[test]
fn empty_input_yields_no_tokens() {
    assert_eq!(tokens(""), Vec::new());
}

#[test]
fn declaration_order_is_disambiguation_order() {
    // both rules match "x"; the first declared one names the token
    let lexer = Lexer::new(vec![
        ("first".to_string(), literal('x')),
        ("second".to_string(), literal('x')),
    ])
    .unwrap();
    let tokens: Vec<Token> = lexer.apply("x").unwrap().iter().cloned().collect();
    assert_eq!(tokens[0].rule_name, "first");
}

#[test]
fn positions_cross_newlines() {
    let lexer = Lexer::new(vec![
        ("_nl".to_string(), literal('\n')),
        ("a".to_string(), literal('a')),
    ])
    .unwrap();
    let tokens: Vec<Token> = lexer.apply("a\na").unwrap().iter().cloned().collect();
    assert_eq!(
        tokens,
        vec![token("a", "a", 0, 0), token("a", "a", 1, 0)]
    );
}

#[test]
fn lex_errors_render_a_diagnostic() {
    let err = fixture().apply("ab").unwrap_err();
    assert!(!err.is_config());
    let trace = err.trace().unwrap();
    assert!(trace.deepest_position().is_some());
}
