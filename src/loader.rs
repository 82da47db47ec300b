//! Self-hosting grammar loaders.
//!
//! Both loaders are bootstrapped on the engine itself: a hand-written
//! `Parser` for a regex-like mini-language compiles lexer rules, and a
//! second hand-written `Parser` for a grammar DSL compiles whole parsers,
//! using the regex loader for its own `id` and `quoted` token rules. The
//! bootstrap parsers are built once and cached.
//!
//! The tree-walking helpers (`branch`, `token`, `token_value`, ...) are
//! exported because downstream AST extraction wants exactly the same
//! moves: dispatch on which tagged alternative matched, then pull the
//! tokens out of it.

use once_cell::sync::Lazy;

use crate::engine::Rule;
use crate::error::VyakaError;
use crate::lexer::{self, LexRule, Lexer, Token};
use crate::parser::{GrammarRule, Parser};
use crate::tree::ParseTree;

// ============================================================================
// TREE-WALKING HELPERS
// ============================================================================

/// Predicate: the node's leaf token was produced by lexer rule `name`.
pub fn token_named<'a>(name: &'a str) -> impl Fn(&ParseTree<Token>) -> bool + Copy + 'a {
    move |tree| tree.value.as_ref().map_or(false, |token| token.rule_name == name)
}

/// The single token anywhere under `tree`.
pub fn token(tree: &ParseTree<Token>) -> Result<Token, VyakaError> {
    let leaf = tree.select_one(ParseTree::has_value).map_err(|cause| {
        VyakaError::config(format!("failed to extract token: {}", cause.summary()))
    })?;
    leaf.value
        .ok_or_else(|| VyakaError::config("failed to extract token"))
}

/// The single token's text.
pub fn token_value(tree: &ParseTree<Token>) -> Result<String, VyakaError> {
    Ok(token(tree)?.value)
}

/// The single token's lexer rule name.
pub fn token_rule_name(tree: &ParseTree<Token>) -> Result<String, VyakaError> {
    Ok(token(tree)?.rule_name)
}

/// The one descendant whose tag is in `keys`, ignoring this node's own tag.
///
/// This is how a loader dispatches on which grammar alternative matched:
/// intermediate single-purpose rules (`operand`, `atom`, `paren_rule`)
/// are descended through, and the outermost tagged match wins.
pub fn branch(tree: &ParseTree<Token>, keys: &[&str]) -> Result<ParseTree<Token>, VyakaError> {
    tree.skip()
        .select_one(|node| {
            node.rule_name
                .as_deref()
                .map_or(false, |name| keys.contains(&name))
        })
        .map_err(|cause| {
            VyakaError::config(format!(
                "no single alternative matching {keys:?}: {}",
                cause.summary()
            ))
        })
}

fn single_char(text: &str) -> Result<char, VyakaError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(ch),
        _ => Err(VyakaError::config(format!(
            "expected a single character, got {text:?}"
        ))),
    }
}

// ============================================================================
// STAGE 1: REGEX MINI-LANGUAGE
// ============================================================================

const REGEX_OPERATORS: &str = r".\()|[]-*+?!^";

static REGEX_PARSER: Lazy<Parser> =
    Lazy::new(|| build_regex_parser().expect("regex bootstrap grammar is well-formed"));

fn build_regex_parser() -> Result<Parser, VyakaError> {
    fn r(name: &str) -> GrammarRule {
        Rule::Ref(name.to_string())
    }
    fn refs(names: &[&str]) -> Vec<GrammarRule> {
        names.iter().map(|name| r(name)).collect()
    }

    let mut lex_rules = vec![(
        "char".to_string(),
        lexer::not(lexer::class(REGEX_OPERATORS)),
    )];
    for op in REGEX_OPERATORS.chars() {
        lex_rules.push((op.to_string(), lexer::literal(op)));
    }

    let mut special_char = vec![r("char")];
    special_char.extend(REGEX_OPERATORS.chars().map(|op| r(&op.to_string())));

    let rules = vec![
        ("root".to_string(), Rule::UntilEmpty(Box::new(r("rule")))),
        ("rule".to_string(), Rule::Or(refs(&["operation", "operand"]))),
        (
            "operand".to_string(),
            Rule::Or(refs(&["literal", "any", "special", "and", "or", "class"])),
        ),
        (
            "operation".to_string(),
            Rule::Or(refs(&[
                "zero_or_more",
                "one_or_more",
                "zero_or_one",
                "until_empty",
                "not",
            ])),
        ),
        ("zero_or_more".to_string(), Rule::And(refs(&["operand", "*"]))),
        ("one_or_more".to_string(), Rule::And(refs(&["operand", "+"]))),
        ("zero_or_one".to_string(), Rule::And(refs(&["operand", "?"]))),
        ("until_empty".to_string(), Rule::And(refs(&["operand", "!"]))),
        ("not".to_string(), Rule::And(refs(&["^", "operand"]))),
        ("literal".to_string(), r("char")),
        ("any".to_string(), r(".")),
        ("special".to_string(), Rule::And(refs(&["\\", "special_char"]))),
        ("special_char".to_string(), Rule::Or(special_char)),
        (
            "and".to_string(),
            Rule::And(vec![r("("), Rule::OneOrMore(Box::new(r("rule"))), r(")")]),
        ),
        (
            "or".to_string(),
            Rule::And(vec![
                r("("),
                r("rule"),
                Rule::OneOrMore(Box::new(Rule::And(vec![r("|"), r("rule")]))),
                r(")"),
            ]),
        ),
        (
            "class".to_string(),
            Rule::And(vec![
                r("["),
                Rule::OneOrMore(Box::new(r("class_part"))),
                r("]"),
            ]),
        ),
        (
            "class_part".to_string(),
            Rule::Or(refs(&["range", "literal", "special"])),
        ),
        ("range".to_string(), Rule::And(refs(&["char", "-", "char"]))),
    ];

    Parser::new("root", rules, Lexer::new(lex_rules)?)
}

/// Compile one regex from the mini-language into a lexer rule tree.
pub fn load_lex_rule(regex: &str) -> Result<LexRule, VyakaError> {
    let tree = REGEX_PARSER.apply(regex)?;
    let mut rules = Vec::new();
    for node in &tree.named("rule") {
        rules.push(load_regex_rule(node)?);
    }
    Ok(collapse_and(rules))
}

const REGEX_KEYS: &[&str] = &[
    "literal",
    "any",
    "special",
    "and",
    "or",
    "class",
    "zero_or_more",
    "one_or_more",
    "zero_or_one",
    "until_empty",
    "not",
];

fn load_regex_rule(node: &ParseTree<Token>) -> Result<LexRule, VyakaError> {
    let target = branch(node, REGEX_KEYS)?;
    match target.rule_name.as_deref() {
        Some("literal") => Ok(lexer::literal(single_char(&token_value(&target)?)?)),
        Some("any") => Ok(lexer::any()),
        Some("special") => load_regex_special(&target),
        Some("and") => {
            let mut rules = Vec::new();
            for child in &target.named("rule") {
                rules.push(load_regex_rule(child)?);
            }
            Ok(collapse_and(rules))
        }
        Some("or") => {
            let mut rules = Vec::new();
            for child in &target.named("rule") {
                rules.push(load_regex_rule(child)?);
            }
            Ok(Rule::Or(rules))
        }
        Some("class") => {
            let mut rules = Vec::new();
            for child in &target.named("class_part") {
                rules.push(load_regex_class_part(child)?);
            }
            Ok(collapse_or(rules))
        }
        Some("zero_or_more") => Ok(Rule::ZeroOrMore(Box::new(load_regex_operand(&target)?))),
        Some("one_or_more") => Ok(Rule::OneOrMore(Box::new(load_regex_operand(&target)?))),
        Some("zero_or_one") => Ok(Rule::ZeroOrOne(Box::new(load_regex_operand(&target)?))),
        Some("until_empty") => Ok(Rule::UntilEmpty(Box::new(load_regex_operand(&target)?))),
        Some("not") => Ok(lexer::not(load_regex_operand(&target)?)),
        other => Err(VyakaError::config(format!(
            "unsupported regex construct {other:?}"
        ))),
    }
}

fn load_regex_operand(node: &ParseTree<Token>) -> Result<LexRule, VyakaError> {
    let operand = node
        .named_one("operand")
        .map_err(|cause| VyakaError::config(format!("missing operand: {}", cause.summary())))?;
    load_regex_rule(&operand)
}

fn load_regex_class_part(node: &ParseTree<Token>) -> Result<LexRule, VyakaError> {
    let target = branch(node, &["literal", "special", "range"])?;
    match target.rule_name.as_deref() {
        Some("literal") => Ok(lexer::literal(single_char(&token_value(&target)?)?)),
        Some("special") => load_regex_special(&target),
        Some("range") => {
            let bounds = target.select_n(token_named("char"), 2).map_err(|cause| {
                VyakaError::config(format!("malformed range: {}", cause.summary()))
            })?;
            let min = single_char(&token_value(&bounds.children[0])?)?;
            let max = single_char(&token_value(&bounds.children[1])?)?;
            lexer::range(min, max)
        }
        other => Err(VyakaError::config(format!(
            "unsupported class part {other:?}"
        ))),
    }
}

fn load_regex_special(node: &ParseTree<Token>) -> Result<LexRule, VyakaError> {
    let value = token_value(&node.named_one("special_char").map_err(|cause| {
        VyakaError::config(format!("missing escape code: {}", cause.summary()))
    })?)?;
    if value == "w" {
        return Ok(lexer::whitespace());
    }
    if value.len() == 1 && REGEX_OPERATORS.contains(&value) {
        return Ok(lexer::literal(single_char(&value)?));
    }
    Err(VyakaError::config(format!("invalid special char {value}")))
}

fn collapse_and(mut rules: Vec<LexRule>) -> LexRule {
    if rules.len() == 1 {
        rules.remove(0)
    } else {
        Rule::And(rules)
    }
}

fn collapse_or(mut rules: Vec<LexRule>) -> LexRule {
    if rules.len() == 1 {
        rules.remove(0)
    } else {
        Rule::Or(rules)
    }
}

// ============================================================================
// STAGE 2: GRAMMAR DSL
// ============================================================================

static GRAMMAR_PARSER: Lazy<Parser> =
    Lazy::new(|| build_grammar_parser().expect("grammar bootstrap is well-formed"));

const GRAMMAR_OPERATORS: &[&str] = &["=>", "=", ";", "|", "(", ")", "*", "+", "?", "!"];

fn operator_rule(operator: &str) -> LexRule {
    let mut chars = operator.chars().map(lexer::literal).collect::<Vec<_>>();
    if chars.len() == 1 {
        chars.remove(0)
    } else {
        Rule::And(chars)
    }
}

fn build_grammar_parser() -> Result<Parser, VyakaError> {
    fn r(name: &str) -> GrammarRule {
        Rule::Ref(name.to_string())
    }
    fn refs(names: &[&str]) -> Vec<GrammarRule> {
        names.iter().map(|name| r(name)).collect()
    }

    let mut lex_rules = vec![
        ("_ws".to_string(), lexer::whitespace()),
        ("id".to_string(), load_lex_rule("[_a-zA-Z][_a-zA-Z0-9]*")?),
        ("quoted".to_string(), load_lex_rule(r#""(^")+""#)?),
    ];
    for &op in GRAMMAR_OPERATORS {
        lex_rules.push((op.to_string(), operator_rule(op)));
    }

    let rules = vec![
        ("root".to_string(), Rule::UntilEmpty(Box::new(r("line")))),
        ("line".to_string(), Rule::And(refs(&["decl", ";"]))),
        (
            "decl".to_string(),
            Rule::Or(refs(&["lexer_decl", "parser_decl"])),
        ),
        (
            "lexer_decl".to_string(),
            Rule::And(refs(&["id", "=", "quoted"])),
        ),
        (
            "parser_decl".to_string(),
            Rule::And(refs(&["rule_name", "=>", "rule"])),
        ),
        ("rule_name".to_string(), r("id")),
        ("rule".to_string(), Rule::Or(refs(&["or", "and", "operand"]))),
        (
            "operand".to_string(),
            Rule::Or(refs(&[
                "zero_or_more",
                "one_or_more",
                "zero_or_one",
                "until_empty",
                "atom",
            ])),
        ),
        (
            "atom".to_string(),
            Rule::Or(refs(&["paren_rule", "ref", "literal"])),
        ),
        ("zero_or_more".to_string(), Rule::And(refs(&["atom", "*"]))),
        ("one_or_more".to_string(), Rule::And(refs(&["atom", "+"]))),
        ("zero_or_one".to_string(), Rule::And(refs(&["atom", "?"]))),
        ("until_empty".to_string(), Rule::And(refs(&["atom", "!"]))),
        ("ref".to_string(), r("id")),
        ("literal".to_string(), r("quoted")),
        (
            "and".to_string(),
            Rule::And(vec![r("operand"), Rule::OneOrMore(Box::new(r("operand")))]),
        ),
        (
            "or".to_string(),
            Rule::And(vec![
                r("operand"),
                Rule::OneOrMore(Box::new(Rule::And(vec![r("|"), r("operand")]))),
            ]),
        ),
        (
            "paren_rule".to_string(),
            Rule::And(vec![r("("), r("rule"), r(")")]),
        ),
    ];

    Parser::new("root", rules, Lexer::new(lex_rules)?)
}

/// Compile a whole parser from the grammar DSL.
///
/// Declarations are `name = "regex";` for lexer rules and
/// `name => rule-expr;` for parser rules; the first parser rule is the
/// root. Quoted literals inside rule expressions are auto-registered as
/// lexer rules keyed by their own text.
pub fn load_parser(grammar: &str) -> Result<Parser, VyakaError> {
    let tree = GRAMMAR_PARSER.apply(grammar)?;

    let mut lexer_rules: Vec<(String, LexRule)> = Vec::new();
    for decl in &tree.named("lexer_decl") {
        let name = token_value(&decl.select_one(token_named("id")).map_err(|cause| {
            VyakaError::config(format!("missing lexer rule name: {}", cause.summary()))
        })?)?;
        let raw = token_value(&decl.select_one(token_named("quoted")).map_err(|cause| {
            VyakaError::config(format!("missing lexer rule regex: {}", cause.summary()))
        })?)?;
        if lexer_rules.iter().any(|(existing, _)| *existing == name) {
            return Err(VyakaError::config(format!(
                "duplicate lexer rule name {name}"
            )));
        }
        let rule = load_lex_rule(&raw[1..raw.len() - 1])?;
        lexer_rules.push((name, rule));
    }

    let mut root: Option<String> = None;
    let mut parser_rules: Vec<(String, GrammarRule)> = Vec::new();
    for decl in &tree.named("parser_decl") {
        let name = token_value(&decl.named_one("rule_name").map_err(|cause| {
            VyakaError::config(format!("missing rule name: {}", cause.summary()))
        })?)?;
        let body = decl.named_one("rule").map_err(|cause| {
            VyakaError::config(format!("missing rule body for {name}: {}", cause.summary()))
        })?;
        let rule = load_grammar_rule(&body, &mut lexer_rules)?;
        if parser_rules.iter().any(|(existing, _)| *existing == name) {
            return Err(VyakaError::config(format!(
                "duplicate parser rule name {name}"
            )));
        }
        if root.is_none() {
            root = Some(name.clone());
        }
        parser_rules.push((name, rule));
    }

    let root = root.ok_or_else(|| VyakaError::config("no parser rules found"))?;
    Parser::new(root, parser_rules, Lexer::new(lexer_rules)?)
}

const GRAMMAR_KEYS: &[&str] = &[
    "ref",
    "literal",
    "and",
    "or",
    "zero_or_more",
    "one_or_more",
    "zero_or_one",
    "until_empty",
];

fn load_grammar_rule(
    node: &ParseTree<Token>,
    lexer_rules: &mut Vec<(String, LexRule)>,
) -> Result<GrammarRule, VyakaError> {
    let target = branch(node, GRAMMAR_KEYS)?;
    match target.rule_name.as_deref() {
        Some("ref") => Ok(Rule::Ref(token_value(&target)?)),
        Some("literal") => load_grammar_literal(&target, lexer_rules),
        Some("and") => Ok(Rule::And(load_grammar_operands(&target, lexer_rules)?)),
        Some("or") => Ok(Rule::Or(load_grammar_operands(&target, lexer_rules)?)),
        Some("zero_or_more") => Ok(Rule::ZeroOrMore(Box::new(load_grammar_atom(
            &target,
            lexer_rules,
        )?))),
        Some("one_or_more") => Ok(Rule::OneOrMore(Box::new(load_grammar_atom(
            &target,
            lexer_rules,
        )?))),
        Some("zero_or_one") => Ok(Rule::ZeroOrOne(Box::new(load_grammar_atom(
            &target,
            lexer_rules,
        )?))),
        Some("until_empty") => Ok(Rule::UntilEmpty(Box::new(load_grammar_atom(
            &target,
            lexer_rules,
        )?))),
        other => Err(VyakaError::config(format!(
            "unsupported grammar construct {other:?}"
        ))),
    }
}

fn load_grammar_operands(
    node: &ParseTree<Token>,
    lexer_rules: &mut Vec<(String, LexRule)>,
) -> Result<Vec<GrammarRule>, VyakaError> {
    let mut rules = Vec::new();
    for operand in &node.named("operand") {
        rules.push(load_grammar_rule(operand, lexer_rules)?);
    }
    Ok(rules)
}

fn load_grammar_atom(
    node: &ParseTree<Token>,
    lexer_rules: &mut Vec<(String, LexRule)>,
) -> Result<GrammarRule, VyakaError> {
    let atom = node
        .named_one("atom")
        .map_err(|cause| VyakaError::config(format!("missing operand: {}", cause.summary())))?;
    load_grammar_rule(&atom, lexer_rules)
}

/// A quoted literal token: register a lexer rule matching exactly its text,
/// keyed by that text, and reference it.
fn load_grammar_literal(
    node: &ParseTree<Token>,
    lexer_rules: &mut Vec<(String, LexRule)>,
) -> Result<GrammarRule, VyakaError> {
    let raw = token_value(node)?;
    let text = raw[1..raw.len() - 1].to_string();
    let rule = operator_rule(&text);
    match lexer_rules.iter().find(|(name, _)| *name == text) {
        Some((_, existing)) if *existing != rule => {
            return Err(VyakaError::config(format!(
                "literal {text:?} conflicts with an existing lexer rule of the same name"
            )));
        }
        Some(_) => {}
        None => lexer_rules.push((text.clone(), rule)),
    }
    Ok(Rule::Ref(text))
}
