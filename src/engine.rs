//! The generic rule interpreter.
//!
//! A `Rule` is a pure function from remaining input to a parse tree and the
//! input left over; a `Processor` is a root rule name plus an immutable
//! name→rule map that `Ref` resolves through at apply time. The engine is
//! generic over the `Terminal` in play: the lexer instantiates it with
//! character rules, the parser with token-kind rules. The combinators
//! themselves are shared between the two.
//!
//! Failure is an ordinary `Result`: each combinator that unwinds an error
//! wraps it in a context node, so the error a caller sees is a tree shaped
//! like the attempted parse.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::position::Located;
use crate::stream::Stream;
use crate::tree::ParseTree;

/// A single-item matcher, the point where the generic engine meets a
/// concrete input type.
pub trait Terminal: Clone + PartialEq + fmt::Debug + fmt::Display {
    type Item: Clone + PartialEq + fmt::Debug + fmt::Display + Located;

    /// Should the head item be consumed by this terminal?
    fn matches(&self, head: &Self::Item) -> bool;
}

/// The result of one rule application: what was built, and what remains.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<T: Terminal> {
    pub tree: ParseTree<T::Item>,
    pub rest: Stream<T::Item>,
}

impl<T: Terminal> Step<T> {
    pub fn new(tree: ParseTree<T::Item>, rest: Stream<T::Item>) -> Self {
        Self { tree, rest }
    }

    fn tagged(self, rule_name: &str) -> Self {
        Self { tree: self.tree.with_rule_name(rule_name), rest: self.rest }
    }

    fn nested(self) -> Self {
        Self { tree: self.tree.wrap(), rest: self.rest }
    }

    fn simplified(self) -> Self {
        Self { tree: self.tree.simplify(), rest: self.rest }
    }
}

/// The closed family of rules the engine interprets.
///
/// `Ref` recursion is by name: a rule graph never holds a pointer to
/// another rule, only a key into the owning processor's map, so arbitrary
/// mutual recursion needs no reference cycles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rule<T: Terminal> {
    /// Defer to the named rule in the owning processor.
    Ref(String),
    /// Consume one item matched by a terminal.
    Term(T),
    /// Consume any one item.
    Any,
    /// Consume one item, but only where the child rule would fail.
    Not(Box<Rule<T>>),
    /// All children in sequence, threading the remainder forward.
    And(Vec<Rule<T>>),
    /// The first child to succeed, tried in declaration order.
    Or(Vec<Rule<T>>),
    ZeroOrMore(Box<Rule<T>>),
    OneOrMore(Box<Rule<T>>),
    ZeroOrOne(Box<Rule<T>>),
    /// Repeat the child until the stream is exhausted; a child failure
    /// before that point is an error, not a terminator.
    UntilEmpty(Box<Rule<T>>),
}

impl<T: Terminal> Rule<T> {
    /// Apply this rule to the input, resolving `Ref`s through `proc`.
    pub fn apply(
        &self,
        proc: &Processor<T>,
        input: &Stream<T::Item>,
    ) -> Result<Step<T>, ParseError> {
        match self {
            Rule::Ref(name) => Ok(proc.apply_named(name, input)?.nested()),

            Rule::Term(terminal) => self.consume_head(input, |head| terminal.matches(head)),

            Rule::Any => self.consume_head(input, |_| true),

            Rule::Not(child) => match child.apply(proc, input) {
                Err(_) => self.consume_head(input, |_| true),
                Ok(_) => Err(ParseError {
                    message: Some(format!("unexpected match for {child}")),
                    rule: Some(self.to_string()),
                    position: input.head().map(Located::position),
                    ..ParseError::default()
                }),
            },

            Rule::And(children) => {
                let mut trees = Vec::with_capacity(children.len());
                let mut rest = input.clone();
                for child in children {
                    match child.apply(proc, &rest) {
                        Ok(step) => {
                            trees.push(step.tree);
                            rest = step.rest;
                        }
                        Err(cause) => return Err(self.fail_at(input, vec![cause])),
                    }
                }
                Ok(Step::new(ParseTree::node(trees), rest))
            }

            Rule::Or(children) => {
                let mut causes = Vec::new();
                for child in children {
                    match child.apply(proc, input) {
                        Ok(step) => return Ok(step.nested()),
                        Err(cause) => causes.push(cause),
                    }
                }
                Err(self.fail_at(input, causes))
            }

            Rule::ZeroOrMore(child) => {
                let mut trees = Vec::new();
                let mut rest = input.clone();
                while let Ok(step) = child.apply(proc, &rest) {
                    trees.push(step.tree);
                    rest = step.rest;
                }
                Ok(Step::new(ParseTree::node(trees), rest))
            }

            Rule::OneOrMore(child) => {
                let first = child
                    .apply(proc, input)
                    .map_err(|cause| self.fail_at(input, vec![cause]))?;
                let mut trees = vec![first.tree];
                let mut rest = first.rest;
                while let Ok(step) = child.apply(proc, &rest) {
                    trees.push(step.tree);
                    rest = step.rest;
                }
                Ok(Step::new(ParseTree::node(trees), rest))
            }

            Rule::ZeroOrOne(child) => match child.apply(proc, input) {
                Ok(step) => Ok(step.nested()),
                // the attempt's partial consumption is discarded
                Err(_) => Ok(Step::new(ParseTree::empty(), input.clone())),
            },

            Rule::UntilEmpty(child) => {
                self.repeat_while(proc, input, child, |rest| !rest.is_empty())
            }
        }
    }

    /// Repeat `child` while `cond` holds over the remaining input. Unlike
    /// `ZeroOrMore`, a child failure while the condition still holds
    /// propagates instead of ending the repetition.
    fn repeat_while(
        &self,
        proc: &Processor<T>,
        input: &Stream<T::Item>,
        child: &Rule<T>,
        cond: impl Fn(&Stream<T::Item>) -> bool,
    ) -> Result<Step<T>, ParseError> {
        let mut trees = Vec::new();
        let mut rest = input.clone();
        while cond(&rest) {
            let step = child
                .apply(proc, &rest)
                .map_err(|cause| self.fail_at(input, vec![cause]))?;
            trees.push(step.tree);
            rest = step.rest;
        }
        Ok(Step::new(ParseTree::node(trees), rest))
    }

    /// Consume the head item if `pred` accepts it.
    fn consume_head(
        &self,
        input: &Stream<T::Item>,
        pred: impl Fn(&T::Item) -> bool,
    ) -> Result<Step<T>, ParseError> {
        let (head, rest) = input.split().ok_or_else(|| ParseError {
            message: Some(format!("failed {self}: empty stream")),
            rule: Some(self.to_string()),
            ..ParseError::default()
        })?;
        if !pred(head) {
            return Err(ParseError {
                message: Some(format!("failed {self} at {head}")),
                rule: Some(self.to_string()),
                position: Some(head.position()),
                ..ParseError::default()
            });
        }
        Ok(Step::new(ParseTree::leaf(head.clone()), rest))
    }

    fn fail_at(&self, input: &Stream<T::Item>, causes: Vec<ParseError>) -> ParseError {
        ParseError::for_rule(
            self.to_string(),
            input.head().map(Located::position),
            causes,
        )
    }
}

impl<T: Terminal> fmt::Display for Rule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Ref(name) => write!(f, "{name}"),
            Rule::Term(terminal) => write!(f, "{terminal}"),
            Rule::Any => write!(f, "."),
            Rule::Not(child) => write!(f, "^{child}"),
            Rule::And(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            Rule::Or(children) => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            Rule::ZeroOrMore(child) => write!(f, "{child}*"),
            Rule::OneOrMore(child) => write!(f, "{child}+"),
            Rule::ZeroOrOne(child) => write!(f, "{child}?"),
            Rule::UntilEmpty(child) => write!(f, "{child}!"),
        }
    }
}

/// An immutable grammar: a root rule name and a name→rule map.
///
/// Processors are built once and never mutated, so they can be shared
/// freely across concurrent parse runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Processor<T: Terminal> {
    root: String,
    rules: HashMap<String, Rule<T>>,
}

impl<T: Terminal> Processor<T> {
    pub fn new(root: impl Into<String>, rules: HashMap<String, Rule<T>>) -> Self {
        Self { root: root.into(), rules }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn rules(&self) -> &HashMap<String, Rule<T>> {
        &self.rules
    }

    pub fn rule(&self, name: &str) -> Option<&Rule<T>> {
        self.rules.get(name)
    }

    /// Apply the rule registered under `name`, tag the result with the
    /// name, and simplify it. Errors unwinding through are re-tagged with
    /// the name, which is how rule context accumulates in failures.
    pub fn apply_named(
        &self,
        name: &str,
        input: &Stream<T::Item>,
    ) -> Result<Step<T>, ParseError> {
        let rule = self.rules.get(name).ok_or_else(|| ParseError {
            message: Some(format!("unknown rule {name}")),
            position: input.head().map(Located::position),
            ..ParseError::default()
        })?;
        match rule.apply(self, input) {
            Ok(step) => Ok(step.tagged(name).simplified()),
            Err(cause) => Err(cause.with_rule_name(name)),
        }
    }

    /// Apply the root rule, returning both the tree and the leftover input.
    pub fn apply_root(&self, input: &Stream<T::Item>) -> Result<Step<T>, ParseError> {
        self.apply_named(&self.root, input)
    }

    /// Apply the root rule and keep only the tree.
    pub fn parse(&self, input: Stream<T::Item>) -> Result<ParseTree<T::Item>, ParseError> {
        self.apply_root(&input).map(|step| step.tree)
    }
}
