//! A grammar-driven, backtracking parsing engine.
//!
//! The engine interprets a small closed family of combinator rules
//! (sequence, ordered choice, repetition, negation, named recursion) over
//! an immutable input stream, producing tree-shaped results and
//! tree-shaped errors. Two instantiations are provided: a [`Lexer`] over
//! characters and a [`Parser`] over the tokens the lexer produces.
//!
//! Grammars can be built programmatically from [`Rule`] values, or loaded
//! from text: [`load_lex_rule`] compiles a regex-like mini-language into
//! lexer rules, and [`load_parser`] compiles a grammar DSL into a whole
//! `Parser`. Both loaders run on the engine itself.
//!
//! ```
//! use vyaka::load_parser;
//!
//! let parser = load_parser(
//!     r#"
//!     _ws = "\w+";
//!     int = "[0-9]+";
//!     sum => int ("+" int)*;
//!     "#,
//! )?;
//! let tree = parser.apply("1 + 2 + 3")?;
//! let values: Vec<String> = tree
//!     .named("int")
//!     .iter()
//!     .flat_map(|node| node.all_values())
//!     .map(|token| token.value)
//!     .collect();
//! assert_eq!(values, ["1", "2", "3"]);
//! # Ok::<(), vyaka::VyakaError>(())
//! ```

pub mod engine;
pub mod error;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod position;
pub mod stream;
pub mod tree;

pub use engine::{Processor, Rule, Step, Terminal};
pub use error::{ParseError, SourceContext, VyakaError};
pub use lexer::{Char, CharRule, LexRule, Lexer, Token};
pub use loader::{load_lex_rule, load_parser};
pub use parser::{GrammarRule, Parser, TokenRule};
pub use position::{Located, Position};
pub use stream::Stream;
pub use tree::ParseTree;
