#![warn(clippy::all)]
#![warn(missing_docs)]

//! # nebula-condition
//!
//! Declarative condition language for conditional validation rules.
//!
//! A condition such as `Age > 17 && (Country == "PL" || Consent)` is compiled
//! once against a typed context schema ([`ObjectType`]) into a [`Predicate`]
//! that can be evaluated against any number of [`Record`]s of that type.
//! Compilation also extracts [`Metadata`]: every field path the condition
//! reads and every symbolic constant it references, so the rule can be
//! mirrored in another runtime.
//!
//! ## Features
//!
//! - **Typed compilation**: property paths, functions and operand types are
//!   resolved and checked at compile time; evaluation never type-checks
//! - **Null-aware comparison**: null and blank strings are "empty", `"*"`
//!   matches anything non-empty
//! - **Function toolchain**: date, string, text-classification, numeric
//!   aggregate and conversion builtins, extensible by the host
//! - **Message templates**: `{Field}` / `{Field:n}` placeholders with
//!   composite-format brace escaping
//! - **Caching**: compiled expressions memoized per context type and text
//!
//! ## Grammar
//!
//! ```text
//! expr     := or-exp
//! or-exp   := and-exp ('||' or-exp)?
//! and-exp  := not-exp ('&&' and-exp)?
//! not-exp  := '!'? rel-exp
//! rel-exp  := val (rel-op val)?
//! val      := 'null' | int | float | bool | string | function-call
//!           | property-path | '(' or-exp ')'
//! rel-op   := '==' | '!=' | '>' | '>=' | '<' | '<='
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use nebula_condition::{Compiler, ObjectType, Record, Type, Value};
//!
//! # fn main() -> Result<(), nebula_condition::ExpressionError> {
//! let person = ObjectType::builder("Person")
//!     .field("Age", Type::Int)
//!     .nullable_field("Country", Type::String)
//!     .build()?;
//!
//! let compiler = Compiler::new();
//! let rule = compiler.compile(&person, r#"Age > 17 && Country == "PL""#)?;
//!
//! let adult = Record::builder(&person)
//!     .set("Age", Value::Int(30))?
//!     .set("Country", Value::string("PL"))?
//!     .build()?;
//! assert!(rule.evaluate(&adult)?);
//! assert_eq!(rule.metadata().fields().len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Builtin Functions
//!
//! - **Date/time**: `Now`, `Today`, `Date`, `ToDate`, `TimeSpan`
//! - **String**: `Length`, `Trim`, `Concat`, `CompareOrdinal`,
//!   `CompareOrdinalIgnoreCase`, `StartsWith`, `EndsWith`, `Contains` (and
//!   their `IgnoreCase` variants), `Substring`, `IsNullOrWhiteSpace`
//! - **Text**: `IsDigitChain`, `IsNumber`, `IsEmail`, `IsPhone`, `IsUrl`,
//!   `IsRegexMatch`
//! - **Math**: `Min`, `Max`, `Sum`, `Average`
//! - **Conversion**: `Guid`

pub mod compare;
pub mod compile;
pub mod config;
pub mod consistency;
pub mod core;
pub mod engine;
pub mod error;
pub mod error_formatter;
pub mod lexer;
pub mod message;
pub mod metadata;
pub mod parser;
pub mod toolchain;
pub mod types;
pub mod value;

// Re-exports
pub use compare::{compare, compute};
pub use compile::{CompiledExpression, Predicate};
pub use config::CompilerConfig;
pub use crate::core::ast::Expr;
pub use crate::core::span::Span;
pub use crate::core::token::{RelOp, Token, TokenType};
pub use engine::Compiler;
pub use error::{ExpressionError, ExpressionResult};
pub use error_formatter::{ErrorFormatter, format_expression_error};
pub use lexer::Lexer;
pub use message::{FieldResolver, FormatItem, MessageTemplate, RecordResolver, format_message};
pub use metadata::Metadata;
pub use toolchain::{Function, Signature, Toolchain};
pub use types::{CoarseType, EnumType, ObjectType, Type};
pub use value::{EnumValue, Record, Value};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CoarseType, CompiledExpression, Compiler, CompilerConfig, EnumType, ExpressionError,
        ExpressionResult, FieldResolver, MessageTemplate, Metadata, ObjectType, Predicate, Record,
        RecordResolver, Signature, Toolchain, Type, Value, format_message,
    };
}
