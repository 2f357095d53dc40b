//! Core building blocks shared by the lexer, parser and compiler

pub mod ast;
pub mod span;
pub mod token;
