//! Parser for converting tokens into a typed AST
//!
//! Recursive descent over a fixed-precedence grammar:
//!
//! ```text
//! expr     := or-exp
//! or-exp   := and-exp ('||' or-exp)?
//! and-exp  := not-exp ('&&' and-exp)?
//! not-exp  := '!'? rel-exp
//! rel-exp  := val (rel-op val)?
//! val      := 'null' | int | float | bool | string | function-call
//!           | property-path | '(' or-exp ')'
//! ```
//!
//! `||` and `&&` recurse into themselves on the right, so both are
//! right-associative. Names, function overloads and operand types are all
//! resolved here; a tree that parses is fully type-checked.

use crate::consistency::{self, WILDCARD};
use crate::core::ast::Expr;
use crate::core::span::Span;
use crate::core::token::{Token, TokenKind};
use crate::error::{ExpressionError, ExpressionResult};
use crate::toolchain::Toolchain;
use crate::types::helper::parse_date;
use crate::types::{EnumType, ObjectType, Type};
use crate::value::{EnumValue, Value};
use std::sync::Arc;

/// Names and limits the parser resolves against
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    /// Type every property path is resolved against
    pub context: &'a ObjectType,
    /// Functions callable from the expression
    pub toolchain: &'a Toolchain,
    /// Enums whose members may be referenced as `Enum.Member`
    pub enums: &'a [Arc<EnumType>],
    /// Maximum nesting of groups, calls and chained logical operators
    pub max_depth: usize,
}

/// Parser for converting a token stream into a typed AST
pub struct Parser<'s, 'a> {
    tokens: Vec<Token<'s>>,
    position: usize,
    depth: usize,
    scope: ParseContext<'a>,
}

impl<'s, 'a> Parser<'s, 'a> {
    /// Create a new parser from a list of tokens ending in `Eof`
    pub fn new(mut tokens: Vec<Token<'s>>, scope: ParseContext<'a>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map_or(0, |t| t.span.end as usize);
            tokens.push(Token::new(TokenKind::Eof, Span::point(end)));
        }
        Self {
            tokens,
            position: 0,
            depth: 0,
            scope,
        }
    }

    /// Parse the whole token stream into a boolean expression
    pub fn parse(&mut self) -> ExpressionResult<Expr> {
        let expr = self.parse_or()?;
        if self.current().kind != TokenKind::Eof {
            let token = self.current();
            return Err(unexpected(token));
        }
        require_bool(&expr, "condition")?;
        Ok(expr)
    }

    // ========================================================================
    // Grammar rules
    // ========================================================================

    fn parse_or(&mut self) -> ExpressionResult<Expr> {
        let left = self.parse_and()?;
        if !self.match_token(&TokenKind::Or) {
            return Ok(left);
        }
        let right = self.nested(Self::parse_or)?;
        require_bool(&left, "operand of '||'")?;
        require_bool(&right, "operand of '||'")?;
        Ok(Expr::Or {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_and(&mut self) -> ExpressionResult<Expr> {
        let left = self.parse_not()?;
        if !self.match_token(&TokenKind::And) {
            return Ok(left);
        }
        let right = self.nested(Self::parse_and)?;
        require_bool(&left, "operand of '&&'")?;
        require_bool(&right, "operand of '&&'")?;
        Ok(Expr::And {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_not(&mut self) -> ExpressionResult<Expr> {
        if self.current().kind != TokenKind::Not {
            return self.parse_relational();
        }
        let start = self.current().span;
        self.advance();
        let operand = self.parse_relational()?;
        require_bool(&operand, "operand of '!'")?;
        Ok(Expr::Not {
            span: start.merge(operand.span()),
            operand: Box::new(operand),
        })
    }

    fn parse_relational(&mut self) -> ExpressionResult<Expr> {
        let left = self.parse_value()?;
        let TokenKind::RelOp(op) = self.current().kind else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_value()?;

        if let TokenKind::RelOp(next) = self.current().kind {
            return Err(ExpressionError::syntax(
                format!("relational operators cannot be chained ('{op}' followed by '{next}')"),
                self.current().span,
            ));
        }

        let operand_ty = consistency::check(op, &left, &right)?;
        let (left, right) = if matches!(operand_ty.underlying(), Type::DateTime) {
            (date_literal(left), date_literal(right))
        } else {
            (left, right)
        };

        Ok(Expr::Relational {
            op,
            left: Box::new(left),
            right: Box::new(right),
            operand_ty,
        })
    }

    fn parse_value(&mut self) -> ExpressionResult<Expr> {
        let token = self.current().clone();
        let literal = |value: Value| Expr::Literal {
            value,
            span: token.span,
        };

        let expr = match &token.kind {
            TokenKind::Null => literal(Value::Null),
            TokenKind::Integer(i) => literal(Value::Int(*i)),
            TokenKind::Float(x) => literal(Value::Float(*x)),
            TokenKind::Boolean(b) => literal(Value::Bool(*b)),
            TokenKind::String(s) => literal(Value::string(s)),
            TokenKind::FunctionOpen(name) => {
                self.advance();
                return self.nested(|parser| parser.parse_call(name, token.span));
            }
            TokenKind::Identifier(path) => self.resolve_identifier(path, token.span)?,
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.nested(Self::parse_or)?;
                self.expect(&TokenKind::RightParen, "unmatched parenthesis, expected ')'")?;
                return Ok(inner);
            }
            TokenKind::Eof => {
                return Err(ExpressionError::syntax(
                    "unexpected end of input, expected a value",
                    token.span,
                ));
            }
            _ => return Err(unexpected(&token)),
        };
        self.advance();
        Ok(expr)
    }

    /// Arguments and closing parenthesis of a call; the opener is consumed
    fn parse_call(&mut self, name: &str, start: Span) -> ExpressionResult<Expr> {
        let mut args = Vec::new();
        if !self.match_token(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_or()?);
                if self.match_token(&TokenKind::Comma) {
                    continue;
                }
                self.expect(&TokenKind::RightParen, "expected ',' or ')' in argument list")?;
                break;
            }
        }
        let span = start.merge(self.previous_span());

        let arg_types: Vec<Type> = args.iter().map(Expr::ty).collect();
        let Some(function) = self.scope.toolchain.resolve(name, &arg_types) else {
            return Err(self.unresolved_call(name, &arg_types, span));
        };

        Ok(Expr::Call {
            name: name.to_string(),
            function,
            args,
            span,
        })
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    /// Property path, then type-level constant, then `Enum.Member`
    fn resolve_identifier(&self, path: &str, span: Span) -> ExpressionResult<Expr> {
        let missing = match resolve_property(self.scope.context, path) {
            Ok((slots, ty)) => {
                return Ok(Expr::Property {
                    path: path.to_string(),
                    slots,
                    ty,
                    span,
                });
            }
            Err(segment) => segment,
        };

        if let Some(value) = self.scope.context.constant(path) {
            return Ok(Expr::Constant {
                name: path.to_string(),
                value: value.clone(),
                span,
            });
        }

        if let Some(value) = self.resolve_enum_member(path) {
            return Ok(Expr::Constant {
                name: path.to_string(),
                value,
                span,
            });
        }

        Err(ExpressionError::syntax(
            format!(
                "missing member '{missing}' in '{path}' on type '{}'",
                self.scope.context.name()
            ),
            span,
        ))
    }

    fn resolve_enum_member(&self, path: &str) -> Option<Value> {
        let (enum_name, member) = path.split_once('.')?;
        self.scope
            .enums
            .iter()
            .filter(|e| e.name() == enum_name)
            .find_map(|e| {
                e.value_of(member).map(|value| {
                    Value::Enum(EnumValue {
                        ty: Arc::clone(e),
                        value,
                    })
                })
            })
    }

    fn unresolved_call(&self, name: &str, arg_types: &[Type], span: Span) -> ExpressionError {
        let overloads = self.scope.toolchain.overloads(name);
        if overloads.is_empty() {
            return ExpressionError::syntax(format!("unknown function '{name}'"), span);
        }
        let given = arg_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let candidates = overloads
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        ExpressionError::syntax(
            format!("no overload of '{name}' accepts ({given}); candidates: {candidates}"),
            span,
        )
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    /// Run a rule one nesting level deeper
    fn nested<T>(
        &mut self,
        rule: impl FnOnce(&mut Self) -> ExpressionResult<T>,
    ) -> ExpressionResult<T> {
        if self.depth >= self.scope.max_depth {
            return Err(ExpressionError::syntax(
                format!("maximum nesting depth ({}) exceeded", self.scope.max_depth),
                self.current().span,
            ));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn current(&self) -> &Token<'s> {
        // the stream always ends in Eof and advance never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn previous_span(&self) -> Span {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or_else(Span::default, |t| t.span)
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn match_token(&mut self, expected: &TokenKind<'_>) -> bool {
        if &self.current().kind == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &TokenKind<'_>, message: &str) -> ExpressionResult<()> {
        if self.match_token(expected) {
            Ok(())
        } else {
            let token = self.current();
            Err(ExpressionError::syntax(
                format!("{message}, found {}", token.kind),
                token.span,
            ))
        }
    }
}

/// Resolve a dotted path to field slots and a (possibly lifted) type
///
/// On failure returns the first segment that could not be resolved.
fn resolve_property<'p>(
    context: &ObjectType,
    path: &'p str,
) -> Result<(Vec<usize>, Type), &'p str> {
    let mut slots = Vec::new();
    let mut owner = context;
    let mut lifted = false;
    let mut segments = path.split('.').peekable();

    while let Some(segment) = segments.next() {
        let (slot, field) = owner.field(segment).ok_or(segment)?;
        slots.push(slot);
        if segments.peek().is_none() {
            let ty = if lifted {
                Type::nullable(field.ty().clone())
            } else {
                field.ty().clone()
            };
            return Ok((slots, ty));
        }
        let Type::Object(nested) = field.ty().underlying() else {
            // scalar in the middle of a path: the next segment cannot exist
            return Err(segments.peek().copied().unwrap_or(segment));
        };
        lifted |= field.ty().is_nullable();
        owner = nested.as_ref();
    }
    Err(path)
}

/// Replace a date-bearing string literal with a date/time literal
fn date_literal(expr: Expr) -> Expr {
    match expr {
        Expr::Literal {
            value: Value::String(ref s),
            span,
        } if &**s != WILDCARD => match parse_date(s) {
            Some(dt) => Expr::Literal {
                value: Value::DateTime(dt),
                span,
            },
            None => expr,
        },
        other => other,
    }
}

fn require_bool(expr: &Expr, role: &str) -> ExpressionResult<()> {
    match expr.ty() {
        Type::Bool => Ok(()),
        other => Err(ExpressionError::type_consistency(
            format!("{role} must be a non-nullable bool, found {other}"),
            expr.span(),
        )),
    }
}

fn unexpected(token: &Token<'_>) -> ExpressionError {
    ExpressionError::syntax(format!("unexpected token '{}'", token.kind), token.span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn model() -> Arc<ObjectType> {
        let address = ObjectType::builder("Address")
            .field("City", Type::String)
            .build()
            .unwrap();
        ObjectType::builder("Model")
            .field("Flag", Type::Bool)
            .field("Age", Type::Int)
            .nullable_field("Address", Type::Object(address))
            .field("Due", Type::DateTime)
            .build()
            .unwrap()
    }

    fn parse(input: &str) -> ExpressionResult<Expr> {
        let model = model();
        let toolchain = Toolchain::with_builtins();
        let tokens = Lexer::standard().tokenize(input, false)?;
        Parser::new(
            tokens,
            ParseContext {
                context: &model,
                toolchain: &toolchain,
                enums: &[],
                max_depth: 16,
            },
        )
        .parse()
    }

    #[test]
    fn test_parse_right_associative() {
        assert_eq!(
            parse("Flag || true || false").unwrap().to_string(),
            "(Flag || (true || false))"
        );
        assert_eq!(
            parse("true && Flag || false && true").unwrap().to_string(),
            "((true && Flag) || (false && true))"
        );
    }

    #[test]
    fn test_not_binds_to_single_relational() {
        assert_eq!(parse("!true && false").unwrap().to_string(), "(!true && false)");
        assert_eq!(
            parse("!(true && false)").unwrap().to_string(),
            "!(true && false)"
        );
    }

    #[test]
    fn test_nested_path_is_lifted() {
        let expr = parse("Address.City == 'Oslo'").unwrap();
        let Expr::Relational { left, operand_ty, .. } = expr else {
            panic!("expected a comparison");
        };
        assert_eq!(left.ty(), Type::nullable(Type::String));
        assert_eq!(operand_ty, Type::nullable(Type::String));
    }

    #[test]
    fn test_date_string_becomes_date_literal() {
        let expr = parse("Due > '2024-01-01'").unwrap();
        let Expr::Relational { right, .. } = expr else {
            panic!("expected a comparison");
        };
        assert!(matches!(
            *right,
            Expr::Literal {
                value: Value::DateTime(_),
                ..
            }
        ));
    }

    #[test]
    fn test_missing_member_names_segment() {
        let err = parse("Address.Town == 'x'").unwrap_err();
        assert!(err.to_string().contains("missing member 'Town' in 'Address.Town'"));
        assert_eq!(err.span(), Some(Span::new(0, 12)));
    }

    #[test]
    fn test_scalar_mid_path() {
        let err = parse("Age.Value > 1").unwrap_err();
        assert!(err.to_string().contains("missing member 'Value'"));
    }

    #[test]
    fn test_syntax_errors() {
        for input in ["(true", "true &&", "Age > 1 > 0", "true false", ")", ""] {
            let err = parse(input).unwrap_err();
            assert_eq!(err.code(), "COND:SYNTAX", "{input}");
        }
    }

    #[test]
    fn test_non_bool_condition() {
        assert_eq!(parse("Age").unwrap_err().code(), "COND:TYPE");
        assert_eq!(parse("Age && true").unwrap_err().code(), "COND:TYPE");
        assert_eq!(parse("!Age").unwrap_err().code(), "COND:TYPE");
    }

    #[test]
    fn test_call_resolution() {
        assert!(parse("Length(Address.City) > 2").is_ok());
        let err = parse("Lenght('x') > 1").unwrap_err();
        assert!(err.to_string().contains("unknown function 'Lenght'"));
        let err = parse("Length(1) > 1").unwrap_err();
        assert!(err.to_string().contains("no overload of 'Length' accepts (int)"));
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}true{}", "(".repeat(20), ")".repeat(20));
        let err = parse(&deep).unwrap_err();
        assert!(err.to_string().contains("maximum nesting depth"));
    }
}
