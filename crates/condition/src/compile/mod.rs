//! Compiled predicates
//!
//! A parsed [`Expr`] is lowered into a compact node tree holding only what
//! evaluation needs: constants, field slot paths, bound functions and
//! operators. Names, spans and static types are dropped.

use crate::compare::compare;
use crate::core::ast::Expr;
use crate::core::token::RelOp;
use crate::error::{ExpressionError, ExpressionResult};
use crate::metadata::Metadata;
use crate::toolchain::Function;
use crate::types::{ObjectType, Type};
use crate::value::{Record, Value};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Lowered expression node
#[derive(Debug)]
pub(crate) enum Node {
    Const(Value),
    Field(Box<[usize]>),
    Call {
        function: Arc<Function>,
        args: Box<[Node]>,
    },
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Relational {
        op: RelOp,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub(crate) fn lower(expr: &Expr) -> Node {
        match expr {
            Expr::Literal { value, .. } | Expr::Constant { value, .. } => Node::Const(value.clone()),
            Expr::Property { slots, .. } => Node::Field(slots.clone().into_boxed_slice()),
            Expr::Call { function, args, .. } => Node::Call {
                function: Arc::clone(function),
                args: args.iter().map(Node::lower).collect(),
            },
            Expr::Not { operand, .. } => Node::Not(Box::new(Node::lower(operand))),
            Expr::And { left, right } => {
                Node::And(Box::new(Node::lower(left)), Box::new(Node::lower(right)))
            }
            Expr::Or { left, right } => {
                Node::Or(Box::new(Node::lower(left)), Box::new(Node::lower(right)))
            }
            Expr::Relational {
                op, left, right, ..
            } => Node::Relational {
                op: *op,
                left: Box::new(Node::lower(left)),
                right: Box::new(Node::lower(right)),
            },
        }
    }

    fn value(&self, record: &Record, case_sensitive: bool) -> ExpressionResult<Value> {
        match self {
            Node::Const(value) => Ok(value.clone()),
            Node::Field(slots) => Ok(read_field(record, slots)),
            Node::Call { function, args } => {
                let args = args
                    .iter()
                    .map(|arg| arg.value(record, case_sensitive))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                let result = function.invoke(&args).map_err(|e| match e {
                    ExpressionError::Evaluation { .. } => e,
                    other => ExpressionError::evaluation(format!(
                        "function '{}' failed: {other}",
                        function.name()
                    )),
                })?;
                let returns = function.signature().returns();
                let result = match (returns.underlying(), result) {
                    (Type::Float, Value::Int(i)) => Value::Float(i as f64),
                    (_, result) => result,
                };
                if !returns.admits(&result) {
                    return Err(ExpressionError::evaluation(format!(
                        "function '{}' returned {} where {returns} was declared",
                        function.name(),
                        result.type_name()
                    )));
                }
                Ok(result)
            }
            Node::Not(_) | Node::And(..) | Node::Or(..) | Node::Relational { .. } => {
                self.test(record, case_sensitive).map(Value::Bool)
            }
        }
    }

    fn test(&self, record: &Record, case_sensitive: bool) -> ExpressionResult<bool> {
        match self {
            Node::Not(operand) => operand.test(record, case_sensitive).map(|b| !b),
            Node::And(left, right) => {
                Ok(left.test(record, case_sensitive)? && right.test(record, case_sensitive)?)
            }
            Node::Or(left, right) => {
                Ok(left.test(record, case_sensitive)? || right.test(record, case_sensitive)?)
            }
            Node::Relational { op, left, right } => {
                let dependent = left.value(record, case_sensitive)?;
                let target = right.value(record, case_sensitive)?;
                compare(&dependent, &target, *op, case_sensitive).map_err(|e| {
                    ExpressionError::evaluation(format!("comparison failed: {e}"))
                })
            }
            Node::Const(_) | Node::Field(_) | Node::Call { .. } => {
                match self.value(record, case_sensitive)? {
                    Value::Bool(b) => Ok(b),
                    other => Err(ExpressionError::evaluation(format!(
                        "expected a bool, got {}",
                        other.type_name()
                    ))),
                }
            }
        }
    }
}

/// Follow slot indices through nested records; a null object yields null
fn read_field(record: &Record, slots: &[usize]) -> Value {
    let Some((&first, rest)) = slots.split_first() else {
        return Value::Null;
    };
    let mut current = record.slot(first);
    for &slot in rest {
        current = match current {
            Value::Object(nested) => nested.slot(slot),
            _ => return Value::Null,
        };
    }
    current.clone()
}

// ============================================================================
// PREDICATE
// ============================================================================

/// Executable form of a condition, bound to one context type
///
/// Cheap to clone and safe to evaluate from many threads at once.
#[derive(Clone)]
pub struct Predicate {
    context: Arc<ObjectType>,
    root: Arc<Node>,
    case_sensitive: bool,
}

impl Predicate {
    pub(crate) fn new(context: Arc<ObjectType>, expr: &Expr, case_sensitive: bool) -> Self {
        Self {
            context,
            root: Arc::new(Node::lower(expr)),
            case_sensitive,
        }
    }

    /// The context type the predicate accepts
    pub fn context(&self) -> &Arc<ObjectType> {
        &self.context
    }

    /// Evaluate against a record of the context type
    ///
    /// Fails only when the record has a different type or a called function
    /// fails.
    pub fn evaluate(&self, record: &Record) -> ExpressionResult<bool> {
        if record.object_type().id() != self.context.id() {
            return Err(ExpressionError::evaluation(format!(
                "predicate for '{}' cannot evaluate a '{}' record",
                self.context.name(),
                record.object_type().name()
            )));
        }
        let result = self.root.test(record, self.case_sensitive);
        trace!(context = self.context.name(), ?result, "evaluated condition");
        result
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("context", &self.context.name())
            .field("case_sensitive", &self.case_sensitive)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// COMPILED EXPRESSION
// ============================================================================

/// Result of compiling a condition: the predicate plus the names it reads
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: Arc<str>,
    predicate: Predicate,
    metadata: Metadata,
}

impl CompiledExpression {
    pub(crate) fn new(source: &str, predicate: Predicate, metadata: Metadata) -> Self {
        Self {
            source: Arc::from(source),
            predicate,
            metadata,
        }
    }

    /// Expression text as compiled
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The executable predicate
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Fields and constants referenced by the expression
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Shorthand for `predicate().evaluate(record)`
    pub fn evaluate(&self, record: &Record) -> ExpressionResult<bool> {
        self.predicate.evaluate(record)
    }
}
