//! Field and constant inventories of a compiled condition
//!
//! Consumers mirror a condition in another runtime by rebuilding one object
//! tree from both maps, so a field path and a constant path must never share
//! a dotted prefix that ends on one of them.

use crate::core::ast::Expr;
use crate::error::{ExpressionError, ExpressionResult};
use crate::types::CoarseType;
use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;

/// Property paths and symbolic constants referenced by an expression
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    fields: IndexMap<String, CoarseType>,
    consts: IndexMap<String, Value>,
}

impl Metadata {
    /// Walk a parsed expression and collect its references
    ///
    /// Both maps keep first-occurrence order. Fails with a naming collision
    /// when a field path and a constant path overlap.
    pub fn extract(expr: &Expr) -> ExpressionResult<Self> {
        let mut metadata = Self::default();
        metadata.visit(expr);
        check_naming_collisions(&metadata.fields, &metadata.consts)?;
        Ok(metadata)
    }

    /// Property path to coarse type
    pub fn fields(&self) -> &IndexMap<String, CoarseType> {
        &self.fields
    }

    /// Constant name to value
    pub fn consts(&self) -> &IndexMap<String, Value> {
        &self.consts
    }

    fn visit(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal { .. } => {}
            Expr::Property { path, ty, .. } => {
                if !self.fields.contains_key(path) {
                    self.fields.insert(path.clone(), ty.coarse());
                }
            }
            Expr::Constant { name, value, .. } => {
                if !self.consts.contains_key(name) {
                    self.consts.insert(name.clone(), value.clone());
                }
            }
            Expr::Call { args, .. } => args.iter().for_each(|arg| self.visit(arg)),
            Expr::Not { operand, .. } => self.visit(operand),
            Expr::And { left, right }
            | Expr::Or { left, right }
            | Expr::Relational { left, right, .. } => {
                self.visit(left);
                self.visit(right);
            }
        }
    }
}

/// Reject field and constant paths that overlap at a segment boundary
///
/// With `n` the smaller segment count, the paths collide when their first
/// `n` segments are equal; the error names segment `n - 1`. `A.B.C` and
/// `A.B` collide at segment 1 (`B`); `A.B.C` and `A.B.D` do not.
pub fn check_naming_collisions<F, C>(
    fields: &IndexMap<String, F>,
    consts: &IndexMap<String, C>,
) -> ExpressionResult<()> {
    for field in fields.keys() {
        let field_segments: Vec<&str> = field.split('.').collect();
        for constant in consts.keys() {
            let const_segments: Vec<&str> = constant.split('.').collect();
            let shared = field_segments.len().min(const_segments.len());
            if field_segments[..shared] == const_segments[..shared] {
                return Err(ExpressionError::naming_collision(
                    field.as_str(),
                    constant.as_str(),
                    shared - 1,
                    field_segments[shared - 1],
                ));
            }
        }
    }
    Ok(())
}
