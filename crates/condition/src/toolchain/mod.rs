//! Function registry ("toolchain") for condition expressions
//!
//! Functions are registered under a name with a typed [`Signature`]; several
//! signatures may share a name. Calls are resolved to a single overload at
//! compile time, so evaluation never looks a function up again.
//!
//! Registration takes a write lock and lookups a read lock; a toolchain is
//! normally populated once at start-up and only read afterwards.

pub mod conversion;
pub mod datetime;
pub mod math;
pub mod string;
pub mod text;

use crate::error::{ExpressionError, ExpressionResult};
use crate::types::Type;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Type alias for a builtin function
pub type BuiltinFunction = fn(&[Value]) -> ExpressionResult<Value>;

/// Callable behind a registered function
pub type Invoker = Arc<dyn Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync>;

static GLOBAL: LazyLock<Arc<Toolchain>> = LazyLock::new(|| Arc::new(Toolchain::with_builtins()));

// ============================================================================
// SIGNATURES
// ============================================================================

/// Parameter and return types of a function
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    params: Vec<Type>,
    variadic: Option<Type>,
    returns: Type,
}

impl Signature {
    /// Fixed-arity signature
    pub fn new(params: impl Into<Vec<Type>>, returns: Type) -> Self {
        Self {
            params: params.into(),
            variadic: None,
            returns,
        }
    }

    /// Signature accepting any number of trailing `rest` arguments after the
    /// fixed ones
    pub fn variadic(params: impl Into<Vec<Type>>, rest: Type, returns: Type) -> Self {
        Self {
            params: params.into(),
            variadic: Some(rest),
            returns,
        }
    }

    /// Fixed parameter types
    pub fn params(&self) -> &[Type] {
        &self.params
    }

    /// Type of the trailing variadic arguments
    pub fn rest(&self) -> Option<&Type> {
        self.variadic.as_ref()
    }

    /// Return type
    pub fn returns(&self) -> &Type {
        &self.returns
    }

    /// Whether two signatures accept exactly the same parameter list
    pub fn same_params(&self, other: &Signature) -> bool {
        self.params == other.params && self.variadic == other.variadic
    }

    /// Conversion cost of calling with `args`, `None` when not applicable
    ///
    /// Zero means an exact match.
    pub fn match_cost(&self, args: &[Type]) -> Option<u32> {
        if args.len() < self.params.len()
            || (self.variadic.is_none() && args.len() != self.params.len())
        {
            return None;
        }
        args.iter().enumerate().try_fold(0, |total, (i, arg)| {
            let param = self.params.get(i).or(self.variadic.as_ref())?;
            conversion_cost(param, arg).map(|cost| total + cost)
        })
    }

    /// Parameter type the argument at `index` is passed as
    pub fn param_at(&self, index: usize) -> Option<&Type> {
        self.params.get(index).or(self.variadic.as_ref())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        if let Some(rest) = &self.variadic {
            if !self.params.is_empty() {
                f.write_str(", ")?;
            }
            write!(f, "{rest}...")?;
        }
        write!(f, ") -> {}", self.returns)
    }
}

/// Cost of passing an argument of type `arg` to a parameter of type `param`
fn conversion_cost(param: &Type, arg: &Type) -> Option<u32> {
    if param == arg {
        return Some(0);
    }
    if matches!(arg, Type::Null) {
        return (param.is_nullable() || matches!(param, Type::String)).then_some(1);
    }
    // A nullable argument only fits a nullable parameter, except strings
    // which every builtin handles as null-safe.
    let nullability_ok = param.is_nullable()
        || !arg.is_nullable()
        || matches!(param.underlying(), Type::String);
    if !nullability_ok {
        return None;
    }
    match (param.underlying(), arg.underlying()) {
        (p, a) if p == a => Some(1),
        (Type::Float, Type::Int) => Some(2),
        _ => None,
    }
}

// ============================================================================
// FUNCTIONS
// ============================================================================

/// A named, typed callable
pub struct Function {
    name: Arc<str>,
    signature: Signature,
    invoker: Invoker,
}

impl Function {
    /// Create a function from any thread-safe closure
    pub fn new<F>(name: impl Into<String>, signature: Signature, invoker: F) -> Self
    where
        F: Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            signature,
            invoker: Arc::new(invoker),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Function signature
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Invoke with already evaluated arguments
    ///
    /// Integer arguments bound to float parameters are widened first.
    pub fn invoke(&self, args: &[Value]) -> ExpressionResult<Value> {
        let needs_widening = args.iter().enumerate().any(|(i, arg)| {
            matches!(arg, Value::Int(_))
                && matches!(
                    self.signature.param_at(i).map(Type::underlying),
                    Some(Type::Float)
                )
        });
        if !needs_widening {
            return (self.invoker)(args);
        }

        let widened: Vec<Value> = args
            .iter()
            .enumerate()
            .map(|(i, arg)| match (arg, self.signature.param_at(i).map(Type::underlying)) {
                (Value::Int(v), Some(Type::Float)) => Value::Float(*v as f64),
                (other, _) => other.clone(),
            })
            .collect();
        (self.invoker)(&widened)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.signature)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Registry of functions callable from conditions
#[derive(Default)]
pub struct Toolchain {
    functions: RwLock<HashMap<Arc<str>, Vec<Arc<Function>>>>,
}

impl fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toolchain")
            .field("functions", &self.functions.read().len())
            .finish()
    }
}

impl Toolchain {
    /// Create an empty toolchain
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a toolchain with every builtin function registered
    pub fn with_builtins() -> Self {
        let toolchain = Self::new();
        {
            let mut functions = toolchain.functions.write();
            let mut add = |name: &str, signature: Signature, func: BuiltinFunction| {
                functions
                    .entry(Arc::from(name))
                    .or_default()
                    .push(Arc::new(Function::new(name, signature, func)));
            };
            datetime::register(&mut add);
            string::register(&mut add);
            text::register(&mut add);
            math::register(&mut add);
            conversion::register(&mut add);
        }
        toolchain
    }

    /// Process-wide toolchain, populated with the builtins on first use
    pub fn global() -> Arc<Toolchain> {
        Arc::clone(&GLOBAL)
    }

    /// Register a function
    ///
    /// Fails when an overload with the same parameter list already exists
    /// under that name.
    pub fn register(&self, function: Function) -> ExpressionResult<()> {
        let mut functions = self.functions.write();
        let overloads = functions.entry(Arc::clone(&function.name)).or_default();
        if let Some(existing) = overloads
            .iter()
            .find(|f| f.signature.same_params(&function.signature))
        {
            return Err(ExpressionError::registration(
                function.name(),
                format!("signature {} is already registered", existing.signature),
            ));
        }
        debug!(function = %function, "registered condition function");
        overloads.push(Arc::new(function));
        Ok(())
    }

    /// Register a plain closure; shorthand for [`Toolchain::register`]
    pub fn register_fn<F>(
        &self,
        name: impl Into<String>,
        signature: Signature,
        invoker: F,
    ) -> ExpressionResult<()>
    where
        F: Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync + 'static,
    {
        self.register(Function::new(name, signature, invoker))
    }

    /// Pick the overload of `name` best matching the argument types
    ///
    /// Exact matches win over converting ones; among equal costs the first
    /// registered overload wins.
    pub fn resolve(&self, name: &str, args: &[Type]) -> Option<Arc<Function>> {
        let functions = self.functions.read();
        functions
            .get(name)?
            .iter()
            .filter_map(|f| f.signature.match_cost(args).map(|cost| (cost, f)))
            .min_by_key(|(cost, _)| *cost)
            .map(|(_, f)| Arc::clone(f))
    }

    /// All overloads registered under `name`
    pub fn overloads(&self, name: &str) -> Vec<Arc<Function>> {
        self.functions.read().get(name).cloned().unwrap_or_default()
    }

    /// Check if a function name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.read().contains_key(name)
    }

    /// Get all function names, sorted
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .functions
            .read()
            .keys()
            .map(|k| k.to_string())
            .collect();
        names.sort();
        names
    }
}

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

/// Text argument; `None` for null
pub(crate) fn str_arg<'a>(name: &str, args: &'a [Value], index: usize) -> ExpressionResult<Option<&'a str>> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Null) => Ok(None),
        other => Err(argument_error(name, index, "string", other)),
    }
}

/// Integer argument
pub(crate) fn int_arg(name: &str, args: &[Value], index: usize) -> ExpressionResult<i64> {
    match args.get(index) {
        Some(Value::Int(i)) => Ok(*i),
        other => Err(argument_error(name, index, "int", other)),
    }
}

/// Numeric argument, widened to float
pub(crate) fn float_arg(name: &str, args: &[Value], index: usize) -> ExpressionResult<f64> {
    args.get(index)
        .and_then(Value::as_f64)
        .ok_or_else(|| argument_error(name, index, "number", args.get(index)))
}

fn argument_error(name: &str, index: usize, expected: &str, got: Option<&Value>) -> ExpressionError {
    ExpressionError::evaluation(format!(
        "{name}: argument {} must be {expected}, got {}",
        index + 1,
        got.map_or("nothing", Value::type_name)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtins_registered() {
        let toolchain = Toolchain::with_builtins();
        for name in ["Now", "Date", "Length", "IsEmail", "Guid", "Min", "Average"] {
            assert!(toolchain.contains(name), "{name}");
        }
        assert_eq!(toolchain.overloads("Date").len(), 2);
    }

    #[test]
    fn test_duplicate_signature_rejected() {
        let toolchain = Toolchain::new();
        let sig = || Signature::new([Type::Int], Type::Bool);
        toolchain
            .register_fn("IsEven", sig(), |args| {
                Ok(Value::Bool(matches!(args[0], Value::Int(i) if i % 2 == 0)))
            })
            .unwrap();
        let err = toolchain
            .register_fn("IsEven", sig(), |_| Ok(Value::Bool(false)))
            .unwrap_err();
        assert_eq!(err.code(), "COND:REGISTRATION");

        // a different parameter list is a new overload
        toolchain
            .register_fn("IsEven", Signature::new([Type::Float], Type::Bool), |_| {
                Ok(Value::Bool(false))
            })
            .unwrap();
        assert_eq!(toolchain.overloads("IsEven").len(), 2);
    }

    #[test]
    fn test_resolution_prefers_exact_match() {
        let toolchain = Toolchain::new();
        toolchain
            .register_fn("F", Signature::new([Type::Float], Type::String), |_| {
                Ok(Value::string("float"))
            })
            .unwrap();
        toolchain
            .register_fn("F", Signature::new([Type::Int], Type::String), |_| {
                Ok(Value::string("int"))
            })
            .unwrap();

        let f = toolchain.resolve("F", &[Type::Int]).unwrap();
        assert_eq!(f.signature().params(), &[Type::Int]);
        assert!(toolchain.resolve("F", &[Type::String]).is_none());
        assert!(toolchain.resolve("G", &[]).is_none());
    }

    #[test]
    fn test_nullable_argument_matching() {
        let sig = Signature::new([Type::Int], Type::Bool);
        assert_eq!(sig.match_cost(&[Type::Int]), Some(0));
        assert_eq!(sig.match_cost(&[Type::nullable(Type::Int)]), None);
        assert_eq!(sig.match_cost(&[Type::Null]), None);

        let text = Signature::new([Type::String], Type::Bool);
        assert_eq!(text.match_cost(&[Type::nullable(Type::String)]), Some(1));
        assert_eq!(text.match_cost(&[Type::Null]), Some(1));
    }

    #[test]
    fn test_variadic_matching_and_widening() {
        let toolchain = Toolchain::with_builtins();
        let sum = toolchain
            .resolve("Sum", &[Type::Int, Type::Float, Type::Int])
            .unwrap();
        assert!(toolchain.resolve("Sum", &[]).is_none());
        let result = sum
            .invoke(&[Value::Int(1), Value::Float(0.5), Value::Int(2)])
            .unwrap();
        assert_eq!(result, Value::Float(3.5));
    }

    #[test]
    fn test_signature_display() {
        let sig = Signature::variadic([Type::Float], Type::Float, Type::Float);
        assert_eq!(sig.to_string(), "(float, float...) -> float");
    }
}
