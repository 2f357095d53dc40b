//! Static type model for condition contexts
//!
//! A condition is compiled against an [`ObjectType`]: a named schema listing
//! the fields (and type-level constants) an expression may reference. Field
//! paths are resolved against these schemas once, at compile time.

pub mod helper;

pub use helper::CoarseType;

use crate::error::{ExpressionError, ExpressionResult};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Static type of a field, literal, or function result
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Boolean
    Bool,
    /// Signed integer (all integral widths)
    Int,
    /// Floating point (all fractional widths)
    Float,
    /// Text
    String,
    /// Calendar date and time without offset
    DateTime,
    /// Signed duration
    TimeSpan,
    /// UUID
    Guid,
    /// Named enumeration
    Enum(Arc<EnumType>),
    /// Nested record
    Object(Arc<ObjectType>),
    /// Nullable wrapper around any other type
    Nullable(Box<Type>),
    /// Type of the `null` literal
    Null,
}

impl Type {
    /// Wrap a type as nullable; never double-wraps and leaves `Null` alone
    pub fn nullable(inner: Type) -> Type {
        match inner {
            Type::Nullable(_) | Type::Null => inner,
            other => Type::Nullable(Box::new(other)),
        }
    }

    /// Whether a value of this type may be null
    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::Nullable(_) | Type::Null)
    }

    /// The type with any nullable wrapper removed
    pub fn underlying(&self) -> &Type {
        match self {
            Type::Nullable(inner) => inner,
            other => other,
        }
    }

    /// Promote to nullable when `other` is nullable (nullable lifting)
    pub fn lift_with(&self, other: &Type) -> Type {
        if other.is_nullable() && !self.is_nullable() {
            Type::nullable(self.clone())
        } else {
            self.clone()
        }
    }

    /// Coarse classification used by consistency checks
    pub fn coarse(&self) -> CoarseType {
        CoarseType::of(self)
    }

    /// Whether both types reduce to the same underlying type
    ///
    /// Integral and fractional numbers are one numeric family; the narrower
    /// operand is promoted when compared.
    pub fn same_underlying(&self, other: &Type) -> bool {
        let (a, b) = (self.underlying(), other.underlying());
        match (a, b) {
            (Type::Int | Type::Float, Type::Int | Type::Float) => true,
            _ => a == b,
        }
    }

    /// Whether `value` is a valid inhabitant of this type
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Type::Nullable(_) | Type::Null, Value::Null) => true,
            (Type::Nullable(inner), v) => inner.admits(v),
            (Type::Bool, Value::Bool(_))
            | (Type::Int, Value::Int(_))
            | (Type::Float, Value::Float(_))
            | (Type::String, Value::String(_))
            | (Type::DateTime, Value::DateTime(_))
            | (Type::TimeSpan, Value::TimeSpan(_))
            | (Type::Guid, Value::Guid(_)) => true,
            (Type::Enum(ty), Value::Enum(v)) => **ty == *v.ty && ty.member_of(v.value).is_some(),
            (Type::Object(ty), Value::Object(record)) => record.object_type().id() == ty.id(),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String => write!(f, "string"),
            Type::DateTime => write!(f, "datetime"),
            Type::TimeSpan => write!(f, "timespan"),
            Type::Guid => write!(f, "guid"),
            Type::Enum(ty) => write!(f, "{}", ty.name()),
            Type::Object(ty) => write!(f, "{}", ty.name()),
            Type::Nullable(inner) => write!(f, "{inner}?"),
            Type::Null => write!(f, "null"),
        }
    }
}

// ============================================================================
// ENUM TYPES
// ============================================================================

/// A named enumeration with integral underlying values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    name: Arc<str>,
    members: IndexMap<Arc<str>, i64>,
}

impl EnumType {
    /// Define an enumeration; member names must be unique
    pub fn new<I, S>(name: impl Into<String>, members: I) -> ExpressionResult<Arc<Self>>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let name: Arc<str> = Arc::from(name.into());
        let mut map = IndexMap::new();
        for (member, value) in members {
            let member: Arc<str> = Arc::from(member.into());
            if map.insert(Arc::clone(&member), value).is_some() {
                return Err(ExpressionError::schema(format!(
                    "enum '{name}' declares member '{member}' twice"
                )));
            }
        }
        Ok(Arc::new(Self { name, members: map }))
    }

    /// Enum name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Underlying value of a member
    pub fn value_of(&self, member: &str) -> Option<i64> {
        self.members.get(member).copied()
    }

    /// Member name for an underlying value (first declared wins)
    pub fn member_of(&self, value: i64) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| **v == value)
            .map(|(k, _)| &**k)
    }

    /// Members in declaration order
    pub fn members(&self) -> impl Iterator<Item = (&str, i64)> {
        self.members.iter().map(|(k, v)| (&**k, *v))
    }
}

// ============================================================================
// OBJECT TYPES
// ============================================================================

/// A single field of an [`ObjectType`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    name: Arc<str>,
    ty: Type,
    display_name: Option<Arc<str>>,
}

impl FieldDef {
    /// Field name as written in expressions
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    /// Human-readable name for messages, falling back to the field name
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Named record schema that conditions are compiled against
///
/// Equality is identity: each built type receives a process-unique id, and a
/// compiled predicate only accepts records of the exact type it was built for.
#[derive(Debug)]
pub struct ObjectType {
    id: u64,
    name: Arc<str>,
    fields: Vec<FieldDef>,
    index: HashMap<Arc<str>, usize>,
    constants: IndexMap<Arc<str>, Value>,
}

impl PartialEq for ObjectType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl ObjectType {
    /// Start building a new object type
    pub fn builder(name: impl Into<String>) -> ObjectTypeBuilder {
        ObjectTypeBuilder::new(name)
    }

    /// Process-unique identity of this type
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration (slot) order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field and its slot index
    pub fn field(&self, name: &str) -> Option<(usize, &FieldDef)> {
        self.index.get(name).map(|&slot| (slot, &self.fields[slot]))
    }

    /// Look up a type-level constant
    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    /// Type-level constants in declaration order
    pub fn constants(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.constants.iter().map(|(k, v)| (&**k, v))
    }

    /// Resolve a dotted field path to its declared field, following nested
    /// object fields
    pub fn field_at_path(&self, path: &str) -> Option<&FieldDef> {
        let mut segments = path.split('.');
        let mut field = self.field(segments.next()?)?.1;
        for segment in segments {
            let Type::Object(nested) = field.ty.underlying() else {
                return None;
            };
            field = nested.field(segment)?.1;
        }
        Some(field)
    }

    /// Enum types reachable from this type's fields, nested objects included
    pub fn reachable_enums(&self) -> Vec<Arc<EnumType>> {
        let mut found: Vec<Arc<EnumType>> = Vec::new();
        let mut seen_objects = vec![self.id];
        let mut stack: Vec<&ObjectType> = vec![self];
        while let Some(ty) = stack.pop() {
            for field in &ty.fields {
                match field.ty.underlying() {
                    Type::Enum(e) if !found.iter().any(|f| f == e) => found.push(Arc::clone(e)),
                    Type::Object(nested) if !seen_objects.contains(&nested.id) => {
                        seen_objects.push(nested.id);
                        stack.push(nested);
                    }
                    _ => {}
                }
            }
        }
        found
    }
}

/// Builder for [`ObjectType`]
#[derive(Debug)]
pub struct ObjectTypeBuilder {
    name: String,
    fields: Vec<FieldDef>,
    constants: Vec<(String, Value)>,
}

impl ObjectTypeBuilder {
    /// Create a new builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            constants: Vec::new(),
        }
    }

    /// Add a field
    pub fn field(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.fields.push(FieldDef {
            name: Arc::from(name.into()),
            ty,
            display_name: None,
        });
        self
    }

    /// Add a nullable field
    pub fn nullable_field(self, name: impl Into<String>, ty: Type) -> Self {
        self.field(name, Type::nullable(ty))
    }

    /// Add a field with a human-readable display name
    pub fn field_with_display(
        mut self,
        name: impl Into<String>,
        ty: Type,
        display_name: impl Into<String>,
    ) -> Self {
        self.fields.push(FieldDef {
            name: Arc::from(name.into()),
            ty,
            display_name: Some(Arc::from(display_name.into())),
        });
        self
    }

    /// Add a type-level constant
    pub fn constant(mut self, name: impl Into<String>, value: Value) -> Self {
        self.constants.push((name.into(), value));
        self
    }

    /// Build the type, rejecting duplicate or clashing names
    pub fn build(self) -> ExpressionResult<Arc<ObjectType>> {
        let mut index = HashMap::with_capacity(self.fields.len());
        for (slot, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() || field.name.contains('.') {
                return Err(ExpressionError::schema(format!(
                    "type '{}' has invalid field name '{}'",
                    self.name, field.name
                )));
            }
            if index.insert(Arc::clone(&field.name), slot).is_some() {
                return Err(ExpressionError::schema(format!(
                    "type '{}' declares field '{}' twice",
                    self.name, field.name
                )));
            }
        }

        let mut constants = IndexMap::with_capacity(self.constants.len());
        for (name, value) in self.constants {
            if index.contains_key(name.as_str()) {
                return Err(ExpressionError::schema(format!(
                    "constant '{name}' clashes with a field of type '{}'",
                    self.name
                )));
            }
            if matches!(value, Value::Object(_)) {
                return Err(ExpressionError::schema(format!(
                    "constant '{name}' must be a scalar value"
                )));
            }
            if constants.insert(Arc::from(name.as_str()), value).is_some() {
                return Err(ExpressionError::schema(format!(
                    "type '{}' declares constant '{name}' twice",
                    self.name
                )));
            }
        }

        Ok(Arc::new(ObjectType {
            id: NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(self.name),
            fields: self.fields,
            index,
            constants,
        }))
    }
}
