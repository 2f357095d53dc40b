//! Compiler configuration

use serde::{Deserialize, Serialize};

/// Default nesting limit for groups, calls and chained logical operators
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default maximum expression length in bytes
pub const DEFAULT_MAX_EXPRESSION_LENGTH: usize = 64 * 1024;

/// Default number of compiled expressions kept by a caching compiler
pub const DEFAULT_CACHE_CAPACITY: u64 = 1024;

/// Settings for [`crate::Compiler`]
///
/// Every field is optional when deserializing; missing fields take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Whether string equality and ordering are case sensitive
    pub case_sensitive: bool,

    /// Nesting limit enforced while parsing
    pub max_depth: usize,

    /// Longest accepted expression, in bytes
    pub max_expression_length: usize,

    /// Capacity of the compiled-expression cache; 0 disables it
    pub cache_capacity: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            max_depth: DEFAULT_MAX_DEPTH,
            max_expression_length: DEFAULT_MAX_EXPRESSION_LENGTH,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CompilerConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set string comparison case sensitivity
    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Set the parser nesting limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the maximum expression length
    pub fn with_max_expression_length(mut self, max_expression_length: usize) -> Self {
        self.max_expression_length = max_expression_length;
        self
    }

    /// Set the compiled-expression cache capacity
    pub fn with_cache_capacity(mut self, cache_capacity: u64) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }
}
