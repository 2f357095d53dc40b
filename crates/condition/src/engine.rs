//! Condition compiler with caching support
//!
//! [`Compiler`] ties the pipeline together: lexing, parsing against a context
//! type, metadata extraction and lowering into a [`Predicate`]. With the
//! `cache` feature, compiled expressions are memoized per
//! (context type, expression text).

use crate::compile::{CompiledExpression, Predicate};
use crate::config::CompilerConfig;
use crate::core::span::Span;
use crate::error::{ExpressionError, ExpressionResult};
use crate::lexer::Lexer;
use crate::metadata::Metadata;
use crate::parser::{ParseContext, Parser};
use crate::toolchain::Toolchain;
use crate::types::{EnumType, ObjectType};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[cfg(feature = "cache")]
type ExpressionCache = moka::sync::Cache<(u64, String), Arc<CompiledExpression>>;

/// Compiles condition text into predicates bound to a context type
pub struct Compiler {
    toolchain: Arc<Toolchain>,
    lexer: Option<Arc<Lexer>>,
    config: CompilerConfig,
    enums: Vec<Arc<EnumType>>,
    #[cfg(feature = "cache")]
    cache: Option<ExpressionCache>,
}

impl Compiler {
    /// Create a compiler using the global toolchain and default settings
    pub fn new() -> Self {
        Self::with_config(Toolchain::global(), CompilerConfig::default())
    }

    /// Create a compiler with a specific toolchain
    pub fn with_toolchain(toolchain: Arc<Toolchain>) -> Self {
        Self::with_config(toolchain, CompilerConfig::default())
    }

    /// Create a compiler with a specific toolchain and configuration
    pub fn with_config(toolchain: Arc<Toolchain>, config: CompilerConfig) -> Self {
        #[cfg(feature = "cache")]
        let cache = (config.cache_capacity > 0).then(|| {
            debug!(capacity = config.cache_capacity, "created condition cache");
            moka::sync::Cache::builder()
                .max_capacity(config.cache_capacity)
                .build()
        });

        Self {
            toolchain,
            lexer: None,
            config,
            enums: Vec::new(),
            #[cfg(feature = "cache")]
            cache,
        }
    }

    /// Tokenize with a custom pattern table instead of the standard one
    pub fn with_lexer(mut self, lexer: Lexer) -> Self {
        self.lexer = Some(Arc::new(lexer));
        self.clear_cache();
        self
    }

    /// Make `Enum.Member` references to an enum resolvable even when no
    /// field of the context type uses it
    pub fn register_enum(&mut self, ty: Arc<EnumType>) {
        if !self.enums.iter().any(|e| *e == ty) {
            debug!(name = ty.name(), "registered condition enum");
            self.enums.push(ty);
            self.clear_cache();
        }
    }

    /// The toolchain calls are resolved against
    pub fn toolchain(&self) -> &Arc<Toolchain> {
        &self.toolchain
    }

    /// Active configuration
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile `expression` against `context`
    ///
    /// All lexical, syntax, type-consistency and naming errors surface here.
    /// Compiling the same text against the same type twice yields
    /// equivalent predicates.
    pub fn compile(
        &self,
        context: &Arc<ObjectType>,
        expression: &str,
    ) -> ExpressionResult<Arc<CompiledExpression>> {
        if expression.len() > self.config.max_expression_length {
            return Err(ExpressionError::syntax(
                format!(
                    "expression is {} bytes long, the limit is {}",
                    expression.len(),
                    self.config.max_expression_length
                ),
                Span::point(self.config.max_expression_length),
            ));
        }

        #[cfg(feature = "cache")]
        if let Some(cache) = &self.cache {
            let key = (context.id(), expression.to_string());
            if let Some(compiled) = cache.get(&key) {
                tracing::trace!(expression, "condition cache hit");
                return Ok(compiled);
            }
            let compiled = Arc::new(self.compile_uncached(context, expression)?);
            cache.insert(key, Arc::clone(&compiled));
            return Ok(compiled);
        }

        self.compile_uncached(context, expression).map(Arc::new)
    }

    fn compile_uncached(
        &self,
        context: &Arc<ObjectType>,
        expression: &str,
    ) -> ExpressionResult<CompiledExpression> {
        let lexer: &Lexer = match &self.lexer {
            Some(lexer) => lexer,
            None => Lexer::standard(),
        };
        let tokens = lexer.tokenize(expression, false)?;

        let mut enums = context.reachable_enums();
        enums.extend(self.enums.iter().cloned());

        let expr = Parser::new(
            tokens,
            ParseContext {
                context,
                toolchain: &self.toolchain,
                enums: &enums,
                max_depth: self.config.max_depth,
            },
        )
        .parse()?;

        let metadata = Metadata::extract(&expr)?;
        let predicate = Predicate::new(Arc::clone(context), &expr, self.config.case_sensitive);

        debug!(
            context = context.name(),
            expression,
            fields = metadata.fields().len(),
            consts = metadata.consts().len(),
            "compiled condition"
        );
        Ok(CompiledExpression::new(expression, predicate, metadata))
    }

    /// Number of cached compiled expressions
    pub fn cache_size(&self) -> u64 {
        #[cfg(feature = "cache")]
        if let Some(cache) = &self.cache {
            cache.run_pending_tasks();
            return cache.entry_count();
        }
        0
    }

    /// Drop every cached compiled expression
    pub fn clear_cache(&self) {
        #[cfg(feature = "cache")]
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("toolchain", &self.toolchain)
            .field("config", &self.config)
            .field("enums", &self.enums.len())
            .finish_non_exhaustive()
    }
}
