//! End-to-end compilation from a query tree to a statement.
//!
//! ```text
//! QueryNode → abstract literals → Translator → Select → tokens → SqlWriter
//!                   │                                              │
//!                   └──────── slots / values ──────▶ parameters ◀──┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use relq::compile::{CompileOptions, Compiler};
//! use relq::sql::Dialect;
//!
//! let compiler = Compiler::new(registry)
//!     .with_options(CompileOptions::default().with_dialect(Dialect::Postgres));
//! let statement = compiler.compile(query.node())?;
//! println!("{}", statement.text);
//! ```

use std::sync::Arc;

use log::debug;

use crate::ast::slots::{abstract_literals, Abstracted};
use crate::ast::{AggregateFn, ElementKind, QueryNode, Value};
use crate::cache::{statement_key, StatementCache};
use crate::metadata::{MetadataError, MetadataRegistry};
use crate::sql::dialect::{Dialect, DialectProfile};
use crate::sql::types::DataType;
use crate::sql::writer::SqlWriter;
use crate::translate::scope::AliasResolutionError;
use crate::translate::{
    DialectUnsupportedError, OrderingRequiredError, ResultColumn, SchemaMismatchError,
    TranslationError, Translator,
};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during compilation.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Alias resolution error: {0}")]
    AliasResolution(#[from] AliasResolutionError),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(#[from] SchemaMismatchError),

    #[error("Ordering required: {0}")]
    OrderingRequired(#[from] OrderingRequiredError),

    #[error("Dialect unsupported: {0}")]
    DialectUnsupported(#[from] DialectUnsupportedError),

    #[error("Cannot hash statement shape: {0}")]
    Hash(#[from] serde_json::Error),
}

pub type CompileResult<T> = Result<T, CompileError>;

// ============================================================================
// Options
// ============================================================================

/// Options for compilation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// SQL dialect to generate.
    pub dialect: DialectProfile,
    /// Attach a `COUNT(*)` statement over the unpaged query.
    pub with_total_count: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::TSql.profile().clone(),
            with_total_count: false,
        }
    }
}

impl CompileOptions {
    /// Use a preset dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect.profile().clone();
        self
    }

    /// Use a custom dialect profile.
    #[must_use]
    pub fn with_profile(mut self, profile: DialectProfile) -> Self {
        self.dialect = profile;
        self
    }

    #[must_use]
    pub fn with_total_count(mut self, enabled: bool) -> Self {
        self.with_total_count = enabled;
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// One bound parameter, in text order.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Value,
    pub db_type: DataType,
}

/// What the execution boundary must enforce for a single-row reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowExpectation {
    pub kind: ElementKind,
    /// Empty results yield no row instead of an error.
    pub or_default: bool,
    /// Message for the error raised on an empty result.
    pub message: Option<String>,
}

impl RowExpectation {
    /// More than one row is an error.
    pub fn is_single(&self) -> bool {
        self.kind == ElementKind::Single
    }
}

/// Result of compiling a query tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    /// The generated SQL string.
    pub text: String,

    /// Parameters in the order the placeholders appear.
    pub parameters: Vec<Parameter>,

    /// Names and types of the result columns; empty for data-changing
    /// statements.
    pub result_shape: Vec<ResultColumn>,

    /// Set when the root is an element reduction.
    pub row_expectation: Option<RowExpectation>,

    /// Command timeout in seconds, for the execution boundary.
    pub timeout: Option<u32>,

    /// `COUNT(*)` over the query without its ordering and paging.
    pub count_statement: Option<Box<CompiledStatement>>,
}

/// The parameter-independent part of a compiled statement. Cached and
/// combined with each call's literal values.
#[derive(Debug, Clone)]
pub struct StatementTemplate {
    text: String,
    /// Slot index per placeholder occurrence.
    bindings: Vec<usize>,
    shape: Vec<ResultColumn>,
    row_expectation: Option<RowExpectation>,
    timeout: Option<u32>,
    count: Option<Box<StatementTemplate>>,
}

impl StatementTemplate {
    pub fn text(&self) -> &str {
        &self.text
    }

    fn instantiate(&self, abstracted: &Abstracted) -> CompiledStatement {
        let parameters = self
            .bindings
            .iter()
            .filter_map(|&slot| {
                let info = abstracted.slots.get(slot)?;
                let value = abstracted.values.get(slot)?;
                Some(Parameter {
                    name: info.name.clone(),
                    value: value.clone(),
                    db_type: info.data_type,
                })
            })
            .collect();

        CompiledStatement {
            text: self.text.clone(),
            parameters,
            result_shape: self.shape.clone(),
            row_expectation: self.row_expectation.clone(),
            timeout: self.timeout,
            count_statement: self
                .count
                .as_ref()
                .map(|count| Box::new(count.instantiate(abstracted))),
        }
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// Compiles query trees against one metadata registry.
///
/// Cheap to share: the registry and cache are reference counted and every
/// call translates with its own alias state.
#[derive(Clone)]
pub struct Compiler {
    registry: Arc<MetadataRegistry>,
    options: CompileOptions,
    cache: Option<Arc<StatementCache>>,
}

impl Compiler {
    pub fn new(registry: Arc<MetadataRegistry>) -> Self {
        Self {
            registry,
            options: CompileOptions::default(),
            cache: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<StatementCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    /// Compile a query tree.
    ///
    /// With a cache attached, queries that differ only in their bound
    /// values share one translated template.
    pub fn compile(&self, root: &QueryNode) -> CompileResult<CompiledStatement> {
        let abstracted = abstract_literals(root, self.options.dialect.like_escape);

        let template = match &self.cache {
            Some(cache) => {
                let key = statement_key(
                    &abstracted,
                    &self.options.dialect,
                    self.options.with_total_count,
                )?;
                match cache.get(&key) {
                    Some(template) => template,
                    None => {
                        let template =
                            Arc::new(build_template(&abstracted, &self.registry, &self.options)?);
                        cache.insert(key, Arc::clone(&template));
                        template
                    }
                }
            }
            None => Arc::new(build_template(&abstracted, &self.registry, &self.options)?),
        };

        let statement = template.instantiate(&abstracted);
        debug!(
            "compiled {} statement for {} ({} parameters)",
            self.options.dialect.name,
            root.operation(),
            statement.parameters.len()
        );
        Ok(statement)
    }
}

/// Compile without a cache.
pub fn compile(
    root: &QueryNode,
    registry: &MetadataRegistry,
    options: &CompileOptions,
) -> CompileResult<CompiledStatement> {
    let abstracted = abstract_literals(root, options.dialect.like_escape);
    let template = build_template(&abstracted, registry, options)?;
    Ok(template.instantiate(&abstracted))
}

// ============================================================================
// Pipeline
// ============================================================================

fn build_template(
    abstracted: &Abstracted,
    registry: &MetadataRegistry,
    options: &CompileOptions,
) -> CompileResult<StatementTemplate> {
    let names = abstracted.slot_names();
    let mut template = translate_statement(&abstracted.root, abstracted, registry, options, &names)?;

    if options.with_total_count {
        if let Some(count) = count_query(&abstracted.root) {
            let count = translate_statement(&count, abstracted, registry, options, &names)?;
            template.count = Some(Box::new(count));
        }
    }
    Ok(template)
}

fn translate_statement(
    root: &QueryNode,
    abstracted: &Abstracted,
    registry: &MetadataRegistry,
    options: &CompileOptions,
    names: &[String],
) -> CompileResult<StatementTemplate> {
    let dialect = &options.dialect;
    let mut translator = Translator::new(registry, dialect, &abstracted.slots);
    let (tokens, shape, timeout) = if root.is_command() {
        let translated = translator.translate_command(root)?;
        (translated.command.to_tokens(dialect), Vec::new(), translated.timeout)
    } else {
        let translated = translator.translate(root)?;
        (translated.select.to_tokens(dialect), translated.shape, translated.timeout)
    };
    let written = SqlWriter::new(dialect, names).write(&tokens);

    Ok(StatementTemplate {
        text: written.text,
        bindings: written.bindings,
        shape,
        row_expectation: row_expectation(root),
        timeout,
        count: None,
    })
}

fn row_expectation(root: &QueryNode) -> Option<RowExpectation> {
    match root {
        QueryNode::Timeout { input, .. } => row_expectation(input),
        QueryNode::Element {
            kind,
            or_default,
            message,
            ..
        } => Some(RowExpectation {
            kind: *kind,
            or_default: *or_default,
            message: message.clone(),
        }),
        _ => None,
    }
}

/// `Count()` over the root with its trailing ordering, paging and element
/// reduction removed. `None` when the root is already a scalar aggregate or
/// changes data.
fn count_query(root: &Arc<QueryNode>) -> Option<QueryNode> {
    let mut node = root;
    loop {
        match node.as_ref() {
            QueryNode::Timeout { input, .. }
            | QueryNode::Element { input, .. }
            | QueryNode::Paging { input, .. }
            | QueryNode::OrderBy { input, .. }
            | QueryNode::Reverse { input } => node = input,
            QueryNode::Aggregate { .. }
            | QueryNode::Delete { .. }
            | QueryNode::Update { .. }
            | QueryNode::Insert { .. } => return None,
            _ => break,
        }
    }
    Some(QueryNode::Aggregate {
        input: Arc::clone(node),
        function: AggregateFn::Count,
        arg: None,
        filter: None,
    })
}
