//! Cotton Component Compiler
//!
//! Compiles HTML-like component tags (`<c-card title="Hi">...</c-card>`)
//! embedded in host templates into the host engine's own directive syntax,
//! and provides the render-time binding layer those directives rely on.
//!
//! # Basic Usage
//!
//! ```rust
//! use cottonc::{compile_source, Result};
//!
//! fn main() -> Result<()> {
//!     let output = compile_source("<c-button :disabled=\"busy\">Save</c-button>", "form.html")?;
//!     assert_eq!(
//!         output,
//!         "{% cotton_component \"cotton/button.html\" :disabled=\"busy\" %}Save{% endcotton_component %}"
//!     );
//!     Ok(())
//! }
//! ```
//!
//! # Compilation Pipeline
//!
//! 1. **Lexer**: split the source into text runs and component tags, leaving
//!    host constructs untouched
//! 2. **Parser**: nest tags, resolve named slots per component, validate
//!    `<c-vars>` placement
//! 3. **Code generator**: lift the vars frame and emit host directives
//! 4. **Cache**: reuse compiled output while the source fingerprint matches
//!
//! At render time the host's directive implementations use [`runtime`] and
//! [`vars`] to build the scope each fragment is rendered with.

pub mod types;
pub mod error;
pub mod lexer;
pub mod utils;
pub mod literal;

pub mod ast;
pub mod attributes;
pub mod parser;
pub mod slots;
pub mod vars;
pub mod codegen;
pub mod loader;
pub mod cache;
pub mod engine;
pub mod runtime;
pub mod cli;

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

pub use error::{CompilerError, Position, Result};
pub use types::*;
pub use lexer::{Lexer, Token};
pub use utils::{fragment_path, is_valid_component_name, is_valid_identifier, normalize_identifier};
pub use literal::parse_literal;
pub use ast::{ComponentInvocation, Document, NamedSlot, Node, VarsDeclaration};
pub use attributes::{parse_attributes, AttributeBinding};
pub use parser::{parse_template, Parser};
pub use codegen::CodeGenerator;
pub use vars::VarsFrame;
pub use loader::{FileSystemLoader, LoaderError, MemoryLoader, TemplateLoader, TemplateSource};
pub use cache::{compile_fingerprint, CacheStats, CompilationCache, CompiledTemplate};
pub use engine::Engine;
pub use runtime::{evaluate_expression, Attribute, ComponentCall, Context, Scope};
pub use cli::EnhancedCli;

// Re-export commonly used types
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Compiler build information
pub const BUILD_INFO: CompilerInfo = CompilerInfo {
    version: VERSION,
    name: NAME,
    description: DESCRIPTION,
    directives: &[
        COMPONENT_DIRECTIVE,
        ATTR_DIRECTIVE,
        SLOT_DIRECTIVE,
        VARS_FRAME_DIRECTIVE,
        VAR_DIRECTIVE,
    ],
};

/// Compiler information structure
#[derive(Debug, Clone, Serialize)]
pub struct CompilerInfo {
    pub version: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Host directives the compiled output relies on
    pub directives: &'static [&'static str],
}

/// Compilation options and settings
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerOptions {
    /// Enable debug mode with extra logging
    pub debug_mode: bool,

    /// Directory prefix of fragment templates (`cotton`)
    pub component_root: String,

    /// File extension of fragment templates, without the dot
    pub template_extension: String,

    /// Map hyphens in component names to underscores in fragment paths
    pub snake_case_names: bool,

    /// Verify that every referenced fragment can be loaded
    pub check_components: bool,

    /// Search directories for templates and fragments
    pub template_dirs: Vec<PathBuf>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            debug_mode: false,
            component_root: DEFAULT_COMPONENT_ROOT.to_string(),
            template_extension: DEFAULT_TEMPLATE_EXTENSION.to_string(),
            snake_case_names: false,
            check_components: true,
            template_dirs: Vec::new(),
        }
    }
}

/// Compilation statistics and metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompilationStats {
    /// Original source size in bytes
    pub source_size: u64,

    /// Compiled output size in bytes
    pub output_size: u64,

    /// Number of component invocations compiled
    pub component_count: usize,

    /// Number of named slots filled
    pub slot_count: usize,

    /// Number of component attributes
    pub attribute_count: usize,

    /// Attributes emitted as `cotton_attr` blocks
    pub block_attribute_count: usize,

    /// Number of `<c-vars>` declarations
    pub var_count: usize,

    /// Compilation time in milliseconds
    pub compile_time_ms: u64,
}

/// Result of compiling one source text
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOutput {
    pub output: String,
    /// Fragment templates referenced, first use order
    pub components: Vec<String>,
    pub stats: CompilationStats,
}

/// Structure of a template as seen by the compiler
#[derive(Debug, Clone, Serialize)]
pub struct TemplateAnalysis {
    pub file: String,
    pub vars: Vec<AttributeBinding>,
    pub document: Document,
    pub components: Vec<String>,
    pub stats: CompilationStats,
}

/// Compile template source with default options
pub fn compile_source(source: &str, filename: &str) -> Result<String> {
    let compiled = compile_source_with_options(source, filename, &CompilerOptions::default())?;
    Ok(compiled.output)
}

/// Compile template source with custom options
pub fn compile_source_with_options(
    source: &str,
    filename: &str,
    options: &CompilerOptions,
) -> Result<CompiledOutput> {
    if options.debug_mode {
        log::debug!("Starting compilation pipeline for {}", filename);
        log::debug!("Source length: {} bytes", source.len());
    }

    // Phase 1: Lexing
    let tokens = Lexer::new(source, filename).tokenize()?;
    if options.debug_mode {
        log::debug!("Phase 1 complete. {} tokens", tokens.len());
    }

    // Phase 2: Parsing and slot resolution
    let document = Parser::new(tokens, source, filename, options).parse()?;
    if options.debug_mode {
        log::debug!("Phase 2 complete. {} top-level nodes", document.nodes.len());
    }

    // Phase 3: Code generation
    let mut generator = CodeGenerator::new(options, filename);
    let output = generator.generate(document)?;
    let (components, mut stats) = generator.into_parts();
    stats.source_size = source.len() as u64;
    stats.output_size = output.len() as u64;

    if options.debug_mode {
        log::debug!(
            "Phase 3 complete. {} component call(s), {} fragment(s) referenced",
            stats.component_count,
            components.len()
        );
    }

    Ok(CompiledOutput {
        output,
        components,
        stats,
    })
}

/// Main compiler entry point with default options
pub fn compile_file(input_path: &str, output_path: &str) -> Result<CompilationStats> {
    compile_file_with_options(input_path, output_path, &CompilerOptions::default())
}

/// Compile a template file and write the output next to it.
///
/// Referenced fragments are verified against `template_dirs` when
/// `check_components` is set and at least one directory is configured.
pub fn compile_file_with_options(
    input_path: &str,
    output_path: &str,
    options: &CompilerOptions,
) -> Result<CompilationStats> {
    let start_time = Instant::now();
    if options.debug_mode {
        log::info!("{} v{}", NAME, VERSION);
        log::info!("Compiling '{}' to '{}'...", input_path, output_path);
        log::debug!("Compiler options: {:?}", options);
    }

    let source = std::fs::read_to_string(input_path)?;
    let compiled = compile_source_with_options(&source, input_path, options)?;

    if options.check_components && !options.template_dirs.is_empty() {
        let loader = FileSystemLoader::new(options.template_dirs.iter().cloned());
        engine::verify_components(&loader, &compiled.components, options)?;
    }

    std::fs::write(output_path, &compiled.output)?;

    let mut stats = compiled.stats;
    stats.compile_time_ms = start_time.elapsed().as_millis() as u64;

    if options.debug_mode {
        log::info!("Compilation successful!");
        log::info!("Source size: {} bytes", stats.source_size);
        log::info!("Output size: {} bytes", stats.output_size);
        log::info!("Compile time: {}ms", stats.compile_time_ms);
        log::debug!("Full stats: {:?}", stats);
    }

    Ok(stats)
}

/// Parse a template and report its structure without emitting output
pub fn analyze_source(source: &str, filename: &str, options: &CompilerOptions) -> Result<TemplateAnalysis> {
    let document = parse_template(source, filename, options)?;
    let compiled = compile_source_with_options(source, filename, options)?;
    let (frame, nodes) = vars::extract_vars_frame(document.nodes, filename)?;

    Ok(TemplateAnalysis {
        file: filename.to_string(),
        vars: frame.map(|f| f.declarations).unwrap_or_default(),
        document: Document { nodes },
        components: compiled.components,
        stats: compiled.stats,
    })
}

pub fn build_info() -> &'static CompilerInfo {
    &BUILD_INFO
}
