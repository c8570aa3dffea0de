//! Loader + compiler + cache, wired together
//!
//! ```rust
//! use cottonc::{CompilerOptions, Engine, MemoryLoader};
//!
//! let loader = MemoryLoader::with_templates([
//!     ("page.html", "<c-card title=\"Hi\" />"),
//!     ("cotton/card.html", "<h1>{{ title }}</h1>"),
//! ]);
//! let engine = Engine::new(loader, CompilerOptions::default());
//! let page = engine.compile("page.html").unwrap();
//! assert!(page.output.starts_with("{% cotton_component \"cotton/card.html\""));
//! ```

use crate::cache::{compile_fingerprint, CompilationCache, CompiledTemplate};
use crate::error::{CompilerError, Result};
use crate::loader::{TemplateLoader, TemplateSource};
use crate::{compile_source_with_options, CompilerOptions};
use std::sync::Arc;
use std::time::Instant;

pub struct Engine<L: TemplateLoader> {
    loader: L,
    options: CompilerOptions,
    cache: Arc<CompilationCache>,
}

impl<L: TemplateLoader> Engine<L> {
    pub fn new(loader: L, options: CompilerOptions) -> Self {
        Self::with_cache(loader, options, Arc::new(CompilationCache::new()))
    }

    /// Share a cache between several engines
    pub fn with_cache(loader: L, options: CompilerOptions, cache: Arc<CompilationCache>) -> Self {
        Self { loader, options, cache }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn cache(&self) -> &Arc<CompilationCache> {
        &self.cache
    }

    /// Load and compile a template, reusing the cached result while its
    /// source and the compiler options are unchanged. Referenced fragments
    /// are verified when the template is compiled, not on cache hits.
    pub fn compile(&self, id: &str) -> Result<Arc<CompiledTemplate>> {
        let source = self.loader.load(id)?;
        let fingerprint = compile_fingerprint(&source.content, &self.options);
        self.cache
            .get_or_compile(id, &fingerprint, || self.compile_source(&source, &fingerprint))
    }

    /// Compile every fragment a template references, transitively
    pub fn compile_with_components(&self, id: &str) -> Result<Vec<Arc<CompiledTemplate>>> {
        let mut compiled = Vec::new();
        let mut pending = vec![id.to_string()];
        while let Some(next) = pending.pop() {
            if compiled.iter().any(|t: &Arc<CompiledTemplate>| t.id == next) {
                continue;
            }
            let template = self.compile(&next)?;
            pending.extend(template.components.iter().rev().cloned());
            compiled.push(template);
        }
        Ok(compiled)
    }

    fn compile_source(&self, source: &TemplateSource, fingerprint: &str) -> Result<CompiledTemplate> {
        let start = Instant::now();
        let compiled = compile_source_with_options(&source.content, &source.id, &self.options)?;
        if self.options.check_components {
            verify_components(&self.loader, &compiled.components, &self.options)?;
        }
        let mut stats = compiled.stats;
        stats.compile_time_ms = start.elapsed().as_millis() as u64;

        if self.options.debug_mode {
            log::debug!(
                "Compiled {} ({} -> {} bytes, {} component call(s))",
                source.id, stats.source_size, stats.output_size, stats.component_count
            );
        }
        Ok(CompiledTemplate::new(
            &source.id,
            fingerprint,
            compiled.output,
            compiled.components,
            stats,
        ))
    }
}

/// Fail with `UnresolvedComponent` for the first referenced fragment the
/// loader cannot provide
pub fn verify_components(loader: &dyn TemplateLoader, components: &[String], options: &CompilerOptions) -> Result<()> {
    for template in components {
        if let Err(source) = loader.load(template) {
            return Err(CompilerError::UnresolvedComponent {
                component: component_name(template, options),
                template: template.clone(),
                source,
            });
        }
    }
    Ok(())
}

/// Best-effort reverse of the fragment path mapping, for error messages
fn component_name(template: &str, options: &CompilerOptions) -> String {
    let root = options.component_root.trim_end_matches('/');
    let relative = template
        .strip_prefix(root)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(template);
    let extension = format!(".{}", options.template_extension.trim_start_matches('.'));
    relative
        .strip_suffix(extension.as_str())
        .unwrap_or(relative)
        .replace('/', ".")
}
