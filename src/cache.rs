//! Thread-safe cache of compiled templates
//!
//! Entries are keyed by template id and validated against an MD5 fingerprint
//! of the source text and compiler options, so an edited template is
//! recompiled on its next use.
//! The cache is meant to be shared as `Arc<CompilationCache>` between
//! threads; compilation itself always happens outside the map's locks.

use crate::error::Result;
use crate::{CompilationStats, CompilerOptions};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// Hex MD5 of a template source
pub fn fingerprint(source: &str) -> String {
    hex::encode(md5::compute(source.as_bytes()).0)
}

/// Fingerprint of a source compiled under `options`. Covers every option
/// that changes the output or what a cached entry has been checked for, so
/// engines with different options can share one cache.
pub fn compile_fingerprint(source: &str, options: &CompilerOptions) -> String {
    let mut context = md5::Context::new();
    context.consume(options.component_root.as_bytes());
    context.consume([0u8]);
    context.consume(options.template_extension.as_bytes());
    context.consume([0u8, options.snake_case_names as u8, options.check_components as u8, 0u8]);
    context.consume(source.as_bytes());
    hex::encode(context.compute().0)
}

/// Output of one successful compilation
#[derive(Debug, Clone, Serialize)]
pub struct CompiledTemplate {
    pub id: String,
    /// Host template text
    pub output: String,
    /// Fingerprint of the source (and options) the output was compiled from
    pub fingerprint: String,
    /// Fragment templates referenced by the output
    pub components: Vec<String>,
    pub stats: CompilationStats,
    pub compiled_at: SystemTime,
}

impl CompiledTemplate {
    pub fn new(
        id: impl Into<String>,
        fingerprint: impl Into<String>,
        output: String,
        components: Vec<String>,
        stats: CompilationStats,
    ) -> Self {
        Self {
            id: id.into(),
            output,
            fingerprint: fingerprint.into(),
            components,
            stats,
            compiled_at: SystemTime::now(),
        }
    }

    pub fn is_stale(&self, fingerprint: &str) -> bool {
        self.fingerprint != fingerprint
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct CompilationCache {
    entries: DashMap<String, Arc<CompiledTemplate>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    invalidations: AtomicUsize,
}

impl CompilationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry for `id`, whatever source it was compiled from
    pub fn get(&self, id: &str) -> Option<Arc<CompiledTemplate>> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    /// Return the entry for `id` if its fingerprint is `wanted`, otherwise
    /// run `compile` and store its result. `compile` must produce an entry
    /// carrying `wanted`.
    ///
    /// Concurrent callers may compile the same source more than once; the
    /// first stored result for a fingerprint is the one every caller gets.
    pub fn get_or_compile<F>(&self, id: &str, wanted: &str, compile: F) -> Result<Arc<CompiledTemplate>>
    where
        F: FnOnce() -> Result<CompiledTemplate>,
    {
        if let Some(entry) = self.get(id).filter(|entry| entry.fingerprint == wanted) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::trace!("Cache hit for {}", id);
            return Ok(entry);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        log::trace!("Cache miss for {}", id);
        let compiled = Arc::new(compile()?);

        let mut slot = self.entries.entry(id.to_string()).or_insert_with(|| compiled.clone());
        if slot.fingerprint == compiled.fingerprint {
            return Ok(slot.value().clone());
        }
        *slot = compiled.clone();
        Ok(compiled)
    }

    /// Drop the entry for `id`; returns true if there was one
    pub fn invalidate(&self, id: &str) -> bool {
        let removed = self.entries.remove(id).is_some();
        if removed {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
            log::debug!("Invalidated cached template {}", id);
        }
        removed
    }

    pub fn clear(&self) {
        let count = self.entries.len();
        self.entries.clear();
        self.invalidations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompilerError;
    use std::thread;

    fn compiled(id: &str, source: &str) -> CompiledTemplate {
        CompiledTemplate::new(id, fingerprint(source), source.to_uppercase(), Vec::new(), CompilationStats::default())
    }

    #[test]
    fn test_fingerprint_is_md5_hex() {
        assert_eq!(fingerprint(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_ne!(fingerprint("a"), fingerprint("b"));
    }

    #[test]
    fn test_compile_fingerprint_covers_options() {
        let defaults = CompilerOptions::default();
        let base = compile_fingerprint("<c-x />", &defaults);
        assert_eq!(base, compile_fingerprint("<c-x />", &defaults));
        assert_ne!(base, compile_fingerprint("<c-y />", &defaults));

        let variants = [
            CompilerOptions { snake_case_names: true, ..CompilerOptions::default() },
            CompilerOptions { check_components: false, ..CompilerOptions::default() },
            CompilerOptions { component_root: "parts".to_string(), ..CompilerOptions::default() },
            CompilerOptions { template_extension: "txt".to_string(), ..CompilerOptions::default() },
        ];
        for options in &variants {
            assert_ne!(base, compile_fingerprint("<c-x />", options));
        }
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = CompilationCache::new();
        let first = cache.get_or_compile("a.html", &fingerprint("abc"), || Ok(compiled("a.html", "abc"))).unwrap();
        let second = cache
            .get_or_compile("a.html", &fingerprint("abc"), || panic!("must not recompile"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, invalidations: 0 });
        assert_eq!(cache.stats().hit_rate(), 0.5);
    }

    #[test]
    fn test_changed_source_recompiles() {
        let cache = CompilationCache::new();
        cache.get_or_compile("a.html", &fingerprint("old"), || Ok(compiled("a.html", "old"))).unwrap();
        let fresh = cache.get_or_compile("a.html", &fingerprint("new"), || Ok(compiled("a.html", "new"))).unwrap();
        assert_eq!(fresh.output, "NEW");
        assert_eq!(cache.get("a.html").unwrap().output, "NEW");
        assert!(fresh.is_stale(&fingerprint("old")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_compile_is_not_cached() {
        let cache = CompilationCache::new();
        let err = cache.get_or_compile("a.html", &fingerprint("x"), || {
            Err(CompilerError::InvalidFormat { message: "boom".to_string() })
        });
        assert!(err.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = CompilationCache::new();
        cache.get_or_compile("a.html", &fingerprint("a"), || Ok(compiled("a.html", "a"))).unwrap();
        cache.get_or_compile("b.html", &fingerprint("b"), || Ok(compiled("b.html", "b"))).unwrap();
        assert!(cache.invalidate("a.html"));
        assert!(!cache.invalidate("a.html"));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 2);
    }

    #[test]
    fn test_concurrent_callers_converge() {
        let cache = Arc::new(CompilationCache::new());
        let results: Vec<Arc<CompiledTemplate>> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    cache
                        .get_or_compile("shared.html", &fingerprint("same source"), || Ok(compiled("shared.html", "same source")))
                        .unwrap()
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let stored = cache.get("shared.html").unwrap();
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &stored)));
        assert_eq!(cache.len(), 1);
    }
}
