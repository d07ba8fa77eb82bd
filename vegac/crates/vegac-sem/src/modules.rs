//! Module cache and import path resolution.
//!
//! A module is identified by the canonical path of its `.vega` file. The
//! cache keeps, per module, the source text, the retained parse tree for
//! later emission, and the two flags driving cycle detection: `analyzing`
//! is set while the module's own imports are being processed, so finding
//! it set again on a fresh import means a circular chain.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use vegac_par::Program;

/// A loaded module.
#[derive(Debug)]
pub struct Module {
    /// Canonical path of the module file.
    pub path: PathBuf,
    /// Module source text.
    pub source: String,
    /// Retained tree; `None` while the module is still being processed.
    pub program: Option<Program>,
    /// Set while the module's imports are being resolved.
    pub analyzing: bool,
    /// Set once registration completed.
    pub analyzed: bool,
}

/// Insertion-ordered module cache; iteration order is emission order.
#[derive(Debug, Default)]
pub struct ModuleCache {
    modules: IndexMap<PathBuf, Module>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self {
            modules: IndexMap::new(),
        }
    }

    pub fn get(&self, path: &Path) -> Option<&Module> {
        self.modules.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut Module> {
        self.modules.get_mut(path)
    }

    /// Insert a module shell with `analyzing` set; the tree is attached
    /// once its imports have been processed.
    pub fn insert_analyzing(&mut self, path: PathBuf, source: String) {
        self.modules.insert(
            path.clone(),
            Module {
                path,
                source,
                program: None,
                analyzing: true,
                analyzed: false,
            },
        );
    }

    /// Retained module trees, in load order.
    pub fn programs(&self) -> Vec<&Program> {
        self.modules
            .values()
            .filter_map(|module| module.program.as_ref())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Resolve an import path to an existing module file.
///
/// A path starting with `.` resolves relative to the importing file's
/// directory; anything else is tried against the ordered search paths.
/// The `.vega` suffix is appended in both cases, and the result is
/// canonicalized so it can serve as the cache key.
pub fn resolve_import(
    import_path: &str,
    current_dir: &Path,
    search_paths: &[PathBuf],
) -> Option<PathBuf> {
    let file_name = format!("{}.vega", import_path);

    if import_path.starts_with('.') {
        let candidate = current_dir.join(&file_name);
        return candidate.canonicalize().ok();
    }

    for search_path in search_paths {
        let candidate = search_path.join(&file_name);
        if let Ok(canonical) = candidate.canonicalize() {
            return Some(canonical);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_relative_import() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("helper.vega"), "fn h() { }").unwrap();

        let resolved = resolve_import("./helper", dir.path(), &[]).unwrap();
        assert!(resolved.ends_with("helper.vega"));
    }

    #[test]
    fn test_resolve_relative_missing() {
        let dir = TempDir::new().unwrap();
        assert!(resolve_import("./missing", dir.path(), &[]).is_none());
    }

    #[test]
    fn test_resolve_search_path_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(first.path().join("m.vega"), "fn a() { }").unwrap();
        fs::write(second.path().join("m.vega"), "fn b() { }").unwrap();

        let paths = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let resolved = resolve_import("m", Path::new("."), &paths).unwrap();
        assert_eq!(resolved, first.path().join("m.vega").canonicalize().unwrap());
    }

    #[test]
    fn test_cache_insertion_order_is_program_order() {
        let mut cache = ModuleCache::new();
        cache.insert_analyzing(PathBuf::from("/a.vega"), String::new());
        cache.insert_analyzing(PathBuf::from("/b.vega"), String::new());

        cache.get_mut(Path::new("/a.vega")).unwrap().program = Some(Program {
            file: "a.vega".into(),
            decls: Vec::new(),
        });
        cache.get_mut(Path::new("/b.vega")).unwrap().program = Some(Program {
            file: "b.vega".into(),
            decls: Vec::new(),
        });

        let programs = cache.programs();
        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].file, "a.vega");
        assert_eq!(programs[1].file, "b.vega");
    }
}
