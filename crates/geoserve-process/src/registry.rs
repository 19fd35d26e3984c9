//! Process resolution.
//!
//! A [`ProcessRegistry`] asks an ordered list of [`ProcessResolver`]s for an
//! identifier and takes the first answer:
//!
//! 1. [`CatalogResolver`]: built-in processes plus manifests found in the
//!    configured catalog directories, matched by exact identifier.
//! 2. [`ScriptResolver`]: `file:` URIs pointing at a manifest on disk,
//!    optionally restricted to a set of script roots.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;
use walkdir::WalkDir;

use crate::body::ProcessBody;
use crate::descriptor::ProcessDescriptor;
use crate::error::{ProcessError, Result};
use crate::manifest::ProcessManifest;

/// Built-in catalog manifests.
const BUILTIN_MANIFESTS: &[(&str, &str)] = &[
    ("list_tables", include_str!("processes/list_tables.toml")),
    ("describe_columns", include_str!("processes/describe_columns.toml")),
    ("delete_rows", include_str!("processes/delete_rows.toml")),
    ("delete_columns", include_str!("processes/delete_columns.toml")),
];

/// Extension of manifest files.
const MANIFEST_EXTENSION: &str = "toml";

/// URI scheme of script identifiers.
const SCRIPT_SCHEME: &str = "file";

/// A resolved process: what it looks like and what it does.
#[derive(Clone)]
pub struct Process {
    descriptor: Arc<ProcessDescriptor>,
    body: Arc<dyn ProcessBody>,
}

impl Process {
    pub fn new(descriptor: ProcessDescriptor, body: Arc<dyn ProcessBody>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            body,
        }
    }

    pub fn descriptor(&self) -> &ProcessDescriptor {
        &self.descriptor
    }

    pub fn identifier(&self) -> &str {
        &self.descriptor.identifier
    }

    pub fn body(&self) -> &Arc<dyn ProcessBody> {
        &self.body
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("identifier", &self.descriptor.identifier)
            .finish()
    }
}

/// One strategy for turning an identifier into a process.
pub trait ProcessResolver: Send + Sync {
    /// Resolver name (used in logs).
    fn name(&self) -> &str;

    /// The process for `identifier`, or `None` when this resolver does not
    /// know it. Failures are reported as `None`.
    fn resolve(&self, identifier: &str) -> Option<Process>;

    /// Every process this resolver can list.
    fn offerings(&self) -> Vec<ProcessDescriptor>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

/// Processes known by identifier ahead of time.
#[derive(Default)]
pub struct CatalogResolver {
    entries: BTreeMap<String, Process>,
}

impl CatalogResolver {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding the built-in table utilities.
    pub fn builtin() -> Result<Self> {
        let mut catalog = Self::new();
        for (name, source) in BUILTIN_MANIFESTS {
            let process = ProcessManifest::from_toml(source)
                .and_then(ProcessManifest::into_catalog_process)
                .map_err(|e| ProcessError::InvalidManifest(format!("builtin '{}': {}", name, e)))?;
            catalog.insert(process);
        }
        Ok(catalog)
    }

    /// Add a process, replacing any entry with the same identifier.
    pub fn insert(&mut self, process: Process) {
        self.entries.insert(process.identifier().to_string(), process);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_process(mut self, process: Process) -> Self {
        self.insert(process);
        self
    }

    /// Load every manifest under `dir` (recursively).
    ///
    /// Invalid manifests are skipped with a warning. Returns how many were
    /// added.
    pub fn load_dir(&mut self, dir: &Path) -> usize {
        let mut added = 0;
        for path in manifest_files(dir) {
            match ProcessManifest::from_file(&path).and_then(ProcessManifest::into_catalog_process) {
                Ok(process) => {
                    debug!(identifier = %process.identifier(), path = %path.display(), "Loaded catalog process");
                    self.insert(process);
                    added += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping catalog manifest"),
            }
        }
        added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ProcessResolver for CatalogResolver {
    fn name(&self) -> &str {
        "catalog"
    }

    fn resolve(&self, identifier: &str) -> Option<Process> {
        self.entries.get(identifier).cloned()
    }

    fn offerings(&self) -> Vec<ProcessDescriptor> {
        self.entries.values().map(|p| p.descriptor().clone()).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scripts
// ─────────────────────────────────────────────────────────────────────────────

/// Processes addressed by a `file:` URI to their manifest.
///
/// With no roots every readable manifest on the host resolves. With roots,
/// only manifests under one of them do.
#[derive(Debug, Default)]
pub struct ScriptResolver {
    roots: Vec<PathBuf>,
}

impl ScriptResolver {
    /// A resolver accepting any path.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// A resolver restricted to `roots`. Roots that do not exist are dropped
    /// with a warning.
    pub fn with_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let roots = roots
            .into_iter()
            .filter_map(|root| {
                let root = root.as_ref();
                match root.canonicalize() {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!(root = %root.display(), error = %e, "Ignoring script root");
                        None
                    }
                }
            })
            .collect();
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The `file:` URI that identifies the manifest at `path`.
    pub fn identifier_for(path: &Path) -> Option<String> {
        let path = path.canonicalize().ok()?;
        Url::from_file_path(path).ok().map(String::from)
    }

    fn load(&self, identifier: &str) -> Result<Process> {
        let url = Url::parse(identifier)
            .map_err(|e| ProcessError::NotFound(format!("{}: {}", identifier, e)))?;
        if url.scheme() != SCRIPT_SCHEME {
            return Err(ProcessError::NotFound(identifier.to_string()));
        }
        let path = url
            .to_file_path()
            .map_err(|_| ProcessError::NotFound(identifier.to_string()))?;
        let path = path
            .canonicalize()
            .map_err(|e| ProcessError::NotFound(format!("{}: {}", identifier, e)))?;

        if !self.roots.is_empty() && !self.roots.iter().any(|root| path.starts_with(root)) {
            return Err(ProcessError::NotFound(format!(
                "{} is outside the script roots",
                identifier
            )));
        }

        ProcessManifest::from_file(&path)?.into_process(identifier)
    }
}

impl ProcessResolver for ScriptResolver {
    fn name(&self) -> &str {
        "script"
    }

    fn resolve(&self, identifier: &str) -> Option<Process> {
        if !identifier.starts_with("file:") {
            return None;
        }
        match self.load(identifier) {
            Ok(process) => Some(process),
            Err(e) => {
                debug!(identifier, error = %e, "Script did not resolve");
                None
            }
        }
    }

    fn offerings(&self) -> Vec<ProcessDescriptor> {
        let mut offerings = Vec::new();
        for root in &self.roots {
            for path in manifest_files(root) {
                let Some(identifier) = Self::identifier_for(&path) else {
                    continue;
                };
                match self.load(&identifier) {
                    Ok(process) => offerings.push(process.descriptor().clone()),
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping script manifest"),
                }
            }
        }
        offerings
    }
}

fn manifest_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == MANIFEST_EXTENSION))
        .collect();
    files.sort();
    files
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered set of resolvers.
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    resolvers: Vec<Arc<dyn ProcessResolver>>,
}

impl ProcessRegistry {
    /// A registry with no resolvers (nothing resolves).
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard registry: built-ins and `catalog_dirs` first, then
    /// scripts under `script_roots`.
    pub fn standard(catalog_dirs: &[PathBuf], script_roots: &[PathBuf]) -> Result<Self> {
        let mut catalog = CatalogResolver::builtin()?;
        for dir in catalog_dirs {
            catalog.load_dir(dir);
        }
        Ok(Self::new()
            .with_resolver(catalog)
            .with_resolver(ScriptResolver::with_roots(script_roots)))
    }

    /// Append a resolver with the lowest priority so far.
    pub fn with_resolver(mut self, resolver: impl ProcessResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Resolver names in priority order.
    pub fn resolver_names(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Resolve `identifier` with the first resolver that knows it.
    pub fn resolve(&self, identifier: &str) -> Option<Process> {
        if identifier.is_empty() {
            return None;
        }
        self.resolvers.iter().find_map(|r| r.resolve(identifier))
    }

    /// Like [`resolve`](Self::resolve) but as an error.
    pub fn get(&self, identifier: &str) -> Result<Process> {
        self.resolve(identifier)
            .ok_or_else(|| ProcessError::NotFound(identifier.to_string()))
    }

    /// Every listable process, first resolver wins on duplicate identifiers.
    pub fn offerings(&self) -> Vec<ProcessDescriptor> {
        let mut seen = HashSet::new();
        self.resolvers
            .iter()
            .flat_map(|r| r.offerings())
            .filter(|d| seen.insert(d.identifier.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ECHO: &str = r#"
title = "Echo"

[[inputs]]
name = "value"

[[outputs]]
name = "value"

[script]
statements = ["SELECT :value AS value"]
"#;

    #[test]
    fn test_builtin_catalog() {
        let catalog = CatalogResolver::builtin().unwrap();
        assert_eq!(catalog.len(), 4);
        for id in [
            "geoserve:wps:official:listTables",
            "geoserve:wps:official:describeColumns",
            "geoserve:wps:official:deleteRows",
            "geoserve:wps:official:deleteColumns",
        ] {
            assert!(catalog.resolve(id).is_some(), "{id} should resolve");
        }
        assert!(catalog.resolve("geoserve:wps:official:nope").is_none());
    }

    #[test]
    fn test_catalog_dir_loading_skips_invalid() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("good.toml"),
            format!("identifier = \"custom:echo\"\n{}", ECHO),
        )
        .unwrap();
        fs::write(dir.path().join("bad.toml"), ECHO).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut catalog = CatalogResolver::new();
        assert_eq!(catalog.load_dir(dir.path()), 1);
        assert!(catalog.resolve("custom:echo").is_some());
    }

    #[test]
    fn test_script_resolves_by_file_uri() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("echo.toml");
        fs::write(&path, ECHO).unwrap();
        let id = ScriptResolver::identifier_for(&path).unwrap();
        assert!(id.starts_with("file:///"));

        let resolver = ScriptResolver::with_roots([dir.path()]);
        let process = resolver.resolve(&id).unwrap();
        assert_eq!(process.identifier(), id);
        assert_eq!(process.descriptor().title, "Echo");
    }

    #[test]
    fn test_script_failures_are_unresolved() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let outside_path = outside.path().join("echo.toml");
        fs::write(&outside_path, ECHO).unwrap();
        fs::write(dir.path().join("broken.toml"), "[script]\nstatements = []\n").unwrap();

        let resolver = ScriptResolver::with_roots([dir.path()]);
        let outside_id = ScriptResolver::identifier_for(&outside_path).unwrap();
        let broken_id = ScriptResolver::identifier_for(&dir.path().join("broken.toml")).unwrap();

        assert!(resolver.resolve(&outside_id).is_none());
        assert!(resolver.resolve(&broken_id).is_none());
        assert!(resolver.resolve("file:///does/not/exist.toml").is_none());
        assert!(resolver.resolve("file:not a uri").is_none());
        assert!(resolver.resolve("geoserve:wps:official:listTables").is_none());

        assert!(ScriptResolver::unrestricted().resolve(&outside_id).is_some());
    }

    #[test]
    fn test_registry_order_and_offerings() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("echo.toml"), ECHO).unwrap();
        fs::write(dir.path().join("broken.toml"), "nope").unwrap();

        let registry = ProcessRegistry::standard(&[], &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(registry.resolver_names(), vec!["catalog", "script"]);

        let offerings = registry.offerings();
        assert_eq!(offerings.len(), 5);
        assert!(offerings.iter().any(|d| d.identifier.ends_with("nested/echo.toml")));

        assert!(registry.resolve("").is_none());
        assert!(matches!(registry.get("missing"), Err(ProcessError::NotFound(_))));
    }
}
