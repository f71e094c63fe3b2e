//! The resource side of the model: projects, their roots and raw content.
//!
//! The model only ever reads through a [`ContentProvider`] and asks a
//! [`ClasspathResolver`] for container roots. The workspace lock is the
//! outermost lock in the crate; resolvers may take it from any thread.

use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::delta::Accessibility;
use crate::element::{ElementType, JavaElement};

pub trait ContentProvider: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FsContentProvider;

impl ContentProvider for FsContentProvider {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Supplies roots contributed by classpath containers. Invoked without the
/// model lock held, possibly while another thread holds the workspace lock.
pub trait ClasspathResolver: Send + Sync {
    fn container_roots(&self, workspace: &Workspace, project: &str) -> io::Result<Vec<RootEntry>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootEntry {
    /// Relative to the project location unless absolute.
    pub path: String,
    pub archive: bool,
}

impl RootEntry {
    pub fn folder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            archive: false,
        }
    }

    pub fn archive(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            archive: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub name: String,
    pub location: PathBuf,
    pub roots: Vec<RootEntry>,
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            roots: Vec::new(),
        }
    }

    pub fn with_root(mut self, root: RootEntry) -> Self {
        self.roots.push(root);
        self
    }
}

pub struct Workspace {
    lock: ReentrantMutex<()>,
    projects: RwLock<BTreeMap<String, ProjectConfig>>,
    content: Arc<dyn ContentProvider>,
    resolver: Option<Arc<dyn ClasspathResolver>>,
}

impl Workspace {
    pub fn new(content: Arc<dyn ContentProvider>) -> Self {
        Self {
            lock: ReentrantMutex::new(()),
            projects: RwLock::new(BTreeMap::new()),
            content,
            resolver: None,
        }
    }

    pub fn on_filesystem() -> Self {
        Self::new(Arc::new(FsContentProvider))
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ClasspathResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Reentrant; held across whole model-mutating operations.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.lock.lock()
    }

    pub fn add_project(&self, config: ProjectConfig) {
        self.projects.write().insert(config.name.clone(), config);
    }

    pub fn remove_project(&self, name: &str) -> Option<ProjectConfig> {
        self.projects.write().remove(name)
    }

    pub fn project_names(&self) -> Vec<String> {
        self.projects.read().keys().cloned().collect()
    }

    pub fn project(&self, name: &str) -> Option<ProjectConfig> {
        self.projects.read().get(name).cloned()
    }

    pub fn content(&self) -> &Arc<dyn ContentProvider> {
        &self.content
    }

    /// Declared roots followed by container roots, without duplicates.
    pub fn resolve_roots(&self, project: &str) -> io::Result<Vec<RootEntry>> {
        let Some(config) = self.project(project) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("unknown project {project}"),
            ));
        };
        let mut roots = config.roots;
        if let Some(resolver) = &self.resolver {
            for root in resolver.container_roots(self, project)? {
                if !roots.contains(&root) {
                    roots.push(root);
                }
            }
        }
        Ok(roots)
    }

    pub fn root_location(&self, project: &str, root: &str) -> Option<PathBuf> {
        let path = Path::new(root);
        if path.is_absolute() {
            return Some(path.to_path_buf());
        }
        self.project(project).map(|config| config.location.join(path))
    }

    /// Path of a compilation unit or class file in a folder root, or of the
    /// archive holding it.
    pub fn resource_path(&self, element: &JavaElement) -> Option<PathBuf> {
        let root = element.package_fragment_root_of()?;
        let project = root.parent()?;
        let root_path = self.root_location(project.name(), root.name())?;
        if root.is_archive() {
            return Some(root_path);
        }
        let mut path = root_path;
        if let Some(package) = element.ancestor(ElementType::PackageFragment) {
            for segment in package.name().split('.').filter(|s| !s.is_empty()) {
                path.push(segment);
            }
        }
        if let Some(openable) = element
            .ancestor(ElementType::CompilationUnit)
            .or_else(|| element.ancestor(ElementType::ClassFile))
        {
            path.push(openable.name());
        }
        Some(path)
    }
}

impl Accessibility for Workspace {
    fn is_accessible(&self, element: &JavaElement) -> bool {
        let Some(project) = element.ancestor(ElementType::Project) else {
            return true;
        };
        self.project(project.name())
            .is_some_and(|config| self.content.exists(&config.location))
    }
}

/// Source root and package of a standalone `.java` file, taken from its
/// `package` declaration when the directory layout agrees with it.
pub fn locate_source_file(path: &Path, contents: &str) -> (PathBuf, String) {
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let package = contents
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("package "))
        .and_then(|rest| rest.split(';').next())
        .map(|name| name.trim().to_string())
        .unwrap_or_default();
    if package.is_empty() {
        return (dir, package);
    }

    let segments: Vec<&str> = package.split('.').collect();
    let mut root = dir.clone();
    for segment in segments.iter().rev() {
        if root.file_name().and_then(|n| n.to_str()) != Some(*segment) {
            return (dir, String::new());
        }
        root.pop();
    }
    (root, package)
}
