//! The element manager: the single funnel from handles to bodies.
//!
//! `element_info` finds a body in the cache or opens the nearest openable
//! (opening its parents first), builds its structure and inserts every body
//! of the build in one step. Building reads through the workspace and may
//! call the classpath resolver, so it always runs without the model lock;
//! the lock is only taken to look up and to insert, with a re-check in case
//! another thread finished the same open first.
//!
//! Lock order is workspace lock, then model lock, then buffer lock.

use parking_lot::Mutex;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace, warn};

use crate::archive::{self, ArchiveError};
use crate::buffer::{Buffer, BufferManager};
use crate::cache::{CacheStats, EvictAll, JarTypeEntry, ModelCache};
use crate::context::ModelContext;
use crate::element::{ElementType, JavaElement, Resolvable};
use crate::error::{ModelError, Result};
use crate::info::{ElementInfo, InfoDetail, SourceRange};
use crate::modifiers::Modifiers;
use crate::scan;
use crate::signature::create_type_signature;
use crate::structure::{self, Bodies};
use crate::workspace::Workspace;

/// Cooperative cancellation, checked before each element of a bulk open.
#[derive(Debug, Default)]
pub struct CancellationToken(AtomicBool);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ModelError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub struct ElementManager {
    context: Arc<ModelContext>,
    model: JavaElement,
    workspace: Arc<Workspace>,
    buffers: Arc<BufferManager>,
    cache: Mutex<ModelCache>,
}

impl ElementManager {
    pub fn new(context: Arc<ModelContext>, workspace: Arc<Workspace>) -> Self {
        let buffers = Arc::new(BufferManager::new(workspace.content().clone()));
        let cache = ModelCache::new(context.config());
        Self {
            context,
            model: JavaElement::model(),
            workspace,
            buffers,
            cache: Mutex::new(cache),
        }
    }

    /// The model root; every handle passed in must descend from it.
    pub fn model(&self) -> &JavaElement {
        &self.model
    }

    pub fn context(&self) -> &Arc<ModelContext> {
        &self.context
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    pub fn buffers(&self) -> &Arc<BufferManager> {
        &self.buffers
    }

    pub fn element_info(&self, element: &JavaElement) -> Result<Arc<ElementInfo>> {
        if let Some(info) = self.cache.lock().get(element) {
            return Ok(info);
        }
        let openable = element.openable();
        let info = self.open_openable(&openable)?;
        if openable == *element {
            return Ok(info);
        }
        self.cache
            .lock()
            .get(element)
            .ok_or_else(|| ModelError::DoesNotExist(element.clone()))
    }

    /// The cached body, without opening anything or touching recency.
    pub fn peek_info(&self, element: &JavaElement) -> Option<Arc<ElementInfo>> {
        self.cache.lock().peek(element)
    }

    pub fn is_open(&self, element: &JavaElement) -> bool {
        self.peek_info(element).is_some()
    }

    /// Opens the openable enclosing `element`.
    pub fn open(&self, element: &JavaElement) -> Result<Arc<ElementInfo>> {
        self.open_openable(&element.openable())
    }

    fn open_openable(&self, openable: &JavaElement) -> Result<Arc<ElementInfo>> {
        if let Some(info) = self.cache.lock().get(openable) {
            return Ok(info);
        }
        if let Some(parent) = openable.openable_parent() {
            let parent_info = self.open_openable(&parent)?;
            if !parent_info.children().contains(openable) {
                return Err(ModelError::DoesNotExist(openable.clone()));
            }
        }

        let bodies = self.build(openable).inspect_err(|err| {
            debug!(target: "jmodel.model", element = %openable, error = %err, "structure build failed");
        })?;
        let bodies: Vec<(JavaElement, Arc<ElementInfo>)> = bodies
            .into_iter()
            .map(|(element, info)| (element, Arc::new(info)))
            .collect();
        let info = bodies
            .iter()
            .find(|(element, _)| element == openable)
            .map(|(_, info)| info.clone())
            .ok_or_else(|| ModelError::DoesNotExist(openable.clone()))?;

        let mut cache = self.cache.lock();
        if let Some(existing) = cache.peek(openable) {
            return Ok(existing);
        }
        let closed = cache.put_all(bodies, &*self.buffers);
        drop(cache);

        debug!(target: "jmodel.model", element = %openable, "opened");
        if !closed.is_empty() {
            debug!(target: "jmodel.model", closed = closed.len(), "closed elements to make room");
        }
        Ok(info)
    }

    /// Drops the bodies of `element` and below. Elements with unsaved
    /// buffer changes stay open.
    pub fn close(&self, element: &JavaElement) -> Result<()> {
        if self.buffers.has_unsaved_changes(element) {
            debug!(target: "jmodel.model", element = %element, "not closing element with unsaved changes");
            return Ok(());
        }
        let closed = self
            .cache
            .lock()
            .remove_info_and_children(element, &*self.buffers);
        debug!(target: "jmodel.model", element = %element, closed = closed.len(), "closed");
        Ok(())
    }

    /// Rebuilds an open openable from its current content (the buffer when
    /// one is open) and replaces its bodies. Buffers are kept.
    pub fn make_consistent(&self, openable: &JavaElement) -> Result<Arc<ElementInfo>> {
        if !openable.element_type().is_openable() {
            return Err(ModelError::InvalidElementTypes {
                element: openable.clone(),
                message: "only openables can be rebuilt".to_string(),
            });
        }
        if !self.is_open(openable) {
            return self.open_openable(openable);
        }
        let bodies = self.build(openable)?;
        let bodies: Vec<(JavaElement, Arc<ElementInfo>)> = bodies
            .into_iter()
            .map(|(element, info)| (element, Arc::new(info)))
            .collect();
        let info = bodies
            .iter()
            .find(|(element, _)| element == openable)
            .map(|(_, info)| info.clone())
            .ok_or_else(|| ModelError::DoesNotExist(openable.clone()))?;

        let mut cache = self.cache.lock();
        cache.remove_info_and_children(openable, &EvictAll);
        cache.put_all(bodies, &*self.buffers);
        trace!(target: "jmodel.model", element = %openable, "made consistent");
        Ok(info)
    }

    pub fn exists(&self, element: &JavaElement) -> bool {
        match self.element_info(element) {
            Ok(_) => true,
            Err(err) => {
                if !err.is_does_not_exist() {
                    trace!(target: "jmodel.model", element = %element, error = %err, "treating unreadable element as missing");
                }
                false
            }
        }
    }

    pub fn children(&self, element: &JavaElement) -> Result<Vec<JavaElement>> {
        Ok(self.element_info(element)?.children().to_vec())
    }

    pub fn has_children(&self, element: &JavaElement) -> Result<bool> {
        Ok(self.element_info(element)?.child_count() > 0)
    }

    /// Opens each element in turn; returns how many were opened.
    pub fn open_all(&self, elements: &[JavaElement], token: &CancellationToken) -> Result<usize> {
        let mut opened = 0;
        for element in elements {
            token.check()?;
            self.element_info(element)?;
            opened += 1;
        }
        Ok(opened)
    }

    /// Body of a binary type. When the archive root holding it is not
    /// resident the type is read alone and kept in the jar type cache.
    pub fn binary_type_info(&self, ty: &JavaElement) -> Result<Arc<ElementInfo>> {
        let class_file = ty
            .parent()
            .filter(|p| p.element_type() == ElementType::ClassFile)
            .cloned();
        let root = ty.package_fragment_root_of();
        let (Some(class_file), Some(root)) = (class_file, root) else {
            return self.element_info(ty);
        };
        if !root.is_archive() || self.is_open(&root) {
            return self.element_info(ty);
        }

        match self.cache.lock().jar_type(ty) {
            Some(JarTypeEntry::Info(info)) => return Ok(info),
            Some(JarTypeEntry::NonExisting) => return Err(ModelError::DoesNotExist(ty.clone())),
            None => {}
        }

        let built = self
            .class_file_bytes(&class_file)
            .and_then(|bytes| structure::build_class_file(&class_file, &bytes));
        let info = match built {
            Ok(bodies) => bodies
                .into_iter()
                .find(|(element, _)| element == ty)
                .map(|(_, info)| Arc::new(info)),
            Err(err) if err.is_does_not_exist() => None,
            Err(err) => return Err(err),
        };

        let mut cache = self.cache.lock();
        match info {
            Some(info) => {
                cache.put_jar_type_info(ty.clone(), JarTypeEntry::Info(info.clone()));
                Ok(info)
            }
            None => {
                cache.put_jar_type_info(ty.clone(), JarTypeEntry::NonExisting);
                Err(ModelError::DoesNotExist(ty.clone()))
            }
        }
    }

    pub fn put_jar_type_info(&self, ty: JavaElement, info: Option<Arc<ElementInfo>>) {
        let entry = match info {
            Some(info) => JarTypeEntry::Info(info),
            None => JarTypeEntry::NonExisting,
        };
        self.cache.lock().put_jar_type_info(ty, entry);
    }

    pub fn remove_from_jar_type_cache(&self, ty: &JavaElement) {
        self.cache.lock().remove_from_jar_type_cache(ty);
    }

    pub fn reset_jar_type_cache(&self) {
        self.cache.lock().reset_jar_type_cache();
    }

    pub fn openable_cache_size(&self) -> usize {
        self.cache.lock().openable_cache_size()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn fill_ratio_report(&self) -> String {
        self.cache.lock().fill_ratio_report()
    }

    /// Best-effort binding key. A resolved handle answers with its own key.
    /// Otherwise the key is computed from the declaring type and the member
    /// name; `force_open` adds the member's type from its body and fails
    /// when the body cannot be opened.
    pub fn key(&self, element: &JavaElement, force_open: bool) -> Result<String> {
        if let Some(key) = element.unique_key() {
            return Ok(key.to_string());
        }
        let declaring = || element.declaring_type_of().map(|t| type_key(&t)).unwrap_or_default();
        match element.element_type() {
            ElementType::Type => Ok(type_key(element)),
            ElementType::Field => {
                let mut key = format!("{}.{})", declaring(), element.name());
                if force_open {
                    let info = self.element_info(element)?;
                    if let InfoDetail::Field(field) = info.detail() {
                        key.push_str(&member_signature(element, &field.type_name));
                    }
                }
                Ok(key)
            }
            ElementType::Method => {
                let mut key = format!(
                    "{}.{}({})",
                    declaring(),
                    element.name(),
                    element.parameter_types().concat()
                );
                if force_open {
                    let info = self.element_info(element)?;
                    if let InfoDetail::Method(method) = info.detail() {
                        match &method.return_type {
                            Some(return_type) => key.push_str(&member_signature(element, return_type)),
                            None => key.push('V'),
                        }
                    }
                }
                Ok(key)
            }
            _ => Ok(element.handle_memento()),
        }
    }

    /// Opens a buffer on a compilation unit's current content.
    pub fn open_buffer(&self, unit: &JavaElement) -> Result<Buffer> {
        let path = self
            .workspace
            .resource_path(unit)
            .ok_or_else(|| ModelError::DoesNotExist(unit.clone()))?;
        let read_only = unit.is_binary()
            || unit
                .package_fragment_root_of()
                .is_some_and(|root| root.is_archive());
        self.buffers.open_buffer(unit, &path, read_only)
    }

    /// Text of a compilation unit, from its buffer when one is open.
    pub fn source_of(&self, unit: &JavaElement) -> Result<String> {
        if let Some(contents) = self.buffers.contents(unit) {
            return Ok(contents);
        }
        let path = self
            .workspace
            .resource_path(unit)
            .ok_or_else(|| ModelError::DoesNotExist(unit.clone()))?;
        self.workspace
            .content()
            .read_to_string(&path)
            .map_err(|e| not_found_or_io(unit, &path, e))
    }

    /// Adds a project registered with the workspace after the model opened.
    pub fn project_added(&self, name: &str) {
        if let Some(info) = self.peek_info(&self.model) {
            info.add_child(self.model.project(name));
        }
    }

    pub fn project_removed(&self, name: &str) -> Result<()> {
        let project = self.model.project(name);
        self.close(&project)?;
        if let Some(info) = self.peek_info(&self.model) {
            info.remove_child(&project);
        }
        Ok(())
    }

    fn build(&self, openable: &JavaElement) -> Result<Bodies> {
        match openable.element_type() {
            ElementType::Model => {
                let children = self
                    .workspace
                    .project_names()
                    .iter()
                    .map(|name| self.model.project(name))
                    .collect();
                Ok(vec![(
                    openable.clone(),
                    ElementInfo::new(InfoDetail::Model).with_children(children).known(),
                )])
            }
            ElementType::Project => self.build_project(openable),
            ElementType::PackageFragmentRoot => self.build_root(openable),
            ElementType::PackageFragment => self.build_package(openable),
            ElementType::CompilationUnit => {
                let source = self.source_of(openable)?;
                structure::build_compilation_unit(openable, &source)
            }
            ElementType::ClassFile => {
                let bytes = self.class_file_bytes(openable)?;
                structure::build_class_file(openable, &bytes)
            }
            _ => Err(ModelError::InvalidElementTypes {
                element: openable.clone(),
                message: "not an openable".to_string(),
            }),
        }
    }

    fn build_project(&self, project: &JavaElement) -> Result<Bodies> {
        let config = self
            .workspace
            .project(project.name())
            .ok_or_else(|| ModelError::DoesNotExist(project.clone()))?;
        if !self.workspace.content().exists(&config.location) {
            return Err(ModelError::DoesNotExist(project.clone()));
        }
        let roots = self
            .workspace
            .resolve_roots(project.name())
            .map_err(|e| ModelError::io(project.name(), e))?;
        let children = roots
            .iter()
            .map(|root| project.package_fragment_root(&root.path, root.archive))
            .collect();
        let info = ElementInfo::new(InfoDetail::Project {
            location: config.location.display().to_string(),
        })
        .with_children(children)
        .known();
        Ok(vec![(project.clone(), info)])
    }

    fn root_location(&self, root: &JavaElement) -> Result<PathBuf> {
        let location = root
            .parent()
            .and_then(|project| self.workspace.root_location(project.name(), root.name()))
            .ok_or_else(|| ModelError::DoesNotExist(root.clone()))?;
        if !self.workspace.content().exists(&location) {
            return Err(ModelError::DoesNotExist(root.clone()));
        }
        Ok(location)
    }

    fn build_root(&self, root: &JavaElement) -> Result<Bodies> {
        let location = self.root_location(root)?;
        if !root.is_archive() {
            let children = scan::package_names(&location)
                .iter()
                .map(|name| root.package_fragment(name))
                .collect();
            let info = ElementInfo::new(InfoDetail::Root {
                archive: false,
                non_java_resources: 0,
            })
            .with_children(children)
            .known();
            return Ok(vec![(root.clone(), info)]);
        }

        // packages of an archive are known as soon as its directory is read
        let listing = archive::list(&location)?;
        let mut bodies = Vec::with_capacity(listing.packages.len() + 1);
        let mut children = Vec::with_capacity(listing.packages.len());
        for (name, files) in &listing.packages {
            let package = root.package_fragment(name);
            let class_files = files.iter().map(|file| package.class_file(file)).collect();
            bodies.push((
                package.clone(),
                ElementInfo::new(InfoDetail::Package {
                    non_java_resources: 0,
                })
                .with_children(class_files)
                .known(),
            ));
            children.push(package);
        }
        let info = ElementInfo::new(InfoDetail::Root {
            archive: true,
            non_java_resources: listing.non_java_resources,
        })
        .with_children(children)
        .known();
        bodies.insert(0, (root.clone(), info));
        Ok(bodies)
    }

    fn build_package(&self, package: &JavaElement) -> Result<Bodies> {
        let root = package
            .parent()
            .ok_or_else(|| ModelError::DoesNotExist(package.clone()))?;
        let location = self.root_location(root)?;

        let (children, non_java_resources) = if root.is_archive() {
            let listing = archive::list(&location)?;
            let files = listing
                .packages
                .get(package.name())
                .ok_or_else(|| ModelError::DoesNotExist(package.clone()))?;
            (files.iter().map(|file| package.class_file(file)).collect(), 0)
        } else {
            let mut dir = location;
            for segment in package.name().split('.').filter(|s| !s.is_empty()) {
                dir.push(segment);
            }
            if !self.workspace.content().exists(&dir) {
                return Err(ModelError::DoesNotExist(package.clone()));
            }
            let entries = scan::package_entries(&dir);
            let children: Vec<JavaElement> = entries
                .compilation_units
                .iter()
                .map(|name| package.compilation_unit(name))
                .chain(entries.class_files.iter().map(|name| package.class_file(name)))
                .collect();
            (children, entries.non_java_resources)
        };

        let info = ElementInfo::new(InfoDetail::Package { non_java_resources })
            .with_children(children)
            .known();
        Ok(vec![(package.clone(), info)])
    }

    fn class_file_bytes(&self, class_file: &JavaElement) -> Result<Vec<u8>> {
        let path = self
            .workspace
            .resource_path(class_file)
            .ok_or_else(|| ModelError::DoesNotExist(class_file.clone()))?;
        let in_archive = class_file
            .package_fragment_root_of()
            .is_some_and(|root| root.is_archive());
        if !in_archive {
            return self
                .workspace
                .content()
                .read(&path)
                .map_err(|e| not_found_or_io(class_file, &path, e));
        }

        let package = class_file
            .ancestor(ElementType::PackageFragment)
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        let entry = archive::entry_name(&package, class_file.name());
        match archive::read_entry(&path, &entry) {
            Ok(bytes) => Ok(bytes),
            Err(ArchiveError::MissingEntry { .. }) => Err(ModelError::DoesNotExist(class_file.clone())),
            Err(err) => {
                warn!(target: "jmodel.model", element = %class_file, error = %err, "cannot read class file");
                Err(err.into())
            }
        }
    }
}

fn not_found_or_io(element: &JavaElement, path: &std::path::Path, err: io::Error) -> ModelError {
    if err.kind() == io::ErrorKind::NotFound {
        ModelError::DoesNotExist(element.clone())
    } else {
        ModelError::io(path.display().to_string(), err)
    }
}

fn type_key(ty: &JavaElement) -> String {
    format!("L{};", ty.fully_qualified_name('$').replace('.', "/"))
}

/// Binary members already store signatures; source members store names.
fn member_signature(element: &JavaElement, type_name: &str) -> String {
    if element.is_binary() {
        type_name.to_string()
    } else {
        create_type_signature(type_name)
    }
}

pub trait Parent {
    fn children(&self, manager: &ElementManager) -> Result<Vec<JavaElement>>;
    fn has_children(&self, manager: &ElementManager) -> Result<bool>;
}

impl Parent for JavaElement {
    fn children(&self, manager: &ElementManager) -> Result<Vec<JavaElement>> {
        manager.children(self)
    }

    fn has_children(&self, manager: &ElementManager) -> Result<bool> {
        manager.has_children(self)
    }
}

pub trait SourceReference {
    /// `None` for binary elements.
    fn source(&self, manager: &ElementManager) -> Result<Option<String>>;
    fn source_range(&self, manager: &ElementManager) -> Result<Option<SourceRange>>;
    fn name_range(&self, manager: &ElementManager) -> Result<Option<SourceRange>>;
}

impl SourceReference for JavaElement {
    fn source(&self, manager: &ElementManager) -> Result<Option<String>> {
        if self.is_binary() {
            return Ok(None);
        }
        let Some(range) = self.source_range(manager)? else {
            return Ok(None);
        };
        let unit = self.openable();
        let text = manager.source_of(&unit)?;
        Ok(text.get(range.offset..range.end()).map(str::to_string))
    }

    fn source_range(&self, manager: &ElementManager) -> Result<Option<SourceRange>> {
        Ok(manager.element_info(self)?.source_range())
    }

    fn name_range(&self, manager: &ElementManager) -> Result<Option<SourceRange>> {
        Ok(manager.element_info(self)?.name_range())
    }
}

pub trait Member {
    fn flags(&self, manager: &ElementManager) -> Result<Modifiers>;
    fn declaring_type(&self) -> Option<JavaElement>;
    /// `@category` tags from the member's doc comment.
    fn categories(&self, manager: &ElementManager) -> Result<Vec<String>>;
}

impl Member for JavaElement {
    fn flags(&self, manager: &ElementManager) -> Result<Modifiers> {
        Ok(manager.element_info(self)?.modifiers())
    }

    fn declaring_type(&self) -> Option<JavaElement> {
        self.declaring_type_of()
    }

    fn categories(&self, manager: &ElementManager) -> Result<Vec<String>> {
        let holder = match self.declaring_type_of() {
            Some(declaring) => declaring,
            None if self.element_type() == ElementType::Type => self.clone(),
            None => return Ok(Vec::new()),
        };
        let info = manager.element_info(&holder)?;
        let InfoDetail::Type(detail) = info.detail() else {
            return Ok(Vec::new());
        };
        Ok(detail
            .categories
            .get(&self.handle_memento())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::workspace::{ProjectConfig, RootEntry};
    use anyhow::Result;
    use std::fs;
    use std::io::Write;
    use std::path::Path;
    use zip::write::FileOptions;

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
        let file = fs::File::create(path)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, content) in entries {
            zip.start_file(*name, options)?;
            zip.write_all(content)?;
        }
        zip.finish()?;
        Ok(())
    }

    fn manager_for(location: &Path, roots: Vec<RootEntry>) -> ElementManager {
        let workspace = Arc::new(Workspace::on_filesystem());
        let mut config = ProjectConfig::new("P", location);
        for root in roots {
            config = config.with_root(root);
        }
        workspace.add_project(config);
        let context = Arc::new(ModelContext::new(CacheConfig::default().with_memory_ratio(1.0)));
        ElementManager::new(context, workspace)
    }

    #[test]
    fn opening_a_member_opens_its_ancestors() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("src/p"))?;
        fs::write(
            dir.path().join("src/p/A.java"),
            "package p;\n/** @category util */\npublic class A { int x; void run() {} }\n",
        )?;
        let manager = manager_for(dir.path(), vec![RootEntry::folder("src")]);
        let unit = manager
            .model()
            .project("P")
            .package_fragment_root("src", false)
            .package_fragment("p")
            .compilation_unit("A.java");
        let ty = unit.type_("A");

        assert_eq!(ty.flags(&manager)?, Modifiers::PUBLIC);
        assert!(manager.is_open(&unit));
        assert!(manager.is_open(unit.parent().unwrap()));
        assert!(manager.exists(&ty.field("x")));
        assert!(!manager.exists(&ty.field("y")));
        assert!(!manager.exists(&unit.parent().unwrap().compilation_unit("B.java")));
        assert_eq!(ty.categories(&manager)?, vec!["util"]);
        assert_eq!(
            ty.method("run", &[]).source(&manager)?.as_deref(),
            Some("void run() {}")
        );

        let err = manager.element_info(&ty.field("y")).unwrap_err();
        assert!(err.is_does_not_exist());
        Ok(())
    }

    #[test]
    fn dirty_units_survive_close_and_rebuild_from_the_buffer() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("src"))?;
        fs::write(dir.path().join("src/A.java"), "class A {}")?;
        let manager = manager_for(dir.path(), vec![RootEntry::folder("src")]);
        let unit = manager
            .model()
            .project("P")
            .package_fragment_root("src", false)
            .package_fragment("")
            .compilation_unit("A.java");

        assert!(!manager.has_children(&unit.type_("A"))?);
        manager.open_buffer(&unit)?;
        manager.buffers().set_contents(&unit, "class A { int y; }")?;
        manager.close(&unit)?;
        assert!(manager.is_open(&unit));

        manager.make_consistent(&unit)?;
        assert!(manager.exists(&unit.type_("A").field("y")));
        assert!(manager.buffers().buffer(&unit).is_some());
        Ok(())
    }

    #[test]
    fn archive_types_use_the_jar_type_cache_when_the_root_is_closed() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let sample = crate::classfile::tests::sample_class();
        write_jar(&dir.path().join("lib.jar"), &[("p/Sample.class", &sample)])?;
        let manager = manager_for(dir.path(), vec![RootEntry::archive("lib.jar")]);
        let root = manager.model().project("P").package_fragment_root("lib.jar", true);
        let package = root.package_fragment("p");
        let ty = package.class_file("Sample.class").type_("Sample");

        let info = manager.binary_type_info(&ty)?;
        assert_eq!(info.child_count(), 3);
        assert!(!manager.is_open(&root));
        assert!(manager.peek_info(&ty).is_some());

        let missing = package.class_file("Gone.class").type_("Gone");
        assert!(manager.binary_type_info(&missing).unwrap_err().is_does_not_exist());

        assert!(manager.children(&root)?.contains(&package));
        assert!(manager.is_open(&package));
        manager.close(&root)?;
        assert!(!manager.is_open(&package));
        assert!(manager.peek_info(&ty).is_none());
        Ok(())
    }

    #[test]
    fn binary_keys_need_force_open_for_member_types() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let sample = crate::classfile::tests::sample_class();
        write_jar(&dir.path().join("lib.jar"), &[("p/Sample.class", &sample)])?;
        let manager = manager_for(dir.path(), vec![RootEntry::archive("lib.jar")]);
        let ty = manager
            .model()
            .project("P")
            .package_fragment_root("lib.jar", true)
            .package_fragment("p")
            .class_file("Sample.class")
            .type_("Sample");
        let method = ty.method("name", &["I", "[Ljava.lang.String;"]);

        assert_eq!(manager.key(&ty, false)?, "Lp/Sample;");
        assert_eq!(manager.key(&method, false)?, "Lp/Sample;.name(I[Ljava.lang.String;)");
        assert_eq!(
            manager.key(&method, true)?,
            "Lp/Sample;.name(I[Ljava.lang.String;)Ljava.lang.String;"
        );
        assert_eq!(manager.key(&ty.field("MAX"), true)?, "Lp/Sample;.MAX)I");
        assert!(manager.key(&ty.field("NOPE"), true).is_err());
        Ok(())
    }

    #[test]
    fn bulk_open_stops_when_cancelled() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("src"))?;
        let manager = manager_for(dir.path(), vec![RootEntry::folder("src")]);
        let project = manager.model().project("P");
        let token = CancellationToken::new();
        assert_eq!(manager.open_all(&[project.clone()], &token)?, 1);

        token.cancel();
        let err = manager
            .open_all(&[project.package_fragment_root("src", false)], &token)
            .unwrap_err();
        assert_eq!(err.status(), crate::error::ModelStatus::Cancelled);
        Ok(())
    }

    #[test]
    fn projects_follow_the_workspace() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let manager = manager_for(dir.path(), Vec::new());
        assert_eq!(manager.children(manager.model())?, vec![manager.model().project("P")]);
        assert!(!manager.exists(&manager.model().project("Q")));

        manager
            .workspace()
            .add_project(ProjectConfig::new("Q", dir.path()));
        manager.project_added("Q");
        assert!(manager.exists(&manager.model().project("Q")));
        Ok(())
    }
}
