//! Tiered body cache.
//!
//! Projects and member bodies live in plain maps; roots, packages and
//! openables each live in an overflowing LRU tier whose space limit scales
//! with the memory ratio. Opening a container grows the next inner tier so
//! the container's freshly built children fit without evicting each other.
//! Binary types read straight out of an archive whose root is not resident
//! go to a separate bounded LRU.

use lru::LruCache;
use serde::Serialize;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::element::{ElementType, JavaElement};
use crate::info::{ElementInfo, InfoDetail};

pub const DEFAULT_PROJECT_SIZE: usize = 5;
pub const DEFAULT_ROOT_SIZE: usize = 50;
pub const DEFAULT_PKG_SIZE: usize = 500;
pub const DEFAULT_OPENABLE_SIZE: usize = 250;
pub const DEFAULT_CHILDREN_SIZE: usize = 250 * 20;

const LOAD_FACTOR: f64 = 0.333;

/// Decides whether an openable may leave the cache under memory pressure
/// and releases what it holds once it has.
pub trait EvictionPolicy {
    fn can_evict(&self, element: &JavaElement) -> bool;

    fn evicted(&self, _element: &JavaElement) {}
}

/// Evicts anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvictAll;

impl EvictionPolicy for EvictAll {
    fn can_evict(&self, _element: &JavaElement) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub enum JarTypeEntry {
    Info(Arc<ElementInfo>),
    /// A cached negative lookup.
    NonExisting,
}

type Evicted = Vec<(JavaElement, Arc<ElementInfo>)>;

/// One overflowing LRU tier. Every entry takes one unit of space.
pub struct ElementCache {
    name: &'static str,
    entries: LruCache<JavaElement, Arc<ElementInfo>>,
    space_limit: usize,
    overflow: usize,
    space_limit_parent: Option<JavaElement>,
}

impl ElementCache {
    pub fn new(name: &'static str, space_limit: usize) -> Self {
        Self {
            name,
            entries: LruCache::unbounded(),
            space_limit: space_limit.max(1),
            overflow: 0,
            space_limit_parent: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn space_limit(&self) -> usize {
        self.space_limit
    }

    pub fn overflow(&self) -> usize {
        self.overflow
    }

    pub fn get(&mut self, key: &JavaElement) -> Option<Arc<ElementInfo>> {
        self.entries.get(key).cloned()
    }

    pub fn peek(&self, key: &JavaElement) -> Option<Arc<ElementInfo>> {
        self.entries.peek(key).cloned()
    }

    pub fn contains(&self, key: &JavaElement) -> bool {
        self.entries.contains(key)
    }

    /// The stored key equal to `key`, without touching recency.
    pub fn key(&self, key: &JavaElement) -> Option<JavaElement> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(k, _)| k.clone())
    }

    pub fn keys(&self) -> impl Iterator<Item = &JavaElement> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn put(
        &mut self,
        key: JavaElement,
        value: Arc<ElementInfo>,
        policy: &dyn EvictionPolicy,
    ) -> Evicted {
        let mut evicted = Vec::new();
        if self.overflow > 0 {
            self.make_space(0, policy, &mut evicted);
        }
        if self.entries.contains(&key) {
            if self.entries.len() <= self.space_limit {
                self.entries.put(key, value);
                self.overflow = 0;
                return evicted;
            }
            self.entries.pop(&key);
        }
        self.make_space(1, policy, &mut evicted);
        self.entries.put(key, value);
        evicted
    }

    pub fn remove(&mut self, key: &JavaElement) -> Option<Arc<ElementInfo>> {
        self.entries.pop(key)
    }

    /// Frees space by dropping least recently used entries until `space` more
    /// fit, aiming for a third of the limit. Vetoed entries stay put; what
    /// cannot be freed is recorded as overflow.
    fn make_space(
        &mut self,
        space: usize,
        policy: &dyn EvictionPolicy,
        evicted: &mut Evicted,
    ) -> bool {
        let limit = self.space_limit;
        if self.overflow == 0 && self.entries.len() + space <= limit {
            return true;
        }

        let needed = (((1.0 - LOAD_FACTOR) * limit as f64) as usize).max(space);
        let candidates: Vec<JavaElement> =
            self.entries.iter().rev().map(|(k, _)| k.clone()).collect();
        for key in candidates {
            if self.entries.len() + needed <= limit {
                break;
            }
            if !policy.can_evict(&key) {
                debug!(target: "jmodel.cache", tier = self.name, element = %key, "eviction refused");
                continue;
            }
            if let Some(info) = self.entries.pop(&key) {
                trace!(target: "jmodel.cache", tier = self.name, element = %key, "evicted");
                evicted.push((key, info));
            }
        }

        if self.entries.len() + space <= limit {
            self.overflow = 0;
            return true;
        }
        self.overflow = self.entries.len() + space - limit;
        false
    }

    pub fn set_space_limit(&mut self, limit: usize, policy: &dyn EvictionPolicy) -> Evicted {
        let limit = limit.max(1);
        let mut evicted = Vec::new();
        if limit < self.space_limit {
            self.make_space(self.space_limit - limit, policy, &mut evicted);
        }
        self.space_limit = limit;
        evicted
    }

    /// Grows the limit so `child_count` new entries fit next to what is
    /// already resident, remembering `parent` as the reason.
    pub fn ensure_space_limit(
        &mut self,
        child_count: usize,
        parent: &JavaElement,
        policy: &dyn EvictionPolicy,
    ) -> Evicted {
        let needed = 1 + ((1.0 + LOAD_FACTOR) * (child_count + self.overflow) as f64) as usize;
        let mut evicted = Vec::new();
        if self.space_limit < needed {
            self.make_space(0, policy, &mut evicted);
            debug!(
                target: "jmodel.cache",
                tier = self.name,
                from = self.space_limit,
                to = needed,
                parent = %parent,
                "growing space limit"
            );
            evicted.extend(self.set_space_limit(needed, policy));
            self.space_limit_parent = Some(parent.clone());
        }
        evicted
    }

    /// Restores `default_limit` if `parent` was the one that grew the tier.
    pub fn reset_space_limit(
        &mut self,
        default_limit: usize,
        parent: &JavaElement,
        policy: &dyn EvictionPolicy,
    ) -> Evicted {
        if self.space_limit_parent.as_ref() != Some(parent) {
            return Vec::new();
        }
        debug!(
            target: "jmodel.cache",
            tier = self.name,
            to = default_limit,
            parent = %parent,
            "resetting space limit"
        );
        self.space_limit_parent = None;
        self.set_space_limit(default_limit, policy)
    }

    pub fn fill_ratio(&self) -> f64 {
        (self.entries.len() + self.overflow) as f64 * 100.0 / self.space_limit as f64
    }

    pub fn fill_ratio_report(&self, label: &str) -> String {
        format!(
            "{label}: {:.1}% full ({}/{})",
            self.fill_ratio(),
            self.entries.len(),
            self.space_limit
        )
    }

    fn stats(&self) -> TierStats {
        TierStats {
            len: self.entries.len(),
            limit: self.space_limit,
            overflow: self.overflow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub len: usize,
    pub limit: usize,
    pub overflow: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub memory_ratio: f64,
    pub projects: usize,
    pub roots: TierStats,
    pub packages: TierStats,
    pub openables: TierStats,
    pub children: usize,
    pub jar_types: TierStats,
}

pub struct ModelCache {
    memory_ratio: f64,
    openable_ratio: f64,
    jar_type_ratio: f64,
    model_info: Option<Arc<ElementInfo>>,
    project_cache: HashMap<JavaElement, Arc<ElementInfo>>,
    root_cache: ElementCache,
    pkg_cache: ElementCache,
    openable_cache: ElementCache,
    children_cache: HashMap<JavaElement, Arc<ElementInfo>>,
    jar_type_cache: LruCache<JavaElement, JarTypeEntry>,
}

fn scaled(base: usize, factor: f64) -> usize {
    ((base as f64 * factor) as usize).max(1)
}

impl ModelCache {
    pub fn new(config: &CacheConfig) -> Self {
        let ratio = config.resolve_memory_ratio();
        let openable_ratio = config.openable_ratio;
        debug!(target: "jmodel.cache", memory_ratio = ratio, openable_ratio, "creating model cache");
        Self {
            memory_ratio: ratio,
            openable_ratio,
            jar_type_ratio: config.jar_type_ratio,
            model_info: None,
            project_cache: HashMap::with_capacity(DEFAULT_PROJECT_SIZE),
            root_cache: ElementCache::new("root", scaled(DEFAULT_ROOT_SIZE, ratio)),
            pkg_cache: ElementCache::new("package", scaled(DEFAULT_PKG_SIZE, ratio)),
            openable_cache: ElementCache::new(
                "openable",
                scaled(DEFAULT_OPENABLE_SIZE, ratio * openable_ratio),
            ),
            children_cache: HashMap::with_capacity(scaled(
                DEFAULT_CHILDREN_SIZE,
                ratio * openable_ratio,
            )),
            jar_type_cache: LruCache::new(jar_type_capacity(ratio, config.jar_type_ratio)),
        }
    }

    pub fn memory_ratio(&self) -> f64 {
        self.memory_ratio
    }

    fn default_root_limit(&self) -> usize {
        scaled(DEFAULT_ROOT_SIZE, self.memory_ratio)
    }

    fn default_pkg_limit(&self) -> usize {
        scaled(DEFAULT_PKG_SIZE, self.memory_ratio)
    }

    fn default_openable_limit(&self) -> usize {
        scaled(DEFAULT_OPENABLE_SIZE, self.memory_ratio * self.openable_ratio)
    }

    pub fn get(&mut self, element: &JavaElement) -> Option<Arc<ElementInfo>> {
        match element.element_type() {
            ElementType::Model => self.model_info.clone(),
            ElementType::Project => self.project_cache.get(element).cloned(),
            ElementType::PackageFragmentRoot => self.root_cache.get(element),
            ElementType::PackageFragment => self.pkg_cache.get(element),
            ElementType::CompilationUnit | ElementType::ClassFile => {
                self.openable_cache.get(element)
            }
            ElementType::Type => match self.jar_type_cache.get(element) {
                Some(JarTypeEntry::Info(info)) => Some(info.clone()),
                Some(JarTypeEntry::NonExisting) => None,
                None => self.children_cache.get(element).cloned(),
            },
            _ => self.children_cache.get(element).cloned(),
        }
    }

    /// Like [`get`](Self::get) but leaves recency untouched.
    pub fn peek(&self, element: &JavaElement) -> Option<Arc<ElementInfo>> {
        match element.element_type() {
            ElementType::Model => self.model_info.clone(),
            ElementType::Project => self.project_cache.get(element).cloned(),
            ElementType::PackageFragmentRoot => self.root_cache.peek(element),
            ElementType::PackageFragment => self.pkg_cache.peek(element),
            ElementType::CompilationUnit | ElementType::ClassFile => {
                self.openable_cache.peek(element)
            }
            ElementType::Type => match self.jar_type_cache.peek(element) {
                Some(JarTypeEntry::Info(info)) => Some(info.clone()),
                Some(JarTypeEntry::NonExisting) => None,
                None => self.children_cache.get(element).cloned(),
            },
            _ => self.children_cache.get(element).cloned(),
        }
    }

    /// The resident handle equal to `element`; `None` when a tiered element
    /// is not cached.
    pub fn get_existing_element(&self, element: &JavaElement) -> Option<JavaElement> {
        match element.element_type() {
            ElementType::PackageFragmentRoot => self.root_cache.key(element),
            ElementType::PackageFragment => self.pkg_cache.key(element),
            ElementType::CompilationUnit | ElementType::ClassFile => {
                self.openable_cache.key(element)
            }
            ElementType::Type => Some(
                self.jar_type_cache
                    .iter()
                    .find(|(k, _)| *k == element)
                    .map(|(k, _)| k.clone())
                    .unwrap_or_else(|| element.clone()),
            ),
            _ => Some(element.clone()),
        }
    }

    /// Inserts one body. Returns the elements closed to make room.
    pub fn put(
        &mut self,
        element: JavaElement,
        info: Arc<ElementInfo>,
        policy: &dyn EvictionPolicy,
    ) -> Vec<JavaElement> {
        let child_count = info.child_count();
        let evicted = match element.element_type() {
            ElementType::Model => {
                self.model_info = Some(info);
                Vec::new()
            }
            ElementType::Project => {
                self.project_cache.insert(element.clone(), info);
                self.root_cache
                    .ensure_space_limit(child_count, &element, policy)
            }
            ElementType::PackageFragmentRoot => {
                let mut evicted = self.root_cache.put(element.clone(), info, policy);
                evicted.extend(self.pkg_cache.ensure_space_limit(child_count, &element, policy));
                evicted
            }
            ElementType::PackageFragment => {
                let mut evicted = self.pkg_cache.put(element.clone(), info, policy);
                evicted.extend(
                    self.openable_cache
                        .ensure_space_limit(child_count, &element, policy),
                );
                evicted
            }
            ElementType::CompilationUnit | ElementType::ClassFile => {
                self.openable_cache.put(element, info, policy)
            }
            _ => {
                self.children_cache.insert(element, info);
                Vec::new()
            }
        };
        self.close_evicted(evicted, policy)
    }

    /// Inserts a batch from one structure build. Archive roots go first so
    /// the package tier is grown before their packages arrive.
    pub fn put_all(
        &mut self,
        infos: Vec<(JavaElement, Arc<ElementInfo>)>,
        policy: &dyn EvictionPolicy,
    ) -> Vec<JavaElement> {
        let (roots, rest): (Vec<_>, Vec<_>) = infos
            .into_iter()
            .partition(|(element, _)| element.element_type() == ElementType::PackageFragmentRoot);
        let mut closed = Vec::new();
        for (element, info) in roots.into_iter().chain(rest) {
            closed.extend(self.put(element, info, policy));
        }
        closed
    }

    /// Removes one body and resets any tier limit it had grown.
    pub fn remove(
        &mut self,
        element: &JavaElement,
        policy: &dyn EvictionPolicy,
    ) -> Option<Arc<ElementInfo>> {
        let (removed, evicted) = match element.element_type() {
            ElementType::Model => (self.model_info.take(), Vec::new()),
            ElementType::Project => {
                let removed = self.project_cache.remove(element);
                let limit = self.default_root_limit();
                (removed, self.root_cache.reset_space_limit(limit, element, policy))
            }
            ElementType::PackageFragmentRoot => {
                let removed = self.root_cache.remove(element);
                let limit = self.default_pkg_limit();
                (removed, self.pkg_cache.reset_space_limit(limit, element, policy))
            }
            ElementType::PackageFragment => {
                let removed = self.pkg_cache.remove(element);
                let limit = self.default_openable_limit();
                (
                    removed,
                    self.openable_cache.reset_space_limit(limit, element, policy),
                )
            }
            ElementType::CompilationUnit | ElementType::ClassFile => {
                (self.openable_cache.remove(element), Vec::new())
            }
            _ => (self.children_cache.remove(element), Vec::new()),
        };
        self.close_evicted(evicted, policy);
        removed
    }

    /// Removes `element` and every resident descendant. Returns the closed
    /// openables, `element` included when it was resident.
    pub fn remove_info_and_children(
        &mut self,
        element: &JavaElement,
        policy: &dyn EvictionPolicy,
    ) -> Vec<JavaElement> {
        let mut closed = Vec::new();
        if let Some(info) = self.remove(element, policy) {
            self.close_subtree(element, &info, policy, &mut closed);
        }
        closed
    }

    fn close_evicted(&mut self, evicted: Evicted, policy: &dyn EvictionPolicy) -> Vec<JavaElement> {
        let mut closed = Vec::new();
        for (element, info) in evicted {
            self.close_subtree(&element, &info, policy, &mut closed);
        }
        closed
    }

    fn close_subtree(
        &mut self,
        element: &JavaElement,
        info: &ElementInfo,
        policy: &dyn EvictionPolicy,
        closed: &mut Vec<JavaElement>,
    ) {
        for child in info.children().iter() {
            if let Some(child_info) = self.remove(child, policy) {
                self.close_subtree(child, &child_info, policy, closed);
            }
        }
        if let Some(annotations) = info.detail().annotations() {
            for annotation in annotations {
                self.children_cache.remove(&annotation.handle(element));
            }
        }
        let type_parameters = match info.detail() {
            InfoDetail::Type(detail) => detail.type_parameters.as_slice(),
            InfoDetail::Method(detail) => detail.type_parameters.as_slice(),
            _ => &[],
        };
        for parameter in type_parameters {
            self.children_cache.remove(&element.type_parameter(&parameter.name));
        }
        if element.is_archive() {
            self.flush_jar_types_of(element);
        }
        if element.element_type().is_openable() {
            policy.evicted(element);
            closed.push(element.clone());
        }
    }

    pub fn jar_type(&mut self, element: &JavaElement) -> Option<JarTypeEntry> {
        self.jar_type_cache.get(element).cloned()
    }

    pub fn put_jar_type_info(&mut self, element: JavaElement, entry: JarTypeEntry) {
        self.jar_type_cache.put(element, entry);
    }

    pub fn remove_from_jar_type_cache(&mut self, element: &JavaElement) {
        self.jar_type_cache.pop(element);
    }

    /// Drops every jar type read out of `root`.
    pub fn flush_jar_types_of(&mut self, root: &JavaElement) {
        let stale: Vec<JavaElement> = self
            .jar_type_cache
            .iter()
            .filter(|(k, _)| root.is_ancestor_of(k))
            .map(|(k, _)| k.clone())
            .collect();
        if !stale.is_empty() {
            debug!(target: "jmodel.cache", root = %root, count = stale.len(), "flushing jar types");
        }
        for key in stale {
            self.jar_type_cache.pop(&key);
        }
    }

    pub fn reset_jar_type_cache(&mut self) {
        self.jar_type_cache = LruCache::new(jar_type_capacity(self.memory_ratio, self.jar_type_ratio));
    }

    pub fn openable_cache_size(&self) -> usize {
        self.openable_cache.space_limit()
    }

    pub fn fill_ratio_report(&self) -> String {
        let jar_limit = self.jar_type_cache.cap().get();
        format!(
            "Project cache: {} projects\n{}\n{}\n{}\nJar type cache: {:.1}% full ({}/{})\n",
            self.project_cache.len(),
            self.root_cache.fill_ratio_report("Root cache"),
            self.pkg_cache.fill_ratio_report("Package cache"),
            self.openable_cache.fill_ratio_report("Openable cache"),
            self.jar_type_cache.len() as f64 * 100.0 / jar_limit as f64,
            self.jar_type_cache.len(),
            jar_limit,
        )
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_ratio: self.memory_ratio,
            projects: self.project_cache.len(),
            roots: self.root_cache.stats(),
            packages: self.pkg_cache.stats(),
            openables: self.openable_cache.stats(),
            children: self.children_cache.len(),
            jar_types: TierStats {
                len: self.jar_type_cache.len(),
                limit: self.jar_type_cache.cap().get(),
                overflow: 0,
            },
        }
    }
}

fn jar_type_capacity(memory_ratio: f64, jar_type_ratio: f64) -> NonZeroUsize {
    NonZeroUsize::new(scaled(DEFAULT_OPENABLE_SIZE, memory_ratio * jar_type_ratio))
        .unwrap_or(NonZeroUsize::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::{InfoDetail, OpenableDetail};
    use std::collections::HashSet;

    struct Dirty(HashSet<JavaElement>);

    impl EvictionPolicy for Dirty {
        fn can_evict(&self, element: &JavaElement) -> bool {
            !self.0.contains(element)
        }
    }

    fn openable_info() -> Arc<ElementInfo> {
        Arc::new(ElementInfo::new(InfoDetail::Openable(OpenableDetail::default())))
    }

    fn package() -> JavaElement {
        JavaElement::model()
            .project("P")
            .package_fragment_root("src", false)
            .package_fragment("p")
    }

    #[test]
    fn tier_evicts_least_recent_first() {
        let pkg = package();
        let mut tier = ElementCache::new("openable", 3);
        for name in ["A.java", "B.java", "C.java"] {
            assert!(tier.put(pkg.compilation_unit(name), openable_info(), &EvictAll).is_empty());
        }
        tier.get(&pkg.compilation_unit("A.java"));
        let evicted = tier.put(pkg.compilation_unit("D.java"), openable_info(), &EvictAll);
        let names: Vec<_> = evicted.iter().map(|(k, _)| k.name().to_string()).collect();
        assert_eq!(names, ["B.java", "C.java"]);
        assert!(tier.contains(&pkg.compilation_unit("A.java")));
    }

    #[test]
    fn dirty_entries_are_never_evicted() {
        let pkg = package();
        let dirty_unit = pkg.compilation_unit("A.java");
        let policy = Dirty(HashSet::from([dirty_unit.clone()]));
        let mut tier = ElementCache::new("openable", 2);
        tier.put(dirty_unit.clone(), openable_info(), &policy);
        tier.put(pkg.compilation_unit("B.java"), openable_info(), &policy);
        let evicted = tier.put(pkg.compilation_unit("C.java"), openable_info(), &policy);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].0.name(), "B.java");
        assert!(tier.contains(&dirty_unit));

        let stuck = tier.put(pkg.compilation_unit("D.java"), openable_info(), &Dirty(
            HashSet::from([
                dirty_unit.clone(),
                pkg.compilation_unit("C.java"),
            ]),
        ));
        assert!(stuck.is_empty());
        assert_eq!(tier.len(), 3);
        assert_eq!(tier.overflow(), 1);
    }

    #[test]
    fn space_limit_grows_for_parent_and_resets() {
        let pkg = package();
        let mut tier = ElementCache::new("openable", 4);
        tier.ensure_space_limit(30, &pkg, &EvictAll);
        assert_eq!(tier.space_limit(), 1 + (1.333 * 30.0) as usize);
        let other = pkg.parent().unwrap().package_fragment("q");
        tier.reset_space_limit(4, &other, &EvictAll);
        assert!(tier.space_limit() > 4);
        tier.reset_space_limit(4, &pkg, &EvictAll);
        assert_eq!(tier.space_limit(), 4);
    }

    #[test]
    fn package_insert_provisions_openable_tier() {
        let config = CacheConfig::default().with_memory_ratio(0.04);
        let mut cache = ModelCache::new(&config);
        assert_eq!(cache.openable_cache_size(), 10);
        let pkg = package();
        let units: Vec<JavaElement> = (0..40)
            .map(|i| pkg.compilation_unit(&format!("U{i}.java")))
            .collect();
        let pkg_info = Arc::new(
            ElementInfo::new(InfoDetail::Package {
                non_java_resources: 0,
            })
            .with_children(units.clone()),
        );
        let mut batch = vec![(pkg.clone(), pkg_info)];
        batch.extend(units.iter().map(|u| (u.clone(), openable_info())));
        let closed = cache.put_all(batch, &EvictAll);
        assert!(closed.is_empty());
        assert!(units.iter().all(|u| cache.peek(u).is_some()));
    }

    #[test]
    fn closing_archive_root_flushes_descendants() {
        let config = CacheConfig::default().with_memory_ratio(1.0);
        let mut cache = ModelCache::new(&config);
        let root = JavaElement::model()
            .project("P")
            .package_fragment_root("/lib/rt.jar", true);
        let pkg = root.package_fragment("java.lang");
        let class_file = pkg.class_file("Object.class");
        let ty = class_file.type_("Object");

        let root_info = Arc::new(
            ElementInfo::new(InfoDetail::Root {
                archive: true,
                non_java_resources: 0,
            })
            .with_children(vec![pkg.clone()]),
        );
        let pkg_info = Arc::new(
            ElementInfo::new(InfoDetail::Package {
                non_java_resources: 0,
            })
            .with_children(vec![class_file.clone()]),
        );
        cache.put_all(
            vec![(pkg.clone(), pkg_info), (root.clone(), root_info)],
            &EvictAll,
        );
        cache.put_jar_type_info(ty.clone(), JarTypeEntry::NonExisting);
        assert!(matches!(cache.jar_type(&ty), Some(JarTypeEntry::NonExisting)));
        assert!(cache.get(&ty).is_none());

        let closed = cache.remove_info_and_children(&root, &EvictAll);
        assert_eq!(closed.len(), 2);
        assert!(cache.peek(&pkg).is_none());
        assert!(cache.jar_type(&ty).is_none());
        let report = cache.fill_ratio_report();
        assert!(report.starts_with("Project cache: 0 projects\nRoot cache: 0.0% full (0/50)"));
    }
}
