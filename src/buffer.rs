//! In-memory buffers for openables.
//!
//! A `Buffer` holds the working contents of one compilation unit. Edits mark
//! it dirty until it is saved back through the [`ContentProvider`]. The
//! `BufferManager` is also the cache's eviction policy: an openable whose
//! buffer (or any descendant's buffer) is dirty is never evicted, and an
//! evicted openable has its buffers released.
//!
//! The buffer lock is the innermost lock; nothing is called out to while it
//! is held except the content provider on open.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::cache::EvictionPolicy;
use crate::element::JavaElement;
use crate::error::{ModelError, Result};
use crate::workspace::ContentProvider;

#[derive(Debug, Clone)]
pub struct Buffer {
    owner: JavaElement,
    path: PathBuf,
    contents: String,
    dirty: bool,
    read_only: bool,
}

impl Buffer {
    pub fn owner(&self) -> &JavaElement {
        &self.owner
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

pub struct BufferManager {
    content: Arc<dyn ContentProvider>,
    buffers: Mutex<HashMap<JavaElement, Buffer>>,
}

impl BufferManager {
    pub fn new(content: Arc<dyn ContentProvider>) -> Self {
        Self {
            content,
            buffers: Mutex::new(HashMap::new()),
        }
    }

    /// Opens (or returns the already open) buffer of `owner`, reading its
    /// contents from `path`.
    pub fn open_buffer(&self, owner: &JavaElement, path: &Path, read_only: bool) -> Result<Buffer> {
        if let Some(existing) = self.buffer(owner) {
            return Ok(existing);
        }
        let contents = self
            .content
            .read_to_string(path)
            .map_err(|e| ModelError::io(path.display().to_string(), e))?;
        Ok(self.open_buffer_with(owner, path, contents, read_only))
    }

    pub fn open_buffer_with(
        &self,
        owner: &JavaElement,
        path: &Path,
        contents: String,
        read_only: bool,
    ) -> Buffer {
        let mut buffers = self.buffers.lock();
        buffers
            .entry(owner.clone())
            .or_insert_with(|| {
                debug!(target: "jmodel.buffer", element = %owner, path = %path.display(), "buffer opened");
                Buffer {
                    owner: owner.clone(),
                    path: path.to_path_buf(),
                    contents,
                    dirty: false,
                    read_only,
                }
            })
            .clone()
    }

    pub fn buffer(&self, owner: &JavaElement) -> Option<Buffer> {
        self.buffers.lock().get(owner).cloned()
    }

    pub fn contents(&self, owner: &JavaElement) -> Option<String> {
        self.buffers.lock().get(owner).map(|b| b.contents.clone())
    }

    pub fn set_contents(&self, owner: &JavaElement, contents: impl Into<String>) -> Result<()> {
        let mut buffers = self.buffers.lock();
        let Some(buffer) = buffers.get_mut(owner) else {
            return Err(ModelError::DoesNotExist(owner.clone()));
        };
        if buffer.read_only {
            return Err(ModelError::ReadOnly(owner.clone()));
        }
        buffer.contents = contents.into();
        buffer.dirty = true;
        trace!(target: "jmodel.buffer", element = %owner, "buffer modified");
        Ok(())
    }

    /// Writes the buffer back. A no-op for clean buffers.
    pub fn save(&self, owner: &JavaElement) -> Result<()> {
        let Some(buffer) = self.buffer(owner) else {
            return Err(ModelError::DoesNotExist(owner.clone()));
        };
        if !buffer.dirty {
            return Ok(());
        }
        if buffer.read_only {
            return Err(ModelError::ReadOnly(owner.clone()));
        }
        self.content
            .write(&buffer.path, &buffer.contents)
            .map_err(|e| ModelError::io(buffer.path.display().to_string(), e))?;

        let mut buffers = self.buffers.lock();
        if let Some(current) = buffers.get_mut(owner)
            && current.contents == buffer.contents
        {
            current.dirty = false;
        }
        debug!(target: "jmodel.buffer", element = %owner, "buffer saved");
        Ok(())
    }

    pub fn close_buffer(&self, owner: &JavaElement) -> Option<Buffer> {
        let closed = self.buffers.lock().remove(owner);
        if closed.is_some() {
            debug!(target: "jmodel.buffer", element = %owner, "buffer closed");
        }
        closed
    }

    /// True when `element` or anything below it has a dirty buffer.
    pub fn has_unsaved_changes(&self, element: &JavaElement) -> bool {
        self.buffers
            .lock()
            .values()
            .any(|b| b.dirty && (b.owner == *element || element.is_ancestor_of(&b.owner)))
    }

    pub fn open_count(&self) -> usize {
        self.buffers.lock().len()
    }
}

impl EvictionPolicy for BufferManager {
    fn can_evict(&self, element: &JavaElement) -> bool {
        !self.has_unsaved_changes(element)
    }

    fn evicted(&self, element: &JavaElement) {
        let mut buffers = self.buffers.lock();
        buffers.retain(|owner, _| owner != element && !element.is_ancestor_of(owner));
    }
}
