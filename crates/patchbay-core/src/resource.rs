//! Reference-counted registry for externally loaded binary resources.
//!
//! Audio samples and similar blobs represent allocations outside this
//! runtime's memory management, so they are tracked with an explicit
//! reference count: every successful [`register_resource`] or
//! [`request_resource`] call obligates the caller to exactly one matching
//! [`release_resource`]. When the last holder releases, the handle is
//! revoked and the entry removed — stale handles observe the revocation
//! instead of dangling.
//!
//! The manager is an explicit context object (one per
//! [`PatchContext`](crate::context::PatchContext)), not a process-wide
//! singleton, so independent patch sessions never share resource state.
//!
//! [`register_resource`]: ResourceManager::register_resource
//! [`request_resource`]: ResourceManager::request_resource
//! [`release_resource`]: ResourceManager::release_resource

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::PatchError;

struct ResourceCell {
    name: String,
    data: RefCell<Option<Rc<[u8]>>>,
}

/// A revocable reference to a named binary resource.
///
/// Handles are cheap to clone; cloning does **not** affect the reference
/// count. The count tracks register/request calls, and each of those owes
/// one release regardless of how many handle copies exist.
#[derive(Clone)]
pub struct ResourceHandle {
    cell: Rc<ResourceCell>,
}

impl ResourceHandle {
    /// The name the resource is registered under.
    pub fn name(&self) -> &str {
        &self.cell.name
    }

    /// The resource bytes, or `None` once the handle has been revoked.
    pub fn data(&self) -> Option<Rc<[u8]>> {
        self.cell.data.borrow().clone()
    }

    /// Whether the last holder has released this resource.
    pub fn is_revoked(&self) -> bool {
        self.cell.data.borrow().is_none()
    }
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("name", &self.cell.name)
            .field("revoked", &self.is_revoked())
            .finish()
    }
}

struct ResourceEntry {
    cell: Rc<ResourceCell>,
    ref_count: usize,
}

/// Name-keyed, reference-counted registry of binary resources.
pub struct ResourceManager {
    entries: HashMap<String, ResourceEntry>,
}

impl ResourceManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers a resource under `name` with a reference count of 1 and
    /// returns its handle.
    ///
    /// If `name` is already registered the existing entry's count is
    /// incremented and its handle returned (with a warning — the data of
    /// the new registration is ignored). Empty data is rejected with
    /// [`PatchError::InvalidResource`].
    pub fn register_resource(
        &mut self,
        name: &str,
        data: impl Into<Vec<u8>>,
    ) -> Result<ResourceHandle, PatchError> {
        let data = data.into();
        if data.is_empty() {
            return Err(PatchError::InvalidResource {
                name: name.to_owned(),
            });
        }

        if let Some(entry) = self.entries.get_mut(name) {
            tracing::warn!("resource_register: \"{name}\" already registered, reusing entry");
            entry.ref_count += 1;
            return Ok(ResourceHandle {
                cell: Rc::clone(&entry.cell),
            });
        }

        let cell = Rc::new(ResourceCell {
            name: name.to_owned(),
            data: RefCell::new(Some(Rc::from(data))),
        });
        self.entries.insert(
            name.to_owned(),
            ResourceEntry {
                cell: Rc::clone(&cell),
                ref_count: 1,
            },
        );
        tracing::debug!("resource_register: \"{name}\"");
        Ok(ResourceHandle { cell })
    }

    /// Requests an already-registered resource, incrementing its count.
    ///
    /// Returns `None` (after a warning) for an unregistered name — stale
    /// references during document reconstruction are expected and
    /// non-fatal.
    pub fn request_resource(&mut self, name: &str) -> Option<ResourceHandle> {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.ref_count += 1;
                tracing::debug!(
                    "resource_request: \"{name}\" refs: {}",
                    entry.ref_count
                );
                Some(ResourceHandle {
                    cell: Rc::clone(&entry.cell),
                })
            }
            None => {
                tracing::warn!("resource_request: \"{name}\" is not registered");
                None
            }
        }
    }

    /// Releases one reference to `name`.
    ///
    /// When the count reaches zero the handle is revoked (exactly once)
    /// and the entry removed. Releasing an unregistered name warns and is
    /// a no-op.
    pub fn release_resource(&mut self, name: &str) {
        match self.entries.get_mut(name) {
            Some(entry) => {
                entry.ref_count -= 1;
                tracing::debug!("resource_release: \"{name}\" refs: {}", entry.ref_count);
                if entry.ref_count == 0 {
                    if let Some(entry) = self.entries.remove(name) {
                        entry.cell.data.replace(None);
                        tracing::debug!("resource_release: \"{name}\" revoked and removed");
                    }
                }
            }
            None => {
                tracing::warn!("resource_release: \"{name}\" is not registered");
            }
        }
    }

    /// Current reference count for `name`, if registered.
    pub fn ref_count(&self, name: &str) -> Option<usize> {
        self.entries.get(name).map(|entry| entry.ref_count)
    }

    /// Whether `name` is currently registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no resources are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}
