use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use fxtoggle_api::lock_order::{self, LockClass, Ordered};
use fxtoggle_api::Resource;

/// A live CPU mapping of a constant buffer region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferMapping {
    pub resource: Resource,
    /// Host address returned by the map call.
    pub base: usize,
    /// Byte offset of the mapped region within the buffer.
    pub offset: u64,
    pub size: u64,
    pub buffer_size: u64,
}

impl BufferMapping {
    /// Bytes addressable from `base` before running off the end of the buffer.
    pub fn window(&self) -> usize {
        usize::try_from(self.buffer_size.saturating_sub(self.offset)).unwrap_or(usize::MAX)
    }

    pub fn contains(&self, dest: usize) -> bool {
        dest >= self.base && dest - self.base < self.window()
    }

    /// Shadow-buffer offset a copy to `dest` lands at, if `dest` is inside this mapping.
    pub fn locate(&self, dest: usize) -> Option<usize> {
        if !self.contains(dest) {
            return None;
        }
        let offset = usize::try_from(self.offset).ok()?;
        offset.checked_add(dest - self.base)
    }
}

/// Strategy attributing intercepted copies to mapped buffers.
pub trait ConstantCopyMethod: Send + Sync + fmt::Debug {
    fn on_map(&self, mapping: BufferMapping);
    fn on_unmap(&self, resource: Resource);
    /// Resource and shadow offset for a copy to host address `dest`.
    fn find(&self, dest: usize) -> Option<(Resource, usize)>;
    fn live_mappings(&self) -> usize;
}

/// Tracks only the most recent mapping. Matches applications that map, fill and unmap one buffer
/// at a time.
#[derive(Debug, Default)]
pub struct SingularMapping {
    current: RwLock<Option<BufferMapping>>,
}

impl ConstantCopyMethod for SingularMapping {
    fn on_map(&self, mapping: BufferMapping) {
        let _order = lock_order::enter(LockClass::Shadow);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(mapping);
    }

    fn on_unmap(&self, resource: Resource) {
        let _order = lock_order::enter(LockClass::Shadow);
        let mut current = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if current.is_some_and(|m| m.resource == resource) {
            *current = None;
        }
    }

    fn find(&self, dest: usize) -> Option<(Resource, usize)> {
        let _order = lock_order::enter(LockClass::Shadow);
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        let mapping = current.as_ref()?;
        Some((mapping.resource, mapping.locate(dest)?))
    }

    fn live_mappings(&self) -> usize {
        let _order = lock_order::enter(LockClass::Shadow);
        usize::from(
            self.current
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some(),
        )
    }
}

/// Tracks every live mapping, one per resource; copies go to the mapping whose window contains
/// the destination address.
#[derive(Debug, Default)]
pub struct NestedMapping {
    mappings: RwLock<HashMap<Resource, BufferMapping>>,
}

impl NestedMapping {
    fn write(&self) -> Ordered<std::sync::RwLockWriteGuard<'_, HashMap<Resource, BufferMapping>>> {
        Ordered::new(
            lock_order::enter(LockClass::Shadow),
            self.mappings
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn read(&self) -> Ordered<std::sync::RwLockReadGuard<'_, HashMap<Resource, BufferMapping>>> {
        Ordered::new(
            lock_order::enter(LockClass::Shadow),
            self.mappings
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl ConstantCopyMethod for NestedMapping {
    fn on_map(&self, mapping: BufferMapping) {
        self.write().insert(mapping.resource, mapping);
    }

    fn on_unmap(&self, resource: Resource) {
        self.write().remove(&resource);
    }

    fn find(&self, dest: usize) -> Option<(Resource, usize)> {
        // Overlapping windows can only come from sub-allocated host memory; the mapping closest
        // to `dest` is the one being written.
        self.read()
            .values()
            .filter(|m| m.contains(dest))
            .max_by_key(|m| m.base)
            .and_then(|m| Some((m.resource, m.locate(dest)?)))
    }

    fn live_mappings(&self) -> usize {
        self.read().len()
    }
}
