use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use fxtoggle_api::lock_order::{self, LockClass, Ordered};
use fxtoggle_api::Resource;

/// CPU copies of every host-writable constant buffer, keyed by resource handle.
///
/// The map itself is only written when buffers are created or destroyed; intercepted copies take
/// the map lock shared and serialise on the per-buffer mutex, so copies into different buffers
/// don't contend.
#[derive(Debug, Default)]
pub struct ShadowBufferStore {
    buffers: RwLock<HashMap<Resource, Mutex<Vec<u8>>>>,
}

impl ShadowBufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zeroed shadow of `size` bytes, seeding it from `initial` if given.
    ///
    /// Re-creating an existing shadow replaces it.
    pub fn create(&self, resource: Resource, size: usize, initial: Option<&[u8]>) {
        let mut bytes = vec![0u8; size];
        if let Some(initial) = initial {
            let n = initial.len().min(size);
            bytes[..n].copy_from_slice(&initial[..n]);
        }

        let mut buffers = Ordered::new(
            lock_order::enter(LockClass::Shadow),
            self.buffers
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        );
        buffers.insert(resource, Mutex::new(bytes));
    }

    pub fn remove(&self, resource: Resource) -> bool {
        let mut buffers = Ordered::new(
            lock_order::enter(LockClass::Shadow),
            self.buffers
                .write()
                .unwrap_or_else(PoisonError::into_inner),
        );
        buffers.remove(&resource).is_some()
    }

    pub fn contains(&self, resource: Resource) -> bool {
        self.read().contains_key(&resource)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size_of(&self, resource: Resource) -> Option<usize> {
        self.with_bytes(resource, <[u8]>::len)
    }

    /// Copy `data` into the shadow of `resource` at `offset`.
    ///
    /// Writes past the end of the shadow are clipped. Returns the number of bytes written, or
    /// `None` if the resource has no shadow.
    pub fn write(&self, resource: Resource, offset: usize, data: &[u8]) -> Option<usize> {
        let buffers = self.read();
        let entry = buffers.get(&resource)?;
        let mut bytes = entry.lock().unwrap_or_else(PoisonError::into_inner);

        if offset >= bytes.len() {
            return Some(0);
        }
        let n = data.len().min(bytes.len() - offset);
        bytes[offset..offset + n].copy_from_slice(&data[..n]);
        Some(n)
    }

    /// Run `f` against the current shadow bytes of `resource`.
    pub fn with_bytes<R>(&self, resource: Resource, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let buffers = self.read();
        let entry = buffers.get(&resource)?;
        let bytes = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Some(f(&bytes))
    }

    pub fn snapshot(&self, resource: Resource) -> Option<Vec<u8>> {
        self.with_bytes(resource, <[u8]>::to_vec)
    }

    fn read(
        &self,
    ) -> Ordered<std::sync::RwLockReadGuard<'_, HashMap<Resource, Mutex<Vec<u8>>>>> {
        Ordered::new(
            lock_order::enter(LockClass::Shadow),
            self.buffers.read().unwrap_or_else(PoisonError::into_inner),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn seeded_from_initial_data() {
        let store = ShadowBufferStore::new();
        store.create(Resource(1), 4, Some(&[1, 2, 3, 4, 5, 6]));
        assert_eq!(store.snapshot(Resource(1)), Some(vec![1, 2, 3, 4]));

        store.create(Resource(2), 4, Some(&[9]));
        assert_eq!(store.snapshot(Resource(2)), Some(vec![9, 0, 0, 0]));
    }

    #[test]
    fn writes_are_clipped_to_the_buffer() {
        let store = ShadowBufferStore::new();
        store.create(Resource(1), 8, None);

        assert_eq!(store.write(Resource(1), 6, &[0xAA; 4]), Some(2));
        assert_eq!(store.write(Resource(1), 8, &[0xBB]), Some(0));
        assert_eq!(store.write(Resource(2), 0, &[0xCC]), None);
        assert_eq!(
            store.snapshot(Resource(1)),
            Some(vec![0, 0, 0, 0, 0, 0, 0xAA, 0xAA])
        );
    }

    #[test]
    fn remove_drops_the_shadow() {
        let store = ShadowBufferStore::new();
        store.create(Resource(1), 8, None);
        assert!(store.contains(Resource(1)));
        assert!(store.remove(Resource(1)));
        assert!(!store.remove(Resource(1)));
        assert!(store.is_empty());
    }
}
