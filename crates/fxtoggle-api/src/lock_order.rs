//! Debug-only lock hierarchy check.
//!
//! The device-wide registries are guarded by separate locks. A thread may hold at most one class
//! of them at a time: acquiring the bindings lock while the techniques lock is held (or the other
//! way round) is a bug even if it happens not to deadlock today. Re-entering the *same* class is
//! allowed so shared read guards can be taken twice.
//!
//! In release builds the bookkeeping still runs but violations are not asserted.

use std::cell::Cell;
use std::ops::{Deref, DerefMut};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockClass {
    Techniques,
    Bindings,
    Shadow,
}

thread_local! {
    static HELD: Cell<Option<LockClass>> = const { Cell::new(None) };
}

/// Marks `class` as held by this thread until dropped.
#[must_use]
#[derive(Debug)]
pub struct LockOrderToken {
    previous: Option<LockClass>,
}

/// Record that the current thread is about to acquire a lock of `class`.
pub fn enter(class: LockClass) -> LockOrderToken {
    let previous = HELD.with(|held| held.replace(Some(class)));
    debug_assert!(
        previous.is_none() || previous == Some(class),
        "lock order violation: acquiring {class:?} while holding {previous:?}"
    );
    LockOrderToken { previous }
}

/// Class currently held by this thread, if any.
pub fn held() -> Option<LockClass> {
    HELD.with(Cell::get)
}

impl Drop for LockOrderToken {
    fn drop(&mut self) {
        HELD.with(|held| held.set(self.previous));
    }
}

/// A lock guard paired with its hierarchy token.
///
/// Field order matters: the guard is released before the token clears the held class.
pub struct Ordered<G> {
    guard: G,
    _token: LockOrderToken,
}

impl<G> Ordered<G> {
    pub fn new(token: LockOrderToken, guard: G) -> Self {
        Self {
            guard,
            _token: token,
        }
    }
}

impl<G: Deref> Deref for Ordered<G> {
    type Target = G::Target;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<G: DerefMut> DerefMut for Ordered<G> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_same_class_restores_state() {
        assert_eq!(held(), None);
        {
            let _outer = enter(LockClass::Bindings);
            {
                let _inner = enter(LockClass::Bindings);
                assert_eq!(held(), Some(LockClass::Bindings));
            }
            assert_eq!(held(), Some(LockClass::Bindings));
        }
        assert_eq!(held(), None);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "lock order violation")]
    fn mixing_classes_panics_in_debug() {
        let _techniques = enter(LockClass::Techniques);
        let _bindings = enter(LockClass::Bindings);
    }

    #[test]
    fn ordered_guard_derefs_to_inner() {
        let lock = std::sync::Mutex::new(5u32);
        let mut guard = Ordered::new(
            enter(LockClass::Shadow),
            lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner),
        );
        *guard += 1;
        assert_eq!(*guard, 6);
        drop(guard);
        assert_eq!(held(), None);
    }
}
