//! Ordered, duplicate-suppressing ware collections.
//!
//! One [`Registry`] per stage. Insertion order is execution order, and for
//! middleware it is the outer-to-inner wrapping order. Identity is the shared
//! `Arc` allocation: the same `Arc` (or a clone of it) is only ever held once.

use std::sync::Arc;

use tracing::debug;

use super::{Afterware, Backware, Beforeware, Classified, Frontware, Middleware, Ware, WareKind};
use crate::error::Result;
use crate::stage::Stage;

/// Address of the allocation behind an `Arc`, with any vtable stripped.
fn addr<T: ?Sized>(ware: &Arc<T>) -> *const () {
    Arc::as_ptr(ware) as *const ()
}

/// Wares of one capability, in registration order.
pub struct Registry<T: ?Sized> {
    entries: Vec<Arc<T>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Appends `ware`. Returns `false` if it was already present.
    pub fn insert(&mut self, ware: Arc<T>) -> bool {
        if self.contains_addr(addr(&ware)) {
            return false;
        }
        self.entries.push(ware);
        true
    }

    pub(crate) fn remove_addr(&mut self, target: *const ()) -> bool {
        let before = self.entries.len();
        self.entries.retain(|w| addr(w) != target);
        self.entries.len() != before
    }

    pub(crate) fn contains_addr(&self, target: *const ()) -> bool {
        self.entries.iter().any(|w| addr(w) == target)
    }

    pub fn get(&self, index: usize) -> Option<&Arc<T>> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl<T: ?Sized> Default for Registry<T> {
    fn default() -> Self { Self::new() }
}

/// The five registries of a dispatcher.
#[derive(Default)]
pub struct Wares {
    pub(crate) before: Registry<dyn Beforeware>,
    pub(crate) front: Registry<dyn Frontware>,
    pub(crate) middle: Registry<dyn Middleware>,
    pub(crate) back: Registry<dyn Backware>,
    pub(crate) after: Registry<dyn Afterware>,
}

impl Wares {
    /// Routes `ware` to the registry matching its capability.
    pub fn add(&mut self, ware: Arc<dyn Ware>) -> Result<WareKind> {
        let classified = super::classify(&ware)?;
        let kind = classified.kind();
        let inserted = match classified {
            Classified::Before(w) => self.before.insert(w),
            Classified::Front(w) => self.front.insert(w),
            Classified::Middle(w) | Classified::Callable(w) => self.middle.insert(w),
            Classified::Back(w) => self.back.insert(w),
            Classified::After(w) => self.after.insert(w),
        };
        if !inserted {
            debug!(?kind, "ware already registered, ignoring");
        }
        Ok(kind)
    }

    /// Removes `ware`. Opaque callables are removed from every registry.
    pub fn remove(&mut self, ware: Arc<dyn Ware>) -> Result<bool> {
        let target = addr(&ware);
        Ok(match super::classify(&ware)? {
            Classified::Before(_) => self.before.remove_addr(target),
            Classified::Front(_) => self.front.remove_addr(target),
            Classified::Middle(_) => self.middle.remove_addr(target),
            Classified::Back(_) => self.back.remove_addr(target),
            Classified::After(_) => self.after.remove_addr(target),
            // non-short-circuiting on purpose: clear every registry
            Classified::Callable(_) => {
                self.before.remove_addr(target)
                    | self.front.remove_addr(target)
                    | self.middle.remove_addr(target)
                    | self.back.remove_addr(target)
                    | self.after.remove_addr(target)
            }
        })
    }

    /// Whether `ware` is registered. Opaque callables are looked up everywhere.
    pub fn contains(&self, ware: Arc<dyn Ware>) -> Result<bool> {
        let target = addr(&ware);
        Ok(match super::classify(&ware)? {
            Classified::Before(_) => self.before.contains_addr(target),
            Classified::Front(_) => self.front.contains_addr(target),
            Classified::Middle(_) => self.middle.contains_addr(target),
            Classified::Back(_) => self.back.contains_addr(target),
            Classified::After(_) => self.after.contains_addr(target),
            Classified::Callable(_) => {
                self.before.contains_addr(target)
                    || self.front.contains_addr(target)
                    || self.middle.contains_addr(target)
                    || self.back.contains_addr(target)
                    || self.after.contains_addr(target)
            }
        })
    }

    /// Number of wares that run at `stage`. The core stage has none.
    pub fn count(&self, stage: Stage) -> usize {
        match stage {
            Stage::Before => self.before.len(),
            Stage::Front  => self.front.len(),
            Stage::Middle => self.middle.len(),
            Stage::Core   => 0,
            Stage::Back   => self.back.len(),
            Stage::After  => self.after.len(),
        }
    }
}
