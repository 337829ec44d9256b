//! InstanceCache - one live proxy per native identity.
//!
//! Proxies are held weakly in a generational slot table, indexed by
//! [`ObjectId`]. A proxy learns its [`CacheHandle`] when it is created and
//! hands it back on drop; the generation check makes a late removal from a
//! proxy that has already been replaced a no-op.
//!
//! ```text
//! identity ──► CacheHandle { index, generation } ──► slot ──► Weak<T>
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use projection_core::ObjectId;

/// Position of one cached proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheHandle {
    index: u32,
    generation: u32,
}

impl CacheHandle {
    /// Slot index.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Slot generation at creation.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

struct Slot<T> {
    generation: u32,
    identity: Option<ObjectId>,
    proxy: Weak<T>,
}

struct Slots<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    by_identity: FxHashMap<ObjectId, CacheHandle>,
}

impl<T> Slots<T> {
    fn live(&self, handle: CacheHandle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.identity.is_some())
    }

    fn allocate(&mut self, identity: ObjectId) -> CacheHandle {
        let handle = if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.identity = Some(identity);
            CacheHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                identity: Some(identity),
                proxy: Weak::new(),
            });
            CacheHandle {
                index,
                generation: 0,
            }
        };
        self.by_identity.insert(identity, handle);
        handle
    }

    fn free(&mut self, handle: CacheHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation {
            return false;
        }
        let Some(identity) = slot.identity.take() else {
            return false;
        };
        slot.proxy = Weak::new();
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        if self.by_identity.get(&identity) == Some(&handle) {
            self.by_identity.remove(&identity);
        }
        true
    }
}

/// Weak identity map from native objects to their live proxies.
pub struct InstanceCache<T> {
    inner: Mutex<Slots<T>>,
}

impl<T> Default for InstanceCache<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Slots {
                slots: Vec::new(),
                free_list: Vec::new(),
                by_identity: FxHashMap::default(),
            }),
        }
    }
}

impl<T> InstanceCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the live proxy for `identity`, if any.
    pub fn lookup(&self, identity: ObjectId) -> Option<Arc<T>> {
        let inner = self.inner.lock();
        let proxy = inner
            .by_identity
            .get(&identity)
            .and_then(|&handle| inner.live(handle))
            .and_then(|slot| slot.proxy.upgrade());
        match &proxy {
            Some(_) => tracing::trace!(identity = identity.0, "instance cache hit"),
            None => tracing::trace!(identity = identity.0, "instance cache miss"),
        }
        proxy
    }

    /// Get the live proxy for `identity`, creating it with `create` on a miss.
    ///
    /// `create` receives the handle the new proxy must pass to
    /// [`remove`](Self::remove) when it is dropped. It runs under the cache
    /// lock and must not touch the cache itself.
    pub fn get_or_insert_with<F>(&self, identity: ObjectId, create: F) -> Arc<T>
    where
        F: FnOnce(CacheHandle) -> Arc<T>,
    {
        let mut inner = self.inner.lock();
        if let Some(&handle) = inner.by_identity.get(&identity) {
            if let Some(proxy) = inner.live(handle).and_then(|slot| slot.proxy.upgrade()) {
                tracing::trace!(identity = identity.0, "instance cache hit");
                return proxy;
            }
            // The previous proxy is mid-drop; its own removal will be stale.
            inner.free(handle);
        }
        tracing::trace!(identity = identity.0, "instance cache miss");
        let handle = inner.allocate(identity);
        let proxy = create(handle);
        inner.slots[handle.index as usize].proxy = Arc::downgrade(&proxy);
        proxy
    }

    /// Deregister the proxy created with `handle`.
    ///
    /// Returns `false` if the handle is stale.
    pub fn remove(&self, handle: CacheHandle) -> bool {
        let removed = self.inner.lock().free(handle);
        if !removed {
            tracing::trace!(index = handle.index, "stale instance cache removal ignored");
        }
        removed
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.inner.lock().by_identity.len()
    }

    /// Check if no identity is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> fmt::Debug for InstanceCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("InstanceCache")
            .field("live", &inner.by_identity.len())
            .field("slots", &inner.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Proxy {
        identity: ObjectId,
        handle: CacheHandle,
        cache: Arc<InstanceCache<Proxy>>,
    }

    impl Drop for Proxy {
        fn drop(&mut self) {
            self.cache.remove(self.handle);
        }
    }

    fn project(cache: &Arc<InstanceCache<Proxy>>, id: usize) -> Arc<Proxy> {
        let owner = cache.clone();
        cache.get_or_insert_with(ObjectId(id), move |handle| {
            Arc::new(Proxy {
                identity: ObjectId(id),
                handle,
                cache: owner,
            })
        })
    }

    #[test]
    fn same_identity_same_proxy() {
        let cache = Arc::new(InstanceCache::new());
        let a = project(&cache, 1);
        let b = project(&cache, 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&cache.lookup(ObjectId(1)).unwrap(), &a));
    }

    #[test]
    fn distinct_identities_distinct_proxies() {
        let cache = Arc::new(InstanceCache::new());
        let a = project(&cache, 1);
        let b = project(&cache, 2);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(b.identity, ObjectId(2));
    }

    #[test]
    fn dropping_proxy_deregisters() {
        let cache = Arc::new(InstanceCache::new());
        let first = project(&cache, 7);
        let first_handle = first.handle;
        drop(first);
        assert!(cache.is_empty());
        assert!(cache.lookup(ObjectId(7)).is_none());

        let second = project(&cache, 7);
        assert_eq!(second.handle.index(), first_handle.index());
        assert_ne!(second.handle.generation(), first_handle.generation());
    }

    #[test]
    fn stale_removal_is_noop() {
        let cache = Arc::new(InstanceCache::new());
        let first = project(&cache, 3);
        let stale = first.handle;
        drop(first);
        let second = project(&cache, 3);
        assert!(!cache.remove(stale));
        assert!(Arc::ptr_eq(&cache.lookup(ObjectId(3)).unwrap(), &second));
    }

    #[test]
    fn dead_entry_is_replaced() {
        let cache: InstanceCache<u32> = InstanceCache::new();
        let first = cache.get_or_insert_with(ObjectId(9), |_| Arc::new(1));
        let first_handle = {
            let inner = cache.inner.lock();
            inner.by_identity[&ObjectId(9)]
        };
        drop(first);
        // No drop hook: the slot still points at a dead proxy.
        let second = cache.get_or_insert_with(ObjectId(9), |_| Arc::new(2));
        assert_eq!(*second, 2);
        assert!(!cache.remove(first_handle));
        assert_eq!(cache.len(), 1);
    }
}
