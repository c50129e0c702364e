//! Free-list recycler for short-lived helper objects.
//!
//! Instances are keyed by their [`TypeId`], so a `VecDeque<usize>` collected
//! here only ever comes back out of `get::<VecDeque<usize>>()`. The pool never
//! clears what it is given; callers reset state before [`ObjectPool::collect`].
//! There is no size cap and no eviction.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Cheap-to-clone handle to a shared free list. Clones see the same storage.
#[derive(Clone, Default)]
pub struct ObjectPool {
    inner: Rc<RefCell<HashMap<TypeId, Vec<Box<dyn Any>>>>>,
}

impl ObjectPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a previously collected `T`, or builds one with `factory`.
    pub fn get<T, F>(&self, factory: F) -> T
    where
        T: 'static,
        F: FnOnce() -> T,
    {
        let recycled = {
            let mut guard = self.inner.borrow_mut();
            guard
                .get_mut(&TypeId::of::<T>())
                .and_then(|free| free.pop())
        };
        match recycled.and_then(|boxed| boxed.downcast::<T>().ok()) {
            Some(instance) => *instance,
            None => factory(),
        }
    }

    pub fn get_default<T>(&self) -> T
    where
        T: Default + 'static,
    {
        self.get(T::default)
    }

    /// Hands `instance` back for a later `get::<T>()`.
    pub fn collect<T>(&self, instance: T)
    where
        T: 'static,
    {
        self.inner
            .borrow_mut()
            .entry(TypeId::of::<T>())
            .or_default()
            .push(Box::new(instance));
    }

    pub fn available<T>(&self) -> usize
    where
        T: 'static,
    {
        self.inner
            .borrow()
            .get(&TypeId::of::<T>())
            .map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }
}

impl std::fmt::Debug for ObjectPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.inner.borrow();
        f.debug_struct("ObjectPool")
            .field("types", &guard.len())
            .field("instances", &guard.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[test]
    fn get_falls_back_to_factory() {
        let pool = ObjectPool::new();
        let value: Vec<u32> = pool.get(|| vec![7]);
        assert_eq!(value, vec![7]);
        assert_eq!(pool.available::<Vec<u32>>(), 0);
    }

    #[test]
    fn collected_instance_is_handed_back() {
        let pool = ObjectPool::new();
        let shared = Rc::new(RefCell::new(5));
        pool.collect(Rc::clone(&shared));
        assert_eq!(pool.available::<Rc<RefCell<i32>>>(), 1);

        let recycled: Rc<RefCell<i32>> = pool.get(|| Rc::new(RefCell::new(0)));
        assert!(Rc::ptr_eq(&shared, &recycled));
        assert_eq!(pool.available::<Rc<RefCell<i32>>>(), 0);
    }

    #[test]
    fn types_do_not_mix() {
        let pool = ObjectPool::new();
        let mut queue: VecDeque<usize> = VecDeque::with_capacity(32);
        queue.push_back(1);
        queue.clear();
        pool.collect(queue);

        let other: Vec<usize> = pool.get_default();
        assert_eq!(other.capacity(), 0);

        let queue: VecDeque<usize> = pool.get_default();
        assert!(queue.capacity() >= 32);
    }

    #[test]
    fn pool_does_not_clear_on_behalf_of_caller() {
        let pool = ObjectPool::new();
        pool.collect(vec![1u8, 2, 3]);
        let dirty: Vec<u8> = pool.get_default();
        assert_eq!(dirty, vec![1, 2, 3]);
    }

    #[test]
    fn clones_share_storage() {
        let pool = ObjectPool::new();
        let clone = pool.clone();
        clone.collect(String::from("x"));
        assert_eq!(pool.available::<String>(), 1);
        pool.clear();
        assert_eq!(clone.available::<String>(), 0);
    }
}
