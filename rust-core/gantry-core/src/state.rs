//! # Request State
//!
//! Typed scratch storage owned by a single request's [`Context`].
//!
//! Middleware uses it to hand values down the pipeline (a resolved user,
//! a lookup result) without any process-wide variable. The store lives and
//! dies with the request, so it needs no locking.
//!
//! [`Context`]: crate::context::Context

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Type-keyed storage, one slot per type
#[derive(Default)]
pub struct TypeState {
    data: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl TypeState {
    /// Create a new empty type state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value by its type, returning the value it replaced
    pub fn set<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.data
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Borrow the value stored for `T`
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.data
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    /// Mutably borrow the value stored for `T`
    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.data
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut::<T>())
    }

    /// Take the value stored for `T` out of the store
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.data
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Check if a type exists
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.data.contains_key(&TypeId::of::<T>())
    }

    /// Get the number of stored items
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if state is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for TypeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeState")
            .field("len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_state_set_get() {
        let mut state = TypeState::new();
        state.set(42i32);
        state.set("hello".to_string());

        assert_eq!(state.get::<i32>(), Some(&42));
        assert_eq!(state.get::<String>().map(String::as_str), Some("hello"));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_type_state_overwrite() {
        let mut state = TypeState::new();
        assert_eq!(state.set(1i32), None);
        assert_eq!(state.set(2i32), Some(1));

        assert_eq!(state.get::<i32>(), Some(&2));
    }

    #[test]
    fn test_type_state_missing() {
        let state = TypeState::new();
        assert!(state.is_empty());
        assert_eq!(state.get::<u8>(), None);
        assert!(!state.contains::<u8>());
    }

    #[test]
    fn test_type_state_mutate_and_remove() {
        let mut state = TypeState::new();
        state.set(vec![1u8]);
        if let Some(v) = state.get_mut::<Vec<u8>>() {
            v.push(2);
        }
        assert_eq!(state.remove::<Vec<u8>>(), Some(vec![1, 2]));
        assert!(!state.contains::<Vec<u8>>());
    }
}
