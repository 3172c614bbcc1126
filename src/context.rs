//! Request-scoped context.
//!
//! A [`Context`] is an immutable key → value association that lives for one
//! request. Middleware never mutates it: [`Context::with_value`] returns a new
//! context whose parent is the old one, and the request is rebound to it with
//! [`Request::with_context`](crate::Request::with_context).
//!
//! ```text
//! background ← htmx flag ← request id        (lookup walks right to left)
//! ```
//!
//! # Keys
//!
//! A key is a **type**, not a value. Each middleware declares its own private
//! zero-sized key type, so two unrelated middlewares cannot collide even if
//! they store values of the same type:
//!
//! ```rust
//! use sheath::Context;
//!
//! struct TenantKey; // private to your module
//!
//! let ctx = Context::background().with_value::<TenantKey>(String::from("acme"));
//! assert_eq!(ctx.get::<TenantKey, String>().map(String::as_str), Some("acme"));
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// An immutable, cheaply cloneable per-request value store.
///
/// Cloning is one atomic increment; deriving a child with
/// [`with_value`](Self::with_value) allocates one entry and leaves the
/// receiver untouched.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Entry>>,
}

struct Entry {
    key: TypeId,
    value: Box<dyn Any + Send + Sync>,
    parent: Option<Arc<Entry>>,
}

impl Context {
    /// The empty root context every request starts from.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a child context that maps key type `K` to `value`.
    ///
    /// An existing value for `K` further up the chain is shadowed, not
    /// replaced: contexts derived earlier still see it.
    pub fn with_value<K: 'static>(&self, value: impl Any + Send + Sync) -> Self {
        let entry = Entry {
            key: TypeId::of::<K>(),
            value: Box::new(value),
            parent: self.head.clone(),
        };
        Self { head: Some(Arc::new(entry)) }
    }

    /// The nearest value stored under key type `K`, of whatever type it is.
    pub fn value<K: 'static>(&self) -> Option<&(dyn Any + Send + Sync)> {
        let key = TypeId::of::<K>();
        let mut cursor = self.head.as_deref();
        while let Some(entry) = cursor {
            if entry.key == key {
                return Some(entry.value.as_ref());
            }
            cursor = entry.parent.as_deref();
        }
        None
    }

    /// The nearest value stored under key type `K`, if it is a `T`.
    ///
    /// A value of the wrong type yields `None`; the lookup does not continue
    /// past it.
    pub fn get<K: 'static, T: 'static>(&self) -> Option<&T> {
        self.value::<K>()?.downcast_ref::<T>()
    }

    /// Number of entries on the chain, shadowed ones included.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.head.as_deref();
        while let Some(entry) = cursor {
            depth += 1;
            cursor = entry.parent.as_deref();
        }
        depth
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").field("depth", &self.depth()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct KeyA;
    struct KeyB;

    #[test]
    fn background_is_empty() {
        let ctx = Context::background();
        assert!(ctx.value::<KeyA>().is_none());
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn with_value_leaves_parent_untouched() {
        let parent = Context::background();
        let child = parent.with_value::<KeyA>(true);

        assert_eq!(child.get::<KeyA, bool>(), Some(&true));
        assert!(parent.get::<KeyA, bool>().is_none());
    }

    #[test]
    fn nearest_value_shadows_older_one() {
        let first = Context::background().with_value::<KeyA>(1_u32);
        let second = first.with_value::<KeyA>(2_u32);

        assert_eq!(second.get::<KeyA, u32>(), Some(&2));
        assert_eq!(first.get::<KeyA, u32>(), Some(&1));
        assert_eq!(second.depth(), 2);
    }

    #[test]
    fn keys_with_same_value_type_do_not_collide() {
        let ctx = Context::background()
            .with_value::<KeyA>(String::from("a"))
            .with_value::<KeyB>(String::from("b"));

        assert_eq!(ctx.get::<KeyA, String>().map(String::as_str), Some("a"));
        assert_eq!(ctx.get::<KeyB, String>().map(String::as_str), Some("b"));
    }

    #[test]
    fn mistyped_value_is_none() {
        let ctx = Context::background().with_value::<KeyA>(42_i64);
        assert!(ctx.get::<KeyA, String>().is_none());
        assert!(ctx.value::<KeyA>().is_some());
    }
}
