// Layer 1: Standard library imports
use std::any::Any;
use std::fmt;
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// Opaque message carrier.
///
/// A `Payload` wraps any `Send + Sync + 'static` value behind an `Arc`, so
/// cloning shares the allocation. The concrete type name is captured at
/// construction for diagnostics and type-mismatch errors.
///
/// `tell` stays polymorphic over the payload; the type check happens where
/// the value is consumed, via [`Payload::downcast_ref`] in a handler or the
/// typed reply slot of an ask.
///
/// # Example
/// ```rust
/// use troupe_rt::message::Payload;
///
/// let payload = Payload::new(42u64);
/// assert!(payload.is::<u64>());
/// assert_eq!(payload.downcast_ref::<u64>(), Some(&42));
/// assert_eq!(payload.downcast_ref::<String>(), None);
/// ```
#[derive(Clone)]
pub struct Payload {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Payload {
    /// Wrap a value.
    pub fn new<M: Send + Sync + 'static>(value: M) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<M>(),
        }
    }

    /// Whether the carried value is of type `T`.
    pub fn is<T: Send + Sync + 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrow the carried value as `T`.
    pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the carried value as a shared `Arc<T>`, handing the payload back
    /// on type mismatch.
    pub fn downcast_arc<T: Send + Sync + 'static>(self) -> Result<Arc<T>, Self> {
        let type_name = self.type_name;
        Arc::downcast::<T>(self.value).map_err(|value| Self { value, type_name })
    }

    /// The concrete type name captured at construction.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.type_name).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    #[test]
    fn test_downcast_ref_matches_concrete_type() {
        let payload = Payload::new(Ping(7));
        assert!(payload.is::<Ping>());
        assert_eq!(payload.downcast_ref::<Ping>(), Some(&Ping(7)));
    }

    #[test]
    fn test_downcast_ref_rejects_other_types() {
        let payload = Payload::new(Ping(7));
        assert!(!payload.is::<u32>());
        assert!(payload.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn test_clone_shares_the_value() {
        let payload = Payload::new(String::from("shared"));
        let clone = payload.clone();
        let a: *const String = payload.downcast_ref::<String>().unwrap();
        let b: *const String = clone.downcast_ref::<String>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_downcast_arc_returns_payload_on_mismatch() {
        let payload = Payload::new(Ping(1));
        let back = payload.downcast_arc::<u64>().unwrap_err();
        assert!(back.is::<Ping>());
        assert!(back.type_name().contains("Ping"));
    }

    #[test]
    fn test_type_name_captured() {
        let payload = Payload::new(3.5f64);
        assert_eq!(payload.type_name(), "f64");
    }
}
