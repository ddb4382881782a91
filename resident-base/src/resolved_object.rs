use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Implemented by anything the loader can produce as a live in-memory asset.
/// The trait exists so the retention core can hold strong references to
/// assets without knowing their concrete types.
pub trait ResidentAsset: Any + Send + Sync {
    /// Human-readable name used by the diagnostic dumps
    fn debug_name(&self) -> &str;
}

/// Opaque strong handle to a live in-memory asset produced by the loader.
///
/// Equality and hashing are by identity: two `ResolvedObject`s are equal iff
/// they point at the same allocation. Cloning bumps the strong count, so any
/// clone held by the retention core keeps the asset alive.
#[derive(Clone)]
pub struct ResolvedObject {
    inner: Arc<dyn ResidentAsset>,
}

impl ResolvedObject {
    pub fn new<T: ResidentAsset>(asset: T) -> Self {
        ResolvedObject {
            inner: Arc::new(asset),
        }
    }

    pub fn from_arc(asset: Arc<dyn ResidentAsset>) -> Self {
        ResolvedObject { inner: asset }
    }

    pub fn debug_name(&self) -> &str {
        self.inner.debug_name()
    }

    /// Caller-side checked cast to a concrete asset type
    pub fn downcast<T: ResidentAsset>(&self) -> Option<Arc<T>> {
        let any: Arc<dyn Any + Send + Sync> = self.inner.clone();
        any.downcast::<T>().ok()
    }

    // Thin pointer to the allocation, used as the identity key
    fn identity(&self) -> *const () {
        Arc::as_ptr(&self.inner) as *const ()
    }
}

impl PartialEq for ResolvedObject {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        std::ptr::eq(self.identity(), other.identity())
    }
}

impl Eq for ResolvedObject {}

impl Hash for ResolvedObject {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for ResolvedObject {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ResolvedObject")
            .field("debug_name", &self.debug_name())
            .field("ptr", &self.identity())
            .finish()
    }
}
