use std::fmt;
use std::sync::Arc;

/// Opaque identifier for a logical asset location. Two paths are equal iff
/// they denote the same asset.
///
/// The distinguished null path means "no asset" and is never valid to load.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetPath(Arc<str>);

impl AssetPath {
    pub fn new<S: AsRef<str>>(path: S) -> Self {
        AssetPath(Arc::from(path.as_ref()))
    }

    /// The path that denotes "no asset"
    pub fn null() -> Self {
        AssetPath(Arc::from(""))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: AsRef<str>> From<S> for AssetPath {
    fn from(s: S) -> Self {
        AssetPath::new(s)
    }
}

impl fmt::Debug for AssetPath {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_tuple("AssetPath").field(&&*self.0).finish()
    }
}

impl fmt::Display for AssetPath {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.is_null() {
            f.write_str("<null>")
        } else {
            f.write_str(&self.0)
        }
    }
}
