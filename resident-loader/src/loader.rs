use std::fmt;
use std::sync::Arc;

use resident_base::handle::LoadHandle;
use resident_base::{AssetPath, ResolvedObject, Tag};

//
// Interface to the underlying fetcher
//
// The retention core never performs IO itself. It forwards deduplicated path
// batches to a LoaderIo, which owns the actual streaming (disk, pak files,
// network, test doubles). The loader allocates one LoadHandle per dispatched
// batch and signals it when the batch finishes or is cancelled.
//

/// Caller-supplied completion callback. Carried in the [`LoadInfo`] record and
/// invoked by the completion trampoline once per resolved path in the batch.
pub type OnLoadComplete = Arc<dyn Fn() + Send + Sync>;

/// Options forwarded verbatim to the loader with each request. The core never
/// interprets these.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub priority: i32,
    /// When set, the loader keeps the handle alive until completion even if
    /// the caller drops its references. Otherwise dropping the handle is a
    /// cancellation hint.
    pub manage_handle: bool,
    pub start_paused: bool,
    pub debug_name: String,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            priority: 0,
            manage_handle: false,
            start_paused: false,
            debug_name: String::default(),
        }
    }
}

/// One deduplicated batch handed to the loader
#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub paths: Vec<AssetPath>,
    pub priority: i32,
    pub manage_handle: bool,
    pub start_paused: bool,
    pub debug_name: String,
}

/// Asynchronous asset fetcher consumed by the retention core.
///
/// Contract:
/// - `request_async` starts a batch load and returns its handle, or `None` if
///   the load could not start. The handle fires exactly once.
/// - `load_blocking` resolves a single path synchronously, blocking the
///   calling thread for as long as the IO takes.
/// - `resolve_loaded` is a non-blocking lookup that only succeeds for paths
///   whose load has already completed.
pub trait LoaderIo: Send + Sync {
    fn request_async(
        &self,
        request: LoadRequest,
    ) -> Option<Arc<LoadHandle>>;

    fn load_blocking(
        &self,
        path: &AssetPath,
    ) -> Option<ResolvedObject>;

    fn resolve_loaded(
        &self,
        path: &AssetPath,
    ) -> Option<ResolvedObject>;
}

/// Context record for one tagged load. The completion trampoline captures one
/// of these per dispatched batch; event-bus subscribers receive it read-only
/// after the batch completes.
#[derive(Clone)]
pub struct LoadInfo {
    pub tag: Tag,
    /// Deduplicated paths in first-occurrence order
    pub paths: Vec<AssetPath>,
    pub priority: i32,
    pub on_complete: Option<OnLoadComplete>,
}

impl fmt::Debug for LoadInfo {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("LoadInfo")
            .field("tag", &self.tag)
            .field("paths", &self.paths)
            .field("priority", &self.priority)
            .field("has_on_complete", &self.on_complete.is_some())
            .finish()
    }
}
