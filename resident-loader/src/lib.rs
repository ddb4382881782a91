pub mod loader;
mod registry;

pub use crate::loader::{LoadInfo, LoadRequest, LoaderIo, OnLoadComplete, RequestOptions};
pub use crate::registry::{RetentionRegistry, SubscriberId};

pub use resident_base::handle::{HandleStatus, LoadHandle};
pub use resident_base::{AssetPath, ResidentAsset, ResolvedObject, Tag};

use std::sync::Arc;

// Control flow for a tagged batch:
//
//   caller -> request_async -> LoaderIo (async) -> completion trampoline
//     -> RetentionRegistry attach -> caller on_complete (per resolved path)
//     -> event bus broadcast
//
// The trampoline runs on whatever thread the loader fires the handle from; by
// host convention that is the main thread. The registry lock is taken only
// inside the attach step, never across loader calls or caller callbacks, so a
// callback is free to issue more requests or holds.

/// Front door of the retention core. Owns the loader and the registry;
/// everything else is reachable through it.
///
/// There is no ambient singleton: construct one per process (or per loader)
/// and pass references through.
pub struct RetentionManager {
    loader: Arc<dyn LoaderIo>,
    registry: RetentionRegistry,
}

impl RetentionManager {
    pub fn new(loader: Arc<dyn LoaderIo>) -> Self {
        RetentionManager {
            loader,
            registry: RetentionRegistry::new(),
        }
    }

    pub fn registry(&self) -> &RetentionRegistry {
        &self.registry
    }

    pub fn loader(&self) -> &Arc<dyn LoaderIo> {
        &self.loader
    }

    //
    // Retention passthroughs
    //

    pub fn hold(
        &self,
        tag: &Tag,
    ) {
        self.registry.hold(tag);
    }

    pub fn release(
        &self,
        tag: &Tag,
        warn_if_missing: bool,
    ) {
        self.registry.release(tag, warn_if_missing);
    }

    pub fn flush_tag(
        &self,
        tag: &Tag,
    ) {
        self.registry.flush_tag(tag);
    }

    pub fn flush_all(&self) {
        self.registry.flush_all();
    }

    pub fn add_loaded_asset(
        &self,
        obj: ResolvedObject,
    ) {
        self.registry.add_loaded_asset(obj);
    }

    pub fn subscribe<F: Fn(&LoadInfo) + Send + Sync + 'static>(
        &self,
        subscriber: F,
    ) -> SubscriberId {
        self.registry.subscribe(subscriber)
    }

    pub fn unsubscribe(
        &self,
        id: SubscriberId,
    ) -> bool {
        self.registry.unsubscribe(id)
    }

    //
    // Request dispatch
    //

    /// Starts an asynchronous batch load. Null paths are dropped and the rest
    /// deduplicated in first-occurrence order before the loader sees them.
    ///
    /// Returns `None`, with zero side effects, if nothing loadable remains or
    /// the loader refuses the batch. Never blocks.
    ///
    /// With `tag != NONE` the returned handle carries the core's completion
    /// trampoline: on completion each resolved path is attached under `tag`,
    /// `on_complete` fires once per resolved path (not once per batch), and
    /// one event goes out on the bus for the batch. With the NONE tag the
    /// registry is never touched and `on_complete` fires once for the whole
    /// batch.
    #[profiling::function]
    pub fn request_async(
        &self,
        paths: &[AssetPath],
        tag: &Tag,
        on_complete: Option<OnLoadComplete>,
        options: RequestOptions,
    ) -> Option<Arc<LoadHandle>> {
        let mut deduped: Vec<AssetPath> = Vec::with_capacity(paths.len());
        for path in paths {
            if path.is_null() {
                continue;
            }
            if !deduped.contains(path) {
                deduped.push(path.clone());
            }
        }

        if deduped.is_empty() {
            log::debug!("request_async: no loadable paths, not dispatching");
            return None;
        }

        let request = LoadRequest {
            paths: deduped.clone(),
            priority: options.priority,
            manage_handle: options.manage_handle,
            start_paused: options.start_paused,
            debug_name: options.debug_name,
        };

        let handle = match self.loader.request_async(request) {
            Some(handle) => handle,
            None => {
                log::warn!("loader refused batch of {} paths", deduped.len());
                return None;
            }
        };

        if !tag.is_none() {
            let info = LoadInfo {
                tag: tag.clone(),
                paths: deduped,
                priority: options.priority,
                on_complete,
            };
            let loader = self.loader.clone();
            let registry = self.registry.clone();
            handle.bind_complete(move || {
                on_tagged_load_complete(&*loader, &registry, &info, true);
            });
        } else if let Some(on_complete) = on_complete {
            handle.bind_complete(move || on_complete());
        }

        Some(handle)
    }

    /// Single-path shape of [`RetentionManager::request_async`]
    pub fn request_async_single(
        &self,
        path: &AssetPath,
        tag: &Tag,
        on_complete: Option<OnLoadComplete>,
        options: RequestOptions,
    ) -> Option<Arc<LoadHandle>> {
        self.request_async(std::slice::from_ref(path), tag, on_complete, options)
    }

    //
    // Synchronous convenience
    //

    /// Non-blocking lookup first, blocking load on a miss. A blocking load
    /// that succeeds with `tag != NONE` attaches the object under the tag the
    /// same way an async completion would, but fires no event on the bus;
    /// only async completions broadcast. `keep_resident` additionally pins
    /// the object in the tag-independent strong set.
    ///
    /// Returns `None` iff the path is null or the load fails.
    pub fn get_asset(
        &self,
        path: &AssetPath,
        tag: &Tag,
        keep_resident: bool,
    ) -> Option<ResolvedObject> {
        if path.is_null() {
            return None;
        }

        let mut was_blocking = false;
        let obj = match self.loader.resolve_loaded(path) {
            Some(obj) => Some(obj),
            None => {
                was_blocking = true;
                self.loader.load_blocking(path)
            }
        };

        let obj = match obj {
            Some(obj) => obj,
            None => {
                log::error!("failed to load asset [{}]", path);
                return None;
            }
        };

        if was_blocking && !tag.is_none() {
            let info = LoadInfo {
                tag: tag.clone(),
                paths: vec![path.clone()],
                priority: 0,
                on_complete: None,
            };
            on_tagged_load_complete(&*self.loader, &self.registry, &info, false);
        }

        if keep_resident {
            self.registry.add_loaded_asset(obj.clone());
        }

        Some(obj)
    }

    /// [`RetentionManager::get_asset`] for class references. Class assets
    /// resolve through the same loader surface and downcast on the caller
    /// side like any other [`ResolvedObject`].
    pub fn get_subclass(
        &self,
        class_path: &AssetPath,
        tag: &Tag,
        keep_resident: bool,
    ) -> Option<ResolvedObject> {
        self.get_asset(class_path, tag, keep_resident)
    }

    //
    // Introspection passthroughs
    //

    pub fn dump_loaded_assets(
        &self,
        w: &mut dyn std::io::Write,
    ) -> std::io::Result<()> {
        self.registry.dump_loaded_assets(w)
    }

    pub fn dump_retained_objects(
        &self,
        w: &mut dyn std::io::Write,
    ) -> std::io::Result<()> {
        self.registry.dump_retained_objects(w)
    }

    pub fn dump_ref_counts(
        &self,
        w: &mut dyn std::io::Write,
    ) -> std::io::Result<()> {
        self.registry.dump_ref_counts(w)
    }
}

// Bridges a fired handle to registry mutation and caller notification. Runs
// on the loader's completion thread. Idempotent: replaying it re-resolves the
// same objects and attaching an already-present object is a no-op.
#[profiling::function]
fn on_tagged_load_complete(
    loader: &dyn LoaderIo,
    registry: &RetentionRegistry,
    info: &LoadInfo,
    broadcast: bool,
) {
    for path in &info.paths {
        match loader.resolve_loaded(path) {
            Some(obj) => {
                registry.attach_objects(&info.tag, [obj]);
                if let Some(on_complete) = &info.on_complete {
                    on_complete();
                }
            }
            None => {
                // Cancelled or failed for this path. Skip it; the rest of the
                // batch still attaches.
                log::warn!("asset [{}] did not resolve after load, skipping", path);
            }
        }
    }

    if broadcast {
        registry.broadcast(info);
    }
}
