use std::io;
use std::sync::{Arc, Mutex};

use resident_base::hashing::{HashMap, HashSet};
use resident_base::{ResolvedObject, Tag};

use crate::loader::LoadInfo;

/// Identifies one event-bus subscription, returned by
/// [`RetentionRegistry::subscribe`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Subscriber = Arc<dyn Fn(&LoadInfo) + Send + Sync>;

/// Per-tag record: the strong references collected under the tag and the
/// number of outstanding holds.
///
/// An entry created by `hold` starts at ref count 1. An entry created by a
/// load completing after its holds were all released starts at ref count 0
/// and can only be removed by an explicit flush.
struct RetentionEntry {
    objects: HashSet<ResolvedObject>,
    ref_count: u32,
}

// Entries and the subscriber list share one lock. Hold/release/flush, the
// trampoline's attach and subscribe/unsubscribe all serialize on it; the lock
// is never held across loader calls or caller callbacks.
struct ByTagState {
    entries: HashMap<Tag, RetentionEntry>,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    next_subscriber_id: u64,
}

struct RegistryShared {
    by_tag: Mutex<ByTagState>,
    // Tag-independent strong set. Separate lock so worker threads (streaming
    // IO completion) can pin assets without contending with gameplay holds.
    loaded_assets: Mutex<HashSet<ResolvedObject>>,
}

/// Concurrent map of `Tag -> RetentionEntry` plus the global strong set.
///
/// Everything an entry holds is a strong reference: as long as a tag is held,
/// the objects attached under it cannot be dropped. Removing the last hold on
/// a tag removes its entry and its strong references in one step.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RetentionRegistry {
    shared: Arc<RegistryShared>,
}

impl Default for RetentionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RetentionRegistry {
    pub fn new() -> Self {
        RetentionRegistry {
            shared: Arc::new(RegistryShared {
                by_tag: Mutex::new(ByTagState {
                    entries: HashMap::default(),
                    subscribers: Vec::default(),
                    next_subscriber_id: 0,
                }),
                loaded_assets: Mutex::new(HashSet::default()),
            }),
        }
    }

    /// Declares interest in `tag`, creating its entry at ref count 1 or
    /// bumping an existing one. Holding the NONE tag is a programmer error
    /// and is rejected.
    pub fn hold(
        &self,
        tag: &Tag,
    ) {
        if tag.is_none() {
            log::error!("hold called with the NONE tag");
            debug_assert!(false, "hold called with the NONE tag");
            return;
        }

        let mut by_tag = self.shared.by_tag.lock().unwrap();
        match by_tag.entries.get_mut(tag) {
            Some(entry) => {
                entry.ref_count += 1;
                log::debug!("hold {} -> {}", tag, entry.ref_count);
            }
            None => {
                log::debug!("hold {} -> 1 (new entry)", tag);
                by_tag.entries.insert(
                    tag.clone(),
                    RetentionEntry {
                        objects: HashSet::default(),
                        ref_count: 1,
                    },
                );
            }
        }
    }

    /// Drops one hold on `tag`. When the last hold is released the entry is
    /// removed and every strong reference it carried is dropped in the same
    /// step.
    ///
    /// Releasing a tag with no outstanding holds is a programmer error when
    /// `warn_if_missing` is set (asserts in debug builds) and a silent no-op
    /// otherwise.
    pub fn release(
        &self,
        tag: &Tag,
        warn_if_missing: bool,
    ) {
        let mut by_tag = self.shared.by_tag.lock().unwrap();
        match by_tag.entries.get_mut(tag) {
            Some(entry) if entry.ref_count > 0 => {
                entry.ref_count -= 1;
                log::debug!("release {} -> {}", tag, entry.ref_count);
                if entry.ref_count == 0 {
                    by_tag.entries.remove(tag);
                    log::debug!("release {} removed entry", tag);
                }
            }
            // A ref count of 0 means the entry was created by a completion
            // that arrived after the last hold was released. There is no hold
            // to balance, so this release is an underflow.
            _ => {
                if warn_if_missing {
                    log::error!("release called for untracked tag {}", tag);
                    debug_assert!(false, "release called for untracked tag {}", tag);
                }
            }
        }
    }

    /// Forced teardown of one tag, no warning regardless of state
    pub fn flush_tag(
        &self,
        tag: &Tag,
    ) {
        let mut by_tag = self.shared.by_tag.lock().unwrap();
        if by_tag.entries.remove(tag).is_some() {
            log::debug!("flush_tag {}", tag);
        }
    }

    /// Clears every tag entry. The tag-independent strong set is untouched.
    pub fn flush_all(&self) {
        let mut by_tag = self.shared.by_tag.lock().unwrap();
        log::debug!("flush_all dropped {} entries", by_tag.entries.len());
        by_tag.entries.clear();
    }

    /// Pins `obj` in memory independent of any tag. Thread safe and
    /// idempotent; safe to call from streaming IO completion threads.
    pub fn add_loaded_asset(
        &self,
        obj: ResolvedObject,
    ) {
        let mut loaded_assets = self.shared.loaded_assets.lock().unwrap();
        loaded_assets.insert(obj);
    }

    /// Completion-side entry point: records `objects` under `tag`. Duplicate
    /// objects coalesce by identity, so replaying a completion is a no-op.
    ///
    /// A missing entry is created at ref count 0 rather than discarded. This
    /// happens for loads whose tag was released (or never held) before the
    /// completion arrived; such an entry persists until a flush.
    pub(crate) fn attach_objects<I: IntoIterator<Item = ResolvedObject>>(
        &self,
        tag: &Tag,
        objects: I,
    ) {
        let mut by_tag = self.shared.by_tag.lock().unwrap();
        let entry = by_tag
            .entries
            .entry(tag.clone())
            .or_insert_with(|| RetentionEntry {
                objects: HashSet::default(),
                ref_count: 0,
            });
        for obj in objects {
            log::debug!("attach {} under {}", obj.debug_name(), tag);
            entry.objects.insert(obj);
        }
    }

    /// Outstanding holds for `tag`, if it has an entry
    pub fn ref_count(
        &self,
        tag: &Tag,
    ) -> Option<u32> {
        let by_tag = self.shared.by_tag.lock().unwrap();
        by_tag.entries.get(tag).map(|entry| entry.ref_count)
    }

    /// Snapshot of the objects retained under `tag`, if it has an entry
    pub fn retained_objects(
        &self,
        tag: &Tag,
    ) -> Option<Vec<ResolvedObject>> {
        let by_tag = self.shared.by_tag.lock().unwrap();
        by_tag
            .entries
            .get(tag)
            .map(|entry| entry.objects.iter().cloned().collect())
    }

    pub fn tag_count(&self) -> usize {
        self.shared.by_tag.lock().unwrap().entries.len()
    }

    pub fn loaded_asset_count(&self) -> usize {
        self.shared.loaded_assets.lock().unwrap().len()
    }

    //
    // Completion event bus
    //

    /// Registers `subscriber` for one event per completed tagged async batch
    pub fn subscribe<F: Fn(&LoadInfo) + Send + Sync + 'static>(
        &self,
        subscriber: F,
    ) -> SubscriberId {
        let mut by_tag = self.shared.by_tag.lock().unwrap();
        let id = SubscriberId(by_tag.next_subscriber_id);
        by_tag.next_subscriber_id += 1;
        by_tag.subscribers.push((id, Arc::new(subscriber)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(
        &self,
        id: SubscriberId,
    ) -> bool {
        let mut by_tag = self.shared.by_tag.lock().unwrap();
        let before = by_tag.subscribers.len();
        by_tag.subscribers.retain(|(sub_id, _)| *sub_id != id);
        by_tag.subscribers.len() != before
    }

    /// Delivers `info` to every subscriber, synchronously on the calling
    /// thread. Subscribers are snapshotted so none of them runs under the
    /// registry lock.
    pub(crate) fn broadcast(
        &self,
        info: &LoadInfo,
    ) {
        let subscribers: Vec<Subscriber> = {
            let by_tag = self.shared.by_tag.lock().unwrap();
            by_tag
                .subscribers
                .iter()
                .map(|(_, subscriber)| subscriber.clone())
                .collect()
        };

        for subscriber in subscribers {
            subscriber(info);
        }
    }

    //
    // Introspection. Read-only snapshots formatted to a caller sink; these
    // need not be consistent with concurrent writers.
    //

    pub fn dump_loaded_assets(
        &self,
        w: &mut dyn io::Write,
    ) -> io::Result<()> {
        let names: Vec<String> = {
            let loaded_assets = self.shared.loaded_assets.lock().unwrap();
            loaded_assets
                .iter()
                .map(|obj| obj.debug_name().to_string())
                .collect()
        };

        writeln!(w, "========== Start Dumping Loaded Assets ==========")?;
        for name in &names {
            writeln!(w, "  {}", name)?;
        }
        writeln!(w, "... {} assets in loaded pool", names.len())?;
        writeln!(w, "========== Finish Dumping Loaded Assets ==========")?;
        Ok(())
    }

    pub fn dump_retained_objects(
        &self,
        w: &mut dyn io::Write,
    ) -> io::Result<()> {
        let tags: Vec<(Tag, Vec<String>)> = {
            let by_tag = self.shared.by_tag.lock().unwrap();
            by_tag
                .entries
                .iter()
                .map(|(tag, entry)| {
                    let names = entry
                        .objects
                        .iter()
                        .map(|obj| obj.debug_name().to_string())
                        .collect();
                    (tag.clone(), names)
                })
                .collect()
        };

        writeln!(w, "========== Start Dumping Retained Assets ==========")?;
        let mut retained_count = 0;
        for (tag, names) in &tags {
            writeln!(w, "{}:", tag)?;
            for name in names {
                writeln!(w, "  {}", name)?;
                retained_count += 1;
            }
        }
        writeln!(w, "... {} assets retained by tags", retained_count)?;
        writeln!(w, "========== Finish Dumping Retained Assets ==========")?;
        Ok(())
    }

    pub fn dump_ref_counts(
        &self,
        w: &mut dyn io::Write,
    ) -> io::Result<()> {
        let counts: Vec<(Tag, u32)> = {
            let by_tag = self.shared.by_tag.lock().unwrap();
            by_tag
                .entries
                .iter()
                .map(|(tag, entry)| (tag.clone(), entry.ref_count))
                .collect()
        };

        for (tag, count) in counts {
            writeln!(w, "{}-{}", tag, count)?;
        }
        Ok(())
    }
}
