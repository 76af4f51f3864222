//! Queue Manager
//!
//! Ordered, append-only list of playable items, kept index-aligned with the
//! engine's source list: queue index *i* always describes engine source *i*.
//! Every append is mirrored to the engine before the manager returns, so the
//! two lists never diverge. A failed engine append leaves the queue unchanged.

use std::collections::HashSet;

use chapter_common::config::DuplicatePolicy;
use chapter_common::PlayableItem;
use tracing::{debug, info};

use super::engine::{Engine, MediaSource};
use crate::error::{Error, Result};

/// Index-aligned playlist
#[derive(Debug, Default)]
pub struct QueueManager {
    items: Vec<PlayableItem>,
    duplicate_policy: DuplicatePolicy,
}

impl QueueManager {
    pub fn new(duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            items: Vec::new(),
            duplicate_policy,
        }
    }

    /// Append items to the tail and mirror them to the engine
    ///
    /// Returns the ids actually appended (after the duplicate policy). Nothing
    /// reaches the engine when every item is skipped.
    ///
    /// # Errors
    /// - `Error::DuplicateItem` under `DuplicatePolicy::Reject`
    /// - `Error::Engine` if the engine refused the append; the queue is untouched
    pub fn append(
        &mut self,
        items: Vec<PlayableItem>,
        engine: &mut dyn Engine,
    ) -> Result<Vec<String>> {
        let accepted = self.apply_duplicate_policy(items)?;
        if accepted.is_empty() {
            return Ok(Vec::new());
        }

        let sources: Vec<MediaSource> = accepted.iter().map(MediaSource::from).collect();
        engine.append_sources(&sources)?;

        let ids: Vec<String> = accepted.iter().map(|item| item.id.clone()).collect();
        self.items.extend(accepted);
        info!(
            appended = ids.len(),
            queue_len = self.items.len(),
            "Queue appended"
        );
        Ok(ids)
    }

    fn apply_duplicate_policy(&self, items: Vec<PlayableItem>) -> Result<Vec<PlayableItem>> {
        if self.duplicate_policy == DuplicatePolicy::Allow {
            return Ok(items);
        }

        let mut seen: HashSet<String> = self.items.iter().map(|item| item.id.clone()).collect();
        let mut accepted = Vec::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.id.clone()) {
                match self.duplicate_policy {
                    DuplicatePolicy::Reject => return Err(Error::DuplicateItem(item.id)),
                    _ => {
                        debug!(id = %item.id, "Skipping duplicate item");
                        continue;
                    }
                }
            }
            accepted.push(item);
        }
        Ok(accepted)
    }

    /// Position of the first item with this id
    pub fn find_by_id(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Item at `index`
    ///
    /// # Errors
    /// `Error::QueueIndexOutOfRange` when `index >= len`
    pub fn item_at(&self, index: usize) -> Result<&PlayableItem> {
        self.items.get(index).ok_or(Error::QueueIndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Engine sources for the whole queue, in order
    pub fn sources(&self) -> Vec<MediaSource> {
        self.items.iter().map(MediaSource::from).collect()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.items.len().checked_sub(1)
    }

    pub fn is_last_index(&self, index: usize) -> bool {
        self.last_index() == Some(index)
    }

    /// Queue length matches the engine's source count
    pub fn is_aligned_with(&self, engine: &dyn Engine) -> bool {
        self.items.len() == engine.source_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, EngineErrorKind};
    use crate::playback::events::EngineEventSink;
    use crate::playback::simulated::{EngineCall, SimulatedEngine};

    fn item(id: &str) -> PlayableItem {
        PlayableItem::new(id, format!("Chapter {}", id), "Book", 60, format!("src/{}", id), "")
    }

    fn engine() -> SimulatedEngine {
        let (sink, _rx) = EngineEventSink::channel();
        SimulatedEngine::new(sink, 15_000, 15_000)
    }

    #[test]
    fn test_append_mirrors_to_engine() {
        let mut engine = engine();
        let probe = engine.probe();
        let mut queue = QueueManager::new(DuplicatePolicy::Allow);

        let ids = queue.append(vec![item("a"), item("b")], &mut engine).unwrap();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(queue.len(), 2);
        assert!(queue.is_aligned_with(&engine));
        assert_eq!(
            probe.calls(),
            vec![EngineCall::AppendSources(vec!["src/a".into(), "src/b".into()])]
        );
    }

    #[test]
    fn test_engine_failure_leaves_queue_untouched() {
        let mut engine = engine();
        let probe = engine.probe();
        let mut queue = QueueManager::new(DuplicatePolicy::Allow);
        queue.append(vec![item("a")], &mut engine).unwrap();

        probe.fail_next_command(EngineError::new(EngineErrorKind::Unexpected, "full"));
        let result = queue.append(vec![item("b")], &mut engine);
        assert!(matches!(result, Err(Error::Engine(_))));
        assert_eq!(queue.len(), 1);
        assert!(queue.is_aligned_with(&engine));
    }

    #[test]
    fn test_duplicate_allowed_by_default() {
        let mut engine = engine();
        let mut queue = QueueManager::default();
        queue.append(vec![item("a")], &mut engine).unwrap();
        queue.append(vec![item("a")], &mut engine).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.find_by_id("a"), Some(0));
    }

    #[test]
    fn test_duplicate_skipped() {
        let mut engine = engine();
        let probe = engine.probe();
        let mut queue = QueueManager::new(DuplicatePolicy::Skip);
        queue.append(vec![item("a")], &mut engine).unwrap();
        probe.clear_calls();

        let ids = queue.append(vec![item("a")], &mut engine).unwrap();
        assert!(ids.is_empty());
        assert!(probe.calls().is_empty());

        let ids = queue.append(vec![item("b"), item("b")], &mut engine).unwrap();
        assert_eq!(ids, vec!["b"]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut engine = engine();
        let mut queue = QueueManager::new(DuplicatePolicy::Reject);
        queue.append(vec![item("a")], &mut engine).unwrap();

        let result = queue.append(vec![item("c"), item("a")], &mut engine);
        assert!(matches!(result, Err(Error::DuplicateItem(id)) if id == "a"));
        assert_eq!(queue.len(), 1);
        assert!(queue.is_aligned_with(&engine));
    }

    #[test]
    fn test_item_at_out_of_range() {
        let queue = QueueManager::default();
        assert!(matches!(
            queue.item_at(0),
            Err(Error::QueueIndexOutOfRange { index: 0, len: 0 })
        ));
        assert_eq!(queue.last_index(), None);
        assert!(!queue.is_last_index(0));
    }
}
