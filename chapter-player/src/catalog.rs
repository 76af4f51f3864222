//! Catalog boundary
//!
//! Resolves which item plays by default and which item follows a given one.
//! The session only ever asks two questions, both of which may fail; a failed
//! resolution is logged by the caller and otherwise ignored.

use std::path::Path;

use chapter_common::PlayableItem;
use tracing::debug;

use crate::error::{Error, Result};

const SAMPLE_SOURCE_BASE: &str = "https://storage.googleapis.com/uamp/The_Kyoto_Connection_-_Wake_Up";
const SAMPLE_ARTWORK: &str = "https://storage.googleapis.com/automotive-media/album_art_2.jpg";
const SAMPLE_BOOK: &str = "Book Hyy";

/// Item resolution
pub trait Catalog: Send {
    /// Item to load when playback is requested on an empty queue
    fn default_item(&self) -> Result<PlayableItem>;

    /// Item that follows `id`
    fn next_after(&self, id: &str) -> Result<PlayableItem>;
}

/// Fixed, ordered list of chapters
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    chapters: Vec<PlayableItem>,
}

impl StaticCatalog {
    pub fn new(chapters: Vec<PlayableItem>) -> Self {
        Self { chapters }
    }

    /// Load a JSON array of chapters
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(chapter_common::Error::from)?;
        let chapters: Vec<PlayableItem> =
            serde_json::from_str(&content).map_err(chapter_common::Error::from)?;
        if chapters.is_empty() {
            return Err(chapter_common::Error::InvalidInput(format!(
                "catalog {} contains no chapters",
                path.display()
            ))
            .into());
        }
        debug!(path = %path.display(), chapters = chapters.len(), "Catalog loaded");
        Ok(Self::new(chapters))
    }

    /// Built-in six chapter sample book (ids 18888 to 18893)
    pub fn sample_book() -> Self {
        let chapters = [
            ("18888", "Chapter One", 90, "01_-_Intro_-_The_Way_Of_Waking_Up_feat_Alan_Watts.mp3"),
            ("18889", "Chapter Two", 267, "02_-_Geisha.mp3"),
            ("18890", "Chapter Three", 264, "03_-_Voyage_I_-_Waterfall.mp3"),
            ("18891", "Chapter Four", 223, "04_-_The_Music_In_You.mp3"),
            ("18892", "Chapter Five", 229, "05_-_The_Calm_Before_The_Storm.mp3"),
            ("18893", "Chapter Six", 304, "06_-_No_Pain_No_Gain.mp3"),
        ]
        .into_iter()
        .map(|(id, title, secs, file)| {
            PlayableItem::new(
                id,
                title,
                SAMPLE_BOOK,
                secs,
                format!("{}/{}", SAMPLE_SOURCE_BASE, file),
                SAMPLE_ARTWORK,
            )
        })
        .collect();
        Self::new(chapters)
    }

    pub fn chapters(&self) -> &[PlayableItem] {
        &self.chapters
    }

    /// Resolve an id directly
    pub fn get(&self, id: &str) -> Option<&PlayableItem> {
        self.chapters.iter().find(|chapter| chapter.id == id)
    }
}

impl Catalog for StaticCatalog {
    fn default_item(&self) -> Result<PlayableItem> {
        self.chapters
            .first()
            .cloned()
            .ok_or_else(|| Error::ResolutionFailed("catalog is empty".to_string()))
    }

    fn next_after(&self, id: &str) -> Result<PlayableItem> {
        let position = self
            .chapters
            .iter()
            .position(|chapter| chapter.id == id)
            .ok_or_else(|| Error::ResolutionFailed(format!("unknown item {}", id)))?;

        self.chapters
            .get(position + 1)
            .cloned()
            .ok_or_else(|| Error::ResolutionFailed(format!("no item after {}", id)))
    }
}
