//! Playable item model
//!
//! A `PlayableItem` is one chapter of a book: an identifier plus the display
//! and source attributes the engine and observers need. Items are immutable
//! once built and cross component boundaries either as serde values (catalog
//! files) or as an ordered parcel of primitive fields.

use serde::{Deserialize, Serialize};

use crate::time::secs_to_millis;
use crate::{Error, Result};

/// Number of fields in a flattened item
pub const PARCEL_FIELD_COUNT: usize = 6;

/// One chapter of audio content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableItem {
    /// Identifier, unique within a session (not enforced, see `DuplicatePolicy`)
    pub id: String,
    /// Display title (chapter name)
    pub title: String,
    /// Display subtitle (book name)
    pub subtitle: String,
    /// Duration in whole seconds
    #[serde(default)]
    pub duration_secs: u64,
    /// Source locator handed to the engine
    pub source: String,
    /// Artwork locator
    #[serde(default)]
    pub artwork: String,
}

/// A single primitive value in a flattened item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelValue {
    Str(String),
    /// Unsigned so every `duration_secs` survives the round trip
    Long(u64),
}

impl PlayableItem {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        subtitle: impl Into<String>,
        duration_secs: u64,
        source: impl Into<String>,
        artwork: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: subtitle.into(),
            duration_secs,
            source: source.into(),
            artwork: artwork.into(),
        }
    }

    /// Duration in milliseconds, as the engine counts time
    pub fn duration_ms(&self) -> u64 {
        secs_to_millis(self.duration_secs)
    }

    /// Flatten into an ordered field list
    ///
    /// Field order: title, subtitle, source, id, duration, artwork.
    pub fn flatten(&self) -> Vec<ParcelValue> {
        vec![
            ParcelValue::Str(self.title.clone()),
            ParcelValue::Str(self.subtitle.clone()),
            ParcelValue::Str(self.source.clone()),
            ParcelValue::Str(self.id.clone()),
            ParcelValue::Long(self.duration_secs),
            ParcelValue::Str(self.artwork.clone()),
        ]
    }

    /// Rebuild an item from the list produced by [`PlayableItem::flatten`]
    pub fn reconstruct(fields: &[ParcelValue]) -> Result<Self> {
        if fields.len() != PARCEL_FIELD_COUNT {
            return Err(Error::InvalidInput(format!(
                "Parcel has {} fields, expected {}",
                fields.len(),
                PARCEL_FIELD_COUNT
            )));
        }

        let duration_secs = match &fields[4] {
            ParcelValue::Long(value) => *value,
            other => {
                return Err(Error::InvalidInput(format!("Expected duration at field 4, found {:?}", other)))
            }
        };

        Ok(Self {
            title: parcel_str(fields, 0)?,
            subtitle: parcel_str(fields, 1)?,
            source: parcel_str(fields, 2)?,
            id: parcel_str(fields, 3)?,
            duration_secs,
            artwork: parcel_str(fields, 5)?,
        })
    }
}

fn parcel_str(fields: &[ParcelValue], index: usize) -> Result<String> {
    match &fields[index] {
        ParcelValue::Str(value) => Ok(value.clone()),
        other => Err(Error::InvalidInput(format!(
            "Expected string at field {}, found {:?}",
            index, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(duration_secs: u64) -> PlayableItem {
        PlayableItem::new(
            "18890",
            "Chapter Three",
            "Book Hyy",
            duration_secs,
            "https://example.com/03.mp3",
            "https://example.com/art.jpg",
        )
    }

    #[test]
    fn test_parcel_round_trip_preserves_fields() {
        let item = chapter(264);
        let rebuilt = PlayableItem::reconstruct(&item.flatten()).unwrap();
        assert_eq!(rebuilt, item);
    }

    #[test]
    fn test_parcel_round_trip_zero_duration() {
        let item = chapter(0);
        let rebuilt = PlayableItem::reconstruct(&item.flatten()).unwrap();
        assert_eq!(rebuilt.duration_secs, 0);
        assert_eq!(rebuilt, item);
    }

    #[test]
    fn test_parcel_round_trip_largest_duration() {
        let item = chapter(u64::MAX);
        assert_eq!(item.flatten()[4], ParcelValue::Long(u64::MAX));
        let rebuilt = PlayableItem::reconstruct(&item.flatten()).unwrap();
        assert_eq!(rebuilt.duration_secs, u64::MAX);
        assert_eq!(rebuilt, item);
    }

    #[test]
    fn test_flatten_field_order() {
        let fields = chapter(90).flatten();
        assert_eq!(fields[0], ParcelValue::Str("Chapter Three".to_string()));
        assert_eq!(fields[3], ParcelValue::Str("18890".to_string()));
        assert_eq!(fields[4], ParcelValue::Long(90));
    }

    #[test]
    fn test_reconstruct_rejects_short_parcel() {
        let mut fields = chapter(90).flatten();
        fields.pop();
        assert!(matches!(
            PlayableItem::reconstruct(&fields),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_reconstruct_rejects_wrong_type() {
        let mut fields = chapter(90).flatten();
        fields[4] = ParcelValue::Str("ninety".to_string());
        assert!(PlayableItem::reconstruct(&fields).is_err());

        let mut fields = chapter(90).flatten();
        fields[0] = ParcelValue::Long(1);
        assert!(PlayableItem::reconstruct(&fields).is_err());
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(chapter(264).duration_ms(), 264_000);
    }

    #[test]
    fn test_serde_defaults_missing_duration() {
        let json = r#"{"id":"1","title":"t","subtitle":"s","source":"u"}"#;
        let item: PlayableItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.duration_secs, 0);
        assert_eq!(item.artwork, "");
    }
}
