//! Card documents and the pure assembly functions that build them.
//!
//! A card is an ordered sequence of chapters; in this system every chapter
//! holds exactly one track. Chapter and track keys are the zero-padded
//! 1-based sequence number assigned at append time; appending never
//! renumbers or removes what is already there.
//!
//! Unknown fields returned by the API are preserved through
//! `#[serde(flatten)]` maps so that an update sends back exactly what was
//! fetched, plus the appended chapter.

use crate::upload::TranscodedAudio;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Icon reference attached to new chapters and tracks.
const DEFAULT_ICON: &str = "yoto:#aUm9i3ex3qqAMYBv-i-O-pYMKuMJGICtR3Vhf289u2Q";

/// Card identity and title, as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSummary {
    pub card_id: String,
    pub title: String,
}

/// A full card as fetched from the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub card_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<CardContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Card {
    /// The chapter sequence, empty when the card has no content yet.
    pub fn chapters(&self) -> &[Chapter] {
        self.content
            .as_ref()
            .map(|c| c.chapters.as_slice())
            .unwrap_or_default()
    }

    /// Total track count across all chapters.
    pub fn track_count(&self) -> usize {
        self.chapters().iter().map(|c| c.tracks.len()).sum()
    }
}

/// The `content` object of a card document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardContent {
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One chapter of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Zero-padded 2-digit sequence number assigned at append time.
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_label: Option<String>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<Display>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One track of a chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub key: String,
    pub title: String,
    /// Content-addressed reference (`yoto:#<sha256>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub track_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<Display>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Display hints for a chapter or track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Display {
    #[serde(rename = "icon16x16")]
    pub icon_16x16: String,
}

/// Body of a create-card or update-card request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDocument {
    pub title: String,
    pub content: CardContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CardMetadata>,
}

/// Card-level metadata block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardMetadata {
    pub media: MediaMetadata,
}

/// Aggregate media info shown by the player apps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    pub duration: f64,
    pub file_size: u64,
    /// File size in MiB, rounded to one decimal.
    pub readable_file_size: f64,
}

/// Build the document for a brand-new single-track card.
pub fn new_card_document(title: &str, audio: &TranscodedAudio) -> CardDocument {
    let info = &audio.transcoded_info;
    CardDocument {
        title: title.to_string(),
        content: CardContent {
            chapters: vec![sequenced_chapter(1, title, audio)],
            extra: serde_json::Map::new(),
        },
        metadata: Some(CardMetadata {
            media: MediaMetadata {
                duration: info.duration,
                file_size: info.file_size,
                readable_file_size: readable_mib(info.file_size),
            },
        }),
    }
}

/// Build the update document that appends one chapter-with-track to an
/// existing card.
///
/// Existing chapters are passed through unchanged; the new chapter gets
/// the next 1-based sequence number, zero-padded to two digits.
pub fn append_track(card: &Card, track_title: &str, audio: &TranscodedAudio) -> CardDocument {
    let mut content = card.content.clone().unwrap_or_default();
    let next_index = content.chapters.len() + 1;
    content
        .chapters
        .push(sequenced_chapter(next_index, track_title, audio));

    CardDocument {
        title: card.title.clone(),
        content,
        metadata: None,
    }
}

/// A single-track chapter at the given 1-based position.
fn sequenced_chapter(index: usize, title: &str, audio: &TranscodedAudio) -> Chapter {
    let key = format!("{index:02}");
    let overlay_label = index.to_string();
    let info = &audio.transcoded_info;

    let track = Track {
        key: key.clone(),
        title: title.to_string(),
        track_url: Some(audio.track_url()),
        duration: Some(info.duration),
        file_size: Some(info.file_size),
        channels: Some(info.channels),
        format: Some(info.format.clone()),
        track_type: Some("audio".to_string()),
        overlay_label: Some(overlay_label.clone()),
        display: Some(Display {
            icon_16x16: DEFAULT_ICON.to_string(),
        }),
        extra: serde_json::Map::new(),
    };

    Chapter {
        key,
        title: title.to_string(),
        overlay_label: Some(overlay_label),
        tracks: vec![track],
        display: Some(Display {
            icon_16x16: DEFAULT_ICON.to_string(),
        }),
        extra: serde_json::Map::new(),
    }
}

/// File size in MiB, rounded to one decimal.
fn readable_mib(file_size: u64) -> f64 {
    (file_size as f64 / 1024.0 / 1024.0 * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::TranscodedInfo;

    fn sample_audio() -> TranscodedAudio {
        TranscodedAudio {
            transcoded_sha256: "abc123".to_string(),
            transcoded_info: TranscodedInfo {
                duration: 95.0,
                file_size: 1_572_864,
                channels: 2,
                format: "aac".to_string(),
            },
        }
    }

    fn card_with_chapters(chapters: Vec<Chapter>) -> Card {
        Card {
            card_id: "card-1".to_string(),
            title: "Stories".to_string(),
            content: Some(CardContent {
                chapters,
                extra: serde_json::Map::new(),
            }),
            created_at: None,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_new_card_document_shape() {
        let document = new_card_document("Intro", &sample_audio());

        assert_eq!(document.title, "Intro");
        assert_eq!(document.content.chapters.len(), 1);

        let chapter = &document.content.chapters[0];
        assert_eq!(chapter.key, "01");
        assert_eq!(chapter.overlay_label.as_deref(), Some("1"));
        assert_eq!(chapter.tracks.len(), 1);

        let track = &chapter.tracks[0];
        assert_eq!(track.key, "01");
        assert_eq!(track.track_url.as_deref(), Some("yoto:#abc123"));
        assert_eq!(track.track_type.as_deref(), Some("audio"));
        assert_eq!(track.display.as_ref().unwrap().icon_16x16, DEFAULT_ICON);

        let media = &document.metadata.as_ref().unwrap().media;
        assert_eq!(media.duration, 95.0);
        assert_eq!(media.file_size, 1_572_864);
        assert_eq!(media.readable_file_size, 1.5);
    }

    #[test]
    fn test_append_to_empty_card() {
        let card = card_with_chapters(vec![]);
        let document = append_track(&card, "Intro", &sample_audio());

        assert_eq!(document.title, "Stories");
        assert_eq!(document.content.chapters.len(), 1);

        let chapter = &document.content.chapters[0];
        assert_eq!(chapter.key, "01");
        assert_eq!(chapter.overlay_label.as_deref(), Some("1"));
        assert_eq!(chapter.tracks[0].key, "01");
        assert!(document.metadata.is_none());
    }

    #[test]
    fn test_append_to_card_without_content() {
        let card = Card {
            card_id: "card-1".to_string(),
            title: "Stories".to_string(),
            content: None,
            created_at: None,
            extra: serde_json::Map::new(),
        };
        let document = append_track(&card, "Intro", &sample_audio());
        assert_eq!(document.content.chapters[0].key, "01");
    }

    #[test]
    fn test_append_tenth_chapter_is_not_truncated() {
        let chapters: Vec<Chapter> = (1..=9)
            .map(|i| sequenced_chapter(i, &format!("Chapter {i}"), &sample_audio()))
            .collect();
        let card = card_with_chapters(chapters);

        let document = append_track(&card, "Finale", &sample_audio());
        let appended = document.content.chapters.last().unwrap();
        assert_eq!(appended.key, "10");
        assert_eq!(appended.overlay_label.as_deref(), Some("10"));
        assert_eq!(appended.tracks[0].key, "10");
    }

    #[test]
    fn test_append_passes_existing_chapters_through_unchanged() {
        // Chapters fetched from the API can carry fields this crate does
        // not model; they must survive the append untouched.
        let fetched: Chapter = serde_json::from_value(serde_json::json!({
            "key": "01",
            "title": "Old",
            "overlayLabel": "1",
            "tracks": [{
                "key": "01",
                "title": "Old",
                "trackUrl": "yoto:#feedface",
                "ambient": {"volume": 3},
            }],
            "duration": 12,
            "availableFrom": "2025-01-01",
        }))
        .unwrap();
        let card = card_with_chapters(vec![fetched.clone()]);

        let document = append_track(&card, "New", &sample_audio());
        assert_eq!(document.content.chapters.len(), 2);
        assert_eq!(document.content.chapters[0], fetched);

        // Round-trips with the unknown fields intact.
        let serialized = serde_json::to_value(&document.content.chapters[0]).unwrap();
        assert_eq!(serialized["availableFrom"], "2025-01-01");
        assert_eq!(serialized["tracks"][0]["ambient"]["volume"], 3);
    }

    #[test]
    fn test_append_preserves_content_extras() {
        let content: CardContent = serde_json::from_value(serde_json::json!({
            "chapters": [],
            "editSettings": {"autoOverlay": true},
        }))
        .unwrap();
        let card = Card {
            card_id: "card-1".to_string(),
            title: "Stories".to_string(),
            content: Some(content),
            created_at: None,
            extra: serde_json::Map::new(),
        };

        let document = append_track(&card, "Intro", &sample_audio());
        let serialized = serde_json::to_value(&document.content).unwrap();
        assert_eq!(serialized["editSettings"]["autoOverlay"], true);
    }

    #[test]
    fn test_readable_mib_rounds_to_one_decimal() {
        assert_eq!(readable_mib(1_572_864), 1.5);
        assert_eq!(readable_mib(1_500_000), 1.4);
        assert_eq!(readable_mib(0), 0.0);
    }

    #[test]
    fn test_track_count() {
        let card = card_with_chapters(vec![
            sequenced_chapter(1, "A", &sample_audio()),
            sequenced_chapter(2, "B", &sample_audio()),
        ]);
        assert_eq!(card.track_count(), 2);
        assert_eq!(card.chapters().len(), 2);
    }
}
