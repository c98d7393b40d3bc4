use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, server-assigned song identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub String);

impl SongId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SongId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SongId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongField {
    Title,
    Artist,
    Album,
    Genre,
}

impl SongField {
    pub const ALL: [SongField; 4] = [
        SongField::Title,
        SongField::Artist,
        SongField::Album,
        SongField::Genre,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SongField::Title => "title",
            SongField::Artist => "artist",
            SongField::Album => "album",
            SongField::Genre => "genre",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SongField::Title => "Title",
            SongField::Artist => "Artist",
            SongField::Album => "Album",
            SongField::Genre => "Genre",
        }
    }

    /// Maximum length in characters after trimming.
    pub fn max_len(self) -> usize {
        match self {
            SongField::Genre => 50,
            _ => 100,
        }
    }
}

/// A persisted catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    #[serde(rename = "_id", alias = "id")]
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Song {
    pub fn field(&self, field: SongField) -> &str {
        match field {
            SongField::Title => &self.title,
            SongField::Artist => &self.artist,
            SongField::Album => &self.album,
            SongField::Genre => &self.genre,
        }
    }
}

/// An entry that has not been persisted yet, so it carries no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
}

impl NewSong {
    pub fn field(&self, field: SongField) -> &str {
        match field {
            SongField::Title => &self.title,
            SongField::Artist => &self.artist,
            SongField::Album => &self.album,
            SongField::Genre => &self.genre,
        }
    }
}

/// Partial set of song fields. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

impl SongPatch {
    pub fn field(&self, field: SongField) -> Option<&str> {
        match field {
            SongField::Title => self.title.as_deref(),
            SongField::Artist => self.artist.as_deref(),
            SongField::Album => self.album.as_deref(),
            SongField::Genre => self.genre.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        SongField::ALL.iter().all(|field| self.field(*field).is_none())
    }
}

impl From<NewSong> for SongPatch {
    fn from(value: NewSong) -> Self {
        Self {
            title: Some(value.title),
            artist: Some(value.artist),
            album: Some(value.album),
            genre: Some(value.genre),
        }
    }
}

/// Case-insensitive partial-match predicates. Unset or blank fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}

impl FilterCriteria {
    /// Drops blank predicates and trims the rest.
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            genre: clean(self.genre),
            artist: clean(self.artist),
            album: clean(self.album),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clone().normalized() == Self::default()
    }

    pub fn matches(&self, song: &Song) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            match needle.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
                None => true,
            }
        }
        contains(&song.genre, &self.genre)
            && contains(&song.artist, &self.artist)
            && contains(&song.album, &self.album)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}
