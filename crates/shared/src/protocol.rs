use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FilterCriteria, Pagination, Song};

/// Query string accepted by `GET /songs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSongsQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ListSongsQuery {
    pub fn new(criteria: FilterCriteria, pagination: Option<Pagination>) -> Self {
        let criteria = criteria.normalized();
        Self {
            genre: criteria.genre,
            artist: criteria.artist,
            album: criteria.album,
            page: pagination.map(|p| p.page),
            limit: pagination.map(|p| p.limit),
        }
    }

    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            genre: self.genre.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
        }
        .normalized()
    }

    /// Pagination applies only when a limit is given.
    pub fn pagination(&self) -> Option<Pagination> {
        self.limit
            .map(|limit| Pagination::new(self.page.unwrap_or(1), limit))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSongsResponse {
    pub songs: Vec<Song>,
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreCount {
    #[serde(rename = "_id")]
    pub genre: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistStats {
    pub artist: String,
    pub songs: u64,
    pub albums: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumStats {
    pub artist: String,
    pub album: String,
    pub songs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_songs: u64,
    pub total_artists: u64,
    pub total_albums: u64,
    pub total_genres: u64,
    pub songs_per_genre: Vec<GenreCount>,
    #[serde(default)]
    pub artist_stats: Vec<ArtistStats>,
    #[serde(default)]
    pub album_stats: Vec<AlbumStats>,
}

impl Statistics {
    pub fn genre_total(&self) -> u64 {
        self.songs_per_genre.iter().map(|g| g.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
