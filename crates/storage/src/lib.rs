use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, QueryBuilder, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{FilterCriteria, NewSong, Pagination, Song, SongId, SongPatch},
    protocol::{AlbumStats, ArtistStats, GenreCount, Statistics},
};

const SONG_COLUMNS: &str = "id, title, artist, album, genre, created_at, updated_at";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool_options = if is_in_memory(database_url) {
            // Each connection to an in-memory url opens its own empty database.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply song migrations")?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Persists an already validated song and assigns its id and timestamps.
    pub async fn insert_song(&self, song: &NewSong) -> Result<Song> {
        let now = Utc::now().trunc_subsecs(6);
        let stored = Song {
            id: SongId::generate(),
            title: song.title.clone(),
            artist: song.artist.clone(),
            album: song.album.clone(),
            genre: song.genre.clone(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO songs
                (id, title, artist, album, genre, artist_key, album_key, genre_key, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(stored.id.as_str())
        .bind(&stored.title)
        .bind(&stored.artist)
        .bind(&stored.album)
        .bind(&stored.genre)
        .bind(search_key(&stored.artist))
        .bind(search_key(&stored.album))
        .bind(search_key(&stored.genre))
        .bind(encode_timestamp(stored.created_at))
        .bind(encode_timestamp(stored.updated_at))
        .execute(&self.pool)
        .await
        .context("failed to insert song")?;

        Ok(stored)
    }

    /// Songs matching `criteria`, newest first.
    pub async fn list_songs(
        &self,
        criteria: &FilterCriteria,
        pagination: Option<Pagination>,
    ) -> Result<Vec<Song>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {SONG_COLUMNS} FROM songs"));
        push_filters(&mut query, criteria);
        query.push(" ORDER BY created_at DESC, seq DESC");
        if let Some(pagination) = pagination {
            query
                .push(" LIMIT ")
                .push_bind(i64::from(pagination.limit))
                .push(" OFFSET ")
                .push_bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX));
        }

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .context("failed to list songs")?;
        rows.iter().map(song_from_row).collect()
    }

    pub async fn count_songs(&self, criteria: &FilterCriteria) -> Result<u64> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM songs");
        push_filters(&mut query, criteria);
        let row = query
            .build()
            .fetch_one(&self.pool)
            .await
            .context("failed to count songs")?;
        count_at(&row, 0)
    }

    pub async fn load_song(&self, id: &SongId) -> Result<Option<Song>> {
        let row = sqlx::query(&format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .context("failed to load song")?;
        row.as_ref().map(song_from_row).transpose()
    }

    /// Applies only the fields present in `patch`. Returns `None` when no song has `id`.
    pub async fn update_song(&self, id: &SongId, patch: &SongPatch) -> Result<Option<Song>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .context("failed to load song for update")?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut song = song_from_row(&row)?;
        if let Some(title) = &patch.title {
            song.title = title.clone();
        }
        if let Some(artist) = &patch.artist {
            song.artist = artist.clone();
        }
        if let Some(album) = &patch.album {
            song.album = album.clone();
        }
        if let Some(genre) = &patch.genre {
            song.genre = genre.clone();
        }
        song.updated_at = Utc::now().trunc_subsecs(6);

        sqlx::query(
            "UPDATE songs
             SET title = ?, artist = ?, album = ?, genre = ?,
                 artist_key = ?, album_key = ?, genre_key = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.album)
        .bind(&song.genre)
        .bind(search_key(&song.artist))
        .bind(search_key(&song.album))
        .bind(search_key(&song.genre))
        .bind(encode_timestamp(song.updated_at))
        .bind(song.id.as_str())
        .execute(&mut *tx)
        .await
        .context("failed to update song")?;

        tx.commit().await?;
        Ok(Some(song))
    }

    /// Returns `false` when nothing was deleted.
    pub async fn delete_song(&self, id: &SongId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .context("failed to delete song")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn song_statistics(&self) -> Result<Statistics> {
        // One read transaction so the breakdowns agree with the totals.
        let mut tx = self.pool.begin().await?;

        let totals = sqlx::query(
            "SELECT COUNT(*), COUNT(DISTINCT artist), COUNT(DISTINCT album), COUNT(DISTINCT genre)
             FROM songs",
        )
        .fetch_one(&mut *tx)
        .await
        .context("failed to count song totals")?;

        let genre_rows = sqlx::query(
            "SELECT genre, COUNT(*) AS songs
             FROM songs
             GROUP BY genre
             ORDER BY songs DESC, genre ASC",
        )
        .fetch_all(&mut *tx)
        .await
        .context("failed to aggregate genres")?;

        let artist_rows = sqlx::query(
            "SELECT artist, COUNT(*) AS songs, COUNT(DISTINCT album) AS albums
             FROM songs
             GROUP BY artist
             ORDER BY songs DESC, artist ASC",
        )
        .fetch_all(&mut *tx)
        .await
        .context("failed to aggregate artists")?;

        let album_rows = sqlx::query(
            "SELECT artist, album, COUNT(*) AS songs
             FROM songs
             GROUP BY artist, album
             ORDER BY songs DESC, artist ASC, album ASC",
        )
        .fetch_all(&mut *tx)
        .await
        .context("failed to aggregate albums")?;

        tx.commit().await?;

        Ok(Statistics {
            total_songs: count_at(&totals, 0)?,
            total_artists: count_at(&totals, 1)?,
            total_albums: count_at(&totals, 2)?,
            total_genres: count_at(&totals, 3)?,
            songs_per_genre: genre_rows
                .iter()
                .map(|row| -> Result<GenreCount> {
                    Ok(GenreCount {
                        genre: row.try_get("genre")?,
                        count: count_at(row, 1)?,
                    })
                })
                .collect::<Result<_>>()?,
            artist_stats: artist_rows
                .iter()
                .map(|row| -> Result<ArtistStats> {
                    Ok(ArtistStats {
                        artist: row.try_get("artist")?,
                        songs: count_at(row, 1)?,
                        albums: count_at(row, 2)?,
                    })
                })
                .collect::<Result<_>>()?,
            album_stats: album_rows
                .iter()
                .map(|row| -> Result<AlbumStats> {
                    Ok(AlbumStats {
                        artist: row.try_get("artist")?,
                        album: row.try_get("album")?,
                        songs: count_at(row, 2)?,
                    })
                })
                .collect::<Result<_>>()?,
        })
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, criteria: &FilterCriteria) {
    let criteria = criteria.clone().normalized();
    let predicates = [
        ("genre_key", criteria.genre),
        ("artist_key", criteria.artist),
        ("album_key", criteria.album),
    ];

    let mut first = true;
    for (column, needle) in predicates {
        let Some(needle) = needle else {
            continue;
        };
        query.push(if first { " WHERE " } else { " AND " });
        first = false;
        query
            .push("instr(")
            .push(column)
            .push(", ")
            .push_bind(search_key(&needle))
            .push(") > 0");
    }
}

/// Lowercased shadow value used for case-insensitive substring filters.
fn search_key(value: &str) -> String {
    value.to_lowercase()
}

fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid stored timestamp '{raw}'"))?
        .with_timezone(&Utc))
}

fn song_from_row(row: &SqliteRow) -> Result<Song> {
    Ok(Song {
        id: SongId(row.try_get("id")?),
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        album: row.try_get("album")?,
        genre: row.try_get("genre")?,
        created_at: decode_timestamp(row.try_get::<&str, _>("created_at")?)?,
        updated_at: decode_timestamp(row.try_get::<&str, _>("updated_at")?)?,
    })
}

fn count_at(row: &SqliteRow, index: usize) -> Result<u64> {
    let value: i64 = row.try_get(index)?;
    Ok(u64::try_from(value).unwrap_or_default())
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

/// Creates the directory that will hold a file-backed SQLite database.
pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_in_memory(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
