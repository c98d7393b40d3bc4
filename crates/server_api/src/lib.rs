use shared::{
    domain::{NewSong, Song, SongField, SongId, SongPatch},
    error::ApiError,
    protocol::{ListSongsQuery, ListSongsResponse, MessageResponse, Statistics},
};
use storage::Storage;
use tracing::info;

pub const SONG_NOT_FOUND: &str = "Song not found";
pub const SONG_DELETED: &str = "Song deleted successfully";

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn list_songs(
    ctx: &ApiContext,
    query: &ListSongsQuery,
) -> Result<ListSongsResponse, ApiError> {
    let criteria = query.criteria();
    let pagination = query.pagination();

    let songs = ctx
        .storage
        .list_songs(&criteria, pagination)
        .await
        .map_err(internal)?;
    let total = ctx
        .storage
        .count_songs(&criteria)
        .await
        .map_err(internal)?;

    let (total_pages, current_page) = match pagination {
        Some(pagination) => (total.div_ceil(u64::from(pagination.limit)), pagination.page),
        None => (u64::from(total > 0), 1),
    };

    Ok(ListSongsResponse {
        songs,
        total,
        total_pages,
        current_page,
    })
}

pub async fn song_statistics(ctx: &ApiContext) -> Result<Statistics, ApiError> {
    ctx.storage.song_statistics().await.map_err(internal)
}

pub async fn get_song(ctx: &ApiContext, id: &SongId) -> Result<Song, ApiError> {
    ctx.storage
        .load_song(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(SONG_NOT_FOUND))
}

/// Creates a song from possibly incomplete input; every field is required.
pub async fn create_song(ctx: &ApiContext, fields: SongPatch) -> Result<Song, ApiError> {
    let song = validate_new_song(&fields)?;
    let created = ctx.storage.insert_song(&song).await.map_err(internal)?;
    info!(song_id = %created.id, "song created");
    Ok(created)
}

/// Changes only the supplied fields.
pub async fn update_song(
    ctx: &ApiContext,
    id: &SongId,
    patch: SongPatch,
) -> Result<Song, ApiError> {
    let patch = validate_patch(&patch)?;
    let updated = ctx
        .storage
        .update_song(id, &patch)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found(SONG_NOT_FOUND))?;
    info!(song_id = %updated.id, "song updated");
    Ok(updated)
}

pub async fn delete_song(ctx: &ApiContext, id: &SongId) -> Result<MessageResponse, ApiError> {
    let deleted = ctx.storage.delete_song(id).await.map_err(internal)?;
    if !deleted {
        return Err(ApiError::not_found(SONG_NOT_FOUND));
    }
    info!(song_id = %id, "song deleted");
    Ok(MessageResponse {
        message: SONG_DELETED.to_string(),
    })
}

pub fn validate_new_song(fields: &SongPatch) -> Result<NewSong, ApiError> {
    let mut problems = Vec::new();
    let mut values = Vec::with_capacity(SongField::ALL.len());
    for field in SongField::ALL {
        match check_field(field, fields.field(field)) {
            Ok(value) => values.push(value),
            Err(problem) => {
                problems.push(problem);
                values.push(String::new());
            }
        }
    }
    if !problems.is_empty() {
        return Err(validation_failed(&problems));
    }

    let mut values = values.into_iter();
    Ok(NewSong {
        title: values.next().unwrap_or_default(),
        artist: values.next().unwrap_or_default(),
        album: values.next().unwrap_or_default(),
        genre: values.next().unwrap_or_default(),
    })
}

/// Trims supplied fields; absent fields stay absent.
pub fn validate_patch(patch: &SongPatch) -> Result<SongPatch, ApiError> {
    let mut problems = Vec::new();
    let mut check = |field: SongField| match patch.field(field) {
        None => None,
        Some(raw) => match check_field(field, Some(raw)) {
            Ok(value) => Some(value),
            Err(problem) => {
                problems.push(problem);
                None
            }
        },
    };

    let cleaned = SongPatch {
        title: check(SongField::Title),
        artist: check(SongField::Artist),
        album: check(SongField::Album),
        genre: check(SongField::Genre),
    };
    if !problems.is_empty() {
        return Err(validation_failed(&problems));
    }
    Ok(cleaned)
}

fn check_field(field: SongField, raw: Option<&str>) -> Result<String, String> {
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(format!("{}: {}", field.name(), required_message(field)));
    }
    if value.chars().count() > field.max_len() {
        return Err(format!(
            "{}: {} cannot be more than {} characters",
            field.name(),
            subject(field),
            field.max_len()
        ));
    }
    Ok(value.to_string())
}

fn required_message(field: SongField) -> &'static str {
    match field {
        SongField::Title => "Song title is required",
        SongField::Artist => "Artist name is required",
        SongField::Album => "Album name is required",
        SongField::Genre => "Genre is required",
    }
}

fn subject(field: SongField) -> &'static str {
    match field {
        SongField::Title => "Title",
        SongField::Artist => "Artist name",
        SongField::Album => "Album name",
        SongField::Genre => "Genre",
    }
}

fn validation_failed(problems: &[String]) -> ApiError {
    ApiError::validation(format!("Song validation failed: {}", problems.join(", ")))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::internal(format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
