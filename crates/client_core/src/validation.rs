use shared::domain::{NewSong, Song, SongField, SongPatch};
use thiserror::Error;

/// Raw form input before it is allowed near the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongForm {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", summarize(.errors))]
pub struct FormErrors {
    errors: Vec<(SongField, String)>,
}

impl FormErrors {
    pub fn get(&self, field: SongField) -> Option<&str> {
        self.errors
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (SongField, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

fn summarize(errors: &[(SongField, String)]) -> String {
    errors
        .iter()
        .map(|(_, message)| message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl SongForm {
    pub fn from_song(song: &Song) -> Self {
        Self {
            title: Some(song.title.clone()),
            artist: Some(song.artist.clone()),
            album: Some(song.album.clone()),
            genre: Some(song.genre.clone()),
        }
    }

    pub fn field(&self, field: SongField) -> Option<&str> {
        match field {
            SongField::Title => self.title.as_deref(),
            SongField::Artist => self.artist.as_deref(),
            SongField::Album => self.album.as_deref(),
            SongField::Genre => self.genre.as_deref(),
        }
    }

    /// Every field is required.
    pub fn validate(&self) -> Result<NewSong, FormErrors> {
        let patch = self.check(true)?;
        Ok(NewSong {
            title: patch.title.unwrap_or_default(),
            artist: patch.artist.unwrap_or_default(),
            album: patch.album.unwrap_or_default(),
            genre: patch.genre.unwrap_or_default(),
        })
    }

    /// Only the supplied fields are checked; absent ones stay unchanged.
    pub fn validate_patch(&self) -> Result<SongPatch, FormErrors> {
        self.check(false)
    }

    fn check(&self, require_all: bool) -> Result<SongPatch, FormErrors> {
        let mut errors = Vec::new();
        let mut patch = SongPatch::default();

        for field in SongField::ALL {
            let value = match self.field(field) {
                Some(raw) => raw.trim(),
                None if require_all => "",
                None => continue,
            };
            if value.is_empty() {
                errors.push((field, format!("{} is required", field.label())));
                continue;
            }
            if value.chars().count() > field.max_len() {
                errors.push((
                    field,
                    format!(
                        "{} cannot be more than {} characters",
                        field.label(),
                        field.max_len()
                    ),
                ));
                continue;
            }
            let value = Some(value.to_string());
            match field {
                SongField::Title => patch.title = value,
                SongField::Artist => patch.artist = value,
                SongField::Album => patch.album = value,
                SongField::Genre => patch.genre = value,
            }
        }

        if errors.is_empty() {
            Ok(patch)
        } else {
            Err(FormErrors { errors })
        }
    }
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
