use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{NewSong, Song, SongId, SongPatch},
    protocol::{ListSongsQuery, ListSongsResponse, Statistics},
};
use url::Url;

use crate::error::CatalogError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Remote catalog operations. Each call is one request: no retry, no timeout.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list(&self, query: &ListSongsQuery) -> CatalogResult<ListSongsResponse>;
    async fn statistics(&self) -> CatalogResult<Statistics>;
    async fn get(&self, id: &SongId) -> CatalogResult<Song>;
    async fn create(&self, song: &NewSong) -> CatalogResult<Song>;
    async fn update(&self, id: &SongId, patch: &SongPatch) -> CatalogResult<Song>;
    async fn delete(&self, id: &SongId) -> CatalogResult<()>;
}

#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    http: Client,
    base_url: Url,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url.trim())
            .with_context(|| format!("invalid catalog api url '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            bail!("catalog api url '{base_url}' cannot carry a path");
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn song_url(&self, id: &SongId) -> Url {
        self.endpoint(&["songs", id.as_str()])
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn list(&self, query: &ListSongsQuery) -> CatalogResult<ListSongsResponse> {
        let query = ListSongsQuery::new(query.criteria(), query.pagination());
        let response = self
            .http
            .get(self.endpoint(&["songs"]))
            .query(&query)
            .send()
            .await?;
        decode(response).await
    }

    async fn statistics(&self) -> CatalogResult<Statistics> {
        let response = self
            .http
            .get(self.endpoint(&["songs", "statistics"]))
            .send()
            .await?;
        decode(response).await
    }

    async fn get(&self, id: &SongId) -> CatalogResult<Song> {
        let response = self.http.get(self.song_url(id)).send().await?;
        decode(response).await
    }

    async fn create(&self, song: &NewSong) -> CatalogResult<Song> {
        let response = self
            .http
            .post(self.endpoint(&["songs"]))
            .json(song)
            .send()
            .await?;
        decode(response).await
    }

    async fn update(&self, id: &SongId, patch: &SongPatch) -> CatalogResult<Song> {
        let response = self.http.put(self.song_url(id)).json(patch).send().await?;
        decode(response).await
    }

    async fn delete(&self, id: &SongId) -> CatalogResult<()> {
        let response = self.http.delete(self.song_url(id)).send().await?;
        // The confirmation body is informational; an empty one is fine.
        success(response).await.map(drop)
    }
}

async fn success(response: Response) -> CatalogResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.bytes().await.unwrap_or_default();
    Err(CatalogError::from_status(status.as_u16(), &body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> CatalogResult<T> {
    let response = success(response).await?;
    let status = response.status().as_u16();
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| CatalogError::Api {
        status,
        message: format!("invalid response body: {err}"),
    })
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
