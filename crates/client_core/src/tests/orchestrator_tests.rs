use super::*;
use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{FilterCriteria, NewSong, Pagination, Song, SongId, SongPatch},
    protocol::{GenreCount, ListSongsResponse, Statistics},
};
use tokio::{sync::Notify, time::timeout};

use crate::{
    store::{wait_for_outcome, ModalContext},
    transport::CatalogResult,
};

/// In-memory catalog with the same observable behavior as the HTTP service.
#[derive(Default)]
struct FakeCatalog {
    songs: Mutex<Vec<Song>>,
    next_id: Mutex<u32>,
    queries: Mutex<Vec<ListSongsQuery>>,
    /// When set, deletes wait for a release before answering.
    delete_gate: Option<Arc<Notify>>,
}

impl FakeCatalog {
    fn with_songs(songs: Vec<Song>) -> Self {
        Self {
            songs: Mutex::new(songs),
            ..Default::default()
        }
    }

    fn ids(&self) -> Vec<SongId> {
        self.songs
            .lock()
            .expect("lock")
            .iter()
            .map(|s| s.id.clone())
            .collect()
    }
}

#[async_trait]
impl CatalogApi for FakeCatalog {
    async fn list(&self, query: &ListSongsQuery) -> CatalogResult<ListSongsResponse> {
        self.queries.lock().expect("lock").push(query.clone());
        let criteria = query.criteria();
        let songs: Vec<Song> = self
            .songs
            .lock()
            .expect("lock")
            .iter()
            .filter(|song| criteria.matches(song))
            .cloned()
            .collect();
        let total = songs.len() as u64;
        Ok(ListSongsResponse {
            songs,
            total,
            total_pages: u64::from(total > 0),
            current_page: 1,
        })
    }

    async fn statistics(&self) -> CatalogResult<Statistics> {
        let songs = self.songs.lock().expect("lock");
        let mut genres: Vec<GenreCount> = Vec::new();
        for song in songs.iter() {
            match genres.iter_mut().find(|g| g.genre == song.genre) {
                Some(entry) => entry.count += 1,
                None => genres.push(GenreCount {
                    genre: song.genre.clone(),
                    count: 1,
                }),
            }
        }
        Ok(Statistics {
            total_songs: songs.len() as u64,
            total_genres: genres.len() as u64,
            songs_per_genre: genres,
            ..Default::default()
        })
    }

    async fn get(&self, id: &SongId) -> CatalogResult<Song> {
        self.songs
            .lock()
            .expect("lock")
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound("Song not found".into()))
    }

    async fn create(&self, song: &NewSong) -> CatalogResult<Song> {
        if song.genre.trim().is_empty() {
            return Err(CatalogError::Validation(
                "Song validation failed: genre: Genre is required".into(),
            ));
        }
        let mut next_id = self.next_id.lock().expect("lock");
        *next_id += 1;
        let created = Song {
            id: SongId(format!("new-{next_id}")),
            title: song.title.clone(),
            artist: song.artist.clone(),
            album: song.album.clone(),
            genre: song.genre.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.songs.lock().expect("lock").push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &SongId, patch: &SongPatch) -> CatalogResult<Song> {
        let mut songs = self.songs.lock().expect("lock");
        let song = songs
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| CatalogError::NotFound("Song not found".into()))?;
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
        Ok(song.clone())
    }

    async fn delete(&self, id: &SongId) -> CatalogResult<()> {
        if let Some(gate) = &self.delete_gate {
            gate.notified().await;
        }
        let mut songs = self.songs.lock().expect("lock");
        let before = songs.len();
        songs.retain(|s| &s.id != id);
        if songs.len() == before {
            return Err(CatalogError::NotFound("Song not found".into()));
        }
        Ok(())
    }
}

fn song(id: &str, artist: &str, genre: &str) -> Song {
    Song {
        id: SongId::from(id),
        title: format!("title {id}"),
        artist: artist.into(),
        album: "Album".into(),
        genre: genre.into(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn catalog() -> Vec<Song> {
    vec![
        song("1", "Daisy", "Pop"),
        song("2", "Bob", "Reggae"),
        song("3", "Carol", "Pop"),
    ]
}

async fn settled<T>(future: impl std::future::Future<Output = T>) -> T {
    timeout(Duration::from_secs(5), future)
        .await
        .expect("orchestrator did not settle in time")
}

async fn loaded_store(api: Arc<FakeCatalog>) -> (Store, OrchestratorHandle) {
    let store = Store::new();
    let handle = Orchestrator::spawn(api, store.clone());
    let mut outcomes = store.outcomes();
    store.dispatch(Intent::ListStart(None));
    let outcome = settled(wait_for_outcome(&mut outcomes, Operation::List))
        .await
        .expect("list outcome");
    assert_eq!(outcome.result, Ok(()));
    (store, handle)
}

#[tokio::test]
async fn list_start_loads_collection_and_settles() {
    let api = Arc::new(FakeCatalog::with_songs(catalog()));
    let (store, _handle) = loaded_store(api).await;
    let state = store.snapshot();
    assert_eq!(state.songs.len(), 3);
    assert_eq!(state.page.total, 3);
    assert!(!state.is_loading());
    assert_eq!(state.error(), None);
}

#[tokio::test]
async fn artist_filter_matches_partial_case_insensitive() {
    let api = Arc::new(FakeCatalog::with_songs(catalog()));
    let store = Store::new();
    let _handle = Orchestrator::spawn(api, store.clone());
    let mut outcomes = store.outcomes();

    store.dispatch(Intent::ListStart(Some(FilterCriteria {
        artist: Some("dai".into()),
        ..Default::default()
    })));
    settled(wait_for_outcome(&mut outcomes, Operation::List)).await;

    let state = store.snapshot();
    assert_eq!(state.songs.len(), 1);
    assert_eq!(state.songs[0].artist, "Daisy");
    assert!(state.songs.iter().all(|s| s.artist != "Bob"));
}

#[tokio::test]
async fn list_without_criteria_uses_store_filters_and_pagination() {
    let api = Arc::new(FakeCatalog::with_songs(catalog()));
    let store = Store::new();
    let _handle = Orchestrator::spawn(api.clone(), store.clone());
    let mut outcomes = store.outcomes();

    store.dispatch(Intent::SetFilterCriteria(FilterCriteria {
        genre: Some("pop".into()),
        ..Default::default()
    }));
    store.dispatch(Intent::SetPagination(Some(Pagination::new(1, 20))));
    store.dispatch(Intent::ListStart(None));
    settled(wait_for_outcome(&mut outcomes, Operation::List)).await;

    let queries = api.queries.lock().expect("lock").clone();
    assert_eq!(queries[0].genre.as_deref(), Some("pop"));
    assert_eq!(queries[0].limit, Some(20));
    assert_eq!(store.snapshot().songs.len(), 2);
}

#[tokio::test]
async fn later_filter_and_page_changes_do_not_leak_into_an_earlier_listing() {
    let api = Arc::new(FakeCatalog::with_songs(catalog()));
    let store = Store::new();
    let _handle = Orchestrator::spawn(api.clone(), store.clone());
    let mut outcomes = store.outcomes();

    store.dispatch(Intent::ListStart(None));
    store.dispatch(Intent::SetPagination(Some(Pagination::new(2, 1))));
    store.dispatch(Intent::SetFilterCriteria(FilterCriteria {
        genre: Some("reggae".into()),
        ..Default::default()
    }));
    settled(wait_for_outcome(&mut outcomes, Operation::List)).await;

    let queries = api.queries.lock().expect("lock").clone();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0], ListSongsQuery::default());
    assert_eq!(store.snapshot().songs.len(), 3);
}

#[tokio::test]
async fn burst_of_deletes_settles_every_request() {
    let songs: Vec<Song> = (0..1500)
        .map(|n| song(&format!("s{n}"), "Daisy", "Pop"))
        .collect();
    let ids: Vec<SongId> = songs.iter().map(|s| s.id.clone()).collect();
    let api = Arc::new(FakeCatalog::with_songs(songs));
    let store = Store::new();
    let _handle = Orchestrator::spawn(api.clone(), store.clone());
    let mut watcher = store.watch();

    for id in ids {
        store.dispatch(Intent::DeleteStart(id));
    }
    settled(watcher.wait_for(|state| !state.is_loading()))
        .await
        .expect("store alive");

    let state = store.snapshot();
    for operation in Operation::ALL {
        assert_eq!(
            state.requests.operation(operation).in_flight,
            0,
            "{} still in flight",
            operation.name()
        );
    }
    assert_eq!(state.error(), None);
    assert!(api.ids().is_empty());
}

#[tokio::test]
async fn create_appends_closes_modal_and_refreshes_statistics() {
    let api = Arc::new(FakeCatalog::with_songs(catalog()));
    let (store, _handle) = loaded_store(api.clone()).await;
    let mut outcomes = store.outcomes();

    store.dispatch(Intent::OpenAdd);
    store.dispatch(Intent::CreateStart(NewSong {
        title: "Bloom".into(),
        artist: "Daisy".into(),
        album: "Spring".into(),
        genre: "Rock".into(),
    }));
    let created = settled(wait_for_outcome(&mut outcomes, Operation::Create))
        .await
        .expect("create outcome");
    assert_eq!(created.result, Ok(()));
    settled(wait_for_outcome(&mut outcomes, Operation::Statistics)).await;

    let state = store.snapshot();
    let added = state
        .songs
        .iter()
        .find(|s| s.title == "Bloom")
        .expect("created song listed");
    assert!(!added.id.as_str().is_empty());
    assert_eq!(state.modal, ModalContext::None);

    let statistics = state.statistics.clone().expect("statistics refreshed");
    assert_eq!(statistics.total_songs, 4);
    assert_eq!(statistics.genre_total(), statistics.total_songs);
    assert!(!state.is_loading());
}

#[tokio::test]
async fn create_without_genre_fails_and_leaves_collection_unchanged() {
    let api = Arc::new(FakeCatalog::with_songs(catalog()));
    let (store, _handle) = loaded_store(api.clone()).await;
    let mut outcomes = store.outcomes();

    store.dispatch(Intent::OpenAdd);
    store.dispatch(Intent::CreateStart(NewSong {
        title: "Bloom".into(),
        artist: "Daisy".into(),
        album: "Spring".into(),
        genre: String::new(),
    }));
    let outcome = settled(wait_for_outcome(&mut outcomes, Operation::Create))
        .await
        .expect("create outcome");
    let message = outcome.result.expect_err("validation failure");
    assert!(message.contains("Genre is required"));

    let state = store.snapshot();
    assert_eq!(state.songs.len(), 3);
    assert_eq!(api.ids().len(), 3);
    assert_eq!(state.modal, ModalContext::Add, "failures keep the modal open");
    assert_eq!(state.error(), Some(message.as_str()));
    assert!(!state.is_loading());
}

#[tokio::test]
async fn update_changes_only_supplied_fields() {
    let api = Arc::new(FakeCatalog::with_songs(catalog()));
    let (store, _handle) = loaded_store(api.clone()).await;
    let mut outcomes = store.outcomes();
    let original = store.snapshot().songs[1].clone();

    store.dispatch(Intent::OpenEdit(original.clone()));
    store.dispatch(Intent::UpdateStart {
        id: original.id.clone(),
        patch: SongPatch {
            album: Some("Island".into()),
            ..Default::default()
        },
    });
    settled(wait_for_outcome(&mut outcomes, Operation::Update)).await;

    let state = store.snapshot();
    let updated = state
        .songs
        .iter()
        .find(|s| s.id == original.id)
        .expect("still listed");
    assert_eq!(updated.album, "Island");
    assert_eq!(updated.title, original.title);
    assert_eq!(updated.artist, original.artist);
    assert_eq!(updated.genre, original.genre);
    assert_eq!(state.modal, ModalContext::None);
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let api = Arc::new(FakeCatalog::with_songs(catalog()));
    let (store, _handle) = loaded_store(api.clone()).await;
    let mut outcomes = store.outcomes();
    let target = SongId::from("2");

    store.dispatch(Intent::DeleteStart(target.clone()));
    settled(wait_for_outcome(&mut outcomes, Operation::Delete)).await;

    assert!(store.snapshot().songs.iter().all(|s| s.id != target));
    let err = api.get(&target).await.expect_err("deleted");
    assert!(matches!(err, CatalogError::NotFound(_)));

    store.dispatch(Intent::DeleteStart(target));
    let outcome = settled(wait_for_outcome(&mut outcomes, Operation::Delete))
        .await
        .expect("second delete outcome");
    assert_eq!(outcome.result, Err("Song not found".into()));
}

#[tokio::test]
async fn back_to_back_deletes_remove_both_entries() {
    let gate = Arc::new(Notify::new());
    let api = Arc::new(FakeCatalog {
        songs: Mutex::new(catalog()),
        delete_gate: Some(gate.clone()),
        ..Default::default()
    });
    let (store, _handle) = loaded_store(api.clone()).await;
    let mut outcomes = store.outcomes();

    store.dispatch(Intent::DeleteStart(SongId::from("1")));
    store.dispatch(Intent::DeleteStart(SongId::from("3")));
    settled(async {
        while store.snapshot().requests.operation(Operation::Delete).in_flight < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(store.snapshot().is_loading());

    // Release the waiting deletes one at a time.
    gate.notify_one();
    settled(wait_for_outcome(&mut outcomes, Operation::Delete)).await;
    assert!(
        store.snapshot().requests.is_pending(Operation::Delete),
        "the other delete is still running"
    );
    gate.notify_one();
    settled(wait_for_outcome(&mut outcomes, Operation::Delete)).await;

    let state = store.snapshot();
    assert_eq!(
        state.songs.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        vec!["2"]
    );
    assert!(!state.requests.is_pending(Operation::Delete));
    assert_eq!(api.ids(), vec![SongId::from("2")]);
}

#[tokio::test]
async fn statistics_failure_is_reported() {
    struct Offline;

    #[async_trait]
    impl CatalogApi for Offline {
        async fn list(&self, _: &ListSongsQuery) -> CatalogResult<ListSongsResponse> {
            Err(CatalogError::Network("connection refused".into()))
        }
        async fn statistics(&self) -> CatalogResult<Statistics> {
            Err(CatalogError::Network("connection refused".into()))
        }
        async fn get(&self, _: &SongId) -> CatalogResult<Song> {
            Err(CatalogError::Network("connection refused".into()))
        }
        async fn create(&self, _: &NewSong) -> CatalogResult<Song> {
            Err(CatalogError::Network("connection refused".into()))
        }
        async fn update(&self, _: &SongId, _: &SongPatch) -> CatalogResult<Song> {
            Err(CatalogError::Network("connection refused".into()))
        }
        async fn delete(&self, _: &SongId) -> CatalogResult<()> {
            Err(CatalogError::Network("connection refused".into()))
        }
    }

    let intents = perform(&Offline, &ListSongsQuery::default(), Intent::StatisticsStart).await;
    assert_eq!(
        intents,
        vec![Intent::StatisticsFailure(
            "network error: connection refused".into()
        )]
    );

    let intents = perform(
        &Offline,
        &ListSongsQuery::default(),
        Intent::DeleteStart(SongId::from("1")),
    )
    .await;
    assert_eq!(
        intents,
        vec![Intent::RequestFailed {
            operation: Operation::Delete,
            message: "network error: connection refused".into()
        }]
    );
}

#[tokio::test]
async fn mutation_success_is_followed_by_close_and_statistics() {
    let api = FakeCatalog::with_songs(catalog());
    let intents = perform(
        &api,
        &ListSongsQuery::default(),
        Intent::DeleteStart(SongId::from("1")),
    )
    .await;
    assert_eq!(
        intents,
        vec![
            Intent::DeleteSuccess(SongId::from("1")),
            Intent::CloseModal,
            Intent::StatisticsStart,
        ]
    );
    assert!(perform(&api, &ListSongsQuery::default(), Intent::OpenAdd)
        .await
        .is_empty());
}

#[tokio::test]
async fn dropping_the_handle_stops_new_effects() {
    let api = Arc::new(FakeCatalog::with_songs(catalog()));
    let store = Store::new();
    let handle = Orchestrator::spawn(api.clone(), store.clone());
    drop(handle);
    tokio::task::yield_now().await;

    store.dispatch(Intent::ListStart(None));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(api.queries.lock().expect("lock").is_empty());
    assert!(store.snapshot().is_loading());
}
