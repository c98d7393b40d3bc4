use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client_core::{
    wait_for_outcome, CatalogApi, HttpCatalogClient, Intent, Operation, Orchestrator, Outcome,
    SongForm, Store, DEFAULT_BASE_URL,
};
use futures::stream::BoxStream;
use shared::domain::{FilterCriteria, Pagination, Song, SongId};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(about = "Browse and edit the song catalog")]
struct Args {
    #[arg(long, env = "CATALOG_API_URL", default_value = DEFAULT_BASE_URL)]
    api_url: String,
    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List songs, newest first.
    List {
        #[arg(long)]
        genre: Option<String>,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        album: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Catalog totals and per-genre counts.
    Stats,
    Show {
        id: String,
    },
    Add(SongFields),
    /// Change only the given fields of a song.
    Edit {
        id: String,
        #[command(flatten)]
        fields: SongFields,
    },
    Delete {
        id: String,
    },
}

#[derive(ClapArgs, Debug)]
struct SongFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    artist: Option<String>,
    #[arg(long)]
    album: Option<String>,
    #[arg(long)]
    genre: Option<String>,
}

impl From<SongFields> for SongForm {
    fn from(fields: SongFields) -> Self {
        SongForm {
            title: fields.title,
            artist: fields.artist,
            album: fields.album,
            genre: fields.genre,
        }
    }
}

type Outcomes = BoxStream<'static, Outcome>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();
    let args = Args::parse();

    let api: Arc<dyn CatalogApi> = Arc::new(HttpCatalogClient::new(&args.api_url)?);
    let store = Store::new();
    let _orchestrator = Orchestrator::spawn(api.clone(), store.clone());
    let mut outcomes = store.outcomes();
    debug!(api_url = %args.api_url, "catalog client ready");

    match args.command {
        Command::List {
            genre,
            artist,
            album,
            page,
            limit,
        } => {
            let pagination = limit.map(|limit| Pagination::new(page.unwrap_or(1), limit));
            store.dispatch(Intent::SetPagination(pagination));
            store.dispatch(Intent::ListStart(Some(FilterCriteria {
                genre,
                artist,
                album,
            })));
            settle(&mut outcomes, Operation::List).await?;
            let state = store.snapshot();
            render::songs(&state.songs, &state.page, args.json)?;
        }
        Command::Stats => {
            store.dispatch(Intent::StatisticsStart);
            settle(&mut outcomes, Operation::Statistics).await?;
            let statistics = store.snapshot().statistics.unwrap_or_default();
            render::statistics(&statistics, args.json)?;
        }
        Command::Show { id } => {
            let song = api.get(&SongId(id)).await?;
            render::song(&song, args.json)?;
        }
        Command::Add(fields) => {
            let song = SongForm::from(fields).validate()?;
            store.dispatch(Intent::OpenAdd);
            store.dispatch(Intent::CreateStart(song));
            settle(&mut outcomes, Operation::Create).await?;
            match store.snapshot().songs.last() {
                Some(created) => render::song(created, args.json)?,
                None => bail!("created song missing from the catalog state"),
            }
        }
        Command::Edit { id, fields } => {
            let patch = SongForm::from(fields).validate_patch()?;
            if patch.is_empty() {
                bail!("nothing to change; pass at least one of --title, --artist, --album, --genre");
            }
            let song = load_song(&store, &mut outcomes, SongId(id)).await?;
            store.dispatch(Intent::OpenEdit(song.clone()));
            store.dispatch(Intent::UpdateStart {
                id: song.id.clone(),
                patch,
            });
            settle(&mut outcomes, Operation::Update).await?;
            let state = store.snapshot();
            match state.songs.iter().find(|s| s.id == song.id) {
                Some(updated) => render::song(updated, args.json)?,
                None => bail!("updated song missing from the catalog state"),
            }
        }
        Command::Delete { id } => {
            let song = load_song(&store, &mut outcomes, SongId(id)).await?;
            store.dispatch(Intent::OpenDelete(song.clone()));
            store.dispatch(Intent::DeleteStart(song.id.clone()));
            settle(&mut outcomes, Operation::Delete).await?;
            render::deleted(&song, args.json)?;
        }
    }

    Ok(())
}

/// Loads the full listing into the store and returns the song with `id`.
async fn load_song(store: &Store, outcomes: &mut Outcomes, id: SongId) -> Result<Song> {
    store.dispatch(Intent::ResetFilters);
    store.dispatch(Intent::ListStart(None));
    settle(outcomes, Operation::List).await?;
    match store.snapshot().songs.into_iter().find(|song| song.id == id) {
        Some(song) => Ok(song),
        None => bail!("Song not found: {id}"),
    }
}

async fn settle(outcomes: &mut Outcomes, operation: Operation) -> Result<()> {
    match wait_for_outcome(outcomes, operation).await {
        Some(Outcome { result: Ok(()), .. }) => Ok(()),
        Some(Outcome {
            result: Err(message),
            ..
        }) => bail!("{} failed: {message}", operation.name()),
        None => bail!("catalog store closed before {} finished", operation.name()),
    }
}
