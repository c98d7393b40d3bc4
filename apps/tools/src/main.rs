use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use server_api::{create_song, song_statistics, ApiContext};
use shared::domain::SongPatch;
use storage::Storage;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://./data/catalog.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import songs from a JSON array of `{title, artist, album, genre}` objects.
    Import {
        file: PathBuf,
        /// Stop at the first invalid entry instead of skipping it.
        #[arg(long)]
        strict: bool,
    },
    /// Print catalog statistics as JSON.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    let ctx = ApiContext {
        storage: Storage::new(&cli.database_url).await?,
    };

    match cli.command {
        Command::Import { file, strict } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read '{}'", file.display()))?;
            let entries: Vec<SongPatch> = serde_json::from_str(&raw)
                .with_context(|| format!("'{}' is not a JSON array of songs", file.display()))?;

            let mut imported = 0usize;
            let mut skipped = 0usize;
            for (index, entry) in entries.into_iter().enumerate() {
                match create_song(&ctx, entry).await {
                    Ok(_) => imported += 1,
                    Err(err) if !strict => {
                        warn!(index, error = %err, "skipping invalid entry");
                        skipped += 1;
                    }
                    Err(err) => {
                        return Err(err).with_context(|| format!("entry {index} was rejected"))
                    }
                }
            }
            info!(imported, skipped, "import finished");
            println!("imported={imported} skipped={skipped}");
        }
        Command::Stats => {
            let statistics = song_statistics(&ctx).await?;
            println!("{}", serde_json::to_string_pretty(&statistics)?);
        }
    }

    Ok(())
}
