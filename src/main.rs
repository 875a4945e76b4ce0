use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use video_script_studio::config::Config;
use video_script_studio::upload::LocalFile;
use video_script_studio::{Orchestrator, RequestStatus, init};

#[derive(Debug, Parser)]
#[command(name = "studio", about = "Generate video scripts, narrate them and assemble clips")]
struct Cli {
    /// Path to config.json
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a video script for a topic
    Script {
        prompt: String,
        /// Copy the generated script to the clipboard
        #[arg(long)]
        copy: bool,
    },
    /// Convert text to speech
    Speak { text: String },
    /// Search stock videos matching a script
    Search {
        query: String,
        /// Download every result into the downloads folder
        #[arg(long)]
        download: bool,
    },
    /// Search, select results by index, add local clips and write the merge playlist
    Assemble {
        #[arg(long)]
        query: String,
        /// Result indexes to keep, e.g. 0,2
        #[arg(long, value_delimiter = ',')]
        select: Vec<usize>,
        /// Local video files appended after the selected results
        #[arg(long)]
        upload: Vec<PathBuf>,
        /// Playlist path, defaults to <output_dir>/playlists/merge.ffconcat
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Keeps the first occurrence of each index, so repeating one in `--select`
/// does not toggle it back off.
fn distinct_indexes(select: Vec<usize>) -> Vec<usize> {
    let mut seen = HashSet::new();
    select.into_iter().filter(|i| seen.insert(*i)).collect()
}

async fn search(orch: &Orchestrator, query: &str) -> Result<()> {
    orch.search_videos(query)?.settled().await;
    let (status, error) =
        orch.with_state(|s| (s.search.status(), s.search.error().map(str::to_string)));
    if status != RequestStatus::Succeeded {
        bail!("video search failed: {}", error.unwrap_or_default());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = Config::load(&cli.config).await?;
    init::ensure_directories(&cfg).await?;
    let orch = Orchestrator::from_config(&cfg)?;

    match cli.command {
        Command::Script { prompt, copy } => {
            orch.generate_script(prompt).settled().await;
            let (text, error) = orch.with_state(|s| {
                (
                    s.script.result().map(str::to_string),
                    s.script.error().map(str::to_string),
                )
            });
            match text {
                Some(text) => println!("{}", text),
                None => bail!("script generation failed: {}", error.unwrap_or_default()),
            }
            if copy {
                orch.copy_script().await?;
            }
        }
        Command::Speak { text } => {
            orch.init_speech().await?;
            let spoken = orch.speak(&text).await?;
            println!("Spoke {} utterance(s) into {}", spoken, cfg.speech_dir().display());
        }
        Command::Search { query, download } => {
            search(&orch, &query).await?;
            let candidates = orch.with_state(|s| s.catalog.candidates().to_vec());
            for candidate in &candidates {
                println!("[{}] {}", candidate.id.index, candidate.preview_url);
            }
            if download {
                for candidate in &candidates {
                    let dest = orch.download_candidate(candidate.id, &cfg.downloads_dir()).await?;
                    println!("saved {}", dest.display());
                }
            }
        }
        Command::Assemble {
            query,
            select,
            upload,
            out,
        } => {
            search(&orch, &query).await?;
            let ids = orch.candidate_ids();
            for index in distinct_indexes(select) {
                let id = ids
                    .get(index)
                    .copied()
                    .with_context(|| format!("no search result at index {}", index))?;
                orch.toggle_selection(id)?;
            }

            for path in &upload {
                orch.upload_clip(Box::new(LocalFile::open(path).await?));
            }

            for item in orch.build_merge_list()? {
                println!("{}", item);
            }
            let out = out.unwrap_or_else(|| cfg.playlists_dir().join("merge.ffconcat"));
            let clips = orch.export_playlist(&out).await?;
            println!("Wrote {} clip(s) to {}", clips, out.display());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    run(Cli::parse()).await
}
