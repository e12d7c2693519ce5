//! Command-line shell for browsing, uploading and viewing exam past papers.

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use pastpaper_core::cache::{MemoryStore, RedbStore};
use pastpaper_core::{
    AppError, Config, FirebaseStorage, IndexSnapshot, IndexSync, LocalCache, Paper,
    PaperMetadata, PaperStore, SearchFilters, UploadFile, UploadFlow, UploadState,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "pastpaper_cli=warn,pastpaper_core=warn";
const NO_PAPERS_HINT: &str =
    "No papers found matching your criteria. Try adjusting the filters or run `pastpaper refresh`.";
const NO_HISTORY_HINT: &str =
    "You haven't viewed any papers yet. Run `pastpaper list` to start exploring.";
const MISSING_URL_MESSAGE: &str = "PDF URL is not available.";

#[derive(Parser)]
#[command(name = "pastpaper", about = "Exam past paper browser", version)]
struct Cli {
    /// Cache file path (defaults to PASTPAPER_CACHE_PATH or ~/.cache/pastpaper/cache.redb)
    #[arg(long, global = true)]
    cache: Option<String>,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    json: bool,

    /// Request timeout in seconds
    #[arg(short = 't', long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Exact-match filters; omitted values match everything.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
struct FilterArgs {
    #[arg(long)]
    class: Option<String>,
    #[arg(long)]
    board: Option<String>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    year: Option<String>,
}

impl From<FilterArgs> for SearchFilters {
    fn from(args: FilterArgs) -> Self {
        Self {
            class: args.class.unwrap_or_default(),
            board: args.board.unwrap_or_default(),
            subject: args.subject.unwrap_or_default(),
            year: args.year.unwrap_or_default(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// List papers, served from the cache when one exists
    List {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Rebuild the paper index from the store
    Refresh,
    /// Upload a paper
    Upload {
        /// PDF file to upload
        file: Option<PathBuf>,
        #[arg(long)]
        class: String,
        #[arg(long)]
        board: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        year: String,
    },
    /// Show a paper's download URL and record it as viewed
    View {
        id: String,
        /// Save the PDF to this path
        #[arg(short, long)]
        download: Option<PathBuf>,
    },
    /// Show recently viewed papers
    History,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn fail(action: &str, message: &str) -> ! {
    eprintln!("{} failed: {}", action, message);
    std::process::exit(1);
}

/// Open the persistent cache, degrading to a process-local one.
fn open_cache(path: &str) -> LocalCache {
    match RedbStore::open(Path::new(path)) {
        Ok(store) => LocalCache::new(Arc::new(store)),
        Err(err) => {
            tracing::warn!(
                "Failed to open cache at {}: {}; continuing with an in-memory cache",
                path,
                err
            );
            LocalCache::new(Arc::new(MemoryStore::new()))
        }
    }
}

fn format_paper_row(paper: &Paper) -> String {
    format!(
        "{:<36} {:<30} {} | {} | {} | Class {}",
        paper.id, paper.name, paper.subject, paper.year, paper.board, paper.class
    )
}

fn format_papers_output(papers: &[Paper], json: bool, empty_hint: &str) -> Result<String, String> {
    if json {
        return serde_json::to_string_pretty(papers)
            .map_err(|err| format!("output encoding error: {}", err));
    }
    if papers.is_empty() {
        return Ok(empty_hint.to_string());
    }
    Ok(papers
        .iter()
        .map(format_paper_row)
        .collect::<Vec<_>>()
        .join("\n"))
}

fn format_view_output(paper: &Paper, json: bool) -> Result<String, String> {
    if json {
        return serde_json::to_string_pretty(paper)
            .map_err(|err| format!("output encoding error: {}", err));
    }
    paper
        .url
        .clone()
        .ok_or_else(|| MISSING_URL_MESSAGE.to_string())
}

fn format_upload_output(paper: &Paper, json: bool) -> Result<String, String> {
    if json {
        return serde_json::to_string_pretty(paper)
            .map_err(|err| format!("output encoding error: {}", err));
    }
    Ok(format!("Uploaded {} to {}", paper.name, paper.path))
}

fn format_progress(progress: f64) -> String {
    format!("Uploading... {:.0}%", progress.clamp(0.0, 100.0))
}

/// Message for a failed sync, with a configuration hint when the store is unset.
fn sync_failure_message(snapshot: &IndexSnapshot, config: &Config) -> Option<String> {
    let message = snapshot.error()?;
    if config.store.is_configured() {
        return Some(message.to_string());
    }
    let hint = AppError::Configuration(String::new()).user_message();
    Some(format!("{} {}", message, hint))
}

/// Find a paper in the published index, then in the viewing history.
fn locate_paper(id: &str, index: Option<Paper>, history: &[Paper]) -> Option<Paper> {
    index.or_else(|| history.iter().find(|paper| paper.id == id).cloned())
}

fn print_or_fail(action: &str, output: Result<String, String>) {
    match output {
        Ok(output) => println!("{}", output),
        Err(message) => fail(action, &message),
    }
}

/// Submit an upload while echoing progress to stderr.
async fn run_upload(
    flow: &UploadFlow,
    file: Option<UploadFile>,
    metadata: PaperMetadata,
) -> Result<Paper, AppError> {
    let mut rx = flow.subscribe();
    let submit = flow.submit(file, metadata);
    tokio::pin!(submit);
    loop {
        tokio::select! {
            result = &mut submit => {
                eprintln!();
                return result;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    return (&mut submit).await;
                }
                let state = rx.borrow_and_update().clone();
                match state {
                    UploadState::Uploading { progress } => {
                        eprint!("\r{}", format_progress(progress))
                    }
                    UploadState::Success(_) => {
                        eprint!("\r{}  Upload successful!", format_progress(100.0))
                    }
                    UploadState::Idle | UploadState::Error(_) => {}
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let Cli {
        cache,
        json,
        timeout,
        command,
    } = Cli::parse();

    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let mut config = Config::from_env();
    if let Some(cache) = cache {
        config.cache_path = cache;
    }
    if let Some(timeout) = timeout {
        config.request_timeout_secs = timeout;
    }

    let cache = open_cache(&config.cache_path);
    let storage = Arc::new(FirebaseStorage::from_config(&config)?);
    let store: Arc<dyn PaperStore> = storage.clone();

    match command {
        Commands::Completions { .. } => unreachable!("completions handled before setup"),
        Commands::List { filters } => {
            let sync = IndexSync::new(store, cache);
            let snapshot = sync.activate().await;
            if let Some(message) = sync_failure_message(&snapshot, &config) {
                fail("List", &message);
            }
            let papers = sync.visible(&filters.into());
            print_or_fail("List", format_papers_output(&papers, json, NO_PAPERS_HINT));
        }
        Commands::Refresh => {
            let sync = IndexSync::new(store, cache);
            let snapshot = sync.refresh().await;
            if let Some(message) = sync_failure_message(&snapshot, &config) {
                fail("Refresh", &message);
            }
            let papers = snapshot.papers.unwrap_or_default();
            if json {
                print_or_fail("Refresh", format_papers_output(&papers, true, NO_PAPERS_HINT));
            } else {
                println!("Refreshed {} papers", papers.len());
            }
        }
        Commands::Upload {
            file,
            class,
            board,
            subject,
            year,
        } => {
            let file = match file {
                Some(path) => match UploadFile::from_path(&path).await {
                    Ok(file) => Some(file),
                    Err(err) => fail("Upload", &err.user_message()),
                },
                None => None,
            };
            let metadata = PaperMetadata {
                class,
                board,
                subject,
                year,
            };
            let flow = UploadFlow::new(store, cache);
            match run_upload(&flow, file, metadata).await {
                Ok(paper) => print_or_fail("Upload", format_upload_output(&paper, json)),
                Err(err) => fail("Upload", &err.to_string()),
            }
        }
        Commands::View { id, download } => {
            let sync = IndexSync::new(store, cache.clone());
            sync.activate().await;
            let history = cache.recently_viewed();
            let Some(paper) = locate_paper(&id, sync.find(&id), &history) else {
                fail("View", &format!("no paper with id '{}'", id));
            };
            cache.record_viewed(paper.clone());

            let Some(url) = paper.url.clone() else {
                fail("View", MISSING_URL_MESSAGE);
            };
            if let Some(dest) = download {
                match storage.download(&url, &dest).await {
                    Ok(bytes) => eprintln!(
                        "Downloaded {} to {} ({} bytes)",
                        paper.name,
                        dest.display(),
                        bytes
                    ),
                    Err(err) => fail("Download", &err.user_message()),
                }
            }
            print_or_fail("View", format_view_output(&paper, json));
        }
        Commands::History => {
            let papers = cache.recently_viewed();
            print_or_fail("History", format_papers_output(&papers, json, NO_HISTORY_HINT));
        }
    }

    Ok(())
}
