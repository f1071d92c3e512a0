use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use castpage::config::Config;
use castpage::feed::FeedFetcher;
use castpage::page::{HtmlPage, PageController};
use castpage::storage::{FeedCache, KeyValueStore, MemoryStore, SqliteStore, StoreError};
use castpage::trigger::{self, WorkflowDispatcher};

const USER_AGENT: &str = concat!("castpage/", env!("CARGO_PKG_VERSION"));

/// Get the config directory path (~/.config/castpage/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("castpage"))
}

/// Explicit `--config` wins; only the default location needs `HOME`.
fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(get_config_dir()?.join("config.toml")),
    }
}

fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    // SEC-007: Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(config_dir, std::fs::Permissions::from_mode(0o700))
        {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }
    Ok(())
}

/// Atomically replace `dst` with `content` using write-to-temp-then-rename.
/// Readers of `dst` never observe a partially written page.
fn atomic_write(dst: &Path, content: &[u8]) -> Result<()> {
    // SEC-009: Use randomized temp filename to prevent TOCTOU race conditions.
    use std::time::{SystemTime, UNIX_EPOCH};
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{random_suffix:016x}"));

    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .with_context(|| {
            format!(
                "Failed to create temporary file '{}': check directory permissions or disk space",
                temp_path.display()
            )
        })?;

    temp_file.write_all(content).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to write to temporary file '{}': disk may be full",
            temp_path.display()
        )
    })?;

    temp_file.sync_all().with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!("Failed to sync temporary file '{}' to disk", temp_path.display())
    })?;
    drop(temp_file);

    #[cfg(windows)]
    if dst.exists() {
        std::fs::remove_file(dst).with_context(|| {
            let _ = std::fs::remove_file(&temp_path);
            format!("Failed to remove existing '{}' before replace", dst.display())
        })?;
    }

    std::fs::rename(&temp_path, dst).with_context(|| {
        let _ = std::fs::remove_file(&temp_path);
        format!(
            "Failed to rename '{}' to '{}': check permissions",
            temp_path.display(),
            dst.display()
        )
    })?;

    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "castpage", version, about = "Podcast episode page generator")]
struct Args {
    /// Config file (default: ~/.config/castpage/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the feed and write the episodes page
    Render {
        /// Output file (stdout when omitted)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Drop the cached feed before loading
        #[arg(long)]
        reset_cache: bool,

        /// Keep the feed cache in memory only
        #[arg(long, conflicts_with = "reset_cache")]
        no_cache: bool,
    },
    /// Run the workflow trigger endpoint
    Serve {
        /// Listen address (overrides config)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.clone())?;
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;

    match args.command {
        Command::Render {
            out,
            reset_cache,
            no_cache,
        } => render(&config, client, out.as_deref(), reset_cache, no_cache).await,
        Command::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| config.trigger.bind.clone());
            let dispatcher = Arc::new(WorkflowDispatcher::from_env(client, &config.trigger));
            trigger::serve(&addr, dispatcher)
                .await
                .with_context(|| format!("Trigger endpoint on {addr} failed"))
        }
    }
}

async fn open_store(no_cache: bool) -> Result<Arc<dyn KeyValueStore>> {
    if no_cache {
        return Ok(Arc::new(MemoryStore::new()));
    }

    let config_dir = get_config_dir()?;
    ensure_config_dir(&config_dir)?;
    let db_path = config_dir.join("cache.db");
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in cache path"))?;

    match SqliteStore::open(db_path_str).await {
        Ok(store) => Ok(Arc::new(store)),
        Err(StoreError::Locked) => {
            anyhow::bail!("Another castpage process is using the feed cache. Try again shortly.")
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open feed cache: {e}")),
    }
}

async fn render(
    config: &Config,
    client: reqwest::Client,
    out: Option<&Path>,
    reset_cache: bool,
    no_cache: bool,
) -> Result<()> {
    let store = open_store(no_cache).await?;
    let cache = FeedCache::from_config(store, config);

    if reset_cache {
        cache.clear().await.context("Failed to reset feed cache")?;
        tracing::info!("Feed cache reset");
    }

    let controller = PageController::from_config(FeedFetcher::new(client, cache, config), config);
    let mut page = HtmlPage::from_config(config);

    let outcome = controller.load(&mut page).await;

    // A failed load never replaces a page that is already published
    let keep_existing = outcome.is_err() && out.is_some_and(Path::exists);
    if !keep_existing {
        let html = page.to_html();
        match out {
            Some(path) => {
                atomic_write(path, html.as_bytes())?;
                tracing::info!(path = %path.display(), "Wrote episodes page");
            }
            None => std::io::stdout()
                .write_all(html.as_bytes())
                .context("Failed to write page to stdout")?,
        }
    }

    let count = outcome.context("Failed to load episodes")?;
    tracing::debug!(episodes = count, "Render complete");
    Ok(())
}
