// sync.rs — `notion-sync sync`: one dispatch cycle.
//
// Everything that can be fatal (config, payload, credential) is checked
// before the first event is dispatched. Once dispatch starts, per-event
// failures are logged and never change the exit status.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use ns_cache::IdentityCache;
use ns_connector_notion::NotionClient;
use ns_events::{classify, parse_payload, NormalizedEvent};
use ns_sync::{DispatchReport, Dispatcher, DryRunClient, RemoteClient, SyncConfig, SyncContext};

use super::{load_config, process_env, working_dir};

/// Raw JSON payload, used when `--payload` is not given.
pub const PAYLOAD_VAR: &str = "NOTION_SYNC_PAYLOAD";

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Payload file, or `-` for stdin. Defaults to $NOTION_SYNC_PAYLOAD.
    #[arg(long)]
    pub payload: Option<PathBuf>,

    /// Event kind for envelopes that carry no `event_type`.
    #[arg(long)]
    pub event_type: Option<String>,

    /// Log intended actions without calling Notion or writing the cache.
    #[arg(long)]
    pub dry_run: bool,

    /// Path to the cache file (overrides config and $NOTION_SYNC_CACHE).
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Config file (defaults to ./notion-sync.toml if present).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn execute(args: &SyncArgs) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    run(args, &working_dir()?, process_env, &mut stdin.lock())?;
    Ok(())
}

/// Run one sync cycle. Returns `None` when there was no payload to process.
pub fn run(
    args: &SyncArgs,
    search_dir: &Path,
    lookup: impl Fn(&str) -> Option<String>,
    stdin: &mut impl Read,
) -> anyhow::Result<Option<DispatchReport>> {
    let config = resolve_config(args, search_dir, &lookup)?;

    let Some(text) = read_payload(args.payload.as_deref(), &lookup, stdin)? else {
        tracing::info!("no payload supplied, nothing to do");
        return Ok(None);
    };

    let events = load_events(&text, args.event_type.as_deref())?;
    let client = build_client(&config, args.dry_run)?;

    let routing = config.routing_table();
    if routing.is_empty() {
        tracing::warn!("no destination databases configured, every event will be skipped");
    }

    let cache = IdentityCache::load(&config.cache_path);
    tracing::debug!(
        path = %config.cache_path.display(),
        entries = cache.len(),
        "loaded identity cache"
    );

    let mut ctx = SyncContext::new(client, cache, routing);
    if args.dry_run {
        ctx = ctx.without_persistence();
    }

    let report = Dispatcher::with_default_handlers().dispatch(&mut ctx, &events);
    tracing::info!(
        client = ctx.client_name(),
        events = report.len(),
        created = report.created(),
        updated = report.updated(),
        skipped = report.skipped(),
        failed = report.failed(),
        "sync complete"
    );
    if let Ok(json) = serde_json::to_string(&report) {
        tracing::debug!(report = %json, "dispatch report");
    }

    Ok(Some(report))
}

/// Config file and environment, then CLI flags on top.
fn resolve_config(
    args: &SyncArgs,
    search_dir: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<SyncConfig> {
    let mut config = load_config(args.config.as_deref(), search_dir, lookup)?;
    if let Some(cache) = &args.cache {
        config.cache_path = cache.clone();
    }
    Ok(config)
}

/// Payload text from `--payload`, stdin, or the environment. Blank counts
/// as absent.
fn read_payload(
    source: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
    stdin: &mut impl Read,
) -> anyhow::Result<Option<String>> {
    let text = match source {
        Some(path) if path == Path::new("-") => {
            let mut text = String::new();
            stdin
                .read_to_string(&mut text)
                .context("failed to read payload from stdin")?;
            Some(text)
        }
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read payload file {}", path.display()))?,
        ),
        None => lookup(PAYLOAD_VAR),
    };
    Ok(text.filter(|t| !t.trim().is_empty()))
}

fn load_events(text: &str, default_kind: Option<&str>) -> anyhow::Result<Vec<NormalizedEvent>> {
    let payload = parse_payload(text).context("payload is not valid JSON")?;
    classify(&payload, default_kind).context("payload rejected")
}

fn build_client(config: &SyncConfig, dry_run: bool) -> anyhow::Result<Box<dyn RemoteClient>> {
    if dry_run {
        tracing::info!("dry run: no Notion requests will be made and the cache will not be written");
        return Ok(Box::new(DryRunClient::new()));
    }

    let token = config.require_token()?;
    let client = NotionClient::builder(token)
        .api_version(config.notion.api_version.as_str())
        .base_url(config.notion.base_url.as_str())
        .timeout(Duration::from_secs(config.notion.timeout_secs))
        .build()
        .context("failed to build the Notion HTTP client")?;
    Ok(Box::new(client))
}
