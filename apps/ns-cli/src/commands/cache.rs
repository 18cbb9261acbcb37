// cache.rs — Cache subcommands: show.

use std::io::Write;
use std::path::PathBuf;

use clap::Subcommand;
use ns_cache::IdentityCache;

use super::{load_config, process_env, working_dir};

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Print every `kind:id → page id` mapping, sorted by key.
    Show {
        /// Path to the cache file (defaults to .notion-sync/cache.json).
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Config file (defaults to ./notion-sync.toml if present).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub fn execute(cmd: &CacheCommands) -> anyhow::Result<()> {
    match cmd {
        CacheCommands::Show { cache, config } => {
            let path = match cache {
                Some(path) => path.clone(),
                None => load_config(config.as_deref(), &working_dir()?, process_env)?.cache_path,
            };

            if !path.exists() {
                println!("No identity cache found at {}", path.display());
                return Ok(());
            }

            let cache = IdentityCache::load(&path);
            let stdout = std::io::stdout();
            write_entries(&cache, &mut stdout.lock())?;
        }
    }
    Ok(())
}

fn write_entries(cache: &IdentityCache, out: &mut impl Write) -> std::io::Result<()> {
    for (key, remote_id) in cache.iter() {
        writeln!(out, "{}\t{}", key, remote_id)?;
    }
    Ok(())
}
