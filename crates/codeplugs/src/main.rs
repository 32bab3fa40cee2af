mod config;
mod server;
mod workspace;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use bpaf::Bpaf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use crate::config::Config;
use crate::server::{AppState, serve};
use crate::workspace::{Snapshot, Workspace, WorkspaceError};

#[derive(Bpaf, Clone, Debug)]
#[bpaf(options)]
struct Options {
    /// Perform verbose logging
    #[bpaf(short, long)]
    verbose: bool,

    /// Path to the config file
    #[bpaf(long, argument("PATH"), fallback(PathBuf::from("./config.toml")))]
    config: PathBuf,

    /// Reset every channel to the default bandwidth of its type, then exit
    #[bpaf(long)]
    fix_bandwidth: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = options().run();

    let env_filter = EnvFilter::builder()
        .with_default_directive(
            match options.verbose {
                true => LevelFilter::TRACE,
                _ => LevelFilter::INFO,
            }
            .into(),
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();

    let config = Config::load_from_file(&options.config)?;

    let workspace = match config.storage.snapshot_path() {
        Some(path) => Workspace::open(path)?,
        None => {
            info!("Keeping the codeplug in memory only");
            Workspace::new(Snapshot::default())
        }
    };

    if options.fix_bandwidth {
        let updated = match workspace.fix_bandwidths() {
            Ok(updated) => updated,
            Err(WorkspaceError::Internal(e)) => return Err(e),
            Err(e) => bail!("Failed to fix bandwidths: {:?}", e),
        };

        info!("Updated {} channels", updated);
        return Ok(());
    }

    let state = AppState {
        workspace: Arc::new(workspace),
        contacts: config.contacts,
    };

    serve(config.server.address, state).await
}
