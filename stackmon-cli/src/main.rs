mod plain;
mod theme;
mod tui;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use stackmon_core::backend::{ComposeCli, StackBackend};
use stackmon_core::context::{EnvOverrides, resolve};

#[derive(Parser)]
#[command(name = "stackmon")]
#[command(about = "Live status dashboard for a docker-compose stack", long_about = None)]
struct Cli {
    /// Metadata file path (overrides STACKMON_METADATA_FILE)
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Renderer to use
    #[arg(long, value_enum, default_value_t = UiMode::Tui)]
    ui: UiMode,

    /// Print one snapshot and exit
    #[arg(long)]
    once: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum UiMode {
    Tui,
    Plain,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut env = EnvOverrides::from_env();
    if let Some(path) = &cli.metadata {
        env.metadata_file = Some(path.display().to_string());
    }

    let backend = match ComposeCli::detect().await {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let backend: Arc<dyn StackBackend> = Arc::new(backend);

    let config = Arc::new(resolve(&env, backend.as_ref()).await);
    tracing::debug!(
        services = config.services.len(),
        profiles = config.profiles.len(),
        refresh = config.refresh_secs,
        "resolved stack configuration"
    );

    if cli.once {
        plain::run_once(config, backend).await;
        return Ok(());
    }

    match cli.ui {
        UiMode::Tui => tui::run(config, backend).await,
        UiMode::Plain => {
            plain::run_loop(config, backend).await;
            Ok(())
        }
    }
}
