use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chess_lines::app::{self, RunOptions};
use chess_lines::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "chess-lines",
    version,
    about = "Analyse chess positions with a UCI engine, one or more lines at a time"
)]
struct Cli {
    /// TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Engine executable (overrides the config file)
    #[arg(long)]
    engine: Option<String>,

    /// Search depth
    #[arg(long)]
    depth: Option<u32>,

    /// Number of principal variations
    #[arg(long)]
    lines: Option<u32>,

    /// Engine threads
    #[arg(long)]
    threads: Option<u32>,

    /// Search until stopped instead of to a fixed depth
    #[arg(long, default_value_t = false)]
    infinite: bool,

    /// Start from this position
    #[arg(long)]
    fen: Option<String>,

    /// Do not start an engine; board and move input only
    #[arg(long, default_value_t = false)]
    no_engine: bool,

    /// Print every analysis update instead of only finished searches
    #[arg(long, default_value_t = false)]
    follow: bool,

    /// Print the effective settings as TOML and exit
    #[arg(long, default_value_t = false)]
    print_config: bool,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(engine) = &self.engine {
            config.engine.command = engine.clone();
        }
        if let Some(depth) = self.depth {
            config.analysis.depth = depth;
        }
        if let Some(lines) = self.lines {
            config.analysis.lines = lines;
        }
        if self.threads.is_some() {
            config.engine.threads = self.threads;
        }
        if self.infinite {
            config.analysis.infinite = true;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;

    if cli.print_config {
        print!("{}", toml::to_string(&config)?);
        return Ok(());
    }

    app::run(
        &config,
        RunOptions {
            fen: cli.fen,
            use_engine: !cli.no_engine,
            follow: cli.follow,
        },
    )
}
