use clap::Parser;
use monitor::runtime::{boot, run};

/// Container log monitor: polls local and remote Docker hosts, dedups
/// recurring errors, and pushes aggregated error context to
/// notification channels.
#[derive(Parser, Debug)]
#[command(name = "monitor", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Write a default configuration file and exit
    #[arg(long)]
    setup: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    boot::init_logging();

    if cli.setup {
        return boot::setup(&cli.config);
    }

    let app = boot::boot(&cli.config).await?;
    run::run(app).await;
    Ok(())
}
