//! Uravu CLI - water-vapour stock and flux estimates for a city.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "uravu",
    version,
    about = "Atmospheric water-vapour flux estimates for a city"
)]
struct Cli {
    #[command(flatten)]
    settings: uravu_cmd::Settings,

    #[command(subcommand)]
    command: uravu_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    uravu_cmd::run(cli.command, &cli.settings).await
}
