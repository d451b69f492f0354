use clap::Parser;
use color_eyre::Result;
use hostdeck::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    hostdeck::run(Cli::parse()).await
}
