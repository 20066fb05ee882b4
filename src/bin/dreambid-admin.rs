use clap::Parser;
use dreambid::{app, cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    app::init_tracing();
    cli::run(cli::Cli::parse()).await
}
