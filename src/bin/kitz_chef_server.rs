use color_eyre::Result;
use kitz_chef::{
    config::{self, ServerConfig},
    server,
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    server::init_tracing(config::production_mode());

    let config = ServerConfig::load()?;
    server::start_server(config).await
}
