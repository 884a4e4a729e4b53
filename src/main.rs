use buzzboard::Config;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    buzzboard::server::serve(Config::parse()).await
}
