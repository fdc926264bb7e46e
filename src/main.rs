use clap::Parser;
use dotenv::dotenv;
use std::error::Error;
use streamcraft_chat::cli::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_filter())).init();

    streamcraft_chat::run(args).await
}
