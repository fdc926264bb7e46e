pub mod agent;
pub mod models;
pub mod server;
pub mod llm;
pub mod cli;
pub mod history;

use cli::Args;
use llm::chat::new_client as new_chat_client;
use log::info;
use server::Server;
use std::error::Error;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let llm_config = args.validate()?;
    let client = new_chat_client(&llm_config)?;

    info!("--- Core Configuration ---");
    info!("WebSocket Address: {}", args.server_addr);
    info!("HTTP UI Port: {}", args.http_port);
    info!("Chat Model: {}", client.get_model());
    info!(
        "Chat Base URL: {}",
        llm_config.base_url.as_deref().unwrap_or(llm::DEFAULT_BASE_URL)
    );
    info!("-------------------------");

    let server = Server::new(args.server_addr.clone(), args.http_port, client);
    server.run().await?;

    Ok(())
}
