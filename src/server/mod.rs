pub mod api;
pub mod websocket;

use crate::llm::chat::ChatClient;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct Server {
    addr: String,
    http_port: u16,
    client: Arc<dyn ChatClient>,
}

impl Server {
    pub fn new(addr: String, http_port: u16, client: Arc<dyn ChatClient>) -> Self {
        Self {
            addr,
            http_port,
            client,
        }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.start_http_server().await?;
        self.start_ws_server().await?;

        Ok(())
    }

    async fn start_http_server(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let ws_addr: SocketAddr = self.addr.parse()?;
        api::start_http_server(
            ui_addr(ws_addr, self.http_port),
            ws_addr.port(),
            self.client.get_model()
        ).await
    }

    async fn start_ws_server(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        websocket::start_ws_server(&self.addr, self.client.clone()).await
    }
}

/// The UI listens on the same host as the websocket server.
fn ui_addr(ws_addr: SocketAddr, http_port: u16) -> SocketAddr {
    SocketAddr::new(ws_addr.ip(), http_port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_binds_to_websocket_host() {
        let loopback = ui_addr("127.0.0.1:4000".parse().unwrap(), 8501);
        assert_eq!(loopback, "127.0.0.1:8501".parse::<SocketAddr>().unwrap());

        let public = ui_addr("0.0.0.0:4000".parse().unwrap(), 8501);
        assert_eq!(public, "0.0.0.0:8501".parse::<SocketAddr>().unwrap());

        let v6 = ui_addr("[::1]:4000".parse().unwrap(), 9000);
        assert_eq!(v6, "[::1]:9000".parse::<SocketAddr>().unwrap());
    }
}
