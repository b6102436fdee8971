use std::net::SocketAddr;

use items_api::http::HttpServer;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Starts the service on an ephemeral local port. Cancel the token to stop it.
pub async fn spawn_server() -> (SocketAddr, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind should succeed");
    let address = listener.local_addr().expect("listener should have an address");
    let token = CancellationToken::new();
    let server_token = token.clone();
    tokio::spawn(async move {
        HttpServer::serve_with(listener, server_token).await.expect("server should run");
    });
    (address, token)
}
