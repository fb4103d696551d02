use mock_server::Broker;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mock_server=debug")),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8082".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("fake broker listening on {addr}");
    mock_server::run(listener, Broker::new()).await
}
