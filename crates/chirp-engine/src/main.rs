use std::env;
use std::sync::Arc;

use chirp_core::notify::LogNotifier;
use chirp_core::server::{proto::social_graph_server::SocialGraphServer, MySocialGraph};
use chirp_core::store::ChirpStore;
use tonic::transport::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let storage_path = env::var("FEED_STORAGE_PATH").unwrap_or_else(|_| "data/feed".to_string());
    let addr = env::var("FEED_LISTEN_ADDR")
        .unwrap_or_else(|_| "[::1]:50051".to_string())
        .parse()?;

    let store = Arc::new(ChirpStore::open(&storage_path)?);
    let service = MySocialGraph::new(store, Arc::new(LogNotifier));

    println!("🚀 Chirp listening on {}", addr);
    println!("Storage Path: {}", storage_path);

    Server::builder()
        .add_service(SocialGraphServer::new(service))
        .serve(addr)
        .await?;

    Ok(())
}
