use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing_subscriber::EnvFilter;

mod handlers;
mod shares;
mod state;
mod storage;

use crate::handlers::{image_handler, ping_handler, share_handler};
use crate::state::{AppState, DEFAULT_MAX_ANNOTATIONS};
use crate::storage::FileStorage;

/// Stores shared annotation snapshots and serves them as SVG images.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "./shares")]
    share_dir: PathBuf,
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
    /// Origin used in returned image links. Defaults to http://localhost:<port>.
    #[arg(long, env = "PAGEMARK_PUBLIC_URL")]
    public_url: Option<String>,
    #[arg(long, default_value_t = DEFAULT_MAX_ANNOTATIONS)]
    max_annotations: usize,
}

fn router(state: AppState) -> Router {
    // Shares never change once written.
    let immutable = SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
    Router::new()
        .route("/api/share", post(share_handler))
        .route("/shares/:share_id", get(image_handler).layer(immutable))
        .route("/ping", get(ping_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    tokio::fs::create_dir_all(&args.share_dir).await?;
    let public_url = args
        .public_url
        .unwrap_or_else(|| format!("http://localhost:{}", args.port));
    let state = AppState::new(
        Arc::new(FileStorage::new(args.share_dir.clone())),
        &public_url,
        args.max_annotations,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        share_dir = %args.share_dir.display(),
        public_url = %state.public_url,
        "share service listening"
    );
    axum::serve(listener, router(state)).await?;
    Ok(())
}
