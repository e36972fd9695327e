mod room;
mod signaling;

pub use room::*;
pub use signaling::*;

use axum::Router;
use axum::routing::get;
use huddle_core::utils::SIGNALING_PATH;
use tokio::net::TcpListener;
use tracing::info;

/// The relay's HTTP routes: a single WebSocket endpoint.
pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route(SIGNALING_PATH, get(ws_handler))
        .with_state(service)
}

/// Serves the relay on `listener` until the process stops.
pub async fn serve(listener: TcpListener, service: SignalingService) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("Signaling relay listening on ws://{}{}", addr, SIGNALING_PATH);

    axum::serve(listener, router(service)).await?;
    Ok(())
}
