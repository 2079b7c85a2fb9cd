//! Push-mode update ingestion (cloud-function style).
//!
//! A single POST route takes an optional JSON update body and hands it to the
//! runtime. The invoker always gets HTTP 200 with an empty body; internal
//! failures are logged, never surfaced.

use std::{net::SocketAddr, sync::Arc};

use axum::{body::Bytes, extract::State, http::StatusCode, routing::post, Router};
use teloxide::types::Update;
use tracing::{error, info, warn};

use gtb_core::Result;

use crate::runtime::BotRuntime;

pub async fn serve(runtime: Arc<BotRuntime>, addr: SocketAddr) -> Result<()> {
    let app = Router::new()
        .route("/", post(handle_event))
        .with_state(runtime);

    info!(%addr, "push-mode server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_event(State(runtime): State<Arc<BotRuntime>>, body: Bytes) -> StatusCode {
    if let Some(update) = parse_update(&body) {
        if let Err(e) = runtime.update(update).await {
            error!(error = %e, "pushed update failed");
        }
    }

    StatusCode::OK
}

fn parse_update(body: &[u8]) -> Option<Update> {
    if body.is_empty() {
        return None;
    }

    match serde_json::from_slice::<Update>(body) {
        Ok(update) => Some(update),
        Err(e) => {
            warn!(error = %e, "ignoring unparseable update body");
            None
        }
    }
}
