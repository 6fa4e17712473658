// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP webhook endpoint.
//!
//! MuteDeck posts its status as JSON to a user-configured URL, so every path
//! is accepted. The `topic` and `prefix` query parameters select the device
//! and status channel.
//!
//! | Outcome                               | Response                    |
//! |---------------------------------------|-----------------------------|
//! | Published                             | `200`, empty body           |
//! | Malformed JSON or missing status key  | `400`, plaintext error      |
//! | Broker publish failed                 | `500`, plaintext error      |

mod client_addr;

pub use client_addr::ClientAddr;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use tokio::net::TcpListener;

use crate::bridge::Bridge;
use crate::error::{Error, PublishError, RequestError};
use crate::protocol::Transport;
use crate::status::{StatusRecord, StatusTarget};

/// Failure of a webhook request, rendered as a plaintext response.
#[derive(Debug)]
enum WebhookError {
    Request(RequestError),
    Publish(PublishError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        match self {
            Self::Request(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            Self::Publish(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }
}

/// Builds the webhook router.
pub fn router<T: Transport + 'static>(bridge: Arc<Bridge<T>>) -> Router {
    Router::new()
        .route("/", post(handle_status::<T>))
        .route("/{*path}", post(handle_status::<T>))
        .with_state(bridge)
}

/// Serves the webhook router on `listener` until Ctrl-C.
///
/// # Errors
///
/// Returns error if the server fails.
pub async fn serve<T: Transport + 'static>(
    listener: TcpListener,
    bridge: Arc<Bridge<T>>,
) -> Result<(), Error> {
    let app = router(bridge);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutting down HTTP server");
    })
    .await?;

    Ok(())
}

async fn handle_status<T: Transport + 'static>(
    State(bridge): State<Arc<Bridge<T>>>,
    Query(params): Query<Vec<(String, String)>>,
    client: ClientAddr,
    body: Bytes,
) -> Result<StatusCode, WebhookError> {
    tracing::debug!(client = %client, "Request received");
    tracing::debug!(body = %String::from_utf8_lossy(&body), "Incoming body");

    let record = match StatusRecord::from_slice(&body) {
        Ok(record) => record,
        Err(e) => {
            if let RequestError::MissingField(key) = &e {
                tracing::error!(client = %client, key = %key, "Request missing required key");
            } else {
                tracing::debug!(client = %client, error = %e, "Rejected request body");
            }
            return Err(WebhookError::Request(e));
        }
    };

    let target = StatusTarget::from_query_pairs(&params);
    bridge
        .forward(&record, &target)
        .await
        .map_err(WebhookError::Publish)?;

    Ok(StatusCode::OK)
}
