// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::sync::Arc;

use sluice_storage::{DurableStore, StoreError};
use tokio::net::UnixStream;
use tracing::{debug, error};

use crate::lifecycle::DaemonContext;
use crate::protocol::{self, Request, Response, StockLevel, DEFAULT_TIMEOUT, PROTOCOL_VERSION};

/// Handle a single client connection
pub async fn handle_connection(
    context: &DaemonContext,
    stream: UnixStream,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);
    let shutting_down = matches!(request, Request::Shutdown);

    let response = handle_request(context, request).await;

    debug!("Sending response: {:?}", response);
    let written = protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT).await;

    // Stop only after the client has its answer
    if shutting_down {
        context.shutdown.cancel();
    }

    written.map_err(ServerError::Protocol)
}

/// Handle a single request and return a response
pub async fn handle_request(context: &DaemonContext, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Purchase { item } => Response::Reply(context.admission.purchase(&item).await),

        Request::Ingest { payload } => Response::Reply(context.admission.ingest(payload)),

        Request::Status => status(context).await,

        Request::Outage { enabled } => {
            context.outage.set(enabled);
            Response::Ok
        }

        Request::Shutdown => Response::ShuttingDown,
    }
}

async fn status(context: &DaemonContext) -> Response {
    let store = Arc::clone(context.admission.allocator().store());
    let items = context.items.clone();

    let levels = tokio::task::spawn_blocking(move || {
        items
            .into_iter()
            .map(|item| {
                Ok(StockLevel {
                    remaining: store.stock(&item)?,
                    allocations: store.allocations(&item)?.len(),
                    item,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()
    })
    .await;

    match levels {
        Ok(Ok(stock)) => Response::Status {
            uptime_secs: context.start_time.elapsed().as_secs(),
            pending_events: context.admission.buffer().len(),
            outage: context.outage.is_engaged(),
            stock,
        },
        Ok(Err(e)) => Response::Error {
            message: e.to_string(),
        },
        Err(e) => Response::Error {
            message: format!("status task failed: {}", e),
        },
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}
