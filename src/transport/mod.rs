//! Carriers for the protocol.
//!
//! Both transports move one opaque request string to the service and one
//! reply string back, strictly alternating. The dispatcher never knows which
//! one delivered a request.
//!
//! - [`file_drop`]: request/response files polled on a fixed interval. One
//!   client at a time; there are no request ids.
//! - [`socket`]: newline-delimited request/reply over TCP. One session per
//!   connection. Connections are served concurrently but requests are
//!   dispatched one at a time.

#![allow(unused_imports)]

pub mod file_drop;
pub mod socket;

pub use file_drop::{FileDropChannel, FileDropConfig, FileDropEndpoint};
pub use socket::{SocketChannel, SocketEndpoint, SocketServer};

use crate::protocol::{Dispatcher, Request, Response};
use std::io;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::debug;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("connection closed by peer")]
    Closed,

    #[error("message could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Client side of a transport.
#[allow(async_fn_in_trait)]
pub trait Channel {
    async fn send(&mut self, payload: &str) -> Result<(), TransportError>;

    /// Waits (bounded by the channel's reply timeout) for the next reply.
    async fn receive(&mut self) -> Result<String, TransportError>;

    /// One raw exchange.
    async fn round_trip(&mut self, payload: &str) -> Result<String, TransportError> {
        self.send(payload).await?;
        self.receive().await
    }

    /// One typed exchange, sent as a JSON envelope.
    async fn call(&mut self, request: &Request) -> Result<Response, TransportError> {
        let reply = self.round_trip(&request.to_json()?).await?;
        Ok(Response::decode(&reply)?)
    }
}

/// Service side of a transport.
#[allow(async_fn_in_trait)]
pub trait Endpoint {
    /// Blocks until a request arrives. `None` means the peer has gone away.
    async fn next_request(&mut self) -> Result<Option<String>, TransportError>;

    async fn reply(&mut self, payload: &str) -> Result<(), TransportError>;
}

pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Resolves once `true` is sent. A dropped sender never triggers shutdown.
pub async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Handles requests one at a time until the peer leaves or shutdown is
/// requested. A request that has been received is always answered.
///
/// Returns the number of requests handled.
pub async fn serve_endpoint<E: Endpoint>(
    endpoint: &mut E,
    dispatcher: &mut Dispatcher,
    shutdown: watch::Receiver<bool>,
) -> Result<u64, TransportError> {
    serve_gated(endpoint, dispatcher, None, shutdown).await
}

/// Like [`serve_endpoint`], but each dispatch first takes `gate`, so endpoints
/// sharing one gate never run two requests at once.
pub(crate) async fn serve_gated<E: Endpoint>(
    endpoint: &mut E,
    dispatcher: &mut Dispatcher,
    gate: Option<&Mutex<()>>,
    shutdown: watch::Receiver<bool>,
) -> Result<u64, TransportError> {
    let stop = shutdown_requested(shutdown);
    tokio::pin!(stop);
    let mut handled = 0;

    loop {
        let raw = tokio::select! {
            _ = &mut stop => break,
            next = endpoint.next_request() => match next? {
                Some(raw) => raw,
                None => break,
            },
        };

        let reply = match gate {
            Some(gate) => {
                let _turn = gate.lock().await;
                dispatcher.handle_raw(&raw)
            }
            None => dispatcher.handle_raw(&raw),
        };
        endpoint.reply(&reply).await?;
        handled += 1;
    }

    debug!(handled, "endpoint finished");
    Ok(handled)
}
