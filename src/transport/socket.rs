//! Request/reply over TCP, one JSON or text line each way.
//!
//! Both sides must alternate strictly: a client that sends twice without
//! reading, or reads without sending, deadlocks the exchange.

use super::{serve_gated, shutdown_requested, Channel, Endpoint, TransportError};
use crate::core::constants::{MAX_REPLY_LEN, MAX_REQUEST_LEN};
use crate::protocol::{Dispatcher, ProtocolError, Response};
use crate::service::CharacterService;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tracing::{info, warn};

pub struct SocketServer {
    listener: TcpListener,
}

impl SocketServer {
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves every connection in its own task with its own session. Requests
    /// from all connections are still dispatched one at a time.
    ///
    /// On shutdown, stops accepting and waits for each connection to finish
    /// the request it is handling.
    pub async fn run(
        &self,
        service: &CharacterService,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), TransportError> {
        let stop = shutdown_requested(shutdown.clone());
        tokio::pin!(stop);
        let gate = Arc::new(Mutex::new(()));
        let mut connections = JoinSet::new();

        loop {
            let (stream, peer) = tokio::select! {
                _ = &mut stop => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                },
            };

            let mut dispatcher = Dispatcher::new(service.clone());
            let gate = Arc::clone(&gate);
            let shutdown = shutdown.clone();
            info!(%peer, session = %dispatcher.session().id(), "client connected");

            connections.spawn(async move {
                let mut endpoint = SocketEndpoint::new(stream);
                match serve_gated(&mut endpoint, &mut dispatcher, Some(&*gate), shutdown).await {
                    Ok(handled) => info!(%peer, handled, "client disconnected"),
                    Err(e) => warn!(%peer, error = %e, "connection dropped"),
                }
            });

            while connections.try_join_next().is_some() {}
        }

        while connections.join_next().await.is_some() {}
        info!("socket server stopped");
        Ok(())
    }
}

/// Service side of one connection.
pub struct SocketEndpoint {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl SocketEndpoint {
    pub fn new(stream: TcpStream) -> Self {
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }
}

impl Endpoint for SocketEndpoint {
    /// Lines that cannot be requests (too long, not UTF-8) are answered with
    /// `malformed_request` here and the connection stays open.
    async fn next_request(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match read_bounded_line(&mut self.reader, MAX_REQUEST_LEN).await? {
                None => return Ok(None),
                Some(Line::Text(raw)) => return Ok(Some(raw)),
                Some(Line::Rejected(reason)) => {
                    warn!(%reason, "rejected request line");
                    let err = ProtocolError::MalformedRequest(reason);
                    write_line(&mut self.writer, &Response::from(&err).encode()).await?;
                }
            }
        }
    }

    async fn reply(&mut self, payload: &str) -> Result<(), TransportError> {
        write_line(&mut self.writer, payload).await
    }
}

/// Client side. Keeping one channel open keeps one session.
pub struct SocketChannel {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    reply_timeout: Duration,
}

impl SocketChannel {
    pub async fn connect(addr: SocketAddr, reply_timeout: Duration) -> Result<Self, TransportError> {
        let stream = tokio::time::timeout(reply_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::Timeout(reply_timeout))??;
        let (read, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read),
            writer,
            reply_timeout,
        })
    }
}

impl Channel for SocketChannel {
    async fn send(&mut self, payload: &str) -> Result<(), TransportError> {
        write_line(&mut self.writer, payload).await
    }

    async fn receive(&mut self) -> Result<String, TransportError> {
        let read = read_bounded_line(&mut self.reader, MAX_REPLY_LEN);
        let line = tokio::time::timeout(self.reply_timeout, read)
            .await
            .map_err(|_| TransportError::Timeout(self.reply_timeout))??;
        match line {
            None => Err(TransportError::Closed),
            Some(Line::Text(reply)) => Ok(reply),
            Some(Line::Rejected(reason)) => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                reason,
            ))),
        }
    }
}

enum Line {
    Text(String),
    /// Consumed up to and including its newline, but unusable.
    Rejected(String),
}

/// Reads one newline-terminated line of at most `max_len` bytes. `None` at
/// end of stream.
async fn read_bounded_line(
    reader: &mut BufReader<OwnedReadHalf>,
    max_len: usize,
) -> Result<Option<Line>, TransportError> {
    let mut buf = Vec::new();
    let limit = max_len as u64 + 1;
    let n = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    if n as u64 >= limit && buf.last() != Some(&b'\n') {
        skip_rest_of_line(reader).await?;
        return Ok(Some(Line::Rejected(format!(
            "line longer than {} bytes",
            max_len
        ))));
    }

    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(match String::from_utf8(buf) {
        Ok(text) => Line::Text(text),
        Err(_) => Line::Rejected("line is not valid UTF-8".to_string()),
    }))
}

async fn skip_rest_of_line(reader: &mut BufReader<OwnedReadHalf>) -> io::Result<()> {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        if let Some(pos) = available.iter().position(|b| *b == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = available.len();
        reader.consume(len);
    }
}

async fn write_line(writer: &mut OwnedWriteHalf, payload: &str) -> Result<(), TransportError> {
    if payload.contains('\n') {
        return Err(TransportError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "payload must be a single line",
        )));
    }
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
