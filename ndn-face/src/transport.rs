//! Byte transport to the local forwarder.
//!
//! The transport owns element framing: inbound bytes are cut into complete
//! TLV elements and delivered upward in arrival order, so the Face only
//! ever sees whole packets. Sending enqueues a fully-encoded element; there
//! are no partial-send semantics.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use log::{debug, trace, warn};
use ndn_face_common::ndn::MAX_PACKET_SIZE;
use ndn_face_common::{tlv, Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Upward notifications from a transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// A complete protocol element arrived.
    Element(Bytes),
    /// The peer closed the stream.
    Closed,
}

/// Contract between the Face engine and the byte stream below it.
#[async_trait]
pub trait Transport: Send {
    /// Opens a stream to `host:port`. Inbound elements and the close
    /// notification are delivered through `events`, each element exactly
    /// once, in arrival order. Reconnecting to a new endpoint drops the
    /// previous stream.
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<()>;

    /// Enqueues a fully-encoded element for transmission.
    fn send(&mut self, element: Bytes) -> Result<()>;

    /// Closes the stream; further `send` is an error.
    async fn close(&mut self) -> Result<()>;

    /// Last-connected host, if any.
    fn connected_host(&self) -> Option<&str>;

    /// Last-connected port, if any.
    fn connected_port(&self) -> Option<u16>;

    /// Whether the stream is currently open.
    fn is_connected(&self) -> bool;
}

/// TCP transport to a forwarder, with a framing reader task and a writer
/// task fed by an unbounded queue.
#[derive(Debug, Default)]
pub struct TcpTransport {
    endpoint: Option<(String, u16)>,
    connected: Arc<AtomicBool>,
    writer_tx: Option<mpsc::UnboundedSender<Bytes>>,
    reader_task: Option<JoinHandle<()>>,
    writer_task: Option<JoinHandle<()>>,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn teardown(&mut self) {
        self.writer_tx = None;
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.writer_task.take() {
            task.abort();
        }
        self.connected.store(false, Ordering::Relaxed);
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<()> {
        self.teardown();

        let stream = TcpStream::connect((host, port)).await?;
        debug!("transport connected to {}:{}", host, port);
        let (read_half, write_half) = stream.into_split();

        self.connected = Arc::new(AtomicBool::new(true));
        let connected = Arc::clone(&self.connected);
        self.reader_task = Some(tokio::spawn(read_loop(read_half, events, connected)));

        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        self.writer_task = Some(tokio::spawn(write_loop(write_half, writer_rx)));
        self.writer_tx = Some(writer_tx);
        self.endpoint = Some((host.to_string(), port));
        Ok(())
    }

    fn send(&mut self, element: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Transport("not connected".into()));
        }
        let tx = self
            .writer_tx
            .as_ref()
            .ok_or_else(|| Error::Transport("not connected".into()))?;
        tx.send(element)
            .map_err(|_| Error::Transport("connection lost".into()))
    }

    async fn close(&mut self) -> Result<()> {
        if self.writer_tx.is_none() {
            return Err(Error::Transport("already closed".into()));
        }
        self.teardown();
        Ok(())
    }

    fn connected_host(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|(host, _)| host.as_str())
    }

    fn connected_port(&self) -> Option<u16> {
        self.endpoint.as_ref().map(|(_, port)| *port)
    }

    fn is_connected(&self) -> bool {
        self.writer_tx.is_some() && self.connected.load(Ordering::Relaxed)
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn write_loop(mut write_half: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Bytes>) {
    while let Some(element) = rx.recv().await {
        if let Err(e) = write_half.write_all(&element).await {
            warn!("transport write failed: {}", e);
            break;
        }
    }
}

async fn read_loop(
    mut read_half: OwnedReadHalf,
    events: mpsc::UnboundedSender<TransportEvent>,
    connected: Arc<AtomicBool>,
) {
    loop {
        match read_element(&mut read_half).await {
            Ok(Some(element)) => {
                trace!("transport received {}-byte element", element.len());
                if events.send(TransportEvent::Element(element)).is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("transport peer closed the stream");
                connected.store(false, Ordering::Relaxed);
                let _ = events.send(TransportEvent::Closed);
                break;
            }
            Err(e) => {
                warn!("transport read failed: {}", e);
                connected.store(false, Ordering::Relaxed);
                let _ = events.send(TransportEvent::Closed);
                break;
            }
        }
    }
}

/// Reads one complete TLV element off the stream. Returns `None` on a
/// clean end-of-stream at an element boundary.
async fn read_element(read_half: &mut OwnedReadHalf) -> Result<Option<Bytes>> {
    let tlv_type = match read_half.read_u8().await {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let first = read_half.read_u8().await?;
    let length = match first {
        0..=252 => first as usize,
        253 => read_half.read_u16().await? as usize,
        254 => read_half.read_u32().await? as usize,
        255 => return Err(Error::Tlv("64-bit TLV lengths not supported".into())),
    };
    if length > MAX_PACKET_SIZE {
        return Err(Error::Tlv(format!(
            "inbound element of {} bytes exceeds the {}-byte limit",
            length, MAX_PACKET_SIZE
        )));
    }

    let mut value = vec![0u8; length];
    read_half.read_exact(&mut value).await?;

    // Reassemble the canonical framing around the value.
    let mut element = BytesMut::with_capacity(length + 5);
    tlv::encode_tlv_type(tlv_type, &mut element);
    tlv::encode_tlv_length(length, &mut element);
    element.extend_from_slice(&value);
    Ok(Some(element.freeze()))
}
