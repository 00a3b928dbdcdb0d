//! Public Face API.
//!
//! A [`Face`] spawns one engine task that owns every per-face table and the
//! transport. Applications talk to it through cheap [`FaceHandle`] clones;
//! sinks invoked by the engine receive a handle too, so a completion
//! callback can express further Interests without holding a reference back
//! into the Face.

use crate::config::FaceOptions;
use crate::engine::{Command, Engine};
use crate::transport::{TcpTransport, Transport};
use ndn_face_common::metrics::FaceMetrics;
use ndn_face_common::ndn::{Data, Interest, Name};
use ndn_face_common::{Error, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Outcome delivered for an arriving Data packet.
#[derive(Debug)]
pub enum Delivery {
    /// The signature verified.
    Content(Data),
    /// Verification is disabled; the content was not checked.
    ContentUnverified(Data),
    /// The signature failed, or the packet cannot be verified (witness,
    /// certificate locator, unusable key).
    ContentBad(Data),
}

impl Delivery {
    pub fn data(&self) -> &Data {
        match self {
            Delivery::Content(data)
            | Delivery::ContentUnverified(data)
            | Delivery::ContentBad(data) => data,
        }
    }

    pub fn into_data(self) -> Data {
        match self {
            Delivery::Content(data)
            | Delivery::ContentUnverified(data)
            | Delivery::ContentBad(data) => data,
        }
    }
}

/// What a sink wants done when its Interest expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutAction {
    Drop,
    Reexpress,
}

/// Receiver of outcomes for one expressed Interest.
pub trait ResponseSink: Send {
    /// A matching Data arrived; `delivery` carries the verification
    /// verdict.
    fn on_content(&mut self, face: &FaceHandle, delivery: Delivery);

    /// The Interest expired. Return [`TimeoutAction::Reexpress`] to resend
    /// it with a fresh lifetime.
    fn on_timeout(&mut self, face: &FaceHandle, interest: &Interest) -> TimeoutAction {
        let _ = (face, interest);
        TimeoutAction::Drop
    }
}

impl<F> ResponseSink for F
where
    F: FnMut(&FaceHandle, Delivery) + Send,
{
    fn on_content(&mut self, face: &FaceHandle, delivery: Delivery) {
        self(face, delivery)
    }
}

/// Handler for Interests arriving under a registered prefix. Returning a
/// Data answers the Interest immediately; an asynchronous handler may
/// return `None` and later call [`FaceHandle::put_data`].
pub trait InterestSink: Send {
    fn on_interest(
        &mut self,
        face: &FaceHandle,
        prefix: &Name,
        interest: &Interest,
    ) -> Option<Data>;
}

impl<F> InterestSink for F
where
    F: FnMut(&FaceHandle, &Name, &Interest) -> Option<Data> + Send,
{
    fn on_interest(
        &mut self,
        face: &FaceHandle,
        prefix: &Name,
        interest: &Interest,
    ) -> Option<Data> {
        self(face, prefix, interest)
    }
}

/// Lifecycle notifications emitted by a Face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaceEvent {
    /// The transport is connected and the face is usable.
    Opened,
    /// The face was closed, locally or by the forwarder.
    Closed,
    /// A transport-level failure was observed.
    Error(String),
}

/// A cheap, cloneable reference to a Face's engine.
#[derive(Debug, Clone)]
pub struct FaceHandle {
    tx: mpsc::UnboundedSender<Command>,
    default_lifetime_ms: u32,
}

impl FaceHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>, default_lifetime_ms: u32) -> Self {
        Self {
            tx,
            default_lifetime_ms,
        }
    }

    /// Expresses an Interest for `name`, copying selectors and lifetime
    /// from `template` when one is given.
    pub fn express_interest(
        &self,
        name: Name,
        sink: impl ResponseSink + 'static,
        template: Option<&Interest>,
    ) -> Result<()> {
        let mut interest = Interest::from_template(name, template);
        if template.is_none() {
            interest.lifetime_ms = self.default_lifetime_ms;
        }
        self.express(interest, Some(Box::new(sink)))
    }

    /// Expresses a fully-specified Interest. Without a sink the Interest is
    /// sent but no response is awaited.
    pub fn express(&self, interest: Interest, sink: Option<Box<dyn ResponseSink>>) -> Result<()> {
        self.send(Command::Express { interest, sink })
    }

    /// Registers `prefix` with the local forwarder and installs `sink` as
    /// its Interest handler.
    pub fn register_prefix(
        &self,
        prefix: Name,
        sink: impl InterestSink + 'static,
        flags: u32,
    ) -> Result<()> {
        self.send(Command::Register {
            prefix,
            sink: Box::new(sink),
            flags,
        })
    }

    /// Sends an unsolicited Data element.
    pub fn put_data(&self, data: Data) -> Result<()> {
        self.send(Command::PutData(data))
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| Error::FaceClosed)
    }
}

/// An application's endpoint to the NDN network.
pub struct Face {
    handle: FaceHandle,
    events: mpsc::UnboundedReceiver<FaceEvent>,
    metrics: Arc<FaceMetrics>,
}

impl Face {
    /// Creates a Face over `transport` and spawns its engine task. The
    /// engine lives until the Face and every cloned handle are dropped.
    pub fn new<T: Transport + 'static>(options: FaceOptions, transport: T) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(FaceMetrics::new());

        let handle = FaceHandle::new(command_tx.clone(), options.interest_lifetime_ms);
        let engine = Engine::new(
            options,
            transport,
            command_rx,
            command_tx.downgrade(),
            event_tx,
            Arc::clone(&metrics),
        );
        drop(command_tx);
        tokio::spawn(engine.run());

        Self {
            handle,
            events: event_rx,
            metrics,
        }
    }

    /// Creates a Face speaking TCP to a forwarder.
    pub fn connect_tcp(options: FaceOptions) -> Self {
        Self::new(options, TcpTransport::new())
    }

    /// A handle usable from other tasks and from inside sinks.
    pub fn handle(&self) -> FaceHandle {
        self.handle.clone()
    }

    pub fn metrics(&self) -> Arc<FaceMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Next lifecycle event, or `None` once the engine has stopped.
    pub async fn next_event(&mut self) -> Option<FaceEvent> {
        self.events.recv().await
    }

    /// See [`FaceHandle::express_interest`].
    pub fn express_interest(
        &self,
        name: Name,
        sink: impl ResponseSink + 'static,
        template: Option<&Interest>,
    ) -> Result<()> {
        self.handle.express_interest(name, sink, template)
    }

    /// See [`FaceHandle::register_prefix`].
    pub fn register_prefix(
        &self,
        prefix: Name,
        sink: impl InterestSink + 'static,
        flags: u32,
    ) -> Result<()> {
        self.handle.register_prefix(prefix, sink, flags)
    }

    /// See [`FaceHandle::put_data`].
    pub fn put_data(&self, data: Data) -> Result<()> {
        self.handle.put_data(data)
    }

    /// Expresses `interest` and waits for its outcome. Resolves to
    /// [`Error::Timeout`] when the Interest expires.
    pub async fn fetch(&self, interest: Interest) -> Result<Delivery> {
        let (tx, rx) = oneshot::channel();
        self.handle
            .express(interest, Some(Box::new(FetchSink { tx: Some(tx) })))?;
        rx.await.map_err(|_| Error::FaceClosed)?
    }

    /// Closes the face: clears the pending table, cancels every timer and
    /// shuts the transport. Fails with [`Error::NotOpen`] unless the face
    /// is currently open.
    pub async fn close(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.handle
            .send(Command::Close { done: tx })
            .map_err(|_| Error::NotOpen)?;
        rx.await.map_err(|_| Error::NotOpen)?
    }
}

struct FetchSink {
    tx: Option<oneshot::Sender<Result<Delivery>>>,
}

impl ResponseSink for FetchSink {
    fn on_content(&mut self, _face: &FaceHandle, delivery: Delivery) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Ok(delivery));
        }
    }

    fn on_timeout(&mut self, _face: &FaceHandle, _interest: &Interest) -> TimeoutAction {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(Error::Timeout));
        }
        TimeoutAction::Drop
    }
}
