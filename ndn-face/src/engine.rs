//! The Face engine task.
//!
//! One task owns the PIT, the registered-prefix table, the key cache and
//! the transport, and multiplexes three inputs: commands from handles,
//! framed elements from the transport, and the earliest pending deadline.
//! Every table mutation of a dispatch completes before any application
//! sink runs, so sinks may re-enter the Face through their handle. Nested
//! key-fetch Interests are pushed back through the command queue instead
//! of being expressed in-stack.

use crate::config::FaceOptions;
use crate::cst::Cst;
use crate::face::{Delivery, FaceEvent, FaceHandle, InterestSink, ResponseSink, TimeoutAction};
use crate::hosts::HostStrategy;
use crate::keystore::KeyStore;
use crate::pit::{Pit, PitEntry};
use crate::transport::{Transport, TransportEvent};
use crate::verify::{self, Outcome};
use crate::{
    KEY_FETCH_PREFIX_COMPONENTS, NDND_KEY_URI, PROBE_INTEREST_LIFETIME_MS, PROBE_TIMEOUT_MS,
    REGISTRATION_LIFETIME_SECONDS, REQUIRED_FORWARDING_FLAGS, SELFREG_PREFIX,
};
use bytes::Bytes;
use ed25519_dalek::SigningKey;
use log::{debug, error, info, trace, warn};
use ndn_face_common::metrics::FaceMetrics;
use ndn_face_common::ndn::{Data, ForwardingEntry, Interest, Name, NameComponent, Packet};
use ndn_face_common::{Error, Result};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

/// Operations enqueued by [`FaceHandle`]s and by the engine itself.
pub(crate) enum Command {
    Express {
        interest: Interest,
        sink: Option<Box<dyn ResponseSink>>,
    },
    /// Deferred key fetch on behalf of `data`, queued by the verifier.
    FetchKey {
        key_name: Name,
        data: Data,
        sink: Box<dyn ResponseSink>,
    },
    Register {
        prefix: Name,
        sink: Box<dyn InterestSink>,
        flags: u32,
    },
    PutData(Data),
    Close {
        done: oneshot::Sender<Result<()>>,
    },
}

/// Consumer attached to one PIT entry.
enum PitSink {
    /// An application sink.
    App(Box<dyn ResponseSink>),
    /// Internal key fetch; delivery of the key resolves `data`.
    KeyFetch {
        key_name: Name,
        data: Data,
        sink: Box<dyn ResponseSink>,
    },
    /// Host-probe Interest for `/`.
    Probe,
    /// Forwarder key-digest bootstrap.
    Bootstrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ready {
    Unopen,
    Opened,
    Closed,
}

struct ProbeState {
    deadline: Instant,
    pit_id: u64,
}

struct PendingRegistration {
    prefix: Name,
    sink: Box<dyn InterestSink>,
    flags: u32,
}

pub(crate) struct Engine<T: Transport> {
    ready: Ready,
    host: Option<String>,
    port: u16,
    ndnd_id: Option<Bytes>,
    verify_enabled: bool,
    default_lifetime_ms: u32,
    strategy: Option<HostStrategy>,
    identity: SigningKey,

    transport: T,
    pit: Pit<PitSink>,
    cst: Cst,
    keys: KeyStore,

    probe: Option<ProbeState>,
    bootstrap_inflight: bool,
    pending_registrations: Vec<PendingRegistration>,
    /// Operations parked while a host probe is in flight.
    deferred: Vec<Command>,

    commands: mpsc::UnboundedReceiver<Command>,
    weak_tx: mpsc::WeakUnboundedSender<Command>,
    element_tx: mpsc::UnboundedSender<TransportEvent>,
    elements: mpsc::UnboundedReceiver<TransportEvent>,
    events: mpsc::UnboundedSender<FaceEvent>,
    metrics: Arc<FaceMetrics>,
}

impl<T: Transport> Engine<T> {
    pub fn new(
        options: FaceOptions,
        transport: T,
        commands: mpsc::UnboundedReceiver<Command>,
        weak_tx: mpsc::WeakUnboundedSender<Command>,
        events: mpsc::UnboundedSender<FaceEvent>,
        metrics: Arc<FaceMetrics>,
    ) -> Self {
        let (element_tx, elements) = mpsc::unbounded_channel();
        let identity = options
            .identity
            .unwrap_or_else(|| SigningKey::generate(&mut OsRng));
        Self {
            ready: Ready::Unopen,
            host: options.host,
            port: options.port,
            ndnd_id: None,
            verify_enabled: options.verify,
            default_lifetime_ms: options.interest_lifetime_ms,
            strategy: options.strategy,
            identity,
            transport,
            pit: Pit::new(),
            cst: Cst::new(),
            keys: KeyStore::new(options.key_cache_capacity),
            probe: None,
            bootstrap_inflight: false,
            pending_registrations: Vec::new(),
            deferred: Vec::new(),
            commands,
            weak_tx,
            element_tx,
            elements,
            events,
            metrics,
        }
    }

    pub async fn run(mut self) {
        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                maybe_command = self.commands.recv() => match maybe_command {
                    Some(command) => self.handle_command(command).await,
                    // Face and every handle dropped
                    None => break,
                },
                maybe_event = self.elements.recv() => match maybe_event {
                    Some(TransportEvent::Element(bytes)) => self.on_element(bytes).await,
                    Some(TransportEvent::Closed) => self.on_transport_closed(),
                    None => {}
                },
                _ = tokio::time::sleep_until(
                    deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600))
                ), if deadline.is_some() => {
                    self.on_deadline().await;
                }
            }
        }
        if self.ready == Ready::Opened {
            let _ = self.transport.close().await;
        }
    }

    /* ------------------------------------------------------------ *
     * Command handling
     * ------------------------------------------------------------ */

    async fn handle_command(&mut self, command: Command) {
        let command = match command {
            Command::Close { done } => {
                self.do_close(done).await;
                return;
            }
            other => other,
        };
        if self.ready == Ready::Closed {
            debug!("dropping operation on closed face");
            return;
        }
        if self.probe.is_some() {
            self.deferred.push(command);
            return;
        }
        match self.ensure_connected().await {
            Ok(true) => self.dispatch(command),
            Ok(false) => self.deferred.push(command),
            Err(e) => error!("cannot reach a forwarder: {}", e),
        }
    }

    /// Makes sure the transport is connected to the currently assigned
    /// endpoint. `Ok(true)` means ready now; `Ok(false)` means a host
    /// probe was started and the caller should defer.
    async fn ensure_connected(&mut self) -> Result<bool> {
        if let Some(host) = self.host.clone() {
            let connected = self.transport.is_connected()
                && self.transport.connected_host() == Some(host.as_str())
                && self.transport.connected_port() == Some(self.port);
            if !connected {
                self.transport
                    .connect(&host, self.port, self.element_tx.clone())
                    .await?;
                self.set_opened();
            }
            return Ok(true);
        }
        if self.strategy.is_none() {
            return Err(Error::Transport(
                "no forwarder host configured and no candidates to probe".into(),
            ));
        }
        self.start_probe().await?;
        Ok(false)
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::Express { interest, sink } => {
                self.do_express(interest, sink.map(PitSink::App));
            }
            Command::FetchKey {
                key_name,
                data,
                sink,
            } => self.do_fetch_key(key_name, data, sink),
            Command::Register {
                prefix,
                sink,
                flags,
            } => self.do_register(prefix, sink, flags),
            Command::PutData(data) => match data.to_bytes() {
                Ok(wire) => {
                    self.metrics.data_sent.increment();
                    self.send_element(wire);
                }
                Err(e) => error!("cannot encode data: {}", e),
            },
            Command::Close { done } => {
                // intercepted in handle_command; kept for exhaustiveness
                let _ = done.send(Err(Error::NotOpen));
            }
        }
    }

    fn do_express(&mut self, interest: Interest, sink: Option<PitSink>) {
        let wire = match interest.to_bytes() {
            Ok(wire) => wire,
            Err(e) => {
                error!("cannot encode interest for {}: {}", interest.name.to_uri(), e);
                return;
            }
        };
        if let Some(sink) = sink {
            let deadline = Instant::now() + Duration::from_millis(interest.lifetime_ms as u64);
            trace!(
                "expressing {} with {} ms lifetime",
                interest.name.to_uri(),
                interest.lifetime_ms
            );
            self.pit.insert(interest, wire.clone(), sink, deadline);
            self.metrics.pit_size.set(self.pit.len() as u64);
        }
        self.metrics.interests_sent.increment();
        self.send_element(wire);
    }

    fn do_fetch_key(&mut self, key_name: Name, data: Data, mut sink: Box<dyn ResponseSink>) {
        // The key may have landed while this command sat in the queue.
        if let Some(entry) = self.keys.lookup(&key_name) {
            let key = entry.key.clone();
            self.metrics.key_cache_hits.increment();
            let Some(handle) = self.make_handle() else { return };
            if data.verify(&key) {
                self.metrics.verify_ok.increment();
                sink.on_content(&handle, Delivery::Content(data));
            } else {
                self.metrics.verify_failed.increment();
                sink.on_content(&handle, Delivery::ContentBad(data));
            }
            return;
        }

        self.metrics.key_fetches.increment();
        let prefix_len = key_name.len().min(KEY_FETCH_PREFIX_COMPONENTS);
        let interest = Interest::new(key_name.prefix(prefix_len));
        debug!(
            "fetching key {} for {}",
            key_name.to_uri(),
            data.name.to_uri()
        );
        self.do_express(
            interest,
            Some(PitSink::KeyFetch {
                key_name,
                data,
                sink,
            }),
        );
    }

    fn do_register(&mut self, prefix: Name, sink: Box<dyn InterestSink>, flags: u32) {
        let flags = flags | REQUIRED_FORWARDING_FLAGS;
        if self.ndnd_id.is_some() {
            self.complete_registration(prefix, sink, flags);
            return;
        }

        self.pending_registrations.push(PendingRegistration {
            prefix,
            sink,
            flags,
        });
        if !self.bootstrap_inflight {
            let name = match Name::from_uri(NDND_KEY_URI) {
                Ok(name) => name,
                Err(e) => {
                    error!("cannot build bootstrap name: {}", e);
                    return;
                }
            };
            self.bootstrap_inflight = true;
            let interest = Interest::new(name).with_lifetime(PROBE_INTEREST_LIFETIME_MS);
            debug!("fetching forwarder key digest");
            self.do_express(interest, Some(PitSink::Bootstrap));
        }
    }

    /// Builds and sends the signed self-registration Interest, then
    /// installs the prefix handler. Requires `ndnd_id`.
    fn complete_registration(&mut self, prefix: Name, sink: Box<dyn InterestSink>, flags: u32) {
        let Some(ndnd_id) = self.ndnd_id.clone() else {
            error!("registration of {} without forwarder id", prefix.to_uri());
            return;
        };

        let entry = ForwardingEntry::new(
            "selfreg",
            prefix.clone(),
            flags,
            REGISTRATION_LIFETIME_SECONDS,
        );
        let payload = match entry.to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                error!("cannot encode forwarding entry: {}", e);
                return;
            }
        };

        let mut envelope_name = Name::new();
        envelope_name.append(NameComponent::new(SELFREG_PREFIX.as_bytes().to_vec()));
        envelope_name.append(NameComponent::new(ndnd_id));
        envelope_name.append(NameComponent::new(&b"selfreg"[..]));

        let mut envelope = Data::new(envelope_name.clone(), payload);
        envelope.sign(&self.identity);
        let envelope_wire = match envelope.to_bytes() {
            Ok(wire) => wire,
            Err(e) => {
                error!("cannot encode registration envelope: {}", e);
                return;
            }
        };

        let interest_name = envelope_name.appended(NameComponent::new(envelope_wire));
        let interest = Interest::new(interest_name).with_scope(1);
        info!("registering prefix {}", prefix.to_uri());
        self.do_express(interest, None);

        self.cst.insert(prefix, sink, flags);
        self.metrics.cst_size.set(self.cst.len() as u64);
    }

    async fn do_close(&mut self, done: oneshot::Sender<Result<()>>) {
        if self.ready != Ready::Opened {
            let _ = done.send(Err(Error::NotOpen));
            return;
        }
        self.ready = Ready::Closed;
        self.pit.clear();
        self.probe = None;
        self.deferred.clear();
        self.pending_registrations.clear();
        self.bootstrap_inflight = false;
        self.metrics.pit_size.set(0);
        if let Err(e) = self.transport.close().await {
            debug!("transport close: {}", e);
        }
        info!("face closed");
        let _ = self.events.send(FaceEvent::Closed);
        let _ = done.send(Ok(()));
    }

    /* ------------------------------------------------------------ *
     * Host probing
     * ------------------------------------------------------------ */

    async fn start_probe(&mut self) -> Result<()> {
        loop {
            let candidate = self.strategy.as_mut().and_then(|s| s.next());
            let Some((host, port)) = candidate else {
                self.host = None;
                error!("forwarder candidates exhausted; leaving host unset");
                for _ in self.deferred.drain(..) {
                    warn!("dropping operation deferred behind host probing");
                }
                return Err(Error::HostsExhausted);
            };

            info!("probing forwarder candidate {}:{}", host, port);
            match self
                .transport
                .connect(&host, port, self.element_tx.clone())
                .await
            {
                Ok(()) => {
                    self.host = Some(host);
                    self.port = port;
                    let interest =
                        Interest::new(Name::new()).with_lifetime(PROBE_INTEREST_LIFETIME_MS);
                    let wire = interest.to_bytes()?;
                    let deadline =
                        Instant::now() + Duration::from_millis(interest.lifetime_ms as u64);
                    let pit_id = self.pit.insert(interest, wire.clone(), PitSink::Probe, deadline);
                    self.metrics.pit_size.set(self.pit.len() as u64);
                    self.probe = Some(ProbeState {
                        deadline: Instant::now() + Duration::from_millis(PROBE_TIMEOUT_MS),
                        pit_id,
                    });
                    self.metrics.interests_sent.increment();
                    self.send_element(wire);
                    return Ok(());
                }
                Err(e) => {
                    warn!("cannot connect to {}:{}: {}", host, port, e);
                    continue;
                }
            }
        }
    }

    async fn advance_probe(&mut self) {
        if let Err(e) = self.start_probe().await {
            debug!("probing stopped: {}", e);
        }
    }

    async fn on_probe_success(&mut self) {
        self.probe = None;
        self.set_opened();
        info!(
            "forwarder {}:{} answered probe",
            self.host.as_deref().unwrap_or("?"),
            self.port
        );
        let deferred = std::mem::take(&mut self.deferred);
        for command in deferred {
            self.handle_command(command).await;
        }
    }

    /* ------------------------------------------------------------ *
     * Inbound dispatch
     * ------------------------------------------------------------ */

    async fn on_element(&mut self, bytes: Bytes) {
        if self.ready == Ready::Closed {
            return;
        }
        match Packet::decode(&bytes) {
            Err(e) => {
                warn!("discarding undecodable element: {}", e);
                self.metrics.elements_discarded.increment();
            }
            Ok(Packet::Interest(interest)) => self.on_interest(interest),
            Ok(Packet::Data(data)) => self.on_data(data).await,
        }
    }

    fn on_interest(&mut self, interest: Interest) {
        self.metrics.interests_received.increment();
        let uri = interest.name.to_uri();
        let Some(handle) = self.make_handle() else { return };

        let response = match self.cst.lookup_mut(&interest.name) {
            Some(entry) => {
                debug!(
                    "dispatching {} to handler for {} (flags {:#x})",
                    uri, entry.uri, entry.flags
                );
                let crate::cst::CstEntry {
                    ref prefix,
                    ref mut sink,
                    ..
                } = *entry;
                sink.on_interest(&handle, prefix, &interest)
            }
            None => {
                trace!("no handler for inbound interest {}", uri);
                None
            }
        };

        if let Some(mut data) = response {
            if data.signature_value.is_empty() {
                data.sign_digest();
            }
            match data.to_bytes() {
                Ok(wire) => {
                    self.metrics.data_sent.increment();
                    self.send_element(wire);
                }
                Err(e) => warn!("cannot encode response for {}: {}", uri, e),
            }
        }
    }

    async fn on_data(&mut self, data: Data) {
        self.metrics.data_received.increment();
        trace!("inbound data {}", data.name.to_uri());

        let Some(id) = self.pit.match_for_data(&data) else {
            trace!("no pending interest for {}", data.name.to_uri());
            self.metrics.elements_discarded.increment();
            return;
        };
        let Some(entry) = self.pit.remove(id) else { return };
        self.metrics.pit_size.set(self.pit.len() as u64);
        self.metrics.interests_satisfied.increment();

        match entry.sink {
            PitSink::App(sink) => self.deliver(sink, data),
            PitSink::KeyFetch {
                key_name,
                data: original,
                sink,
            } => self.finish_key_fetch(key_name, original, sink, data),
            PitSink::Probe => self.on_probe_success().await,
            PitSink::Bootstrap => self.on_bootstrap_data(data),
        }
    }

    /// Runs the verification flow for an application delivery.
    fn deliver(&mut self, mut sink: Box<dyn ResponseSink>, data: Data) {
        let Some(handle) = self.make_handle() else { return };

        if !self.verify_enabled {
            sink.on_content(&handle, Delivery::ContentUnverified(data));
            return;
        }

        match verify::check(&data, &self.keys, &self.metrics) {
            Outcome::Good => {
                self.metrics.verify_ok.increment();
                sink.on_content(&handle, Delivery::Content(data));
            }
            Outcome::Bad(reason) => {
                self.metrics.verify_failed.increment();
                debug!("delivering {} as bad: {}", data.name.to_uri(), reason);
                sink.on_content(&handle, Delivery::ContentBad(data));
            }
            Outcome::NeedKey(key_name) => {
                // Defer through the queue so the fetch never recurses
                // inside this dispatch.
                if let Some(tx) = self.weak_tx.upgrade() {
                    let _ = tx.send(Command::FetchKey {
                        key_name,
                        data,
                        sink,
                    });
                }
            }
        }
    }

    fn finish_key_fetch(
        &mut self,
        key_name: Name,
        original: Data,
        mut sink: Box<dyn ResponseSink>,
        key_data: Data,
    ) {
        let Some(handle) = self.make_handle() else { return };
        match verify::parse_key(&key_data.content) {
            Ok(key) => {
                if original.verify(&key) {
                    self.keys.insert(key_name, key);
                    self.metrics.key_cache_size.set(self.keys.len() as u64);
                    self.metrics.verify_ok.increment();
                    sink.on_content(&handle, Delivery::Content(original));
                } else {
                    self.metrics.verify_failed.increment();
                    debug!(
                        "signature of {} failed under fetched key {}",
                        original.name.to_uri(),
                        key_name.to_uri()
                    );
                    sink.on_content(&handle, Delivery::ContentBad(original));
                }
            }
            Err(e) => {
                warn!("fetched key {} is unusable: {}", key_data.name.to_uri(), e);
                self.metrics.verify_failed.increment();
                sink.on_content(&handle, Delivery::ContentBad(original));
            }
        }
    }

    fn on_bootstrap_data(&mut self, data: Data) {
        self.bootstrap_inflight = false;
        let digest = data
            .signature_info
            .publisher_public_key_digest
            .clone()
            .unwrap_or_else(|| Bytes::copy_from_slice(Sha256::digest(&data.content).as_slice()));
        info!("forwarder id learned ({} bytes)", digest.len());
        self.ndnd_id = Some(digest);

        let pending = std::mem::take(&mut self.pending_registrations);
        for registration in pending {
            self.complete_registration(registration.prefix, registration.sink, registration.flags);
        }
    }

    fn on_transport_closed(&mut self) {
        if self.ready == Ready::Closed {
            return;
        }
        warn!("forwarder closed the connection");
        self.ready = Ready::Closed;
        self.pit.clear();
        self.probe = None;
        self.metrics.pit_size.set(0);
        let _ = self.events.send(FaceEvent::Closed);
    }

    /* ------------------------------------------------------------ *
     * Deadlines
     * ------------------------------------------------------------ */

    fn next_deadline(&self) -> Option<Instant> {
        let pit = self.pit.earliest_deadline();
        let probe = self.probe.as_ref().map(|p| p.deadline);
        match (pit, probe) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        }
    }

    async fn on_deadline(&mut self) {
        let now = Instant::now();

        let expired_probe = self
            .probe
            .as_ref()
            .filter(|p| p.deadline <= now)
            .map(|p| p.pit_id);
        if let Some(pit_id) = expired_probe {
            self.probe = None;
            self.pit.remove(pit_id);
            self.metrics.pit_size.set(self.pit.len() as u64);
            debug!("probe timed out");
            self.advance_probe().await;
        }

        let expired = self.pit.take_expired(now);
        if !expired.is_empty() {
            self.metrics.pit_size.set(self.pit.len() as u64);
        }
        for entry in expired {
            self.on_entry_expired(entry).await;
        }
    }

    async fn on_entry_expired(&mut self, entry: PitEntry<PitSink>) {
        match entry.sink {
            PitSink::App(mut sink) => {
                self.metrics.interests_timed_out.increment();
                debug!("interest {} timed out", entry.interest.name.to_uri());
                let Some(handle) = self.make_handle() else { return };
                match sink.on_timeout(&handle, &entry.interest) {
                    TimeoutAction::Reexpress => {
                        let deadline = Instant::now()
                            + Duration::from_millis(entry.interest.lifetime_ms as u64);
                        let wire = entry.wire.clone();
                        debug!("re-expressing {}", entry.interest.name.to_uri());
                        self.pit
                            .insert(entry.interest, entry.wire, PitSink::App(sink), deadline);
                        self.metrics.pit_size.set(self.pit.len() as u64);
                        self.metrics.interests_reexpressed.increment();
                        self.metrics.interests_sent.increment();
                        self.send_element(wire);
                    }
                    TimeoutAction::Drop => {}
                }
            }
            PitSink::KeyFetch { key_name, data, .. } => {
                self.metrics.interests_timed_out.increment();
                // source behavior: the original request receives no delivery
                warn!(
                    "key fetch for {} timed out; dropping data {}",
                    key_name.to_uri(),
                    data.name.to_uri()
                );
            }
            PitSink::Probe => {
                let active = self.probe.as_ref().is_some_and(|p| p.pit_id == entry.id);
                if active {
                    self.probe = None;
                    debug!("probe interest expired");
                    self.advance_probe().await;
                }
            }
            PitSink::Bootstrap => {
                self.bootstrap_inflight = false;
                error!("cannot determine forwarder id: bootstrap interest timed out");
                for registration in self.pending_registrations.drain(..) {
                    warn!(
                        "abandoning registration of {}",
                        registration.prefix.to_uri()
                    );
                }
            }
        }
    }

    /* ------------------------------------------------------------ *
     * Helpers
     * ------------------------------------------------------------ */

    fn set_opened(&mut self) {
        if self.ready != Ready::Opened {
            self.ready = Ready::Opened;
            let _ = self.events.send(FaceEvent::Opened);
        }
    }

    fn make_handle(&self) -> Option<FaceHandle> {
        self.weak_tx
            .upgrade()
            .map(|tx| FaceHandle::new(tx, self.default_lifetime_ms))
    }

    fn send_element(&mut self, wire: Bytes) {
        if let Err(e) = self.transport.send(wire) {
            error!("transport send failed: {}", e);
            let _ = self.events.send(FaceEvent::Error(e.to_string()));
        }
    }
}
