//! Shared helpers for the face integration tests: an in-memory transport
//! implementing the transport contract, and channel-backed sinks.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use ndn_face::{
    Delivery, Face, FaceHandle, FaceOptions, ResponseSink, TimeoutAction, Transport,
    TransportEvent,
};
use ndn_face_common::ndn::{Data, Interest, Name, Packet};
use ndn_face_common::{Error, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/* ---------------------------------------------------------------- *
 * Mock transport
 * ---------------------------------------------------------------- */

#[derive(Default)]
struct MockShared {
    events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    connects: Mutex<Vec<(String, u16)>>,
    refuse: Mutex<HashSet<String>>,
}

/// Transport half handed to the Face.
pub struct MockTransport {
    shared: Arc<MockShared>,
    sent_tx: mpsc::UnboundedSender<Bytes>,
    endpoint: Option<(String, u16)>,
    connected: bool,
}

/// Test half: observes sends and injects inbound traffic.
pub struct MockHandle {
    shared: Arc<MockShared>,
    sent_rx: mpsc::UnboundedReceiver<Bytes>,
}

pub fn mock_transport() -> (MockTransport, MockHandle) {
    let shared = Arc::new(MockShared::default());
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    (
        MockTransport {
            shared: Arc::clone(&shared),
            sent_tx,
            endpoint: None,
            connected: false,
        },
        MockHandle { shared, sent_rx },
    )
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<()> {
        self.shared
            .connects
            .lock()
            .unwrap()
            .push((host.to_string(), port));
        if self.shared.refuse.lock().unwrap().contains(host) {
            return Err(Error::Transport(format!("connection refused by {}", host)));
        }
        *self.shared.events.lock().unwrap() = Some(events);
        self.endpoint = Some((host.to_string(), port));
        self.connected = true;
        Ok(())
    }

    fn send(&mut self, element: Bytes) -> Result<()> {
        if !self.connected {
            return Err(Error::Transport("not connected".into()));
        }
        self.sent_tx
            .send(element)
            .map_err(|_| Error::Transport("test handle dropped".into()))
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        *self.shared.events.lock().unwrap() = None;
        Ok(())
    }

    fn connected_host(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|(host, _)| host.as_str())
    }

    fn connected_port(&self) -> Option<u16> {
        self.endpoint.as_ref().map(|(_, port)| *port)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl MockHandle {
    /// Marks `host` as refusing TCP connections.
    pub fn refuse(&self, host: &str) {
        self.shared.refuse.lock().unwrap().insert(host.to_string());
    }

    /// Hosts the Face has connected to, in order.
    pub fn connects(&self) -> Vec<(String, u16)> {
        self.shared.connects.lock().unwrap().clone()
    }

    /// Delivers a raw inbound element to the Face.
    pub fn inject(&self, element: Bytes) {
        let guard = self.shared.events.lock().unwrap();
        let events = guard.as_ref().expect("transport not connected");
        events
            .send(TransportEvent::Element(element))
            .expect("engine gone");
    }

    /// Delivers an inbound Data packet.
    pub fn inject_data(&self, data: &Data) {
        self.inject(data.to_bytes().unwrap());
    }

    /// Delivers an inbound Interest packet.
    pub fn inject_interest(&self, interest: &Interest) {
        self.inject(interest.to_bytes().unwrap());
    }

    /// Simulates the forwarder closing the stream.
    pub fn inject_closed(&self) {
        let guard = self.shared.events.lock().unwrap();
        if let Some(events) = guard.as_ref() {
            let _ = events.send(TransportEvent::Closed);
        }
    }

    /// Next element the Face sent.
    pub async fn next_sent(&mut self) -> Bytes {
        self.sent_rx.recv().await.expect("engine gone")
    }

    /// Next sent element, decoded.
    pub async fn next_packet(&mut self) -> Packet {
        let wire = self.next_sent().await;
        Packet::decode(&wire).expect("face sent an undecodable element")
    }

    /// Next sent element, asserted to be an Interest.
    pub async fn next_interest(&mut self) -> Interest {
        match self.next_packet().await {
            Packet::Interest(interest) => interest,
            Packet::Data(data) => panic!("expected Interest, face sent Data {}", data.name),
        }
    }

    /// Next sent element, asserted to be a Data.
    pub async fn next_data(&mut self) -> Data {
        match self.next_packet().await {
            Packet::Data(data) => data,
            Packet::Interest(interest) => {
                panic!("expected Data, face sent Interest {}", interest.name)
            }
        }
    }

    /// Asserts that nothing is sent within `millis` of (virtual) time.
    pub async fn assert_quiet(&mut self, millis: u64) {
        let wait = tokio::time::timeout(
            std::time::Duration::from_millis(millis),
            self.sent_rx.recv(),
        )
        .await;
        if let Ok(Some(wire)) = wait {
            let packet = Packet::decode(&wire);
            panic!("unexpected transmission: {:?}", packet);
        }
    }
}

/* ---------------------------------------------------------------- *
 * Channel-backed sinks
 * ---------------------------------------------------------------- */

#[derive(Debug)]
pub enum SinkEvent {
    Content(Data),
    ContentUnverified(Data),
    ContentBad(Data),
    TimedOut(Interest),
}

pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
    reexpress_budget: u32,
}

impl ResponseSink for ChannelSink {
    fn on_content(&mut self, _face: &FaceHandle, delivery: Delivery) {
        let event = match delivery {
            Delivery::Content(data) => SinkEvent::Content(data),
            Delivery::ContentUnverified(data) => SinkEvent::ContentUnverified(data),
            Delivery::ContentBad(data) => SinkEvent::ContentBad(data),
        };
        let _ = self.tx.send(event);
    }

    fn on_timeout(&mut self, _face: &FaceHandle, interest: &Interest) -> TimeoutAction {
        let _ = self.tx.send(SinkEvent::TimedOut(interest.clone()));
        if self.reexpress_budget > 0 {
            self.reexpress_budget -= 1;
            TimeoutAction::Reexpress
        } else {
            TimeoutAction::Drop
        }
    }
}

pub fn channel_sink() -> (ChannelSink, mpsc::UnboundedReceiver<SinkEvent>) {
    sink_with_reexpress(0)
}

/// A sink answering `Reexpress` to the first `budget` timeouts.
pub fn sink_with_reexpress(budget: u32) -> (ChannelSink, mpsc::UnboundedReceiver<SinkEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelSink {
            tx,
            reexpress_budget: budget,
        },
        rx,
    )
}

/// Asserts that the sink stays silent for `millis` of (virtual) time.
pub async fn assert_no_event(rx: &mut mpsc::UnboundedReceiver<SinkEvent>, millis: u64) {
    let wait = tokio::time::timeout(std::time::Duration::from_millis(millis), rx.recv()).await;
    if let Ok(Some(event)) = wait {
        panic!("unexpected sink event: {:?}", event);
    }
}

/* ---------------------------------------------------------------- *
 * Packet and face helpers
 * ---------------------------------------------------------------- */

pub fn name(uri: &str) -> Name {
    Name::from_uri(uri).unwrap()
}

/// Integrity-signed Data.
pub fn digest_data(uri: &str, content: &[u8]) -> Data {
    let mut data = Data::new(name(uri), content.to_vec());
    data.sign_digest();
    data
}

/// A Face over a mock transport with a fixed forwarder endpoint.
pub fn mock_face(verify: bool) -> (Face, MockHandle) {
    let (transport, handle) = mock_transport();
    let mut options = FaceOptions::for_host("forwarder", 6363);
    options.verify = verify;
    (Face::new(options, transport), handle)
}
