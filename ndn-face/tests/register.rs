//! Prefix registration and inbound-Interest dispatch.

mod common;

use common::*;
use bytes::Bytes;
use ed25519_dalek::SigningKey;
use ndn_face::{Face, FaceHandle, FaceOptions, NDND_KEY_URI};
use ndn_face_common::ndn::{key_digest, Data, ForwardingEntry, Interest, Name};
use rand::rngs::OsRng;

fn register_face(identity: SigningKey) -> (Face, MockHandle) {
    let (transport, handle) = mock_transport();
    let mut options = FaceOptions::for_host("forwarder", 6363);
    options.verify = false;
    options.identity = Some(identity);
    (Face::new(options, transport), handle)
}

/// The forwarder's answer to the well-known key-digest Interest.
fn forwarder_key_data(forwarder: &SigningKey) -> Data {
    let mut data = Data::new(
        name(NDND_KEY_URI),
        Bytes::copy_from_slice(forwarder.verifying_key().as_bytes()),
    );
    data.sign(forwarder);
    data
}

fn echo_ok(_face: &FaceHandle, _prefix: &Name, interest: &Interest) -> Option<Data> {
    Some(Data::new(interest.name.clone(), &b"ok"[..]))
}

#[tokio::test(start_paused = true)]
async fn registration_bootstraps_then_self_registers() {
    let identity = SigningKey::generate(&mut OsRng);
    let verifier = identity.verifying_key();
    let (face, mut wire) = register_face(identity);
    let forwarder = SigningKey::generate(&mut OsRng);

    face.register_prefix(name("/app/foo"), echo_ok, 0).unwrap();

    // nothing may be self-registered before the forwarder id is known:
    // the first transmission is the bootstrap Interest
    let bootstrap = wire.next_interest().await;
    assert_eq!(bootstrap.name, name(NDND_KEY_URI));
    assert_eq!(bootstrap.lifetime_ms, 4000);

    wire.inject_data(&forwarder_key_data(&forwarder));

    // the self-registration Interest carries a signed envelope around a
    // ForwardingEntry
    let selfreg = wire.next_interest().await;
    assert_eq!(selfreg.name.get(0).unwrap().as_bytes().as_ref(), b"ndnx");
    assert_eq!(
        selfreg.name.get(1).unwrap().as_bytes(),
        &key_digest(&forwarder.verifying_key())
    );
    assert_eq!(selfreg.name.get(2).unwrap().as_bytes().as_ref(), b"selfreg");
    assert_eq!(selfreg.selectors.unwrap().scope, Some(1));

    let envelope_wire = selfreg.name.get(3).unwrap().as_bytes().clone();
    let envelope = Data::decode(&mut envelope_wire.clone()).unwrap();
    assert!(envelope.verify(&verifier));

    let entry = ForwardingEntry::decode(&mut envelope.content.clone()).unwrap();
    assert_eq!(entry.action, "selfreg");
    assert_eq!(entry.prefix, name("/app/foo"));
    assert_eq!(entry.flags & 3, 3);
    assert_eq!(entry.freshness_seconds, 2_147_483_647);
}

#[tokio::test(start_paused = true)]
async fn registered_handler_answers_inbound_interest() {
    let (face, mut wire) = register_face(SigningKey::generate(&mut OsRng));
    let forwarder = SigningKey::generate(&mut OsRng);

    face.register_prefix(name("/app/foo"), echo_ok, 0).unwrap();
    wire.next_interest().await;
    wire.inject_data(&forwarder_key_data(&forwarder));
    wire.next_interest().await;

    wire.inject_interest(&Interest::new(name("/app/foo/bar")));

    let response = wire.next_data().await;
    assert_eq!(response.name.to_uri(), "/app/foo/bar");
    assert_eq!(response.content.as_ref(), b"ok");
    // unsigned handler responses get an integrity seal before transmission
    assert!(response.verify_digest());
}

#[tokio::test(start_paused = true)]
async fn first_registered_prefix_wins() {
    let (face, mut wire) = register_face(SigningKey::generate(&mut OsRng));
    let forwarder = SigningKey::generate(&mut OsRng);

    let outer = |_face: &FaceHandle, _prefix: &Name, interest: &Interest| -> Option<Data> {
        Some(Data::new(interest.name.clone(), &b"outer"[..]))
    };
    let inner = |_face: &FaceHandle, _prefix: &Name, interest: &Interest| -> Option<Data> {
        Some(Data::new(interest.name.clone(), &b"inner"[..]))
    };

    face.register_prefix(name("/app"), outer, 0).unwrap();
    face.register_prefix(name("/app/foo"), inner, 0).unwrap();

    // one bootstrap serves both registrations
    let bootstrap = wire.next_interest().await;
    assert_eq!(bootstrap.name, name(NDND_KEY_URI));
    wire.inject_data(&forwarder_key_data(&forwarder));
    wire.next_interest().await;
    wire.next_interest().await;

    // dispatch is first-match in registration order, not longest-match
    wire.inject_interest(&Interest::new(name("/app/foo/bar")));
    let response = wire.next_data().await;
    assert_eq!(response.content.as_ref(), b"outer");
}

#[tokio::test(start_paused = true)]
async fn unmatched_inbound_interest_is_dropped() {
    let (face, mut wire) = register_face(SigningKey::generate(&mut OsRng));
    let forwarder = SigningKey::generate(&mut OsRng);

    face.register_prefix(name("/app"), echo_ok, 0).unwrap();
    wire.next_interest().await;
    wire.inject_data(&forwarder_key_data(&forwarder));
    wire.next_interest().await;

    wire.inject_interest(&Interest::new(name("/elsewhere/x")));
    wire.assert_quiet(100).await;
    assert_eq!(face.metrics().interests_received.value(), 1);
}

#[tokio::test(start_paused = true)]
async fn bootstrap_timeout_abandons_registration() {
    let (face, mut wire) = register_face(SigningKey::generate(&mut OsRng));

    face.register_prefix(name("/app"), echo_ok, 0).unwrap();
    let bootstrap = wire.next_interest().await;
    assert_eq!(bootstrap.name, name(NDND_KEY_URI));

    // never answer: the bootstrap expires and no self-registration happens
    wire.assert_quiet(5000).await;

    // the prefix was not installed, so a matching Interest goes unanswered
    wire.inject_interest(&Interest::new(name("/app/x")));
    wire.assert_quiet(100).await;
    assert_eq!(face.metrics().cst_size.value(), 0);
}
