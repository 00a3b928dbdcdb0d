//! Signature verification, including the recursive key-fetch flow.

mod common;

use common::*;
use bytes::Bytes;
use ed25519_dalek::SigningKey;
use ndn_face_common::ndn::{Data, KeyLocator};
use rand::rngs::OsRng;

fn signed_data(uri: &str, signer: &SigningKey, locator: KeyLocator) -> Data {
    let mut data = Data::new(name(uri), &b"payload"[..]).with_key_locator(locator);
    data.sign(signer);
    data
}

fn key_payload(key: &SigningKey) -> Bytes {
    Bytes::copy_from_slice(key.verifying_key().as_bytes())
}

#[tokio::test(start_paused = true)]
async fn key_is_fetched_through_the_same_face() {
    let (face, mut wire) = mock_face(true);
    let (sink, mut events) = channel_sink();
    let signer = SigningKey::generate(&mut OsRng);

    face.express_interest(name("/app/data"), sink, None).unwrap();
    wire.next_interest().await;

    // Data signed under a key living elsewhere
    wire.inject_data(&signed_data(
        "/app/data/1",
        &signer,
        KeyLocator::KeyName(name("/keys/signer")),
    ));

    // the face fetches the key before delivering anything
    let key_fetch = wire.next_interest().await;
    assert_eq!(key_fetch.name.to_uri(), "/keys/signer");
    assert_no_event(&mut events, 10).await;

    wire.inject_data(&digest_data_with_content("/keys/signer", key_payload(&signer)));

    match events.recv().await.unwrap() {
        SinkEvent::Content(data) => assert_eq!(data.name.to_uri(), "/app/data/1"),
        other => panic!("expected verified content, got {:?}", other),
    }

    // second Data under the same key verifies from the cache, no new fetch
    let (sink2, mut events2) = channel_sink();
    face.express_interest(name("/app/data2"), sink2, None).unwrap();
    let sent = wire.next_interest().await;
    assert_eq!(sent.name.to_uri(), "/app/data2");

    wire.inject_data(&signed_data(
        "/app/data2/1",
        &signer,
        KeyLocator::KeyName(name("/keys/signer")),
    ));
    match events2.recv().await.unwrap() {
        SinkEvent::Content(data) => assert_eq!(data.name.to_uri(), "/app/data2/1"),
        other => panic!("expected verified content, got {:?}", other),
    }
    wire.assert_quiet(100).await;

    let metrics = face.metrics();
    assert_eq!(metrics.key_fetches.value(), 1);
    assert_eq!(metrics.key_cache_hits.value(), 1);
    assert_eq!(metrics.key_cache_size.value(), 1);
}

#[tokio::test(start_paused = true)]
async fn key_fetch_uses_four_component_prefix() {
    let (face, mut wire) = mock_face(true);
    let (sink, _events) = channel_sink();
    let signer = SigningKey::generate(&mut OsRng);

    face.express_interest(name("/d"), sink, None).unwrap();
    wire.next_interest().await;

    wire.inject_data(&signed_data(
        "/d/1",
        &signer,
        KeyLocator::KeyName(name("/very/deep/key/name/with/version")),
    ));

    let key_fetch = wire.next_interest().await;
    assert_eq!(key_fetch.name.to_uri(), "/very/deep/key/name");
}

#[tokio::test(start_paused = true)]
async fn wrong_fetched_key_delivers_bad() {
    let (face, mut wire) = mock_face(true);
    let (sink, mut events) = channel_sink();
    let signer = SigningKey::generate(&mut OsRng);
    let imposter = SigningKey::generate(&mut OsRng);

    face.express_interest(name("/app"), sink, None).unwrap();
    wire.next_interest().await;

    wire.inject_data(&signed_data(
        "/app/x",
        &signer,
        KeyLocator::KeyName(name("/keys/signer")),
    ));
    wire.next_interest().await;

    // the fetched "key" belongs to someone else
    wire.inject_data(&digest_data_with_content("/keys/signer", key_payload(&imposter)));

    assert!(matches!(
        events.recv().await.unwrap(),
        SinkEvent::ContentBad(_)
    ));
    // failed verification must not seed the cache
    assert_eq!(face.metrics().key_cache_size.value(), 0);
}

#[tokio::test(start_paused = true)]
async fn key_fetch_timeout_delivers_nothing() {
    let (face, mut wire) = mock_face(true);
    let (sink, mut events) = channel_sink();
    let signer = SigningKey::generate(&mut OsRng);

    face.express_interest(name("/app"), sink, None).unwrap();
    wire.next_interest().await;

    wire.inject_data(&signed_data(
        "/app/x",
        &signer,
        KeyLocator::KeyName(name("/keys/signer")),
    ));
    wire.next_interest().await;

    // no key ever arrives; the original request receives no delivery
    assert_no_event(&mut events, 6000).await;
    assert_eq!(face.metrics().interests_timed_out.value(), 1);
}

#[tokio::test(start_paused = true)]
async fn self_certifying_data_needs_no_fetch() {
    let (face, mut wire) = mock_face(true);
    let (sink, mut events) = channel_sink();
    let signer = SigningKey::generate(&mut OsRng);

    face.express_interest(name("/keys/me"), sink, None).unwrap();
    wire.next_interest().await;

    // locator name is a prefix of the data name: the packet carries its key
    let mut data = Data::new(name("/keys/me/KEY"), key_payload(&signer))
        .with_key_locator(KeyLocator::KeyName(name("/keys/me")));
    data.sign(&signer);
    wire.inject_data(&data);

    assert!(matches!(events.recv().await.unwrap(), SinkEvent::Content(_)));
    wire.assert_quiet(100).await;
    assert_eq!(face.metrics().key_fetches.value(), 0);
}

#[tokio::test(start_paused = true)]
async fn inline_key_verdict_is_honest() {
    let (face, mut wire) = mock_face(true);
    let signer = SigningKey::generate(&mut OsRng);
    let imposter = SigningKey::generate(&mut OsRng);

    // good inline key
    let (sink, mut events) = channel_sink();
    face.express_interest(name("/good"), sink, None).unwrap();
    wire.next_interest().await;
    wire.inject_data(&signed_data(
        "/good/1",
        &signer,
        KeyLocator::Key(key_payload(&signer)),
    ));
    assert!(matches!(events.recv().await.unwrap(), SinkEvent::Content(_)));

    // inline key that does not match the signature is delivered as bad,
    // never as verified content
    let (sink, mut events) = channel_sink();
    face.express_interest(name("/bad"), sink, None).unwrap();
    wire.next_interest().await;
    wire.inject_data(&signed_data(
        "/bad/1",
        &signer,
        KeyLocator::Key(key_payload(&imposter)),
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        SinkEvent::ContentBad(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn witness_and_cert_are_rejected() {
    let (face, mut wire) = mock_face(true);
    let signer = SigningKey::generate(&mut OsRng);

    let (sink, mut events) = channel_sink();
    face.express_interest(name("/witnessed"), sink, None).unwrap();
    wire.next_interest().await;
    let mut data = signed_data("/witnessed/1", &signer, KeyLocator::Key(key_payload(&signer)));
    data.signature_info.witness = Some(Bytes::from_static(b"merkle"));
    wire.inject_data(&data);
    assert!(matches!(
        events.recv().await.unwrap(),
        SinkEvent::ContentBad(_)
    ));

    let (sink, mut events) = channel_sink();
    face.express_interest(name("/certified"), sink, None).unwrap();
    wire.next_interest().await;
    wire.inject_data(&signed_data(
        "/certified/1",
        &signer,
        KeyLocator::Cert(Bytes::from_static(b"x509")),
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        SinkEvent::ContentBad(_)
    ));
}

/// Integrity-signed Data with explicit binary content.
fn digest_data_with_content(uri: &str, content: Bytes) -> Data {
    let mut data = Data::new(name(uri), content);
    data.sign_digest();
    data
}
