//! Prefix registration and serving command.

use anyhow::{Context, Result};
use log::info;
use ndn_face::{Face, FaceEvent, FaceHandle, FaceOptions};
use ndn_face_common::ndn::{Data, Interest, Name};

pub async fn run(
    host: &str,
    port: u16,
    prefix_str: &str,
    content: String,
    freshness_ms: u64,
) -> Result<()> {
    let prefix = Name::from_uri(prefix_str).context("invalid NDN prefix")?;

    let mut face = Face::connect_tcp(FaceOptions::for_host(host, port));

    let payload = content.into_bytes();
    let handler = move |_face: &FaceHandle, _prefix: &Name, interest: &Interest| -> Option<Data> {
        info!("answering {}", interest.name);
        Some(Data::new(interest.name.clone(), payload.clone()).with_freshness(freshness_ms))
    };
    face.register_prefix(prefix.clone(), handler, 0)
        .context("cannot register prefix")?;

    println!("serving {} via {}:{} (ctrl-c to stop)", prefix, host, port);
    loop {
        tokio::select! {
            event = face.next_event() => match event {
                Some(FaceEvent::Closed) | None => {
                    println!("face closed");
                    break;
                }
                Some(event) => info!("face event: {:?}", event),
            },
            _ = tokio::signal::ctrl_c() => {
                println!("stopping");
                let _ = face.close().await;
                break;
            }
        }
    }

    Ok(())
}
