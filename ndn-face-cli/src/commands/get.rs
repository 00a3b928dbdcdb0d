//! Interest expression command.

use anyhow::{Context, Result};
use log::info;
use ndn_face::{Delivery, Face, FaceOptions};
use ndn_face_common::ndn::{Interest, Name};
use serde_json::json;

pub async fn run(
    host: &str,
    port: u16,
    name_str: &str,
    timeout_ms: u32,
    no_verify: bool,
    json_out: bool,
) -> Result<()> {
    let name = Name::from_uri(name_str).context("invalid NDN name")?;

    let mut options = FaceOptions::for_host(host, port);
    options.verify = !no_verify;
    let face = Face::connect_tcp(options);

    info!("requesting {} from {}:{}", name, host, port);
    let interest = Interest::new(name).with_lifetime(timeout_ms);
    let delivery = face
        .fetch(interest)
        .await
        .context("interest was not satisfied")?;

    let (verdict, data) = match delivery {
        Delivery::Content(data) => ("verified", data),
        Delivery::ContentUnverified(data) => ("unverified", data),
        Delivery::ContentBad(data) => ("bad-signature", data),
    };

    if json_out {
        let report = json!({
            "name": data.name.to_uri(),
            "verdict": verdict,
            "content_type": data.meta_info.content_type,
            "freshness_ms": data.meta_info.freshness_period_ms,
            "content": String::from_utf8_lossy(&data.content),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Name:    {}", data.name.to_uri());
        println!("Verdict: {}", verdict);
        println!("{}", String::from_utf8_lossy(&data.content));
    }

    let _ = face.close().await;
    Ok(())
}
