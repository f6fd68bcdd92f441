//! crt.sh certificate transparency source.
//!
//! One JSON query per run; every certificate entry contributes its names as
//! bare-domain lines plus a `cert:` record keyed on issuer+serial.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::pipeline::sink::SinkHandle;
use crate::records::cert::CertRecord;
use crate::sources::{unless_cancelled, Source};

pub struct CrtSh {
    client: Client,
}

impl CrtSh {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    issuer_name: Option<String>,
    common_name: Option<String>,
    name_value: Option<String>,
    serial_number: Option<String>,
    not_before: Option<String>,
    not_after: Option<String>,
}

#[async_trait]
impl Source for CrtSh {
    fn name(&self) -> &'static str {
        "crtsh"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> Result<()> {
        let query = format!("%.{target}");
        let url = format!(
            "https://crt.sh/?q={}&output=json",
            urlencoding::encode(&query)
        );

        let resp = match unless_cancelled(&cancel, self.client.get(&url).send()).await {
            Some(resp) => resp?,
            None => anyhow::bail!("cancelled"),
        };
        if !resp.status().is_success() {
            out.send(format!("meta: crt.sh returned HTTP {}", resp.status()))
                .await;
            return Ok(());
        }
        let body = match unless_cancelled(&cancel, resp.text()).await {
            Some(body) => body?,
            None => anyhow::bail!("cancelled"),
        };

        // crt.sh sometimes answers non-JSON under load; treat that as transient
        let entries: Vec<CrtShEntry> = match serde_json::from_str(&body) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "crt.sh sent malformed JSON");
                out.send("meta: crt.sh sent a malformed response").await;
                return Ok(());
            }
        };

        let mut certs = 0usize;
        for entry in &entries {
            let mut names = Vec::new();
            if let Some(cn) = &entry.common_name {
                names.push(cn.trim().to_string());
            }
            if let Some(nv) = &entry.name_value {
                // name_value packs multiple names separated by newlines
                names.extend(nv.split('\n').map(|n| n.trim().to_string()));
            }
            names.retain(|n| !n.is_empty());
            for name in &names {
                out.send(name.clone()).await;
            }

            let mut rec = CertRecord {
                source: "crt.sh".into(),
                common_name: entry.common_name.clone().unwrap_or_default(),
                dns_names: names,
                issuer: entry.issuer_name.clone().unwrap_or_default(),
                serial: entry.serial_number.clone().unwrap_or_default(),
                not_before: entry.not_before.clone().unwrap_or_default(),
                not_after: entry.not_after.clone().unwrap_or_default(),
                ..Default::default()
            };
            rec.normalize();
            if let Ok(json) = rec.canonical_json() {
                out.send(format!("cert: {json}")).await;
                certs += 1;
            }
        }
        tracing::info!(entries = entries.len(), certs, "crt.sh ingested");
        Ok(())
    }
}
