//! Censys certificate search source.
//!
//! Queries the v2 Search API with HTTP Basic auth taken from the
//! `CENSYS_API_ID`/`CENSYS_API_SECRET` environment. Absent credentials are a
//! diagnostic, not a failure.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::pipeline::sink::SinkHandle;
use crate::records::cert::CertRecord;
use crate::sources::{unless_cancelled, Source};

const SEARCH_URL: &str = "https://search.censys.io/api/v2/certificates/search";

pub struct Censys {
    client: Client,
}

impl Censys {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Source for Censys {
    fn name(&self) -> &'static str {
        "censys"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> Result<()> {
        let (id, secret) = match (
            std::env::var("CENSYS_API_ID"),
            std::env::var("CENSYS_API_SECRET"),
        ) {
            (Ok(id), Ok(secret)) if !id.is_empty() && !secret.is_empty() => (id, secret),
            _ => {
                tracing::info!("censys credentials not set, skipping");
                out.send("meta: censys credentials not set (CENSYS_API_ID / CENSYS_API_SECRET), skipping")
                    .await;
                return Ok(());
            }
        };

        let request = self
            .client
            .get(SEARCH_URL)
            .query(&[("q", format!("names: {target}").as_str()), ("per_page", "100")])
            .basic_auth(&id, Some(&secret))
            .send();
        let resp = match unless_cancelled(&cancel, request).await {
            Some(resp) => resp?,
            None => anyhow::bail!("cancelled"),
        };
        if !resp.status().is_success() {
            out.send(format!("meta: censys returned HTTP {}", resp.status()))
                .await;
            return Ok(());
        }
        let body: Value = match unless_cancelled(&cancel, resp.json()).await {
            Some(body) => body?,
            None => anyhow::bail!("cancelled"),
        };

        let hits = body
            .pointer("/result/hits")
            .and_then(|h| h.as_array())
            .cloned()
            .unwrap_or_default();
        let mut certs = 0usize;
        for hit in &hits {
            let names: Vec<String> = hit
                .get("names")
                .and_then(|n| n.as_array())
                .map(|arr| {
                    arr.iter()
                        .filter_map(|n| n.as_str())
                        .map(|n| n.to_string())
                        .collect()
                })
                .unwrap_or_default();
            for name in &names {
                out.send(name.clone()).await;
            }

            let parsed = hit.get("parsed").cloned().unwrap_or(Value::Null);
            let mut rec = CertRecord {
                source: "censys".into(),
                dns_names: names,
                fingerprint_sha256: str_at(hit, "/fingerprint_sha256"),
                issuer: str_at(&parsed, "/issuer_dn"),
                subject: str_at(&parsed, "/subject_dn"),
                serial: str_at(&parsed, "/serial_number"),
                not_before: str_at(&parsed, "/validity_period/not_before"),
                not_after: str_at(&parsed, "/validity_period/not_after"),
                ..Default::default()
            };
            rec.normalize();
            if let Ok(json) = rec.canonical_json() {
                out.send(format!("cert: {json}")).await;
                certs += 1;
            }
        }
        tracing::info!(hits = hits.len(), certs, "censys ingested");
        Ok(())
    }
}

fn str_at(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}
