//! RDAP registration-data source (RFC 7483).
//!
//! Looks the target up through the rdap.org bootstrap and flattens the
//! interesting parts of the response into `rdap: key=value` lines.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::pipeline::sink::SinkHandle;
use crate::sources::{unless_cancelled, Source};

pub struct Rdap {
    client: Client,
}

impl Rdap {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Source for Rdap {
    fn name(&self) -> &'static str {
        "rdap"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> Result<()> {
        let url = format!("https://rdap.org/domain/{target}");
        let request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/rdap+json")
            .send();
        let resp = match unless_cancelled(&cancel, request).await {
            Some(resp) => resp?,
            None => anyhow::bail!("cancelled"),
        };
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            out.send(format!("meta: rdap has no registration record for {target}"))
                .await;
            return Ok(());
        }
        if !resp.status().is_success() {
            out.send(format!("meta: rdap returned HTTP {}", resp.status()))
                .await;
            return Ok(());
        }
        let body: Value = match unless_cancelled(&cancel, resp.json()).await {
            Some(body) => body?,
            None => anyhow::bail!("cancelled"),
        };

        for line in flatten(&body) {
            out.send(format!("rdap: {line}")).await;
        }
        Ok(())
    }
}

/// Flatten an RDAP domain object into `key=value` entries.
fn flatten(body: &Value) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(handle) = body.get("handle").and_then(|v| v.as_str()) {
        lines.push(format!("handle={handle}"));
    }
    if let Some(name) = body.get("ldhName").and_then(|v| v.as_str()) {
        lines.push(format!("domain={}", name.to_ascii_lowercase()));
    }
    if let Some(status) = body.get("status").and_then(|v| v.as_array()) {
        let joined: Vec<&str> = status.iter().filter_map(|s| s.as_str()).collect();
        if !joined.is_empty() {
            lines.push(format!("status={}", joined.join(",")));
        }
    }
    if let Some(events) = body.get("events").and_then(|v| v.as_array()) {
        for event in events {
            let action = event.get("eventAction").and_then(|v| v.as_str());
            let date = event.get("eventDate").and_then(|v| v.as_str());
            if let (Some(action), Some(date)) = (action, date) {
                lines.push(format!("{}={date}", action.replace(' ', "-")));
            }
        }
    }
    if let Some(nameservers) = body.get("nameservers").and_then(|v| v.as_array()) {
        for ns in nameservers {
            if let Some(name) = ns.get("ldhName").and_then(|v| v.as_str()) {
                lines.push(format!("nameserver={}", name.to_ascii_lowercase()));
            }
        }
    }
    if let Some(entities) = body.get("entities").and_then(|v| v.as_array()) {
        for entity in entities {
            let roles: Vec<&str> = entity
                .get("roles")
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|r| r.as_str()).collect())
                .unwrap_or_default();
            if let Some(name) = vcard_fn(entity) {
                for role in roles {
                    lines.push(format!("{role}={name}"));
                }
            }
        }
    }
    lines
}

/// The `fn` (full name) item of an entity's jCard, when present.
fn vcard_fn(entity: &Value) -> Option<String> {
    let items = entity.get("vcardArray")?.get(1)?.as_array()?;
    for item in items {
        let parts = item.as_array()?;
        if parts.first()?.as_str()? == "fn" {
            return parts.get(3)?.as_str().map(|s| s.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_objects_flatten_to_key_value_lines() {
        let body: Value = serde_json::from_str(
            r#"{
                "handle": "EXAMPLE-1",
                "ldhName": "EXAMPLE.COM",
                "status": ["active", "client transfer prohibited"],
                "events": [
                    {"eventAction": "registration", "eventDate": "1995-08-14T04:00:00Z"},
                    {"eventAction": "last changed", "eventDate": "2023-08-14T07:01:31Z"}
                ],
                "nameservers": [
                    {"ldhName": "A.IANA-SERVERS.NET"},
                    {"ldhName": "B.IANA-SERVERS.NET"}
                ],
                "entities": [
                    {"roles": ["registrar"], "vcardArray": ["vcard", [["fn", {}, "text", "ICANN"]]]}
                ]
            }"#,
        )
        .unwrap();
        let lines = flatten(&body);
        assert!(lines.contains(&"handle=EXAMPLE-1".to_string()));
        assert!(lines.contains(&"domain=example.com".to_string()));
        assert!(lines.contains(&"status=active,client transfer prohibited".to_string()));
        assert!(lines.contains(&"registration=1995-08-14T04:00:00Z".to_string()));
        assert!(lines.contains(&"last-changed=2023-08-14T07:01:31Z".to_string()));
        assert!(lines.contains(&"nameserver=a.iana-servers.net".to_string()));
        assert!(lines.contains(&"registrar=ICANN".to_string()));
    }

    #[test]
    fn sparse_objects_flatten_to_nothing() {
        assert!(flatten(&serde_json::json!({})).is_empty());
    }
}
