//! dnsx adapter.
//!
//! Resolves the target with dnsx in JSON mode and re-emits each answer as a
//! canonical `dns:` record, one line per (host, type, value).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::pipeline::sink::SinkHandle;
use crate::records::dns::DnsRecord;
use crate::sources::tools::stream_tool;
use crate::sources::Source;

const ANSWER_KEYS: &[(&str, &str)] = &[
    ("a", "A"),
    ("aaaa", "AAAA"),
    ("cname", "CNAME"),
    ("mx", "MX"),
    ("ns", "NS"),
    ("txt", "TXT"),
];

pub struct Dnsx;

#[async_trait]
impl Source for Dnsx {
    fn name(&self) -> &'static str {
        "dnsx"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> anyhow::Result<()> {
        stream_tool(
            &cancel,
            "dnsx",
            &["-silent", "-a", "-aaaa", "-cname", "-ptr", "-resp", "-json"],
            Some(target),
            &out,
            json_to_records,
        )
        .await
    }
}

/// Re-encode one dnsx JSON result as `dns:` record lines. Non-JSON lines are
/// dropped.
pub fn json_to_records(line: &str) -> Vec<String> {
    let value: serde_json::Value = match serde_json::from_str(line.trim()) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let host = match value.get("host").and_then(|h| h.as_str()) {
        Some(h) if !h.trim().is_empty() => h.to_string(),
        _ => return Vec::new(),
    };

    let mut records = Vec::new();
    for &(key, rtype) in ANSWER_KEYS {
        if let Some(answers) = value.get(key).and_then(|v| v.as_array()) {
            for answer in answers.iter().filter_map(|a| a.as_str()) {
                push_record(&mut records, DnsRecord::new(&host, rtype, answer));
            }
        }
    }
    if let Some(pointers) = value.get("ptr").and_then(|v| v.as_array()) {
        let list: Vec<String> = pointers
            .iter()
            .filter_map(|p| p.as_str())
            .map(|p| p.to_string())
            .collect();
        for pointer in &list {
            let mut rec = DnsRecord::new(&host, "PTR", pointer);
            rec.ptr = Some(list.clone());
            rec.normalize();
            push_record(&mut records, rec);
        }
    }
    records
}

fn push_record(out: &mut Vec<String>, rec: DnsRecord) {
    if let Ok(json) = rec.canonical_json() {
        out.push(format!("active: dns: {json}"));
    }
}
