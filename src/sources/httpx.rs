//! httpx adapter.
//!
//! Probes the target over HTTP and expands every result line into the set of
//! grammar lines the sink consumes: the raw annotated route, a host-only
//! variant, an `html:` discovery when the content type says so, and one
//! `meta:` entry per bracket annotation.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::pipeline::normalize;
use crate::pipeline::sink::SinkHandle;
use crate::sources::tools::stream_tool;
use crate::sources::Source;

pub struct Httpx;

#[async_trait]
impl Source for Httpx {
    fn name(&self) -> &'static str {
        "httpx"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> anyhow::Result<()> {
        stream_tool(
            &cancel,
            "httpx",
            &["-silent", "-status-code", "-title", "-content-type", "-no-color"],
            Some(target),
            &out,
            expand_result_line,
        )
        .await
    }
}

/// Expand one httpx result line into grammar lines.
pub fn expand_result_line(line: &str) -> Vec<String> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    let base = normalize::first_token(line);
    let mut forwarded = vec![format!("active: {line}")];

    if let Some(host) = normalize::host_of(base) {
        if host != base {
            let rest = line[base.len()..].trim();
            if rest.is_empty() {
                forwarded.push(format!("active: {host}"));
            } else {
                forwarded.push(format!("active: {host} {rest}"));
            }
        }
    }

    let brackets = normalize::bracket_groups(line);
    if brackets.iter().any(|b| b.contains("text/html")) {
        forwarded.push(format!("active: html: {base}"));
    }
    for bracket in &brackets {
        forwarded.push(format!("active: meta: {bracket}"));
    }
    forwarded
}
