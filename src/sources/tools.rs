//! Adapters over external CLI tools.
//!
//! Each adapter names a binary, its argument vector and a line mapping into
//! the sink grammar. The shared driver gates on PATH lookup, streams stdout
//! through a rendezvous channel (backpressure reaches the child pipe) and
//! turns a missing binary into a `meta:` diagnostic instead of a failure.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::external::runner::{self, RunError};
use crate::pipeline::sink::SinkHandle;
use crate::sources::Source;

pub(crate) async fn stream_tool<F>(
    cancel: &CancellationToken,
    bin: &str,
    args: &[&str],
    input: Option<&str>,
    out: &SinkHandle,
    map: F,
) -> anyhow::Result<()>
where
    F: Fn(&str) -> Vec<String>,
{
    let (tx, mut rx) = mpsc::channel::<String>(1);
    let run = runner::run_command(cancel, bin, args, input, tx);
    let forward = async {
        while let Some(line) = rx.recv().await {
            for mapped in map(&line) {
                out.send(mapped).await;
            }
        }
    };
    let (result, ()) = tokio::join!(run, forward);
    match result {
        Ok(()) => Ok(()),
        Err(RunError::MissingBinary(bin)) => {
            tracing::warn!(tool = %bin, "not installed, skipping");
            out.send(format!("meta: {bin} not installed, skipping")).await;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn forward_raw(line: &str) -> Vec<String> {
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }
    vec![line.to_string()]
}

/// ProjectDiscovery subfinder: passive subdomain enumeration.
pub struct Subfinder;

#[async_trait]
impl Source for Subfinder {
    fn name(&self) -> &'static str {
        "subfinder"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> anyhow::Result<()> {
        stream_tool(
            &cancel,
            "subfinder",
            &["-d", target, "-all", "-silent"],
            None,
            &out,
            forward_raw,
        )
        .await
    }
}

/// tomnomnom assetfinder: passive subdomain enumeration.
pub struct Assetfinder;

#[async_trait]
impl Source for Assetfinder {
    fn name(&self) -> &'static str {
        "assetfinder"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> anyhow::Result<()> {
        stream_tool(
            &cancel,
            "assetfinder",
            &["--subs-only", target],
            None,
            &out,
            forward_raw,
        )
        .await
    }
}

/// OWASP amass in passive mode.
pub struct Amass;

#[async_trait]
impl Source for Amass {
    fn name(&self) -> &'static str {
        "amass"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> anyhow::Result<()> {
        stream_tool(
            &cancel,
            "amass",
            &["enum", "-passive", "-d", target],
            None,
            &out,
            forward_raw,
        )
        .await
    }
}

/// gau: archived URLs from AlienVault/Wayback/Common Crawl.
pub struct Gau;

#[async_trait]
impl Source for Gau {
    fn name(&self) -> &'static str {
        "gau"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> anyhow::Result<()> {
        stream_tool(&cancel, "gau", &["--subs", target], None, &out, forward_raw).await
    }
}

/// waybackurls: archived URLs from the Wayback Machine.
pub struct Waybackurls;

#[async_trait]
impl Source for Waybackurls {
    fn name(&self) -> &'static str {
        "waybackurls"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> anyhow::Result<()> {
        stream_tool(&cancel, "waybackurls", &[target], None, &out, forward_raw).await
    }
}

/// subjs: fetches target pages and lists their script URLs. Active.
pub struct Subjs;

#[async_trait]
impl Source for Subjs {
    fn name(&self) -> &'static str {
        "subjs"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> anyhow::Result<()> {
        let seed = format!("https://{target}");
        stream_tool(&cancel, "subjs", &[], Some(&seed), &out, |line| {
            let line = line.trim();
            if line.is_empty() {
                return Vec::new();
            }
            vec![format!("active: js: {line}")]
        })
        .await
    }
}

/// linkfinderevo: walks target JavaScript and reports discovered endpoints.
/// Active.
pub struct LinkfinderEvo;

#[async_trait]
impl Source for LinkfinderEvo {
    fn name(&self) -> &'static str {
        "linkfinderevo"
    }

    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> anyhow::Result<()> {
        let seed = format!("https://{target}");
        stream_tool(
            &cancel,
            "linkfinderevo",
            &["-i", &seed, "-o", "cli"],
            None,
            &out,
            |line| {
                let line = line.trim();
                if line.is_empty() || !(line.contains('/') || line.contains('.')) {
                    return Vec::new();
                }
                if line.ends_with(".js") || line.ends_with(".mjs") {
                    vec![format!("active: js: {line}")]
                } else {
                    vec![format!("active: html: {line}")]
                }
            },
        )
        .await
    }
}
