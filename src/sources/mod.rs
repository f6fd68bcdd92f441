use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::pipeline::sink::SinkHandle;

pub mod censys;
pub mod crtsh;
pub mod dnsx;
pub mod httpx;
pub mod rdap;
pub mod tools;

/// A reconnaissance source: pushes grammar lines for `target` into the sink
/// until it finishes or the token is cancelled.
///
/// Sources never close the sink (the ingress is shared with siblings). A
/// missing external binary or missing credentials is not a failure: the
/// source records a `meta:` diagnostic and returns Ok.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(
        &self,
        cancel: CancellationToken,
        target: &str,
        out: SinkHandle,
    ) -> anyhow::Result<()>;
}

/// Race a future against cancellation. None means the token fired first.
pub(crate) async fn unless_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl std::future::Future<Output = T>,
) -> Option<T> {
    tokio::select! {
        _ = cancel.cancelled() => None,
        value = fut => Some(value),
    }
}

/// Look up a source adapter by its CLI name. HTTP-backed sources share the
/// injected client.
pub fn by_name(name: &str, client: &reqwest::Client) -> Option<Box<dyn Source>> {
    match name {
        "subfinder" => Some(Box::new(tools::Subfinder)),
        "assetfinder" => Some(Box::new(tools::Assetfinder)),
        "amass" => Some(Box::new(tools::Amass)),
        "gau" => Some(Box::new(tools::Gau)),
        "waybackurls" => Some(Box::new(tools::Waybackurls)),
        "subjs" => Some(Box::new(tools::Subjs)),
        "linkfinderevo" => Some(Box::new(tools::LinkfinderEvo)),
        "httpx" => Some(Box::new(httpx::Httpx)),
        "dnsx" => Some(Box::new(dnsx::Dnsx)),
        "crtsh" => Some(Box::new(crtsh::CrtSh::new(client.clone()))),
        "censys" => Some(Box::new(censys::Censys::new(client.clone()))),
        "rdap" => Some(Box::new(rdap::Rdap::new(client.clone()))),
        _ => None,
    }
}
