use serde::Deserialize;

pub const DEFAULT_WORKERS: usize = 6;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Passive sources enabled when `--tools` is not given.
pub const DEFAULT_TOOLS: &str = "subfinder,assetfinder,amass,gau,waybackurls,crtsh,censys,rdap";
/// Probing sources appended to the default set under `--active`.
pub const ACTIVE_TOOLS: &str = "httpx,dnsx,subjs,linkfinderevo";

#[allow(dead_code)]
#[derive(Debug, Deserialize)]
pub struct Config {
    pub workers: usize,
    pub timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}
