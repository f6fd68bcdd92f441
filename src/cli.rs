use clap::Parser;

use recon_hunter::config;

#[derive(clap::Parser, Debug)]
#[command(
    author,
    version,
    about = "Recon Hunter - passive reconnaissance pipeline",
    long_about = None,
    after_help = "EXAMPLES:
  Passive run with the default source set:
    reconhunter example.com -o ./results

  Pick sources explicitly:
    reconhunter example.com --tools subfinder,crtsh,gau

  Include active probing (httpx, dnsx, subjs, linkfinderevo):
    reconhunter example.com --active -o ./results -vv

Censys credentials are read from CENSYS_API_ID / CENSYS_API_SECRET."
)]
pub struct Cli {
    /// Target domain (e.g. example.com); URLs are reduced to their host
    pub target: String,

    /// Output directory
    #[arg(short = 'o', long, default_value = ".")]
    pub outdir: String,

    /// Sink worker count
    #[arg(long, default_value_t = config::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Comma-separated source list [default: the passive set]
    #[arg(long)]
    pub tools: Option<String>,

    /// Run deadline in seconds (0 = default 120)
    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Enable active sources that touch the target
    #[arg(long)]
    pub active: bool,

    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
