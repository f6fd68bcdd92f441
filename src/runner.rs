use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use recon_hunter::config;
use recon_hunter::external::runner::scoped_timeout;
use recon_hunter::pipeline::sink::Sink;
use recon_hunter::pipeline::writer::OpenMode;
use recon_hunter::sources;

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    // Configure logging from -v. Keep external crates (reqwest/hyper) at INFO
    // so debug runs don't drown in connection noise.
    use tracing_subscriber::EnvFilter;
    let crate_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter_str =
        format!("recon_hunter={crate_level},reqwest=info,hyper=info,h2=info");
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .init();

    // Normalize the provided target: if the user passed a full URL, recon
    // operates on the host.
    let target = if cli.target.starts_with("http://") || cli.target.starts_with("https://") {
        match url::Url::parse(&cli.target) {
            Ok(u) => u.host_str().map(|s| s.to_string()).unwrap_or(cli.target.clone()),
            Err(_) => cli.target.clone(),
        }
    } else {
        cli.target.clone()
    };

    let outdir = if cli.outdir.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(&cli.outdir)
    };
    recon_hunter::utils::ensure_dir(&outdir)?;

    // Sink construction is the only fatal failure point before sources start.
    let mut sink = Sink::new(&outdir, cli.active, Some(&target), OpenMode::Truncate)?;
    sink.start(cli.workers);

    let root = CancellationToken::new();
    {
        let interrupt = root.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, winding down");
                interrupt.cancel();
            }
        });
    }
    let deadline = scoped_timeout(&root, cli.timeout);

    let client = reqwest::Client::builder()
        .user_agent(concat!("recon-hunter/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()?;

    let names = resolve_tools(&cli);
    tracing::info!(
        target = %target,
        outdir = %outdir.display(),
        workers = cli.workers,
        active = cli.active,
        tools = %names.join(","),
        "starting run"
    );

    let control = sink.handle();
    control.send("meta: run started").await;

    let mut tasks = tokio::task::JoinSet::new();
    for name in names {
        let source = match sources::by_name(&name, &client) {
            Some(source) => source,
            None => {
                tracing::warn!(tool = %name, "unknown tool, skipping");
                control.send(format!("meta: unknown tool `{name}`, skipping")).await;
                continue;
            }
        };
        let out = sink.handle();
        let token = deadline.child_token();
        let target = target.clone();
        tasks.spawn(async move {
            let result = source.run(token, &target, out).await;
            (name, result)
        });
    }

    // Join every source; one failing source never cancels its siblings.
    let mut failures = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((name, Ok(()))) => tracing::debug!(source = %name, "source finished"),
            Ok((name, Err(e))) if deadline.is_cancelled() => {
                tracing::info!(source = %name, error = %e, "source stopped by cancellation");
            }
            Ok((name, Err(e))) => {
                failures += 1;
                tracing::warn!(source = %name, error = %e, "source failed");
                control.send(format!("meta: source {name} failed: {e}")).await;
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(error = %e, "source task panicked");
            }
        }
    }

    drop(control);
    root.cancel();

    let stats = sink.stats();
    sink.close().await?;

    tracing::info!(
        received = stats.received,
        written = stats.written,
        failures,
        "run complete"
    );
    println!(
        "\nRecon complete - {} lines ingested, {} records written",
        stats.received, stats.written
    );
    println!("Outputs written to: {}", outdir.display());
    Ok(())
}

/// The source list for this run: `--tools` verbatim when given, otherwise the
/// passive defaults plus the active set under `--active`.
fn resolve_tools(cli: &Cli) -> Vec<String> {
    let csv = cli.tools.clone().unwrap_or_else(|| {
        if cli.active {
            format!("{},{}", config::DEFAULT_TOOLS, config::ACTIVE_TOOLS)
        } else {
            config::DEFAULT_TOOLS.to_string()
        }
    });
    let mut names: Vec<String> = Vec::new();
    for name in csv.split(',') {
        let name = name.trim().to_ascii_lowercase();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
