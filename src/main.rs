use batchcsv::config::{Args, Config};
use batchcsv::error::Error;
use batchcsv::pipeline::Pipeline;
use batchcsv::{report, source};
use clap::Parser;
use std::io;
use std::process::ExitCode;
use tokio::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            let mut cause = std::error::Error::source(&err);
            while let Some(source) = cause {
                error!("caused by: {source}");
                cause = source.source();
            }
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let start = Instant::now();

    // ─── 2) validate configuration ───────────────────────────────────
    let config = Config::from_args(args)?;
    debug!(?config, "configuration");

    // ─── 3) discover input files ─────────────────────────────────────
    let files = source::discover(&config.loc)?;
    info!(loc = %config.loc.display(), files = files.len(), "starting run");

    // ─── 4) match + aggregate ────────────────────────────────────────
    let max = config.max;
    let outcome = Pipeline::new(config)?.run(&files).await?;
    info!(
        files = outcome.files,
        rows = outcome.rows,
        matched = outcome.matched,
        elapsed = ?start.elapsed(),
        "run complete"
    );

    // ─── 5) report ───────────────────────────────────────────────────
    let stdout = io::stdout();
    report::render(
        &mut stdout.lock(),
        outcome.aggregator.as_ref(),
        &outcome.header,
        max,
    )?;
    Ok(())
}
