use std::io::Read;
use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

use slotguard::config::Config;
use slotguard::dump;

/// Audit a dump of stored reservations for overlaps.
///
/// Usage: `slotguard <rows.json | ->`. Conflicting pairs go to stdout as JSON
/// lines; exit status is 1 when any are found.
#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    slotguard::observability::init(config.metrics_port)?;

    let source = std::env::args().nth(1).unwrap_or_else(|| "-".into());
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&source)?
    };
    info!("auditing {source} (default offset {})", config.default_offset);

    let report = dump::audit_dump(&raw, &config.default_offset)?;
    dump::write_pairs(&report.pairs, &mut std::io::stdout().lock())?;

    Ok(if report.has_conflicts() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
