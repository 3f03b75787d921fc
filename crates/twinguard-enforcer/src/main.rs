//! twinguard-eval
//!
//! Loads the enforcer config (`TWINGUARD_CONFIG`, default `twinguard.yaml`)
//! and the policy it names, then answers one JSON request per stdin line
//! with one JSON response per stdout line.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use twinguard_enforcer::{app_state, config, eval};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.client_code().as_str(), "twinguard-eval failed");
        std::process::exit(1);
    }
}

async fn run() -> twinguard_core::Result<()> {
    let path = std::env::var("TWINGUARD_CONFIG").unwrap_or_else(|_| "twinguard.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let state = app_state::AppState::from_config(cfg)?;

    tracing::info!(
        config = %path,
        resource_types = ?state.cfg().enforcer.resource_types,
        policy_id = %state.enforcer().policy_id(),
        "twinguard-eval ready"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let io_err = |e: std::io::Error| twinguard_core::TwinGuardError::Internal(format!("io: {e}"));

    while let Some(line) = lines.next_line().await.map_err(io_err)? {
        if line.trim().is_empty() {
            continue;
        }
        let out = eval::evaluate_line(&state, &line);
        stdout
            .write_all(format!("{out}\n").as_bytes())
            .await
            .map_err(io_err)?;
    }
    stdout.flush().await.map_err(io_err)?;

    tracing::debug!(metrics = %state.metrics().render(), "final metrics");
    Ok(())
}
