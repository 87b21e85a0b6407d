//! Entry point: load configuration, initialize logging, run the session to
//! completion or shutdown signal (§6.7 exit-code contract).

use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use voice_bridge::config::AppConfig;
use voice_bridge::platform::fake::FakePlatform;
use voice_bridge::platform::VoicePlatform;
use voice_bridge::session::Session;

fn init_logging() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match AppConfig::load() {
        Ok(cfg) => cfg,
        // `--help`/`--version` print and exit 0; a genuine parse failure
        // (e.g. a missing required env var) prints clap's usage message
        // and exits non-zero. Either way this never returns.
        Err(e) => e.exit(),
    };

    // The voice-platform client is an external collaborator (§1, out of
    // scope): a real deployment swaps this for a client implementing
    // `VoicePlatform` against its voice-chat SDK. `FakePlatform` keeps this
    // binary runnable standalone for local exercise of the pipeline.
    let platform: Arc<dyn VoicePlatform> = Arc::new(FakePlatform::new());

    let session = Session::new(config, platform);
    match session.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "session exited with error");
            ExitCode::FAILURE
        }
    }
}
