use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use pushsync_core::Config;
use pushsync_serve::{ServeConfig, SignaturePolicy};
use pushsync_sync::PushOrchestrator;
use pushsync_tracker::RallyClient;
use tracing::info;

pub fn execute(config_path: &Path, bind: &str, port: u16) -> anyhow::Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!(?config, "configuration loaded");

    let tracker = Arc::new(RallyClient::from_config(&config)?);
    let orchestrator = PushOrchestrator::from_config(tracker, &config);
    let signatures = SignaturePolicy::new(&config.secret_token, config.signature_required);
    let serve = ServeConfig {
        bind: bind.to_string(),
        port,
    };
    tokio::runtime::Runtime::new()?.block_on(pushsync_serve::serve(orchestrator, signatures, serve))
}
