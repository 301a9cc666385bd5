use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use pushsync_core::Config;
use pushsync_sync::PushOrchestrator;
use pushsync_tracker::RallyClient;

pub fn execute(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    println!("config ok: {}", config_path.display());

    let client = RallyClient::from_config(&config)?;
    println!("tracker:   {}", client.api_root());

    let orchestrator = PushOrchestrator::from_config(Arc::new(client), &config);
    let workspace = tokio::runtime::Runtime::new()?
        .block_on(orchestrator.resolve_workspace())
        .with_context(|| format!("resolving workspace `{}`", config.workspace))?;
    println!("workspace: {} -> {workspace}", config.workspace);
    Ok(())
}
