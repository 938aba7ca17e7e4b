use anyhow::{Context, Result};

use engine_app::app::App;
use engine_app::config::AppConfig;

fn main() -> Result<()> {
    let path = AppConfig::config_path();
    let config = AppConfig::load_from(&path).context("loading configuration")?;
    tracing_subscriber::fmt()
        .with_max_level(config.logging.level.filter())
        .init();
    tracing::info!(path = %path.display(), "vr_shell starting");

    if !path.exists() {
        config.save_to(&path)?;
    }

    let mut app = App::new(config)?;
    app.run();
    let leaked = app.shutdown();
    anyhow::ensure!(leaked == 0, "{leaked} GPU objects leaked");
    Ok(())
}
