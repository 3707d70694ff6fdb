use anyhow::Context;
use monfront_core::config::{Config, WarnLevel};
use std::path::Path;

pub fn run(path: &Path, port: Option<u16>, bind: Option<String>) -> anyhow::Result<()> {
    let mut config = Config::load(path).context("failed to load config")?;
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => anyhow::bail!("invalid config: {}", w.message),
        }
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    let bind = config.server.bind.clone();
    let port = config.server.port;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(monfront_server::serve(config, &bind, port))
}
