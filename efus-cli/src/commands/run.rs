use super::demo;
use anyhow::{Context, Result};
use efus_core::{EfusConfig, Namespace};
use std::path::Path;

/// Evaluate `path` with the demo widgets and print the component tree
pub fn run_file(config_path: &Path, path: &Path, render: bool) -> Result<()> {
    let config =
        EfusConfig::load_or_default(config_path).context("Failed to load configuration")?;
    let namespace = Namespace::with_config(&config);
    demo::install(&namespace);

    let root = efus_core::run_file(path, Some(namespace))
        .with_context(|| format!("Failed to evaluate {}", path.display()))?;
    let Some(root) = root else {
        println!("(no components)");
        return Ok(());
    };

    if render {
        let handle = root.render().context("Failed to render component tree")?;
        tracing::debug!(%handle, "rendered");
    }
    print!("{}", root.outline());
    Ok(())
}
