use anyhow::Context;
use std::path::Path;
use triage_core::{config::Config, io, paths};

pub fn run(root: &Path, force: bool) -> anyhow::Result<()> {
    println!("Initializing triage in: {}", root.display());

    let config_path = paths::config_path(root);
    let cfg = Config::new();
    if force {
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  written: {}", paths::CONFIG_FILE);
    } else {
        let data = cfg.to_yaml().context("failed to serialize config")?;
        if io::write_if_missing(&config_path, data.as_bytes())
            .with_context(|| format!("failed to write {}", config_path.display()))?
        {
            println!("  created: {}", paths::CONFIG_FILE);
        } else {
            println!("  exists:  {}", paths::CONFIG_FILE);
        }
    }

    println!("\nEdit sources.primary to point at your tracker, then run 'triage recommend'.");
    Ok(())
}
