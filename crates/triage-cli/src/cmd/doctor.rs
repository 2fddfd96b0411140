use crate::output::{print_json, print_table};
use std::path::Path;
use triage_core::platform::{detect_platform, missing_required, verify_tools};

pub fn run(root: &Path, config: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let cfg = super::load_config(root, config)?;
    let platform = detect_platform(root);
    let tools = verify_tools(&cfg);

    if json {
        print_json(&serde_json::json!({
            "platform": platform,
            "tools": tools,
        }))?;
    } else {
        println!("os:      {} ({})", platform.os, platform.arch);
        println!("ci:      {}", platform.ci.as_deref().unwrap_or("none"));
        println!(
            "git:     {}",
            match (platform.git_repo, &platform.remote_host) {
                (true, Some(host)) => format!("repository, remote on {host}"),
                (true, None) => "repository, no remote".to_string(),
                (false, _) => "not a repository".to_string(),
            }
        );
        println!();

        let rows = tools
            .iter()
            .map(|t| {
                vec![
                    t.name.clone(),
                    if t.required { "yes" } else { "no" }.to_string(),
                    t.path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "missing".to_string()),
                    match &t.note {
                        Some(note) => format!("{} ({note})", t.purpose),
                        None => t.purpose.clone(),
                    },
                ]
            })
            .collect();
        print_table(&["TOOL", "REQUIRED", "PATH", "PURPOSE"], rows);
    }

    let missing = missing_required(&tools);
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|t| t.name.as_str()).collect();
        anyhow::bail!("missing required tools: {}", names.join(", "));
    }
    Ok(())
}
