use super::EvalArgs;
use crate::output::print_json;
use anyhow::Context;
use std::path::Path;
use triage_core::pipeline;
use triage_core::present::render_text;

pub fn run(
    root: &Path,
    config: Option<&Path>,
    top: Option<usize>,
    eval: &EvalArgs,
    json: bool,
) -> anyhow::Result<()> {
    let cfg = super::load_config(root, config)?;
    if top == Some(0) {
        anyhow::bail!("--top must be at least 1");
    }
    let options = pipeline::RunOptions {
        top,
        ..eval.options()
    };
    let report = pipeline::run(&cfg, root, &options).context("recommendation failed")?;

    if json {
        print_json(&report)
    } else {
        print!("{}", render_text(&report));
        Ok(())
    }
}
