use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::cli::Stage;
use crate::config::Project;
use crate::exports;
use crate::output;
use crate::runner;

pub async fn run(stage: Stage, cwd: &Path) -> Result<()> {
    let project = Project::discover(cwd)?;
    let stack = project.config.stack_name(stage);
    let command = project.config.deploy_command(stage);
    let working_dir = project.working_dir();

    output::deploy_header(stage, stack);
    info!("project root: {}", project.root.display());
    output::detail(&format!("in {}", working_dir.display()));

    let transcript = runner::capture(&command, &working_dir)
        .await
        .with_context(|| format!("Deploy of stack '{}' failed", stack))?;

    let outputs = exports::parse(&transcript);
    if outputs.is_empty() {
        output::warning("No stack outputs found in the deploy output");
    }

    let exports_path = project.exports_path();
    exports::write(&exports_path, &outputs)?;

    output::success(&format!(
        "Wrote {} output(s) to {}",
        outputs.len(),
        exports_path.display()
    ));
    Ok(())
}
