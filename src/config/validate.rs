use anyhow::{bail, Result};

use super::CdkDeployConfig;

pub fn validate(config: &CdkDeployConfig) -> Result<()> {
    if config.deploy.command.trim().is_empty() {
        bail!("deploy.command cannot be empty");
    }

    if config.deploy.working_dir.as_os_str().is_empty() {
        bail!("deploy.working_dir cannot be empty");
    }

    if config.exports.path.as_os_str().is_empty() {
        bail!("exports.path cannot be empty");
    }

    let stages = [
        ("dev", &config.stages.dev),
        ("staging", &config.stages.staging),
        ("prod", &config.stages.prod),
    ];

    for (stage, stack) in stages {
        if stack.is_empty() {
            bail!("stages.{} cannot be empty", stage);
        }
        if stack.chars().any(char::is_whitespace) {
            bail!(
                "stages.{} has invalid stack name '{}'. Stack names cannot contain whitespace",
                stage,
                stack
            );
        }
    }

    Ok(())
}
