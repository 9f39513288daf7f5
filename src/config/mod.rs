use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::Stage;

mod validate;

pub const CONFIG_FILE: &str = "cdkdeploy.toml";
pub const CONFIG_ENV: &str = "CDKDEPLOY_CONFIG";

#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CdkDeployConfig {
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub exports: ExportsConfig,
    #[serde(default)]
    pub stages: StagesConfig,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            working_dir: default_working_dir(),
        }
    }
}

fn default_command() -> String {
    "cdk deploy {stage} --require-approval never".to_string()
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("backend")
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExportsConfig {
    #[serde(default = "default_exports_path")]
    pub path: PathBuf,
}

impl Default for ExportsConfig {
    fn default() -> Self {
        Self {
            path: default_exports_path(),
        }
    }
}

fn default_exports_path() -> PathBuf {
    PathBuf::from("app/aws-exports.json")
}

/// CDK stack names per stage.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StagesConfig {
    #[serde(default = "default_dev")]
    pub dev: String,
    #[serde(default = "default_staging")]
    pub staging: String,
    #[serde(default = "default_prod")]
    pub prod: String,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            dev: default_dev(),
            staging: default_staging(),
            prod: default_prod(),
        }
    }
}

fn default_dev() -> String {
    "dev".to_string()
}
fn default_staging() -> String {
    "staging".to_string()
}
fn default_prod() -> String {
    "prod".to_string()
}

/// Configuration together with the directory its relative paths resolve against.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub config: CdkDeployConfig,
}

impl CdkDeployConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        validate::validate(&config)?;

        Ok(config)
    }

    pub fn stack_name(&self, stage: Stage) -> &str {
        match stage {
            Stage::Dev => &self.stages.dev,
            Stage::Staging => &self.stages.staging,
            Stage::Prod => &self.stages.prod,
        }
    }

    /// The deploy command with `{stage}` filled in.
    pub fn deploy_command(&self, stage: Stage) -> String {
        self.deploy.command.replace("{stage}", self.stack_name(stage))
    }
}

impl Project {
    /// Find the config file from the environment or the current directory.
    ///
    /// Without a file the built-in defaults apply, rooted at `cwd`.
    pub fn discover(cwd: &Path) -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            let path = cwd.join(path);
            if !path.is_file() {
                bail!(
                    "{} points to {}, which does not exist",
                    CONFIG_ENV,
                    path.display()
                );
            }
            return Self::from_file(&path);
        }

        let path = cwd.join(CONFIG_FILE);
        if path.is_file() {
            return Self::from_file(&path);
        }

        debug!("no {} found, using defaults", CONFIG_FILE);
        Ok(Self {
            root: cwd.to_path_buf(),
            config: CdkDeployConfig::default(),
        })
    }

    fn from_file(path: &Path) -> Result<Self> {
        debug!("loading config from {}", path.display());
        let config = CdkDeployConfig::load(path)?;
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(Self { root, config })
    }

    pub fn working_dir(&self) -> PathBuf {
        self.root.join(&self.config.deploy.working_dir)
    }

    pub fn exports_path(&self) -> PathBuf {
        self.root.join(&self.config.exports.path)
    }
}
