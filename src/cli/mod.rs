use clap::Parser;
use std::fmt;

pub mod deploy;

#[derive(Parser, Debug)]
#[command(
    name = "cdkdeploy",
    version,
    about = "Deploy the backend stack and write its outputs to aws-exports.json"
)]
pub struct Cli {
    /// Deploy the prod stack (CI/CD only)
    #[arg(long, conflicts_with = "staging")]
    pub prod: bool,

    /// Deploy the staging stack (CI/CD only)
    #[arg(long)]
    pub staging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dev,
    Staging,
    Prod,
}

impl Cli {
    pub fn stage(&self) -> Stage {
        if self.prod {
            Stage::Prod
        } else if self.staging {
            Stage::Staging
        } else {
            Stage::Dev
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Dev => "dev",
            Stage::Staging => "staging",
            Stage::Prod => "prod",
        };
        f.write_str(name)
    }
}
