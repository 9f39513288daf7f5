//! Extraction of stack outputs from `cdk deploy` transcripts and rendering of the
//! `aws-exports.json` document the app reads at runtime.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

const OUTPUTS_MARKER: &str = "Outputs:";
const STACK_ARN_MARKER: &str = "Stack ARN:";

/// `<stack>.<key> = <value>`; the stack prefix is dropped.
static OUTPUT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+\.(.*) = (.*)$").expect("output line pattern is valid"));

/// Output key to value. Ordered by key so rendering is deterministic.
pub type Outputs = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    BeforeOutputs,
    InOutputs,
    AfterOutputs,
}

impl Section {
    fn advance(self, line: &str) -> Self {
        if line.starts_with(STACK_ARN_MARKER) {
            Section::AfterOutputs
        } else if line.starts_with(OUTPUTS_MARKER) && self == Section::BeforeOutputs {
            Section::InOutputs
        } else {
            self
        }
    }
}

/// Collect the key/value pairs printed between `Outputs:` and `Stack ARN:`.
///
/// Lines that don't look like an output are skipped. A key seen twice keeps its
/// last value.
pub fn parse(raw: &str) -> Outputs {
    let mut section = Section::BeforeOutputs;
    let mut outputs = Outputs::new();

    for line in raw.split('\n') {
        section = section.advance(line);
        if section != Section::InOutputs {
            continue;
        }

        if let Some(caps) = OUTPUT_LINE.captures(line) {
            debug!("output {} = {}", &caps[1], &caps[2]);
            outputs.insert(caps[1].to_string(), caps[2].to_string());
        }
    }

    outputs
}

/// Render outputs in the legacy `aws-exports.json` layout.
///
/// Keys and values are written verbatim; a quote or newline inside a value
/// produces invalid JSON. The app's loader depends on this exact byte layout.
pub fn format(outputs: &Outputs) -> String {
    let entries: Vec<String> = outputs
        .iter()
        .map(|(key, value)| format!("  \"{}\": \"{}\"", key, value))
        .collect();

    format!("{{\n{}\n}}", entries.join(",\n"))
}

/// Write the rendered outputs to `path`, replacing whatever was there.
pub fn write(path: &Path, outputs: &Outputs) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, format(outputs))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("wrote {} output(s) to {}", outputs.len(), path.display());
    Ok(())
}
