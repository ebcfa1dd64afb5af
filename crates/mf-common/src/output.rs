//! Output format specification for the CLI surface.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How CLI results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Compact single-line JSON, for piping into other tools.
    Json,
    /// Pretty-printed JSON with indentation.
    Pretty,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Json
    }
}
