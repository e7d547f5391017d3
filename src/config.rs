//! Layered TOML configuration.
//!
//! Each field resolves independently: `{project_root}/.toon-metrics/config.toml`,
//! then the user-level `config.toml`, then the built-in default.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::codec::{Delimiter, EncodeOptions};
use crate::paths;

pub const PROJECT_DIR: &str = ".toon-metrics";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const DEFAULT_PRICE_PER_1K: f64 = 0.03;
pub const DEFAULT_RUNS_PER_MONTH: u32 = 100;
pub const DEFAULT_WORKFLOW: &str = "architecture-documentation";

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    pub price_per_1k: f64,
    pub runs_per_month: u32,
    /// Falls back to the project root's directory name at the call site.
    pub project: Option<String>,
    pub workflow: String,
    pub codec: EncodeOptions,
    pub history_path: Option<PathBuf>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            price_per_1k: DEFAULT_PRICE_PER_1K,
            runs_per_month: DEFAULT_RUNS_PER_MONTH,
            project: None,
            workflow: DEFAULT_WORKFLOW.to_owned(),
            codec: EncodeOptions::default(),
            history_path: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    pricing: PricingSection,
    #[serde(default)]
    run: RunSection,
    #[serde(default)]
    codec: CodecSection,
    #[serde(default)]
    history: HistorySection,
}

#[derive(Debug, Default, Deserialize)]
struct PricingSection {
    price_per_1k: Option<f64>,
    runs_per_month: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RunSection {
    project: Option<String>,
    workflow: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CodecSection {
    delimiter: Option<Delimiter>,
    indent: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct HistorySection {
    path: Option<PathBuf>,
}

/// A missing file is silently skipped; an unparsable one is skipped with a warning.
fn read_config(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => {
            tracing::debug!(path = %path.display(), "loaded config");
            Some(cfg)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
            None
        }
    }
}

impl MetricsConfig {
    /// Load config for `project_root` using the user-level config directory.
    pub fn load(project_root: Option<&Path>) -> Self {
        let global = paths::user_dir().map(|d| d.join(CONFIG_FILE_NAME));
        Self::load_from(project_root, global.as_deref())
    }

    /// Load config from explicit paths. Priority: project → global → default.
    pub fn load_from(project_root: Option<&Path>, global_config: Option<&Path>) -> Self {
        let project = project_root
            .and_then(|root| read_config(&root.join(PROJECT_DIR).join(CONFIG_FILE_NAME)))
            .unwrap_or_default();
        let global = global_config.and_then(read_config).unwrap_or_default();
        let defaults = Self::default();

        let indent = project
            .codec
            .indent
            .or(global.codec.indent)
            .filter(|&i| i > 0)
            .unwrap_or(defaults.codec.indent);

        Self {
            price_per_1k: project
                .pricing
                .price_per_1k
                .or(global.pricing.price_per_1k)
                .unwrap_or(defaults.price_per_1k),
            runs_per_month: project
                .pricing
                .runs_per_month
                .or(global.pricing.runs_per_month)
                .unwrap_or(defaults.runs_per_month),
            project: project.run.project.or(global.run.project),
            workflow: project
                .run
                .workflow
                .or(global.run.workflow)
                .unwrap_or(defaults.workflow),
            codec: EncodeOptions {
                delimiter: project
                    .codec
                    .delimiter
                    .or(global.codec.delimiter)
                    .unwrap_or(defaults.codec.delimiter),
                indent,
            },
            history_path: project.history.path.or(global.history.path),
        }
    }
}

/// Walk up from `dir` to find the nearest ancestor containing `.git` or `.toon-metrics/`.
/// Falls back to `dir` itself if neither is found.
pub fn project_root_for(dir: &Path) -> PathBuf {
    let mut current = dir.to_path_buf();
    loop {
        if current.join(".git").exists() || current.join(PROJECT_DIR).is_dir() {
            return current;
        }
        if !current.pop() {
            break;
        }
    }
    dir.to_path_buf()
}

/// Directory name of the project root, used when no project name is configured.
pub fn project_name_for(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
