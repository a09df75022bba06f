use crate::charts::{default_visualizations_dir, DEFAULT_DPI};
use crate::data::{default_data_dir, default_tableau_dir};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Optional config file looked up in the crate root.
pub const CONFIG_FILE: &str = "analysis.json";

/// Input/output locations and chart resolution.
///
/// Every field is optional in the JSON file. Relative paths are resolved
/// against the directory holding the config file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data_dir: PathBuf,
    pub tableau_dir: PathBuf,
    pub visualizations_dir: PathBuf,
    pub dpi: u32,
    /// State-wise testing CSV, charted when present
    pub testing_csv: Option<PathBuf>,
    /// State-wise vaccination CSV, charted when present
    pub vaccination_csv: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tableau_dir: default_tableau_dir(),
            visualizations_dir: default_visualizations_dir(),
            dpi: DEFAULT_DPI,
            testing_csv: None,
            vaccination_csv: None,
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config: {:?}", path))?;
        let config: AnalysisConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolve_relative(base))
    }

    /// `analysis.json` from the crate root if it exists, defaults otherwise
    pub fn load_or_default() -> Result<Self> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(CONFIG_FILE);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn resolve_relative(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };

        self.data_dir = resolve(self.data_dir);
        self.tableau_dir = resolve(self.tableau_dir);
        self.visualizations_dir = resolve(self.visualizations_dir);
        self.testing_csv = self.testing_csv.map(resolve);
        self.vaccination_csv = self.vaccination_csv.map(resolve);
        self
    }
}
