//! Batch configuration loading and parsing

use anyhow::{bail, Context, Result};
use nwb_sweep_reader::ReaderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub reader: ReaderConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Directory for per-file reports (default: current directory)
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Txt,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Txt => "txt",
        }
    }
}

impl OutputConfig {
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    if config.input.files.is_empty() {
        bail!("Config file {:?} lists no input files", path);
    }
    if !config.reader.prestim_duration_s.is_finite() || config.reader.prestim_duration_s < 0.0 {
        bail!(
            "Config file {:?}: prestim_duration_s must be a non-negative number",
            path
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            files = ["cell_1.nwb", "cell_2.nwb"]

            [reader]
            prestim_duration_s = 0.5

            [output]
            format = "txt"
            output_dir = "reports"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.files.len(), 2);
        assert_eq!(config.reader.prestim_duration_s, 0.5);
        assert_eq!(config.reader.test_pulse_transitions, 4);
        assert_eq!(config.output.format, OutputFormat::Txt);
        assert_eq!(config.output.output_dir(), PathBuf::from("reports"));
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = toml::from_str("[input]\nfiles = [\"a.nwb\"]\n").unwrap();
        assert_eq!(config.reader, ReaderConfig::default());
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.output_dir(), PathBuf::from("."));
    }

    #[test]
    fn test_load_config_from_file() {
        let file = write_config("[input]\nfiles = [\"a.nwb\"]\n[output]\nformat = \"json\"\n");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.input.files, vec![PathBuf::from("a.nwb")]);
    }

    #[test]
    fn test_load_config_errors() {
        assert!(load_config(Path::new("/nonexistent/config.toml")).is_err());

        let file = write_config("[input]\nfiles = []\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("no input files"));

        let file = write_config("[input]\nfiles = [\"a.nwb\"]\n[output]\nformat = \"html\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));

        let file = write_config("[input]\nfiles = [\"a.nwb\"]\n[reader]\nprestim_duration_s = -1.0\n");
        assert!(load_config(file.path()).is_err());
    }
}
