use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Run settings. Every field may be left out of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identifier of the target document
    pub document_id: String,
    /// Paragraph text marking where the report is inserted
    pub anchor: String,
    /// Topic name that ends the questionnaire
    pub end_marker: String,
    /// Fixed report date; empty means today
    pub report_date: String,
    /// `strftime` format used when the date is taken from the clock
    pub date_format: String,
    /// Run the refinement pass before composing
    pub ai_generation: bool,
    /// Delete the anchor text when the report is complete
    pub remove_anchor: bool,
    pub stage_order: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,
    pub delays: DelayConfig,
    pub labels: LabelConfig,
    pub refiner: RefinerConfig,
    pub prompts: PromptConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document_id: "report".to_string(),
            anchor: "DOC_INSERTION_POINT".to_string(),
            end_marker: "QUESTIONNAIRE_END_MARKER".to_string(),
            report_date: String::new(),
            date_format: "%Y-%m-%d".to_string(),
            ai_generation: false,
            remove_anchor: false,
            stage_order: ["Short term", "Mid term", "Long term", "Other"]
                .iter()
                .map(|stage| stage.to_string())
                .collect(),
            template_path: None,
            delays: DelayConfig::default(),
            labels: LabelConfig::default(),
            refiner: RefinerConfig::default(),
            prompts: PromptConfig::default(),
        }
    }
}

/// Pauses after remote calls, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    pub request_ms: u64,
    pub image_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            request_ms: 1000,
            image_ms: 5000,
        }
    }
}

/// Overrides for the fixed headings written into the report; unset labels
/// keep their built-in text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_maturity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_maturity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achieved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unachieved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_maturity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roadmap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub none: Option<String>,
}

/// External program used for refinement; it reads a prompt on stdin and
/// answers on stdout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub system_instructions: Vec<String>,
}

/// Overrides for the per-task refinement prompts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refine_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarize_conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarize_improvements: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summarize_suggestion: Option<String>,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the template path
        config.template_path = config
            .template_path
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/maturity-report");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Refinement needs both the switch and a program to run
    pub fn refinement_enabled(&self) -> bool {
        self.ai_generation && !self.refiner.program.trim().is_empty()
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/maturity-report/config.toml"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.delays.request_ms, 1000);
        assert_eq!(config.delays.image_ms, 5000);
        assert_eq!(config.stage_order.len(), 4);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config_content = r#"
document_id = "1AbCdEf"
ai_generation = true

[delays]
image_ms = 2500

[labels]
achieved = "Achieved"

[refiner]
program = "llm"
args = ["-m", "small"]
"#;

        let config: Config = toml::from_str(config_content).unwrap();

        assert_eq!(config.document_id, "1AbCdEf");
        assert_eq!(config.anchor, "DOC_INSERTION_POINT");
        assert_eq!(config.delays, DelayConfig { request_ms: 1000, image_ms: 2500 });
        assert_eq!(config.labels.achieved.as_deref(), Some("Achieved"));
        assert_eq!(config.labels.unachieved, None);
        assert_eq!(config.refiner.args, vec!["-m".to_string(), "small".to_string()]);
        assert!(config.refinement_enabled());
    }

    #[test]
    fn test_refinement_needs_a_program() {
        let config = Config {
            ai_generation: true,
            ..Config::default()
        };

        assert!(!config.refinement_enabled());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let original = Config {
            report_date: "2024-05-01".to_string(),
            template_path: Some(PathBuf::from("/tmp/template.txt")),
            labels: LabelConfig {
                roadmap: Some("Roadmap".to_string()),
                ..LabelConfig::default()
            },
            ..Config::default()
        };

        let toml_str = toml::to_string(&original).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test/path");
        let expanded = Config::expand_path(&path);

        assert!(expanded.is_some());
        let expanded = expanded.unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().contains("test/path"));
    }

    #[test]
    fn test_expand_path_with_absolute_path() {
        let path = PathBuf::from("/absolute/path");
        let expanded = Config::expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_load_invalid_toml_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "document_id = [").unwrap();

        let error = Config::load_from_path(&config_file).unwrap_err();

        assert!(matches!(error, ConfigError::ConfigParseError { .. }));
        assert!(error.to_string().contains("config.toml"));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let test_config = Config {
            document_id: "doc-42".to_string(),
            remove_anchor: true,
            ..Config::default()
        };

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }

    #[test]
    fn test_template_path_with_env_var_is_expanded_on_load() {
        unsafe {
            env::set_var("MATURITY_TEMPLATES", "/custom/templates");
        }
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(
            &config_file,
            "template_path = \"$MATURITY_TEMPLATES/assessment.txt\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(
            config.template_path,
            Some(PathBuf::from("/custom/templates/assessment.txt"))
        );

        unsafe {
            env::remove_var("MATURITY_TEMPLATES");
        }
    }
}
