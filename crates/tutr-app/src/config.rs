use std::path::Path;

use serde::{Deserialize, Serialize};
use tutr_core::{
    ApiTemplate, BackendConfig, BackendMode, ConnectionProfile, DEFAULT_INSTRUCTIONS,
    SamplerConfig, SamplerPreset,
};
use tutr_llm_local::InstructFormat;
use tutr_llm_local::llama_server::DEFAULT_ENDPOINT;

use crate::{Error, Result, write_file};

/// Settings for the on-device model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub endpoint: String,
    /// Label reported for the loaded model.
    pub model: String,
    pub instruct: InstructFormat,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: "local".to_string(),
            instruct: InstructFormat::default(),
        }
    }
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: BackendMode,
    pub system_prompt: String,
    pub active_sampler: String,
    pub samplers: Vec<SamplerPreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_profile: Option<String>,
    pub profiles: Vec<ConnectionProfile>,
    /// Added to the built-in templates; a template with a built-in name
    /// replaces it.
    pub templates: Vec<ApiTemplate>,
    pub local: LocalConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let preset = SamplerPreset::study_plan();
        Self {
            mode: BackendMode::default(),
            system_prompt: DEFAULT_INSTRUCTIONS.to_string(),
            active_sampler: preset.name.clone(),
            samplers: vec![preset],
            active_profile: None,
            profiles: Vec::new(),
            templates: Vec::new(),
            local: LocalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::parse(&raw).map_err(|source| Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_file(path, &self.to_toml()?)
    }

    /// The active sampler preset's settings. An unknown name falls back to
    /// the built-in preset.
    pub fn sampler(&self) -> SamplerConfig {
        self.samplers
            .iter()
            .find(|p| p.name == self.active_sampler)
            .map(|p| p.config.clone())
            .unwrap_or_else(|| SamplerPreset::study_plan().config)
    }

    /// Built-in templates merged with the user's.
    pub fn templates(&self) -> Vec<ApiTemplate> {
        let mut templates = ApiTemplate::builtin();
        for custom in &self.templates {
            match templates.iter_mut().find(|t| t.name == custom.name) {
                Some(existing) => *existing = custom.clone(),
                None => templates.push(custom.clone()),
            }
        }
        templates
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            mode: self.mode,
            sampler: self.sampler(),
            active_profile: self.active_profile.clone(),
            profiles: self.profiles.clone(),
            templates: self.templates(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutr_core::{ApiFormat, SamplerField};

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.mode, BackendMode::Local);
        assert_eq!(config.system_prompt, DEFAULT_INSTRUCTIONS);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig {
            mode: BackendMode::Remote,
            active_profile: Some("Casa".into()),
            ..Default::default()
        };
        config.profiles.push(ConnectionProfile {
            name: "Casa".into(),
            config_name: "OpenAI".into(),
            endpoint: "https://api.openai.com/v1".into(),
            model: "gpt-4.1-mini".into(),
            api_key: None,
            api_key_env: Some("OPENAI_API_KEY".into()),
        });
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::parse(
            r#"
mode = "remote"
active_profile = "lab"

[[profiles]]
name = "lab"
config_name = "Mi servidor"
endpoint = "http://10.0.0.2:5000/v1"
model = "mistral"

[[templates]]
name = "Mi servidor"
format = "chat_completions"
sampler_fields = ["temperature"]
"#,
        )
        .unwrap();

        assert_eq!(config.mode, BackendMode::Remote);
        assert_eq!(config.local, LocalConfig::default());

        let backend = config.backend_config();
        let custom = backend
            .templates
            .iter()
            .find(|t| t.name == "Mi servidor")
            .unwrap();
        assert_eq!(custom.format, ApiFormat::ChatCompletions);
        assert_eq!(custom.sampler_fields, vec![SamplerField::Temperature]);
        assert_eq!(backend.sampler, SamplerPreset::study_plan().config);
    }

    #[test]
    fn custom_template_replaces_builtin_of_same_name() {
        let config = AppConfig {
            templates: vec![ApiTemplate {
                name: "OpenAI".into(),
                format: ApiFormat::ChatCompletions,
                path: Some("/v1/chat/completions".into()),
                sampler_fields: vec![],
                headers: Default::default(),
            }],
            ..Default::default()
        };
        let templates = config.templates();
        assert_eq!(templates.len(), ApiTemplate::builtin().len());
        let openai = templates.iter().find(|t| t.name == "OpenAI").unwrap();
        assert_eq!(openai.format, ApiFormat::ChatCompletions);
    }

    #[test]
    fn unknown_active_sampler_falls_back() {
        let config = AppConfig {
            active_sampler: "Inexistente".into(),
            samplers: vec![SamplerPreset {
                name: "Frío".into(),
                config: SamplerConfig {
                    temperature: Some(0.1),
                    ..Default::default()
                },
            }],
            ..Default::default()
        };
        assert_eq!(config.sampler(), SamplerPreset::study_plan().config);
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "mode = 3").unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigParse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }
}
