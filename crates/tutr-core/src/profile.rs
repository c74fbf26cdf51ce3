//! Remote connection profiles and the API templates they point at.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sampler::SamplerField;

/// Wire shape of a remote endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiFormat {
    Responses,
    #[default]
    ChatCompletions,
}

/// How to talk to one family of remote endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTemplate {
    pub name: String,
    #[serde(default)]
    pub format: ApiFormat,
    /// Path appended to the profile endpoint. `None` uses the format's
    /// standard path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default = "all_sampler_fields")]
    pub sampler_fields: Vec<SamplerField>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

fn all_sampler_fields() -> Vec<SamplerField> {
    SamplerField::ALL.to_vec()
}

impl ApiTemplate {
    /// Templates available without any configuration.
    pub fn builtin() -> Vec<ApiTemplate> {
        vec![
            ApiTemplate {
                name: "OpenAI".into(),
                format: ApiFormat::Responses,
                path: None,
                sampler_fields: vec![
                    SamplerField::Temperature,
                    SamplerField::MaxTokens,
                    SamplerField::TopP,
                ],
                headers: BTreeMap::new(),
            },
            ApiTemplate {
                name: "Chat Completions".into(),
                format: ApiFormat::ChatCompletions,
                path: None,
                sampler_fields: vec![
                    SamplerField::Temperature,
                    SamplerField::MaxTokens,
                    SamplerField::TopP,
                    SamplerField::Seed,
                    SamplerField::Stop,
                ],
                headers: BTreeMap::new(),
            },
            ApiTemplate {
                name: "OpenRouter".into(),
                format: ApiFormat::ChatCompletions,
                path: None,
                sampler_fields: all_sampler_fields(),
                headers: BTreeMap::new(),
            },
        ]
    }
}

/// A saved remote connection: where to send requests and which template
/// shapes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub name: String,
    /// Name of the [`ApiTemplate`] this profile uses.
    pub config_name: String,
    pub endpoint: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable holding the key, used when `api_key` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl ConnectionProfile {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.api_key_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|key| !key.is_empty())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_defaults_accept_every_knob() {
        let template: ApiTemplate = serde_json::from_str(r#"{"name":"custom"}"#).unwrap();
        assert_eq!(template.format, ApiFormat::ChatCompletions);
        assert_eq!(template.sampler_fields, SamplerField::ALL.to_vec());
        assert!(template.path.is_none());
    }

    #[test]
    fn inline_key_wins_over_env() {
        let profile = ConnectionProfile {
            name: "p".into(),
            config_name: "OpenAI".into(),
            endpoint: "https://api.openai.com/v1".into(),
            model: "gpt-4.1-mini".into(),
            api_key: Some("sk-inline".into()),
            api_key_env: Some("TUTR_TEST_KEY_THAT_IS_NOT_SET".into()),
        };
        assert_eq!(profile.resolve_api_key().as_deref(), Some("sk-inline"));

        let from_env = ConnectionProfile {
            api_key: None,
            ..profile
        };
        assert_eq!(from_env.resolve_api_key(), None);
    }

    #[test]
    fn builtin_template_names_are_unique() {
        let templates = ApiTemplate::builtin();
        let mut names: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), templates.len());
    }
}
