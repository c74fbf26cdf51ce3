//! Choose between the on-device model and a remote endpoint.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tutr_llm::{LanguageModel, Message, Response};

use crate::error::{Error, Result};
use crate::profile::{ApiTemplate, ConnectionProfile};
use crate::sampler::SamplerConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendMode::Local => "local",
            BackendMode::Remote => "remote",
        })
    }
}

/// Everything selection depends on, handed over at construction.
#[derive(Debug, Clone, Default)]
pub struct BackendConfig {
    pub mode: BackendMode,
    /// The active sampler preset.
    pub sampler: SamplerConfig,
    pub active_profile: Option<String>,
    pub profiles: Vec<ConnectionProfile>,
    pub templates: Vec<ApiTemplate>,
}

/// Builds a remote model for a profile and its template.
///
/// Implemented for any matching closure, so callers can plug in whatever
/// HTTP client crate they use.
pub trait RemoteFactory: Send + Sync {
    fn connect(&self, profile: &ConnectionProfile, template: &ApiTemplate)
    -> Result<LanguageModel>;
}

impl<F> RemoteFactory for F
where
    F: Fn(&ConnectionProfile, &ApiTemplate) -> Result<LanguageModel> + Send + Sync,
{
    fn connect(
        &self,
        profile: &ConnectionProfile,
        template: &ApiTemplate,
    ) -> Result<LanguageModel> {
        self(profile, template)
    }
}

pub struct BackendSelector {
    config: BackendConfig,
    local: Option<Arc<LanguageModel>>,
    remote: Option<Box<dyn RemoteFactory>>,
}

impl BackendSelector {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            local: None,
            remote: None,
        }
    }

    /// Make an already-loaded on-device model available.
    pub fn with_local_model(mut self, model: LanguageModel) -> Self {
        self.local = Some(Arc::new(model));
        self
    }

    pub fn with_remote_factory(mut self, factory: impl RemoteFactory + 'static) -> Self {
        self.remote = Some(Box::new(factory));
        self
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Resolve the backend for the configured mode.
    pub fn select(&self) -> Result<BackendHandle> {
        self.select_mode(self.config.mode)
    }

    pub fn select_mode(&self, mode: BackendMode) -> Result<BackendHandle> {
        let handle = match mode {
            BackendMode::Local => self.select_local()?,
            BackendMode::Remote => self.select_remote()?,
        };
        tracing::debug!(%mode, model = handle.model.model_id(), "backend selected");
        Ok(handle)
    }

    fn select_local(&self) -> Result<BackendHandle> {
        let model = self
            .local
            .clone()
            .ok_or_else(|| Error::NoActiveBackend("no local model is loaded".into()))?;
        Ok(BackendHandle {
            mode: BackendMode::Local,
            model,
            sampler: self.config.sampler.clone(),
        })
    }

    fn select_remote(&self) -> Result<BackendHandle> {
        let name = self
            .config
            .active_profile
            .as_deref()
            .ok_or_else(|| Error::NoActiveBackend("no connection profile is active".into()))?;
        let profile = self
            .config
            .profiles
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| {
                Error::NoActiveBackend(format!("connection profile \"{name}\" does not exist"))
            })?;
        let template = self
            .config
            .templates
            .iter()
            .find(|t| t.name == profile.config_name)
            .ok_or_else(|| Error::ConfigurationNotFound(profile.config_name.clone()))?;
        let factory = self
            .remote
            .as_deref()
            .ok_or_else(|| Error::NoActiveBackend("remote backends are unavailable".into()))?;

        let model = factory.connect(profile, template)?;
        Ok(BackendHandle {
            mode: BackendMode::Remote,
            model: Arc::new(model),
            sampler: self.config.sampler.restricted_to(&template.sampler_fields),
        })
    }
}

/// A resolved backend plus the sampler settings it accepts.
#[derive(Debug, Clone)]
pub struct BackendHandle {
    mode: BackendMode,
    model: Arc<LanguageModel>,
    sampler: SamplerConfig,
}

impl BackendHandle {
    pub fn mode(&self) -> BackendMode {
        self.mode
    }

    pub fn model(&self) -> &LanguageModel {
        &self.model
    }

    pub fn sampler(&self) -> &SamplerConfig {
        &self.sampler
    }

    pub fn stream_completion(&self, messages: Vec<Message>) -> Response {
        let mut req = tutr_llm::request();
        req.messages(messages);
        self.sampler.apply(&mut req);
        self.model.generate(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tutr_llm::stream::{FinishReason, StreamEvent};
    use tutr_llm::{GenerateRequest, LanguageModelBackend};

    use crate::sampler::SamplerField;

    #[derive(Clone, Default)]
    struct Recorder {
        id: &'static str,
        seen: Arc<Mutex<Vec<GenerateRequest>>>,
    }

    impl LanguageModelBackend for Recorder {
        fn model_id(&self) -> &str {
            self.id
        }

        fn provider(&self) -> &str {
            "test"
        }

        fn generate(&self, request: GenerateRequest) -> Response {
            self.seen.lock().unwrap().push(request);
            Response::new(futures::stream::iter(vec![Ok(StreamEvent::Finish {
                reason: FinishReason::Stop,
                usage: None,
            })]))
        }
    }

    fn profile(config_name: &str) -> ConnectionProfile {
        ConnectionProfile {
            name: "Casa".into(),
            config_name: config_name.into(),
            endpoint: "http://localhost:1234/v1".into(),
            model: "remote-model".into(),
            api_key: None,
            api_key_env: None,
        }
    }

    fn template(fields: Vec<SamplerField>) -> ApiTemplate {
        ApiTemplate {
            name: "Custom".into(),
            format: Default::default(),
            path: None,
            sampler_fields: fields,
            headers: Default::default(),
        }
    }

    fn remote_config() -> BackendConfig {
        BackendConfig {
            mode: BackendMode::Remote,
            sampler: SamplerConfig {
                temperature: Some(0.3),
                top_k: Some(20),
                ..Default::default()
            },
            active_profile: Some("Casa".into()),
            profiles: vec![profile("Custom")],
            templates: vec![template(vec![SamplerField::Temperature])],
        }
    }

    fn factory(recorder: Recorder) -> impl RemoteFactory {
        move |profile: &ConnectionProfile, _template: &ApiTemplate| -> Result<LanguageModel> {
            assert_eq!(profile.model, "remote-model");
            Ok(LanguageModel::new(recorder.clone()))
        }
    }

    #[test]
    fn local_without_a_model_is_not_active() {
        let selector = BackendSelector::new(BackendConfig::default());
        assert!(matches!(selector.select(), Err(Error::NoActiveBackend(_))));
    }

    #[tokio::test]
    async fn local_uses_the_injected_model_and_full_sampler() {
        let recorder = Recorder {
            id: "tiny",
            ..Default::default()
        };
        let config = BackendConfig {
            sampler: SamplerConfig {
                top_k: Some(20),
                ..Default::default()
            },
            ..Default::default()
        };
        let selector =
            BackendSelector::new(config).with_local_model(LanguageModel::new(recorder.clone()));

        let handle = selector.select().unwrap();
        assert_eq!(handle.mode(), BackendMode::Local);
        assert_eq!(handle.model().model_id(), "tiny");

        handle
            .stream_completion(vec![Message::user("hola")])
            .into_result()
            .await
            .unwrap();
        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].messages, vec![Message::user("hola")]);
        assert_eq!(seen[0].options.top_k, Some(20));
    }

    #[tokio::test]
    async fn remote_sends_only_template_accepted_knobs() {
        let recorder = Recorder {
            id: "remote-model",
            ..Default::default()
        };
        let selector =
            BackendSelector::new(remote_config()).with_remote_factory(factory(recorder.clone()));

        let handle = selector.select().unwrap();
        assert_eq!(handle.mode(), BackendMode::Remote);
        handle
            .stream_completion(vec![Message::user("x")])
            .into_result()
            .await
            .unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].options.temperature, Some(0.3));
        assert_eq!(seen[0].options.top_k, None);
    }

    #[test]
    fn remote_without_active_profile_is_not_active() {
        let config = BackendConfig {
            active_profile: None,
            ..remote_config()
        };
        let selector =
            BackendSelector::new(config).with_remote_factory(factory(Recorder::default()));
        assert!(matches!(selector.select(), Err(Error::NoActiveBackend(_))));

        let config = BackendConfig {
            active_profile: Some("Oficina".into()),
            ..remote_config()
        };
        let selector =
            BackendSelector::new(config).with_remote_factory(factory(Recorder::default()));
        assert!(matches!(
            selector.select(),
            Err(Error::NoActiveBackend(msg)) if msg.contains("Oficina")
        ));
    }

    #[test]
    fn remote_with_unknown_template_names_it() {
        let config = BackendConfig {
            profiles: vec![profile("Desaparecido")],
            ..remote_config()
        };
        let selector =
            BackendSelector::new(config).with_remote_factory(factory(Recorder::default()));
        let err = selector.select().unwrap_err();
        assert!(matches!(err, Error::ConfigurationNotFound(ref name) if name == "Desaparecido"));
        assert_eq!(err.to_string(), "configuration \"Desaparecido\" not found");
    }

    #[test]
    fn explicit_mode_overrides_the_configured_one() {
        let selector = BackendSelector::new(remote_config())
            .with_local_model(LanguageModel::new(Recorder::default()));
        assert_eq!(
            selector.select_mode(BackendMode::Local).unwrap().mode(),
            BackendMode::Local
        );
        // No factory installed.
        assert!(matches!(selector.select(), Err(Error::NoActiveBackend(_))));
    }
}
