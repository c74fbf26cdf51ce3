use tutr_app::AppConfig;
use tutr_core::{ApiFormat, ApiTemplate, BackendMode, BackendSelector, ConnectionProfile, Error};
use tutr_llm::LanguageModel;
use tutr_llm_local::LlamaServerEngine;
use tutr_llm_openai::{OpenAIConfig, WireFormat};

/// Build the selector for `config`, with `mode` overriding the configured
/// backend when given.
pub fn selector(config: &AppConfig, mode: Option<BackendMode>) -> BackendSelector {
    let mut backend = config.backend_config();
    if let Some(mode) = mode {
        backend.mode = mode;
    }

    let local = &config.local;
    let engine = LlamaServerEngine::new(&local.endpoint);
    let model = tutr_llm_local::model(engine, local.instruct.clone(), &local.model);

    BackendSelector::new(backend)
        .with_local_model(model)
        .with_remote_factory(connect_remote)
}

fn connect_remote(
    profile: &ConnectionProfile,
    template: &ApiTemplate,
) -> tutr_core::Result<LanguageModel> {
    let api_key = match (profile.resolve_api_key(), &profile.api_key_env) {
        (Some(key), _) => key,
        (None, Some(var)) => {
            return Err(Error::NoActiveBackend(format!(
                "profile \"{}\" reads its API key from ${var}, which is not set",
                profile.name
            )));
        }
        (None, None) => String::new(),
    };

    let config = OpenAIConfig {
        api_key,
        base_url: profile.endpoint.clone(),
        format: wire_format(template.format),
        path: template.path.clone(),
        extra_headers: template
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    };
    tracing::debug!(
        profile = %profile.name,
        template = %template.name,
        url = %config.url(),
        "connecting remote backend"
    );
    Ok(tutr_llm_openai::model(config, &profile.model))
}

fn wire_format(format: ApiFormat) -> WireFormat {
    match format {
        ApiFormat::Responses => WireFormat::Responses,
        ApiFormat::ChatCompletions => WireFormat::ChatCompletions,
    }
}
