//! Sampler settings and the per-endpoint filtering of which knobs are sent.

use serde::{Deserialize, Serialize};
use tutr_llm::RequestBuilder;

/// One sampler knob. API templates list the knobs their endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerField {
    Temperature,
    MaxTokens,
    TopP,
    TopK,
    MinP,
    RepetitionPenalty,
    Seed,
    Stop,
}

impl SamplerField {
    pub const ALL: [SamplerField; 8] = [
        SamplerField::Temperature,
        SamplerField::MaxTokens,
        SamplerField::TopP,
        SamplerField::TopK,
        SamplerField::MinP,
        SamplerField::RepetitionPenalty,
        SamplerField::Seed,
        SamplerField::Stop,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Generated length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl SamplerConfig {
    /// A copy that keeps only the knobs listed in `accepted`.
    pub fn restricted_to(&self, accepted: &[SamplerField]) -> SamplerConfig {
        let keep = |field| accepted.contains(&field);
        SamplerConfig {
            temperature: self.temperature.filter(|_| keep(SamplerField::Temperature)),
            max_tokens: self.max_tokens.filter(|_| keep(SamplerField::MaxTokens)),
            top_p: self.top_p.filter(|_| keep(SamplerField::TopP)),
            top_k: self.top_k.filter(|_| keep(SamplerField::TopK)),
            min_p: self.min_p.filter(|_| keep(SamplerField::MinP)),
            repetition_penalty: self
                .repetition_penalty
                .filter(|_| keep(SamplerField::RepetitionPenalty)),
            seed: self.seed.filter(|_| keep(SamplerField::Seed)),
            stop: if keep(SamplerField::Stop) {
                self.stop.clone()
            } else {
                Vec::new()
            },
        }
    }

    /// Copy every set knob onto `req`.
    pub fn apply(&self, req: &mut RequestBuilder) {
        if let Some(t) = self.temperature {
            req.temperature(t);
        }
        if let Some(n) = self.max_tokens {
            req.max_tokens(n);
        }
        if let Some(p) = self.top_p {
            req.top_p(p);
        }
        if let Some(k) = self.top_k {
            req.top_k(k);
        }
        if let Some(p) = self.min_p {
            req.min_p(p);
        }
        if let Some(penalty) = self.repetition_penalty {
            req.repetition_penalty(penalty);
        }
        if let Some(seed) = self.seed {
            req.seed(seed);
        }
        if !self.stop.is_empty() {
            req.stop(self.stop.clone());
        }
    }
}

/// A named, saved sampler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerPreset {
    pub name: String,
    #[serde(flatten)]
    pub config: SamplerConfig,
}

impl SamplerPreset {
    /// Settings used when no preset is configured.
    pub fn study_plan() -> Self {
        Self {
            name: "Default".into(),
            config: SamplerConfig {
                temperature: Some(0.7),
                max_tokens: Some(1024),
                top_p: Some(0.9),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutr_llm::GenerateRequest;

    fn full() -> SamplerConfig {
        SamplerConfig {
            temperature: Some(0.5),
            max_tokens: Some(200),
            top_p: Some(0.9),
            top_k: Some(40),
            min_p: Some(0.05),
            repetition_penalty: Some(1.1),
            seed: Some(7),
            stop: vec!["###".into()],
        }
    }

    #[test]
    fn restriction_drops_unaccepted_knobs() {
        let restricted =
            full().restricted_to(&[SamplerField::Temperature, SamplerField::MaxTokens]);
        assert_eq!(
            restricted,
            SamplerConfig {
                temperature: Some(0.5),
                max_tokens: Some(200),
                ..Default::default()
            }
        );
        assert_eq!(full().restricted_to(&SamplerField::ALL), full());
    }

    #[test]
    fn apply_sets_request_options() {
        let mut req = tutr_llm::request();
        full().apply(&mut req);
        let request = GenerateRequest::from(req);
        assert_eq!(request.options.temperature, Some(0.5));
        assert_eq!(request.options.top_k, Some(40));
        assert_eq!(request.options.seed, Some(7));
        assert_eq!(request.options.stop, Some(vec!["###".to_string()]));
    }

    #[test]
    fn preset_flattens_into_a_table() {
        let preset: SamplerPreset =
            serde_json::from_str(r#"{"name":"Creativo","temperature":1.2}"#).unwrap();
        assert_eq!(preset.name, "Creativo");
        assert_eq!(preset.config.temperature, Some(1.2));
        assert!(preset.config.stop.is_empty());
    }
}
