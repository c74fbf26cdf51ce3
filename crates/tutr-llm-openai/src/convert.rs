//! Converts tutr-llm generic requests into the two OpenAI-compatible wire formats.

use tutr_llm::request::{GenerateRequest, Role};

use crate::WireFormat;
use crate::types::{
    ChatCompletionRequest, ChatMessage, InputContent, InputItem, InputRole, RequestBody,
    ResponsesRequest, StreamOptions,
};

pub fn to_request_body(format: WireFormat, model_id: &str, req: &GenerateRequest) -> RequestBody {
    match format {
        WireFormat::Responses => RequestBody::Responses(to_responses_request(model_id, req)),
        WireFormat::ChatCompletions => {
            RequestBody::ChatCompletions(to_chat_request(model_id, req))
        }
    }
}

pub fn to_responses_request(model_id: &str, req: &GenerateRequest) -> ResponsesRequest {
    // The Responses API takes system text as `instructions`; multiple system
    // messages are joined.
    let mut instructions: Vec<&str> = Vec::new();
    let mut input: Vec<InputItem> = Vec::new();

    for msg in &req.messages {
        match msg.role {
            Role::System => instructions.push(&msg.content),
            Role::User => input.push(InputItem::Message {
                role: InputRole::User,
                content: vec![InputContent::InputText {
                    text: msg.content.clone(),
                }],
            }),
            Role::Assistant => input.push(InputItem::Message {
                role: InputRole::Assistant,
                content: vec![InputContent::OutputText {
                    text: msg.content.clone(),
                }],
            }),
        }
    }

    ResponsesRequest {
        model: model_id.to_string(),
        input,
        stream: true,
        instructions: (!instructions.is_empty()).then(|| instructions.join("\n")),
        max_output_tokens: req.options.max_tokens,
        temperature: req.options.temperature,
        top_p: req.options.top_p,
    }
}

pub fn to_chat_request(model_id: &str, req: &GenerateRequest) -> ChatCompletionRequest {
    let messages = req
        .messages
        .iter()
        .map(|m| ChatMessage {
            role: m.role.as_str(),
            content: m.content.clone(),
        })
        .collect();

    let options = &req.options;
    ChatCompletionRequest {
        model: model_id.to_string(),
        messages,
        stream: true,
        stream_options: Some(StreamOptions {
            include_usage: true,
        }),
        max_tokens: options.max_tokens,
        temperature: options.temperature,
        top_p: options.top_p,
        top_k: options.top_k,
        min_p: options.min_p,
        repetition_penalty: options.repetition_penalty,
        seed: options.seed,
        stop: options.stop.clone().filter(|s| !s.is_empty()),
    }
}
