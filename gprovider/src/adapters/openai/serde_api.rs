//! Chat-completions HTTP payload serde models and conversion helpers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProviderError;

use super::types::{
    OpenAiAssistantMessage, OpenAiFinishReason, OpenAiMessage, OpenAiRequest, OpenAiResponse,
    OpenAiRole, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};

pub(crate) fn build_api_request(request: OpenAiRequest) -> Result<OpenAiApiRequest, ProviderError> {
    let messages = request
        .messages
        .into_iter()
        .map(OpenAiApiMessage::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    if messages.is_empty() {
        return Err(ProviderError::invalid_request(
            "chat completion request requires at least one message",
        ));
    }

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .into_iter()
                .map(OpenAiApiTool::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        )
    };
    let tool_choice = tools
        .as_ref()
        .and(request.tool_choice)
        .map(|choice| choice.as_str().to_string());

    Ok(OpenAiApiRequest {
        model: request.model,
        messages,
        tools,
        tool_choice,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream: request.stream,
    })
}

pub(crate) fn parse_finish_reason(value: Option<&str>) -> OpenAiFinishReason {
    match value {
        Some("stop") | Some("end_turn") => OpenAiFinishReason::Stop,
        Some("length") => OpenAiFinishReason::Length,
        Some("tool_calls") | Some("function_call") => OpenAiFinishReason::ToolCalls,
        Some("cancelled") => OpenAiFinishReason::Cancelled,
        _ => OpenAiFinishReason::Other,
    }
}

/// Reads `{"error":{"message":..}}` or `{"error":"..."}` bodies.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<OpenAiApiErrorEnvelope>(body).ok()?;
    match parsed.error {
        OpenAiApiError::Detailed { message } => Some(message),
        OpenAiApiError::Plain(message) => Some(message),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiErrorEnvelope {
    pub error: OpenAiApiError,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OpenAiApiError {
    Detailed { message: String },
    Plain(String),
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiRequest {
    pub model: String,
    pub messages: Vec<OpenAiApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiMessage {
    pub role: String,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiApiOutgoingToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl TryFrom<OpenAiMessage> for OpenAiApiMessage {
    type Error = ProviderError;

    fn try_from(value: OpenAiMessage) -> Result<Self, Self::Error> {
        if value.role == OpenAiRole::Tool && value.tool_call_id.is_none() {
            return Err(ProviderError::invalid_request(
                "tool message requires a tool_call_id",
            ));
        }

        let has_tool_calls = !value.tool_calls.is_empty();
        if value.content.trim().is_empty()
            && matches!(value.role, OpenAiRole::System | OpenAiRole::User)
        {
            return Err(ProviderError::invalid_request(
                "message content must not be empty",
            ));
        }

        let content = if value.content.is_empty() && has_tool_calls {
            None
        } else {
            Some(value.content)
        };
        let tool_calls = has_tool_calls.then(|| {
            value
                .tool_calls
                .into_iter()
                .map(OpenAiApiOutgoingToolCall::from)
                .collect()
        });

        Ok(Self {
            role: value.role.as_str().to_string(),
            content,
            tool_calls,
            tool_call_id: value.tool_call_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiOutgoingToolCall {
    pub id: String,
    pub r#type: String,
    pub function: OpenAiApiToolFunction,
}

impl From<OpenAiToolCall> for OpenAiApiOutgoingToolCall {
    fn from(value: OpenAiToolCall) -> Self {
        Self {
            id: value.id,
            r#type: "function".to_string(),
            function: OpenAiApiToolFunction {
                name: value.name,
                arguments: value.arguments,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiTool {
    pub r#type: String,
    pub function: OpenAiApiFunction,
}

impl TryFrom<OpenAiTool> for OpenAiApiTool {
    type Error = ProviderError;

    fn try_from(value: OpenAiTool) -> Result<Self, Self::Error> {
        let parameters = serde_json::from_str::<Value>(&value.input_schema).map_err(|_| {
            ProviderError::invalid_request(format!(
                "tool '{}' schema must be valid JSON",
                value.name
            ))
        })?;

        Ok(Self {
            r#type: "function".to_string(),
            function: OpenAiApiFunction {
                name: value.name,
                description: value.description,
                parameters,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiResponse {
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<OpenAiApiChoice>,
    pub usage: Option<OpenAiApiUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiChoice {
    pub message: OpenAiApiAssistantMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiAssistantMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<OpenAiApiToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiToolCall {
    pub id: String,
    pub function: OpenAiApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct OpenAiApiToolFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiApiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl From<OpenAiApiUsage> for OpenAiUsage {
    fn from(value: OpenAiApiUsage) -> Self {
        Self {
            prompt_tokens: value.prompt_tokens,
            completion_tokens: value.completion_tokens,
            total_tokens: value.total_tokens,
        }
    }
}

impl OpenAiResponse {
    pub(crate) fn from_api(value: OpenAiApiResponse, requested_model: &str) -> Result<Self, ProviderError> {
        let choice = value.choices.into_iter().next().ok_or_else(|| {
            ProviderError::transport("chat completion response did not include choices")
        })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| OpenAiToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect::<Vec<_>>();

        Ok(Self {
            model: value
                .model
                .unwrap_or_else(|| requested_model.to_string()),
            message: OpenAiAssistantMessage {
                content: choice.message.content.unwrap_or_default(),
                tool_calls,
            },
            finish_reason: parse_finish_reason(choice.finish_reason.as_deref()),
            usage: value.usage.unwrap_or_default().into(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<OpenAiApiStreamChoice>,
    pub usage: Option<OpenAiApiUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamChoice {
    pub delta: OpenAiApiStreamDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiApiStreamDelta {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<OpenAiApiDeltaToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiDeltaToolCall {
    pub index: Option<u32>,
    pub id: Option<String>,
    pub function: Option<OpenAiApiDeltaToolFunction>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiDeltaToolFunction {
    pub name: Option<String>,
    pub arguments: Option<String>,
}
