//! Server-sent-event decoding and chunk accumulation for streamed completions.

use std::collections::HashMap;

use crate::ProviderError;

use super::serde_api::{OpenAiApiDeltaToolCall, OpenAiApiStreamResponse, parse_finish_reason};
use super::types::{
    OpenAiAssistantMessage, OpenAiFinishReason, OpenAiResponse, OpenAiStreamChunk, OpenAiToolCall,
    OpenAiUsage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SsePayload {
    Data(String),
    Done,
}

/// Splits a byte stream into `data:` payloads.
///
/// Bytes are buffered until a full line arrives, so multi-byte characters split
/// across network chunks decode correctly.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<Vec<SsePayload>, ProviderError> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline_index) = self.buffer.iter().position(|byte| *byte == b'\n') {
            let line = self.buffer.drain(..=newline_index).collect::<Vec<_>>();
            let line = std::str::from_utf8(&line)
                .map_err(|err| ProviderError::transport(err.to_string()))?
                .trim();

            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };

            let payload = payload.trim();
            if payload == "[DONE]" {
                payloads.push(SsePayload::Done);
                break;
            }

            if !payload.is_empty() {
                payloads.push(SsePayload::Data(payload.to_string()));
            }
        }

        Ok(payloads)
    }
}

/// Folds stream deltas into the final assistant message.
#[derive(Debug)]
pub(crate) struct StreamAccumulator {
    model: Option<String>,
    fallback_model: String,
    content: String,
    tool_calls: Vec<OpenAiToolCall>,
    by_index: HashMap<u32, usize>,
    last_call: Option<usize>,
    finish_reason: OpenAiFinishReason,
    usage: OpenAiUsage,
}

impl StreamAccumulator {
    pub(crate) fn new(fallback_model: impl Into<String>) -> Self {
        Self {
            model: None,
            fallback_model: fallback_model.into(),
            content: String::new(),
            tool_calls: Vec::new(),
            by_index: HashMap::new(),
            last_call: None,
            finish_reason: OpenAiFinishReason::Other,
            usage: OpenAiUsage::default(),
        }
    }

    pub(crate) fn apply(&mut self, payload: &str) -> Result<Vec<OpenAiStreamChunk>, ProviderError> {
        let parsed: OpenAiApiStreamResponse = serde_json::from_str(payload)
            .map_err(|err| ProviderError::transport(format!("malformed stream chunk: {err}")))?;

        if self.model.is_none() {
            self.model = parsed.model;
        }

        if let Some(usage) = parsed.usage {
            self.usage = usage.into();
        }

        let mut chunks = Vec::new();
        let Some(choice) = parsed.choices.into_iter().next() else {
            return Ok(chunks);
        };

        if let Some(delta_content) = choice.delta.content
            && !delta_content.is_empty()
        {
            self.content.push_str(&delta_content);
            chunks.push(OpenAiStreamChunk::TextDelta(delta_content));
        }

        for delta_call in choice.delta.tool_calls.unwrap_or_default() {
            let slot = self.slot_for(&delta_call);
            self.last_call = Some(slot);
            let entry = &mut self.tool_calls[slot];

            if let Some(id) = delta_call.id {
                entry.id = id;
            }

            if let Some(function) = delta_call.function {
                if let Some(name) = function.name {
                    entry.name = name;
                }

                if let Some(arguments) = function.arguments {
                    entry.arguments.push_str(&arguments);
                }
            }

            chunks.push(OpenAiStreamChunk::ToolCallDelta(entry.clone()));
        }

        if choice.finish_reason.is_some() {
            self.finish_reason = parse_finish_reason(choice.finish_reason.as_deref());
        }

        Ok(chunks)
    }

    /// Position of the call a delta belongs to.
    ///
    /// Deltas carrying an `index` are keyed by it. Without one, a known id
    /// selects its call, a new id opens a call, and a delta with neither
    /// continues the call touched last.
    fn slot_for(&mut self, delta: &OpenAiApiDeltaToolCall) -> usize {
        if let Some(index) = delta.index {
            if let Some(slot) = self.by_index.get(&index) {
                return *slot;
            }
            let slot = self.open_call(format!("tool_call_{index}"));
            self.by_index.insert(index, slot);
            return slot;
        }

        match delta.id.as_deref() {
            Some(id) => match self.tool_calls.iter().position(|call| call.id == id) {
                Some(slot) => slot,
                None => self.open_call(id.to_string()),
            },
            None => match self.last_call {
                Some(slot) => slot,
                None => {
                    let placeholder = format!("tool_call_{}", self.tool_calls.len());
                    self.open_call(placeholder)
                }
            },
        }
    }

    fn open_call(&mut self, id: String) -> usize {
        self.tool_calls.push(OpenAiToolCall {
            id,
            name: String::new(),
            arguments: String::new(),
        });
        self.tool_calls.len() - 1
    }

    /// Terminal chunks: the assembled message followed by the response.
    pub(crate) fn finish(self) -> [OpenAiStreamChunk; 2] {
        let message = OpenAiAssistantMessage {
            content: self.content,
            tool_calls: self.tool_calls,
        };
        // Some backends report "stop" even when tool calls were streamed.
        let finish_reason = if !message.tool_calls.is_empty()
            && self.finish_reason != OpenAiFinishReason::Length
        {
            OpenAiFinishReason::ToolCalls
        } else {
            self.finish_reason
        };

        [
            OpenAiStreamChunk::MessageComplete(message.clone()),
            OpenAiStreamChunk::ResponseComplete(OpenAiResponse {
                model: self.model.unwrap_or(self.fallback_model),
                message,
                finish_reason,
                usage: self.usage,
            }),
        ]
    }
}
