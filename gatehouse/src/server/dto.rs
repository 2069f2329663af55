//! Wire shapes of the chat request body.

use std::collections::BTreeMap;

use gchat::{DesignScheme, FileMap, SupabaseConnection, SupabaseCredentials};
use gprovider::{Message, Role};
use serde::Deserialize;

use super::error::ApiError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<MessagePayload>,

    #[serde(default)]
    pub files: Option<BTreeMap<String, FileEntry>>,

    #[serde(default)]
    pub prompt_id: Option<String>,

    #[serde(default)]
    pub context_optimization: bool,

    #[serde(default)]
    pub chat_mode: Option<String>,

    #[serde(default)]
    pub design_scheme: Option<DesignSchemePayload>,

    #[serde(default, alias = "supabaseConnectionInfo")]
    pub supabase: Option<SupabasePayload>,

    #[serde(default, rename = "maxLLMSteps")]
    pub max_llm_steps: Option<i64>,
}

impl ChatRequest {
    pub fn to_messages(&self) -> Result<Vec<Message>, ApiError> {
        self.messages.iter().map(MessagePayload::to_message).collect()
    }

    /// Text files only; folders and binary entries carry no content.
    pub fn file_map(&self) -> FileMap {
        self.files
            .iter()
            .flatten()
            .filter_map(|(path, entry)| entry.text().map(|text| (path.clone(), text.to_string())))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    pub role: String,

    #[serde(default)]
    pub content: Option<MessageContent>,
}

impl MessagePayload {
    fn to_message(&self) -> Result<Message, ApiError> {
        let role = Role::parse(&self.role)
            .ok_or_else(|| ApiError::bad_request(format!("unsupported message role '{}'", self.role)))?;
        let content = self
            .content
            .as_ref()
            .map(MessageContent::flatten)
            .unwrap_or_default();
        Ok(Message::new(role, content))
    }
}

/// Either a plain string or a list of typed parts.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Joins the text parts; images and other parts are skipped.
    pub fn flatten(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter(|part| part.kind == "text")
                .filter_map(|part| part.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FileEntry {
    Text(String),
    Node {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default, rename = "isBinary")]
        is_binary: bool,
    },
}

impl FileEntry {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Node {
                kind,
                content,
                is_binary,
            } => (kind == "file" && !is_binary)
                .then_some(content.as_deref())
                .flatten(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DesignSchemePayload {
    #[serde(default)]
    pub palette: BTreeMap<String, String>,

    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub font: Vec<String>,
}

impl From<DesignSchemePayload> for DesignScheme {
    fn from(payload: DesignSchemePayload) -> Self {
        DesignScheme {
            palette: payload.palette,
            features: payload.features,
            font: payload.font,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupabasePayload {
    #[serde(default)]
    pub is_connected: bool,

    #[serde(default)]
    pub has_selected_project: bool,

    #[serde(default)]
    pub credentials: Option<SupabaseCredentialsPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupabaseCredentialsPayload {
    #[serde(default)]
    pub anon_key: Option<String>,

    #[serde(default)]
    pub supabase_url: Option<String>,
}

impl From<SupabasePayload> for SupabaseConnection {
    fn from(payload: SupabasePayload) -> Self {
        SupabaseConnection {
            is_connected: payload.is_connected,
            has_selected_project: payload.has_selected_project,
            credentials: payload.credentials.map(|credentials| SupabaseCredentials {
                anon_key: credentials.anon_key,
                supabase_url: credentials.supabase_url,
            }),
        }
    }
}
