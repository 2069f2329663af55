//! `[Model: …]` and `[Provider: …]` directives embedded in user messages.
//!
//! ```rust
//! use gchat::Directives;
//!
//! let (directives, text) = Directives::extract("[Model: gpt-4o]\n\n[Provider: OpenAI]\n\nhello");
//! assert_eq!(directives.model.as_deref(), Some("gpt-4o"));
//! assert_eq!(directives.provider.as_deref(), Some("OpenAI"));
//! assert_eq!(text, "hello");
//! ```

use gprovider::{Message, Role};

const MODEL_TAG: &str = "[Model:";
const PROVIDER_TAG: &str = "[Provider:";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Directives {
    pub model: Option<String>,
    pub provider: Option<String>,
}

impl Directives {
    /// Pulls every directive out of `text`, returning the values and the remaining text.
    /// When a tag repeats, the last occurrence wins.
    pub fn extract(text: &str) -> (Self, String) {
        let mut directives = Self::default();
        let mut remaining = text.to_string();

        if let Some(value) = strip_tag(&mut remaining, MODEL_TAG) {
            directives.model = Some(value);
        }
        if let Some(value) = strip_tag(&mut remaining, PROVIDER_TAG) {
            directives.provider = Some(value);
        }

        (directives, remaining.trim_start().to_string())
    }

    /// Strips directives from every user message; values come from the last user
    /// message that carries them.
    pub fn apply(messages: &mut [Message]) -> Self {
        let mut directives = Self::default();

        for message in messages.iter_mut().filter(|message| message.role == Role::User) {
            let (found, text) = Self::extract(&message.content);
            message.content = text;
            if found.model.is_some() {
                directives.model = found.model;
            }
            if found.provider.is_some() {
                directives.provider = found.provider;
            }
        }

        directives
    }
}

fn strip_tag(text: &mut String, tag: &str) -> Option<String> {
    let mut value = None;

    while let Some(start) = text.find(tag) {
        let Some(close) = text[start..].find(']') else {
            break;
        };
        let end = start + close;
        let inner = text[start + tag.len()..end].trim();
        if !inner.is_empty() {
            value = Some(inner.to_string());
        }

        let mut cut = end + 1;
        let rest = &text[cut..];
        cut += rest.len() - rest.trim_start_matches(['\r', '\n']).len();
        text.replace_range(start..cut, "");
    }

    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_are_stripped_from_all_user_messages() {
        let mut messages = vec![
            Message::new(Role::User, "[Model: llama3]\n\n[Provider: Groq]\n\nfirst"),
            Message::new(Role::Assistant, "[Model: ignored] reply"),
            Message::new(Role::User, "[Model: gpt-4o-mini]\n\nsecond"),
        ];

        let directives = Directives::apply(&mut messages);
        assert_eq!(directives.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(directives.provider.as_deref(), Some("Groq"));
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "[Model: ignored] reply");
        assert_eq!(messages[2].content, "second");
    }

    #[test]
    fn unterminated_and_empty_tags_leave_no_value() {
        let (directives, text) = Directives::extract("[Model: ]\n\nhi [Provider: Groq");
        assert_eq!(directives, Directives::default());
        assert_eq!(text, "hi [Provider: Groq");
    }
}
