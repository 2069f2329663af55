//! Summarizes history and selects the relevant file subset before a chat turn.
//!
//! Both steps soft-fail: [`ContextOptimizer::optimize`] never returns an error,
//! it reports a fallback and the turn proceeds unoptimized.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use gprovider::{Message, ModelProvider, ModelRequest, Role};

use crate::prompt::render_transcript;
use crate::{ChatError, FileMap};

const SUMMARY_INSTRUCTIONS: &str = "You compress software project conversations. Write a \
short synopsis of the conversation below: the user's goal, decisions made, files touched \
and open tasks. Reply with the synopsis inside <summary></summary> tags.";

const SELECTION_INSTRUCTIONS: &str = "You choose which project files are relevant to the \
user's latest request. Reply with one <includeFile path=\"...\"/> tag per relevant file, \
using paths exactly as listed. Do not invent paths.";

const INCLUDE_TAG: &str = "<includeFile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerSettings {
    pub summary_max_tokens: u32,
    pub selection_max_tokens: u32,
    pub timeout: Duration,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            summary_max_tokens: 1024,
            selection_max_tokens: 512,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Result of an optimization pass. `fell_back` marks a pass that failed and
/// left the turn with no summary and the full file set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptimizationOutcome {
    pub summary: Option<String>,
    pub files: Option<FileMap>,
    pub fell_back: bool,
}

impl OptimizationOutcome {
    pub fn skipped() -> Self {
        Self::default()
    }

    fn fallback() -> Self {
        Self {
            fell_back: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContextOptimizer {
    settings: OptimizerSettings,
}

impl ContextOptimizer {
    pub fn new(settings: OptimizerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> OptimizerSettings {
        self.settings
    }

    /// Runs summary then selection, recovering from any failure.
    pub async fn optimize(
        &self,
        provider: &dyn ModelProvider,
        model: &str,
        messages: &[Message],
        files: &FileMap,
    ) -> OptimizationOutcome {
        if files.is_empty() {
            return OptimizationOutcome::skipped();
        }

        let started = Instant::now();
        let summary = match self.summarize(provider, model, messages).await {
            Ok(summary) => summary,
            Err(error) => return log_fallback(&error, started),
        };

        match self
            .select_context(provider, model, messages, files, Some(&summary))
            .await
        {
            Ok(selected) => {
                tracing::debug!(
                    phase = "optimize",
                    selected = selected.len(),
                    total = files.len(),
                    summary_len = summary.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "context optimized"
                );
                OptimizationOutcome {
                    summary: Some(summary),
                    files: Some(selected),
                    fell_back: false,
                }
            }
            Err(error) => log_fallback(&error, started),
        }
    }

    pub async fn summarize(
        &self,
        provider: &dyn ModelProvider,
        model: &str,
        messages: &[Message],
    ) -> Result<String, ChatError> {
        let request = ModelRequest::new(
            model,
            vec![
                Message::new(Role::System, SUMMARY_INSTRUCTIONS),
                Message::new(Role::User, render_transcript(messages)),
            ],
        )
        .with_max_tokens(self.settings.summary_max_tokens);

        let reply = self.complete(provider, request, "summary").await?;
        parse_summary(&reply).ok_or_else(|| ChatError::context_optimization("summary reply was empty"))
    }

    /// Asks the model for relevant paths and keeps only those present in `files`.
    pub async fn select_context(
        &self,
        provider: &dyn ModelProvider,
        model: &str,
        messages: &[Message],
        files: &FileMap,
        summary: Option<&str>,
    ) -> Result<FileMap, ChatError> {
        if files.is_empty() {
            return Ok(FileMap::new());
        }

        let mut prompt = String::from("Project files:\n");
        for path in files.keys() {
            prompt.push_str(path);
            prompt.push('\n');
        }
        if let Some(summary) = summary {
            prompt.push_str("\nConversation summary:\n");
            prompt.push_str(summary);
            prompt.push('\n');
        }
        prompt.push_str("\nConversation:\n");
        prompt.push_str(&render_transcript(messages));

        let request = ModelRequest::new(
            model,
            vec![
                Message::new(Role::System, SELECTION_INSTRUCTIONS),
                Message::new(Role::User, prompt),
            ],
        )
        .with_max_tokens(self.settings.selection_max_tokens);

        let reply = self.complete(provider, request, "context selection").await?;
        let selected = parse_selection(&reply, files);
        if selected.is_empty() {
            return Err(ChatError::context_optimization(
                "context selection matched no project files",
            ));
        }

        Ok(selected)
    }

    async fn complete(
        &self,
        provider: &dyn ModelProvider,
        request: ModelRequest,
        purpose: &str,
    ) -> Result<String, ChatError> {
        let response = tokio::time::timeout(self.settings.timeout, provider.complete(request))
            .await
            .map_err(|_| {
                ChatError::context_optimization(format!(
                    "{purpose} timed out after {}s",
                    self.settings.timeout.as_secs()
                ))
            })?
            .map_err(|error| ChatError::context_optimization(format!("{purpose} failed: {error}")))?;

        Ok(response.text())
    }
}

fn log_fallback(error: &ChatError, started: Instant) -> OptimizationOutcome {
    tracing::warn!(
        phase = "optimize",
        error = %error,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "context optimization failed, using full context"
    );
    OptimizationOutcome::fallback()
}

fn parse_summary(reply: &str) -> Option<String> {
    let body = match (reply.find("<summary>"), reply.find("</summary>")) {
        (Some(start), Some(end)) if end > start => &reply[start + "<summary>".len()..end],
        _ => reply,
    };

    let body = body.trim();
    (!body.is_empty()).then(|| body.to_string())
}

fn normalize_path(path: &str) -> &str {
    let mut path = path.trim();
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            return path;
        }
    }
}

fn included_paths(reply: &str) -> Vec<&str> {
    let mut paths = Vec::new();
    let mut rest = reply;

    while let Some(start) = rest.find(INCLUDE_TAG) {
        let tag = &rest[start + INCLUDE_TAG.len()..];
        let tag_end = tag.find('>').unwrap_or(tag.len());
        let attributes = &tag[..tag_end];

        if let Some(value) = attributes.find("path=\"").map(|at| &attributes[at + 6..])
            && let Some(close) = value.find('"')
        {
            paths.push(&value[..close]);
        }
        rest = &tag[tag_end..];
    }

    paths
}

fn listed_paths(reply: &str) -> Vec<&str> {
    reply
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['-', '*'])
                .trim()
                .trim_matches('`')
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Intersects the paths named in `reply` with `files`; unknown paths are dropped.
fn parse_selection(reply: &str, files: &FileMap) -> FileMap {
    let known: HashMap<&str, &String> = files
        .keys()
        .map(|path| (normalize_path(path), path))
        .collect();

    let mut candidates = included_paths(reply);
    if candidates.is_empty() {
        candidates = listed_paths(reply);
    }

    candidates
        .into_iter()
        .filter_map(|candidate| known.get(normalize_path(candidate)).copied())
        .filter_map(|path| files.get_key_value(path))
        .map(|(path, content)| (path.clone(), content.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn files() -> FileMap {
        let mut files = FileMap::new();
        files.insert("a.ts".to_string(), "export const a = 1;".to_string());
        files.insert("/src/b.ts".to_string(), "export const b = 2;".to_string());
        files
    }

    #[test]
    fn selection_keeps_only_known_paths() {
        let reply = r#"<includeFile path="a.ts"/> <includeFile path="ghost.ts"/>
<includeFile path="./src/b.ts" />"#;

        let selected = parse_selection(reply, &files());
        assert_eq!(
            selected.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["/src/b.ts", "a.ts"]
        );
    }

    #[test]
    fn selection_falls_back_to_listed_lines() {
        let selected = parse_selection("Relevant:\n- `a.ts`\n* nothing else", &files());
        assert_eq!(selected.keys().collect::<Vec<_>>(), vec!["a.ts"]);
        assert!(parse_selection("none of them", &files()).is_empty());
    }

    #[test]
    fn summary_prefers_the_tagged_block() {
        assert_eq!(
            parse_summary("Sure!\n<summary>\n Todo app in React. \n</summary>").as_deref(),
            Some("Todo app in React.")
        );
        assert_eq!(parse_summary("plain synopsis").as_deref(), Some("plain synopsis"));
        assert_eq!(parse_summary("<summary>  </summary>"), None);
    }

    #[test]
    fn paths_normalize_leading_markers() {
        assert_eq!(normalize_path("  ./src/a.ts"), "src/a.ts");
        assert_eq!(normalize_path("/home/a.ts"), "home/a.ts");
    }
}
