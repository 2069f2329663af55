//! System prompt assembly and transcript rendering.

use std::fmt::Write as _;

use gprovider::Message;

use crate::{ChatMode, ChatTurn, DesignScheme, FileMap, PromptVariant, SupabaseConnection};

const BUILD_INSTRUCTIONS: &str = "You are an expert software engineer working inside a \
project workspace. Produce complete, runnable changes: write whole files, list shell \
commands that must run, and keep explanations short.";

const DISCUSS_INSTRUCTIONS: &str = "You are an expert software engineer acting as a \
technical consultant. Answer questions, explain trade-offs and propose plans. Do not \
write files or run commands; describe the changes instead.";

const OPTIMIZED_SUFFIX: &str = "Be concise. Prefer editing the files shown below over \
inventing new structure.";

/// Builds the system prompt for a turn.
pub fn system_prompt(turn: &ChatTurn) -> String {
    let mut prompt = String::new();

    prompt.push_str(match turn.mode {
        ChatMode::Build => BUILD_INSTRUCTIONS,
        ChatMode::Discuss => DISCUSS_INSTRUCTIONS,
    });
    if turn.prompt == PromptVariant::Optimized {
        prompt.push(' ');
        prompt.push_str(OPTIMIZED_SUFFIX);
    }

    if let Some(scheme) = turn.design_scheme.as_ref().filter(|scheme| !scheme.is_empty()) {
        prompt.push_str("\n\n");
        prompt.push_str(&design_section(scheme));
    }

    if let Some(supabase) = &turn.supabase {
        prompt.push_str("\n\n");
        prompt.push_str(&supabase_section(supabase));
    }

    if let Some(summary) = &turn.summary {
        let _ = write!(
            prompt,
            "\n\n<chat_summary>\n{}\n</chat_summary>\nThe summary above replaces earlier conversation history.",
            summary.trim()
        );
    }

    let files = turn.prompt_files();
    if !files.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(&file_context(files));
    }

    prompt
}

fn design_section(scheme: &DesignScheme) -> String {
    let mut section = String::from("<design_scheme>");
    if !scheme.palette.is_empty() {
        section.push_str("\npalette:");
        for (name, color) in &scheme.palette {
            let _ = write!(section, " {name}={color}");
        }
    }
    if !scheme.features.is_empty() {
        let _ = write!(section, "\nfeatures: {}", scheme.features.join(", "));
    }
    if !scheme.font.is_empty() {
        let _ = write!(section, "\nfont: {}", scheme.font.join(", "));
    }
    section.push_str("\n</design_scheme>");
    section
}

fn supabase_section(supabase: &SupabaseConnection) -> String {
    if supabase.is_ready() {
        "A Supabase project is connected and selected; database work may use it.".to_string()
    } else if supabase.is_connected {
        "Supabase is connected but no project is selected; ask the user to select one before database work.".to_string()
    } else {
        "Supabase is not connected; ask the user to connect it before database work.".to_string()
    }
}

/// Renders files as `<file path="…">` blocks in path order.
pub fn file_context(files: &FileMap) -> String {
    let mut context = String::from("<project_files>");
    for (path, content) in files {
        let _ = write!(context, "\n<file path=\"{path}\">\n{content}\n</file>");
    }
    context.push_str("\n</project_files>");
    context
}

/// `[role]: content` lines, one message per line group.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| format!("[{}]: {}", message.role, message.content.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}
