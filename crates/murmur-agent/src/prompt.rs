// SPDX-FileCopyrightText: 2026 Murmur Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply prompt assembly.

use std::fmt::Write as _;

use murmur_core::{Category, Message};

use crate::eligibility::ConversationThread;

/// Everything the generator sees about the message being answered.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyContext {
    /// `@username (name): text` lines for earlier messages, oldest first.
    pub history: Vec<String>,
    pub text: String,
    pub author_name: String,
    pub author_username: String,
    pub category: Category,
    pub language: Option<String>,
    pub max_length: usize,
}

impl ReplyContext {
    pub fn from_thread(thread: &ConversationThread, target: &Message, max_length: usize) -> Self {
        let history = thread
            .context_before(target)
            .iter()
            .map(|m| format!("@{} ({}): {}", m.display_handle(), m.display_name(), m.text))
            .collect();
        Self {
            history,
            text: target.text.clone(),
            author_name: target.display_name().to_string(),
            author_username: target.display_handle().to_string(),
            category: target.category,
            language: target.language.clone(),
            max_length,
        }
    }
}

/// Renders the conversational reply prompt.
pub fn build_reply_prompt(ctx: &ReplyContext) -> String {
    let mut prompt = String::new();

    prompt.push_str("Previous conversation:\n");
    if ctx.history.is_empty() {
        prompt.push_str("(none)\n");
    } else {
        for line in &ctx.history {
            prompt.push_str(line);
            prompt.push('\n');
        }
    }

    let _ = writeln!(
        prompt,
        "\nReply to this {} from @{} ({}):\n{}",
        ctx.category, ctx.author_username, ctx.author_name, ctx.text
    );
    if let Some(lang) = ctx.language.as_deref().filter(|l| !l.is_empty() && *l != "und") {
        let _ = writeln!(prompt, "\nWrite the reply in the language with code `{lang}`.");
    }
    let _ = write!(
        prompt,
        "\nKeep the reply under {} characters. Output only the reply text.",
        ctx.max_length
    );
    prompt
}

/// Trims generator output and cuts it to `max_length` characters.
pub fn finalize_reply(raw: &str, max_length: usize) -> String {
    let trimmed = raw.trim().trim_matches('"').trim();
    match trimmed.char_indices().nth(max_length) {
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}
