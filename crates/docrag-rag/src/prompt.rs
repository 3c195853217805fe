//! Prompt assembly for grounded generation

use docrag_core::{ChatMessage, ScoredChunk};

/// Number of trailing chat messages included in the prompt
pub const CHAT_HISTORY_WINDOW: usize = 5;

/// Render retrieved chunks as `Source:`/`Content:` blocks separated by a blank line
pub fn format_document_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|hit| format!("Source: {}\nContent: {}", hit.chunk.source, hit.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the last [`CHAT_HISTORY_WINDOW`] messages as `role: content` lines
pub fn format_chat_history(history: &[ChatMessage]) -> String {
    let start = history.len().saturating_sub(CHAT_HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|message| format!("{}: {}", message.role, message.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fill the answer template.
///
/// Rendering is a single pass, so braces or placeholder names inside the
/// question or context are copied through untouched.
pub fn render_prompt(query: &str, doc_context: &str, chat_context: &str) -> String {
    format!(
        "Please answer the following question using the provided context from both documents and chat history.\n\n\
         Question: {query}\n\n\
         Relevant Documents:\n\
         {doc_context}\n\n\
         Chat History:\n\
         {chat_context}\n\n\
         Please provide a concise answer based on the above context."
    )
}
