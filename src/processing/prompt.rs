//! Fixed summarization prompt.

/// Instruction placed in front of every extracted document.
pub const SUMMARY_INSTRUCTION: &str = "Summarize the following text into a concise and meaningful overview, capturing the key points and essential details in a clear and coherent manner:";

/// Separator between the instruction and the document text.
pub const PROMPT_SEPARATOR: &str = "\n\n\n";

/// Build the prompt sent to the provider for `text`.
pub fn build_summary_prompt(text: &str) -> String {
    let mut prompt =
        String::with_capacity(SUMMARY_INSTRUCTION.len() + PROMPT_SEPARATOR.len() + text.len());
    prompt.push_str(SUMMARY_INSTRUCTION);
    prompt.push_str(PROMPT_SEPARATOR);
    prompt.push_str(text);
    prompt
}

/// Recover the document text from a prompt built by [`build_summary_prompt`].
pub fn document_text(prompt: &str) -> Option<&str> {
    prompt
        .strip_prefix(SUMMARY_INSTRUCTION)
        .and_then(|rest| rest.strip_prefix(PROMPT_SEPARATOR))
}
