//! Instructions sent to the model collaborator.
//!
//! Centralising every prompt here keeps the reduction, Q&A, and analysis
//! code free of prompt text, and lets unit tests inspect prompts without a
//! live model.
//!
//! Callers can override each default via [`crate::config::SummarizeConfig`];
//! the constants here are used only when no override is provided.

/// Default instructions for summarising one chunk.
pub const DEFAULT_SUMMARY_INSTRUCTIONS: &str = r#"You summarise sections of scanned documents (letters, invoices, receipts, forms).

Summarise the text you are given concisely, preserving key information:
- names of people and organisations
- dates, deadlines, and reference numbers
- amounts, totals, and currencies
- requested actions

Output only the summary as plain prose. Do not add commentary, headings, or markdown fences."#;

/// Default instructions for structured document analysis.
pub const DEFAULT_ANALYSIS_INSTRUCTIONS: &str = r#"Analyze the document you are given and return ONLY a JSON object (no markdown, no explanation).

Return JSON in this exact format:
{
  "category": "invoice|receipt|letter|other",
  "confidence": 0.95,
  "summary": "Brief 1-2 sentence summary",
  "key_entities": {
    "date": "YYYY-MM-DD or null",
    "total_amount": "$XX.XX or null",
    "vendor": "Company name or null",
    "recipient": "Recipient name or null"
  },
  "suggested_tags": ["tag1", "tag2"]
}"#;

/// Default system prompt for answering questions; `{CONTEXT}` is replaced by
/// the (possibly reduced) document text.
pub const DEFAULT_CHAT_INSTRUCTIONS: &str = r#"You are a helpful assistant answering questions about a document.

Document content:
{CONTEXT}

Answer questions accurately based on the document content. If information is not in the document, say so."#;

/// Substitute the document context into a chat prompt template.
///
/// Templates without a `{CONTEXT}` placeholder get the context appended.
pub fn chat_system_prompt(template: &str, context: &str) -> String {
    if template.contains("{CONTEXT}") {
        template.replace("{CONTEXT}", context)
    } else {
        format!("{template}\n\nDocument content:\n{context}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_prompt_substitutes_context() {
        let p = chat_system_prompt(DEFAULT_CHAT_INSTRUCTIONS, "Total: $50");
        assert!(p.contains("Total: $50"));
        assert!(!p.contains("{CONTEXT}"));
    }

    #[test]
    fn chat_prompt_appends_when_no_placeholder() {
        let p = chat_system_prompt("Be brief.", "INVOICE");
        assert!(p.starts_with("Be brief."));
        assert!(p.ends_with("INVOICE"));
    }

    #[test]
    fn analysis_prompt_lists_categories() {
        for c in ["invoice", "receipt", "letter", "other"] {
            assert!(DEFAULT_ANALYSIS_INSTRUCTIONS.contains(c));
        }
    }
}
