//! Few-shot prompt assembly.
//!
//! Placeholder syntax: `{ident}` is a substitution slot; `{{` and `}}` are
//! escaped literal braces. Assembly is two-phase: worked examples and format
//! instructions are spliced in literally (brace-escaped), then ONE final
//! `render` pass unescapes braces and fills the live query slot. Substituted
//! values are never re-scanned, so a query containing brace syntax is
//! inserted verbatim.

use thiserror::Error;

use crate::schema::{MusicTasteRecord, SchemaError};

const EXAMPLE_TEMPLATE: &str = "Query: {query}\nResult:\n{result}";

const PREFIX: &str =
    "Given a query describing a user's music taste, transform it into a structured object.\n";

const SUFFIX: &str = "Query: {query}\nResult:\n";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{0}}}' in template")]
    UnknownPlaceholder(String),

    #[error("stray unescaped brace in template")]
    StrayBrace,
}

/// Doubles every brace so `text` survives a later `render` pass as literal
/// text instead of being read as placeholder syntax.
pub fn escape(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

/// Single substitution pass: `{{` → `{`, `}}` → `}`, `{ident}` → its value
/// from `vars`. Unknown placeholders and stray braces are errors.
pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) if ch.is_ascii_alphanumeric() || ch == '_' => name.push(ch),
                        _ => return Err(TemplateError::StrayBrace),
                    }
                }
                let value = vars
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or(TemplateError::UnknownPlaceholder(name))?;
                out.push_str(value);
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(TemplateError::StrayBrace);
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// One worked (query, expected record) pair. Defined once at startup,
/// immutable thereafter.
#[derive(Debug, Clone)]
pub struct FewShotExample {
    query: String,
    /// Pre-serialized expected record, braces escaped so it reaches the
    /// final substitution pass intact.
    result: String,
}

impl FewShotExample {
    pub fn new(query: &str, record: &MusicTasteRecord) -> Result<Self, SchemaError> {
        Ok(Self {
            query: query.to_string(),
            result: escape(&record.to_wire()?),
        })
    }

    /// Fills the two-slot example template by literal splice. No unescape
    /// happens here; the escaped record text must survive to `build`'s final
    /// render pass.
    pub fn render(&self) -> String {
        EXAMPLE_TEMPLATE
            .replace("{query}", &self.query)
            .replace("{result}", &self.result)
    }
}

/// The complete few-shot prompt: task instruction, format instructions,
/// worked examples, live query slot. Built once at startup and passed by
/// reference into the pipeline.
#[derive(Debug, Clone)]
pub struct FewShotPrompt {
    examples: Vec<FewShotExample>,
    /// Brace-escaped, like the example results.
    format_instructions: String,
}

impl FewShotPrompt {
    pub fn new(examples: Vec<FewShotExample>, format_instructions: &str) -> Self {
        Self {
            examples,
            format_instructions: escape(format_instructions),
        }
    }

    /// Renders the full prompt for `query`. Pure function of the prompt's
    /// fixed parts and the query; identical calls yield byte-identical text.
    pub fn build(&self, query: &str) -> Result<String, TemplateError> {
        let mut template = String::new();
        template.push_str(PREFIX);
        template.push_str(&self.format_instructions);
        template.push_str("\n\n");
        for example in &self.examples {
            template.push_str(&example.render());
            template.push_str("\n\n");
        }
        template.push_str(SUFFIX);

        render(&template, &[("query", query)])
    }
}
