//! Prompt templates and the renderer that fills them
//!
//! Templates use `{{name}}` for text and `{{#if name}}...{{/if}}` for
//! optional blocks. Rendering is pure and strict: every placeholder must be
//! bound, and flags and text values are not interchangeable.

mod templates;

pub use templates::*;

use std::collections::HashMap;
use thiserror::Error;

use crate::errors::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Text(String),
    Flag(bool),
}

/// Named values bound into a template
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: HashMap<&'static str, TemplateValue>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, TemplateValue::Text(value.into()));
        self
    }

    pub fn flag(mut self, name: &'static str, value: bool) -> Self {
        self.values.insert(name, TemplateValue::Flag(value));
        self
    }

    fn get(&self, name: &str) -> Option<&TemplateValue> {
        self.values.get(name)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder `{0}`")]
    UnknownPlaceholder(String),

    #[error("flag `{0}` used as text")]
    FlagAsText(String),

    #[error("text value `{0}` used as a condition")]
    TextAsFlag(String),

    #[error("block `{0}` is never closed")]
    UnterminatedBlock(String),

    #[error("`{{{{/if}}}}` without a matching `{{{{#if}}}}`")]
    UnexpectedEndIf,

    #[error("tag opened at byte {0} is never closed")]
    UnclosedTag(usize),
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        AppError::Internal {
            message: format!("Prompt template error: {err}"),
        }
    }
}

enum Tag<'a> {
    Var(&'a str),
    If(&'a str),
    EndIf,
}

fn parse_tag(inner: &str) -> Tag<'_> {
    let inner = inner.trim();
    if let Some(name) = inner.strip_prefix("#if ") {
        Tag::If(name.trim())
    } else if inner == "/if" {
        Tag::EndIf
    } else {
        Tag::Var(inner)
    }
}

/// Fill `template` from `vars`
pub fn render(template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    // One entry per open block: (flag name, block is emitted)
    let mut blocks: Vec<(&str, bool)> = Vec::new();
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find("{{") {
        let emitting = blocks.iter().all(|(_, on)| *on);
        if emitting {
            out.push_str(&rest[..start]);
        }
        let after_open = &rest[start + 2..];
        let end = after_open
            .find("}}")
            .ok_or(TemplateError::UnclosedTag(offset + start))?;

        match parse_tag(&after_open[..end]) {
            Tag::Var(name) => match vars.get(name) {
                Some(TemplateValue::Text(value)) => {
                    if emitting {
                        out.push_str(value);
                    }
                }
                Some(TemplateValue::Flag(_)) => return Err(TemplateError::FlagAsText(name.into())),
                None => return Err(TemplateError::UnknownPlaceholder(name.into())),
            },
            Tag::If(name) => match vars.get(name) {
                Some(TemplateValue::Flag(on)) => blocks.push((name, *on)),
                Some(TemplateValue::Text(_)) => return Err(TemplateError::TextAsFlag(name.into())),
                None => return Err(TemplateError::UnknownPlaceholder(name.into())),
            },
            Tag::EndIf => {
                blocks.pop().ok_or(TemplateError::UnexpectedEndIf)?;
            }
        }

        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    if let Some((name, _)) = blocks.pop() {
        return Err(TemplateError::UnterminatedBlock(name.into()));
    }
    out.push_str(rest);
    Ok(out)
}

/// Render `item` once per entry and join the pieces
pub fn render_each<I>(item: &str, entries: I, separator: &str) -> Result<String, TemplateError>
where
    I: IntoIterator<Item = TemplateVars>,
{
    let rendered = entries
        .into_iter()
        .map(|vars| render(item, &vars))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join(separator))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_text() {
        let vars = TemplateVars::new().text("name", "Ada");
        assert_eq!(render("Hi {{name}}!", &vars).unwrap(), "Hi Ada!");
        assert_eq!(render("Hi {{ name }}!", &vars).unwrap(), "Hi Ada!");
    }

    #[test]
    fn test_conditional_block() {
        let template = "a{{#if extra}}b{{/if}}c";
        let on = TemplateVars::new().flag("extra", true);
        let off = TemplateVars::new().flag("extra", false);
        assert_eq!(render(template, &on).unwrap(), "abc");
        assert_eq!(render(template, &off).unwrap(), "ac");
    }

    #[test]
    fn test_nested_blocks_respect_outer_flag() {
        let template = "{{#if a}}A{{#if b}}B{{/if}}{{/if}}.";
        let vars = TemplateVars::new().flag("a", false).flag("b", true);
        assert_eq!(render(template, &vars).unwrap(), ".");
    }

    #[test]
    fn test_strictness() {
        let vars = TemplateVars::new().flag("f", true).text("t", "x");
        assert_eq!(
            render("{{missing}}", &vars),
            Err(TemplateError::UnknownPlaceholder("missing".into()))
        );
        assert_eq!(render("{{f}}", &vars), Err(TemplateError::FlagAsText("f".into())));
        assert_eq!(
            render("{{#if t}}x{{/if}}", &vars),
            Err(TemplateError::TextAsFlag("t".into()))
        );
        assert_eq!(
            render("{{#if f}}open", &vars),
            Err(TemplateError::UnterminatedBlock("f".into()))
        );
        assert_eq!(render("x{{/if}}", &vars), Err(TemplateError::UnexpectedEndIf));
        assert_eq!(render("ab{{t", &vars), Err(TemplateError::UnclosedTag(2)));
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let vars = TemplateVars::new().text("content", "{{injected}}");
        assert_eq!(render("[{{content}}]", &vars).unwrap(), "[{{injected}}]");
    }

    #[test]
    fn test_render_each_joins_items() {
        let items = ["a", "b"]
            .into_iter()
            .map(|v| TemplateVars::new().text("v", v));
        assert_eq!(render_each("<{{v}}>", items, ",").unwrap(), "<a>,<b>");
    }

    #[test]
    fn test_every_template_renders_with_its_bindings() {
        let content = TemplateVars::new().text("content", "text");
        render(OCR_PROMPT, &TemplateVars::new()).unwrap();
        render(OUTLINE_CHECK_PROMPT, &content).unwrap();
        render(NOTES_FROM_OUTLINE_PROMPT, &TemplateVars::new().text("outline", "o")).unwrap();
        render(
            STUDY_GUIDE_PROMPT,
            &content.clone().flag("use_online_sources", true),
        )
        .unwrap();
        render(
            ASSESSMENT_PROMPT,
            &content
                .clone()
                .text("question_count", "5")
                .text("question_types", "essay"),
        )
        .unwrap();
        render(EVALUATION_PROMPT, &TemplateVars::new().text("questions", "q")).unwrap();
        render(
            EVALUATION_ITEM,
            &TemplateVars::new()
                .text("number", "1")
                .text("question_type", "essay")
                .text("question_text", "q")
                .flag("has_options", false)
                .text("options", "")
                .text("correct_answer", "a")
                .text("user_answer", "b"),
        )
        .unwrap();
        render(
            CHAT_PROMPT,
            &TemplateVars::new().text("history", "").text("query", "why?"),
        )
        .unwrap();
        render(
            CHAT_TURN,
            &TemplateVars::new().text("role", "user").text("content", "hi"),
        )
        .unwrap();
    }
}
