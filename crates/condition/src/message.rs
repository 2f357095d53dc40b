//! Message templates with field placeholders
//!
//! A template such as `"{Value} must be below {Limit:n}, see {{docs}}"`
//! contains placeholders `{path}` or `{path:n}`. Brace runs follow composite
//! formatting: an odd run is a live placeholder, an even run is an escaped
//! literal (`{{docs}}` renders as `{docs}`). Left and right runs of one
//! placeholder must have the same length.
//!
//! Parsing replaces every live placeholder with an opaque id, so user text is
//! never run through a second round of brace interpretation. Rendering then
//! swaps each id for the resolved field value.

use crate::error::{ExpressionError, ExpressionResult};
use crate::value::Record;
use regex::{Captures, Regex};
use serde::Serialize;
use std::borrow::Cow;
use std::sync::LazyLock;
use uuid::Uuid;

static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\{+)([A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*)(?::(n))?(\}+)").expect("valid pattern")
});

/// What a placeholder substitutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatIndicator {
    /// `:n`, the field's display name instead of its value
    DisplayName,
}

/// One placeholder found in a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatItem {
    /// Opaque id standing in for the placeholder in the parsed template
    pub id: String,
    /// Placeholder body between the braces, e.g. `Address.City:n`
    pub raw_body: String,
    /// Whether the braces were escaped
    pub is_escaped: bool,
    /// Dotted field path
    pub field_path: String,
    /// Optional `:` indicator
    pub indicator: Option<FormatIndicator>,
    /// Text written between the remaining braces in the parsed template:
    /// the id for live items, the body for escaped ones
    pub substitution: String,
}

/// Resolves placeholder paths at format time
pub trait FieldResolver {
    /// Display value of the field at `path`
    fn value(&self, path: &str) -> Option<String>;

    /// Human-readable name of the field at `path`
    fn display_name(&self, _path: &str) -> Option<String> {
        None
    }
}

impl<F> FieldResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn value(&self, path: &str) -> Option<String> {
        self(path)
    }
}

/// Resolves placeholders from a record and its schema's display names
#[derive(Debug, Clone, Copy)]
pub struct RecordResolver<'a> {
    record: &'a Record,
}

impl<'a> RecordResolver<'a> {
    /// Create a resolver over a record
    pub fn new(record: &'a Record) -> Self {
        Self { record }
    }
}

impl FieldResolver for RecordResolver<'_> {
    fn value(&self, path: &str) -> Option<String> {
        self.record.resolve_path(path).map(ToString::to_string)
    }

    fn display_name(&self, path: &str) -> Option<String> {
        self.record
            .object_type()
            .field_at_path(path)
            .map(|field| field.display_name().to_string())
    }
}

/// A parsed message template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    template: String,
    items: Vec<FormatItem>,
}

impl MessageTemplate {
    /// Locate placeholders and build the substitution plan
    pub fn parse(source: &str) -> ExpressionResult<Self> {
        let mut items: Vec<FormatItem> = Vec::new();
        let mut template = String::with_capacity(source.len());
        let mut last = 0;

        for caps in PLACEHOLDER_REGEX.captures_iter(source) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let (left, right) = (run_len(&caps, 1), run_len(&caps, 4));
            if left != right {
                return Err(ExpressionError::format(format!(
                    "unbalanced braces in '{}' at position {}: {left} opening vs {right} closing",
                    whole.as_str(),
                    whole.start()
                )));
            }

            let path = &caps[2];
            let indicator = caps.get(3).map(|_| FormatIndicator::DisplayName);
            let raw_body = match indicator {
                Some(_) => format!("{path}:n"),
                None => path.to_string(),
            };
            let is_escaped = left % 2 == 0;
            let outer = if is_escaped { left / 2 } else { (left - 1) / 2 };

            let existing = items
                .iter()
                .find(|item| item.raw_body == raw_body && item.is_escaped == is_escaped);
            let substitution = match existing {
                Some(item) => item.substitution.clone(),
                None => {
                    let id = Uuid::new_v4().simple().to_string();
                    let substitution = if is_escaped {
                        raw_body.clone()
                    } else {
                        id.clone()
                    };
                    items.push(FormatItem {
                        id,
                        raw_body,
                        is_escaped,
                        field_path: path.to_string(),
                        indicator,
                        substitution: substitution.clone(),
                    });
                    substitution
                }
            };

            template.push_str(&source[last..whole.start()]);
            template.push_str(&"{".repeat(outer));
            template.push_str(&substitution);
            template.push_str(&"}".repeat(outer));
            last = whole.end();
        }
        template.push_str(&source[last..]);

        Ok(Self { template, items })
    }

    /// Template with live placeholders replaced by their ids
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Distinct placeholders in order of first appearance
    pub fn items(&self) -> &[FormatItem] {
        &self.items
    }

    /// Live placeholders only
    pub fn live_items(&self) -> impl Iterator<Item = &FormatItem> {
        self.items.iter().filter(|item| !item.is_escaped)
    }

    /// Substitute every live placeholder
    ///
    /// A `:n` placeholder without a display name falls back to the path.
    pub fn render(&self, resolver: &dyn FieldResolver) -> ExpressionResult<String> {
        let mut output: Cow<'_, str> = Cow::Borrowed(&self.template);
        for item in self.live_items() {
            let text = match item.indicator {
                Some(FormatIndicator::DisplayName) => resolver
                    .display_name(&item.field_path)
                    .unwrap_or_else(|| item.field_path.clone()),
                None => resolver.value(&item.field_path).ok_or_else(|| {
                    ExpressionError::format(format!(
                        "no value for placeholder '{{{}}}'",
                        item.raw_body
                    ))
                })?,
            };
            output = Cow::Owned(output.replace(&item.id, &text));
        }
        Ok(output.into_owned())
    }
}

fn run_len(caps: &Captures<'_>, group: usize) -> usize {
    caps.get(group).map_or(0, |m| m.as_str().len())
}

/// Parse `template` and substitute its placeholders in one step
pub fn format_message(template: &str, resolver: &dyn FieldResolver) -> ExpressionResult<String> {
    MessageTemplate::parse(template)?.render(resolver)
}
