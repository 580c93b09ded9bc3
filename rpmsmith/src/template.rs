//! Minimal `{placeholder}` templates.
//!
//! URL formats in the bundle configs and the mock configuration template
//! share this syntax. A template is parsed once, at config load time, and
//! checked against the set of keys its caller can supply, so a typo in a
//! placeholder fails the load instead of a build half an hour later.
//!
//! `{{` and `}}` produce literal braces.

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unterminated placeholder at byte {offset} in template {template:?}")]
    Unterminated { template: String, offset: usize },

    #[error("unmatched '}}' at byte {offset} in template {template:?}")]
    UnmatchedClose { template: String, offset: usize },

    #[error("invalid placeholder name {name:?} in template {template:?}")]
    InvalidName { template: String, name: String },

    #[error("unknown placeholder {{{name}}} in template {template:?} (allowed: {allowed})")]
    UnknownKey {
        template: String,
        name: String,
        allowed: String,
    },

    #[error("template {template:?} is missing required placeholder {{{name}}}")]
    MissingRequired { template: String, name: String },

    #[error("no value supplied for placeholder {{{name}}} in template {template:?}")]
    MissingValue { template: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template, accepting any well-formed placeholder name.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let bytes = source.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    literal.push('{');
                    i += 2;
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    literal.push('}');
                    i += 2;
                }
                b'{' => {
                    let Some(len) = source[i + 1..].find('}') else {
                        return Err(TemplateError::Unterminated {
                            template: source.to_string(),
                            offset: i,
                        });
                    };
                    let name = &source[i + 1..i + 1 + len];
                    if !is_valid_name(name) {
                        return Err(TemplateError::InvalidName {
                            template: source.to_string(),
                            name: name.to_string(),
                        });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                    i += len + 2;
                }
                b'}' => {
                    return Err(TemplateError::UnmatchedClose {
                        template: source.to_string(),
                        offset: i,
                    });
                }
                _ => {
                    let ch = source[i..].chars().next().unwrap_or_default();
                    literal.push(ch);
                    i += ch.len_utf8().max(1);
                }
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Parse a template and reject placeholders outside `allowed`.
    pub fn parse_with_keys(source: &str, allowed: &[&str]) -> Result<Self, TemplateError> {
        let template = Self::parse(source)?;
        for name in template.placeholders() {
            if !allowed.contains(&name) {
                return Err(TemplateError::UnknownKey {
                    template: source.to_string(),
                    name: name.to_string(),
                    allowed: allowed.join(", "),
                });
            }
        }
        Ok(template)
    }

    /// Require every key in `required` to appear at least once.
    pub fn require(&self, required: &[&str]) -> Result<(), TemplateError> {
        let present: BTreeSet<&str> = self.placeholders().collect();
        match required.iter().find(|key| !present.contains(*key)) {
            Some(name) => Err(TemplateError::MissingRequired {
                template: self.source.clone(),
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Placeholder names in order of appearance (with repeats).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute placeholders from `values`.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = values
                        .iter()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| TemplateError::MissingValue {
                            template: self.source.clone(),
                            name: name.clone(),
                        })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
