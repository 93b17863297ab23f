//! Prompt templates with `{variable}` substitution
//!
//! Templates use single braces for variables and doubled braces (`{{`, `}}`)
//! for literal braces. Substituted values are inserted verbatim, so a value
//! containing JSON is never re-parsed as template syntax.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::message::{ChatMessage, Role};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("missing value for prompt variable '{0}'")]
    MissingVariable(String),

    #[error("missing message list for placeholder '{0}'")]
    MissingMessages(String),

    #[error("malformed template at byte {position}: {reason}")]
    MalformedTemplate { position: usize, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

fn parse(template: &str) -> Result<Vec<Segment>, PromptError> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    literal.push('{');
                    continue;
                }

                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    if c == '{' {
                        return Err(PromptError::MalformedTemplate {
                            position,
                            reason: "nested '{' inside variable",
                        });
                    }
                    name.push(c);
                }

                if !closed {
                    return Err(PromptError::MalformedTemplate {
                        position,
                        reason: "unclosed '{'",
                    });
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(PromptError::MalformedTemplate {
                        position,
                        reason: "empty variable name",
                    });
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Variable(name.to_string()));
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    literal.push('}');
                } else {
                    return Err(PromptError::MalformedTemplate {
                        position,
                        reason: "unmatched '}'",
                    });
                }
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn render<'a>(
    template: &str,
    lookup: impl Fn(&str) -> Option<&'a str>,
) -> Result<String, PromptError> {
    let mut out = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Literal(text) => out.push_str(&text),
            Segment::Variable(name) => {
                let value = lookup(&name).ok_or(PromptError::MissingVariable(name))?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

fn variables(template: &str) -> Result<BTreeSet<String>, PromptError> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|s| match s {
            Segment::Variable(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect())
}

/// Values supplied when formatting a template
#[derive(Debug, Clone, Default)]
pub struct PromptValues {
    text: BTreeMap<String, String>,
    messages: BTreeMap<String, Vec<ChatMessage>>,
}

impl PromptValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text variable
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add a message-list variable consumed by a placeholder
    pub fn with_messages(mut self, name: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        self.messages.insert(name.into(), messages);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.text.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    pub fn messages(&self, name: &str) -> Option<&[ChatMessage]> {
        self.messages.get(name).map(Vec::as_slice)
    }
}

/// A single text template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn from_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Names of the variables the template expects
    pub fn input_variables(&self) -> Result<BTreeSet<String>, PromptError> {
        variables(&self.template)
    }

    pub fn format(&self, values: &PromptValues) -> Result<String, PromptError> {
        render(&self.template, |name| values.get(name))
    }
}

#[derive(Debug, Clone)]
enum MessageTemplate {
    Text { role: Role, template: PromptTemplate },
    Placeholder { variable: String },
}

/// An ordered list of message templates, formatted into a model request
#[derive(Debug, Clone, Default)]
pub struct ChatPromptTemplate {
    messages: Vec<MessageTemplate>,
    partials: BTreeMap<String, String>,
}

impl ChatPromptTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, role: Role, template: impl Into<String>) -> Self {
        self.messages.push(MessageTemplate::Text {
            role,
            template: PromptTemplate::from_template(template),
        });
        self
    }

    pub fn system(self, template: impl Into<String>) -> Self {
        self.message(Role::System, template)
    }

    pub fn human(self, template: impl Into<String>) -> Self {
        self.message(Role::Human, template)
    }

    pub fn ai(self, template: impl Into<String>) -> Self {
        self.message(Role::Ai, template)
    }

    /// Insert the message list bound to `variable` at this position
    pub fn placeholder(mut self, variable: impl Into<String>) -> Self {
        self.messages.push(MessageTemplate::Placeholder {
            variable: variable.into(),
        });
        self
    }

    /// Bind a variable ahead of time
    pub fn partial(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.partials.insert(name.into(), value.into());
        self
    }

    /// Variables that still need a value at format time.
    pub fn input_variables(&self) -> Result<BTreeSet<String>, PromptError> {
        let mut names = BTreeSet::new();
        for message in &self.messages {
            match message {
                MessageTemplate::Text { template, .. } => {
                    names.extend(template.input_variables()?);
                }
                MessageTemplate::Placeholder { variable } => {
                    names.insert(variable.clone());
                }
            }
        }
        names.retain(|name| !self.partials.contains_key(name));
        Ok(names)
    }

    pub fn format_messages(&self, values: &PromptValues) -> Result<Vec<ChatMessage>, PromptError> {
        let mut out = Vec::with_capacity(self.messages.len());
        for message in &self.messages {
            match message {
                MessageTemplate::Text { role, template } => {
                    let content = render(template.template(), |name| {
                        values
                            .get(name)
                            .or_else(|| self.partials.get(name).map(String::as_str))
                    })?;
                    out.push(ChatMessage::new(*role, content));
                }
                MessageTemplate::Placeholder { variable } => {
                    let messages = values
                        .messages(variable)
                        .ok_or_else(|| PromptError::MissingMessages(variable.clone()))?;
                    out.extend_from_slice(messages);
                }
            }
        }
        Ok(out)
    }
}
