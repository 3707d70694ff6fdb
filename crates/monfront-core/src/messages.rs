use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLevel {
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

/// Messages accumulated while one request moves through the pipeline.
///
/// Owned by the request and handed by `&mut` from the validator to the
/// executor to the formatter, which drains it with [`take_texts`].
///
/// [`take_texts`]: MessageCollector::take_texts
#[derive(Debug, Default)]
pub struct MessageCollector {
    items: Vec<Message>,
}

impl MessageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.items.push(Message {
            level: MessageLevel::Error,
            text: text.into(),
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.items.push(Message {
            level: MessageLevel::Info,
            text: text.into(),
        });
    }

    pub fn extend_errors<I, S>(&mut self, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for t in texts {
            self.error(t);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|m| m.level == MessageLevel::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Drain every message, oldest first, keeping only the text.
    pub fn take_texts(&mut self) -> Vec<String> {
        self.items.drain(..).map(|m| m.text).collect()
    }
}
