//! What an action hands back to the dispatcher.

use crate::input::RawInput;
use crate::types::Id;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// PageUrl
// ---------------------------------------------------------------------------

/// A frontend page plus ordered query arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageUrl {
    pub page: String,
    pub args: Vec<(String, String)>,
}

impl PageUrl {
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            args: Vec::new(),
        }
    }

    /// `zabbix.php?action=<name>`
    pub fn action(name: &str) -> Self {
        Self::new("zabbix.php").arg("action", name)
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.args.push((key.into(), value.to_string()));
        self
    }
}

impl fmt::Display for PageUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            return f.write_str(&self.page);
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.args.iter())
            .finish();
        write!(f, "{}?{}", self.page, query)
    }
}

// ---------------------------------------------------------------------------
// Flash
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
}

/// Message box shown on the page a redirect lands on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl Flash {
    pub fn success(title: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            title: title.into(),
            messages,
        }
    }

    pub fn error(title: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            title: title.into(),
            messages,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Redirect {
        url: PageUrl,
        flash: Option<Flash>,
        /// Raw input echoed back for re-rendering the previous form.
        form_data: Option<RawInput>,
    },
    Data {
        main_block: Value,
    },
    Fatal,
    Denied,
}

impl Outcome {
    pub fn redirect(url: PageUrl) -> Self {
        Outcome::Redirect {
            url,
            flash: None,
            form_data: None,
        }
    }

    pub fn with_flash(mut self, new_flash: Flash) -> Self {
        if let Outcome::Redirect { flash, .. } = &mut self {
            *flash = Some(new_flash);
        }
        self
    }

    pub fn with_form_data(mut self, data: RawInput) -> Self {
        if let Outcome::Redirect { form_data, .. } = &mut self {
            *form_data = Some(data);
        }
        self
    }

    pub fn data(main_block: Value) -> Self {
        Outcome::Data { main_block }
    }

    /// `{"success": {"title": ..., "messages": [...]}}`
    pub fn json_success(title: impl Into<String>, messages: Vec<String>) -> Self {
        Self::data(json!({
            "success": {
                "title": title.into(),
                "messages": messages,
            }
        }))
    }

    /// `{"error": {"title": ..., "messages": [...], "keepids": [...]}}`;
    /// `keepids` is present only when given.
    pub fn json_error(title: impl Into<String>, messages: Vec<String>, keepids: Option<&[Id]>) -> Self {
        let mut error = json!({
            "title": title.into(),
            "messages": messages,
        });
        if let (Some(ids), Some(obj)) = (keepids, error.as_object_mut()) {
            let ids: Vec<String> = ids.iter().map(Id::to_string).collect();
            obj.insert("keepids".to_string(), json!(ids));
        }
        Self::data(json!({ "error": error }))
    }

    /// Short label for logs and the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Redirect { .. } => "redirect",
            Outcome::Data { .. } => "data",
            Outcome::Fatal => "fatal",
            Outcome::Denied => "denied",
        }
    }

    /// The `main_block` member as sent on the wire: the payload encoded as
    /// a JSON string.
    pub fn main_block_string(&self) -> Option<String> {
        match self {
            Outcome::Data { main_block } => Some(main_block.to_string()),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Redirect { flash, .. } => {
                flash.as_ref().is_none_or(|f| f.kind == FlashKind::Success)
            }
            Outcome::Data { main_block } => main_block.get("error").is_none(),
            Outcome::Fatal | Outcome::Denied => false,
        }
    }
}

/// Pick the singular or plural title for `count` objects.
pub fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}
