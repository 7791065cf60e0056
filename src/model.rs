use serde::{Deserialize, Deserializer, Serialize};

/// A bilingual quote. `text` is English, `text_zh` Traditional Chinese.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
    #[serde(rename = "textZh")]
    pub text_zh: String,
    pub author: String,
}

/// A bilingual good-deed suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deed {
    pub text: String,
    #[serde(rename = "textZh")]
    pub text_zh: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Preview mode: skip the daily claim and never advance the counter.
    /// Only the literal `true` turns it on; any other value means a normal
    /// dispatch.
    #[serde(default, deserialize_with = "literal_true")]
    pub force: bool,
}

fn literal_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw == "true")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent { day_count: i64, preview: bool },
    AlreadySent,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Sent { preview: false, .. } => "sent",
            DispatchOutcome::Sent { preview: true, .. } => "preview",
            DispatchOutcome::AlreadySent => "already_sent",
        }
    }
}
