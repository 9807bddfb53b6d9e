use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentAction {
    #[serde(alias = "create")]
    Add,
    #[serde(alias = "delete")]
    Remove,
    #[serde(alias = "update")]
    Edit,
    #[serde(alias = "get")]
    Query,
    #[default]
    None,
}

impl IntentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentAction::Add => "add",
            IntentAction::Remove => "remove",
            IntentAction::Edit => "edit",
            IntentAction::Query => "query",
            IntentAction::None => "none",
        }
    }
}

/// Structured output of the intent classifier. Every field is optional on
/// the wire; the orchestrator validates what each action needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClassifiedIntent {
    #[serde(default)]
    pub is_calendar_related: bool,
    #[serde(default)]
    pub action: IntentAction,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub start_datetime: Option<String>,
    #[serde(default)]
    pub end_datetime: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ClassifiedIntent {
    pub fn title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    pub fn start_datetime(&self) -> Option<&str> {
        non_blank(self.start_datetime.as_deref())
    }

    pub fn end_datetime(&self) -> Option<&str> {
        non_blank(self.end_datetime.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
