//! Session records as seen by the API.
//!
//! Chat and manual records live in separate tables but form one logical
//! entity. [`SessionRecord`] carries the kind-specific row, [`SessionSummary`]
//! is the common projection that listings merge, sort and paginate.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ChatRecord, ManualRecord, NewChatRecord, NewManualRecord};

pub const DEFAULT_CATEGORY: &str = "Not enough Information";
pub const DEFAULT_SEVERITY: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Chat,
    Manual,
}

impl SessionKind {
    pub const ALL: [SessionKind; 2] = [SessionKind::Chat, SessionKind::Manual];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Chat => "chat",
            SessionKind::Manual => "manual",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported session flag '{0}', expected 'chat' or 'manual'")]
pub struct UnknownSessionKind(pub String);

impl FromStr for SessionKind {
    type Err = UnknownSessionKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "chat" => Ok(SessionKind::Chat),
            "manual" => Ok(SessionKind::Manual),
            _ => Err(UnknownSessionKind(value.to_string())),
        }
    }
}

/// A stored record together with its kind.
#[derive(Debug, Clone)]
pub enum SessionRecord {
    Chat(ChatRecord),
    Manual(ManualRecord),
}

impl SessionRecord {
    pub fn category(&self) -> &str {
        match self {
            SessionRecord::Chat(record) => &record.category,
            SessionRecord::Manual(record) => &record.category,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        match self {
            SessionRecord::Chat(record) => SessionSummary {
                id: record.id,
                kind: SessionKind::Chat,
                name: record.name.clone(),
                contact: record.contact.clone(),
                event_at: record.event_at,
                severity: record.severity.clone(),
                category: record.category.clone(),
                triaging_confirmed: record.triaging_confirmed,
                mark_as_complete: record.mark_as_complete,
                flag: record.flag,
            },
            SessionRecord::Manual(record) => SessionSummary {
                id: record.id,
                kind: SessionKind::Manual,
                name: record.name.clone(),
                contact: record.contact.clone(),
                event_at: record.event_at,
                severity: record.severity.clone(),
                category: record.category.clone(),
                triaging_confirmed: record.triaging_confirmed,
                mark_as_complete: record.mark_as_complete,
                flag: None,
            },
        }
    }
}

/// Attributes shared by both record kinds, the shape listings operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: Uuid,
    pub kind: SessionKind,
    pub name: String,
    pub contact: String,
    pub event_at: NaiveDateTime,
    pub severity: String,
    pub category: String,
    pub triaging_confirmed: bool,
    pub mark_as_complete: bool,
    pub flag: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NewSession {
    Chat(NewChatSession),
    Manual(NewManualSession),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewChatSession {
    pub name: String,
    pub contact: String,
    pub event_at: DateTime<Utc>,
    pub duration_seconds: Option<i32>,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub summary: String,
    pub category: Option<String>,
    pub severity: Option<String>,
    pub flag: Option<bool>,
    pub social_care_eligibility: Option<String>,
    pub suggested_course_of_action: Option<String>,
    pub next_steps: Option<String>,
    pub contact_request: Option<String>,
    pub status: Option<String>,
    pub rating: Option<String>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewManualSession {
    pub name: String,
    pub contact: String,
    pub event_at: DateTime<Utc>,
    #[serde(default)]
    pub request_description: String,
    pub category: Option<String>,
    pub severity: Option<String>,
}

impl NewSession {
    pub fn kind(&self) -> SessionKind {
        match self {
            NewSession::Chat(_) => SessionKind::Chat,
            NewSession::Manual(_) => SessionKind::Manual,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let (name, contact) = match self {
            NewSession::Chat(chat) => (&chat.name, &chat.contact),
            NewSession::Manual(manual) => (&manual.name, &manual.contact),
        };
        if name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if contact.trim().is_empty() {
            return Err("contact must not be empty".to_string());
        }
        if let NewSession::Chat(chat) = self {
            if chat.duration_seconds.is_some_and(|seconds| seconds < 0) {
                return Err("duration_seconds must not be negative".to_string());
            }
        }
        Ok(())
    }
}

impl NewChatSession {
    pub fn into_row(self, id: Uuid) -> NewChatRecord {
        NewChatRecord {
            id,
            name: self.name.trim().to_string(),
            contact: self.contact.trim().to_string(),
            event_at: self.event_at.naive_utc(),
            duration_seconds: self.duration_seconds,
            transcript: self.transcript,
            summary: self.summary,
            category: label_or_default(self.category, DEFAULT_CATEGORY),
            severity: label_or_default(self.severity, DEFAULT_SEVERITY),
            social_care_eligibility: self.social_care_eligibility,
            suggested_course_of_action: self.suggested_course_of_action,
            next_steps: self.next_steps,
            contact_request: self.contact_request,
            status: self.status,
            rating: self.rating,
            feedback: self.feedback,
            flag: self.flag,
        }
    }
}

impl NewManualSession {
    pub fn into_row(self, id: Uuid) -> NewManualRecord {
        NewManualRecord {
            id,
            name: self.name.trim().to_string(),
            contact: self.contact.trim().to_string(),
            event_at: self.event_at.naive_utc(),
            request_description: self.request_description,
            category: label_or_default(self.category, DEFAULT_CATEGORY),
            severity: label_or_default(self.severity, DEFAULT_SEVERITY),
        }
    }
}

fn label_or_default(value: Option<String>, default: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Field updates for a single record. An assigned category always marks the
/// record as triaging-confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionChanges {
    pub severity: Option<String>,
    pub category: Option<String>,
    pub action: Option<SessionAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAction {
    pub notes: String,
    pub mark_as_complete: bool,
}

impl SessionChanges {
    pub fn urgency(severity: impl Into<String>) -> Self {
        Self {
            severity: Some(severity.into()),
            ..Self::default()
        }
    }

    pub fn team(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn action(notes: impl Into<String>, mark_as_complete: bool) -> Self {
        Self {
            action: Some(SessionAction {
                notes: notes.into(),
                mark_as_complete,
            }),
            ..Self::default()
        }
    }

    pub fn confirms_triage(&self) -> bool {
        self.category.is_some()
    }
}

pub fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_kind_flags() {
        assert_eq!("chat".parse::<SessionKind>(), Ok(SessionKind::Chat));
        assert_eq!(" Manual ".parse::<SessionKind>(), Ok(SessionKind::Manual));
        assert_eq!(
            "bogus".parse::<SessionKind>(),
            Err(UnknownSessionKind("bogus".to_string()))
        );
        assert!("".parse::<SessionKind>().is_err());
    }

    #[test]
    fn new_session_is_tagged_by_kind() {
        let payload = serde_json::json!({
            "kind": "manual",
            "name": "Sam Roe",
            "contact": "sam@example.org",
            "event_at": "2024-03-01T10:00:00Z",
            "request_description": "Needs a call back"
        });
        let session: NewSession = serde_json::from_value(payload).expect("valid payload");
        assert_eq!(session.kind(), SessionKind::Manual);

        let NewSession::Manual(manual) = session else {
            panic!("expected manual payload");
        };
        let row = manual.into_row(Uuid::nil());
        assert_eq!(row.category, DEFAULT_CATEGORY);
        assert_eq!(row.severity, DEFAULT_SEVERITY);
        assert_eq!(row.request_description, "Needs a call back");
    }

    #[test]
    fn rejects_blank_names() {
        let payload = serde_json::json!({
            "kind": "chat",
            "name": "   ",
            "contact": "0123",
            "event_at": "2024-03-01T10:00:00Z"
        });
        let session: NewSession = serde_json::from_value(payload).expect("valid payload");
        assert_eq!(
            session.validate(),
            Err("name must not be empty".to_string())
        );
    }

    #[test]
    fn only_team_changes_confirm_triage() {
        assert!(SessionChanges::team("EIP").confirms_triage());
        assert!(!SessionChanges::urgency("High").confirms_triage());
        assert!(!SessionChanges::action("called back", true).confirms_triage());
        assert!(!SessionChanges::default().confirms_triage());
    }
}
