use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = chat_records)]
pub struct ChatRecord {
    pub id: Uuid,
    pub name: String,
    pub contact: String,
    pub event_at: NaiveDateTime,
    pub duration_seconds: Option<i32>,
    pub transcript: String,
    pub summary: String,
    pub category: String,
    pub severity: String,
    pub social_care_eligibility: Option<String>,
    pub suggested_course_of_action: Option<String>,
    pub next_steps: Option<String>,
    pub contact_request: Option<String>,
    pub status: Option<String>,
    pub rating: Option<String>,
    pub feedback: Option<String>,
    pub flag: Option<bool>,
    pub triaging_confirmed: bool,
    pub mark_as_complete: bool,
    pub action_taken_notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = chat_records)]
pub struct NewChatRecord {
    pub id: Uuid,
    pub name: String,
    pub contact: String,
    pub event_at: NaiveDateTime,
    pub duration_seconds: Option<i32>,
    pub transcript: String,
    pub summary: String,
    pub category: String,
    pub severity: String,
    pub social_care_eligibility: Option<String>,
    pub suggested_course_of_action: Option<String>,
    pub next_steps: Option<String>,
    pub contact_request: Option<String>,
    pub status: Option<String>,
    pub rating: Option<String>,
    pub feedback: Option<String>,
    pub flag: Option<bool>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = manual_records)]
pub struct ManualRecord {
    pub id: Uuid,
    pub name: String,
    pub contact: String,
    pub event_at: NaiveDateTime,
    pub request_description: String,
    pub category: String,
    pub severity: String,
    pub triaging_confirmed: bool,
    pub mark_as_complete: bool,
    pub action_taken_notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = manual_records)]
pub struct NewManualRecord {
    pub id: Uuid,
    pub name: String,
    pub contact: String,
    pub event_at: NaiveDateTime,
    pub request_description: String,
    pub category: String,
    pub severity: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = comments)]
pub struct Comment {
    pub id: i32,
    pub session_id: Uuid,
    pub body: String,
    pub author_email: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    pub session_id: Uuid,
    pub body: String,
    pub author_email: String,
}
