//! Session detail: one record joined with its comments.

use serde::Serialize;
use uuid::Uuid;

use crate::models::Comment;
use crate::session::{to_iso, SessionKind, SessionRecord};
use crate::store::{RecordStore, StoreResult};

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub comment_id: i32,
    pub comment: String,
    pub author_email: String,
    pub created_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            comment_id: comment.id,
            comment: comment.body,
            author_email: comment.author_email,
            created_at: to_iso(comment.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    pub id: Uuid,
    pub kind: SessionKind,
    pub name: String,
    pub contact: String,
    pub event_at: String,
    pub severity: String,
    pub category: String,
    pub triaging_confirmed: bool,
    pub mark_as_complete: bool,
    pub action_taken_notes: Option<String>,
    #[serde(flatten)]
    pub content: SessionContent,
    pub comments: Vec<CommentResponse>,
}

/// Fields only one kind carries.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SessionContent {
    Chat {
        transcript: String,
        summary: String,
        flag: Option<bool>,
        duration_seconds: Option<i32>,
    },
    Manual {
        request_description: String,
    },
}

impl SessionDetail {
    pub fn assemble(record: SessionRecord, comments: Vec<Comment>) -> Self {
        let comments = comments.into_iter().map(CommentResponse::from).collect();
        match record {
            SessionRecord::Chat(chat) => Self {
                id: chat.id,
                kind: SessionKind::Chat,
                name: chat.name,
                contact: chat.contact,
                event_at: to_iso(chat.event_at),
                severity: chat.severity,
                category: chat.category,
                triaging_confirmed: chat.triaging_confirmed,
                mark_as_complete: chat.mark_as_complete,
                action_taken_notes: chat.action_taken_notes,
                content: SessionContent::Chat {
                    transcript: chat.transcript,
                    summary: chat.summary,
                    flag: chat.flag,
                    duration_seconds: chat.duration_seconds,
                },
                comments,
            },
            SessionRecord::Manual(manual) => Self {
                id: manual.id,
                kind: SessionKind::Manual,
                name: manual.name,
                contact: manual.contact,
                event_at: to_iso(manual.event_at),
                severity: manual.severity,
                category: manual.category,
                triaging_confirmed: manual.triaging_confirmed,
                mark_as_complete: manual.mark_as_complete,
                action_taken_notes: manual.action_taken_notes,
                content: SessionContent::Manual {
                    request_description: manual.request_description,
                },
                comments,
            },
        }
    }
}

pub async fn load_session_detail(
    store: &dyn RecordStore,
    kind: SessionKind,
    id: Uuid,
) -> StoreResult<SessionDetail> {
    let (record, comments) = store.session_with_comments(kind, id).await?;
    Ok(SessionDetail::assemble(record, comments))
}

/// Folds left-join rows (one per comment, or a single row with no comment)
/// into the record and its comment list. `None` when there are no rows.
pub(crate) fn group_joined_rows<R>(rows: Vec<(R, Option<Comment>)>) -> Option<(R, Vec<Comment>)> {
    let mut rows = rows.into_iter();
    let (record, first) = rows.next()?;
    let comments = first
        .into_iter()
        .chain(rows.filter_map(|(_, comment)| comment))
        .collect();
    Some((record, comments))
}
