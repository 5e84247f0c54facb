//! In-process [`RecordStore`] used by unit tests.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::filter::SessionFilter;
use crate::listing::PageWindow;
use crate::models::{ChatRecord, Comment, ManualRecord};
use crate::session::{NewSession, SessionChanges, SessionKind, SessionRecord, SessionSummary};

#[derive(Default)]
struct Tables {
    chats: Vec<ChatRecord>,
    manuals: Vec<ManualRecord>,
    comments: Vec<Comment>,
    unavailable: bool,
}

#[derive(Default)]
pub struct MemoryRecordStore {
    tables: Mutex<Tables>,
}

impl MemoryRecordStore {
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.tables.lock().await.unavailable = unavailable;
    }

    pub async fn seed_chat(&self, name: &str, category: &str, event_at: NaiveDateTime) -> Uuid {
        let now = Utc::now().naive_utc();
        let record = ChatRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            contact: "caller@example.org".to_string(),
            event_at,
            duration_seconds: Some(300),
            transcript: "Caller asked for help".to_string(),
            summary: "Help requested".to_string(),
            category: category.to_string(),
            severity: "Medium".to_string(),
            social_care_eligibility: None,
            suggested_course_of_action: None,
            next_steps: None,
            contact_request: None,
            status: None,
            rating: None,
            feedback: None,
            flag: Some(false),
            triaging_confirmed: false,
            mark_as_complete: false,
            action_taken_notes: None,
            created_at: now,
            updated_at: now,
        };
        let id = record.id;
        self.tables.lock().await.chats.push(record);
        id
    }

    pub async fn seed_manual(&self, name: &str, category: &str, event_at: NaiveDateTime) -> Uuid {
        let now = Utc::now().naive_utc();
        let record = ManualRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            contact: "caller@example.org".to_string(),
            event_at,
            request_description: "Walk-in request".to_string(),
            category: category.to_string(),
            severity: "Medium".to_string(),
            triaging_confirmed: false,
            mark_as_complete: false,
            action_taken_notes: None,
            created_at: now,
            updated_at: now,
        };
        let id = record.id;
        self.tables.lock().await.manuals.push(record);
        id
    }
}

impl Tables {
    fn check(&self) -> StoreResult<()> {
        if self.unavailable {
            Err(StoreError::Pool("store marked unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    fn find(&self, kind: SessionKind, id: Uuid) -> Option<SessionRecord> {
        match kind {
            SessionKind::Chat => self
                .chats
                .iter()
                .find(|record| record.id == id)
                .cloned()
                .map(SessionRecord::Chat),
            SessionKind::Manual => self
                .manuals
                .iter()
                .find(|record| record.id == id)
                .cloned()
                .map(SessionRecord::Manual),
        }
    }

    fn matching(&self, filter: &SessionFilter) -> Vec<SessionSummary> {
        let mut rows: Vec<SessionSummary> = self
            .chats
            .iter()
            .cloned()
            .map(SessionRecord::Chat)
            .chain(self.manuals.iter().cloned().map(SessionRecord::Manual))
            .map(|record| record.summary())
            .filter(|summary| filter.matches(summary))
            .collect();
        rows.sort_by(|a, b| {
            b.event_at
                .cmp(&a.event_at)
                .then_with(|| b.id.cmp(&a.id))
                .then_with(|| a.kind.cmp(&b.kind))
        });
        rows
    }

    fn comments_for(&self, session_id: Uuid) -> Vec<Comment> {
        self.comments
            .iter()
            .filter(|comment| comment.session_id == session_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_session(&self, session: NewSession) -> StoreResult<Uuid> {
        let mut tables = self.tables.lock().await;
        tables.check()?;
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        match session {
            NewSession::Chat(chat) => {
                let row = chat.into_row(id);
                tables.chats.push(ChatRecord {
                    id,
                    name: row.name,
                    contact: row.contact,
                    event_at: row.event_at,
                    duration_seconds: row.duration_seconds,
                    transcript: row.transcript,
                    summary: row.summary,
                    category: row.category,
                    severity: row.severity,
                    social_care_eligibility: row.social_care_eligibility,
                    suggested_course_of_action: row.suggested_course_of_action,
                    next_steps: row.next_steps,
                    contact_request: row.contact_request,
                    status: row.status,
                    rating: row.rating,
                    feedback: row.feedback,
                    flag: row.flag,
                    triaging_confirmed: false,
                    mark_as_complete: false,
                    action_taken_notes: None,
                    created_at: now,
                    updated_at: now,
                });
            }
            NewSession::Manual(manual) => {
                let row = manual.into_row(id);
                tables.manuals.push(ManualRecord {
                    id,
                    name: row.name,
                    contact: row.contact,
                    event_at: row.event_at,
                    request_description: row.request_description,
                    category: row.category,
                    severity: row.severity,
                    triaging_confirmed: false,
                    mark_as_complete: false,
                    action_taken_notes: None,
                    created_at: now,
                    updated_at: now,
                });
            }
        }
        Ok(id)
    }

    async fn get_session(&self, kind: SessionKind, id: Uuid) -> StoreResult<SessionRecord> {
        let tables = self.tables.lock().await;
        tables.check()?;
        tables.find(kind, id).ok_or(StoreError::NotFound)
    }

    async fn update_session(
        &self,
        kind: SessionKind,
        id: Uuid,
        changes: SessionChanges,
    ) -> StoreResult<usize> {
        let mut tables = self.tables.lock().await;
        tables.check()?;
        let now = Utc::now().naive_utc();
        let confirms = changes.confirms_triage();

        macro_rules! apply {
            ($record:expr) => {{
                if let Some(severity) = changes.severity.clone() {
                    $record.severity = severity;
                }
                if let Some(category) = changes.category.clone() {
                    $record.category = category;
                }
                if confirms {
                    $record.triaging_confirmed = true;
                }
                if let Some(action) = changes.action.clone() {
                    $record.action_taken_notes = Some(action.notes);
                    $record.mark_as_complete = action.mark_as_complete;
                }
                $record.updated_at = now;
            }};
        }

        let mut affected = 0;
        match kind {
            SessionKind::Chat => {
                for record in tables.chats.iter_mut().filter(|record| record.id == id) {
                    apply!(record);
                    affected += 1;
                }
            }
            SessionKind::Manual => {
                for record in tables.manuals.iter_mut().filter(|record| record.id == id) {
                    apply!(record);
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn count_sessions(&self, filter: &SessionFilter) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        tables.check()?;
        Ok(tables.matching(filter).len() as i64)
    }

    async fn scan_sessions(
        &self,
        filter: &SessionFilter,
        window: PageWindow,
    ) -> StoreResult<Vec<SessionSummary>> {
        let tables = self.tables.lock().await;
        tables.check()?;
        Ok(tables
            .matching(filter)
            .into_iter()
            .skip(window.offset as usize)
            .take(window.limit as usize)
            .collect())
    }

    async fn session_with_comments(
        &self,
        kind: SessionKind,
        id: Uuid,
    ) -> StoreResult<(SessionRecord, Vec<Comment>)> {
        let tables = self.tables.lock().await;
        tables.check()?;
        let record = tables.find(kind, id).ok_or(StoreError::NotFound)?;
        Ok((record, tables.comments_for(id)))
    }

    async fn comments_for(&self, session_id: Uuid) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.lock().await;
        tables.check()?;
        Ok(tables.comments_for(session_id))
    }

    async fn insert_comment(
        &self,
        kind: SessionKind,
        session_id: Uuid,
        body: String,
        author_email: String,
    ) -> StoreResult<Comment> {
        let mut tables = self.tables.lock().await;
        tables.check()?;
        if tables.find(kind, session_id).is_none() {
            return Err(StoreError::NotFound);
        }
        let comment = Comment {
            id: tables.comments.len() as i32 + 1,
            session_id,
            body,
            author_email,
            created_at: Utc::now().naive_utc(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }
}
