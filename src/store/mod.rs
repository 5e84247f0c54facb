//! Record store interface.
//!
//! Handlers receive the store as `Arc<dyn RecordStore>` through
//! [`crate::state::AppState`]. Every call acquires its own connection and
//! releases it before returning; failures are surfaced on the first attempt.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::filter::SessionFilter;
use crate::listing::PageWindow;
use crate::models::Comment;
use crate::session::{NewSession, SessionChanges, SessionKind, SessionRecord, SessionSummary};

#[cfg(test)]
pub(crate) mod memory;
mod postgres;

pub use postgres::PgRecordStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error("database error: {0}")]
    Query(diesel::result::Error),
    #[error("unexpected row contents: {0}")]
    Decode(String),
    #[error("store task failed: {0}")]
    Task(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => StoreError::NotFound,
            other => StoreError::Query(other),
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(value: tokio::task::JoinError) -> Self {
        StoreError::Task(value.to_string())
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn insert_session(&self, session: NewSession) -> StoreResult<Uuid>;

    async fn get_session(&self, kind: SessionKind, id: Uuid) -> StoreResult<SessionRecord>;

    /// Returns the number of rows touched; zero means the id is unknown for
    /// `kind`.
    async fn update_session(
        &self,
        kind: SessionKind,
        id: Uuid,
        changes: SessionChanges,
    ) -> StoreResult<usize>;

    async fn count_sessions(&self, filter: &SessionFilter) -> StoreResult<i64>;

    /// Rows of the merged relation matching `filter`, newest first.
    async fn scan_sessions(
        &self,
        filter: &SessionFilter,
        window: PageWindow,
    ) -> StoreResult<Vec<SessionSummary>>;

    /// Total match count and one page.
    ///
    /// The default runs the count and the scan as two independent reads, so
    /// a concurrent write may make the total disagree with the page.
    /// Implementations that can read both from one snapshot should override.
    async fn page_sessions(
        &self,
        filter: &SessionFilter,
        window: PageWindow,
    ) -> StoreResult<(i64, Vec<SessionSummary>)> {
        let total = self.count_sessions(filter).await?;
        let records = self.scan_sessions(filter, window).await?;
        Ok((total, records))
    }

    /// The record and its comments in insertion order.
    async fn session_with_comments(
        &self,
        kind: SessionKind,
        id: Uuid,
    ) -> StoreResult<(SessionRecord, Vec<Comment>)>;

    async fn comments_for(&self, session_id: Uuid) -> StoreResult<Vec<Comment>>;

    /// Fails with [`StoreError::NotFound`] when no record of `kind` has
    /// `session_id`.
    async fn insert_comment(
        &self,
        kind: SessionKind,
        session_id: Uuid,
        body: String,
        author_email: String,
    ) -> StoreResult<Comment>;
}
