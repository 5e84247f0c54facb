//! Unified session listing.
//!
//! Chat and manual records are merged into one relation with `UNION ALL`
//! (never a deduplicating `UNION`: rows from the two tables are always
//! distinct), filtered, ordered newest first and sliced into pages.
//!
//! Ordering is `event_at DESC, id DESC, kind ASC`. The id and kind keys only
//! break ties between rows sharing a timestamp so pages never overlap.

use thiserror::Error;
use tracing::debug;

use crate::filter::{Predicate, SessionFilter};
use crate::session::{SessionKind, SessionSummary};
use crate::store::{RecordStore, StoreError};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("page must be at least 1, got {0}")]
    InvalidPage(i64),
    #[error("limit must be between 1 and 100, got {0}")]
    InvalidLimit(i64),
    #[error("page is out of range")]
    OffsetOverflow,
    #[error("listing unavailable: {0}")]
    Unavailable(#[from] StoreError),
}

/// Validated pagination parameters. Out-of-range values are rejected rather
/// than clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
    offset: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, ListingError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        if page < 1 {
            return Err(ListingError::InvalidPage(page));
        }

        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ListingError::InvalidLimit(limit));
        }

        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or(ListingError::OffsetOverflow)?;

        Ok(Self {
            page,
            limit,
            offset,
        })
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn window(&self) -> PageWindow {
        PageWindow {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPage {
    pub total_count: i64,
    pub records: Vec<SessionSummary>,
}

/// One page of the merged relation plus the number of rows matching the
/// filter before pagination. Any store failure fails the whole listing.
pub async fn list_sessions(
    store: &dyn RecordStore,
    filter: &SessionFilter,
    page: PageRequest,
) -> Result<SessionPage, ListingError> {
    let window = page.window();
    debug!(
        page = page.page(),
        limit = window.limit,
        offset = window.offset,
        predicates = filter.predicates().len(),
        "listing sessions"
    );

    let (total_count, records) = store.page_sessions(filter, window).await?;
    Ok(SessionPage {
        total_count,
        records,
    })
}

/// A bind value for a rendered query, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    TextArray(Vec<String>),
    Bool(bool),
    BigInt(i64),
}

/// SQL text with `$n` placeholders and the values bound to them. Filter
/// values only ever travel through `params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

const SUMMARY_COLUMNS: &str =
    "id, kind, name, contact, event_at, severity, category, triaging_confirmed, mark_as_complete, flag";

const CHAT_PROJECTION: &str = "SELECT id, 'chat'::text AS kind, name, contact, event_at, \
     severity, category, triaging_confirmed, mark_as_complete, flag FROM chat_records";

const MANUAL_PROJECTION: &str = "SELECT id, 'manual'::text AS kind, name, contact, event_at, \
     severity, category, triaging_confirmed, mark_as_complete, NULL::boolean AS flag \
     FROM manual_records";

const ORDERING: &str = "ORDER BY event_at DESC, id DESC, kind ASC";

fn merged_relation(kinds: &[SessionKind]) -> String {
    let kinds = if kinds.is_empty() {
        &SessionKind::ALL[..]
    } else {
        kinds
    };

    kinds
        .iter()
        .map(|kind| match kind {
            SessionKind::Chat => CHAT_PROJECTION,
            SessionKind::Manual => MANUAL_PROJECTION,
        })
        .collect::<Vec<_>>()
        .join(" UNION ALL ")
}

fn render_predicates(predicates: &[Predicate]) -> (String, Vec<SqlParam>) {
    let mut clauses = Vec::with_capacity(predicates.len());
    let mut params = Vec::with_capacity(predicates.len());

    for predicate in predicates {
        let slot = params.len() + 1;
        match predicate {
            Predicate::CategoryIn(categories) => {
                clauses.push(format!("category = ANY(${slot})"));
                params.push(SqlParam::TextArray(categories.clone()));
            }
            Predicate::CategoryIs(category) => {
                clauses.push(format!("category = ${slot}"));
                params.push(SqlParam::Text(category.clone()));
            }
            Predicate::NameContains(fragment) => {
                clauses.push(format!("name ILIKE ${slot}"));
                params.push(SqlParam::Text(format!("%{}%", escape_like(fragment))));
            }
            Predicate::TriagingConfirmed(confirmed) => {
                clauses.push(format!("triaging_confirmed = ${slot}"));
                params.push(SqlParam::Bool(*confirmed));
            }
            Predicate::Completed(completed) => {
                clauses.push(format!("mark_as_complete = ${slot}"));
                params.push(SqlParam::Bool(*completed));
            }
        }
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

/// Escapes LIKE wildcards so the fragment is matched literally.
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for ch in fragment.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub fn count_query(filter: &SessionFilter) -> MergedQuery {
    let (where_clause, params) = render_predicates(filter.predicates());
    MergedQuery {
        sql: format!(
            "SELECT COUNT(*) AS total FROM ({}) AS sessions{where_clause}",
            merged_relation(filter.kinds())
        ),
        params,
    }
}

pub fn page_query(filter: &SessionFilter, window: PageWindow) -> MergedQuery {
    let (where_clause, mut params) = render_predicates(filter.predicates());
    let limit_slot = params.len() + 1;
    let offset_slot = params.len() + 2;
    params.push(SqlParam::BigInt(window.limit));
    params.push(SqlParam::BigInt(window.offset));

    MergedQuery {
        sql: format!(
            "SELECT {SUMMARY_COLUMNS} FROM ({}) AS sessions{where_clause} {ORDERING} \
             LIMIT ${limit_slot} OFFSET ${offset_slot}",
            merged_relation(filter.kinds())
        ),
        params,
    }
}
