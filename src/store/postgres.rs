use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use diesel::dsl::exists;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::sql_types::{self, Array, BigInt, Bool, Nullable, Text, Timestamptz};
use diesel::PgConnection;
use tracing::debug;
use uuid::Uuid;

use super::{RecordStore, StoreError, StoreResult};
use crate::db::PgPool;
use crate::detail::group_joined_rows;
use crate::filter::SessionFilter;
use crate::listing::{self, MergedQuery, PageWindow, SqlParam};
use crate::models::{ChatRecord, Comment, ManualRecord, NewComment};
use crate::schema::{chat_records, comments, manual_records};
use crate::session::{NewSession, SessionChanges, SessionKind, SessionRecord, SessionSummary};

/// Diesel-backed store. Queries run on the blocking pool so request tasks
/// never hold a runtime thread while waiting on Postgres.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn run<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| StoreError::Pool(err.to_string()))?;
            f(&mut conn)
        })
        .await?
    }
}

#[derive(AsChangeset)]
#[diesel(table_name = chat_records)]
struct ChatRecordChangeset<'a> {
    severity: Option<&'a str>,
    category: Option<&'a str>,
    triaging_confirmed: Option<bool>,
    action_taken_notes: Option<&'a str>,
    mark_as_complete: Option<bool>,
    updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = manual_records)]
struct ManualRecordChangeset<'a> {
    severity: Option<&'a str>,
    category: Option<&'a str>,
    triaging_confirmed: Option<bool>,
    action_taken_notes: Option<&'a str>,
    mark_as_complete: Option<bool>,
    updated_at: NaiveDateTime,
}

#[derive(QueryableByName)]
struct MergedSessionRow {
    #[diesel(sql_type = sql_types::Uuid)]
    id: Uuid,
    #[diesel(sql_type = Text)]
    kind: String,
    #[diesel(sql_type = Text)]
    name: String,
    #[diesel(sql_type = Text)]
    contact: String,
    #[diesel(sql_type = Timestamptz)]
    event_at: NaiveDateTime,
    #[diesel(sql_type = Text)]
    severity: String,
    #[diesel(sql_type = Text)]
    category: String,
    #[diesel(sql_type = Bool)]
    triaging_confirmed: bool,
    #[diesel(sql_type = Bool)]
    mark_as_complete: bool,
    #[diesel(sql_type = Nullable<Bool>)]
    flag: Option<bool>,
}

impl TryFrom<MergedSessionRow> for SessionSummary {
    type Error = StoreError;

    fn try_from(row: MergedSessionRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<SessionKind>()
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        Ok(SessionSummary {
            id: row.id,
            kind,
            name: row.name,
            contact: row.contact,
            event_at: row.event_at,
            severity: row.severity,
            category: row.category,
            triaging_confirmed: row.triaging_confirmed,
            mark_as_complete: row.mark_as_complete,
            flag: row.flag,
        })
    }
}

#[derive(QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    total: i64,
}

fn prepare(query: MergedQuery) -> BoxedSqlQuery<'static, Pg, SqlQuery> {
    query.params.into_iter().fold(
        diesel::sql_query(query.sql).into_boxed::<Pg>(),
        |boxed, param| match param {
            SqlParam::Text(value) => boxed.bind::<Text, _>(value),
            SqlParam::TextArray(values) => boxed.bind::<Array<Text>, _>(values),
            SqlParam::Bool(value) => boxed.bind::<Bool, _>(value),
            SqlParam::BigInt(value) => boxed.bind::<BigInt, _>(value),
        },
    )
}

fn count_merged(conn: &mut PgConnection, filter: &SessionFilter) -> StoreResult<i64> {
    let row: CountRow = prepare(listing::count_query(filter)).get_result(conn)?;
    Ok(row.total)
}

fn scan_merged(
    conn: &mut PgConnection,
    filter: &SessionFilter,
    window: PageWindow,
) -> StoreResult<Vec<SessionSummary>> {
    let rows: Vec<MergedSessionRow> = prepare(listing::page_query(filter, window)).load(conn)?;
    rows.into_iter().map(SessionSummary::try_from).collect()
}

fn session_exists(conn: &mut PgConnection, kind: SessionKind, id: Uuid) -> StoreResult<bool> {
    let found = match kind {
        SessionKind::Chat => {
            diesel::select(exists(chat_records::table.find(id))).get_result::<bool>(conn)?
        }
        SessionKind::Manual => {
            diesel::select(exists(manual_records::table.find(id))).get_result::<bool>(conn)?
        }
    };
    Ok(found)
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_session(&self, session: NewSession) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        match session {
            NewSession::Chat(chat) => {
                let row = chat.into_row(id);
                self.run(move |conn| {
                    diesel::insert_into(chat_records::table)
                        .values(&row)
                        .execute(conn)?;
                    Ok(id)
                })
                .await
            }
            NewSession::Manual(manual) => {
                let row = manual.into_row(id);
                self.run(move |conn| {
                    diesel::insert_into(manual_records::table)
                        .values(&row)
                        .execute(conn)?;
                    Ok(id)
                })
                .await
            }
        }
    }

    async fn get_session(&self, kind: SessionKind, id: Uuid) -> StoreResult<SessionRecord> {
        self.run(move |conn| {
            let record = match kind {
                SessionKind::Chat => SessionRecord::Chat(
                    chat_records::table
                        .find(id)
                        .select(ChatRecord::as_select())
                        .first(conn)?,
                ),
                SessionKind::Manual => SessionRecord::Manual(
                    manual_records::table
                        .find(id)
                        .select(ManualRecord::as_select())
                        .first(conn)?,
                ),
            };
            Ok(record)
        })
        .await
    }

    async fn update_session(
        &self,
        kind: SessionKind,
        id: Uuid,
        changes: SessionChanges,
    ) -> StoreResult<usize> {
        let now = Utc::now().naive_utc();
        self.run(move |conn| {
            let triaging_confirmed = changes.confirms_triage().then_some(true);
            let notes = changes.action.as_ref().map(|action| action.notes.as_str());
            let complete = changes.action.as_ref().map(|action| action.mark_as_complete);

            let affected = match kind {
                SessionKind::Chat => diesel::update(chat_records::table.find(id))
                    .set(&ChatRecordChangeset {
                        severity: changes.severity.as_deref(),
                        category: changes.category.as_deref(),
                        triaging_confirmed,
                        action_taken_notes: notes,
                        mark_as_complete: complete,
                        updated_at: now,
                    })
                    .execute(conn)?,
                SessionKind::Manual => diesel::update(manual_records::table.find(id))
                    .set(&ManualRecordChangeset {
                        severity: changes.severity.as_deref(),
                        category: changes.category.as_deref(),
                        triaging_confirmed,
                        action_taken_notes: notes,
                        mark_as_complete: complete,
                        updated_at: now,
                    })
                    .execute(conn)?,
            };
            debug!(kind = %kind, session_id = %id, affected, "updated session record");
            Ok(affected)
        })
        .await
    }

    async fn count_sessions(&self, filter: &SessionFilter) -> StoreResult<i64> {
        let filter = filter.clone();
        self.run(move |conn| count_merged(conn, &filter)).await
    }

    async fn scan_sessions(
        &self,
        filter: &SessionFilter,
        window: PageWindow,
    ) -> StoreResult<Vec<SessionSummary>> {
        let filter = filter.clone();
        self.run(move |conn| scan_merged(conn, &filter, window))
            .await
    }

    /// Count and page are read inside one repeatable-read transaction, so
    /// both observe the same snapshot.
    async fn page_sessions(
        &self,
        filter: &SessionFilter,
        window: PageWindow,
    ) -> StoreResult<(i64, Vec<SessionSummary>)> {
        let filter = filter.clone();
        self.run(move |conn| {
            conn.build_transaction()
                .repeatable_read()
                .read_only()
                .run(|conn| {
                    let total = count_merged(conn, &filter)?;
                    let records = scan_merged(conn, &filter, window)?;
                    Ok::<_, StoreError>((total, records))
                })
        })
        .await
    }

    async fn session_with_comments(
        &self,
        kind: SessionKind,
        id: Uuid,
    ) -> StoreResult<(SessionRecord, Vec<Comment>)> {
        self.run(move |conn| {
            let joined = match kind {
                SessionKind::Chat => {
                    let rows: Vec<(ChatRecord, Option<Comment>)> = chat_records::table
                        .left_join(comments::table.on(comments::session_id.eq(chat_records::id)))
                        .filter(chat_records::id.eq(id))
                        .order(comments::id.asc())
                        .select((ChatRecord::as_select(), Option::<Comment>::as_select()))
                        .load(conn)?;
                    group_joined_rows(rows)
                        .map(|(record, comments)| (SessionRecord::Chat(record), comments))
                }
                SessionKind::Manual => {
                    let rows: Vec<(ManualRecord, Option<Comment>)> = manual_records::table
                        .left_join(
                            comments::table.on(comments::session_id.eq(manual_records::id)),
                        )
                        .filter(manual_records::id.eq(id))
                        .order(comments::id.asc())
                        .select((ManualRecord::as_select(), Option::<Comment>::as_select()))
                        .load(conn)?;
                    group_joined_rows(rows)
                        .map(|(record, comments)| (SessionRecord::Manual(record), comments))
                }
            };
            joined.ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn comments_for(&self, session_id: Uuid) -> StoreResult<Vec<Comment>> {
        self.run(move |conn| {
            let rows = comments::table
                .filter(comments::session_id.eq(session_id))
                .order(comments::id.asc())
                .select(Comment::as_select())
                .load(conn)?;
            Ok(rows)
        })
        .await
    }

    async fn insert_comment(
        &self,
        kind: SessionKind,
        session_id: Uuid,
        body: String,
        author_email: String,
    ) -> StoreResult<Comment> {
        self.run(move |conn| {
            conn.transaction::<Comment, StoreError, _>(|conn| {
                if !session_exists(conn, kind, session_id)? {
                    return Err(StoreError::NotFound);
                }

                let new_comment = NewComment {
                    session_id,
                    body,
                    author_email,
                };
                let comment = diesel::insert_into(comments::table)
                    .values(&new_comment)
                    .returning(Comment::as_returning())
                    .get_result(conn)?;
                Ok(comment)
            })
        })
        .await
    }
}
