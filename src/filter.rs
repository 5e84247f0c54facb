//! Compiles listing query parameters into a predicate set that applies
//! identically to chat and manual records.

use crate::session::{SessionKind, SessionSummary, DEFAULT_CATEGORY};

pub const DEFAULT_ACTIVE_CATEGORIES: &[&str] = &["Social Care", "EIP", "CAFD", DEFAULT_CATEGORY];

#[derive(Debug, Clone, Default)]
pub struct SessionFilterRequest {
    pub team: Option<String>,
    pub search: Option<String>,
    pub triaging_confirmed: Option<bool>,
    pub history: Option<bool>,
    pub kind: Option<SessionKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Category must be one of the listed labels.
    CategoryIn(Vec<String>),
    CategoryIs(String),
    /// Case-insensitive substring match on the record name.
    NameContains(String),
    TriagingConfirmed(bool),
    Completed(bool),
}

impl Predicate {
    pub fn matches(&self, record: &SessionSummary) -> bool {
        match self {
            Predicate::CategoryIn(categories) => {
                categories.iter().any(|category| *category == record.category)
            }
            Predicate::CategoryIs(category) => *category == record.category,
            Predicate::NameContains(fragment) => record
                .name
                .to_lowercase()
                .contains(&fragment.to_lowercase()),
            Predicate::TriagingConfirmed(expected) => record.triaging_confirmed == *expected,
            Predicate::Completed(expected) => record.mark_as_complete == *expected,
        }
    }
}

/// Conjunction of predicates plus the record kinds to draw from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFilter {
    kinds: Vec<SessionKind>,
    predicates: Vec<Predicate>,
}

impl SessionFilter {
    /// Never fails: unspecified constraints are simply left out, except that
    /// a missing team restricts the result to `active_categories`.
    pub fn compile(request: &SessionFilterRequest, active_categories: &[String]) -> Self {
        let mut predicates = Vec::new();

        match non_blank(request.team.as_deref()) {
            Some(team) => predicates.push(Predicate::CategoryIs(team.trim().to_string())),
            None => predicates.push(Predicate::CategoryIn(active_categories.to_vec())),
        }

        if let Some(fragment) = non_blank(request.search.as_deref()) {
            predicates.push(Predicate::NameContains(fragment.to_string()));
        }

        if let Some(confirmed) = request.triaging_confirmed {
            predicates.push(Predicate::TriagingConfirmed(confirmed));
        }

        if let Some(completed) = request.history {
            predicates.push(Predicate::Completed(completed));
        }

        let kinds = match request.kind {
            Some(kind) => vec![kind],
            None => SessionKind::ALL.to_vec(),
        };

        Self { kinds, predicates }
    }

    pub fn kinds(&self) -> &[SessionKind] {
        &self.kinds
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn matches(&self, record: &SessionSummary) -> bool {
        self.kinds.contains(&record.kind)
            && self
                .predicates
                .iter()
                .all(|predicate| predicate.matches(record))
    }
}

/// Blank values count as unspecified. Non-blank values are returned as given.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

pub fn default_active_categories() -> Vec<String> {
    DEFAULT_ACTIVE_CATEGORIES
        .iter()
        .map(|category| category.to_string())
        .collect()
}
