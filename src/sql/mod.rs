//! Statement classification.
//!
//! Classifies SQL by its leading keyword so the read and write tools can
//! refuse statements that belong to the other channel, and verifies that
//! read-path queries are structurally free of data modification.

mod readonly;

pub use readonly::verify_read_only;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse kind of a SQL statement, derived solely from its first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    /// `SELECT` or `WITH` queries.
    #[serde(alias = "select")]
    Read,
    Insert,
    Update,
    Delete,
    /// Anything whose first token is not a known keyword.
    Unrecognized,
}

impl StatementKind {
    /// Returns the lowercase name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Returns true for kinds that modify data.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete)
    }

    fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "select" | "with" => Self::Read,
            "insert" => Self::Insert,
            "update" => Self::Update,
            "delete" => Self::Delete,
            _ => Self::Unrecognized,
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Classifies a statement by its leading keyword.
///
/// The statement is trimmed and lower-cased and its first whitespace-delimited
/// token is compared exactly against the known keywords, so `"SelectX ..."` is
/// [`StatementKind::Unrecognized`], not a read.
pub fn classify_statement(sql: &str) -> StatementKind {
    sql.trim()
        .split_whitespace()
        .next()
        .map(|token| StatementKind::from_keyword(&token.to_lowercase()))
        .unwrap_or(StatementKind::Unrecognized)
}

/// The set of statement kinds a tool instance is allowed to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermittedKinds {
    kinds: BTreeSet<StatementKind>,
}

impl PermittedKinds {
    /// Creates a permitted set from the given kinds.
    pub fn new(kinds: impl IntoIterator<Item = StatementKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Updates and deletes, no inserts.
    pub fn update_delete() -> Self {
        Self::new([StatementKind::Update, StatementKind::Delete])
    }

    /// Inserts, updates and deletes.
    pub fn insert_update_delete() -> Self {
        Self::new([
            StatementKind::Insert,
            StatementKind::Update,
            StatementKind::Delete,
        ])
    }

    pub fn contains(&self, kind: StatementKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = StatementKind> + '_ {
        self.kinds.iter().copied()
    }
}

impl fmt::Display for PermittedKinds {
    /// Renders as an English list of keywords, e.g. `INSERT, UPDATE, or DELETE`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.kinds.iter().map(|k| k.to_string()).collect();
        match names.as_slice() {
            [] => write!(f, "no"),
            [only] => write!(f, "{only}"),
            [first, second] => write!(f, "{first} or {second}"),
            [init @ .., last] => write!(f, "{}, or {last}", init.join(", ")),
        }
    }
}
