use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TwinGuardError};

/// An identity of the form `issuer:subject`, compared by exact value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Subject(String);

impl Subject {
    /// Create a subject. The only requirement is a non-empty value.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(TwinGuardError::MalformedPolicy("subject id must not be empty".into()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text before the first `:`, if the subject carries an issuer.
    pub fn issuer(&self) -> Option<&str> {
        self.0.split_once(':').map(|(issuer, _)| issuer)
    }

    /// Local subject identifier (the whole value when there is no issuer).
    pub fn id(&self) -> &str {
        match self.0.split_once(':') {
            Some((_, id)) => id,
            None => &self.0,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Subject {
    type Error = TwinGuardError;

    fn try_from(value: String) -> Result<Self> {
        Subject::new(value)
    }
}

impl From<Subject> for String {
    fn from(s: Subject) -> Self {
        s.0
    }
}

/// The identities a requester presents for one authorization check.
///
/// Built fresh per request by the authentication layer; order is kept as
/// presented, duplicates are ignored for matching.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationContext {
    subjects: Vec<Subject>,
    lookup: HashSet<Subject>,
}

impl AuthorizationContext {
    pub fn new(subjects: impl IntoIterator<Item = Subject>) -> Self {
        let subjects: Vec<Subject> = subjects.into_iter().collect();
        let lookup = subjects.iter().cloned().collect();
        Self { subjects, lookup }
    }

    /// Build a context from raw identity strings; empty strings are rejected.
    pub fn from_ids<I, S>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let subjects = ids
            .into_iter()
            .map(|s| {
                Subject::new(s).map_err(|_| {
                    TwinGuardError::BadRequest("authorization subject must not be empty".into())
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(subjects))
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn contains(&self, subject: &Subject) -> bool {
        self.lookup.contains(subject)
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}
