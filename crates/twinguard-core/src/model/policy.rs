use std::collections::{BTreeSet, HashSet};

use crate::error::{Result, TwinGuardError};
use crate::model::resource::{Resource, ResourceKey};
use crate::model::subject::Subject;

/// One labelled rule set: the subjects it applies to and its resource statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyEntry {
    label: String,
    subjects: Vec<Subject>,
    resources: Vec<Resource>,
}

impl PolicyEntry {
    /// Fails on an empty label, a repeated subject, or a repeated resource key.
    pub fn new(
        label: impl Into<String>,
        subjects: impl IntoIterator<Item = Subject>,
        resources: impl IntoIterator<Item = Resource>,
    ) -> Result<Self> {
        let label = label.into();
        if label.is_empty() {
            return Err(TwinGuardError::MalformedPolicy("entry label must not be empty".into()));
        }

        let subjects: Vec<Subject> = subjects.into_iter().collect();
        let mut seen = HashSet::with_capacity(subjects.len());
        for s in &subjects {
            if !seen.insert(s) {
                return Err(TwinGuardError::MalformedPolicy(format!(
                    "entry {label}: duplicate subject {s}"
                )));
            }
        }

        let resources: Vec<Resource> = resources.into_iter().collect();
        let mut keys: HashSet<&ResourceKey> = HashSet::with_capacity(resources.len());
        for r in &resources {
            if !keys.insert(r.key()) {
                return Err(TwinGuardError::MalformedPolicy(format!(
                    "entry {label}: duplicate resource {}",
                    r.key()
                )));
            }
        }

        Ok(Self { label, subjects, resources })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, key: &ResourceKey) -> Option<&Resource> {
        self.resources.iter().find(|r| r.key() == key)
    }
}

/// An immutable policy snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    id: String,
    revision: Option<u64>,
    entries: Vec<PolicyEntry>,
}

impl Policy {
    /// Fails on an empty id or a repeated entry label.
    pub fn new(id: impl Into<String>, entries: impl IntoIterator<Item = PolicyEntry>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(TwinGuardError::MalformedPolicy("policy id must not be empty".into()));
        }

        let entries: Vec<PolicyEntry> = entries.into_iter().collect();
        let mut labels = HashSet::with_capacity(entries.len());
        for e in &entries {
            if !labels.insert(e.label()) {
                return Err(TwinGuardError::MalformedPolicy(format!(
                    "policy {id}: duplicate entry label {}",
                    e.label()
                )));
            }
        }

        Ok(Self { id, revision: None, entries })
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    pub fn entries(&self) -> &[PolicyEntry] {
        &self.entries
    }

    pub fn entry(&self, label: &str) -> Option<&PolicyEntry> {
        self.entries.iter().find(|e| e.label() == label)
    }

    /// Every distinct subject named by any entry.
    pub fn subjects(&self) -> BTreeSet<Subject> {
        self.entries
            .iter()
            .flat_map(|e| e.subjects().iter().cloned())
            .collect()
    }
}
