//! Resource addressing: JSON-pointer paths partitioned by a resource-type tag.
//!
//! Pointer rules:
//! - `""` and `"/"` denote the root.
//! - Otherwise the text starts with `/`; segments are separated by `/` and
//!   must not be empty.
//! - `~1` decodes to `/` and `~0` to `~`; any other `~` sequence is rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TwinGuardError};
use crate::model::permission::{Permission, Permissions};

/// Default bound on the number of path segments accepted at the boundary.
pub const DEFAULT_MAX_PATH_DEPTH: usize = 64;

/// A hierarchical path; the empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePath {
    segments: Vec<String>,
}

impl ResourcePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from already-decoded segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.iter().any(String::is_empty) {
            return Err(TwinGuardError::InvalidResourceKey(
                "path segments must not be empty".into(),
            ));
        }
        Ok(Self { segments })
    }

    /// Parse JSON-pointer text.
    pub fn parse(pointer: &str) -> Result<Self> {
        if pointer.is_empty() || pointer == "/" {
            return Ok(Self::root());
        }
        let rest = pointer.strip_prefix('/').ok_or_else(|| {
            TwinGuardError::InvalidResourceKey(format!("path must start with '/': {pointer}"))
        })?;

        let mut segments = Vec::new();
        for raw in rest.split('/') {
            if raw.is_empty() {
                return Err(TwinGuardError::InvalidResourceKey(format!(
                    "empty path segment in: {pointer}"
                )));
            }
            segments.push(unescape(raw, pointer)?);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path of a direct child.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Concatenate `other` below this path.
    pub fn join(&self, other: &ResourcePath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// True iff this path's segments are a prefix of `other`'s (a path is its own ancestor).
    pub fn is_ancestor_of(&self, other: &ResourcePath) -> bool {
        other.segments.starts_with(&self.segments)
    }
}

fn unescape(raw: &str, pointer: &str) -> Result<String> {
    if !raw.contains('~') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => {
                return Err(TwinGuardError::InvalidResourceKey(format!(
                    "invalid '~' escape in: {pointer}"
                )))
            }
        }
    }
    Ok(out)
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for s in &self.segments {
            write!(f, "/{}", s.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl FromStr for ResourcePath {
    type Err = TwinGuardError;

    fn from_str(s: &str) -> Result<Self> {
        ResourcePath::parse(s)
    }
}

impl TryFrom<String> for ResourcePath {
    type Error = TwinGuardError;

    fn try_from(value: String) -> Result<Self> {
        ResourcePath::parse(&value)
    }
}

impl From<ResourcePath> for String {
    fn from(p: ResourcePath) -> Self {
        p.to_string()
    }
}

/// Resource-type tag plus path, written `type:/path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey {
    resource_type: String,
    path: ResourcePath,
}

impl ResourceKey {
    pub fn new(resource_type: impl Into<String>, path: ResourcePath) -> Result<Self> {
        let resource_type = resource_type.into();
        validate_type(&resource_type)?;
        Ok(Self { resource_type, path })
    }

    /// For tags that are compile-time constants known to be valid.
    pub(crate) fn new_unchecked(resource_type: &'static str, path: ResourcePath) -> Self {
        Self {
            resource_type: resource_type.to_string(),
            path,
        }
    }

    /// Parse `type:/path` (split at the first `:`).
    pub fn parse(s: &str) -> Result<Self> {
        let (ty, pointer) = s.split_once(':').ok_or_else(|| {
            TwinGuardError::InvalidResourceKey(format!("expected type:/path, got: {s}"))
        })?;
        ResourceKey::new(ty, ResourcePath::parse(pointer)?)
    }

    /// Root key of a resource type.
    pub fn root(resource_type: impl Into<String>) -> Result<Self> {
        ResourceKey::new(resource_type, ResourcePath::root())
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Same type, one segment deeper.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        Self {
            resource_type: self.resource_type.clone(),
            path: self.path.child(segment),
        }
    }
}

fn validate_type(ty: &str) -> Result<()> {
    if ty.is_empty() {
        return Err(TwinGuardError::InvalidResourceKey("resource type must not be empty".into()));
    }
    if ty.contains(':') || ty.contains('/') {
        return Err(TwinGuardError::InvalidResourceKey(format!(
            "resource type must not contain ':' or '/': {ty}"
        )));
    }
    Ok(())
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.path)
    }
}

impl FromStr for ResourceKey {
    type Err = TwinGuardError;

    fn from_str(s: &str) -> Result<Self> {
        ResourceKey::parse(s)
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = TwinGuardError;

    fn try_from(value: String) -> Result<Self> {
        ResourceKey::parse(&value)
    }
}

impl From<ResourceKey> for String {
    fn from(k: ResourceKey) -> Self {
        k.to_string()
    }
}

/// Boundary checks applied to resource keys arriving with a request.
#[derive(Debug, Clone)]
pub struct KeyLimits {
    /// Accepted type tags; empty accepts any non-empty tag.
    pub resource_types: Vec<String>,
    pub max_path_depth: usize,
}

impl Default for KeyLimits {
    fn default() -> Self {
        Self {
            resource_types: Vec::new(),
            max_path_depth: DEFAULT_MAX_PATH_DEPTH,
        }
    }
}

impl KeyLimits {
    pub fn check(&self, key: &ResourceKey) -> Result<()> {
        self.check_type(key.resource_type())?;
        if key.path().len() > self.max_path_depth {
            return Err(TwinGuardError::InvalidResourceKey(format!(
                "path depth {} exceeds limit {}",
                key.path().len(),
                self.max_path_depth
            )));
        }
        Ok(())
    }

    pub fn check_type(&self, ty: &str) -> Result<()> {
        validate_type(ty)?;
        if !self.resource_types.is_empty() && !self.resource_types.iter().any(|t| t == ty) {
            return Err(TwinGuardError::InvalidResourceKey(format!(
                "unknown resource type: {ty}"
            )));
        }
        Ok(())
    }

    /// Parse and check a `type:/path` key in one step.
    pub fn parse_key(&self, s: &str) -> Result<ResourceKey> {
        let key = ResourceKey::parse(s)?;
        self.check(&key)?;
        Ok(key)
    }
}

/// One statement of an entry: permissions granted and revoked at a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    key: ResourceKey,
    granted: Permissions,
    revoked: Permissions,
}

impl Resource {
    /// Fails if a permission is both granted and revoked.
    pub fn new(key: ResourceKey, granted: Permissions, revoked: Permissions) -> Result<Self> {
        let overlap = granted.intersection(revoked);
        if !overlap.is_empty() {
            return Err(TwinGuardError::MalformedPolicy(format!(
                "resource {key} both grants and revokes {overlap}"
            )));
        }
        Ok(Self { key, granted, revoked })
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn granted(&self) -> Permissions {
        self.granted
    }

    pub fn revoked(&self) -> Permissions {
        self.revoked
    }

    pub fn grants(&self, p: Permission) -> bool {
        self.granted.contains(p)
    }

    pub fn revokes(&self, p: Permission) -> bool {
        self.revoked.contains(p)
    }
}
