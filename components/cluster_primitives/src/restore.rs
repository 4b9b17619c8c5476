//! Restore points and restore-point selection

use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One archived, restorable snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePoint {
    pub archive: String,
    /// 1-based position within the archive
    pub index: u32,
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub vertica_version: String,
}

impl RestorePoint {
    pub fn new(archive: impl Into<String>, index: u32, id: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            index,
            id: id.into(),
            timestamp: String::new(),
            vertica_version: String::new(),
        }
    }
}

impl fmt::Display for RestorePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} ({})", self.archive, self.index, self.id)
    }
}

/// How the user picked a restore point inside an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestorePointSelector {
    Id(String),
    Index(u32),
}

impl RestorePointSelector {
    fn matches(&self, point: &RestorePoint) -> bool {
        match self {
            RestorePointSelector::Id(id) => &point.id == id,
            RestorePointSelector::Index(index) => point.index == *index,
        }
    }
}

impl fmt::Display for RestorePointSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestorePointSelector::Id(id) => write!(f, "ID {}", id),
            RestorePointSelector::Index(index) => write!(f, "index {}", index),
        }
    }
}

/// User supplied restore-point selection
///
/// Restore mode is on when `archive` is non-empty. An empty `id` and an
/// `index` of zero both count as "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorePointPolicy {
    pub archive: String,
    pub index: Option<u32>,
    pub id: Option<String>,
}

/// No restore point in the archive matched the selector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("restore point with {selector} not found in archive {archive:?}")]
pub struct RestorePointNotFound {
    pub archive: String,
    pub selector: RestorePointSelector,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestorePointError {
    #[error(transparent)]
    NotFound(#[from] RestorePointNotFound),

    /// Two points in one archive share an id or index. This is a data
    /// problem in communal storage, not a user mistake.
    #[error("found {count} restore points instead of 1: {}", format_points(.points))]
    Ambiguous {
        count: usize,
        points: Vec<RestorePoint>,
    },

    #[error("restore is not enabled or the restore point selector is invalid")]
    NotEnabled,
}

fn format_points(points: &[RestorePoint]) -> String {
    points
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl RestorePointPolicy {
    pub fn by_id(archive: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            index: None,
            id: Some(id.into()),
        }
    }

    pub fn by_index(archive: impl Into<String>, index: u32) -> Self {
        Self {
            archive: archive.into(),
            index: Some(index),
            id: None,
        }
    }

    pub fn is_restore_enabled(&self) -> bool {
        !self.archive.is_empty()
    }

    pub fn has_valid_id(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }

    pub fn has_valid_index(&self) -> bool {
        self.index.is_some_and(|index| index > 0)
    }

    /// Restore mode needs exactly one of id and index
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_restore_enabled() && self.has_valid_id() == self.has_valid_index() {
            return Err(ValidationError::RestorePointSelector);
        }
        Ok(())
    }

    /// The selector the user supplied, if the policy is usable
    pub fn selector(&self) -> Option<RestorePointSelector> {
        if !self.is_restore_enabled() {
            return None;
        }
        match (&self.id, self.index) {
            (Some(id), _) if !id.is_empty() && !self.has_valid_index() => {
                Some(RestorePointSelector::Id(id.clone()))
            }
            (_, Some(index)) if index > 0 && !self.has_valid_id() => {
                Some(RestorePointSelector::Index(index))
            }
            _ => None,
        }
    }

    /// Find the single restore point this policy selects and return its id
    ///
    /// Only points in the policy's archive are considered.
    pub fn resolve(&self, all: &[RestorePoint]) -> Result<String, RestorePointError> {
        let selector = self.selector().ok_or(RestorePointError::NotEnabled)?;

        let mut found: Vec<RestorePoint> = all
            .iter()
            .filter(|point| point.archive == self.archive && selector.matches(point))
            .cloned()
            .collect();

        match found.len() {
            0 => Err(RestorePointNotFound {
                archive: self.archive.clone(),
                selector,
            }
            .into()),
            1 => Ok(found.remove(0).id),
            count => Err(RestorePointError::Ambiguous {
                count,
                points: found,
            }),
        }
    }
}
