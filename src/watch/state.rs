//! Persisted watermarks for tracked pull requests.
//!
//! [`StateStore`] owns the in-memory [`WatchState`] behind a single mutex and
//! knows how to load it from, and save it to, a JSON file. The lock is only
//! held for in-memory reads and updates, never across I/O or `.await`.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::github::PullRequestKey;

/// Errors raised while loading or saving the state file.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    /// Filesystem access failed.
    #[error("state file I/O error: {message}")]
    Io {
        /// Error detail including the affected path.
        message: String,
    },

    /// The state file exists but does not contain valid state JSON.
    #[error("state file '{path}' is corrupt: {message}")]
    Corrupt {
        /// Path of the state file.
        path: String,
        /// Parser error detail.
        message: String,
    },

    /// The state could not be serialised.
    #[error("failed to serialise state: {message}")]
    Serialize {
        /// Serialiser error detail.
        message: String,
    },
}

/// Comment and review watermarks for a pull request authored by the user.
///
/// The two components advance independently; `None` means nothing has been
/// observed on that stream yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoredWatermark {
    /// Latest `updated_at` of any observed issue comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_issue_comment: Option<DateTime<Utc>>,
    /// Latest submission time of any observed review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<DateTime<Utc>>,
}

impl AuthoredWatermark {
    /// Component-wise maximum of `self` and `other`.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            last_issue_comment: later(self.last_issue_comment, other.last_issue_comment),
            last_review: later(self.last_review, other.last_review),
        }
    }
}

/// Returns the later of two optional timestamps.
pub(crate) fn later(
    left: Option<DateTime<Utc>>,
    right: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (left, right) {
        (Some(first), Some(second)) => Some(first.max(second)),
        (first, second) => first.or(second),
    }
}

/// Serialised form of the watch state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchState {
    /// Whether a first pass has completed.
    #[serde(default)]
    pub initialized: bool,
    /// Last seen `updated_at` per assigned pull request key.
    #[serde(default)]
    pub assigned_prs: BTreeMap<String, DateTime<Utc>>,
    /// Comment and review watermarks per authored pull request key.
    #[serde(default)]
    pub authored_prs: BTreeMap<String, AuthoredWatermark>,
}

/// Thread-safe owner of the watch state and its backing file.
#[derive(Debug)]
pub struct StateStore {
    path: Utf8PathBuf,
    state: Mutex<WatchState>,
}

impl StateStore {
    /// Creates a store holding `state` that saves to `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, state: WatchState) -> Self {
        Self {
            path: path.into(),
            state: Mutex::new(state),
        }
    }

    /// Loads the store from `path`.
    ///
    /// A missing or empty file yields an empty, uninitialised state.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] when the file exists but cannot be read and
    /// [`StateError::Corrupt`] when its content is not valid state JSON.
    pub fn load(location: impl Into<Utf8PathBuf>) -> Result<Self, StateError> {
        let path = location.into();
        let state = read_state(&path)?;
        Ok(Self::new(path, state))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Writes the current state to the backing file as pretty JSON,
    /// creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when serialisation or any filesystem step fails.
    pub fn save(&self) -> Result<(), StateError> {
        let snapshot = self.snapshot();
        let json =
            serde_json::to_string_pretty(&snapshot).map_err(|error| StateError::Serialize {
                message: error.to_string(),
            })?;
        write_atomically(&self.path, &json)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> WatchState {
        self.lock().clone()
    }

    /// Whether a first pass has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Records that the first pass has completed.
    pub fn mark_initialized(&self) {
        self.lock().initialized = true;
    }

    /// Stored watermark for an assigned pull request.
    #[must_use]
    pub fn assigned_watermark(&self, key: &PullRequestKey) -> Option<DateTime<Utc>> {
        self.lock().assigned_prs.get(&key.to_string()).copied()
    }

    /// Advances the assigned watermark for `key` to `observed` unless the
    /// stored value is already later. Returns the resulting watermark.
    pub fn record_assigned(&self, key: &PullRequestKey, observed: DateTime<Utc>) -> DateTime<Utc> {
        let mut state = self.lock();
        let entry = state
            .assigned_prs
            .entry(key.to_string())
            .or_insert(observed);
        if observed > *entry {
            *entry = observed;
        }
        *entry
    }

    /// Stored watermark pair for an authored pull request.
    #[must_use]
    pub fn authored_watermark(&self, key: &PullRequestKey) -> AuthoredWatermark {
        self.lock()
            .authored_prs
            .get(&key.to_string())
            .copied()
            .unwrap_or_default()
    }

    /// Merges `observed` into the stored pair for `key` component-wise.
    /// Returns the resulting watermark.
    pub fn record_authored(
        &self,
        key: &PullRequestKey,
        observed: AuthoredWatermark,
    ) -> AuthoredWatermark {
        let mut state = self.lock();
        let entry = state.authored_prs.entry(key.to_string()).or_default();
        *entry = entry.merge(observed);
        *entry
    }

    fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn split_path(path: &Utf8Path) -> Result<(&Utf8Path, &str), StateError> {
    let file_name = path.file_name().ok_or_else(|| StateError::Io {
        message: format!("invalid state path '{path}': no file name"),
    })?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    Ok((parent, file_name))
}

fn read_state(path: &Utf8Path) -> Result<WatchState, StateError> {
    let (parent, file_name) = split_path(path)?;

    let dir = match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => dir,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(WatchState::default());
        }
        Err(error) => {
            return Err(StateError::Io {
                message: format!("failed to open state directory '{parent}': {error}"),
            });
        }
    };

    let content = match dir.read_to_string(file_name) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Ok(WatchState::default());
        }
        Err(error) => {
            return Err(StateError::Io {
                message: format!("failed to read state file '{path}': {error}"),
            });
        }
    };

    if content.trim().is_empty() {
        return Ok(WatchState::default());
    }

    serde_json::from_str(&content).map_err(|error| StateError::Corrupt {
        path: path.to_string(),
        message: error.to_string(),
    })
}

/// Opens (creating if needed) the directory that will hold `path`.
fn open_parent_dir(parent: &Utf8Path) -> Result<Dir, StateError> {
    let (base, relative) = if parent.is_absolute() {
        let relative = parent.strip_prefix("/").map_err(|_| StateError::Io {
            message: format!("failed to normalise state directory '{parent}'"),
        })?;
        ("/", relative)
    } else {
        (".", parent)
    };

    let root = Dir::open_ambient_dir(base, ambient_authority()).map_err(|error| StateError::Io {
        message: format!("failed to open '{base}' for state directory: {error}"),
    })?;

    if relative.as_str().is_empty() || relative == Utf8Path::new(".") {
        return Ok(root);
    }

    root.create_dir_all(relative).map_err(|error| StateError::Io {
        message: format!("failed to create state directory '{parent}': {error}"),
    })?;
    root.open_dir(relative).map_err(|error| StateError::Io {
        message: format!("failed to open state directory '{parent}': {error}"),
    })
}

/// Writes to a sibling temporary file and renames it over the target.
fn write_atomically(path: &Utf8Path, content: &str) -> Result<(), StateError> {
    let (parent, file_name) = split_path(path)?;
    let dir = open_parent_dir(parent)?;
    let temp_name = format!(".{file_name}.tmp");

    dir.write(&temp_name, content).map_err(|error| StateError::Io {
        message: format!("failed to write state file '{parent}/{temp_name}': {error}"),
    })?;
    dir.rename(&temp_name, &dir, file_name)
        .map_err(|error| StateError::Io {
            message: format!("failed to replace state file '{path}': {error}"),
        })
}
