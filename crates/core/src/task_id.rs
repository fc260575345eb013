// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Agentflow Contributors

//! Task ID generation: `tsk_` followed by 26 uppercase Crockford base32
//! characters, per the bit-exact task schema.

use crate::id::IdBuf;
use serde::{Deserialize, Serialize};

const PREFIX: &str = "tsk_";
const SUFFIX_LEN: usize = 26;
/// Crockford base32 alphabet (omits I, L, O, U to avoid visual ambiguity).
const ALPHABET: [char; 32] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J',
    'K', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W', 'X', 'Y', 'Z',
];

/// Identity of a [`crate::task::Task`]: `tsk_` + 26 uppercase Crockford
/// base32 characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(IdBuf);

impl TaskId {
    pub fn new() -> Self {
        let suffix = nanoid::nanoid!(SUFFIX_LEN, &ALPHABET);
        Self(IdBuf::new(&format!("{PREFIX}{suffix}")))
    }

    /// Parse an existing task id string (e.g. from persisted state or an
    /// LLM decomposition response). Does not validate the Crockford
    /// alphabet; callers that need strict schema validation should use
    /// [`TaskId::is_well_formed`].
    pub fn from_string(id: impl AsRef<str>) -> Self {
        Self(IdBuf::new(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// True iff the id matches `tsk_` + exactly 26 uppercase base32 chars.
    pub fn is_well_formed(s: &str) -> bool {
        match s.strip_prefix(PREFIX) {
            Some(rest) => {
                rest.chars().count() == SUFFIX_LEN && rest.chars().all(|c| ALPHABET.contains(&c))
            }
            None => false,
        }
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::borrow::Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl std::ops::Deref for TaskId {
    type Target = str;

    fn deref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
#[path = "task_id_tests.rs"]
mod tests;
