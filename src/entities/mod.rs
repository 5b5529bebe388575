// Entity Models
// Contributions, mentors, villages and users - the four collections the
// record store holds and both backends mirror.
//
// Each entity has:
// - A key that is unique within its collection (numeric id, username or village name)
// - Validation rules checked before any mutation
// - Built-in seed data for local-only startup

pub mod contribution;
pub mod mentor;
pub mod user;
pub mod village;

pub use contribution::{Contribution, ContributionDraft, PaymentType};
pub use mentor::{Mentor, MentorDraft};
pub use user::{authorize, Action, Capabilities, Role, Tab, User, VillageScope};
pub use village::Village;

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// COLLECTION KIND
// ============================================================================

/// Closed set of entity collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Contributions,
    Mentors,
    Villages,
    Users,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 4] = [
        CollectionKind::Contributions,
        CollectionKind::Mentors,
        CollectionKind::Villages,
        CollectionKind::Users,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Contributions => "contributions",
            CollectionKind::Mentors => "mentors",
            CollectionKind::Villages => "villages",
            CollectionKind::Users => "users",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RECORD TRAIT
// ============================================================================

/// An entity stored in a keyed collection
pub trait Record: Clone {
    type Key: PartialEq + Clone + fmt::Display;

    const KIND: CollectionKind;

    fn key(&self) -> Self::Key;

    /// Human-readable reasons this record violates its invariants
    fn validation_errors(&self) -> Vec<String>;
}

/// Push "`label` is required" when `value` is blank
pub(crate) fn require(errors: &mut Vec<String>, label: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{} is required", label));
    }
}

/// Turn collected reasons into a validation error
pub(crate) fn into_validation(errors: Vec<String>) -> crate::error::Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::error::FundError::Validation(errors))
    }
}
