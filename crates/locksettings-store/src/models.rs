//! Lock settings models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Device user identifier
pub type UserId = u32;

/// The primordial user, whose files live in the shared system directory
pub const SYSTEM_USER: UserId = 0;

/// Identity of whoever issued a call, as authenticated by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallerIdentity {
    /// The trusted system caller
    System,
    /// An ordinary caller running as the given user
    User(UserId),
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerIdentity::System => write!(f, "system"),
            CallerIdentity::User(id) => write!(f, "user {}", id),
        }
    }
}

/// Per-call context threaded through every store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    /// Calling identity
    pub identity: CallerIdentity,
}

impl CallerContext {
    /// Context for the trusted system caller
    pub fn system() -> Self {
        Self {
            identity: CallerIdentity::System,
        }
    }

    /// Context for an ordinary caller running as `user_id`
    pub fn user(user_id: UserId) -> Self {
        Self {
            identity: CallerIdentity::User(user_id),
        }
    }

    /// Whether this is the trusted system caller
    pub fn is_system(&self) -> bool {
        self.identity == CallerIdentity::System
    }
}

/// Kind of hashed credential stored by the hash vault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Lock pattern hash
    Pattern,
    /// Lock password hash
    Password,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialKind::Pattern => write!(f, "pattern"),
            CredentialKind::Password => write!(f, "password"),
        }
    }
}

/// On-disk naming variant for a pattern hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeVariant {
    /// Pattern of the default grid size
    Default,
    /// Pattern of any other grid size
    Alternate,
}

impl SizeVariant {
    /// The other variant
    pub fn other(self) -> Self {
        match self {
            SizeVariant::Default => SizeVariant::Alternate,
            SizeVariant::Alternate => SizeVariant::Default,
        }
    }
}

/// Typed setting value, persisted in its canonical string form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// Boolean, stored as "1" / "0"
    Bool(bool),
    /// Integer, stored as decimal
    Long(i64),
    /// Raw string
    Str(String),
}

impl SettingValue {
    /// Canonical string form written to the settings table
    pub fn to_stored(&self) -> String {
        match self {
            SettingValue::Bool(true) => "1".to_string(),
            SettingValue::Bool(false) => "0".to_string(),
            SettingValue::Long(v) => v.to_string(),
            SettingValue::Str(s) => s.clone(),
        }
    }

    /// Interpret a stored string as a boolean ("1" or "true" are truthy)
    pub fn parse_bool(stored: &str) -> bool {
        stored == "1" || stored == "true"
    }

    /// Interpret a stored string as an integer
    pub fn parse_long(stored: &str) -> Option<i64> {
        stored.trim().parse().ok()
    }
}

/// A single timed touch point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GesturePoint {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
    /// Sample time in milliseconds
    pub timestamp: i64,
}

/// One continuous stroke of a gesture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GestureStroke {
    /// Points in drawing order
    pub points: Vec<GesturePoint>,
}

/// Raw gesture sample as captured from the lock screen
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gesture {
    /// Strokes in drawing order
    pub strokes: Vec<GestureStroke>,
}

impl Gesture {
    /// Build a single-stroke gesture from `(x, y, timestamp)` triples
    pub fn from_points(points: &[(f32, f32, i64)]) -> Self {
        Self {
            strokes: vec![GestureStroke {
                points: points
                    .iter()
                    .map(|&(x, y, timestamp)| GesturePoint { x, y, timestamp })
                    .collect(),
            }],
        }
    }

    /// Whether the sample carries no points at all
    pub fn is_empty(&self) -> bool {
        self.strokes.iter().all(|s| s.points.is_empty())
    }
}

/// Recognizer output for one template name
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Template name
    pub name: String,
    /// Match score, higher is better
    pub score: f64,
}
