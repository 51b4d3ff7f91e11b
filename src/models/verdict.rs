use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome of verifying one address.
///
/// DNS and SMTP failures are not errors; they surface as [`Verdict::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Verdict {
    #[serde(rename = "Invalid Email Format")]
    InvalidFormat,
    Unknown,
    Valid,
    Invalid,
    Empty,
    Error,
}

impl Verdict {
    /// Label written to result artifacts and API responses.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "Invalid Email Format",
            Self::Unknown => "Unknown",
            Self::Valid => "Valid",
            Self::Invalid => "Invalid",
            Self::Empty => "Empty",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
