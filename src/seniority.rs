//! Seniority levels for consultants and the roles they fill.
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The seniority of a consultant or of a role on a project.
///
/// Variants are declared from most to least senior, so the derived ordering is the seniority
/// order used everywhere output needs to be reproducible.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SeniorityLevel {
    /// Senior consulting manager (rank 1)
    SeniorConsultingManager,
    /// Consulting manager (rank 2)
    ConsultingManager,
    /// Senior consultant (rank 3)
    SeniorConsultant,
    /// Consultant (rank 4)
    Consultant,
    /// Junior consultant (rank 5)
    JuniorConsultant,
}

impl SeniorityLevel {
    /// The numeric rank of the level. Lower numbers are more senior.
    pub fn rank(self) -> u8 {
        match self {
            Self::SeniorConsultingManager => 1,
            Self::ConsultingManager => 2,
            Self::SeniorConsultant => 3,
            Self::Consultant => 4,
            Self::JuniorConsultant => 5,
        }
    }

    /// Whether this is the most junior level (which may always be benched in full)
    pub fn is_junior(self) -> bool {
        self == Self::JuniorConsultant
    }

    /// Whether a consultant of this level is at least as senior as `other`
    pub fn is_at_least_as_senior_as(self, other: SeniorityLevel) -> bool {
        self.rank() <= other.rank()
    }
}
