//! The rule deciding which consultants may fill which roles.
//!
//! A consultant may always fill a role at or below their own seniority, never one above it. On
//! top of that, exactly one location-gating mode is active for a run (see [`EligibilityMode`]).
use crate::seniority::SeniorityLevel;
use crate::units::Dimensionless;
use serde_string_enum::DeserializeLabeledStringEnum;

/// How consultants' willingness to work at a project's location gates eligibility
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Eq, Default, Clone, Copy)]
pub enum EligibilityMode {
    /// Consultants may only be assigned to locations they are willing to work at
    #[string = "strict"]
    Strict,
    /// Unwilling consultants work from home, earning a reduced rate and incurring no travel
    #[string = "remote_allowed"]
    RemoteAllowed,
    /// Willingness is ignored
    #[default]
    #[string = "unrestricted"]
    Unrestricted,
}

impl EligibilityMode {
    /// Whether this mode needs the preference matrix
    pub fn uses_preferences(self) -> bool {
        self != Self::Unrestricted
    }
}

/// Where an eligible assignment is worked from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkArrangement {
    /// At the project's location
    OnSite,
    /// From the consultant's home location
    Remote,
}

impl WorkArrangement {
    /// The multiplier applied to revenue earned under this arrangement
    pub fn revenue_multiplier(self, remote_work_penalty: Dimensionless) -> Dimensionless {
        match self {
            Self::OnSite => Dimensionless(1.0),
            Self::Remote => remote_work_penalty,
        }
    }

    /// Whether travel costs apply when the home and project locations differ
    pub fn incurs_travel(self) -> bool {
        self == Self::OnSite
    }

    /// Whether this is a work-from-home arrangement
    pub fn is_remote(self) -> bool {
        self == Self::Remote
    }
}

/// Whether a consultant of `actual` seniority may fill a role of `role` seniority
pub fn can_fill(actual: SeniorityLevel, role: SeniorityLevel) -> bool {
    actual.is_at_least_as_senior_as(role)
}

/// Apply the eligibility rule to one cell.
///
/// # Arguments
///
/// * `mode` - The location-gating mode for the run
/// * `actual` - The consultant's seniority
/// * `role` - The seniority of the role being filled
/// * `willing` - The preference flag for the consultant's level at the project's location
///
/// # Returns
///
/// `None` if the consultant may not fill the role, otherwise how the work is carried out.
pub fn check_eligibility(
    mode: EligibilityMode,
    actual: SeniorityLevel,
    role: SeniorityLevel,
    willing: bool,
) -> Option<WorkArrangement> {
    if !can_fill(actual, role) {
        return None;
    }

    match mode {
        EligibilityMode::Strict => willing.then_some(WorkArrangement::OnSite),
        EligibilityMode::RemoteAllowed if !willing => Some(WorkArrangement::Remote),
        EligibilityMode::RemoteAllowed | EligibilityMode::Unrestricted => {
            Some(WorkArrangement::OnSite)
        }
    }
}
