//! Client projects which demand consultants.
use crate::location::LocationID;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The identifier of a project. Projects are numbered from one.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct ProjectID(pub u32);

/// A client project
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// The project's identifier
    pub id: ProjectID,
    /// Where the project is delivered
    pub location_id: LocationID,
}

/// A map of [`Project`]s keyed by ID, in ascending ID order
pub type ProjectMap = IndexMap<ProjectID, Project>;
