//! Locations are the places consultants are based at and projects are delivered in.
//!
//! Home and project locations share a single namespace, so a consultant assigned to a project in
//! their own home location incurs no travel cost.
use crate::id::define_id_type;
use indexmap::IndexSet;
use serde_string_enum::DeserializeLabeledStringEnum;

define_id_type! {LocationID}

/// Whether a location is somewhere consultants live, somewhere projects happen, or both
#[derive(PartialEq, Debug, Clone, Copy, DeserializeLabeledStringEnum)]
pub enum LocationKind {
    /// Consultants are based here
    #[string = "home"]
    Home,
    /// Projects are delivered here
    #[string = "project"]
    Project,
    /// Both a home and a project location
    #[string = "both"]
    Both,
}

impl LocationKind {
    /// Whether consultants can be based at a location of this kind
    pub fn is_home(self) -> bool {
        matches!(self, Self::Home | Self::Both)
    }

    /// Whether projects can be delivered at a location of this kind
    pub fn is_project(self) -> bool {
        matches!(self, Self::Project | Self::Both)
    }
}

/// The named location sets of the model
#[derive(Debug, Default, PartialEq)]
pub struct Locations {
    /// Locations at which consultant pools are based, in input order
    pub home: IndexSet<LocationID>,
    /// Locations at which projects are delivered, in input order
    pub project: IndexSet<LocationID>,
}
