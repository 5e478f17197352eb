//! Code for reading the locations CSV file.
use super::*;
use crate::location::{LocationID, LocationKind, Locations};
use serde::Deserialize;
use std::collections::HashSet;

const LOCATIONS_FILE_NAME: &str = "locations.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct LocationRaw {
    id: String,
    kind: LocationKind,
}

/// Read the home and project locations from the locations CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The home and project location sets, in file order.
pub fn read_locations(model_dir: &Path) -> Result<Locations> {
    let file_path = model_dir.join(LOCATIONS_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_locations_from_iter(iter).with_context(|| input_err_msg(&file_path))
}

fn read_locations_from_iter<I>(iter: I) -> Result<Locations>
where
    I: Iterator<Item = LocationRaw>,
{
    let mut seen = HashSet::new();
    let mut locations = Locations::default();
    for raw in iter {
        ensure!(!raw.id.is_empty(), "Location IDs cannot be empty");
        ensure!(seen.insert(raw.id.clone()), "Duplicate location ID {}", raw.id);

        let id = LocationID::from(raw.id);
        if raw.kind.is_home() {
            locations.home.insert(id.clone());
        }
        if raw.kind.is_project() {
            locations.project.insert(id);
        }
    }

    ensure!(!locations.home.is_empty(), "No home locations defined");
    ensure!(!locations.project.is_empty(), "No project locations defined");

    Ok(locations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::assert_equal;

    fn raw(id: &str, kind: LocationKind) -> LocationRaw {
        LocationRaw {
            id: id.into(),
            kind,
        }
    }

    #[test]
    fn test_read_locations_from_iter() {
        let locations = read_locations_from_iter(
            [
                raw("London", LocationKind::Both),
                raw("Leeds", LocationKind::Home),
                raw("Paris", LocationKind::Project),
            ]
            .into_iter(),
        )
        .unwrap();
        assert_equal(
            locations.home.iter(),
            &[LocationID::new("London"), LocationID::new("Leeds")],
        );
        assert_equal(
            locations.project.iter(),
            &[LocationID::new("London"), LocationID::new("Paris")],
        );
        assert!(locations.project.contains(&LocationID::new("Paris")));
        assert!(!locations.home.contains(&LocationID::new("Berlin")));
    }

    #[test]
    fn test_read_locations_from_iter_bad() {
        // Duplicate ID
        assert!(
            read_locations_from_iter(
                [
                    raw("London", LocationKind::Home),
                    raw("London", LocationKind::Project)
                ]
                .into_iter()
            )
            .is_err()
        );

        // No project locations
        assert!(read_locations_from_iter([raw("London", LocationKind::Home)].into_iter()).is_err());
    }
}
