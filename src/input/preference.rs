//! Code for reading the location preferences CSV file.
use super::*;
use crate::id::IDCollection;
use crate::location::LocationID;
use crate::model::PreferenceMap;
use crate::seniority::SeniorityLevel;
use indexmap::IndexSet;
use serde::Deserialize;

const PREFERENCES_FILE_NAME: &str = "preferences.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct PreferenceRaw {
    level: SeniorityLevel,
    location_id: String,
    #[serde(deserialize_with = "deserialise_flag")]
    willing: bool,
}

/// Read whether consultants of each level are willing to work at each project location.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `project_location_ids` - All valid project locations
/// * `required` - Whether the file must be present
///
/// # Returns
///
/// The willingness flags given. Pairs not given are treated as unwilling.
pub fn read_preferences(
    model_dir: &Path,
    project_location_ids: &IndexSet<LocationID>,
    required: bool,
) -> Result<PreferenceMap> {
    let file_path = model_dir.join(PREFERENCES_FILE_NAME);
    let result = if required {
        read_csv(&file_path)
            .and_then(|iter| read_preferences_from_iter(iter, project_location_ids))
    } else {
        read_csv_optional(&file_path)
            .and_then(|iter| read_preferences_from_iter(iter, project_location_ids))
    };

    result.with_context(|| input_err_msg(&file_path))
}

fn read_preferences_from_iter<I>(
    iter: I,
    project_location_ids: &IndexSet<LocationID>,
) -> Result<PreferenceMap>
where
    I: Iterator<Item = PreferenceRaw>,
{
    let mut map = PreferenceMap::new();
    for raw in iter {
        let location_id = project_location_ids.get_id_by_str(&raw.location_id)?;
        ensure!(
            map.insert((raw.level, location_id.clone()), raw.willing)
                .is_none(),
            "Duplicate preference for {}, {location_id}",
            raw.level
        );
    }

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn project_location_ids() -> IndexSet<LocationID> {
        ["London".into(), "Paris".into()].into_iter().collect()
    }

    #[test]
    fn test_read_preferences() {
        let dir = tempdir().unwrap();

        // Missing file is only allowed if not required
        assert!(
            read_preferences(dir.path(), &project_location_ids(), false)
                .unwrap()
                .is_empty()
        );
        assert!(read_preferences(dir.path(), &project_location_ids(), true).is_err());

        {
            let mut file = File::create(dir.path().join(PREFERENCES_FILE_NAME)).unwrap();
            writeln!(
                file,
                "level,location_id,willing\nconsultant,Paris,1\nsenior_consultant,Paris,0"
            )
            .unwrap();
        }

        let map = read_preferences(dir.path(), &project_location_ids(), true).unwrap();
        assert!(map[&(SeniorityLevel::Consultant, LocationID::new("Paris"))]);
        assert!(!map[&(SeniorityLevel::SeniorConsultant, LocationID::new("Paris"))]);
    }

    #[test]
    fn test_read_preferences_from_iter_bad() {
        let row = |location_id: &str| PreferenceRaw {
            level: SeniorityLevel::Consultant,
            location_id: location_id.into(),
            willing: true,
        };
        assert!(
            read_preferences_from_iter([row("Berlin")].into_iter(), &project_location_ids())
                .is_err()
        );
        assert!(
            read_preferences_from_iter(
                [row("Paris"), row("Paris")].into_iter(),
                &project_location_ids()
            )
            .is_err()
        );
    }
}
