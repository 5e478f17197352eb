//! Code for reading the consultant pools CSV file.
use super::*;
use crate::id::IDCollection;
use crate::location::LocationID;
use crate::model::PoolMap;
use crate::seniority::SeniorityLevel;
use indexmap::IndexSet;
use serde::Deserialize;

const POOLS_FILE_NAME: &str = "pools.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct PoolRaw {
    home_location_id: String,
    level: SeniorityLevel,
    headcount: u32,
}

/// Read the headcount of each consultant pool.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `home_location_ids` - All valid home locations
///
/// # Returns
///
/// The headcount for each (home location, level) pair given. Pools not given are empty.
pub fn read_pools(model_dir: &Path, home_location_ids: &IndexSet<LocationID>) -> Result<PoolMap> {
    let file_path = model_dir.join(POOLS_FILE_NAME);
    let iter = read_csv(&file_path)?;
    read_pools_from_iter(iter, home_location_ids).with_context(|| input_err_msg(&file_path))
}

fn read_pools_from_iter<I>(iter: I, home_location_ids: &IndexSet<LocationID>) -> Result<PoolMap>
where
    I: Iterator<Item = PoolRaw>,
{
    let mut pools = PoolMap::new();
    for raw in iter {
        let home = home_location_ids.get_id_by_str(&raw.home_location_id)?;
        ensure!(
            pools.insert((home.clone(), raw.level), raw.headcount).is_none(),
            "Duplicate pool for {home}, {}",
            raw.level
        );
    }

    Ok(pools)
}
