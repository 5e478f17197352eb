//! Code for reading the travel costs CSV file.
use super::*;
use crate::id::IDCollection;
use crate::location::Locations;
use crate::model::TravelCostMap;
use crate::units::MoneyPerHead;
use serde::Deserialize;

const TRAVEL_COSTS_FILE_NAME: &str = "travel_costs.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct TravelCostRaw {
    home_location_id: String,
    project_location_id: String,
    cost: MoneyPerHead,
}

/// Read the cost per head of travelling from each home location to each project location.
///
/// Costs are only needed for pairs of different locations which an eligible assignment uses;
/// travel within a location is always free.
pub fn read_travel_costs(model_dir: &Path, locations: &Locations) -> Result<TravelCostMap> {
    let file_path = model_dir.join(TRAVEL_COSTS_FILE_NAME);
    let iter = read_csv_optional(&file_path)?;
    read_travel_costs_from_iter(iter, locations).with_context(|| input_err_msg(&file_path))
}

fn read_travel_costs_from_iter<I>(iter: I, locations: &Locations) -> Result<TravelCostMap>
where
    I: Iterator<Item = TravelCostRaw>,
{
    let mut map = TravelCostMap::new();
    for raw in iter {
        let home = locations.home.get_id_by_str(&raw.home_location_id)?;
        let project_location = locations.project.get_id_by_str(&raw.project_location_id)?;
        check_non_negative(raw.cost.value(), "cost")?;
        if home == project_location {
            ensure!(
                raw.cost == MoneyPerHead(0.0),
                "Travel within {home} must be free"
            );
        }

        ensure!(
            map.insert((home.clone(), project_location.clone()), raw.cost)
                .is_none(),
            "Duplicate travel cost for {home} -> {project_location}"
        );
    }

    Ok(map)
}
