use serde::Serialize;

use crate::error::Result;
use crate::stats::mean;
use crate::table::Table;

pub const DEPARTMENT_FIELD: &str = "department";
pub const MUNICIPALITY_FIELD: &str = "municipality";
pub const LATITUDE_FIELD: &str = "latitude";
pub const LONGITUDE_FIELD: &str = "longitude";

#[derive(Debug, Clone, Serialize)]
pub struct RegionValue {
    pub region: String,
    pub mean: f64,
    pub observations: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapPoint {
    pub label: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub value: Option<f64>,
}

/// Mean of `value_field` per region, sorted by region name, for choropleth shading.
pub fn department_means(
    table: &Table,
    department_field: &str,
    value_field: &str,
) -> Result<Vec<RegionValue>> {
    table.require_column(value_field)?;
    let mut out = Vec::new();
    for (region, subset) in table.group_by(department_field)? {
        let values = subset.numeric(value_field)?;
        out.push(RegionValue {
            region,
            mean: mean(&values),
            observations: values.iter().flatten().count(),
        });
    }
    out.sort_by(|a, b| a.region.cmp(&b.region));
    Ok(out)
}

/// Point layer for rows with both coordinates. Requires `latitude` and `longitude`.
pub fn municipality_points(table: &Table, value_field: &str) -> Result<Vec<MapPoint>> {
    let lat = table.numeric(LATITUDE_FIELD)?;
    let lon = table.numeric(LONGITUDE_FIELD)?;
    let values = table.numeric(value_field)?;
    let label_idx = table.column_index(MUNICIPALITY_FIELD);

    let mut out = Vec::new();
    for (row, ((lat, lon), value)) in lat.iter().zip(&lon).zip(&values).enumerate() {
        let (Some(latitude), Some(longitude)) = (*lat, *lon) else {
            continue;
        };
        let label = label_idx.and_then(|idx| table.rows()[row][idx].key());
        out.push(MapPoint {
            label,
            latitude,
            longitude,
            value: *value,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{department_means, municipality_points};
    use crate::data_load::parse_csv;

    #[test]
    fn department_means_are_sorted_by_region() {
        let t = parse_csv("department,gdp\nMeta,2\nCauca,1\nMeta,4\nCauca,NA\n").unwrap();
        let rows = department_means(&t, "department", "gdp").unwrap();
        assert_eq!(rows[0].region, "Cauca");
        assert!((rows[0].mean - 1.0).abs() < 1e-12);
        assert_eq!(rows[0].observations, 1);
        assert!((rows[1].mean - 3.0).abs() < 1e-12);
    }

    #[test]
    fn points_need_coordinates() {
        let t = parse_csv("municipality,gdp\nMesetas,2\n").unwrap();
        assert!(municipality_points(&t, "gdp").unwrap_err().is_missing_column());

        let t = parse_csv("municipality,latitude,longitude,gdp\nMesetas,3.38,-74.04,2\nUribe,,-74.3,1\n")
            .unwrap();
        let pts = municipality_points(&t, "gdp").unwrap();
        assert_eq!(pts.len(), 1);
        assert_eq!(pts[0].label.as_deref(), Some("Mesetas"));
    }
}
