use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use panel_pitch::compare::compare_groups;
use panel_pitch::data_load::{TableCache, TableKind, load_panel};
use panel_pitch::did::{EffectDirection, estimate_did};
use panel_pitch::geo::{department_means, municipality_points};
use panel_pitch::ols::{fit_ols, fit_ols_filtered};
use panel_pitch::sweep::{sort_by_coefficient, sweep_by_group, sweep_fields};
use panel_pitch::table::{Table, Value};

fn fixture_bytes(name: &str) -> Vec<u8> {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read(path).expect("fixture file should be readable")
}

fn panel() -> Table {
    load_panel(&fixture_bytes("panel.csv")).expect("panel fixture should load")
}

#[test]
fn latin1_department_names_survive_loading() {
    let t = panel();
    assert_eq!(t.len(), 20);
    let depts = t.distinct("department").unwrap();
    assert_eq!(depts, vec!["Meta", "Caquetá", "Cauca", "Nariño", "Guaviare"]);
    assert_eq!(t.value(5, "gdp_growth"), Some(&Value::Missing));
}

#[test]
fn loading_the_same_bytes_twice_hits_the_cache() {
    let cache = TableCache::new();
    let bytes = fixture_bytes("panel.csv");
    let a = cache.load(&bytes, TableKind::Panel).unwrap();
    let b = cache.load(&bytes, TableKind::Panel).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(*a, *b);
    assert_eq!(cache.len(), 1);

    let mut edited = bytes.clone();
    edited.extend_from_slice(b"2020,Meta,Mesetas,1,1,5.0,9.0,3.0,3.38,-74.04\n");
    let c = cache.load(&edited, TableKind::Panel).unwrap();
    assert_eq!(c.len(), 21);
    assert_eq!(cache.len(), 2);
}

#[test]
fn year_means_ignore_missing_cells() {
    let t = panel();
    let cmp = compare_groups(&t, &["gdp_growth", "fdi"], "year", &["2015", "2019"])
        .unwrap()
        .expect("two years selected");
    assert_eq!(cmp.rows_a, 5);
    let gdp = &cmp.fields[0];
    assert!((gdp.mean_a - 2.5672).abs() < 1e-9);
    assert!((gdp.mean_b - 3.7096).abs() < 1e-9);
    assert_eq!(gdp.values_a.len(), 5);

    // 2016 has one missing gdp cell.
    let cmp = compare_groups(&t, &["gdp_growth"], "year", &["2015", "2016"])
        .unwrap()
        .unwrap();
    assert_eq!(cmp.fields[0].values_b.len(), 4);
}

#[test]
fn comparison_needs_exactly_two_keys() {
    let t = panel();
    assert!(compare_groups(&t, &["gdp_growth"], "year", &["2015"]).unwrap().is_none());
    assert!(
        compare_groups(&t, &["gdp_growth"], "year", &["2015", "2016", "2018"])
            .unwrap()
            .is_none()
    );
}

#[test]
fn unseen_year_gives_nan_mean() {
    let t = panel();
    let cmp = compare_groups(&t, &["gdp_growth"], "year", &["2015", "2030"])
        .unwrap()
        .unwrap();
    assert!(cmp.fields[0].mean_b.is_nan());
    assert_eq!(cmp.rows_b, 0);
}

#[test]
fn full_panel_regression() {
    let t = panel();
    let fit = fit_ols(&t, "gdp_growth", &["fdi", "unemployment"]).unwrap();
    assert_eq!(fit.n_obs, 19);
    assert!((fit.coefficient("fdi").unwrap() - 0.229_475_540).abs() < 1e-6);
    assert!((fit.coefficient("unemployment").unwrap() + 0.364_541_784).abs() < 1e-6);
    assert!((fit.r_squared - 0.192_631_067).abs() < 1e-6);
}

#[test]
fn department_filtered_regression() {
    let t = panel();
    let fit = fit_ols_filtered(&t, "department", "Cauca", "gdp_growth", &["fdi"]).unwrap();
    assert_eq!(fit.n_obs, 4);
    assert!((fit.coefficient("fdi").unwrap() - 1.024_677_860).abs() < 1e-6);
    assert!(fit.p_value("fdi").unwrap() < 0.01);

    let err = fit_ols_filtered(&t, "department", "Guaviare", "gdp_growth", &["fdi"]).unwrap_err();
    assert!(err.is_model_fit());
}

#[test]
fn sweep_skips_constant_department() {
    let t = panel();
    let mut fits = sweep_by_group(&t, "gdp_growth", "fdi", "department").unwrap();
    assert_eq!(fits.len(), 4);
    assert!(fits.len() <= t.distinct("department").unwrap().len());
    assert!(fits.iter().all(|f| f.group != "Guaviare"));

    sort_by_coefficient(&mut fits, true);
    let order: Vec<_> = fits.iter().map(|f| f.group.as_str()).collect();
    assert_eq!(order, vec!["Meta", "Caquetá", "Cauca", "Nariño"]);
    assert_eq!(fits[1].n_obs, 3);
}

#[test]
fn per_field_sweep_skips_categorical_fields() {
    let t = panel();
    let fits = sweep_fields(&t, "gdp_growth", &["fdi", "department", "unemployment"]).unwrap();
    let fields: Vec<_> = fits.iter().map(|f| f.independents[0].as_str()).collect();
    assert_eq!(fields, vec!["fdi", "unemployment"]);
}

#[test]
fn did_recovers_post_treatment_gain() {
    let t = panel();
    let est = estimate_did(&t, "gdp_growth", "treatment", "post").unwrap();
    assert!((est.effect - 1.531_333_333).abs() < 1e-6);
    assert!(est.significant);
    assert_eq!(est.direction, EffectDirection::Positive);
    assert_eq!(est.regression.n_obs, 19);
}

#[test]
fn did_without_indicator_is_a_missing_column() {
    let t = panel();
    let err = estimate_did(&t, "gdp_growth", "treatment", "after_2016").unwrap_err();
    assert!(err.is_missing_column());
}

#[test]
fn map_layers() {
    let t = panel();
    let regions = department_means(&t, "department", "gdp_growth").unwrap();
    assert_eq!(regions.len(), 5);
    assert_eq!(regions[0].region, "Caquetá");
    assert_eq!(regions[0].observations, 3);

    let points = municipality_points(&t, "gdp_growth").unwrap();
    assert_eq!(points.len(), 19);
}
