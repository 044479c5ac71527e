use std::{collections::HashMap, time::Duration};

use bim_geom::{FootprintKind, GeometryKind, GeometryRequest, ServiceConfig, config::init_logging};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn should_use_defaults_without_environment() {
    let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, ServiceConfig::default());
    assert_eq!(config.endpoint(), "http://localhost:5000/bimapi");
    assert_eq!(config.default_footprint, FootprintKind::BoundingBox);
    assert_eq!(config.leaf_budget(), None);
}

#[test]
fn should_read_deployment_environment() {
    let config = ServiceConfig::from_lookup(lookup(&[
        ("API_ADDRESS", "https://bim.example.org/"),
        ("API_PATH", "/api"),
        ("REL_URI", "True"),
        ("DEFAULT_FOOTPRINT_TYPE", "footprint_approx"),
        ("PARALLEL_EXTRACTION", "0"),
        ("LEAF_BUDGET_MS", "250"),
    ]))
    .unwrap();
    assert_eq!(config.endpoint(), "https://bim.example.org/api");
    assert!(config.relative_uris);
    assert_eq!(config.default_footprint, FootprintKind::FootprintApprox);
    assert!(!config.parallel_extraction);
    assert_eq!(config.leaf_budget(), Some(Duration::from_millis(250)));
}

#[test]
fn should_reject_bad_environment_values() {
    assert!(ServiceConfig::from_lookup(lookup(&[("DEFAULT_FOOTPRINT_TYPE", "hull")])).is_err());
    assert!(ServiceConfig::from_lookup(lookup(&[("LEAF_BUDGET_MS", "soon")])).is_err());
}

#[test]
fn should_parse_toml_with_partial_keys() {
    let config = ServiceConfig::from_toml_str(
        r#"
        api_address = "http://geo.internal:8080"
        default_footprint = "footprint"
        leaf_budget_ms = 1000
        "#,
    )
    .unwrap();
    assert_eq!(config.api_address, "http://geo.internal:8080");
    assert_eq!(config.api_path, "/bimapi");
    assert_eq!(config.default_footprint, FootprintKind::Footprint);
    assert!(config.parallel_extraction);
    assert_eq!(config.leaf_budget(), Some(Duration::from_secs(1)));
}

#[test]
fn should_parse_footprint_kinds() {
    assert_eq!("BBOX".parse::<FootprintKind>().unwrap(), FootprintKind::BoundingBox);
    assert_eq!(" footprint ".parse::<FootprintKind>().unwrap(), FootprintKind::Footprint);
    assert_eq!("approx".parse::<FootprintKind>().unwrap(), FootprintKind::FootprintApprox);
    assert!("mesh".parse::<FootprintKind>().is_err());
}

#[test]
fn should_default_requests() {
    assert_eq!(GeometryKind::default(), GeometryKind::Flat(FootprintKind::BoundingBox));

    let mesh = GeometryRequest::mesh();
    assert!(!mesh.composed);
    assert!(mesh.compose_assembly);
    assert_eq!(mesh.crs, None);

    let features = GeometryRequest::features(FootprintKind::Footprint)
        .with_crs("EPSG:25832")
        .composed(false);
    assert!(!features.composed);
    assert_eq!(features.footprint, FootprintKind::Footprint);
    assert_eq!(features.crs.as_deref(), Some("EPSG:25832"));
}

#[test]
fn should_tolerate_repeated_logger_setup() {
    init_logging();
    init_logging();
    log::info!("logger installed");
}

#[test]
fn should_read_config_file() {
    let path = std::env::temp_dir().join(format!("bim-geom-{}.toml", std::process::id()));
    std::fs::write(&path, "api_path = \"/geo\"\nrelative_uris = true\n").unwrap();
    let config = ServiceConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(config.api_path, "/geo");
    assert!(config.relative_uris);
    assert!(ServiceConfig::from_file(&path).is_err());
}

#[test]
fn should_read_process_environment() {
    let config = ServiceConfig::from_env();
    assert!(config.is_ok() || std::env::var("DEFAULT_FOOTPRINT_TYPE").is_ok());
}
