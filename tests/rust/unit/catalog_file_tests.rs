use std::fs;

use relq::catalog::{CatalogError, MappingCatalog};

const KITCHENS: &str = r#"
entities:
  - type: Kitchen
    table: KitchenTable
    primary_key: ID
    properties:
      - { name: ID, type: int }
      - { name: Name }
      - { name: Restaurant, column: RestaurantID, type: int }
"#;

#[test]
fn test_load_catalog_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.yaml");
    fs::write(&path, KITCHENS).unwrap();

    let catalog = MappingCatalog::from_yaml_file(&path).unwrap();
    assert_eq!(catalog.len(), 1);
    let kitchen = catalog.entity("Kitchen").unwrap();
    assert_eq!(kitchen.table, "KitchenTable");
    assert_eq!(kitchen.primary_key, "ID");
    let restaurant = &kitchen.columns()[2];
    assert_eq!(restaurant.property, "Restaurant");
    assert_eq!(restaurant.column, "RestaurantID");
    assert_eq!(restaurant.data_type, "int");
}

#[test]
fn test_missing_catalog_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = MappingCatalog::from_yaml_file(dir.path().join("missing.yaml"));
    assert!(matches!(result, Err(CatalogError::ReadError { .. })));
}

#[test]
fn test_malformed_catalog_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.yaml");
    fs::write(&path, "entities: [ { type: Kitchen").unwrap();

    let result = MappingCatalog::from_yaml_file(&path);
    assert!(matches!(result, Err(CatalogError::ParseError { .. })));
}

#[test]
fn test_empty_catalog() {
    let catalog = MappingCatalog::from_yaml_str("entities: []").unwrap();
    assert!(catalog.is_empty());
}

#[test]
fn test_duplicate_property() {
    let yaml = r#"
entities:
  - type: Kitchen
    table: KitchenTable
    primary_key: ID
    properties:
      - { name: ID }
      - { name: ID, column: KitchenID }
"#;
    let err = MappingCatalog::from_yaml_str(yaml).unwrap_err();
    assert!(matches!(err, CatalogError::InvalidCatalog { .. }));
    assert!(err.to_string().contains("Duplicate property `ID`"));
}
