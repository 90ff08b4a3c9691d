use relq::{MappingCatalog, QueryModel, QueryTranslator, SqlCommand, TranslationError};

pub const COOKING_CATALOG: &str = r#"
entities:
  - type: Cook
    table: CookTable
    primary_key: ID
    properties:
      - { name: ID, type: int }
      - { name: FirstName }
      - { name: Name }
      - { name: IsStarredCook, type: bool }
      - { name: IsFullTimeCook, type: bool }
      - { name: SubstitutedID, type: int }
      - { name: KitchenID, type: int }
  - type: Kitchen
    table: KitchenTable
    primary_key: ID
    properties:
      - { name: ID, type: int }
      - { name: Name }
      - { name: RestaurantID, type: int }
  - type: Restaurant
    table: RestaurantTable
    primary_key: ID
    properties:
      - { name: ID, type: int }
      - { name: Name }
  - type: Customer
    table: CustomerTable
    primary_key: ID
    properties:
      - { name: ID, type: int }
      - { name: Name }
      - { name: City }
"#;

/// Column list of an unnamed Cook entity read from `alias`.
pub fn cook_columns(alias: &str) -> String {
    [
        "ID",
        "FirstName",
        "Name",
        "IsStarredCook",
        "IsFullTimeCook",
        "SubstitutedID",
        "KitchenID",
    ]
    .iter()
    .map(|column| format!("[{}].[{}]", alias, column))
    .collect::<Vec<_>>()
    .join(",")
}

pub fn translator() -> QueryTranslator {
    let catalog = MappingCatalog::from_yaml_str(COOKING_CATALOG).expect("catalog should parse");
    QueryTranslator::new(catalog)
}

pub fn translate(query: &QueryModel) -> Result<SqlCommand, TranslationError> {
    translator().translate(query)
}

/// Asserts the generated text and the parameter values in order.
pub fn check_query(query: &QueryModel, expected_sql: &str, expected_parameters: &[serde_json::Value]) {
    let command = translate(query).unwrap_or_else(|e| panic!("translation failed: {}", e));
    assert_eq!(command.text, expected_sql);

    let values: Vec<serde_json::Value> =
        command.parameters.iter().map(|p| p.value.clone()).collect();
    assert_eq!(values, expected_parameters);
    for (index, parameter) in command.parameters.iter().enumerate() {
        assert_eq!(parameter.name, format!("@{}", index + 1));
    }
}
