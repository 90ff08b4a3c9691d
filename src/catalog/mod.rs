//! Entity-type to table mapping catalog.
//!
//! Maps each entity type a query can name as a source to its physical table,
//! its primary key, and the column behind each property. Loaded from YAML:
//!
//! ```yaml
//! entities:
//!   - type: Cook
//!     table: CookTable
//!     primary_key: ID
//!     properties:
//!       - { name: ID, type: int }
//!       - { name: FirstName }
//!       - { name: IsFullTimeCook, type: bool }
//!       - { name: Surname, column: LastName }
//! ```

pub mod errors;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::statement_model::EntityColumn;
pub use errors::CatalogError;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

fn default_property_type() -> String {
    "string".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMapping {
    pub name: String,
    /// Defaults to the property name.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(rename = "type", default = "default_property_type")]
    pub data_type: String,
}

impl PropertyMapping {
    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMapping {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub table: String,
    pub primary_key: String,
    pub properties: Vec<PropertyMapping>,
}

impl EntityMapping {
    pub fn columns(&self) -> Vec<EntityColumn> {
        self.properties
            .iter()
            .map(|p| EntityColumn {
                property: p.name.clone(),
                column: p.column_name().to_string(),
                data_type: p.data_type.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub entities: Vec<EntityMapping>,
}

#[derive(Debug, Clone, Default)]
pub struct MappingCatalog {
    entities: HashMap<String, EntityMapping>,
}

impl MappingCatalog {
    pub fn from_config(config: CatalogConfig) -> Result<Self, CatalogError> {
        let mut entities = HashMap::new();
        for entity in config.entities {
            validate_entity(&entity)?;
            if entities.contains_key(&entity.entity_type) {
                return Err(CatalogError::DuplicateEntity {
                    entity_type: entity.entity_type,
                });
            }
            entities.insert(entity.entity_type.clone(), entity);
        }
        log::debug!("Loaded mapping catalog with {} entity types", entities.len());
        Ok(MappingCatalog { entities })
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|e| CatalogError::ReadError {
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        let config: CatalogConfig =
            serde_yaml::from_str(yaml).map_err(|e| CatalogError::ParseError {
                error: e.to_string(),
            })?;
        Self::from_config(config)
    }

    pub fn entity(&self, entity_type: &str) -> Option<&EntityMapping> {
        self.entities.get(entity_type)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn validate_entity(entity: &EntityMapping) -> Result<(), CatalogError> {
    for identifier in [&entity.entity_type, &entity.table] {
        if !IDENTIFIER.is_match(identifier) {
            return Err(CatalogError::InvalidCatalog {
                message: format!("`{}` is not a valid identifier", identifier),
            });
        }
    }

    let mut seen = HashSet::new();
    for property in &entity.properties {
        if !IDENTIFIER.is_match(&property.name) || !IDENTIFIER.is_match(property.column_name()) {
            return Err(CatalogError::InvalidCatalog {
                message: format!(
                    "Property `{}` of `{}` has an invalid name or column",
                    property.name, entity.entity_type
                ),
            });
        }
        if !seen.insert(&property.name) {
            return Err(CatalogError::InvalidCatalog {
                message: format!(
                    "Duplicate property `{}` on `{}`",
                    property.name, entity.entity_type
                ),
            });
        }
    }

    if !seen.contains(&entity.primary_key) {
        return Err(CatalogError::MissingPrimaryKey {
            entity_type: entity.entity_type.clone(),
            primary_key: entity.primary_key.clone(),
        });
    }
    Ok(())
}
