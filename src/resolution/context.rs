//! Per-scope mapping from original query constructs to resolved replacements.
//!
//! One [`MappingResolutionContext`] exists per statement nesting level. A
//! nested statement gets a child scope that borrows its parent, so a
//! correlated reference inside a sub-query can be resolved against the
//! sources of the enclosing query without any shared mutable state.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::errors::ResolutionError;
use crate::statement_model::{ExprRef, GroupingSelectExpr, SqlEntity, SqlExpr};

/// Expression handle compared and hashed by allocation identity.
#[derive(Debug, Clone)]
pub struct ExprHandle(pub ExprRef);

impl PartialEq for ExprHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ExprHandle {}

impl Hash for ExprHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MappingKey {
    /// A from-clause item, by item name.
    QuerySource(String),
    /// A statement-model node, by identity.
    Node(ExprHandle),
    /// A statement-model node as it appears under a particular output name.
    Renamed {
        node: ExprHandle,
        name: Option<String>,
    },
}

impl MappingKey {
    pub fn source(item_name: impl Into<String>) -> Self {
        MappingKey::QuerySource(item_name.into())
    }

    pub fn node(expr: &ExprRef) -> Self {
        MappingKey::Node(ExprHandle(expr.clone()))
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingKey::QuerySource(name) => write!(f, "query source `{}`", name),
            MappingKey::Node(handle) => write!(f, "{} node {:p}", handle.0.type_name(), handle.0),
            MappingKey::Renamed { node, name } => write!(
                f,
                "{} node {:p} named {:?}",
                node.0.type_name(),
                node.0,
                name
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct MappingResolutionContext<'p> {
    parent: Option<&'p MappingResolutionContext<'p>>,
    mappings: HashMap<MappingKey, ExprRef>,
}

impl<'p> MappingResolutionContext<'p> {
    pub fn new() -> Self {
        MappingResolutionContext {
            parent: None,
            mappings: HashMap::new(),
        }
    }

    /// Creates the scope for a statement nested in this one.
    pub fn child(&self) -> MappingResolutionContext<'_> {
        MappingResolutionContext {
            parent: Some(self),
            mappings: HashMap::new(),
        }
    }

    pub fn parent(&self) -> Option<&'p MappingResolutionContext<'p>> {
        self.parent
    }

    /// Number of mappings registered in this scope (parents excluded).
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn add_mapping(
        &mut self,
        original: impl Into<MappingKey>,
        replacement: ExprRef,
    ) -> Result<(), ResolutionError> {
        let original = original.into();
        if let Some(existing) = self.mappings.get(&original) {
            // Re-adding the same replacement is a no-op.
            if Arc::ptr_eq(existing, &replacement) || existing == &replacement {
                return Ok(());
            }
            return Err(ResolutionError::DuplicateMapping {
                original: original.to_string(),
                existing: existing.type_name(),
                replacement: replacement.type_name(),
            });
        }
        log::trace!(
            "MappingResolutionContext: {} -> {}",
            original,
            replacement.type_name()
        );
        self.mappings.insert(original, replacement);
        Ok(())
    }

    pub fn try_get_mapping(&self, original: &MappingKey) -> Option<ExprRef> {
        self.mappings.get(original).cloned()
    }

    pub fn get_mapping(&self, original: &MappingKey) -> Result<ExprRef, ResolutionError> {
        self.try_get_mapping(original)
            .ok_or_else(|| ResolutionError::UnresolvedReference {
                original: original.to_string(),
            })
    }

    pub fn find_in_hierarchy(&self, original: &MappingKey) -> Option<ExprRef> {
        // Try current scope first, then walk outward
        if let Some(found) = self.mappings.get(original) {
            return Some(found.clone());
        }
        self.parent
            .and_then(|parent| parent.find_in_hierarchy(original))
    }

    pub fn get_mapping_from_hierarchy(
        &self,
        original: &MappingKey,
    ) -> Result<ExprRef, ResolutionError> {
        self.find_in_hierarchy(original)
            .ok_or_else(|| ResolutionError::UnresolvedReference {
                original: original.to_string(),
            })
    }

    /// Follows node replacements (e.g. successive grouping updates) until the
    /// newest version of `node` is reached.
    pub fn current_replacement(&self, node: &ExprRef) -> ExprRef {
        let mut current = node.clone();
        while let Some(next) = self.find_in_hierarchy(&MappingKey::node(&current)) {
            if Arc::ptr_eq(&next, &current) {
                break;
            }
            current = next;
        }
        current
    }

    /// Produces the entity `original` renamed to `new_name` and registers it.
    ///
    /// Asking for the same name twice within one scope returns the node created
    /// the first time, so every consumer sees one identity per (entity, name).
    pub fn update_entity_and_add_mapping(
        &mut self,
        original: &ExprRef,
        entity: &SqlEntity,
        new_name: Option<String>,
    ) -> Result<ExprRef, ResolutionError> {
        if entity.name == new_name {
            return Ok(original.clone());
        }

        let key = MappingKey::Renamed {
            node: ExprHandle(original.clone()),
            name: new_name.clone(),
        };
        if let Some(existing) = self.find_in_hierarchy(&key) {
            return Ok(existing);
        }

        let updated = Arc::new(SqlExpr::Entity(SqlEntity {
            table: entity.table,
            entity_type: entity.entity_type.clone(),
            name: new_name,
            columns: entity.columns.clone(),
            primary_key: entity.primary_key.clone(),
        }));
        self.add_mapping(key, updated.clone())?;
        Ok(updated)
    }

    /// Produces a grouping with new sub-expressions and registers it as the
    /// replacement for `original`; later lookups through
    /// [`current_replacement`](Self::current_replacement) observe the update.
    pub fn update_grouping_select_and_add_mapping(
        &mut self,
        original: &ExprRef,
        new_key: ExprRef,
        new_element: ExprRef,
        new_aggregations: Vec<ExprRef>,
    ) -> Result<ExprRef, ResolutionError> {
        let updated = Arc::new(SqlExpr::GroupingSelect(GroupingSelectExpr {
            key: new_key,
            element: new_element,
            aggregations: new_aggregations,
        }));
        self.add_mapping(MappingKey::node(original), updated.clone())?;
        Ok(updated)
    }
}
