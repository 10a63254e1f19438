//! Table map records and the per-stream cache that row events resolve against.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use super::bitset::Bitset;
use super::metadata::ColumnMetadata;

/// Column layout of one table, as declared by a table map event.
///
/// `column_types`, `column_metadata` and `nullable` always describe the same
/// number of columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDefinition {
    pub table_id: u64,
    pub database_name: String,
    pub table_name: String,
    pub column_types: Vec<u8>,
    pub column_metadata: Vec<Option<ColumnMetadata>>,
    pub nullable: Bitset,
}

impl SchemaDefinition {
    pub fn column_count(&self) -> usize {
        self.column_types.len()
    }

    /// `database.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database_name, self.table_name)
    }
}

/// Maps table ids to the first table map seen for each id.
///
/// One cache belongs to one log stream; there is no eviction.
#[derive(Debug, Default)]
pub struct SchemaCache {
    tables: HashMap<u64, SchemaDefinition>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table_id: u64) -> Option<&SchemaDefinition> {
        self.tables.get(&table_id)
    }

    /// Stores `definition` unless its table id is already cached.
    ///
    /// Returns `false` when an earlier definition was kept.
    pub fn insert_if_absent(&mut self, definition: SchemaDefinition) -> bool {
        match self.tables.get(&definition.table_id) {
            Some(existing) => {
                if existing != &definition {
                    debug!(
                        "Ignoring redefinition of table id {} ({})",
                        definition.table_id,
                        definition.qualified_name()
                    );
                }
                false
            }
            None => {
                debug!(
                    "TABLE_MAP: {}={}",
                    definition.table_id,
                    definition.qualified_name()
                );
                self.tables.insert(definition.table_id, definition);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaDefinition> {
        self.tables.values()
    }
}
