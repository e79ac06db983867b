//! Metadata index synchronizer.
//!
//! Brings a collection's generated columns and their indexes into agreement
//! with a declared list of [`FieldSpec`]s. Each field moves through
//!
//! ```text
//! Unconfigured -> ColumnOnly -> Indexed
//! ```
//!
//! `ensure_*` drives fields forward from any state and is a no-op on
//! `Indexed`; `remove_field_index` drops the index before the column.
//! Every decision re-reads the live schema; nothing is cached between calls.
//! Concurrent synchronizers are tolerated, not coordinated: a create that
//! loses a race reports "already exists", which is accepted once the live
//! schema confirms the object is in place.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{BsError, Result};
use crate::schema::engine::{ColumnInfo, EngineError, EngineErrorKind, SchemaChange, SchemaEngine};
use crate::schema::field::{FieldSpec, GeneratedColumnBinding, IndexBinding};
use crate::schema::naming;

/// Result of bringing one field to the indexed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum IndexOutcome {
    /// The column, the index, or both were created.
    Created,
    /// Column and index were already in place.
    AlreadyExists,
    Failed(String),
}

impl IndexOutcome {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Result of tearing down one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    Removed,
    AlreadyAbsent,
}

/// Live state of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldState {
    Unconfigured,
    ColumnOnly,
    Indexed,
}

/// Per-field line of a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    pub field: String,
    pub outcome: IndexOutcome,
}

/// Counts over a batch report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub created: usize,
    pub already_exists: usize,
    pub failed: usize,
}

impl BatchSummary {
    #[must_use]
    pub fn from_reports(reports: &[FieldReport]) -> Self {
        reports.iter().fold(Self::default(), |mut acc, report| {
            match report.outcome {
                IndexOutcome::Created => acc.created += 1,
                IndexOutcome::AlreadyExists => acc.already_exists += 1,
                IndexOutcome::Failed(_) => acc.failed += 1,
            }
            acc
        })
    }

    #[must_use]
    pub const fn total(&self) -> usize {
        self.created + self.already_exists + self.failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Created,
    Present,
}

/// Keeps generated columns and indexes in step with field definitions.
#[derive(Debug)]
pub struct IndexSynchronizer<E> {
    engine: E,
}

impl<E: SchemaEngine> IndexSynchronizer<E> {
    pub const fn new(engine: E) -> Self {
        Self { engine }
    }

    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Ensure `spec` has its generated column and index on `collection`.
    ///
    /// Engine failures are reported as [`IndexOutcome::Failed`]. A missing
    /// collection table and an invalid spec are returned as errors.
    pub fn ensure_field_indexed(&self, collection: &str, spec: &FieldSpec) -> Result<IndexOutcome> {
        spec.validate()?;
        self.require_table(collection)?;

        match self.ensure_field(collection, spec) {
            Ok(outcome) => {
                info!(collection, field = %spec.field_name, ?outcome, "field synchronized");
                Ok(outcome)
            }
            Err(BsError::Engine(err)) if err.is(EngineErrorKind::TableNotFound) => {
                Err(BsError::CollectionNotFound(collection.to_string()))
            }
            Err(BsError::Engine(err)) => {
                warn!(collection, field = %spec.field_name, error = %err, "field failed");
                Ok(IndexOutcome::Failed(err.to_string()))
            }
            Err(other) => Err(other),
        }
    }

    /// Apply [`Self::ensure_field_indexed`] to every spec in order.
    ///
    /// Fields are independent: a failure is recorded and the batch moves on.
    /// Only a missing collection aborts the batch.
    pub fn ensure_all_indexed(&self, collection: &str, specs: &[FieldSpec]) -> Result<Vec<FieldReport>> {
        self.require_table(collection)?;
        reject_duplicate_fields(specs)?;

        let mut reports = Vec::with_capacity(specs.len());
        for spec in specs {
            let outcome = match self.ensure_field_indexed(collection, spec) {
                Ok(outcome) => outcome,
                Err(err @ BsError::CollectionNotFound(_)) => return Err(err),
                Err(err) => IndexOutcome::Failed(err.to_string()),
            };
            reports.push(FieldReport {
                field: spec.field_name.clone(),
                outcome,
            });
        }

        let summary = BatchSummary::from_reports(&reports);
        info!(
            collection,
            created = summary.created,
            already_exists = summary.already_exists,
            failed = summary.failed,
            "batch synchronized"
        );
        Ok(reports)
    }

    /// Drop a field's index, then its generated column.
    ///
    /// Objects that are already gone count as removed. If the engine still
    /// refuses the column drop because some other index covers it, those
    /// indexes are dropped and the column drop is retried once.
    pub fn remove_field_index(&self, collection: &str, field_name: &str) -> Result<RemovalOutcome> {
        naming::validate_field_name(field_name)?;
        let table = self.require_table(collection)?;
        let column = naming::generated_column_name(field_name);
        let index = naming::index_name(field_name);

        let mut removed = false;

        // Index names may be database-wide, so only drop one that lives on
        // this collection's table.
        let owns_index = self
            .engine
            .indexes(&table)?
            .iter()
            .any(|info| info.name == index);
        if owns_index {
            removed |= self.drop_ignoring_missing(&SchemaChange::DropIndex {
                table: table.clone(),
                index: index.clone(),
            })?;
        }

        let has_column = self
            .engine
            .columns(&table)?
            .iter()
            .any(|info| info.name == column);
        if has_column {
            let drop_column = SchemaChange::DropColumn {
                table: table.clone(),
                column: column.clone(),
            };
            match self.drop_ignoring_missing(&drop_column) {
                Ok(dropped) => removed |= dropped,
                Err(BsError::Engine(err)) if err.is(EngineErrorKind::DependentObjectExists) => {
                    warn!(collection, column = %column, error = %err, "column still referenced, dropping dependent indexes");
                    self.drop_covering_indexes(&table, &column)?;
                    removed |= self.drop_ignoring_missing(&drop_column)?;
                }
                Err(err) => return Err(err),
            }
        }

        let outcome = if removed {
            RemovalOutcome::Removed
        } else {
            RemovalOutcome::AlreadyAbsent
        };
        info!(collection, field = field_name, ?outcome, "field index removed");
        Ok(outcome)
    }

    /// Drop and recreate a field. Generated columns cannot be altered in
    /// place, so this is how a changed type or extraction mode is applied.
    pub fn rebuild_field_index(&self, collection: &str, spec: &FieldSpec) -> Result<IndexOutcome> {
        spec.validate()?;
        self.remove_field_index(collection, &spec.field_name)?;
        self.ensure_field_indexed(collection, spec)
    }

    /// Fields whose generated column and index both exist.
    pub fn list_indexed_fields(&self, collection: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .field_states(collection)?
            .into_iter()
            .filter(|(_, state)| *state == FieldState::Indexed)
            .map(|(field, _)| field)
            .collect())
    }

    /// State of every field that has a generated column on the collection.
    pub fn field_states(&self, collection: &str) -> Result<BTreeMap<String, FieldState>> {
        let table = self.require_table(collection)?;
        let columns = self.engine.columns(&table)?;
        let indexes = self.engine.indexes(&table)?;

        let mut states = BTreeMap::new();
        for column in columns.iter().filter(|c| c.generated) {
            let Some(field) = naming::field_from_generated_column(&column.name) else {
                continue;
            };
            let index = naming::index_name(field);
            let indexed = indexes
                .iter()
                .any(|info| info.name == index && info.covers(&column.name));
            let state = if indexed {
                FieldState::Indexed
            } else {
                FieldState::ColumnOnly
            };
            states.insert(field.to_string(), state);
        }
        Ok(states)
    }

    /// State of a single field.
    pub fn field_state(&self, collection: &str, field_name: &str) -> Result<FieldState> {
        naming::validate_field_name(field_name)?;
        Ok(self
            .field_states(collection)?
            .remove(field_name)
            .unwrap_or(FieldState::Unconfigured))
    }

    fn require_table(&self, collection: &str) -> Result<String> {
        naming::validate_collection_name(collection)?;
        let table = naming::table_name(collection);
        if self.engine.table_exists(&table)? {
            Ok(table)
        } else {
            Err(BsError::CollectionNotFound(collection.to_string()))
        }
    }

    fn ensure_field(&self, collection: &str, spec: &FieldSpec) -> Result<IndexOutcome> {
        let column = spec.column_binding(collection);
        let column_step = match self.ensure_column(&column, spec)? {
            Ok(step) => step,
            Err(drift) => return Ok(IndexOutcome::Failed(drift)),
        };

        let index = spec.index_binding(collection);
        let index_step = match self.ensure_index(&index)? {
            Ok(step) => step,
            Err(drift) => return Ok(IndexOutcome::Failed(drift)),
        };

        Ok(if column_step == Step::Created || index_step == Step::Created {
            IndexOutcome::Created
        } else {
            IndexOutcome::AlreadyExists
        })
    }

    /// The inner `Err` describes a live column that does not match the `FieldSpec`.
    fn ensure_column(
        &self,
        binding: &GeneratedColumnBinding,
        spec: &FieldSpec,
    ) -> Result<std::result::Result<Step, String>> {
        if let Some(existing) = self.find_column(binding)? {
            if !spec.sql_type.matches_declared(&existing.declared_type) {
                return Ok(Err(format!(
                    "column {} exists as {}, expected {}; rebuild the field to change it",
                    binding.column, existing.declared_type, spec.sql_type
                )));
            }
            let expected = self.engine.source_expression(binding);
            if !existing.generated_from(&expected) {
                return Ok(Err(format!(
                    "column {} is generated from {}, expected {expected}; rebuild the field to change it",
                    binding.column,
                    existing.expression.as_deref().unwrap_or_default(),
                )));
            }
            debug!(column = %binding.column, "generated column already present");
            return Ok(Ok(Step::Present));
        }

        match self
            .engine
            .apply(&SchemaChange::AddGeneratedColumn(binding.clone()))
        {
            Ok(()) => Ok(Ok(Step::Created)),
            Err(err) if err.is(EngineErrorKind::DuplicateObject) => {
                warn!(column = %binding.column, "generated column appeared concurrently");
                if self.find_column(binding)?.is_some() {
                    Ok(Ok(Step::Present))
                } else {
                    Err(err.into())
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The inner `Err` describes an index name held by some other column.
    fn ensure_index(&self, binding: &IndexBinding) -> Result<std::result::Result<Step, String>> {
        if let Some(state) = self.index_state(binding)? {
            return Ok(state.map(|()| Step::Present));
        }

        match self.engine.apply(&SchemaChange::CreateIndex(binding.clone())) {
            Ok(()) => Ok(Ok(Step::Created)),
            Err(err) if err.is(EngineErrorKind::DuplicateObject) => {
                // The name may be taken by another table's index; only accept
                // the duplicate once this table is seen to own it.
                match self.index_state(binding)? {
                    Some(Ok(())) => {
                        warn!(index = %binding.index, "index appeared concurrently");
                        Ok(Ok(Step::Present))
                    }
                    Some(Err(drift)) => Ok(Err(drift)),
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    fn find_column(&self, binding: &GeneratedColumnBinding) -> Result<Option<ColumnInfo>> {
        Ok(self
            .engine
            .columns(&binding.table)?
            .into_iter()
            .find(|c| c.name == binding.column))
    }

    /// `None` when the table has no index of that name.
    fn index_state(&self, binding: &IndexBinding) -> Result<Option<std::result::Result<(), String>>> {
        let indexes = self.engine.indexes(&binding.table)?;
        Ok(indexes
            .iter()
            .find(|info| info.name == binding.index)
            .map(|info| {
                if info.covers(&binding.column) {
                    Ok(())
                } else {
                    Err(format!(
                        "index {} exists on ({}), expected {}",
                        binding.index,
                        info.columns.join(", "),
                        binding.column
                    ))
                }
            }))
    }

    /// `Ok(false)` when the object was already gone.
    fn drop_ignoring_missing(&self, change: &SchemaChange) -> Result<bool> {
        match self.engine.apply(change) {
            Ok(()) => Ok(true),
            Err(err) if err.is(EngineErrorKind::MissingObject) => {
                debug!(object = change.object(), "already dropped");
                Ok(false)
            }
            Err(err) => Err(engine_to_bs(err, change.table())),
        }
    }

    fn drop_covering_indexes(&self, table: &str, column: &str) -> Result<()> {
        for info in self.engine.indexes(table)? {
            if info.covers(column) {
                self.drop_ignoring_missing(&SchemaChange::DropIndex {
                    table: table.to_string(),
                    index: info.name,
                })?;
            }
        }
        Ok(())
    }
}

fn engine_to_bs(err: EngineError, table: &str) -> BsError {
    if err.is(EngineErrorKind::TableNotFound) {
        let collection = naming::collection_from_table(table).unwrap_or(table);
        BsError::CollectionNotFound(collection.to_string())
    } else {
        BsError::Engine(err)
    }
}

fn reject_duplicate_fields(specs: &[FieldSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.field_name.as_str()) {
            return Err(BsError::InvalidField {
                field: spec.field_name.clone(),
                reason: "declared more than once".to_string(),
            });
        }
    }
    Ok(())
}
