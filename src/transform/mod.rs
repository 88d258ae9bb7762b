//! Enhanced table derivation.
//!
//! Builds denormalised tables from a merged [`DataStore`]: computed task
//! fields, synthetic `_key` columns that keep identical raw ids from
//! different files apart, a filtered baseline, an orphan-repaired WBS tree
//! and an expanded calendar.
//!
//! ## Architecture
//!
//! - [`task`] - primary task table and the baseline filtered from it
//! - [`keyed`] - base tables copied verbatim with key columns appended, and
//!   the WBS tree
//! - [`calendar`] - per-day and per-exception calendar rows
//!
//! Every builder returns `None` when a prerequisite base table is missing or
//! empty. Rows are derived independently on the rayon pool, so row order in
//! the output is not meaningful.

pub mod calendar;
pub mod keyed;
pub mod task;

#[cfg(test)]
pub mod tests;

use crate::constants::{columns, tables};
use crate::models::{DataStore, Field, Table};
use std::sync::Arc;
use tracing::{debug, warn};

/// Enhanced tables the transformer can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnhancedTable {
    Task,
    Project,
    Wbs,
    Baseline,
    Predecessor,
    ActvType,
    ActvCode,
    TaskActv,
    Calendar,
    CalendarDetailed,
    Rsrc,
    TaskRsrc,
}

impl EnhancedTable {
    pub const ALL: [EnhancedTable; 12] = [
        EnhancedTable::Task,
        EnhancedTable::Project,
        EnhancedTable::Wbs,
        EnhancedTable::Baseline,
        EnhancedTable::Predecessor,
        EnhancedTable::ActvType,
        EnhancedTable::ActvCode,
        EnhancedTable::TaskActv,
        EnhancedTable::Calendar,
        EnhancedTable::CalendarDetailed,
        EnhancedTable::Rsrc,
        EnhancedTable::TaskRsrc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EnhancedTable::Task => "01_XER_TASK",
            EnhancedTable::Project => "02_XER_PROJECT",
            EnhancedTable::Wbs => "03_XER_PROJWBS",
            EnhancedTable::Baseline => "04_XER_BASELINE",
            EnhancedTable::Predecessor => "06_XER_PREDECESSOR",
            EnhancedTable::ActvType => "07_XER_ACTVTYPE",
            EnhancedTable::ActvCode => "08_XER_ACTVCODE",
            EnhancedTable::TaskActv => "09_XER_TASKACTV",
            EnhancedTable::Calendar => "10_XER_CALENDAR",
            EnhancedTable::CalendarDetailed => "11_XER_CALENDAR_DETAILED",
            EnhancedTable::Rsrc => "12_XER_RSRC",
            EnhancedTable::TaskRsrc => "13_XER_TASKRSRC",
        }
    }

    /// Case-insensitive lookup by enhanced table name
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|table| table.name().eq_ignore_ascii_case(name))
    }

    /// Base tables that must be present and non-empty
    pub fn prerequisites(&self) -> &'static [&'static str] {
        match self {
            EnhancedTable::Task | EnhancedTable::Baseline => {
                &[tables::TASK, tables::CALENDAR, tables::PROJECT]
            }
            EnhancedTable::Project => &[tables::PROJECT],
            EnhancedTable::Wbs => &[tables::PROJWBS],
            EnhancedTable::Predecessor => &[tables::TASKPRED],
            EnhancedTable::ActvType => &[tables::ACTVTYPE],
            EnhancedTable::ActvCode => &[tables::ACTVCODE],
            EnhancedTable::TaskActv => &[tables::TASKACTV],
            EnhancedTable::Calendar | EnhancedTable::CalendarDetailed => &[tables::CALENDAR],
            EnhancedTable::Rsrc => &[tables::RSRC],
            EnhancedTable::TaskRsrc => &[tables::TASKRSRC],
        }
    }

    /// Whether building this table needs the primary task table first
    pub fn depends_on_task_table(&self) -> bool {
        matches!(self, EnhancedTable::Baseline)
    }

    pub fn is_available(&self, store: &DataStore) -> bool {
        self.prerequisites()
            .iter()
            .all(|name| store.non_empty(name).is_some())
    }
}

/// Base tables in the store followed by every enhanced table that can be built
pub fn available_tables(store: &DataStore) -> Vec<String> {
    let mut names = store.table_names();
    names.extend(
        EnhancedTable::ALL
            .iter()
            .filter(|table| table.is_available(store))
            .map(|table| table.name().to_string()),
    );
    names
}

/// Derives enhanced tables from one merged store
#[derive(Debug, Clone, Copy)]
pub struct Transformer<'a> {
    store: &'a DataStore,
    default_hours_per_day: f64,
}

impl<'a> Transformer<'a> {
    pub fn new(store: &'a DataStore, default_hours_per_day: f64) -> Self {
        Self {
            store,
            default_hours_per_day,
        }
    }

    pub fn store(&self) -> &'a DataStore {
        self.store
    }

    pub fn default_hours_per_day(&self) -> f64 {
        self.default_hours_per_day
    }

    /// Build one enhanced table.
    ///
    /// `task_table` is a previously built primary task table; the baseline
    /// reuses it instead of deriving it again.
    pub fn build(&self, table: EnhancedTable, task_table: Option<&Table>) -> Option<Table> {
        let built = match table {
            EnhancedTable::Task => self.task_table(),
            EnhancedTable::Baseline => match task_table {
                Some(task) => self.baseline_table(task),
                None => self
                    .task_table()
                    .and_then(|task| self.baseline_table(&task)),
            },
            EnhancedTable::Wbs => self.wbs_table(),
            EnhancedTable::CalendarDetailed => self.calendar_detailed_table(),
            keyed => {
                let (source, keys) = keyed_source(keyed)?;
                self.keyed_table(keyed.name(), source, keys)
            }
        };

        match &built {
            Some(result) => debug!("Built {} with {} rows", table.name(), result.row_count()),
            None => warn!(
                "Skipped {}: prerequisite tables {:?} missing or empty",
                table.name(),
                table.prerequisites()
            ),
        }
        built
    }
}

/// Source table and key fields of the simple keyed tables
fn keyed_source(table: EnhancedTable) -> Option<(&'static str, &'static [&'static str])> {
    let source: (&'static str, &'static [&'static str]) = match table {
        EnhancedTable::Project => (tables::PROJECT, &[columns::PROJ_ID]),
        EnhancedTable::Predecessor => (
            tables::TASKPRED,
            &["task_pred_id", columns::TASK_ID, "pred_task_id", columns::PROJ_ID, "pred_proj_id"],
        ),
        EnhancedTable::ActvType => (tables::ACTVTYPE, &["actv_code_type_id", columns::PROJ_ID]),
        EnhancedTable::ActvCode => (
            tables::ACTVCODE,
            &["actv_code_id", "parent_actv_code_id", "actv_code_type_id"],
        ),
        EnhancedTable::TaskActv => (
            tables::TASKACTV,
            &[columns::TASK_ID, "actv_code_type_id", "actv_code_id", columns::PROJ_ID],
        ),
        EnhancedTable::Calendar => (
            tables::CALENDAR,
            &[columns::CLNDR_ID, "base_clndr_id", columns::PROJ_ID],
        ),
        EnhancedTable::Rsrc => (tables::RSRC, &["rsrc_id", "parent_rsrc_id", columns::CLNDR_ID]),
        EnhancedTable::TaskRsrc => (
            tables::TASKRSRC,
            &["taskrsrc_id", columns::TASK_ID, columns::PROJ_ID, "rsrc_id"],
        ),
        _ => return None,
    };
    Some(source)
}

/// `<field>_key`
pub fn key_column(field: &str) -> String {
    format!("{}{}", field, columns::KEY_SUFFIX)
}

/// Base headers followed by extra column names
fn extend_headers(base: &[Field], extra: impl IntoIterator<Item = String>) -> Vec<Field> {
    base.iter()
        .cloned()
        .chain(extra.into_iter().map(|name| Arc::from(name.as_str())))
        .collect()
}
