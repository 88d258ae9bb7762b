//! Base tables with composite key columns appended.

use super::{EnhancedTable, Transformer, extend_headers, key_column};
use crate::caches::intern::{composite_key, intern};
use crate::constants::{columns, tables};
use crate::models::{DataRow, Field, Table};
use rayon::prelude::*;
use std::collections::HashSet;

/// Composite keys for `fields`, in order, blank where the field is missing
fn keys_for(source: &Table, row: &DataRow, fields: &[&str]) -> Vec<Field> {
    fields
        .iter()
        .map(|field| composite_key(row.file_name(), source.value(row, field)))
        .collect()
}

impl Transformer<'_> {
    /// Copy `source` verbatim and append one `<field>_key` column per key field
    pub fn keyed_table(
        &self,
        output_name: &str,
        source: &str,
        key_fields: &[&str],
    ) -> Option<Table> {
        let source = self.store.non_empty(source)?;
        let headers = extend_headers(source.headers(), key_fields.iter().map(|f| key_column(f)));

        let rows: Vec<DataRow> = source
            .rows()
            .par_iter()
            .map(|row| {
                let mut fields = row.fields().to_vec();
                fields.extend(keys_for(source, row, key_fields));
                DataRow::new(fields, row.file_name_field().clone())
            })
            .collect();

        let mut table = Table::with_headers(output_name, headers);
        table.extend_rows(rows);
        Some(table)
    }

    /// `03_XER_PROJWBS` with `wbs_id_key` and `parent_wbs_id_key`.
    ///
    /// A parent key that names no WBS node in the output is blanked, so
    /// top-level nodes and nodes whose parent lives in another project file
    /// both come out as roots.
    pub fn wbs_table(&self) -> Option<Table> {
        let source = self.store.non_empty(tables::PROJWBS)?;
        let key_fields = [columns::WBS_ID, columns::PARENT_WBS_ID];
        let headers = extend_headers(source.headers(), key_fields.iter().map(|f| key_column(f)));

        let mut keyed: Vec<(Vec<Field>, Field)> = source
            .rows()
            .par_iter()
            .map(|row| {
                let mut fields = row.fields().to_vec();
                fields.extend(keys_for(source, row, &key_fields));
                (fields, row.file_name_field().clone())
            })
            .collect();

        let width = headers.len();
        let (own, parent) = (width - 2, width - 1);
        let known: HashSet<Field> = keyed
            .iter()
            .map(|(fields, _)| fields[own].clone())
            .filter(|key| !key.is_empty())
            .collect();

        let blank = intern("");
        let mut orphans = 0usize;
        for (fields, _) in &mut keyed {
            if !fields[parent].is_empty() && !known.contains(&fields[parent]) {
                fields[parent] = blank.clone();
                orphans += 1;
            }
        }
        if orphans > 0 {
            tracing::debug!("Blanked {} WBS parent keys with no matching node", orphans);
        }

        let mut table = Table::with_headers(EnhancedTable::Wbs.name(), headers);
        table.extend_rows(
            keyed
                .into_iter()
                .map(|(fields, file_name)| DataRow::new(fields, file_name)),
        );
        Some(table)
    }
}
