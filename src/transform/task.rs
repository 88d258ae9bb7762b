//! Primary task table and baseline derivation.

use super::{EnhancedTable, Transformer, extend_headers, key_column};
use crate::caches::date_cache::{format_date, parse_date};
use crate::caches::intern::{composite_key, intern};
use crate::constants::{
    PERCENT_EPSILON, columns, is_date_column, percent_type, status, status_label, tables,
};
use crate::models::{DataRow, Field, Table};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashMap;

/// Columns appended to the primary task table, in output order
const COMPUTED_COLUMNS: [&str; 8] = [
    columns::START,
    columns::FINISH,
    columns::ORIGINAL_DURATION,
    columns::REMAINING_DURATION,
    columns::TOTAL_FLOAT,
    columns::FREE_FLOAT,
    columns::PERCENT_COMPLETE,
    columns::DATA_DATE,
];

/// Raw id columns turned into `_key` columns
const KEYED_IDS: [&str; 4] = [
    columns::WBS_ID,
    columns::TASK_ID,
    columns::CLNDR_ID,
    columns::PROJ_ID,
];

/// Raw numbers feeding the percent-complete formulas
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PercentInputs {
    pub physical: f64,
    pub actual_units: f64,
    pub remaining_units: f64,
    pub target_duration: f64,
    pub remaining_duration: f64,
}

/// Percent complete in [0, 100] for a task.
///
/// Completed tasks are always 100. Otherwise the completion type selects
/// physical percent, units percent or duration percent; duration percent
/// is used for unknown types.
pub fn percent_complete(status_code: &str, pct_type: &str, inputs: &PercentInputs) -> f64 {
    if status_code == status::COMPLETE {
        return 100.0;
    }
    let raw = match pct_type {
        percent_type::PHYSICAL => inputs.physical,
        percent_type::UNITS => {
            let total = inputs.actual_units + inputs.remaining_units;
            if total > PERCENT_EPSILON {
                inputs.actual_units / total * 100.0
            } else {
                0.0
            }
        }
        _ => {
            if inputs.target_duration > PERCENT_EPSILON {
                (inputs.target_duration - inputs.remaining_duration) / inputs.target_duration
                    * 100.0
            } else {
                0.0
            }
        }
    };
    if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 100.0) }
}

fn number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn format_number(value: f64) -> String {
    format!("{:.2}", value)
}

/// Hour count converted to days on the task's calendar, blank when unknown
fn days(hours: &str, hours_per_day: Option<f64>) -> String {
    match (number(hours), hours_per_day) {
        (Some(hours), Some(per_day)) => format_number(hours / per_day),
        _ => String::new(),
    }
}

fn first_date<'v>(candidates: impl IntoIterator<Item = &'v str>) -> String {
    candidates
        .into_iter()
        .map(format_date)
        .find(|formatted| !formatted.is_empty())
        .unwrap_or_default()
}

impl Transformer<'_> {
    /// `01_XER_TASK`: requires TASK, CALENDAR and PROJECT
    pub fn task_table(&self) -> Option<Table> {
        let task = self.store.non_empty(tables::TASK)?;
        let calendar = self.store.non_empty(tables::CALENDAR)?;
        let project = self.store.non_empty(tables::PROJECT)?;

        let hours_per_day: HashMap<Field, f64> = calendar
            .rows()
            .iter()
            .filter_map(|row| {
                let key = composite_key(row.file_name(), calendar.value(row, columns::CLNDR_ID));
                let hours = number(calendar.value(row, columns::DAY_HR_CNT)).filter(|h| *h > 0.0)?;
                Some((key, hours))
            })
            .collect();

        let data_dates: HashMap<Field, String> = project
            .rows()
            .iter()
            .map(|row| {
                (
                    composite_key(row.file_name(), project.value(row, columns::PROJ_ID)),
                    format_date(project.value(row, columns::LAST_RECALC_DATE)),
                )
            })
            .collect();

        let date_columns: Vec<usize> = task
            .headers()
            .iter()
            .enumerate()
            .filter(|(_, name)| is_date_column(name))
            .map(|(index, _)| index)
            .collect();
        let status_column = task.column_index(columns::STATUS_CODE);

        let headers = extend_headers(
            task.headers(),
            COMPUTED_COLUMNS
                .iter()
                .map(|name| name.to_string())
                .chain(KEYED_IDS.iter().map(|id| key_column(id))),
        );

        let rows: Vec<DataRow> = task
            .rows()
            .par_iter()
            .map(|row| {
                let file = row.file_name();
                let value = |column: &str| task.value(row, column);
                let status_code = value(columns::STATUS_CODE);

                let mut fields: Vec<Field> = row.fields().to_vec();
                for &index in &date_columns {
                    if let Some(raw) = row.get(index) {
                        fields[index] = intern(&format_date(raw));
                    }
                }
                if let (Some(index), Some(label)) = (status_column, status_label(status_code)) {
                    fields[index] = intern(label);
                }

                let (start, finish) = schedule_dates(task, row, status_code);
                let per_day = hours_per_day
                    .get(&composite_key(file, value(columns::CLNDR_ID)))
                    .copied();
                let complete = status_code == status::COMPLETE;
                let (total_float, free_float) = if complete {
                    (String::new(), String::new())
                } else {
                    (
                        days(value(columns::TOTAL_FLOAT_HR_CNT), per_day),
                        days(value(columns::FREE_FLOAT_HR_CNT), per_day),
                    )
                };
                let inputs = PercentInputs {
                    physical: number(value(columns::PHYS_COMPLETE_PCT)).unwrap_or(0.0),
                    actual_units: number(value(columns::ACT_WORK_QTY)).unwrap_or(0.0),
                    remaining_units: number(value(columns::REMAIN_WORK_QTY)).unwrap_or(0.0),
                    target_duration: number(value(columns::TARGET_DRTN_HR_CNT)).unwrap_or(0.0),
                    remaining_duration: number(value(columns::REMAIN_DRTN_HR_CNT)).unwrap_or(0.0),
                };
                let percent = percent_complete(
                    status_code,
                    value(columns::COMPLETE_PCT_TYPE),
                    &inputs,
                );
                let data_date = data_dates
                    .get(&composite_key(file, value(columns::PROJ_ID)))
                    .cloned()
                    .unwrap_or_default();

                fields.extend([
                    intern(&start),
                    intern(&finish),
                    intern(&days(value(columns::TARGET_DRTN_HR_CNT), per_day)),
                    intern(&days(value(columns::REMAIN_DRTN_HR_CNT), per_day)),
                    intern(&total_float),
                    intern(&free_float),
                    intern(&format_number(percent)),
                    intern(&data_date),
                ]);
                fields.extend(KEYED_IDS.iter().map(|id| composite_key(file, value(*id))));

                DataRow::new(fields, row.file_name_field().clone())
            })
            .collect();

        let mut table = Table::with_headers(EnhancedTable::Task.name(), headers);
        table.extend_rows(rows);
        Some(table)
    }

    /// `04_XER_BASELINE`: rows of the primary task table whose data date
    /// falls on the earliest data date seen
    pub fn baseline_table(&self, task_table: &Table) -> Option<Table> {
        if task_table.is_empty() {
            return None;
        }
        let column = task_table.column_index(columns::DATA_DATE)?;
        let day_of = |row: &DataRow| -> Option<NaiveDate> {
            row.get(column).and_then(parse_date).map(|dt| dt.date())
        };

        let earliest = task_table.rows().iter().filter_map(|row| day_of(row)).min()?;

        let mut table = Table::with_headers(
            EnhancedTable::Baseline.name(),
            task_table.headers().to_vec(),
        );
        table.extend_rows(
            task_table
                .rows()
                .iter()
                .filter(|row| day_of(*row) == Some(earliest))
                .cloned(),
        );
        Some(table)
    }
}

/// `Start` and `Finish` chosen by task status
fn schedule_dates(task: &Table, row: &DataRow, status_code: &str) -> (String, String) {
    let value = |column: &str| task.value(row, column);

    let start = if status_code == status::NOT_STARTED {
        first_date([
            value(columns::EARLY_START_DATE),
            value(columns::EARLY_END_DATE),
        ])
    } else {
        first_date([value(columns::ACT_START_DATE), value(columns::ACT_END_DATE)])
    };

    let finish = if status_code == status::COMPLETE {
        format_date(value(columns::ACT_END_DATE))
    } else {
        first_date([
            value(columns::EARLY_END_DATE),
            value(columns::LATE_END_DATE),
            value(columns::ACT_END_DATE),
        ])
    };

    (start, finish)
}
