//! Expanded calendar table: one row per weekday and per dated exception.

use super::{EnhancedTable, Transformer, key_column};
use crate::caches::intern::{composite_key, intern};
use crate::calendar::parse_calendar;
use crate::constants::{CANONICAL_DATE_FORMAT, columns, tables};
use crate::models::{DataRow, Field, Table};
use rayon::prelude::*;

fn detailed_headers() -> Vec<Field> {
    let key = key_column(columns::CLNDR_ID);
    [
        key.as_str(),
        columns::CLNDR_ID,
        columns::CLNDR_NAME,
        columns::ENTRY_TYPE,
        columns::DAY_OF_WEEK,
        columns::DAY_NAME,
        columns::EXCEPTION_DATE,
        columns::WORK_HOURS,
    ]
    .into_iter()
    .map(intern)
    .collect()
}

impl Transformer<'_> {
    /// `11_XER_CALENDAR_DETAILED`: requires CALENDAR.
    ///
    /// A calendar without a usable `day_hr_cnt` falls back to the configured
    /// default hours per day.
    pub fn calendar_detailed_table(&self) -> Option<Table> {
        let calendar = self.store.non_empty(tables::CALENDAR)?;
        let default_hours = self.default_hours_per_day;

        let rows: Vec<Vec<DataRow>> = calendar
            .rows()
            .par_iter()
            .map(|row| {
                let value = |column: &str| calendar.value(row, column);
                let clndr_id = value(columns::CLNDR_ID);
                let key = composite_key(row.file_name(), clndr_id);
                let id = intern(clndr_id);
                let name = intern(value(columns::CLNDR_NAME));
                let fallback = value(columns::DAY_HR_CNT)
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|hours| hours.is_finite() && *hours > 0.0)
                    .unwrap_or(default_hours);

                parse_calendar(value(columns::CLNDR_DATA), fallback)
                    .into_iter()
                    .map(|entry| {
                        let day = entry
                            .day_of_week
                            .map(|day| day.to_string())
                            .unwrap_or_default();
                        let date = entry
                            .date
                            .map(|date| date.format(CANONICAL_DATE_FORMAT).to_string())
                            .unwrap_or_default();
                        let fields = vec![
                            key.clone(),
                            id.clone(),
                            name.clone(),
                            intern(entry.kind.label()),
                            intern(&day),
                            intern(entry.day_name()),
                            intern(&date),
                            intern(&format!("{:.2}", entry.hours)),
                        ];
                        DataRow::new(fields, row.file_name_field().clone())
                    })
                    .collect()
            })
            .collect();

        let mut table =
            Table::with_headers(EnhancedTable::CalendarDetailed.name(), detailed_headers());
        table.extend_rows(rows.into_iter().flatten());
        Some(table)
    }
}
