//! Transformer tests
//!
//! Fixtures are assembled as XER text and run through the real parser so
//! every test sees rows exactly as a parsed file would produce them.

pub mod keyed_tables;

use crate::config::XerConfig;
use crate::models::{DataRow, DataStore, Table};
use crate::parser::XerParser;
use std::io::Cursor;
use std::path::Path;

/// Builds XER text one section at a time
#[derive(Debug)]
pub struct XerBuilder {
    text: String,
}

impl XerBuilder {
    pub fn new() -> Self {
        Self {
            text: "ERMHDR\t19.12\tExport\n".to_string(),
        }
    }

    pub fn table(mut self, name: &str, headers: &[&str]) -> Self {
        self.text.push_str(&format!("%T\t{}\n%F\t{}\n", name, headers.join("\t")));
        self
    }

    pub fn row(mut self, values: &[&str]) -> Self {
        self.text.push_str(&format!("%R\t{}\n", values.join("\t")));
        self
    }

    pub fn build(mut self) -> String {
        self.text.push_str("%E\n");
        self.text
    }
}

/// Parse XER text as though it came from a file called `file_name`
pub fn store_from(file_name: &str, text: &str) -> DataStore {
    XerParser::new(&XerConfig::default())
        .parse_reader(
            Cursor::new(text.as_bytes().to_vec()),
            Path::new(file_name),
            file_name,
            text.len() as u64,
            |_| {},
        )
        .unwrap()
}

pub const STANDARD_CALENDAR: &str = "(0||CalendarData()((0||DaysOfWeek()((0||1()())(0||2()((0||0(s|08:00|f|16:00)())))(0||7()())))(0||Exceptions()((0||0(d|45292)())))))";

pub const TASK_HEADERS: [&str; 18] = [
    "task_id",
    "proj_id",
    "wbs_id",
    "clndr_id",
    "status_code",
    "complete_pct_type",
    "phys_complete_pct",
    "act_work_qty",
    "remain_work_qty",
    "target_drtn_hr_cnt",
    "remain_drtn_hr_cnt",
    "total_float_hr_cnt",
    "free_float_hr_cnt",
    "act_start_date",
    "act_end_date",
    "early_start_date",
    "early_end_date",
    "late_end_date",
];

/// One project with a calendar, a three-node WBS and four tasks covering
/// each status and completion type
pub fn sample_xer(last_recalc_date: &str) -> String {
    XerBuilder::new()
        .table("PROJECT", &["proj_id", "proj_short_name", "last_recalc_date"])
        .row(&["10", "ALPHA", last_recalc_date])
        .table("CALENDAR", &["clndr_id", "clndr_name", "day_hr_cnt", "clndr_data"])
        .row(&["5", "Standard", "8", STANDARD_CALENDAR])
        .table("PROJWBS", &["wbs_id", "proj_id", "parent_wbs_id", "wbs_name"])
        .row(&["100", "10", "", "Root"])
        .row(&["101", "10", "100", "Child"])
        .row(&["102", "10", "999", "Orphan"])
        .table("TASK", &TASK_HEADERS)
        .row(&[
            "1", "10", "101", "5", "TK_Complete", "CP_Drtn", "0", "0", "0", "80", "0", "16", "8",
            "2024-01-02 08:00", "2024-01-12 17:00", "", "", "",
        ])
        .row(&[
            "2", "10", "101", "5", "TK_Active", "CP_Units", "0", "30", "10", "40", "16", "-8", "0",
            "2024-01-03 08:00", "", "2024-01-03 08:00", "2024-01-10 17:00", "2024-01-11 17:00",
        ])
        .row(&[
            "3", "10", "101", "5", "TK_NotStart", "CP_Phys", "150", "0", "0", "24", "24", "8", "4",
            "", "", "2024-02-01 08:00", "2024-02-03 17:00", "2024-02-05 17:00",
        ])
        .row(&[
            "4", "10", "101", "99", "TK_NotStart", "CP_Drtn", "0", "0", "0", "16", "16", "8", "0",
            "", "", "", "2024-02-06 17:00", "",
        ])
        .build()
}

/// The row whose `column` equals `value`
pub fn find_row<'a>(table: &'a Table, column: &str, value: &str) -> &'a DataRow {
    table
        .rows()
        .iter()
        .find(|row| table.value(row, column) == value)
        .unwrap_or_else(|| panic!("no row in {} with {} = {}", table.name(), column, value))
}
