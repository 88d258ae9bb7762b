//! Application constants for the XER processor
//!
//! Table names, column names, status codes, date formats and the default
//! values used throughout the processor.

// =============================================================================
// Input Format
// =============================================================================

/// Every recognised line starts with this marker
pub const LINE_MARKER: char = '%';

/// Table start tag (`%T<name>`)
pub const TAG_TABLE: char = 'T';

/// Header tag (`%F\tf1\tf2...`)
pub const TAG_FIELDS: char = 'F';

/// Data row tag (`%R\tv1\tv2...`)
pub const TAG_ROW: char = 'R';

/// Field delimiter inside header and row lines
pub const FIELD_DELIMITER: char = '\t';

/// Extension used when walking input directories
pub const XER_EXTENSION: &str = "xer";

// =============================================================================
// Output Format
// =============================================================================

/// Provenance column appended to every exported CSV
pub const PROVENANCE_COLUMN: &str = "FileName";

/// Output file extension
pub const CSV_EXTENSION: &str = "csv";

/// Canonical date-time output format
pub const CANONICAL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical date-only output format (calendar exceptions)
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Years at or below this are treated as unset dates
pub const MIN_VALID_YEAR: i32 = 1900;

/// Input date-time patterns, tried in order. Day-first precedes month-first.
pub const INPUT_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d-%b-%Y %H:%M:%S",
    "%d-%b-%Y %H:%M",
    "%d-%b-%y %H:%M:%S",
    "%d-%b-%y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// Input date-only patterns, tried after the date-time patterns
pub const INPUT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%b-%Y", "%d-%b-%y", "%d.%m.%Y",
];

// =============================================================================
// Processing Defaults
// =============================================================================

/// Lines between parser progress checks
pub const DEFAULT_PROGRESS_LINE_INTERVAL: usize = 10_000;

/// Hours per day used when a calendar does not declare one
pub const DEFAULT_HOURS_PER_DAY: f64 = 8.0;

/// Fallback hours at or above this mark a continuous-operations calendar
pub const CONTINUOUS_OPERATIONS_HOURS: f64 = 12.0;

/// Values up to this many bytes are interned while parsing
pub const DEFAULT_INTERN_MAX_LEN: usize = 64;

/// Guard used by the units and duration percent-complete formulas
pub const PERCENT_EPSILON: f64 = 1e-4;

/// Default output directory name
pub const DEFAULT_OUTPUT_DIR: &str = "xer_csv";

// =============================================================================
// Base Tables
// =============================================================================

pub mod tables {
    pub const TASK: &str = "TASK";
    pub const CALENDAR: &str = "CALENDAR";
    pub const PROJECT: &str = "PROJECT";
    pub const PROJWBS: &str = "PROJWBS";
    pub const TASKACTV: &str = "TASKACTV";
    pub const ACTVCODE: &str = "ACTVCODE";
    pub const ACTVTYPE: &str = "ACTVTYPE";
    pub const TASKPRED: &str = "TASKPRED";
    pub const RSRC: &str = "RSRC";
    pub const TASKRSRC: &str = "TASKRSRC";
}

// =============================================================================
// Column Names
// =============================================================================

pub mod columns {
    // Identifiers
    pub const TASK_ID: &str = "task_id";
    pub const PROJ_ID: &str = "proj_id";
    pub const WBS_ID: &str = "wbs_id";
    pub const PARENT_WBS_ID: &str = "parent_wbs_id";
    pub const CLNDR_ID: &str = "clndr_id";

    // TASK
    pub const STATUS_CODE: &str = "status_code";
    pub const COMPLETE_PCT_TYPE: &str = "complete_pct_type";
    pub const PHYS_COMPLETE_PCT: &str = "phys_complete_pct";
    pub const ACT_WORK_QTY: &str = "act_work_qty";
    pub const REMAIN_WORK_QTY: &str = "remain_work_qty";
    pub const TARGET_DRTN_HR_CNT: &str = "target_drtn_hr_cnt";
    pub const REMAIN_DRTN_HR_CNT: &str = "remain_drtn_hr_cnt";
    pub const TOTAL_FLOAT_HR_CNT: &str = "total_float_hr_cnt";
    pub const FREE_FLOAT_HR_CNT: &str = "free_float_hr_cnt";
    pub const ACT_START_DATE: &str = "act_start_date";
    pub const ACT_END_DATE: &str = "act_end_date";
    pub const EARLY_START_DATE: &str = "early_start_date";
    pub const EARLY_END_DATE: &str = "early_end_date";
    pub const LATE_END_DATE: &str = "late_end_date";

    // CALENDAR
    pub const CLNDR_NAME: &str = "clndr_name";
    pub const CLNDR_DATA: &str = "clndr_data";
    pub const DAY_HR_CNT: &str = "day_hr_cnt";

    // PROJECT
    pub const LAST_RECALC_DATE: &str = "last_recalc_date";

    /// Suffix of every synthetic join-key column
    pub const KEY_SUFFIX: &str = "_key";

    // Computed columns of the primary task table
    pub const START: &str = "Start";
    pub const FINISH: &str = "Finish";
    pub const ORIGINAL_DURATION: &str = "Original Duration";
    pub const REMAINING_DURATION: &str = "Remaining Duration";
    pub const TOTAL_FLOAT: &str = "Total Float";
    pub const FREE_FLOAT: &str = "Free Float";
    pub const PERCENT_COMPLETE: &str = "%";
    pub const DATA_DATE: &str = "data_date";

    // Detailed calendar columns
    pub const ENTRY_TYPE: &str = "entry_type";
    pub const DAY_OF_WEEK: &str = "day_of_week";
    pub const DAY_NAME: &str = "day_name";
    pub const EXCEPTION_DATE: &str = "exception_date";
    pub const WORK_HOURS: &str = "work_hours";
}

// =============================================================================
// Status and Percent-Complete Codes
// =============================================================================

pub mod status {
    pub const NOT_STARTED: &str = "TK_NotStart";
    pub const ACTIVE: &str = "TK_Active";
    pub const COMPLETE: &str = "TK_Complete";
}

pub mod percent_type {
    pub const PHYSICAL: &str = "CP_Phys";
    pub const UNITS: &str = "CP_Units";
}

/// Human label for a task status code; unknown codes pass through
pub fn status_label(code: &str) -> Option<&'static str> {
    match code {
        status::NOT_STARTED => Some("Not Started"),
        status::ACTIVE => Some("In Progress"),
        status::COMPLETE => Some("Complete"),
        _ => None,
    }
}

/// Name of a day-of-week slot (Sunday = 1 .. Saturday = 7)
pub fn day_name(day: u8) -> &'static str {
    match day {
        1 => "Sunday",
        2 => "Monday",
        3 => "Tuesday",
        4 => "Wednesday",
        5 => "Thursday",
        6 => "Friday",
        7 => "Saturday",
        _ => "",
    }
}

/// Output file name for a table
pub fn output_filename(table_name: &str) -> String {
    format!("{}.{}", table_name, CSV_EXTENSION)
}

/// Whether a table name read from an export can become a file name inside
/// the output directory: no path separators, drive prefixes, control
/// characters or dot-only names
pub fn is_safe_table_name(table_name: &str) -> bool {
    !table_name.is_empty()
        && !table_name.chars().all(|c| c == '.')
        && !table_name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
}

/// Whether a column name holds a date that should be reformatted
pub fn is_date_column(column_name: &str) -> bool {
    column_name.to_ascii_lowercase().ends_with("_date")
}
