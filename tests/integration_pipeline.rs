//! End-to-end tests through the public API
//!
//! Writes small XER exports to a temporary directory, parses them with
//! `XerProcessor`, exports enhanced tables and reads the CSV files back.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use xer_processor::{DataStore, EnhancedTable, Transformer, XerConfig, XerParser, XerProcessor};

fn xer_text(proj_id: &str, data_date: &str) -> String {
    [
        "ERMHDR\t19.12\tProject\tExport",
        "%T\tPROJECT",
        "%F\tproj_id\tproj_short_name\tlast_recalc_date",
        &format!("%R\t{}\tDEMO\t{}", proj_id, data_date),
        "%T\tCALENDAR",
        "%F\tclndr_id\tclndr_name\tday_hr_cnt\tclndr_data",
        "%R\t1\tFive Day\t8\t",
        "%T\tTASK",
        "%F\ttask_id\tproj_id\tclndr_id\tstatus_code\tcomplete_pct_type\ttarget_drtn_hr_cnt\tremain_drtn_hr_cnt\ttask_name",
        &format!("%R\t7\t{}\t1\tTK_Complete\tCP_Drtn\t40\t0\tPour, cure", proj_id),
        &format!("%R\t8\t{}\t1\tTK_NotStart\tCP_Drtn\t40\t40\tStrip \"forms\"", proj_id),
        "%E",
    ]
    .join("\r\n")
}

fn write_input(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn read_csv(path: &Path) -> (csv::StringRecord, Vec<csv::StringRecord>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    let records = reader.records().map(|r| r.unwrap()).collect();
    (headers, records)
}

fn column(headers: &csv::StringRecord, name: &str) -> usize {
    headers
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("missing column {}", name))
}

#[tokio::test]
async fn test_parse_and_export_task_and_baseline() {
    let temp_dir = TempDir::new().unwrap();
    let inputs = vec![
        write_input(temp_dir.path(), "march.xer", &xer_text("20", "2024-03-01 00:00")),
        write_input(temp_dir.path(), "january.xer", &xer_text("20", "2024-01-15 00:00")),
    ];
    let output = temp_dir.path().join("out");

    let processor = XerProcessor::new(XerConfig::default().with_workers(2));
    let parsed = processor.parse_files(&inputs).await;
    assert_eq!(parsed.files_parsed, 2);
    assert!(parsed.failures.is_empty());

    let requested = vec![
        EnhancedTable::Task.name().to_string(),
        EnhancedTable::Baseline.name().to_string(),
    ];
    let exported = processor
        .export_tables(Arc::new(parsed.store), &requested, &output)
        .await
        .unwrap();
    assert_eq!(exported.written.len(), 2);
    assert!(exported.failures.is_empty());

    let (headers, records) = read_csv(&output.join("01_XER_TASK.csv"));
    assert_eq!(records.len(), 4);
    assert_eq!(headers.iter().last(), Some("FileName"));

    let status = column(&headers, "status_code");
    let percent = column(&headers, "%");
    let key = column(&headers, "task_id_key");
    let name = column(&headers, "task_name");

    let complete = records
        .iter()
        .find(|r| &r[key] == "march.xer.7")
        .unwrap();
    assert_eq!(&complete[status], "Complete");
    assert_eq!(&complete[percent], "100.00");
    assert_eq!(&complete[name], "Pour, cure");

    let not_started = records
        .iter()
        .find(|r| &r[key] == "january.xer.8")
        .unwrap();
    assert_eq!(&not_started[status], "Not Started");
    assert_eq!(&not_started[percent], "0.00");
    assert_eq!(&not_started[name], "Strip \"forms\"");

    // Only the file with the earliest data date survives in the baseline
    let (headers, records) = read_csv(&output.join("04_XER_BASELINE.csv"));
    let file = headers.len() - 1;
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| &r[file] == "january.xer"));
}

#[test]
fn test_transformer_over_parsed_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_input(temp_dir.path(), "one.xer", &xer_text("3", "2024-05-01 00:00"));

    let mut last_percent = 0;
    let store: DataStore = XerParser::new(&XerConfig::default())
        .parse_file(&path, |percent| {
            assert!(percent >= last_percent);
            last_percent = percent;
        })
        .unwrap();
    assert_eq!(last_percent, 100);
    assert_eq!(store.get("TASK").unwrap().row_count(), 2);

    let transformer = Transformer::new(&store, 8.0);
    let project = transformer.build(EnhancedTable::Project, None).unwrap();
    assert_eq!(project.value(&project.rows()[0], "proj_id_key"), "one.xer.3");

    // No PROJWBS section in this export
    assert!(transformer.build(EnhancedTable::Wbs, None).is_none());
}
