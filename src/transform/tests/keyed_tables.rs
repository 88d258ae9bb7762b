//! Keyed table, WBS and catalogue tests

use super::{XerBuilder, find_row, sample_xer, store_from};
use crate::transform::{EnhancedTable, Transformer, available_tables};

#[test]
fn test_wbs_orphan_parents_are_blanked() {
    let store = store_from("a.xer", &sample_xer("2024-01-01 00:00"));
    let table = Transformer::new(&store, 8.0)
        .build(EnhancedTable::Wbs, None)
        .unwrap();

    assert_eq!(table.name(), "03_XER_PROJWBS");
    assert_eq!(table.row_count(), 3);

    let root = find_row(&table, "wbs_name", "Root");
    assert_eq!(table.value(root, "wbs_id_key"), "a.xer.100");
    assert_eq!(table.value(root, "parent_wbs_id_key"), "");

    let child = find_row(&table, "wbs_name", "Child");
    assert_eq!(table.value(child, "parent_wbs_id_key"), "a.xer.100");

    let orphan = find_row(&table, "wbs_name", "Orphan");
    assert_eq!(table.value(orphan, "parent_wbs_id_key"), "");
    // The raw parent id is left untouched
    assert_eq!(table.value(orphan, "parent_wbs_id"), "999");
}

#[test]
fn test_wbs_parent_in_other_file_is_orphaned() {
    let first = XerBuilder::new()
        .table("PROJWBS", &["wbs_id", "parent_wbs_id"])
        .row(&["1", ""])
        .build();
    let second = XerBuilder::new()
        .table("PROJWBS", &["wbs_id", "parent_wbs_id"])
        .row(&["2", "1"])
        .build();
    let mut store = store_from("a.xer", &first);
    store.merge(store_from("b.xer", &second));

    let table = Transformer::new(&store, 8.0).wbs_table().unwrap();
    let node = find_row(&table, "wbs_id", "2");
    assert_eq!(table.value(node, "parent_wbs_id_key"), "");
}

#[test]
fn test_predecessor_keys_with_missing_column() {
    let text = XerBuilder::new()
        .table("TASKPRED", &["task_pred_id", "task_id", "pred_task_id", "proj_id", "pred_type"])
        .row(&["7", "2", "1", "10", "PR_FS"])
        .build();
    let store = store_from("plan.xer", &text);
    let table = Transformer::new(&store, 8.0)
        .build(EnhancedTable::Predecessor, None)
        .unwrap();

    assert_eq!(table.name(), "06_XER_PREDECESSOR");
    let headers: Vec<&str> = table.headers().iter().map(|h| h.as_ref()).collect();
    assert_eq!(
        headers,
        vec![
            "task_pred_id",
            "task_id",
            "pred_task_id",
            "proj_id",
            "pred_type",
            "task_pred_id_key",
            "task_id_key",
            "pred_task_id_key",
            "proj_id_key",
            "pred_proj_id_key",
        ]
    );
    let row = &table.rows()[0];
    assert_eq!(table.value(row, "pred_type"), "PR_FS");
    assert_eq!(table.value(row, "pred_task_id_key"), "plan.xer.1");
    assert_eq!(table.value(row, "pred_proj_id_key"), "");
}

#[test]
fn test_keyed_tables_copy_rows_verbatim() {
    let text = XerBuilder::new()
        .table("RSRC", &["rsrc_id", "parent_rsrc_id", "clndr_id", "rsrc_name"])
        .row(&["3", "", "5", " Crane  "])
        .build();
    let store = store_from("a.xer", &text);
    let table = Transformer::new(&store, 8.0)
        .build(EnhancedTable::Rsrc, None)
        .unwrap();

    let row = &table.rows()[0];
    assert_eq!(table.value(row, "rsrc_name"), " Crane  ");
    assert_eq!(table.value(row, "rsrc_id_key"), "a.xer.3");
    assert_eq!(table.value(row, "parent_rsrc_id_key"), "");
    assert_eq!(table.value(row, "clndr_id_key"), "a.xer.5");
    assert_eq!(row.file_name(), "a.xer");
}

#[test]
fn test_every_keyed_table_skips_when_source_missing() {
    let store = store_from("a.xer", &XerBuilder::new().build());
    let transformer = Transformer::new(&store, 8.0);
    for table in EnhancedTable::ALL {
        assert!(transformer.build(table, None).is_none(), "{}", table.name());
    }
}

#[test]
fn test_table_names_round_trip() {
    for table in EnhancedTable::ALL {
        assert_eq!(EnhancedTable::from_name(table.name()), Some(table));
    }
    assert_eq!(
        EnhancedTable::from_name("11_xer_calendar_detailed"),
        Some(EnhancedTable::CalendarDetailed)
    );
    assert_eq!(EnhancedTable::from_name("05_XER_UNKNOWN"), None);
}

#[test]
fn test_available_tables_lists_base_then_buildable() {
    let store = store_from("a.xer", &sample_xer("2024-01-01 00:00"));
    let names = available_tables(&store);

    assert_eq!(&names[..4], &["CALENDAR", "PROJECT", "PROJWBS", "TASK"]);
    assert!(names.contains(&"01_XER_TASK".to_string()));
    assert!(names.contains(&"04_XER_BASELINE".to_string()));
    assert!(names.contains(&"11_XER_CALENDAR_DETAILED".to_string()));
    assert!(!names.contains(&"06_XER_PREDECESSOR".to_string()));
    assert!(!names.contains(&"13_XER_TASKRSRC".to_string()));
}
