use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use lot_intake::plan::ImportPlan;
use lot_intake::router::TabType;
use predicates::prelude::*;
use tempfile::tempdir;

const EVENT: &str = "4b4a4135-95b0-4c44-9d8a-1f8f2c1f3a10";

const INVENTORY_CSV: &str = "\
Stock #,Year,Make,Model,Unit Cost,Clean Trade\n\
A-1001,2019,Ford,F-150,\"$12,500.00\",\"$14,000.00\"\n\
A-1002,2021,Toyota,Camry,\"$18,000.00\",\"$19,250.00\"\n";

#[test]
fn probe_writes_a_reviewable_plan() {
    let dir = tempdir().expect("temp dir");
    let input = dir.path().join("inventory.csv");
    let plan_path = dir.path().join("inventory-plan.yml");
    fs::write(&input, INVENTORY_CSV).expect("write input");

    cargo_bin_cmd!("lot-intake")
        .args([
            "probe",
            "-i",
            input.to_str().unwrap(),
            "-p",
            plan_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let plan = ImportPlan::load(&plan_path).expect("load plan");
    assert_eq!(plan.sheets.len(), 1);
    assert_eq!(plan.sheets[0].tab, TabType::Inventory);
    assert_eq!(plan.sheets[0].columns.target("Stock #"), Some("stock_number"));
    assert_eq!(
        plan.sheets[0].columns.target("Clean Trade"),
        Some("jd_trade_clean")
    );
}

#[test]
fn import_executes_the_plan_and_persists_records() {
    let dir = tempdir().expect("temp dir");
    let input = dir.path().join("inventory.csv");
    let plan_path = dir.path().join("plan.yml");
    let store_path = dir.path().join("store.json");
    fs::write(&input, INVENTORY_CSV).expect("write input");

    cargo_bin_cmd!("lot-intake")
        .args([
            "probe",
            "-i",
            input.to_str().unwrap(),
            "-p",
            plan_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    cargo_bin_cmd!("lot-intake")
        .args([
            "import",
            "-i",
            input.to_str().unwrap(),
            "-p",
            plan_path.to_str().unwrap(),
            "-s",
            store_path.to_str().unwrap(),
            "-e",
            EVENT,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": true"))
        .stdout(predicate::str::contains("\"imported\": 2"));

    let raw = fs::read_to_string(&store_path).expect("read store");
    let data: serde_json::Value = serde_json::from_str(&raw).expect("store JSON");
    let rows = data["tables"]["vehicle_inventory"]
        .as_array()
        .expect("inventory rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["event_id"], serde_json::json!(EVENT));
}

#[test]
fn second_append_import_skips_duplicates() {
    let dir = tempdir().expect("temp dir");
    let input = dir.path().join("inventory.csv");
    let plan_path = dir.path().join("plan.yml");
    let store_path = dir.path().join("store.json");
    fs::write(&input, INVENTORY_CSV).expect("write input");

    cargo_bin_cmd!("lot-intake")
        .args([
            "probe",
            "-i",
            input.to_str().unwrap(),
            "-p",
            plan_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    for _ in 0..2 {
        cargo_bin_cmd!("lot-intake")
            .args([
                "import",
                "-i",
                input.to_str().unwrap(),
                "-p",
                plan_path.to_str().unwrap(),
                "-s",
                store_path.to_str().unwrap(),
                "-e",
                EVENT,
            ])
            .assert()
            .success();
    }

    let raw = fs::read_to_string(&store_path).expect("read store");
    let data: serde_json::Value = serde_json::from_str(&raw).expect("store JSON");
    let rows = data["tables"]["vehicle_inventory"]
        .as_array()
        .expect("inventory rows");
    assert_eq!(rows.len(), 2);
}

#[test]
fn replace_import_resets_the_event_slice() {
    let dir = tempdir().expect("temp dir");
    let input = dir.path().join("inventory.csv");
    let plan_path = dir.path().join("plan.yml");
    let store_path = dir.path().join("store.json");
    fs::write(&input, INVENTORY_CSV).expect("write input");

    cargo_bin_cmd!("lot-intake")
        .args([
            "probe",
            "-i",
            input.to_str().unwrap(),
            "-p",
            plan_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    for _ in 0..2 {
        cargo_bin_cmd!("lot-intake")
            .args([
                "import",
                "-i",
                input.to_str().unwrap(),
                "-p",
                plan_path.to_str().unwrap(),
                "-s",
                store_path.to_str().unwrap(),
                "-e",
                EVENT,
                "-m",
                "replace",
            ])
            .assert()
            .success();
    }

    let raw = fs::read_to_string(&store_path).expect("read store");
    let data: serde_json::Value = serde_json::from_str(&raw).expect("store JSON");
    let rows = data["tables"]["vehicle_inventory"]
        .as_array()
        .expect("inventory rows");
    assert_eq!(rows.len(), 2);
}

#[test]
fn unsupported_upload_format_fails_cleanly() {
    let dir = tempdir().expect("temp dir");
    let input = dir.path().join("export.pdf");
    let plan_path = dir.path().join("plan.yml");
    fs::write(&input, b"%PDF-1.4 not a spreadsheet").expect("write input");

    cargo_bin_cmd!("lot-intake")
        .args([
            "probe",
            "-i",
            input.to_str().unwrap(),
            "-p",
            plan_path.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pdf"));
}

#[test]
fn probe_honors_input_encoding() {
    let dir = tempdir().expect("temp dir");
    let input = dir.path().join("roster.csv");
    let plan_path = dir.path().join("plan.yml");

    let content = "Name,Phone\nRen\u{e9} Paz,555-0100\n";
    let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode(content);
    fs::write(&input, &encoded).expect("write encoded input");

    cargo_bin_cmd!("lot-intake")
        .args([
            "probe",
            "-i",
            input.to_str().unwrap(),
            "-p",
            plan_path.to_str().unwrap(),
            "--input-encoding",
            "windows-1252",
        ])
        .assert()
        .success();

    let plan = ImportPlan::load(&plan_path).expect("load plan");
    assert_eq!(plan.sheets[0].tab, TabType::Roster);
    assert_eq!(plan.sheets[0].columns.target("Name"), Some("name"));
}
