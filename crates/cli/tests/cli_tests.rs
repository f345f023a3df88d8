// End-to-end tests for the `econfab` binary.
// Run with: cargo test -p econfab-cli --test cli_tests

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use httpmock::prelude::*;
use rust_xlsxwriter::Workbook;
use tempfile::{tempdir, TempDir};

const PANEL_CSV: &str = "id,year,gdp,inflation\n1,2000,1.5,2.0\n1,2001,1.7,2.1\n2,2000,0.9,3.2\n2,2001,1.1,2.9\n";

/// The binary with a private config dir, so a developer's settings.json
/// never leaks into a test.
fn econfab(home: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_econfab"));
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env_remove("ECONFAB_CLEANER_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn code(out: &Output) -> i32 {
    out.status.code().expect("process exited by signal")
}

fn two_sheet_workbook(path: &Path) {
    let mut wb = Workbook::new();
    let first = wb.add_worksheet();
    first.set_name("wave1").unwrap();
    first.write_string(0, 0, "a").unwrap();
    first.write_number(1, 0, 1.0).unwrap();
    let second = wb.add_worksheet();
    second.set_name("wave2").unwrap();
    second.write_string(0, 0, "y").unwrap();
    second.write_string(0, 1, "x").unwrap();
    second.write_number(1, 0, 3.0).unwrap();
    second.write_number(1, 1, 4.0).unwrap();
    second.write_number(2, 0, 5.0).unwrap();
    second.write_number(2, 1, 6.0).unwrap();
    wb.save(path).unwrap();
}

// ============================================================================
// inspect
// ============================================================================

#[test]
fn inspect_json_describes_each_file() {
    let dir = tempdir().unwrap();
    let panel = write(&dir, "panel.csv", PANEL_CSV);

    let out = econfab(&dir).args(["inspect", "--json", "--rows", "2"]).arg(&panel).output().unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));

    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let file = &json[0];
    assert_eq!(file["file"], "panel.csv");
    assert_eq!(file["kind"], "csv");
    assert_eq!(file["activeSheet"], "Sheet1");
    assert_eq!(file["headers"], serde_json::json!(["id", "year", "gdp", "inflation"]));
    assert_eq!(file["rows"].as_array().unwrap().len(), 2);
    assert_eq!(file["totalRows"], 4);
}

#[test]
fn inspect_text_lists_headers() {
    let dir = tempdir().unwrap();
    let panel = write(&dir, "panel.csv", PANEL_CSV);

    let out = econfab(&dir).arg("inspect").arg(&panel).output().unwrap();
    assert_eq!(code(&out), 0);
    let text = stdout(&out);
    assert!(text.contains("panel.csv"));
    assert!(text.contains("4 rows x 4 columns"));
    assert!(text.contains("inflation"));
}

#[test]
fn inspect_selects_sheet() {
    let dir = tempdir().unwrap();
    let book = dir.path().join("survey.xlsx");
    two_sheet_workbook(&book);

    let out = econfab(&dir).args(["inspect", "--json", "--sheet", "wave2"]).arg(&book).output().unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json[0]["sheets"], serde_json::json!(["wave1", "wave2"]));
    assert_eq!(json[0]["activeSheet"], "wave2");
    assert_eq!(json[0]["headers"], serde_json::json!(["y", "x"]));
}

#[test]
fn inspect_skips_bad_files_and_keeps_good_ones() {
    let dir = tempdir().unwrap();
    let panel = write(&dir, "panel.csv", PANEL_CSV);
    let notes = write(&dir, "notes.pdf", "%PDF-1.4");

    let out = econfab(&dir).args(["inspect", "--json"]).arg(&notes).arg(&panel).output().unwrap();
    assert_eq!(code(&out), 0);
    assert!(stderr(&out).contains("skipped notes.pdf"));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[test]
fn inspect_exit_codes() {
    let dir = tempdir().unwrap();
    let notes = write(&dir, "notes.pdf", "%PDF-1.4");
    let out = econfab(&dir).arg("inspect").arg(&notes).output().unwrap();
    assert_eq!(code(&out), 3);

    let out = econfab(&dir).arg("inspect").arg(dir.path().join("missing.csv")).output().unwrap();
    assert_eq!(code(&out), 7);

    let panel = write(&dir, "panel.csv", PANEL_CSV);
    let out = econfab(&dir).args(["inspect", "--sheet", "nope"]).arg(&panel).output().unwrap();
    assert_eq!(code(&out), 2);
}

// ============================================================================
// generate
// ============================================================================

#[test]
fn generate_writes_script_and_dataset() {
    let dir = tempdir().unwrap();
    let panel = write(&dir, "panel.csv", PANEL_CSV);
    let out_dir = dir.path().join("out");

    let out = econfab(&dir)
        .arg("generate")
        .arg(&panel)
        .args(["--role", "gdp=dependent", "--role", "inflation=independent", "--robust", "--csv", "-o"])
        .arg(&out_dir)
        .output()
        .unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));

    let script = fs::read_to_string(out_dir.join("analysis.do")).unwrap();
    assert!(script.contains("import excel using \"cleaned_data.xlsx\""));
    assert!(script.contains("regress gdp inflation, vce(robust)\n"));

    let xlsx = fs::read(out_dir.join("cleaned_data.xlsx")).unwrap();
    assert!(xlsx.starts_with(b"PK"));
    let csv = fs::read_to_string(out_dir.join("cleaned_data.csv")).unwrap();
    assert!(csv.starts_with("id,year,gdp,inflation\n"));

    let printed = stdout(&out);
    assert!(printed.contains("analysis.do"));
    assert!(printed.contains("cleaned_data.xlsx"));
    assert!(stderr(&out).contains("fingerprint: blake3:"));
}

#[test]
fn generate_is_deterministic() {
    let dir = tempdir().unwrap();
    let panel = write(&dir, "panel.csv", PANEL_CSV);

    let run = |sub: &str| {
        let out_dir = dir.path().join(sub);
        let out = econfab(&dir)
            .arg("generate")
            .arg(&panel)
            .args(["-r", "gdp=dependent", "-r", "inflation=independent", "-r", "id=id", "-r", "year=time"])
            .args(["--type", "fe", "--fe", "id", "--cluster", "id", "--time-trends", "--scatter", "-o"])
            .arg(&out_dir)
            .output()
            .unwrap();
        assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
        fs::read_to_string(out_dir.join("analysis.do")).unwrap()
    };

    let first = run("a");
    assert_eq!(first, run("b"));
    assert!(first.contains("xtset id\n"));
    assert!(first.contains("xtreg gdp inflation c.year, fe vce(cluster id)\n"));
    assert!(first.contains("scatter gdp inflation"));
}

#[test]
fn generate_reads_options_file() {
    let dir = tempdir().unwrap();
    let panel = write(&dir, "panel.csv", PANEL_CSV);
    let options = write(&dir, "choices.json", r#"{"type": "Probit", "barChart": true}"#);
    let out_dir = dir.path().join("out");

    let out = econfab(&dir)
        .arg("generate")
        .arg(&panel)
        .args(["--role", "gdp=dependent", "--role", "inflation=independent", "--options"])
        .arg(&options)
        .arg("-o")
        .arg(&out_dir)
        .output()
        .unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let script = fs::read_to_string(out_dir.join("analysis.do")).unwrap();
    assert!(script.contains("probit gdp inflation\n"));
    assert!(script.contains("graph bar (mean)"));
}

#[test]
fn generate_uses_selected_sheet() {
    let dir = tempdir().unwrap();
    let book = dir.path().join("survey.xlsx");
    two_sheet_workbook(&book);
    let out_dir = dir.path().join("out");

    let out = econfab(&dir)
        .arg("generate")
        .arg(&book)
        .args(["--sheet", "wave2", "--role", "y=dependent", "--role", "x=independent", "--csv", "-o"])
        .arg(&out_dir)
        .output()
        .unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let csv = fs::read_to_string(out_dir.join("cleaned_data.csv")).unwrap();
    assert_eq!(csv, "y,x\n3,4\n5,6\n");
}

#[test]
fn generate_warns_about_unknown_role_headers() {
    let dir = tempdir().unwrap();
    let panel = write(&dir, "panel.csv", PANEL_CSV);

    let out = econfab(&dir)
        .arg("generate")
        .arg(&panel)
        .args(["--role", "gdp=dependent", "--role", "inflation=independent", "--role", "unemp=control", "-o"])
        .arg(dir.path().join("out"))
        .output()
        .unwrap();
    assert_eq!(code(&out), 0);
    assert!(stderr(&out).contains("no column named 'unemp'"));
}

#[test]
fn generate_exit_codes() {
    let dir = tempdir().unwrap();
    let panel = write(&dir, "panel.csv", PANEL_CSV);
    let out_dir = dir.path().join("out");

    // Malformed role pair
    let out = econfab(&dir).arg("generate").arg(&panel).args(["--role", "gdp"]).output().unwrap();
    assert_eq!(code(&out), 2);
    assert!(stderr(&out).contains("hint:"));

    // Unknown role name
    let out = econfab(&dir).arg("generate").arg(&panel).args(["--role", "gdp=outcome"]).output().unwrap();
    assert_eq!(code(&out), 2);

    // Nothing decodable
    let notes = write(&dir, "notes.pdf", "%PDF-1.4");
    let out = econfab(&dir).arg("generate").arg(&notes).args(["--role", "gdp=dependent"]).output().unwrap();
    assert_eq!(code(&out), 3);

    // Fixed effects without variables
    let out = econfab(&dir)
        .arg("generate")
        .arg(&panel)
        .args(["--role", "id=id", "--role", "gdp=dependent", "--role", "inflation=independent", "--type", "fe", "-o"])
        .arg(&out_dir)
        .output()
        .unwrap();
    assert_eq!(code(&out), 5);

    // Unknown model
    let out = econfab(&dir)
        .arg("generate")
        .arg(&panel)
        .args(["--role", "gdp=dependent", "--role", "inflation=independent", "--type", "tobit", "-o"])
        .arg(&out_dir)
        .output()
        .unwrap();
    assert_eq!(code(&out), 5);

    // No dependent variable
    let out = econfab(&dir)
        .arg("generate")
        .arg(&panel)
        .args(["--role", "inflation=independent", "-o"])
        .arg(&out_dir)
        .output()
        .unwrap();
    assert_eq!(code(&out), 6);
    assert!(stderr(&out).contains("note: no dependent variable mapped"));
    assert!(!out_dir.join("analysis.do").exists());
}

#[test]
fn generate_delegates_several_files_to_cleaner() {
    let server = MockServer::start();
    let upload = server.mock(|when, then| {
        when.method(POST)
            .path("/upload")
            .body_includes("filename=\"left.csv\"")
            .body_includes("filename=\"right.csv\"");
        then.status(200)
            .header("content-type", "text/csv")
            .body("a,b\n1,2\n3,4\n# Duplicate Records\na,b\n1,2\n");
    });

    let dir = tempdir().unwrap();
    let left = write(&dir, "left.csv", "a\n1\n3\n");
    let right = write(&dir, "right.csv", "b\n2\n4\n");
    let out_dir = dir.path().join("out");

    let out = econfab(&dir)
        .arg("generate")
        .arg(&left)
        .arg(&right)
        .args(["--cleaner-url", &server.base_url()])
        .args(["--role", "a=dependent", "--role", "b=independent", "--csv", "-o"])
        .arg(&out_dir)
        .output()
        .unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    upload.assert();

    let csv = fs::read_to_string(out_dir.join("cleaned_data.csv")).unwrap();
    assert_eq!(csv, "a,b\n1,2\n3,4\n");
    let script = fs::read_to_string(out_dir.join("analysis.do")).unwrap();
    assert!(script.contains("regress a b\n"));
}

#[test]
fn generate_reports_cleaner_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/upload");
        then.status(400).body(r#"{"error": "No files uploaded"}"#);
    });

    let dir = tempdir().unwrap();
    let left = write(&dir, "left.csv", "a\n1\n");
    let right = write(&dir, "right.csv", "b\n2\n");

    let out = econfab(&dir)
        .arg("generate")
        .arg(&left)
        .arg(&right)
        .args(["--cleaner-url", &server.base_url(), "--role", "a=dependent", "--role", "b=independent", "-o"])
        .arg(dir.path().join("out"))
        .output()
        .unwrap();
    assert_eq!(code(&out), 4);
    assert!(stderr(&out).contains("No files uploaded"));
}

#[test]
fn generate_single_file_ignores_cleaner_url() {
    let dir = tempdir().unwrap();
    let panel = write(&dir, "panel.csv", PANEL_CSV);
    let out_dir = dir.path().join("out");

    let out = econfab(&dir)
        .arg("generate")
        .arg(&panel)
        .args(["--cleaner-url", "ftp://example.com"])
        .args(["--role", "gdp=dependent", "--role", "inflation=independent", "-o"])
        .arg(&out_dir)
        .output()
        .unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    assert!(out_dir.join("analysis.do").exists());
}

#[test]
fn generate_rejects_bad_cleaner_url_when_cleaning() {
    let dir = tempdir().unwrap();
    let left = write(&dir, "left.csv", "a\n1\n");
    let right = write(&dir, "right.csv", "b\n2\n");

    let out = econfab(&dir)
        .arg("generate")
        .arg(&left)
        .arg(&right)
        .args(["--cleaner-url", "ftp://example.com", "--role", "a=dependent", "--role", "b=independent", "-o"])
        .arg(dir.path().join("out"))
        .output()
        .unwrap();
    assert_eq!(code(&out), 5);
    assert!(stderr(&out).contains("cleaner.endpoint"));
}

// ============================================================================
// health
// ============================================================================

#[test]
fn health_reports_service_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(200).body(r#"{"status": "healthy", "openai_configured": true}"#);
    });

    let dir = tempdir().unwrap();
    let out = econfab(&dir).args(["health", "--cleaner-url", &server.base_url()]).output().unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("healthy"));
    assert!(stdout(&out).contains("configured"));
}

#[test]
fn health_fails_when_unhealthy_or_down() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(200).body(r#"{"status": "degraded"}"#);
    });

    let dir = tempdir().unwrap();
    let out = econfab(&dir).args(["health", "--cleaner-url", &server.base_url()]).output().unwrap();
    assert_eq!(code(&out), 4);

    let out = econfab(&dir).args(["health", "--cleaner-url", "http://127.0.0.1:9"]).output().unwrap();
    assert_eq!(code(&out), 4);

    let out = econfab(&dir).args(["health", "--cleaner-url", "ftp://example.com"]).output().unwrap();
    assert_eq!(code(&out), 5);
}

// ============================================================================
// config
// ============================================================================

#[test]
fn config_init_writes_defaults_once() {
    let dir = tempdir().unwrap();

    let out = econfab(&dir).arg("config").output().unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["cleaner.endpoint"], "http://localhost:5000");
    assert_eq!(json["preview.rows"], 10);
    assert!(!stderr(&out).contains("wrote defaults"));

    let out = econfab(&dir).args(["config", "--init"]).output().unwrap();
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("wrote defaults"));
    let written = dir.path().join("config").join("econfab").join("settings.json");
    let on_disk: serde_json::Value = serde_json::from_str(&fs::read_to_string(&written).unwrap()).unwrap();
    assert_eq!(on_disk["upload.maxFiles"], 20);

    // An existing file is never overwritten
    fs::write(&written, r#"{"preview.rows": 3}"#).unwrap();
    let out = econfab(&dir).args(["config", "--init"]).output().unwrap();
    assert!(stderr(&out).contains("already exists"));
    let json: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(json["preview.rows"], 3);
    assert_eq!(fs::read_to_string(&written).unwrap(), r#"{"preview.rows": 3}"#);
}
