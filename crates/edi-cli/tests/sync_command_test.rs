use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const PURCHASE_ORDER: &str = "ISA*00*          *00*          *ZZ*AMAZON         *ZZ*VENDOR123      *240315*1022*U*00400*900000014*0*P*>~
GS*PO*AMAZON*VENDOR123*20240315*1022*900000014*X*004010~
ST*850*0001~
BEG*00*NE*PO12345**20240315~
PO1*1*10*EA*9.99**VN*ABC-1~
CTT*1~
SE*5*0001~
GE*1*900000014~
IEA*1*900000014~
";

fn cargo_bin() -> PathBuf {
    if let Ok(path) = env::var("CARGO_BIN_EXE_edi-sync") {
        return PathBuf::from(path);
    }

    let target_dir = env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| repo_root().join("target"));
    let executable_name = format!("edi-sync{}", std::env::consts::EXE_SUFFIX);
    let fallback = target_dir.join("debug").join(executable_name);

    if fallback.exists() {
        return fallback;
    }

    panic!(
        "CARGO_BIN_EXE_edi-sync is not set and fallback binary was not found at {}",
        fallback.display()
    );
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn run_edi_sync(dir: &Path, args: &[&str]) -> Output {
    Command::new(cargo_bin())
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("run edi-sync")
}

fn describe(output: &Output) -> String {
    format!(
        "status: {:?}; stdout: {}; stderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

/// EDI-only configuration rooted in `dir`
fn write_edi_config(dir: &Path) -> PathBuf {
    let config = serde_json::json!({
        "version": "1",
        "edi": {
            "active": true,
            "inboundDir": dir.join("download"),
            "outboundDir": dir.join("upload"),
            "senderId": "VENDOR123"
        },
        "storage": { "savePath": dir.join("output") }
    });
    let path = dir.join("config.json");
    fs::write(&path, config.to_string()).expect("config should be writable");
    path
}

#[test]
fn ack_command_prints_997_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("PO_1.edi");
    fs::write(&input, PURCHASE_ORDER).unwrap();

    let output = run_edi_sync(
        dir.path(),
        &[
            "-c",
            "missing.json",
            "ack",
            input.to_string_lossy().as_ref(),
            "--sender-id",
            "VENDOR123",
        ],
    );

    assert!(output.status.success(), "{}", describe(&output));
    let stdout = String::from_utf8(output.stdout).expect("stdout should be UTF-8");
    assert!(stdout.starts_with("ISA*00*"));
    assert!(stdout.contains("*ZZ*VENDOR123*ZZ*AMAZON         *"));
    assert!(stdout.contains("GS*FA*AMAZON*VENDOR123*20240315*1022*900000014*X*004010~"));
    assert!(stdout.contains("AK1*PO*900000014~"));
    assert!(stdout.contains("AK9*A*1*1*1~"));
    assert!(stdout.trim_end().ends_with("IEA*1*900000014~"));
}

#[test]
fn ack_command_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let config = write_edi_config(dir.path());
    let input = dir.path().join("PO_1.edi");
    let ack = dir.path().join("PO_1.edi.997");
    fs::write(&input, PURCHASE_ORDER).unwrap();

    let output = run_edi_sync(
        dir.path(),
        &[
            "--config",
            config.to_string_lossy().as_ref(),
            "ack",
            input.to_string_lossy().as_ref(),
            "-o",
            ack.to_string_lossy().as_ref(),
        ],
    );

    assert!(output.status.success(), "{}", describe(&output));
    let rendered = fs::read_to_string(&ack).unwrap();
    assert!(rendered.contains("ST*997*0001~"));
    assert!(!rendered.ends_with('\n'));
}

#[test]
fn ack_command_rejects_malformed_input() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("broken.edi");
    fs::write(&input, "GS*PO*AMAZON*VENDOR123~").unwrap();

    let output = run_edi_sync(
        dir.path(),
        &["ack", input.to_string_lossy().as_ref(), "--sender-id", "V"],
    );

    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ISA"));
}

#[test]
fn run_with_edi_only_config_exits_clean() {
    let dir = TempDir::new().unwrap();
    let config = write_edi_config(dir.path());
    fs::create_dir_all(dir.path().join("download")).unwrap();
    fs::write(dir.path().join("download/PO_1.edi"), PURCHASE_ORDER).unwrap();

    let output = run_edi_sync(dir.path(), &["-c", config.to_string_lossy().as_ref(), "run"]);

    assert_eq!(output.status.code(), Some(0), "{}", describe(&output));
    let ack = fs::read_to_string(dir.path().join("upload/PO_1.edi.997")).unwrap();
    assert!(ack.contains("AK1*PO*900000014~"));
    assert!(dir.path().join("output/inbound/PO_1.edi").exists());
    // Order feed disabled: no checkpoint created
    assert!(!dir.path().join("output/checkpoint.json").exists());
}

#[test]
fn run_is_the_default_command() {
    let dir = TempDir::new().unwrap();
    let config = write_edi_config(dir.path());
    fs::create_dir_all(dir.path().join("download")).unwrap();

    let output = run_edi_sync(dir.path(), &["-c", config.to_string_lossy().as_ref()]);

    assert_eq!(output.status.code(), Some(0), "{}", describe(&output));
}

#[test]
fn run_with_malformed_document_exits_partial() {
    let dir = TempDir::new().unwrap();
    let config = write_edi_config(dir.path());
    let download = dir.path().join("download");
    fs::create_dir_all(&download).unwrap();
    fs::write(download.join("A_bad.edi"), "this is not X12").unwrap();
    fs::write(download.join("B_good.edi"), PURCHASE_ORDER).unwrap();

    let output = run_edi_sync(dir.path(), &["-c", config.to_string_lossy().as_ref(), "run"]);

    assert_eq!(output.status.code(), Some(2), "{}", describe(&output));
    assert!(dir.path().join("upload/B_good.edi.997").exists());
    assert!(!dir.path().join("upload/A_bad.edi.997").exists());
    assert!(String::from_utf8_lossy(&output.stderr).contains("A_bad.edi"));
}

#[test]
fn run_with_missing_inbound_directory_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = write_edi_config(dir.path());

    let output = run_edi_sync(dir.path(), &["-c", config.to_string_lossy().as_ref(), "run"]);

    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
}

#[test]
fn run_with_sftp_host_and_missing_key_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    let key = dir.path().join("keys/id_rsa");
    let content = serde_json::json!({
        "edi": {
            "active": true,
            "host": "127.0.0.1",
            "username": "vendor",
            "privateKeyPath": key,
            "senderId": "VENDOR123"
        },
        "storage": { "savePath": dir.path().join("output") }
    });
    fs::write(&config, content.to_string()).unwrap();

    let output = run_edi_sync(dir.path(), &["-c", config.to_string_lossy().as_ref(), "run"]);

    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("private key"), "{stderr}");
    assert!(stderr.contains("id_rsa"), "{stderr}");
}

#[test]
fn missing_config_is_fatal_and_named() {
    let dir = TempDir::new().unwrap();

    let output = run_edi_sync(dir.path(), &["-c", "nowhere.json", "run"]);

    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("nowhere.json"));
}

#[test]
fn config_without_integrations_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"api": {"active": false}, "edi": {"active": false}}"#).unwrap();

    let output = run_edi_sync(dir.path(), &["-c", config.to_string_lossy().as_ref()]);

    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no integration enabled"));
}

#[test]
fn override_file_is_applied() {
    let dir = TempDir::new().unwrap();
    let config = write_edi_config(dir.path());
    let patch = dir.path().join("override.json");
    fs::write(&patch, r#"{"edi": {"senderId": ""}}"#).unwrap();
    fs::create_dir_all(dir.path().join("download")).unwrap();

    let output = run_edi_sync(
        dir.path(),
        &[
            "-c",
            config.to_string_lossy().as_ref(),
            "--override",
            patch.to_string_lossy().as_ref(),
            "run",
        ],
    );

    assert_eq!(output.status.code(), Some(1), "{}", describe(&output));
    assert!(String::from_utf8_lossy(&output.stderr).contains("senderId"));
}

#[test]
fn checkpoint_command_sets_and_prints() {
    let dir = TempDir::new().unwrap();
    let config = write_edi_config(dir.path());
    let config_arg = config.to_string_lossy().into_owned();

    let output = run_edi_sync(dir.path(), &["-c", &config_arg, "checkpoint"]);
    assert!(output.status.success(), "{}", describe(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "\n");

    let output = run_edi_sync(
        dir.path(),
        &["-c", &config_arg, "checkpoint", "--set", "0000150"],
    );
    assert!(output.status.success(), "{}", describe(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "0000150\n");

    let stored = fs::read_to_string(dir.path().join("output/checkpoint.json")).unwrap();
    assert_eq!(stored, "{\n  \"lastControlNumber\": \"0000150\"\n}\n");
}

#[test]
fn inventory_feed_is_put_outbound() {
    let dir = TempDir::new().unwrap();
    let config = write_edi_config(dir.path());
    let items = dir.path().join("items.csv");
    fs::write(&items, "sku,cost,qty\nABC-1,12.5,40\n").unwrap();

    let output = run_edi_sync(
        dir.path(),
        &[
            "-c",
            config.to_string_lossy().as_ref(),
            "inventory-feed",
            items.to_string_lossy().as_ref(),
        ],
    );

    assert!(output.status.success(), "{}", describe(&output));
    let file_name = String::from_utf8(output.stdout).unwrap().trim().to_string();
    assert!(file_name.starts_with("COSTINV_"));
    assert!(file_name.ends_with(".txt"));

    let feed = fs::read_to_string(dir.path().join("upload").join(&file_name)).unwrap();
    assert_eq!(feed, "SenderID|SKU|Cost|Quantity\nVENDOR123|ABC-1|12.50|40\n");
}
