use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const INVOICE_TEXT: &str = "HÓA ĐƠN GIÁ TRỊ GIA TĂNG
Số hóa đơn: 0001234
Ngày lập: 15/12/2023
Đơn vị bán hàng: Công ty TNHH Thương mại ABC
Mã số thuế: 0101234567
Người mua hàng: Nguyễn Văn An

Cà phê sữa 2 25.000 50.000
Bánh mì thịt 3 20.000 60.000

Cộng tiền hàng: 110.000
Thuế suất GTGT 10%: 11.000
Tổng cộng tiền thanh toán: 121.000 VNĐ";

/// A temp workspace with a config file pointing storage into it.
struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        let content = serde_json::json!({
            "storage": {
                "invoices_path": dir.path().join("invoices.json"),
                "templates_path": dir.path().join("templates.json"),
            }
        });
        fs::write(&config, content.to_string()).unwrap();
        Self { dir, config }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("hoadon").unwrap();
        cmd.current_dir(self.path())
            .env_remove("HOADON_BOT_NAME")
            .env_remove("HOADON_STORE")
            .env_remove("HOADON_TEMPLATES")
            .arg("--config")
            .arg(&self.config);
        cmd
    }

    fn write_invoice_text(&self) -> PathBuf {
        let path = self.path().join("hoadon.txt");
        fs::write(&path, INVOICE_TEXT).unwrap();
        path
    }

    fn save_invoice(&self) {
        let input = self.write_invoice_text();
        self.cmd()
            .arg("process")
            .arg(&input)
            .arg("--save")
            .assert()
            .success();
    }
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("hoadon")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("invoices"))
        .stdout(predicate::str::contains("templates"));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("hoadon")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("absent.json"))
        .args(["invoices", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn config_init_get_set() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("hoadon").join("config.json");

    let cmd = || {
        let mut cmd = Command::cargo_bin("hoadon").unwrap();
        cmd.arg("--config").arg(&config);
        cmd
    };

    cmd().args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(config.exists());

    cmd().args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    cmd().args(["config", "get", "chat.history_limit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("50"));

    cmd().args(["config", "set", "jobs.workers", "4"])
        .assert()
        .success();
    cmd().args(["config", "get", "jobs.workers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4"));

    cmd().args(["config", "set", "chat.bot_name", "Trợ lý"])
        .assert()
        .success();
    cmd().args(["config", "get", "chat.bot_name"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"Trợ lý\""));

    cmd().args(["config", "get", "chat.nickname"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn process_text_file_as_json() {
    let ws = Workspace::new();
    let input = ws.write_invoice_text();

    ws.cmd()
        .arg("process")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"invoice_code\": \"0001234\""));

    assert!(!ws.path().join("invoices.json").exists());
}

#[test]
fn process_text_file_as_text_with_confidence() {
    let ws = Workspace::new();
    let input = ws.write_invoice_text();

    ws.cmd()
        .arg("process")
        .arg(&input)
        .args(["--format", "text", "--show-confidence"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Invoice: 0001234"))
        .stdout(predicate::str::contains("121.000 ₫"))
        .stdout(predicate::str::contains("Extraction confidence"));
}

#[test]
fn process_writes_output_file() {
    let ws = Workspace::new();
    let input = ws.write_invoice_text();
    let output = ws.path().join("out.csv");

    ws.cmd()
        .arg("process")
        .arg(&input)
        .args(["--format", "csv", "--output"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Output written"));

    let csv = fs::read_to_string(&output).unwrap();
    assert!(csv.starts_with("id,invoice_code"));
    assert!(csv.contains("0001234"));
}

#[test]
fn process_rejects_missing_and_unsupported_files() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["process", "nowhere.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));

    let docx = ws.path().join("notes.docx");
    fs::write(&docx, "not an invoice").unwrap();
    ws.cmd()
        .arg("process")
        .arg(&docx)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}

#[test]
fn saved_invoice_can_be_listed_shown_and_updated() {
    let ws = Workspace::new();
    ws.save_invoice();

    ws.cmd()
        .args(["invoices", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0001234"))
        .stdout(predicate::str::contains("1 invoices"));

    ws.cmd()
        .args(["invoices", "show", "1", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"pending\""));

    ws.cmd()
        .args(["invoices", "status", "1", "paid"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is now paid"));

    ws.cmd()
        .args(["invoices", "list", "--status", "pending"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No invoices found"));

    ws.cmd()
        .args(["invoices", "stats", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"paid_invoices\": 1"));

    ws.cmd()
        .args(["invoices", "show", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invoice not found"));
}

#[test]
fn search_and_export() {
    let ws = Workspace::new();
    ws.save_invoice();

    ws.cmd()
        .args(["invoices", "search", "hoadon"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0001234"));

    ws.cmd()
        .args(["invoices", "search", "điện lực"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No invoices match"));

    ws.cmd()
        .args(["invoices", "export"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("id,invoice_code"))
        .stdout(predicate::str::contains("hoadon.txt"));
}

#[test]
fn templates_add_list_remove() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["templates", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No templates defined"));

    ws.cmd()
        .args([
            "templates",
            "add",
            "--name",
            "Hóa đơn điện",
            "--field",
            "invoice_number:string:required",
            "--field",
            "total_amount:decimal:required",
            "--field",
            "invoice_date:date",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added template #1"));

    ws.cmd()
        .args(["templates", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 fields (2 required)"));

    ws.cmd()
        .args(["templates", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_amount\""));

    ws.cmd()
        .args(["templates", "add", "--name", "hóa đơn điện"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    ws.cmd()
        .args(["templates", "remove", "Hóa đơn điện"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed template #1"));
}

#[test]
fn process_with_unknown_template_fails() {
    let ws = Workspace::new();
    let input = ws.write_invoice_text();

    ws.cmd()
        .arg("process")
        .arg(&input)
        .args(["--template", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template not found"));
}

#[test]
fn chat_one_shot() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["chat", "--message", "help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HoaDon AI"));

    ws.cmd()
        .args(["chat", "--json", "--message", "tạm biệt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"intent\": \"goodbye\""))
        .stdout(predicate::str::contains("\"source\": \"chatbot\""));
}

#[test]
fn chat_lists_saved_invoices() {
    let ws = Workspace::new();
    ws.save_invoice();

    ws.cmd()
        .args(["chat", "--message", "danh sách hóa đơn"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0001234"));
}

#[test]
fn chat_session_reads_stdin() {
    let ws = Workspace::new();

    ws.cmd()
        .arg("chat")
        .write_stdin("help\n/history\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("HoaDon AI"))
        .stdout(predicate::str::contains("you:"));
}

#[test]
fn batch_without_matches_fails() {
    let ws = Workspace::new();
    let pattern = ws.path().join("*.pdf");

    ws.cmd()
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn batch_reports_failed_files() {
    let ws = Workspace::new();
    fs::write(ws.path().join("broken.jpg"), b"not an image").unwrap();
    let pattern = ws.path().join("*.jpg");
    let summary = ws.path().join("summary.csv");

    ws.cmd()
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .args(["-j", "2", "--continue-on-error", "--summary"])
        .arg(&summary)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 successful, 1 failed"))
        .stdout(predicate::str::contains("broken.jpg"));

    let csv = fs::read_to_string(&summary).unwrap();
    assert!(csv.contains("broken.jpg,failed"));

    ws.cmd()
        .arg("batch")
        .arg(pattern.to_str().unwrap())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}
