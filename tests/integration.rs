//! Integration tests for the headless subcommands

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

/// Scratch directory with an isolated settings file
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("doublecontact.toml");
        Self {
            temp_dir,
            config_path,
        }
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("doublecontact").unwrap();
        cmd.env_remove("RUST_LOG")
            .arg("--config")
            .arg(&self.config_path);
        cmd
    }
}

fn vcard(first: &str, last: &str, phone: &str) -> String {
    format!(
        "BEGIN:VCARD\r\nVERSION:3.0\r\nN:{last};{first};;;\r\nFN:{first} {last}\r\nTEL;TYPE=CELL:{phone}\r\nEND:VCARD\r\n"
    )
}

// =============================================================================
// compare
// =============================================================================

#[test]
fn compare_prints_matched_records() {
    let env = TestEnv::new();
    let left = env.write(
        "left.vcf",
        &[
            vcard("Ivan", "Petrov", "+7 900 111-22-33"),
            vcard("Olga", "Sidorova", "+7 900 444-55-66"),
            vcard("Nobody", "Special", "555-0100"),
        ]
        .concat(),
    );
    let right = env.write(
        "right.vcf",
        &[
            vcard("Maria", "Kuznetsova", "+7 900 777-88-99"),
            vcard("Vanya", "", "+79001112233"),
        ]
        .concat(),
    );

    env.cmd()
        .arg("compare")
        .arg(&left)
        .arg(&right)
        .assert()
        .success()
        .stdout(predicate::str::contains("Ivan Petrov\tVanya"))
        .stdout(predicate::str::contains(
            "1 pair(s); 2 unmatched on the left, 1 on the right",
        ));
}

#[test]
fn compare_reports_unknown_format() {
    let env = TestEnv::new();
    let left = env.write("left.vcf", &vcard("Ivan", "Petrov", "555-0100"));
    let right = env.write("right.txt", "not a contact list");

    env.cmd()
        .arg("compare")
        .arg(&left)
        .arg(&right)
        .assert()
        .failure()
        .stderr(predicate::str::contains("right.txt"));
}

#[test]
fn compare_fails_for_missing_file() {
    let env = TestEnv::new();
    let left = env.write("left.vcf", &vcard("Ivan", "Petrov", "555-0100"));

    env.cmd()
        .arg("compare")
        .arg(&left)
        .arg(env.path().join("missing.vcf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.vcf"));
}

// =============================================================================
// languages
// =============================================================================

#[test]
fn languages_prints_catalog_sorted_by_native_name() {
    let env = TestEnv::new();
    let table = env.write(
        "iso639-1.utf8",
        "ru\tRussian\tРусский\nde\tGerman\tDeutsch\nbroken line\nen\tEnglish\tEnglish\n",
    );

    let output = env
        .cmd()
        .arg("--languages")
        .arg(&table)
        .arg("languages")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["de\tDeutsch", "en\tEnglish", "ru\tРусский"]);
}

#[test]
fn languages_without_table_reports_empty_catalog() {
    let env = TestEnv::new();

    env.cmd()
        .arg("--languages")
        .arg(env.path().join("absent.utf8"))
        .arg("languages")
        .assert()
        .success()
        .stdout(predicate::str::contains("No languages loaded"));
}

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("doublecontact")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("compare"))
        .stdout(predicate::str::contains("languages"));
}
