// domain-lookup/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{NamedTempFile, TempDir};

/// Command isolated from the caller's config files and DL_* variables.
fn lookup_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("domain-lookup").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("RUST_LOG");
    for key in [
        "DL_TIMEOUT",
        "DL_RDAP_ONLY",
        "DL_WHOIS_ONLY",
        "DL_FOLLOW_REFERRAL",
        "DL_MAX_WHOIS_HOPS",
        "DL_RDAP_LINKS",
        "DL_MAX_RDAP_HOPS",
        "DL_BOOTSTRAP_URL",
        "DL_INCLUDE_RAW",
        "DL_CONFIG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// Helper to create a file with the given contents
fn create_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    fs::write(file.path(), content).expect("Failed to write to temp file");
    file
}

#[test]
fn test_help_lists_flags() {
    let home = TempDir::new().unwrap();
    lookup_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--rdap-only"))
        .stdout(predicate::str::contains("--whois-only"))
        .stdout(predicate::str::contains("--whois-server"))
        .stdout(predicate::str::contains("--bootstrap-file"))
        .stdout(predicate::str::contains("--max-whois-hops"));
}

#[test]
fn test_domain_is_required() {
    let home = TempDir::new().unwrap();
    lookup_cmd(&home).assert().failure();
}

#[test]
fn test_conflicting_protocol_flags() {
    let home = TempDir::new().unwrap();
    lookup_cmd(&home)
        .args(["example.com", "--rdap-only", "--whois-only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_invalid_domain() {
    let home = TempDir::new().unwrap();
    lookup_cmd(&home)
        .arg("not a domain")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: Invalid domain"));
}

#[test]
fn test_invalid_timeout() {
    let home = TempDir::new().unwrap();
    lookup_cmd(&home)
        .args(["example.com", "--timeout", "soon"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid timeout"));
}

#[test]
fn test_invalid_whois_server_pair() {
    let home = TempDir::new().unwrap();
    lookup_cmd(&home)
        .args(["example.com", "--whois-server", "whois.nic.io"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Use TLD=HOST"));
}

#[test]
fn test_bootstrap_file_not_json() {
    let home = TempDir::new().unwrap();
    let file = create_file("this is not json");
    lookup_cmd(&home)
        .args(["example.com", "--bootstrap-file"])
        .arg(file.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn test_bootstrap_file_with_bad_shape() {
    let home = TempDir::new().unwrap();
    let file = create_file(r#"{"version": "1.0", "services": [["com"]]}"#);
    lookup_cmd(&home)
        .args(["example.com", "--bootstrap-file"])
        .arg(file.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error: Configuration error"));
}

#[test]
fn test_rdap_only_without_service_reports_failure() {
    let home = TempDir::new().unwrap();
    let file = create_file(
        r#"{"version": "1.0", "services": [[["net"], ["https://rdap.invalid/"]]]}"#,
    );
    lookup_cmd(&home)
        .args(["example.com", "--rdap-only", "--json", "--bootstrap-file"])
        .arg(file.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"ok\": false"))
        .stdout(predicate::str::contains("No RDAP server is known"));
}

#[test]
fn test_missing_config_file() {
    let home = TempDir::new().unwrap();
    lookup_cmd(&home)
        .args(["example.com", "--config", "does-not-exist.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to load config file"));
}

#[test]
fn test_invalid_config_file() {
    let home = TempDir::new().unwrap();
    let config = create_file("[defaults]\nmax_whois_hops = 50\n");
    lookup_cmd(&home)
        .arg("example.com")
        .arg("--config")
        .arg(config.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("max_whois_hops"));
}

#[test]
fn test_env_config_path_is_used() {
    let home = TempDir::new().unwrap();
    lookup_cmd(&home)
        .env("DL_CONFIG", "missing-from-env.toml")
        .arg("example.com")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("missing-from-env.toml"));
}

#[test]
fn test_config_rdap_only_is_honoured() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join("domain-lookup.toml"),
        "[defaults]\nrdap_only = true\n",
    )
    .unwrap();
    let bootstrap = create_file(r#"{"services": []}"#);

    lookup_cmd(&home)
        .args(["example.com", "--json", "--bootstrap-file"])
        .arg(bootstrap.path())
        .assert()
        .code(1)
        .stdout(predicate::str::contains("WHOIS fallback is disabled"));
}
