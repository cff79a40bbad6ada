//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

const DB_VARS: [&str; 5] = ["DB_USERNAME", "DB_PASSWORD", "DB_HOST", "DB_PORT", "DB_NAME"];

fn movies() -> Command {
    let mut cmd = Command::cargo_bin("movies").unwrap();
    // No .env lives in the crate directory
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    for var in DB_VARS {
        cmd.env_remove(var);
    }
    cmd.env_remove("OTEL_EXPORTER_OTLP_ENDPOINT");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    movies()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("ping"));
}

#[test]
fn test_serve_help() {
    movies()
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Address to bind to"))
        .stdout(predicate::str::contains("--pool-stats-interval"));
}

#[test]
fn test_serve_without_db_config_fails() {
    movies()
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "missing required DB environment variables",
        ));
}

#[test]
fn test_ping_reports_partial_config() {
    movies()
        .arg("ping")
        .env("DB_USERNAME", "movies")
        .env("DB_HOST", "localhost")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DB_PASSWORD, DB_PORT, DB_NAME"));
}
