use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("engage")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("characters"))
        .stdout(predicate::str::contains("scenarios"))
        .stdout(predicate::str::contains("analyze"));
}

#[test]
fn test_analyze_help_shows_flags() {
    cargo_bin_cmd!("engage")
        .args(["analyze", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--news"))
        .stdout(predicate::str::contains("--scenario"))
        .stdout(predicate::str::contains("--characters"))
        .stdout(predicate::str::contains("--retry-once"));
}

#[test]
fn test_news_and_scenario_flags_conflict() {
    cargo_bin_cmd!("engage")
        .args([
            "analyze",
            "--news",
            "text",
            "--scenario",
            "hurricane",
            "--characters",
            "jovani_vazquez",
        ])
        .assert()
        .failure();
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("engage")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1"));
}
