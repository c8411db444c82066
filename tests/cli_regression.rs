// Regression tests for the plotline binary.
// Requires: assert_cmd, predicates, tempfile in [dev-dependencies]

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use tempfile::TempDir;

fn plotline() -> Command {
    let mut cmd = Command::cargo_bin("plotline").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn exec_prints_transcript_with_default_plot() {
    plotline()
        .args(["exec", "--", "--title", "Hello", "/color=red", "data.dat"])
        .assert()
        .success()
        .stdout("title Hello /color=1,0,0\nplot data.dat\n");
}

#[test]
fn exec_json_format() {
    plotline()
        .args(["--format", "json", "exec", "--", "--no-grid"])
        .assert()
        .success()
        .stdout(contains(r#""command":"grid""#).and(contains(r#""value":false"#)));
}

#[test]
fn exec_reports_stray_tokens_without_default_plot() {
    plotline()
        .args(["exec", "--no-default-plot", "--", "-v", "data.dat"])
        .assert()
        .success()
        .stdout("")
        .stderr(contains("ignoring stray argument 'data.dat'"));
}

#[test]
fn cli_reports_miette_diagnostics_on_unknown_flag() {
    plotline()
        .args(["exec", "--", "--nope"])
        .assert()
        .failure()
        .stderr(contains("plotline::unknown-token").and(contains("--nope")));
}

#[test]
fn run_interprets_command_files_in_order() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.plt");
    let second = dir.path().join("second.plt");
    fs::write(&first, "name = sample\nfor f in a b\n  plot $(name)-$f.dat\nfor end\n").unwrap();
    fs::write(&second, "xrange 0:10\necho \"done with $name\"\n").unwrap();

    plotline()
        .arg("run")
        .arg(&first)
        .arg(&second)
        .assert()
        .success()
        .stdout("plot sample-a.dat\nplot sample-b.dat\nxrange 0:10\ndone with sample\n");
}

#[test]
fn run_reports_location_of_bad_literal() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("bad.plt");
    fs::write(&file, "title ok\nmarker hexagon\n").unwrap();

    plotline()
        .arg("run")
        .arg(&file)
        .assert()
        .failure()
        .stdout("title ok\n")
        .stderr(
            contains("plotline::coercion")
                .and(contains("hexagon"))
                .and(contains("bad.plt:2")),
        );
}

#[test]
fn legacy_files_need_a_legacy_parser_unless_disabled() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("old.plt");
    fs::write(&file, "plot(\"data.dat\")\n").unwrap();

    if cfg!(feature = "legacy-syntax") {
        plotline()
            .arg("run")
            .arg(&file)
            .assert()
            .failure()
            .stderr(contains("legacy").and(contains("--no-legacy")));
    }

    plotline()
        .args(["--no-legacy", "run"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(contains("unknown command"));
}

#[test]
fn list_commands_and_types() {
    plotline()
        .arg("list-commands")
        .assert()
        .success()
        .stdout(contains("[plots]").and(contains("(-t, --title)")));

    plotline()
        .arg("list-types")
        .assert()
        .success()
        .stdout(contains("partial-range").and(contains("aligned-point")));
}
