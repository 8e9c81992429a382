//! Tests for the subprocess runner.

use std::ffi::OsString;
use std::path::Path;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::tests::support::write_engine;

#[fixture]
fn engine_dir() -> TempDir {
    tempfile::tempdir().expect("temp dir")
}

fn fixed(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

fn tokens(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| (*arg).to_owned()).collect()
}

#[test]
fn argv_places_fixed_arguments_before_tokens() {
    let argv = build_argv(
        Path::new("/opt/engine"),
        &fixed(&["-r", "/tmp/fake", "--"]),
        &tokens(&["btn1", "single"]),
    );
    assert_eq!(
        argv,
        fixed(&["/opt/engine", "-r", "/tmp/fake", "--", "btn1", "single"])
    );
}

#[rstest]
fn captures_arguments_in_order(engine_dir: TempDir) {
    let engine = write_engine(
        engine_dir.path(),
        "echo-args",
        "for arg in \"$@\"; do echo \"[$arg]\"; done",
    );
    let result = SubprocessRunner::default()
        .run(
            &engine,
            &fixed(&["-r", "/tmp/fake", "--"]),
            &tokens(&["btn1", "long", "with-dash"]),
        )
        .expect("engine runs");

    assert_eq!(
        result.output(),
        "[-r]\n[/tmp/fake]\n[--]\n[btn1]\n[long]\n[with-dash]\n"
    );
    assert_eq!(result.exit_code(), 0);
}

#[rstest]
fn merges_stdout_and_stderr(engine_dir: TempDir) {
    let engine = write_engine(
        engine_dir.path(),
        "noisy",
        "echo first\necho second >&2\necho third",
    );
    let result = SubprocessRunner::default()
        .run(&engine, &[], &[])
        .expect("engine runs");

    assert_eq!(result.output(), "first\nsecond\nthird\n");
}

#[rstest]
fn non_zero_exit_is_reported_not_raised(engine_dir: TempDir) {
    let engine = write_engine(engine_dir.path(), "failing", "echo image not found\nexit 3");
    let result = SubprocessRunner::default()
        .run(&engine, &[], &tokens(&["btn1"]))
        .expect("non-zero exit is not an error");

    assert_eq!(result.exit_code(), 3);
    assert_eq!(result.output(), "image not found\n");
}

#[rstest]
fn missing_executable_fails_to_launch(engine_dir: TempDir) {
    let missing = engine_dir.path().join("does-not-exist");
    let error = SubprocessRunner::default()
        .run(&missing, &[], &tokens(&["btn1"]))
        .expect_err("missing engine cannot launch");

    assert!(matches!(error, ProcessError::Launch { .. }), "got {error:?}");
    assert!(error.to_string().contains("does-not-exist"));
}

#[rstest]
fn timeout_kills_the_child(engine_dir: TempDir) {
    let engine = write_engine(engine_dir.path(), "sleepy", "exec sleep 30");
    let started = Instant::now();
    let error = SubprocessRunner::new(Some(Duration::from_millis(200)))
        .run(&engine, &[], &[])
        .expect_err("slow engine times out");

    assert!(
        matches!(error, ProcessError::Timeout { timeout_ms: 200, .. }),
        "got {error:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[rstest]
fn fast_child_finishes_within_timeout(engine_dir: TempDir) {
    let engine = write_engine(engine_dir.path(), "quick", "echo done");
    let result = SubprocessRunner::new(Some(Duration::from_secs(5)))
        .run(&engine, &[], &[])
        .expect("engine finishes in time");

    assert_eq!(result.output(), "done\n");
}

#[rstest]
fn timeout_covers_background_process_holding_the_pipe(engine_dir: TempDir) {
    let engine = write_engine(engine_dir.path(), "forking", "sleep 5 &\necho started");
    let started = Instant::now();
    let error = SubprocessRunner::new(Some(Duration::from_millis(500)))
        .run(&engine, &[], &[])
        .expect_err("open pipe counts against the timeout");

    assert!(
        matches!(error, ProcessError::Timeout { timeout_ms: 500, .. }),
        "got {error:?}"
    );
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "worker held for {:?}",
        started.elapsed()
    );
}
