use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::{NamedTempFile, TempDir};

fn cmd() -> assert_cmd::Command {
    assert_cmd::Command::from(Command::new(env!("CARGO_BIN_EXE_db2rst")))
}

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn xml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".xml").unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn stdout_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

// -- conversion --

#[test]
fn converts_reference_entry() {
    let expected = std::fs::read_to_string(fixture_path("greet.expected.rst")).unwrap();

    let assert = cmd().arg(fixture_path("greet.xml")).assert().success();
    assert_eq!(stdout_of(&assert), expected);
}

#[test]
fn output_has_no_tag_syntax() {
    // `<NAME>` is the rendering of <replaceable>NAME</replaceable>.
    cmd()
        .arg(fixture_path("greet.xml"))
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"</?[a-z][\w:.-]*[\s/>]").unwrap().not())
        .stdout(predicate::str::contains("<NAME>"));
}

#[test]
fn progress_goes_to_stderr() {
    cmd()
        .arg(fixture_path("greet.xml"))
        .assert()
        .success()
        .stderr(predicate::str::contains("Parsing XML file `"))
        .stderr(predicate::str::contains("WARNING").not());
}

#[test]
fn writes_output_file() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("greet.rst");

    cmd()
        .args(["-o", out.to_str().unwrap()])
        .arg(fixture_path("greet.xml"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let output = std::fs::read_to_string(out).unwrap();
    let expected = std::fs::read_to_string(fixture_path("greet.expected.rst")).unwrap();
    assert_eq!(output, expected);
}

#[test]
fn remove_comments_flag() {
    let assert = cmd()
        .arg("--remove-comments")
        .arg(fixture_path("greet.xml"))
        .assert()
        .success();

    let output = stdout_of(&assert);
    assert!(!output.contains(".. COMMENT:"), "got: {output}");
    assert!(output.contains("for details.\n\nOptions\n"));
}

// -- warnings --

#[test]
fn unknown_tags_warn_once() {
    let input = xml_file("<refentry><refsect1><para><foo>a</foo> and <foo>b</foo></para></refsect1></refentry>");

    let assert = cmd().arg(input.path()).assert().success();
    assert_eq!(stdout_of(&assert), "a and b\n");

    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert_eq!(
        stderr.matches("WARNING: Don't know how to handle <foo>").count(),
        1,
        "got: {stderr}"
    );
}

#[test]
fn quiet_flag_suppresses_diagnostics() {
    let input = xml_file("<refentry><refsect1><para><foo>a</foo></para></refsect1></refentry>");

    cmd()
        .arg("-q")
        .arg(input.path())
        .assert()
        .success()
        .stdout("a\n")
        .stderr(predicate::str::is_empty());
}

// -- parts --

#[test]
fn content_part_drops_name_and_synopsis() {
    let assert = cmd()
        .args(["--part", "content"])
        .arg(fixture_path("greet.xml"))
        .assert()
        .success();

    let output = stdout_of(&assert);
    assert!(output.starts_with("Description\n"), "got: {output}");
    assert!(!output.contains("Synopsis"));
}

#[test]
fn meta_part_keeps_only_metadata() {
    let assert = cmd()
        .args(["--part", "meta"])
        .arg(fixture_path("greet.xml"))
        .assert()
        .success();

    let output = stdout_of(&assert);
    assert!(output.contains("Synopsis\n########"), "got: {output}");
    assert!(!output.contains("Description"));
    assert!(!output.contains("Examples"));
}

#[test]
fn unknown_part_fails() {
    cmd()
        .args(["--part", "body"])
        .arg(fixture_path("greet.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown part"));
}

#[test]
fn split_without_content_fails() {
    let input = xml_file("<refentry><refnamediv><refname>x</refname></refnamediv></refentry>");

    cmd()
        .args(["--part", "content"])
        .arg(input.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no refsect1 content"));
}

// -- includes --

#[test]
fn lists_includes() {
    cmd()
        .arg("--list-includes")
        .arg(fixture_path("greet.xml"))
        .assert()
        .success()
        .stdout("standard-options.xml#help\nversion-info.xml#v250\n");
}

// -- errors and usage --

#[test]
fn help_prints_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn missing_file_argument_is_usage_error() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn extra_argument_is_usage_error() {
    cmd()
        .arg(fixture_path("greet.xml"))
        .arg(fixture_path("greet.xml"))
        .assert()
        .failure();
}

#[test]
fn malformed_xml_names_the_file() {
    let input = xml_file("<refentry><para>unclosed</refentry>");
    let name = input.path().display().to_string();

    cmd()
        .arg(input.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse"))
        .stderr(predicate::str::contains(name));
}

#[test]
fn unreadable_file_fails() {
    cmd()
        .arg("/nonexistent/page.xml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}
