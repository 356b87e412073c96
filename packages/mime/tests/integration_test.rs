//! End-to-end decomposition of fixture messages.
//!
//! Each fixture is a complete `.eml` file with CRLF line endings, the way
//! messages arrive from a mail store export.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use mailsplit_mime::{decompose, BodyFormat, Part, PartRole};
use predicates::prelude::*;
use pretty_assertions::assert_eq;

fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Load fixture file content.
fn load_fixture(name: &str) -> Vec<u8> {
    let path = fixture_path(name);
    fs::read(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e))
}

fn split(name: &str) -> Vec<Part> {
    decompose(&load_fixture(name))
        .expect("fixture should decompose")
        .collect()
}

#[test]
fn test_html_body_with_two_pdf_attachments() {
    let parts = split("html_two_pdfs.eml");

    let names: Vec<&str> = parts.iter().map(|p| p.filename.as_str()).collect();
    assert_eq!(names, vec!["text.html", "q1.pdf", "q2 summary.pdf"]);

    let ordinals: Vec<usize> = parts.iter().map(|p| p.ordinal).collect();
    assert_eq!(ordinals, vec![1, 2, 3]);

    assert_eq!(parts[0].role, PartRole::Body);
    assert_eq!(
        parts[0].content,
        b"<html><body><p>Please find the reports attached.</p></body></html>"
    );

    for pdf in &parts[1..] {
        assert_eq!(pdf.role, PartRole::Attachment);
        assert_eq!(pdf.content_type.as_deref(), Some("application/pdf"));
        assert!(pdf.content.starts_with(b"%PDF-1.4"));
        assert!(pdf.content.ends_with(b"%%EOF\n"));
    }
    assert_eq!(parts[1].attachment_index(), Some(1));
    assert_eq!(parts[2].attachment_index(), Some(2));
}

#[test]
fn test_html_fixture_reports_format_and_subject() {
    let decomposition = decompose(&load_fixture("html_two_pdfs.eml")).unwrap();
    assert_eq!(decomposition.body_format(), BodyFormat::Html);
    assert_eq!(decomposition.subject(), Some("Quarterly reports"));
    assert_eq!(decomposition.len(), 3);
}

#[test]
fn test_plain_only_message_is_one_latin1_text_body() {
    let parts = split("plain_only.eml");

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].filename, "text.txt");
    assert_eq!(parts[0].extension().as_deref(), Some("txt"));
    assert_eq!(
        String::from_utf8(parts[0].content.clone()).unwrap(),
        "See you at the café at noon.\r\n"
    );
}

#[test]
fn test_nested_message_kept_whole() {
    let parts = split("nested_message.eml");

    let names: Vec<&str> = parts.iter().map(|p| p.filename.as_str()).collect();
    assert_eq!(names, vec!["text.txt", "Réunion.eml", "équipe.png"]);

    assert_eq!(parts[0].content, b"Forwarding the thread below.");

    let nested = &parts[1];
    assert_eq!(nested.role, PartRole::NestedMessage);
    assert_eq!(nested.content_type.as_deref(), Some("message/rfc822"));
    assert!(nested.content.starts_with(b"From: Frank <frank@example.com>\r\n"));
    // The inner attachment is not surfaced on its own
    assert!(parts.iter().all(|p| p.filename != "agenda.pdf"));

    assert!(parts[2].content.starts_with(b"\x89PNG"));
}

#[test]
fn test_attachment_only_message_gets_empty_body() {
    let parts = split("attachment_only.eml");

    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].role, PartRole::Body);
    assert_eq!(parts[0].filename, "text.txt");
    assert!(parts[0].content.is_empty());
    assert_eq!(parts[1].filename, "scan.tif");
    assert!(parts[1].content.starts_with(b"II*\x00"));
}

#[test]
fn test_decomposition_is_deterministic() {
    let raw = load_fixture("html_two_pdfs.eml");
    let first: Vec<Part> = decompose(&raw).unwrap().collect();
    let second: Vec<Part> = decompose(&raw).unwrap().collect();
    assert_eq!(first, second);
}

#[test]
fn test_cli_inspect_json() {
    Command::cargo_bin("mailsplit-mime")
        .unwrap()
        .arg("inspect")
        .arg(fixture_path("html_two_pdfs.eml"))
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"filename\": \"q2 summary.pdf\""))
        .stdout(predicate::str::contains("\"role\": \"body\""));
}

#[test]
fn test_cli_inspect_missing_file_fails() {
    Command::cargo_bin("mailsplit-mime")
        .unwrap()
        .args(["inspect", "/nonexistent/message.eml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Message file does not exist"));
}
