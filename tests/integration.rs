use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use httptest::{matchers::*, responders::*, Expectation, Server};
use tempfile::TempDir;

fn faqgen_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("faqgen");
    path
}

/// One-page PDF containing `phrase`, with byte-accurate xref offsets and
/// stream length so text extraction actually sees the phrase.
fn minimal_pdf(phrase: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET\n", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}endstream endobj\n",
            stream.len(),
            stream
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

/// Write a config file under `root`. `generation` is the body of the
/// `[generation]` section, without the header; empty means defaults
/// (no model configured).
fn write_config(root: &Path, generation: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/faqgen.db"

[uploads]
dir = "{root}/data/uploads"

[chunking]
chunk_size = 500
overlap = 50

[context]
max_chars = 4000

[generation]
{generation}

[server]
bind = "127.0.0.1:5901"
"#,
        root = root.display(),
        generation = generation,
    );

    let config_path = config_dir.join("faqgen.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();
    let config_path = write_config(&root, "");

    let pdf_path = root.join("manual.pdf");
    fs::write(&pdf_path, minimal_pdf("faqgen integration fixture text")).unwrap();

    (tmp, config_path)
}

fn run_faqgen(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = faqgen_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run faqgen binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Pull the document id out of `faqgen upload` output.
fn uploaded_document_id(stdout: &str) -> String {
    stdout
        .lines()
        .find(|l| l.trim().starts_with("document id:"))
        .and_then(|l| l.split("document id:").nth(1))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| panic!("no document id in upload output: {}", stdout))
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_faqgen(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("faqgen.db").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_faqgen(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_faqgen(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_upload_registers_document() {
    let (tmp, config_path) = setup_test_env();
    let pdf = tmp.path().join("manual.pdf");

    run_faqgen(&config_path, &["init"]);
    let (stdout, stderr, success) =
        run_faqgen(&config_path, &["upload", pdf.to_str().unwrap()]);
    assert!(
        success,
        "upload failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("document id:"));
    assert!(stdout.contains("ok"));

    let stored_dir = tmp.path().join("data").join("uploads");
    let stored: Vec<_> = fs::read_dir(&stored_dir).unwrap().collect();
    assert_eq!(stored.len(), 1, "expected exactly one stored file");
}

#[test]
fn test_upload_same_file_twice_deduplicates() {
    let (tmp, config_path) = setup_test_env();
    let pdf = tmp.path().join("manual.pdf");

    run_faqgen(&config_path, &["init"]);
    let (stdout1, _, _) = run_faqgen(&config_path, &["upload", pdf.to_str().unwrap()]);
    let (stdout2, _, success) = run_faqgen(&config_path, &["upload", pdf.to_str().unwrap()]);

    assert!(success);
    assert!(stdout2.contains("already uploaded"));
    assert_eq!(
        uploaded_document_id(&stdout1),
        uploaded_document_id(&stdout2),
        "duplicate upload must resolve to the same document"
    );

    let (list_out, _, _) = run_faqgen(&config_path, &["documents"]);
    assert_eq!(
        list_out.lines().filter(|l| l.contains("manual.pdf")).count(),
        1,
        "documents listing shows a duplicate row: {}",
        list_out
    );
}

#[test]
fn test_documents_empty_listing() {
    let (_tmp, config_path) = setup_test_env();

    run_faqgen(&config_path, &["init"]);
    let (stdout, _, success) = run_faqgen(&config_path, &["documents"]);
    assert!(success);
    assert!(stdout.contains("no documents uploaded yet"));
}

#[test]
fn test_documents_lists_uploads() {
    let (tmp, config_path) = setup_test_env();
    let pdf = tmp.path().join("manual.pdf");

    run_faqgen(&config_path, &["init"]);
    run_faqgen(&config_path, &["upload", pdf.to_str().unwrap()]);

    let (stdout, _, success) = run_faqgen(&config_path, &["documents"]);
    assert!(success);
    assert!(stdout.contains("manual.pdf"));
    assert!(stdout.contains("FILENAME"));
}

#[test]
fn test_upload_missing_file_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_faqgen(&config_path, &["init"]);
    let (_, stderr, success) = run_faqgen(&config_path, &["upload", "/nonexistent/x.pdf"]);
    assert!(!success, "upload of a missing file should fail");
    assert!(stderr.contains("Failed to read"), "got: {}", stderr);
}

#[test]
fn test_generate_without_model_fails() {
    let (tmp, config_path) = setup_test_env();
    let pdf = tmp.path().join("manual.pdf");

    run_faqgen(&config_path, &["init"]);
    let (up_out, _, _) = run_faqgen(&config_path, &["upload", pdf.to_str().unwrap()]);
    let doc_id = uploaded_document_id(&up_out);

    let (_, stderr, success) = run_faqgen(&config_path, &["generate", &doc_id]);
    assert!(!success, "generate without a configured model should fail");
    assert!(
        stderr.contains("generation.model"),
        "Should point at the missing setting, got: {}",
        stderr
    );
}

#[test]
fn test_generate_unknown_document_fails() {
    let tmp = TempDir::new().unwrap();
    // A model is configured, so the failure has to be about the document.
    let config_path = write_config(
        tmp.path(),
        "model = \"test-model\"\nurl = \"http://127.0.0.1:1\"\nmax_retries = 0",
    );

    run_faqgen(&config_path, &["init"]);
    let (_, stderr, success) = run_faqgen(&config_path, &["generate", "nonexistent-id"]);
    assert!(!success, "generate with an unknown id should fail");
    assert!(
        stderr.contains("document not found"),
        "Should report not found, got: {}",
        stderr
    );
}

#[test]
fn test_generate_and_faqs_round_trip() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/api/generate"))
            .times(1)
            .respond_with(json_encoded(serde_json::json!({
                "response": "Q1: What is this document?\nR1: An integration fixture.\nQ2: Where do FAQs land?\nR2: In SQLite."
            }))),
    );

    let (tmp, _) = setup_test_env();
    let config_path = write_config(
        tmp.path(),
        &format!(
            "model = \"test-model\"\nurl = \"{}\"\nmax_retries = 0",
            server.url_str("")
        ),
    );
    let pdf = tmp.path().join("manual.pdf");

    run_faqgen(&config_path, &["init"]);
    let (up_out, _, _) = run_faqgen(&config_path, &["upload", pdf.to_str().unwrap()]);
    let doc_id = uploaded_document_id(&up_out);

    let (gen_out, gen_err, success) =
        run_faqgen(&config_path, &["generate", &doc_id, "--num-faqs", "2"]);
    assert!(
        success,
        "generate failed: stdout={}, stderr={}",
        gen_out, gen_err
    );
    assert!(gen_out.contains("faqs saved: 2 of 2 requested"));
    assert!(gen_out.contains("ok"));

    let (faq_out, _, success) = run_faqgen(&config_path, &["faqs", &doc_id]);
    assert!(success);
    assert!(faq_out.contains("Q1: What is this document?"));
    assert!(faq_out.contains("R1: An integration fixture."));
    assert!(faq_out.contains("Q2: Where do FAQs land?"));
    assert!(faq_out.contains("R2: In SQLite."));
}

#[test]
fn test_generate_tolerates_sloppy_model_reply() {
    let server = Server::run();
    // Preamble, a malformed pair, and a well-formed one; only the
    // well-formed pair may survive, and the command must still succeed.
    server.expect(
        Expectation::matching(request::method_path("POST", "/api/generate"))
            .times(1)
            .respond_with(json_encoded(serde_json::json!({
                "response": "Here is your FAQ!\nQx: malformed\nRx: malformed\nQ1: Does parsing recover?\nR1: Whatever it can."
            }))),
    );

    let (tmp, _) = setup_test_env();
    let config_path = write_config(
        tmp.path(),
        &format!(
            "model = \"test-model\"\nurl = \"{}\"\nmax_retries = 0",
            server.url_str("")
        ),
    );
    let pdf = tmp.path().join("manual.pdf");

    run_faqgen(&config_path, &["init"]);
    let (up_out, _, _) = run_faqgen(&config_path, &["upload", pdf.to_str().unwrap()]);
    let doc_id = uploaded_document_id(&up_out);

    let (gen_out, _, success) = run_faqgen(&config_path, &["generate", &doc_id]);
    assert!(success, "generate must not fail on sloppy output");
    assert!(
        gen_out.contains("faqs saved: 1 of"),
        "expected one recovered pair, got: {}",
        gen_out
    );

    let (faq_out, _, _) = run_faqgen(&config_path, &["faqs", &doc_id]);
    assert!(faq_out.contains("Does parsing recover?"));
    assert!(!faq_out.contains("malformed"));
}

#[test]
fn test_faqs_unknown_document_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_faqgen(&config_path, &["init"]);
    let (_, stderr, success) = run_faqgen(&config_path, &["faqs", "nonexistent-id"]);
    assert!(!success, "faqs with missing ID should fail");
    assert!(
        stderr.contains("not found"),
        "Should report not found, got: {}",
        stderr
    );
}

#[test]
fn test_faqs_before_generation_reports_empty() {
    let (tmp, config_path) = setup_test_env();
    let pdf = tmp.path().join("manual.pdf");

    run_faqgen(&config_path, &["init"]);
    let (up_out, _, _) = run_faqgen(&config_path, &["upload", pdf.to_str().unwrap()]);
    let doc_id = uploaded_document_id(&up_out);

    let (stdout, _, success) = run_faqgen(&config_path, &["faqs", &doc_id]);
    assert!(success);
    assert!(stdout.contains("no FAQs generated yet"));
}

#[test]
fn test_invalid_chunking_config_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("faqgen.toml");
    fs::write(
        &config_path,
        format!(
            r#"[db]
path = "{}/data/faqgen.db"

[chunking]
chunk_size = 100
overlap = 100

[server]
bind = "127.0.0.1:5901"
"#,
            tmp.path().display()
        ),
    )
    .unwrap();

    let (_, stderr, success) = run_faqgen(&config_path, &["init"]);
    assert!(!success, "overlap >= chunk_size must be rejected at load");
    assert!(stderr.contains("overlap"), "got: {}", stderr);
}
