//! CLI integration tests for pageocr-cli.
//!
//! These run the actual binary against temporary storage roots and check
//! outputs, exit codes, and file artifacts. Tests needing an OCR engine use a
//! small shell script in its place.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get a Command for the pageocr binary.
fn pageocr() -> Command {
    let mut cmd = Command::cargo_bin("pageocr").unwrap();
    for var in [
        "PAGEOCR_IMAGE_DIR",
        "PAGEOCR_TRANSCRIPT_DIR",
        "PAGEOCR_ENGINE",
        "PAGEOCR_OCR_TIMEOUT_SECS",
        "PAGEOCR_IMAGE_EXTENSIONS",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// Command rooted in `dir`, using `engine` as the OCR executable.
fn pageocr_in(dir: &Path, engine: &Path) -> Command {
    let mut cmd = pageocr();
    cmd.arg("--image-dir")
        .arg(dir.join("images"))
        .arg("--transcript-dir")
        .arg(dir.join("transcripts"))
        .arg("--engine")
        .arg(engine);
    cmd
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    pageocr()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("on-demand OCR transcripts"))
        .stdout(predicate::str::contains("put"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version_displays_version() {
    pageocr()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pageocr"));
}

#[test]
fn test_help_shows_exit_codes() {
    pageocr()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("64"))
        .stdout(predicate::str::contains("66"));
}

#[test]
fn test_get_help_shows_options() {
    pageocr()
        .args(["get", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--format"))
        .stdout(predicate::str::contains("--output"));
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[test]
fn test_put_missing_file_is_input_error() {
    let dir = TempDir::new().unwrap();
    pageocr_in(dir.path(), Path::new("/nonexistent/engine"))
        .args(["put"])
        .arg(dir.path().join("missing.jpg"))
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_put_unsupported_extension_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("scan.png");
    fs::write(&file, b"png").unwrap();

    pageocr_in(dir.path(), Path::new("/nonexistent/engine"))
        .arg("put")
        .arg(&file)
        .assert()
        .code(64);
    assert!(!dir.path().join("images").exists());
}

#[test]
fn test_put_traversal_key_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("scan.jpg");
    fs::write(&file, b"jpg").unwrap();

    pageocr_in(dir.path(), Path::new("/nonexistent/engine"))
        .arg("put")
        .arg(&file)
        .args(["--key", "../escape.jpg"])
        .assert()
        .code(64);
    assert!(!dir.path().join("escape.jpg").exists());
}

#[test]
fn test_get_unknown_page_is_input_error() {
    let dir = TempDir::new().unwrap();
    pageocr_in(dir.path(), Path::new("/nonexistent/engine"))
        .args(["get", "absent.jpg"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("No page stored under"));
}

#[test]
fn test_get_with_missing_engine_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("page.jpg");
    fs::write(&file, b"x").unwrap();
    let engine = PathBuf::from("/nonexistent/engine");

    pageocr_in(dir.path(), &engine).arg("put").arg(&file).assert().success();
    pageocr_in(dir.path(), &engine)
        .args(["get", "page.jpg"])
        .assert()
        .code(69);
}

#[test]
fn test_delete_absent_page_succeeds() {
    let dir = TempDir::new().unwrap();
    pageocr_in(dir.path(), Path::new("/nonexistent/engine"))
        .args(["delete", "absent.jpg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to delete"));
}

#[test]
fn test_check_without_engine_is_unavailable() {
    let dir = TempDir::new().unwrap();
    pageocr_in(dir.path(), Path::new("/nonexistent/engine"))
        .arg("check")
        .assert()
        .code(69)
        .stderr(predicate::str::contains("OCR engine unavailable"));
}

// ============================================================================
// Workflow Tests (fake engine)
// ============================================================================

#[cfg(unix)]
mod workflow {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Shell script answering `--version` and writing `<stem>.txt|html`.
    fn fake_engine(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-ocr.sh");
        fs::write(
            &path,
            format!(
                "#!/bin/sh\n[ \"$1\" = \"--version\" ] && echo 'fake 1.0' && exit 0\n{body}\n"
            ),
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn working_engine(dir: &Path) -> PathBuf {
        fake_engine(
            dir,
            r#"if [ "$3" = "hocr" ]; then ext=html; else ext=txt; fi
printf 'recognized %s' "$(cat "$1")" > "$2.$ext""#,
        )
    }

    #[test]
    fn test_put_get_delete_workflow() {
        let dir = TempDir::new().unwrap();
        let engine = working_engine(dir.path());
        let file = dir.path().join("page-1.jpg");
        fs::write(&file, "four score").unwrap();

        pageocr_in(dir.path(), &engine)
            .arg("put")
            .arg(&file)
            .assert()
            .success()
            .stdout(predicate::str::contains("Stored"));

        pageocr_in(dir.path(), &engine)
            .args(["get", "page-1.jpg"])
            .assert()
            .success()
            .stdout("recognized four score");
        assert_eq!(
            fs::read_to_string(dir.path().join("transcripts/page-1.txt")).unwrap(),
            "recognized four score"
        );

        let out = dir.path().join("page-1.hocr.html");
        pageocr_in(dir.path(), &engine)
            .args(["get", "page-1.jpg", "--format", "html", "--output"])
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("OCR"));
        assert_eq!(fs::read_to_string(&out).unwrap(), "recognized four score");

        pageocr_in(dir.path(), &engine)
            .args(["delete", "page-1.jpg"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Deleted"));
        assert!(!dir.path().join("images/page-1.jpg").exists());
        assert!(!dir.path().join("transcripts/page-1.txt").exists());
        assert!(!dir.path().join("transcripts/page-1.html").exists());

        pageocr_in(dir.path(), &engine)
            .args(["get", "page-1.jpg"])
            .assert()
            .code(66);
    }

    #[test]
    fn test_put_with_key_and_quiet() {
        let dir = TempDir::new().unwrap();
        let engine = working_engine(dir.path());
        let file = dir.path().join("scan-raw.tif");
        fs::write(&file, "x").unwrap();

        pageocr_in(dir.path(), &engine)
            .args(["--quiet", "put"])
            .arg(&file)
            .args(["--key", "page-0002.tif"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
        assert!(dir.path().join("images/page-0002.tif").exists());
    }

    #[test]
    fn test_failing_engine_is_data_error() {
        let dir = TempDir::new().unwrap();
        let engine = fake_engine(
            dir.path(),
            r#"echo partial > "$2.txt"
echo "Error in pixReadStream" >&2
exit 1"#,
        );
        let file = dir.path().join("page.jpg");
        fs::write(&file, "x").unwrap();

        pageocr_in(dir.path(), &engine).arg("put").arg(&file).assert().success();
        pageocr_in(dir.path(), &engine)
            .args(["get", "page.jpg"])
            .assert()
            .code(65);

        // Partial output never becomes a cached transcript.
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("transcripts"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_check_with_engine_succeeds() {
        let dir = TempDir::new().unwrap();
        let engine = working_engine(dir.path());

        pageocr_in(dir.path(), &engine)
            .arg("check")
            .assert()
            .success()
            .stdout(predicate::str::contains("Ready"));
        assert!(dir.path().join("images").is_dir());
        assert!(dir.path().join("transcripts").is_dir());
    }
}
