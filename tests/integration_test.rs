use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::Server;
use predicates::prelude::*;
use std::io::prelude::*;
use std::path::Path;
use tar::Builder;
use tempfile::{TempDir, tempdir};
use xz2::write::XzEncoder;

const ARCHIVE_PATH: &str = "/v0.12.0/typst-x86_64-unknown-linux-musl.tar.xz";

fn create_tar_xz(files: &[(&str, &str, u32)]) -> Vec<u8> {
    let mut tar_builder = Builder::new(Vec::new());
    for (name, content, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_path(name).unwrap();
        header.set_mode(*mode);
        header.set_cksum();
        tar_builder.append(&header, content.as_bytes()).unwrap();
    }
    let tar = tar_builder.into_inner().unwrap();

    let mut encoder = XzEncoder::new(Vec::new(), 6);
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

fn typst_archive() -> Vec<u8> {
    create_tar_xz(&[
        ("typst-x86_64-unknown-linux-musl/typst", "#!/bin/sh\necho typst\n", 0o755),
        ("typst-x86_64-unknown-linux-musl/LICENSE", "Apache-2.0", 0o644),
    ])
}

/// Scratch directories for one CLI run.
struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let root = tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("work")).unwrap();
        Self { root }
    }

    fn dest(&self) -> std::path::PathBuf {
        self.root.path().join("bin")
    }

    fn work(&self) -> std::path::PathBuf {
        self.root.path().join("work")
    }

    fn install_cmd(&self, version: &str, base_url: &str) -> Command {
        self.install_cmd_for("linux", version, base_url)
    }

    fn install_cmd_for(&self, os: &str, version: &str, base_url: &str) -> Command {
        let mut cmd = Command::new(cargo::cargo_bin!("tooldrop"));
        cmd.env_remove("TOOLDROP_DEST")
            .env_remove("TOOLDROP_NAME")
            .env_remove("TOOLDROP_BASE_URL")
            .arg("install")
            .arg(version)
            .arg("--dest")
            .arg(self.dest())
            .arg("--base-url")
            .arg(base_url)
            .arg("--work-dir")
            .arg(self.work())
            .arg("--lock-dir")
            .arg(self.root.path().join("locks"))
            .arg("--os")
            .arg(os)
            .arg("--arch")
            .arg("x86_64");
        cmd
    }
}

fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

#[test]
fn test_end_to_end_install() {
    let mut server = Server::new();
    let archive = typst_archive();
    let mock = server
        .mock("GET", ARCHIVE_PATH)
        .with_status(200)
        .with_body(&archive)
        .expect(1)
        .create();

    let sandbox = Sandbox::new();
    let installed = sandbox.dest().join("typst");

    sandbox
        .install_cmd("0.12.0", &server.url())
        .assert()
        .success()
        .stdout(predicate::str::contains(installed.to_string_lossy().as_ref()));

    mock.assert();
    assert_eq!(
        std::fs::read_to_string(&installed).unwrap(),
        "#!/bin/sh\necho typst\n"
    );
    assert_eq!(std::fs::read_dir(sandbox.dest()).unwrap().count(), 1);
    assert!(is_empty_dir(&sandbox.work()));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&installed).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn test_install_accepts_v_prefix_and_checksum() {
    use sha2::{Digest, Sha256};

    let mut server = Server::new();
    let archive = typst_archive();
    let digest = hex::encode(Sha256::digest(&archive));
    let _mock = server
        .mock("GET", ARCHIVE_PATH)
        .with_status(200)
        .with_body(&archive)
        .create();

    let sandbox = Sandbox::new();
    sandbox
        .install_cmd("v0.12.0", &server.url())
        .arg("--sha256")
        .arg(format!("sha256:{}", digest))
        .assert()
        .success();

    assert!(sandbox.dest().join("typst").exists());
}

#[test]
fn test_checksum_mismatch_fails_with_fetch_code() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", ARCHIVE_PATH)
        .with_status(200)
        .with_body(typst_archive())
        .create();

    let sandbox = Sandbox::new();
    sandbox
        .install_cmd("0.12.0", &server.url())
        .arg("--sha256")
        .arg("0".repeat(64))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("checksum mismatch"));

    assert!(!sandbox.dest().exists());
    assert!(is_empty_dir(&sandbox.work()));
}

#[test]
fn test_missing_release_leaves_destination_unchanged() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/v9.9.9/typst-x86_64-unknown-linux-musl.tar.xz")
        .with_status(404)
        .create();

    let sandbox = Sandbox::new();
    std::fs::create_dir_all(sandbox.dest()).unwrap();
    std::fs::write(sandbox.dest().join("typst"), "old").unwrap();

    sandbox
        .install_cmd("9.9.9", &server.url())
        .assert()
        .code(4)
        .stderr(predicate::str::contains("404"));

    assert_eq!(
        std::fs::read_to_string(sandbox.dest().join("typst")).unwrap(),
        "old"
    );
    assert_eq!(std::fs::read_dir(sandbox.dest()).unwrap().count(), 1);
    assert!(is_empty_dir(&sandbox.work()));
}

#[test]
fn test_corrupt_archive_fails_with_extraction_code() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", ARCHIVE_PATH)
        .with_status(200)
        .with_body("<html>not found</html>")
        .create();

    let sandbox = Sandbox::new();
    sandbox
        .install_cmd("0.12.0", &server.url())
        .assert()
        .code(5);

    assert!(!sandbox.dest().exists());
    assert!(is_empty_dir(&sandbox.work()));
}

#[test]
fn test_unsupported_platform_makes_no_request() {
    let mut server = Server::new();
    let mock = server.mock("GET", mockito::Matcher::Any).expect(0).create();

    let sandbox = Sandbox::new();
    sandbox
        .install_cmd_for("Plan9", "0.12.0", &server.url())
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Plan9"));

    mock.assert();
    assert!(!sandbox.dest().exists());
}

#[test]
fn test_missing_version_is_rejected() {
    let mut cmd = Command::new(cargo::cargo_bin!("tooldrop"));
    cmd.arg("install").assert().failure().code(2);
}

#[test]
fn test_resolve_without_version_is_rejected() {
    let mut cmd = Command::new(cargo::cargo_bin!("tooldrop"));
    cmd.args(["resolve", "--os", "linux", "--arch", "x86_64"])
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_resolve_json() {
    let mut cmd = Command::new(cargo::cargo_bin!("tooldrop"));
    let output = cmd
        .env_remove("TOOLDROP_BASE_URL")
        .env_remove("TOOLDROP_NAME")
        .args(["resolve", "0.12.0", "--os", "linux", "--arch", "x86_64", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let release: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(release["triple"], "x86_64-unknown-linux-musl");
    assert_eq!(
        release["url"],
        "https://github.com/typst/typst/releases/download/v0.12.0/typst-x86_64-unknown-linux-musl.tar.xz"
    );
}

#[test]
fn test_resolve_unsupported_architecture() {
    let mut cmd = Command::new(cargo::cargo_bin!("tooldrop"));
    cmd.args(["resolve", "0.12.0", "--os", "linux", "--arch", "mips64"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("mips64"));
}

#[test]
fn test_platforms_lists_triples() {
    let mut cmd = Command::new(cargo::cargo_bin!("tooldrop"));
    cmd.arg("platforms")
        .assert()
        .success()
        .stdout(predicate::str::contains("x86_64-unknown-linux-musl.tar.xz"))
        .stdout(predicate::str::contains("aarch64-apple-darwin"))
        .stdout(predicate::str::contains("x86_64-pc-windows-msvc.zip"));
}
