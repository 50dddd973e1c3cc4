//! Integration tests for the anypath CLI on local paths
//!
//! Each test runs the built binary with its own config directory, so the
//! cache root never leaves the test's temporary directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Isolated environment: config dir plus a cache root and a workspace
struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        let env = Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        };
        std::fs::create_dir_all(env.config_dir()).unwrap();
        std::fs::create_dir_all(env.work()).unwrap();
        env.write_config(&format!(
            "schema_version = 1\n\n[defaults]\ncache_root = {:?}\nprogress = false\n",
            env.cache_root().to_string_lossy()
        ));
        env
    }

    fn config_dir(&self) -> PathBuf {
        self.dir.path().join("config")
    }

    fn cache_root(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    fn work(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    fn write_config(&self, content: &str) {
        std::fs::write(self.config_dir().join("config.toml"), content).unwrap();
    }

    /// Run anypath with the test environment
    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_anypath"))
            .args(args)
            .env("ANYPATH_CONFIG_DIR", self.config_dir())
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to execute anypath command")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("test paths are UTF-8")
}

/// Build a small tree: a.txt, sub/b.txt, sub/deeper/c.txt
fn make_tree(root: &Path) {
    std::fs::create_dir_all(root.join("sub/deeper")).unwrap();
    std::fs::write(root.join("a.txt"), "alpha").unwrap();
    std::fs::write(root.join("sub/b.txt"), "beta").unwrap();
    std::fs::write(root.join("sub/deeper/c.txt"), "gamma").unwrap();
}

#[test]
fn test_copy_file_prints_destination() {
    let env = TestEnv::new();
    let src = env.work().join("report.csv");
    let dst = env.work().join("out/report.csv");
    std::fs::write(&src, "id,value\n1,2\n").unwrap();

    let output = env.run(&["copy", "-i", path_str(&src), "-o", path_str(&dst)]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout(&output), path_str(&dst));
    assert_eq!(std::fs::read_to_string(&dst).unwrap(), "id,value\n1,2\n");
}

#[test]
fn test_copy_directory_tree() {
    let env = TestEnv::new();
    let src = env.work().join("data");
    let dst = env.work().join("backup");
    make_tree(&src);

    let output = env.run(&["copy", "-i", path_str(&src), "-o", path_str(&dst), "-v"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(std::fs::read_to_string(dst.join("a.txt")).unwrap(), "alpha");
    assert_eq!(std::fs::read_to_string(dst.join("sub/b.txt")).unwrap(), "beta");
    assert_eq!(
        std::fs::read_to_string(dst.join("sub/deeper/c.txt")).unwrap(),
        "gamma"
    );
}

#[test]
fn test_copy_without_output_uses_cache() {
    let env = TestEnv::new();
    let src = env.work().join("notes.txt");
    std::fs::write(&src, "cached").unwrap();

    let output = env.run(&["copy", "-i", path_str(&src)]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let destination = PathBuf::from(stdout(&output));
    assert!(destination.starts_with(env.cache_root()));
    assert_eq!(destination.file_name().unwrap(), "notes.txt");
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "cached");

    // Same source, same cache location
    let again = env.run(&["copy", "-i", path_str(&src)]);
    assert_eq!(PathBuf::from(stdout(&again)), destination);
}

#[test]
fn test_copy_json_output() {
    let env = TestEnv::new();
    let src = env.work().join("a.bin");
    let dst = env.work().join("b.bin");
    std::fs::write(&src, [0u8, 1, 2, 3]).unwrap();

    let output = env.run(&["--json", "copy", "-i", path_str(&src), "-o", path_str(&dst)]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["source"], path_str(&src));
    assert_eq!(json["destination"], path_str(&dst));
}

#[test]
fn test_copy_missing_source_is_not_found() {
    let env = TestEnv::new();
    let src = env.work().join("missing.txt");
    let dst = env.work().join("out.txt");

    let output = env.run(&["copy", "-i", path_str(&src), "-o", path_str(&dst)]);
    assert_eq!(output.status.code(), Some(5));
    assert!(!dst.exists());
}

#[test]
fn test_copy_file_onto_directory_is_rejected() {
    let env = TestEnv::new();
    let src = env.work().join("file.txt");
    let dst = env.work().join("existing_dir");
    std::fs::write(&src, "x").unwrap();
    std::fs::create_dir_all(&dst).unwrap();

    let output = env.run(&["copy", "-i", path_str(&src), "-o", path_str(&dst)]);
    assert_eq!(output.status.code(), Some(6));
    assert!(dst.is_dir());
}

#[test]
fn test_copy_onto_itself_is_rejected() {
    let env = TestEnv::new();
    let src = env.work().join("keep.txt");
    std::fs::write(&src, "precious").unwrap();

    let output = env.run(&["copy", "-i", path_str(&src), "-o", path_str(&src)]);
    assert_eq!(output.status.code(), Some(6));
    assert_eq!(std::fs::read_to_string(&src).unwrap(), "precious");
}

#[test]
fn test_copy_no_force_keeps_existing_file() {
    let env = TestEnv::new();
    let src = env.work().join("new.txt");
    let dst = env.work().join("old.txt");
    std::fs::write(&src, "new").unwrap();
    std::fs::write(&dst, "old").unwrap();

    let output = env.run(&["copy", "-i", path_str(&src), "-o", path_str(&dst), "--no-force"]);
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&dst).unwrap(), "old");

    let output = env.run(&["copy", "-i", path_str(&src), "-o", path_str(&dst), "-f"]);
    assert!(output.status.success());
    assert_eq!(std::fs::read_to_string(&dst).unwrap(), "new");
}

#[test]
fn test_exists() {
    let env = TestEnv::new();
    let file = env.work().join("here.txt");
    std::fs::write(&file, "x").unwrap();

    let output = env.run(&["exists", "-p", path_str(&file)]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "true");

    let output = env.run(&["exists", "-p", path_str(&env.work().join("gone.txt"))]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "false");
}

#[test]
fn test_exists_json() {
    let env = TestEnv::new();
    let output = env.run(&["exists", "-p", path_str(&env.work()), "--json"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["exists"], true);
    assert_eq!(json["path"], path_str(&env.work()));
}

#[test]
fn test_listdir_and_iterdir_alias() {
    let env = TestEnv::new();
    let root = env.work().join("tree");
    make_tree(&root);

    let expected = format!(
        "{}\n{}",
        path_str(&root.join("a.txt")),
        path_str(&root.join("sub"))
    );

    let output = env.run(&["listdir", "-p", path_str(&root)]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), expected);

    let output = env.run(&["iterdir", "-p", path_str(&root)]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), expected);
}

#[test]
fn test_listdir_json() {
    let env = TestEnv::new();
    let root = env.work().join("tree");
    make_tree(&root);

    let output = env.run(&["--json", "listdir", "-p", path_str(&root)]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let children = json["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0], path_str(&root.join("a.txt")));
}

#[test]
fn test_remove_tree() {
    let env = TestEnv::new();
    let root = env.work().join("doomed");
    make_tree(&root);

    let output = env.run(&["remove", "-p", path_str(&root)]);
    assert!(output.status.success());
    assert!(!root.exists());

    let output = env.run(&["exists", "-p", path_str(&root)]);
    assert_eq!(stdout(&output), "false");
}

#[test]
fn test_remove_missing_path() {
    let env = TestEnv::new();
    let missing = env.work().join("never-existed");

    let output = env.run(&["remove", "-p", path_str(&missing)]);
    assert!(output.status.success());

    let output = env.run(&["remove", "-p", path_str(&missing), "--strict"]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn test_quiet_suppresses_output() {
    let env = TestEnv::new();
    let output = env.run(&["-q", "exists", "-p", path_str(&env.work())]);
    assert!(output.status.success());
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_invalid_config_is_usage_error() {
    let env = TestEnv::new();
    env.write_config("schema_version = 1\n\n[defaults]\nconcurrency = 0\n");

    let output = env.run(&["exists", "-p", path_str(&env.work())]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_unsupported_schema_version_is_usage_error() {
    let env = TestEnv::new();
    env.write_config("schema_version = 0\n");

    let output = env.run(&["exists", "-p", path_str(&env.work())]);
    assert_eq!(output.status.code(), Some(2));

    env.write_config("schema_version = [not toml");
    let output = env.run(&["exists", "-p", path_str(&env.work())]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_argument_is_usage_error() {
    let env = TestEnv::new();
    let output = env.run(&["copy"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_completions() {
    let env = TestEnv::new();
    let output = env.run(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("anypath"));
}
