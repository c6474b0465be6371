//! Integration tests for the typeload binary
//!
//! Every test points the binary at a throwaway config and cache directory;
//! none of them needs network access.

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn typeload() -> Command {
        cargo_bin_cmd!("typeload")
    }

    /// Temp dir holding a config whose cache lives next to it
    fn sandbox() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        let cache_dir = temp.path().join("cache");
        std::fs::write(
            &config,
            format!("[cache]\ndir = {:?}\n", cache_dir.display().to_string()),
        )
        .unwrap();
        (temp, config)
    }

    fn typeload_in(config: &PathBuf) -> Command {
        let mut cmd = typeload();
        cmd.env("TYPELOAD_CONFIG", config).env_remove("RUST_LOG");
        cmd
    }

    #[test]
    fn help_displays() {
        typeload()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("TypeScript declarations"));
    }

    #[test]
    fn version_displays() {
        typeload()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("typeload"));
    }

    #[test]
    fn config_path_honors_env() {
        let (_temp, config) = sandbox();
        typeload_in(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_merges_defaults() {
        let (_temp, config) = sandbox();
        typeload_in(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[registry]"))
            .stdout(predicate::str::contains("https://esm.sh"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("nested").join("config.toml");

        typeload_in(&config)
            .args(["config", "init"])
            .assert()
            .success();

        let written = std::fs::read_to_string(&config).unwrap();
        assert!(written.contains("[loader]"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("config.toml");
        std::fs::write(&config, "[cache\nbroken").unwrap();

        typeload_in(&config)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn cache_stats_json_on_empty_cache() {
        let (_temp, config) = sandbox();
        typeload_in(&config)
            .args(["cache", "stats", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"count\": 0"))
            .stdout(predicate::str::contains("\"totalSizeFormatted\""));
    }

    #[test]
    fn cache_list_empty() {
        let (_temp, config) = sandbox();
        typeload_in(&config)
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached declarations."));
    }

    #[test]
    fn cache_clear_empty() {
        let (_temp, config) = sandbox();
        typeload_in(&config)
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached declarations to clear."));
    }

    #[test]
    fn cache_clear_out_keeps_project_files() {
        let (temp, config) = sandbox();
        let project = temp.path().join("project");
        let published = project.join("node_modules/clsx/index.d.ts");
        std::fs::create_dir_all(published.parent().unwrap()).unwrap();
        std::fs::write(&published, "export {};").unwrap();
        std::fs::write(project.join(".typeload-files"), "node_modules/clsx/index.d.ts\n").unwrap();
        std::fs::write(project.join("package.json"), "{}").unwrap();

        typeload_in(&config)
            .args(["cache", "clear", "--yes", "--out"])
            .arg(&project)
            .assert()
            .success();

        assert!(project.join("package.json").exists());
        assert!(!published.exists());
    }

    #[test]
    fn load_rejects_unlisted_library() {
        let (_temp, config) = sandbox();
        typeload_in(&config)
            .args(["load", "left-pad"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not in the allow-list"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn analyze_missing_file() {
        let (_temp, config) = sandbox();
        typeload_in(&config)
            .args(["analyze", "/nonexistent/app.tsx"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Path not found"));
    }

    #[test]
    fn analyze_lists_packages_without_loading_unlisted() {
        let (temp, config) = sandbox();
        let source = temp.path().join("app.tsx");
        std::fs::write(
            &source,
            "import React from 'react';\nimport pad from 'left-pad';\nimport local from './local';\n",
        )
        .unwrap();

        typeload_in(&config)
            .args(["analyze", "--format", "plain"])
            .arg(&source)
            .assert()
            .success()
            .stdout(predicate::str::diff("left-pad\n"));
    }

    #[test]
    fn analyze_reads_stdin() {
        let (_temp, config) = sandbox();
        typeload_in(&config)
            .args(["analyze", "-", "--format", "json"])
            .write_stdin("import x from './x';\nconst y = require('some-unlisted/deep');\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"referenced\""))
            .stdout(predicate::str::contains("some-unlisted"));
    }
}
