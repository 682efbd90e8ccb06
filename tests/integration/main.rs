//! Integration tests for Ermine

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn ermine() -> Command {
        cargo_bin_cmd!("ermine")
    }

    /// Temp system config pointing the cache into the temp dir, so tests
    /// never touch the real user cache
    fn write_system_config(temp: &Path) -> std::path::PathBuf {
        let config_path = temp.join("config.toml");
        fs::write(
            &config_path,
            format!("[cache]\nroot = \"{}\"\n", temp.join("cache").display()),
        )
        .unwrap();
        config_path
    }

    #[test]
    fn help_displays() {
        ermine()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Erlang package manager"));
    }

    #[test]
    fn version_displays() {
        ermine()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("ermine"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        let config_path = write_system_config(temp.path());
        ermine()
            .args(["--config"])
            .arg(&config_path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        let config_path = write_system_config(temp.path());
        ermine()
            .args(["--config"])
            .arg(&config_path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[registry]"));
    }

    #[test]
    fn init_creates_project_config() {
        let temp = TempDir::new().unwrap();
        let proj = temp.path().join("myapp");
        fs::create_dir_all(&proj).unwrap();

        ermine()
            .arg("--project")
            .arg(&proj)
            .arg("init")
            .assert()
            .success();

        let content = fs::read_to_string(proj.join("ermine.json")).unwrap();
        assert!(content.contains("\"name\": \"myapp\""));
    }

    #[test]
    fn init_refuses_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        let proj = temp.path().join("myapp");
        fs::create_dir_all(&proj).unwrap();
        fs::write(proj.join("ermine.json"), r#"{"name": "existing"}"#).unwrap();

        ermine()
            .arg("--project")
            .arg(&proj)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        let content = fs::read_to_string(proj.join("ermine.json")).unwrap();
        assert!(content.contains("existing"));
    }

    #[test]
    fn deps_without_project_config_fails() {
        let temp = TempDir::new().unwrap();
        let config_path = write_system_config(temp.path());
        let proj = temp.path().join("empty");
        fs::create_dir_all(&proj).unwrap();

        ermine()
            .args(["--config"])
            .arg(&config_path)
            .arg("--project")
            .arg(&proj)
            .arg("deps")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn deps_on_project_without_deps() {
        let temp = TempDir::new().unwrap();
        let config_path = write_system_config(temp.path());
        let proj = temp.path().join("solo");
        fs::create_dir_all(&proj).unwrap();
        fs::write(
            proj.join("ermine.json"),
            r#"{"name": "solo", "app_vsn": "1.0.0"}"#,
        )
        .unwrap();

        ermine()
            .args(["--config"])
            .arg(&config_path)
            .arg("--project")
            .arg(&proj)
            .arg("deps")
            .assert()
            .success()
            .stdout(predicate::str::contains("no dependencies"));
    }

    #[test]
    fn package_writes_archive() {
        let temp = TempDir::new().unwrap();
        let config_path = write_system_config(temp.path());
        let proj = temp.path().join("solo");
        fs::create_dir_all(&proj).unwrap();
        fs::write(
            proj.join("ermine.json"),
            r#"{"name": "solo", "app_vsn": "1.0.0"}"#,
        )
        .unwrap();

        ermine()
            .args(["--config"])
            .arg(&config_path)
            .arg("--project")
            .arg(&proj)
            .arg("package")
            .assert()
            .success();

        assert!(proj.join("solo.ep").exists());
    }

    #[test]
    fn publish_then_republish_without_overwrite() {
        let temp = TempDir::new().unwrap();
        let config_path = write_system_config(temp.path());
        let proj = temp.path().join("solo");
        fs::create_dir_all(&proj).unwrap();
        fs::write(
            proj.join("ermine.json"),
            r#"{"name": "solo", "fullname": "me/solo", "app_vsn": "1.0.0"}"#,
        )
        .unwrap();

        ermine()
            .args(["--config"])
            .arg(&config_path)
            .arg("--project")
            .arg(&proj)
            .arg("publish")
            .assert()
            .success()
            .stdout(predicate::str::contains("published"));

        ermine()
            .args(["--config"])
            .arg(&config_path)
            .arg("--project")
            .arg(&proj)
            .arg("publish")
            .assert()
            .success()
            .stdout(predicate::str::contains("already published"));

        assert!(temp
            .path()
            .join("cache")
            .join("me/solo")
            .join("1.0.0")
            .join("solo.ep")
            .exists());
    }

    #[test]
    fn fetch_materializes_published_package() {
        let temp = TempDir::new().unwrap();
        let config_path = write_system_config(temp.path());
        let proj = temp.path().join("solo");
        fs::create_dir_all(&proj).unwrap();
        fs::write(
            proj.join("ermine.json"),
            r#"{"name": "solo", "fullname": "me/solo", "app_vsn": "1.0.0"}"#,
        )
        .unwrap();

        ermine()
            .args(["--config"])
            .arg(&config_path)
            .arg("--project")
            .arg(&proj)
            .arg("publish")
            .assert()
            .success();

        let consumer = temp.path().join("consumer");
        fs::create_dir_all(&consumer).unwrap();
        ermine()
            .args(["--config"])
            .arg(&config_path)
            .arg("--project")
            .arg(&consumer)
            .args(["fetch", "me/solo", "1.0.0"])
            .assert()
            .success()
            .stdout(predicate::str::contains("fetched me/solo:1.0.0"));

        assert!(consumer.join("deps").join("solo").join("ermine.json").exists());
    }

    #[test]
    fn fetch_unknown_package_fails() {
        let temp = TempDir::new().unwrap();
        let config_path = write_system_config(temp.path());
        let proj = temp.path().join("empty");
        fs::create_dir_all(&proj).unwrap();

        ermine()
            .args(["--config"])
            .arg(&config_path)
            .arg("--project")
            .arg(&proj)
            .args(["fetch", "ghost/ghost", "0.0.1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn completions_generate() {
        ermine()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ermine"));
    }
}
