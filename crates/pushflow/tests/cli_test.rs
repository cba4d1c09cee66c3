#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
mod common;
use common::TestProject;
use std::fs;

/// ホスト環境の変数に左右されないコマンドを作る
fn pushflow() -> Command {
    let mut cmd = Command::cargo_bin("pushflow").unwrap();
    for var in [
        "PUSHFLOW_CONFIG_PATH",
        "PUSHFLOW_REPO",
        "PUSHFLOW_WATCHED_ROOT",
        "PUSHFLOW_BASE",
        "PUSHFLOW_HEAD",
        "PUSHFLOW_SHA",
        "PUSHFLOW_DEFAULT_BRANCH_FLAG",
        "PUSHFLOW_REGISTRY_NAMESPACE",
        "PUSHFLOW_REGISTRY_USERNAME",
        "PUSHFLOW_REGISTRY_SECRET",
        "PUSHFLOW_OUTPUT_FILE",
        "PUSHFLOW_CONCURRENCY",
        "PUSHFLOW_PLATFORM",
        "GITHUB_REF_NAME",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    // ドライランのテストが Docker デーモンに依存しないようにする
    cmd.env("DOCKER_HOST", "unix:///nonexistent/docker.sock");
    cmd
}

/// alpha / beta / README を持つリポジトリを作り、最初のコミットのハッシュを返す
fn seeded_project() -> (TestProject, String) {
    let project = TestProject::new();
    project.write("templated_tests/README.md", "# templates\n");
    project.write("templated_tests/alpha/Dockerfile", "FROM scratch\n");
    project.write("templated_tests/beta/Dockerfile", "FROM scratch\n");
    project.write("templated_tests/gamma/Dockerfile", "FROM scratch\n");
    project.write("docs/index.md", "docs\n");
    let base = project.commit("initial");
    (project, base)
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    pushflow()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("run"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    pushflow()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pushflow"));
}

#[test]
fn test_detect_lists_changed_directories() {
    let (project, base) = seeded_project();
    project.write("templated_tests/alpha/app.py", "print('a')\n");
    project.write("templated_tests/beta/Dockerfile", "FROM alpine\n");
    project.write("docs/index.md", "changed\n");
    project.commit("change alpha and beta");

    pushflow()
        .args(["detect", "--base", &base, "--head", "HEAD"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("templated_tests/alpha"))
        .stdout(predicate::str::contains("templated_tests/beta"))
        .stdout(predicate::str::contains("gamma").not())
        .stdout(predicate::str::contains("docs").not());
}

#[test]
fn test_detect_json_matrix() {
    let (project, base) = seeded_project();
    project.write("templated_tests/beta/app.py", "print('b')\n");
    project.commit("change beta");

    let output = pushflow()
        .args(["detect", "--json", "--base", &base])
        .arg("--repo")
        .arg(project.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "include": [{ "path": "templated_tests/beta", "name": "beta" }]
        })
    );
}

#[test]
fn test_detect_ignored_readme_only_is_empty() {
    let (project, base) = seeded_project();
    project.write("templated_tests/alpha/README.md", "notes\n");
    project.commit("docs only");

    pushflow()
        .args(["detect", "--json", "--base", &base])
        .args(["--ignore", "templated_tests/*/README.md"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"include":[]}"#));
}

#[test]
fn test_detect_without_base_takes_whole_tree() {
    let (project, _) = seeded_project();

    pushflow()
        .args(["detect", "--base", "0000000000000000000000000000000000000000"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("templated_tests/alpha"))
        .stdout(predicate::str::contains("templated_tests/beta"))
        .stdout(predicate::str::contains("templated_tests/gamma"))
        .stdout(predicate::str::contains("README").not());
}

#[test]
fn test_detect_writes_output_file() {
    let (project, base) = seeded_project();
    project.write("templated_tests/alpha/app.py", "print('a')\n");
    project.commit("change alpha");

    let output_dir = tempfile::tempdir().unwrap();
    let output_file = output_dir.path().join("outputs");

    pushflow()
        .args(["detect", "--base", &base])
        .arg("--repo")
        .arg(project.path())
        .arg("--output-file")
        .arg(&output_file)
        .assert()
        .success();

    let content = fs::read_to_string(&output_file).unwrap();
    assert!(content.contains("paths=[\"templated_tests/alpha\"]"));
    assert!(content.contains("any_changed=true"));
}

#[test]
fn test_detect_unresolvable_revision_fails() {
    let (project, _) = seeded_project();

    pushflow()
        .args(["detect", "--base", "no-such-revision"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-revision"));
}

#[test]
fn test_detect_uses_config_file() {
    let project = TestProject::new();
    project.write("pushflow.yaml", "watched_root: images\nignore:\n  - images/legacy\n");
    project.write("images/web/Dockerfile", "FROM scratch\n");
    project.write("images/legacy/Dockerfile", "FROM scratch\n");
    project.write("templated_tests/alpha/Dockerfile", "FROM scratch\n");
    project.commit("initial");

    pushflow()
        .arg("detect")
        .arg("--repo")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("images/web"))
        .stdout(predicate::str::contains("images/legacy").not())
        .stdout(predicate::str::contains("templated_tests").not());

    // CLI の指定は設定ファイルより優先される
    pushflow()
        .args(["detect", "--watched-root", "templated_tests"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("templated_tests/alpha"))
        .stdout(predicate::str::contains("images/web").not());
}

/// ドライランでは Docker に接続せず計画だけを表示する
#[test]
fn test_run_dry_run_on_default_branch() {
    let (project, base) = seeded_project();
    project.write("templated_tests/beta/app.py", "print('b')\n");
    project.commit("change beta");

    let report_dir = tempfile::tempdir().unwrap();
    let report_path = report_dir.path().join("report.json");

    pushflow()
        .args(["run", "--base", &base, "--sha", "abc123", "--default-branch", "--dry-run"])
        .args(["--namespace", "ghcr.io/my-org"])
        .arg("--repo")
        .arg(project.path())
        .arg("--report")
        .arg(&report_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("ghcr.io/my-org/beta"))
        .stdout(predicate::str::contains("abc123, latest"))
        .stdout(predicate::str::contains("alpha").not());

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["revision"], "abc123");
    assert_eq!(report["default_branch"], true);
    assert_eq!(report["items"][0]["path"], "templated_tests/beta");
    assert_eq!(report["items"][0]["status"], "planned");
    assert_eq!(
        report["items"][0]["tags"],
        serde_json::json!(["abc123", "latest"])
    );
}

#[test]
fn test_run_dry_run_off_default_branch_has_no_latest() {
    let (project, base) = seeded_project();
    project.write("templated_tests/beta/app.py", "print('b')\n");
    project.commit("change beta");

    pushflow()
        .args(["run", "--base", &base, "--sha", "abc123", "--default-branch=false", "--dry-run"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("abc123"))
        .stdout(predicate::str::contains("latest").not());
}

#[test]
fn test_run_without_changes_succeeds() {
    let (project, base) = seeded_project();
    project.write("docs/index.md", "changed\n");
    project.commit("docs only");

    pushflow()
        .args(["run", "--base", &base, "--sha", "abc123"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("変更されたワークアイテムはありません"));
}

#[test]
fn test_run_requires_both_credentials() {
    let (project, _) = seeded_project();

    pushflow()
        .args(["run", "--sha", "abc123", "--dry-run"])
        .arg("--repo")
        .arg(project.path())
        .env("PUSHFLOW_REGISTRY_USERNAME", "bot")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PUSHFLOW_REGISTRY_SECRET"));
}

#[test]
fn test_build_dry_run_single_directory() {
    let (project, _) = seeded_project();

    pushflow()
        .args(["build", "templated_tests/gamma", "--sha", "abc123", "--dry-run"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("gamma"))
        .stdout(predicate::str::contains("(dry-run)"));
}

#[test]
fn test_build_missing_directory_fails() {
    let (project, _) = seeded_project();

    pushflow()
        .args(["build", "templated_tests/missing", "--sha", "abc123", "--dry-run"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "ビルド対象のディレクトリが見つかりません: templated_tests/missing",
        ));
}

/// ドライランは Docker デーモンがなくても成功する
#[test]
fn test_dry_run_without_docker_daemon() {
    let (project, _) = seeded_project();

    pushflow()
        .args(["run", "--sha", "abc123", "--default-branch=false", "--dry-run"])
        .arg("--repo")
        .arg(project.path())
        .env("DOCKER_HOST", "unix:///nonexistent/docker.sock")
        .assert()
        .success()
        .stdout(predicate::str::contains("templated_tests/alpha"))
        .stdout(predicate::str::contains("(dry-run)"))
        .stderr(predicate::str::contains("Docker接続エラー").not());
}

#[test]
fn test_latest_is_rejected_as_revision_tag() {
    let (project, _) = seeded_project();

    pushflow()
        .args(["run", "--sha", "latest", "--default-branch=false", "--dry-run"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--sha に 'latest' は指定できません"));
}

#[test]
fn test_dry_run_reports_case_insensitive_name_collision() {
    let (project, _) = seeded_project();
    project.write("templated_tests/Alpha/Dockerfile", "FROM scratch\n");
    project.commit("add Alpha");

    // base なしでツリー全体を対象にし、alpha と Alpha を両方含める
    pushflow()
        .args(["run", "--sha", "abc123", "--dry-run"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("image name 'alpha' is shared"))
        .stdout(predicate::str::contains("templated_tests/beta"));
}

#[test]
fn test_detect_star_ignore_stays_in_one_directory() {
    let (project, base) = seeded_project();
    project.write("templated_tests/alpha/docs/README.md", "# alpha\n");
    project.commit("alpha docs");

    pushflow()
        .args(["detect", "--base", &base, "--ignore", "templated_tests/*.md"])
        .arg("--repo")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("templated_tests/alpha"));
}

#[test]
fn test_outside_repository_fails() {
    let dir = tempfile::tempdir().unwrap();

    pushflow()
        .arg("detect")
        .arg("--repo")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Gitリポジトリを開けません"));
}
