use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use diffable::io::sha256_hex;
use diffable::store::layout::resource_id;
use filetime::FileTime;
use tempfile::tempdir;

fn bin() -> String {
    env!("CARGO_BIN_EXE_diffable").to_string()
}

fn run_in(base: &Path, args: &[&str]) -> Output {
    Command::new(bin())
        .arg("--base-dir")
        .arg(base)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn cli_diff_prints_payload() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.txt");
    let new = dir.path().join("new.txt");
    fs::write(&old, "abcdef").unwrap();
    fs::write(&new, "defghiabc").unwrap();

    let out = Command::new(bin())
        .args(["diff", "--block-size", "3", "--verify"])
        .arg(&old)
        .arg(&new)
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim_end(), r#"[3,3,"ghi",0,3,]"#);
}

#[test]
fn cli_diff_identical_prints_null() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.txt");
    fs::write(&a, "same").unwrap();
    let out = Command::new(bin()).arg("diff").arg(&a).arg(&a).output().unwrap();
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim_end(), "null");
}

#[test]
fn cli_diff_json_stats() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.txt");
    let new = dir.path().join("new.txt");
    fs::write(&old, "abc").unwrap();
    fs::write(&new, "defabc").unwrap();

    let out = Command::new(bin())
        .args(["--json", "diff", "-b", "3"])
        .arg(&old)
        .arg(&new)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(stats["command"], "diff");
    assert_eq!(stats["ops"], 2);
    assert_eq!(stats["identical"], false);
}

#[test]
fn cli_sync_list_get_delete() {
    let dir = tempdir().unwrap();
    let base = dir.path();
    let web = base.join("web");
    fs::create_dir(&web).unwrap();
    let app = web.join("app.js");
    fs::write(&app, "Hello World!").unwrap();
    filetime::set_file_mtime(&app, FileTime::from_unix_time(1_000, 0)).unwrap();

    let web_arg = web.to_str().unwrap();
    assert!(run_in(base, &["sync", web_arg]).status.success());

    fs::write(&app, "Hello Heaven!").unwrap();
    filetime::set_file_mtime(&app, FileTime::from_unix_time(2_000, 0)).unwrap();
    assert!(run_in(base, &["sync", web_arg]).status.success());

    let listed = stdout(&run_in(base, &["list"]));
    let id = resource_id(&app);
    let v2 = sha256_hex(b"Hello Heaven!");
    assert!(listed.contains(&id), "{listed}");
    assert!(listed.contains(&v2), "{listed}");

    let out = run_in(base, &["get", &id]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "Hello Heaven!");

    let token = format!("{id}_{}_{v2}.diff", sha256_hex(b"Hello World!"));
    let out = run_in(base, &["get", &token]);
    assert!(out.status.success());
    assert!(stdout(&out).starts_with('['));

    let out = run_in(base, &["get", "not_a.diff"]);
    assert_eq!(out.status.code(), Some(2));

    assert!(run_in(base, &["delete", app.to_str().unwrap()]).status.success());
    assert!(stdout(&run_in(base, &["list"])).trim().is_empty());
    assert!(!run_in(base, &["get", &id]).status.success());
}

#[test]
fn cli_watch_runs_bounded_passes() {
    let dir = tempdir().unwrap();
    let base = dir.path();
    let web = base.join("web");
    fs::create_dir(&web).unwrap();
    fs::write(web.join("style.css"), "body{}").unwrap();

    let out = run_in(
        base,
        &["--json", "watch", web.to_str().unwrap(), "--interval", "20", "--ticks", "3"],
    );
    assert!(out.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(stats["command"], "watch");
    assert_eq!(stats["passes"], 3);
    assert!(stdout(&run_in(base, &["list"])).contains("style.css"));
}

#[test]
fn cli_store_flag_and_config_file() {
    let dir = tempdir().unwrap();
    let base = dir.path();
    let props = base.join("diffable.properties");
    fs::write(&props, "BlockSize=5\nResourceStorePath=from-config\n").unwrap();

    let out = run_in(base, &["config", "--config", props.to_str().unwrap()]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("BlockSize=5"), "{text}");
    assert!(text.contains("from-config"), "{text}");

    let out = run_in(base, &["list", "--store", "elsewhere"]);
    assert!(out.status.success());
    assert!(base.join("elsewhere").join("diffable.manifest").is_file());
}

#[test]
fn cli_config_works() {
    let out = Command::new(bin()).arg("config").output().unwrap();
    assert!(out.status.success());
    assert!(stdout(&out).contains("BlockSize=20"));
}

#[test]
fn cli_bad_config_file_fails() {
    let dir = tempdir().unwrap();
    let props = dir.path().join("bad.properties");
    fs::write(&props, "BlockSize=zero\n").unwrap();
    let out = Command::new(bin())
        .arg("--config")
        .arg(&props)
        .arg("config")
        .output()
        .unwrap();
    assert!(!out.status.success());
}
