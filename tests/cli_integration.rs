use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

const PASSWORD: &str = "s3cret1";

fn kennel(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kennel").unwrap();
    cmd.current_dir(home)
        .env("KENNEL_HOME", home)
        .env_remove("KENNEL_LOG");
    cmd
}

/// A local-only home with a known bootstrap password and a logged-in admin.
fn admin_home() -> tempfile::TempDir {
    let home = tempfile::tempdir().unwrap();
    kennel(home.path())
        .args(["config", "set", "admin.bootstrap_password", PASSWORD])
        .assert()
        .success();
    kennel(home.path())
        .args(["--yes", "login", "Admin", "--password", PASSWORD, "--token", "tok"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome, Admin"));
    home
}

#[test]
fn first_run_bootstraps_admin_once() {
    let home = tempfile::tempdir().unwrap();
    kennel(home.path())
        .args(["config", "set", "admin.bootstrap_password", PASSWORD])
        .assert()
        .success();

    // without a terminal or --yes the empty catalogue is not saved
    kennel(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created administrator 'Admin'"))
        .stdout(predicate::str::contains("not saved"));

    kennel(home.path())
        .args(["--yes", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created administrator 'Admin'"))
        .stdout(predicate::str::contains("Saved locally"))
        .stdout(predicate::str::contains("The catalogue is empty."));

    kennel(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created administrator").not());
}

#[test]
fn admin_adds_and_lists_items() {
    let home = admin_home();
    kennel(home.path())
        .args(["add", "--name", "Снежок", "--breed", "Samoyed", "--status", "puppy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added item"))
        .stdout(predicate::str::contains("Saved locally"));

    kennel(home.path())
        .args(["list", "--status", "puppy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Снежок"));

    kennel(home.path())
        .args(["list", "--status", "graduate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No graduate items."));
}

#[test]
fn delete_asks_and_yes_confirms() {
    let home = admin_home();
    for (id, name) in [("41", "Rex"), ("42", "Bim")] {
        kennel(home.path())
            .args(["add", "--id", id, "--name", name])
            .assert()
            .success();
    }

    // no terminal and no --yes: the cautious answer
    kennel(home.path())
        .args(["delete", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing deleted"));

    kennel(home.path())
        .args(["--yes", "delete", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted 1 item(s)"));

    kennel(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rex"))
        .stdout(predicate::str::contains("Bim").not());
}

#[test]
fn last_item_cannot_be_deleted_over_a_backup() {
    let home = admin_home();
    kennel(home.path())
        .args(["add", "--id", "7", "--name", "Rex"])
        .assert()
        .success();

    kennel(home.path())
        .args(["--yes", "delete", "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Refusing to save an empty catalogue"));
}

#[test]
fn anonymous_users_cannot_change_anything() {
    let home = tempfile::tempdir().unwrap();
    kennel(home.path())
        .args(["add", "--name", "Rex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Permission denied"));

    kennel(home.path())
        .arg("export")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Permission denied"));
}

#[test]
fn wrong_password_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    kennel(home.path())
        .args(["config", "set", "admin.bootstrap_password", PASSWORD])
        .assert()
        .success();
    kennel(home.path())
        .args(["login", "Admin", "--password", "nope", "--token", "tok"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrong username or password"));
}

#[test]
fn export_writes_a_dated_backup() {
    let home = admin_home();
    kennel(home.path())
        .args(["add", "--name", "Rex"])
        .assert()
        .success();

    let out = tempfile::tempdir().unwrap();
    kennel(home.path())
        .arg("export")
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 items"));

    let written: Vec<_> = std::fs::read_dir(out.path()).unwrap().collect();
    assert_eq!(written.len(), 1);
    let name = written[0].as_ref().unwrap().file_name();
    assert!(name.to_string_lossy().starts_with("kennel_backup_"));
}

#[test]
fn status_reports_local_only_mode() {
    let home = tempfile::tempdir().unwrap();
    kennel(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("not configured"))
        .stdout(predicate::str::contains("local only"))
        .stdout(predicate::str::contains("not logged in"));
}

#[test]
fn config_set_show_and_bad_keys() {
    let home = tempfile::tempdir().unwrap();
    kennel(home.path())
        .args(["config", "set", "remote.owner", "breeder"])
        .assert()
        .success()
        .stdout(predicate::str::contains("remote.owner set to breeder"));

    kennel(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("remote.owner = breeder"))
        .stdout(predicate::str::contains("auto_sync.enabled = false"));

    kennel(home.path())
        .args(["config", "set", "nope", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown config key"));
}

#[test]
fn watch_needs_auto_sync_or_an_interval() {
    let home = admin_home();
    kennel(home.path())
        .arg("watch")
        .assert()
        .success()
        .stdout(predicate::str::contains("Auto-sync is off"));
}

#[test]
fn help_is_grouped() {
    let home = tempfile::tempdir().unwrap();
    kennel(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Catalogue:"))
        .stdout(predicate::str::contains("Publishing and Backups:"));
}
