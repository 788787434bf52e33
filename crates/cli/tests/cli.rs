use std::path::PathBuf;

use assert_cmd::Command;

fn cli() -> Command {
    let config_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config");
    let mut cmd = Command::cargo_bin("chillpanda-cli").unwrap();
    cmd.env("CHILLPANDA_ENV", "local")
        .env("CHILLPANDA_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "off")
        .env_remove("MONGODB_URI")
        .env_remove("MONGODB_DATABASE")
        .env_remove("MONGODB_CHATS_COLLECTION")
        .env_remove("MONGODB_SESSIONS_COLLECTION");
    cmd
}

#[test]
fn plan_lists_declared_layout_offline() {
    let output = cli().arg("plan").assert().success().get_output().clone();
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(stdout.contains("database chillpanda_db"));
    assert!(stdout.contains("collection chat_history"));
    assert!(stdout.contains("collection user_sessions"));
    assert!(stdout.contains("index session_id_1_timestamp_-1 { session_id: 1, timestamp: -1 }"));
    assert!(stdout.contains("index session_id_1 { session_id: 1 } unique"));
    assert_eq!(stdout.matches("    index ").count(), 5);
}

#[test]
fn plan_json_respects_database_override() {
    let output = cli()
        .args(["plan", "--json", "--database", "panda_qa"])
        .assert()
        .success()
        .get_output()
        .clone();
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(plan["database"], "panda_qa");
    assert_eq!(plan["collections"].as_array().unwrap().len(), 2);
    assert_eq!(plan["collections"][1]["indexes"][0]["unique"], true);
}

#[test]
fn rejects_invalid_database_name() {
    cli().args(["plan", "--database", "bad.name"]).assert().failure();
}

#[test]
fn rejects_unknown_environment() {
    cli().env("CHILLPANDA_ENV", "qa").arg("plan").assert().failure();
}
