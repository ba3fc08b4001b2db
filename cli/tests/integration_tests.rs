use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn run(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_typed-wallet"))
        .arg("--root-path")
        .arg(root)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run typed-wallet")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write_config(dir: &Path, yaml: &str) {
    fs::write(dir.join("config.yaml"), yaml).expect("failed to write config");
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_prints_loaded_context() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "network: testnet11\ndefault_fee: 10\n");

    let output = run(dir.path(), &["config"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let context: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(context["network"], "testnet11");
    assert_eq!(context["default_fee"], 10);
    assert_eq!(context["rpc_port"], 9256);
    assert_eq!(context["root_path"], dir.path().display().to_string());
}

#[test]
fn config_without_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let output = run(dir.path(), &["config", "--compact"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).lines().count(), 1);
    assert!(stdout(&output).contains("\"network\":\"mainnet\""));
}

#[test]
fn invalid_config_fails_at_runtime() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "rpc_port: not-a-port\n");

    let output = run(dir.path(), &["config"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Error: invalid config"));
    assert!(stdout(&output).is_empty());
}

// ---------------------------------------------------------------------------
// wallet show
// ---------------------------------------------------------------------------

#[test]
fn wallet_show_filters_by_type() {
    let dir = tempfile::tempdir().unwrap();

    let output = run(dir.path(), &["wallet", "show", "-f", "42", "--wallet-type", "cat"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("fingerprint: 42"));
    assert!(text.contains("Spacebucks"));
    assert!(!text.contains("Chia Wallet"));
}

#[test]
fn wallet_show_rejects_unknown_choice() {
    let dir = tempfile::tempdir().unwrap();

    let output = run(dir.path(), &["wallet", "show", "--wallet-type", "pool"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("'pool' is not one of"));
}

// ---------------------------------------------------------------------------
// wallet send
// ---------------------------------------------------------------------------

#[test]
fn wallet_send_requires_amount() {
    let dir = tempfile::tempdir().unwrap();

    let output = run(dir.path(), &["wallet", "send", "-t", "xch1abc"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Missing option '-a' / '--amount'."));
    assert!(stdout(&output).is_empty());
}

#[test]
fn wallet_send_runs_async_with_nested_options() {
    let dir = tempfile::tempdir().unwrap();
    let coin = "11".repeat(32);

    let output = run(
        dir.path(),
        &[
            "wallet",
            "send",
            "-a",
            "0.25",
            "-t",
            "xch1abc",
            "--fee",
            "0.00001",
            "--reuse",
            "--exclude-coin-id",
            &coin,
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["amount_mojos"], 250_000_000_000u64);
    assert_eq!(summary["amount_xch"], "0.25");
    assert_eq!(summary["fee_mojos"], 10_000_000u64);
    assert_eq!(summary["reuse_puzhash"], true);
    assert_eq!(summary["excluded_coin_ids"][0], coin);
}

#[test]
fn wallet_send_uses_network_from_config() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "network: testnet11\ndefault_fee: 7\n");

    let output = run(dir.path(), &["wallet", "send", "-a", "1", "-t", "xch1abc"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("expected prefix txch1"));

    let output = run(dir.path(), &["wallet", "send", "-a", "1", "-t", "txch1abc"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let summary: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(summary["fee_mojos"], 7);
    assert_eq!(summary["network"], "testnet11");
}

#[test]
fn wallet_send_rejects_bad_amount() {
    let dir = tempfile::tempdir().unwrap();

    let output = run(dir.path(), &["wallet", "send", "-a", "1.5xch", "-t", "xch1abc"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("not a valid XCH amount"));
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

#[test]
fn help_lists_nested_flags_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();

    let output = run(dir.path(), &["wallet", "send", "--help"]);
    assert_eq!(output.status.code(), Some(0));

    let text = stdout(&output);
    for flag in [
        "--amount",
        "--address",
        "--fee",
        "--reuse",
        "--min-coin-amount",
        "--exclude-coin-id",
    ] {
        assert!(text.contains(flag), "{flag} missing from help:\n{text}");
    }
    assert!(text.contains("[required]"));
}
