//! Basic CLI E2E tests.
//!
//! Tests invoke CLI commands via cargo run against a throwaway config file
//! and verify outputs.

use std::path::Path;
use std::process::Command;

/// Run a CLI command with `--config <path>` and return (code, stdout, stderr).
fn run_cli(config: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "watchtower-cli", "--"])
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("KV_REST_API_URL")
        .env_remove("KV_REST_API_TOKEN")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn temp_config() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    (dir, path)
}

#[test]
fn test_config_set_then_get() {
    let (_dir, config) = temp_config();

    let (code, stdout, _) = run_cli(&config, &["config", "set", "scheduler.scan_interval_mins", "7"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("ok"));

    let (code, stdout, _) = run_cli(&config, &["config", "get", "scheduler.scan_interval_mins"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "7");
}

#[test]
fn test_config_rejects_zero_interval() {
    let (_dir, config) = temp_config();
    let (code, _, stderr) = run_cli(&config, &["config", "set", "scheduler.match_interval_mins", "0"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_rejects_interval_over_one_week() {
    let (_dir, config) = temp_config();
    let (code, _, stderr) = run_cli(&config, &["config", "set", "scheduler.scan_interval_mins", "10081"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("at most"), "stderr: {stderr}");
}

#[test]
fn test_config_never_prints_tokens() {
    let (_dir, config) = temp_config();
    let (code, _, _) = run_cli(&config, &["config", "set", "store.token", "kv-secret"]);
    assert_eq!(code, 0);
    let sources = r#"[{"name":"grants","url":"https://feeds.example.org/grants","token":"feed-secret"}]"#;
    let (code, _, _) = run_cli(&config, &["config", "set", "sources", sources]);
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(&config, &["config", "get", "store.token"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "********");

    let reads: [&[&str]; 3] = [
        &["config", "get", "sources"],
        &["config", "get", "store"],
        &["config", "list"],
    ];
    for args in reads {
        let (code, stdout, _) = run_cli(&config, args);
        assert_eq!(code, 0);
        assert!(!stdout.contains("kv-secret"), "{args:?}: {stdout}");
        assert!(!stdout.contains("feed-secret"), "{args:?}: {stdout}");
    }
}

#[test]
fn test_config_get_unknown_key_fails() {
    let (_dir, config) = temp_config();
    let (code, _, stderr) = run_cli(&config, &["config", "get", "no.such.key"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_tick_without_store_reports_not_configured() {
    let (_dir, config) = temp_config();
    let (code, _, stderr) = run_cli(&config, &["tick", "scan"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("not configured"), "stderr: {stderr}");
}

#[test]
fn test_tick_scan_in_memory() {
    let (_dir, config) = temp_config();
    let (code, stdout, _) = run_cli(&config, &["--memory", "tick", "scan", "--json"]);
    assert_eq!(code, 0);

    let status: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(status["lastScan"]["opportunitiesFound"], 5);
    assert_eq!(status["lastScan"]["totalOpportunities"], 5);
}

#[test]
fn test_tick_unknown_task_fails() {
    let (_dir, config) = temp_config();
    let (code, _, stderr) = run_cli(&config, &["--memory", "tick", "bogus"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Unknown task"));
}

#[test]
fn test_score_file() {
    let (dir, config) = temp_config();
    let file = dir.path().join("opp.json");
    std::fs::write(
        &file,
        r#"{
            "id": "OPP_1",
            "source": "NIH",
            "type": "R01",
            "title": "Genomics pilot",
            "agency": "NIH",
            "institute": "NCI",
            "program": "Pilot",
            "announcementNumber": "RFA-1",
            "dueDate": "2024-06-01",
            "budgetCap": 100000,
            "duration": 12,
            "keyWords": ["genomics"],
            "cpicAlignment": {
                "evidenceLevel": "A",
                "implementationScore": 95,
                "reimbursementPotential": "high"
            },
            "status": "active"
        }"#,
    )
    .unwrap();

    let (code, stdout, stderr) = run_cli(&config, &["score", file.to_str().unwrap(), "--json"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    let scored: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(scored[0]["id"], "OPP_1");
    assert_eq!(scored[0]["total"], 1.0);
}

#[test]
fn test_coordination_create_in_memory() {
    let (_dir, config) = temp_config();
    let (code, stdout, _) = run_cli(
        &config,
        &["--memory", "coordination", "create", "--title", "R01 resubmission", "--json"],
    );
    assert_eq!(code, 0);

    let created: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(created["title"], "R01 resubmission");
    assert_eq!(created["institution"], "Norton Healthcare");
    assert!(created["id"].as_str().unwrap().starts_with("coord_"));
}

#[test]
fn test_proposal_in_memory_scans_then_drafts() {
    let (_dir, config) = temp_config();
    let (code, stdout, stderr) = run_cli(
        &config,
        &["--memory", "proposal", "NIH_R01_CA_2024_001", "--json"],
    );
    assert_eq!(code, 0, "stderr: {stderr}");

    let proposal: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(proposal["opportunityId"], "NIH_R01_CA_2024_001");
    assert_eq!(proposal["status"], "draft");
    assert_eq!(proposal["budget"]["personnel"], 325_000);
    assert_eq!(proposal["timeline"][2]["endMonth"], 60);
}

#[test]
fn test_proposal_for_unknown_opportunity_fails() {
    let (_dir, config) = temp_config();
    let (code, _, stderr) = run_cli(&config, &["--memory", "proposal", "NO_SUCH_OPP"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Not found"), "stderr: {stderr}");
}

#[test]
fn test_register_trial_in_memory() {
    let (dir, config) = temp_config();
    let file = dir.path().join("trial.json");
    std::fs::write(
        &file,
        r#"{
            "id": "TRIAL_900",
            "title": "Genotype-Guided Statin Therapy",
            "phase": "II",
            "condition": "Hyperlipidemia",
            "intervention": "SLCO1B1-guided statin selection",
            "sponsor": "Norton Healthcare",
            "estimatedEnrollment": 80,
            "status": "planning",
            "registrationStatus": "draft"
        }"#,
    )
    .unwrap();

    let (code, stdout, stderr) = run_cli(
        &config,
        &["--memory", "register-trial", file.to_str().unwrap(), "--json"],
    );
    assert_eq!(code, 0, "stderr: {stderr}");
    let registration: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(registration["trialId"], "TRIAL_900");
    assert!(registration["registrationId"].as_str().unwrap().starts_with("REG_"));
    assert!(registration["documents"]["protocol"]
        .as_str()
        .unwrap()
        .contains("Hyperlipidemia"));
}

#[test]
fn test_coordination_compliance_requires_a_change() {
    let (_dir, config) = temp_config();
    let (code, _, stderr) = run_cli(&config, &["--memory", "coordination", "compliance", "coord_1"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("nothing to update"), "stderr: {stderr}");

    let (code, _, stderr) = run_cli(
        &config,
        &["--memory", "coordination", "compliance", "coord_1", "--irb", "true"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("Not found"), "stderr: {stderr}");
}

#[test]
fn test_variants_summary() {
    let (dir, config) = temp_config();
    let file = dir.path().join("variants.json");
    std::fs::write(
        &file,
        r#"[{
            "gene": "BRCA2",
            "variant": "c.7007G>A",
            "currentClassification": "pathogenic",
            "history": [{
                "id": "h1",
                "date": "2023-04-02",
                "gene": "BRCA2",
                "variant": "c.7007G>A",
                "previousClassification": "uncertain_significance",
                "newClassification": "pathogenic",
                "source": "ClinVar"
            }]
        }]"#,
    )
    .unwrap();

    let (code, stdout, _) = run_cli(&config, &["variants", file.to_str().unwrap(), "--json"]);
    assert_eq!(code, 0);
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["summary"]["significant"], 1);
    assert_eq!(report["summary"]["upgraded"], 1);
}
