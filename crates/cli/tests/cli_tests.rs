//! CLI integration tests

use std::process::Command;

fn run(args: &[&str]) -> (bool, String) {
    let output = Command::new("cargo")
        .args(["run", "-q", "-p", "pedra-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command");

    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
    )
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let (ok, stdout) = run(&["--help"]);

    assert!(ok, "CLI help should succeed");
    assert!(stdout.contains("Pedra Conceito"), "Should show app name");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("score"), "Should show score command");
    assert!(stdout.contains("student"), "Should show student command");
    assert!(stdout.contains("status"), "Should show status command");
    assert!(stdout.contains("reload"), "Should show reload command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let (ok, stdout) = run(&["--version"]);

    assert!(ok, "CLI version should succeed");
    assert!(stdout.contains("pedra"), "Should show binary name");
}

/// Test predict subcommand help
#[test]
fn test_predict_help() {
    let (ok, stdout) = run(&["predict", "--help"]);

    assert!(ok, "Predict help should succeed");
    for flag in ["--ian", "--ida", "--ieg", "--iaa", "--ips", "--ipp", "--ipv", "--fase", "--defa"] {
        assert!(stdout.contains(flag), "Should show {} option", flag);
    }
}

/// Test score subcommand help
#[test]
fn test_score_help() {
    let (ok, stdout) = run(&["score", "--help"]);

    assert!(ok, "Score help should succeed");
    assert!(stdout.contains("--model"), "Should show model option");
    assert!(stdout.contains("--data"), "Should show data option");
}

/// Test student subcommand help
#[test]
fn test_student_help() {
    let (ok, stdout) = run(&["student", "--help"]);

    assert!(ok, "Student help should succeed");
    assert!(stdout.contains("<NAME>"), "Should show name argument");
}

/// Test offline scoring against a local artifact
#[test]
fn test_score_offline_json() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.json");
    let features = [
        "IAN", "IDA", "IEG", "IAA", "IPS", "IPP", "IPV", "FASE", "Status_DEFA", "consistencia_acad",
    ];
    let row = |w: f64| -> Vec<f64> {
        features
            .iter()
            .map(|f| if f.starts_with('I') { w } else { 0.0 })
            .collect()
    };
    let artifact = serde_json::json!({
        "model": {
            "kind": "linear",
            "coefficients": [row(-1.0), row(-0.3), row(0.3), row(1.0)],
            "intercepts": [20.0, 8.0, -8.0, -20.0]
        },
        "features": features,
        "mapa_classes": ["Quartzo", "Ágata", "Ametista", "Topázio"],
        "version": "cli-v1"
    });
    std::fs::write(&model_path, artifact.to_string()).unwrap();

    let model_arg = model_path.to_str().unwrap();
    let (ok, stdout) = run(&[
        "--format", "json", "score", "--model", model_arg, "--ian", "0", "--ida", "0", "--ieg",
        "0", "--iaa", "0", "--ips", "0", "--ipp", "0", "--ipv", "0", "--fase", "1", "--defa",
        "-3",
    ]);

    assert!(ok, "Offline score should succeed");
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["prediction"], "Quartzo");
    assert_eq!(result["defa_int"], -3);
    assert_eq!(result["acao_sugerida"], "Recuperação Intensiva (grave)");
    assert_eq!(result["model_version"], "cli-v1");
}

/// Test that a missing API server is reported as an error
#[test]
fn test_status_without_server_fails() {
    let (ok, _) = run(&["--api-url", "http://127.0.0.1:9", "status"]);

    assert!(!ok, "Status should fail without a reachable server");
}
