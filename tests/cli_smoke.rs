use std::process::Command;

use tempfile::tempdir;

#[derive(Debug, serde::Deserialize)]
struct TracePoint {
    iteration: usize,
    evaluations: usize,
    best: f64,
}

#[derive(Debug, serde::Deserialize)]
struct RunRecord {
    function: String,
    n_var: usize,
    p_err: f64,
    seed: u64,
    batch_size: usize,
    iterations: usize,
    initial_guess: Vec<f64>,
    final_best: Option<f64>,
    comparisons: usize,
    trace: Vec<TracePoint>,
}

fn robustness() -> Command {
    Command::new(env!("CARGO_BIN_EXE_robustness"))
}

#[test]
fn run_writes_jsonl_csv_and_svg() {
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("runs.jsonl");
    let csv_path = dir.path().join("curves.csv");
    let plot_dir = dir.path().join("plots");

    let status = robustness()
        .args([
            "run",
            "--function",
            "sphere",
            "--n-var",
            "4",
            "--p-err",
            "0,0.3",
            "--max-eval",
            "160",
        ])
        .arg("--out")
        .arg(&out_path)
        .arg("--curve-csv")
        .arg(&csv_path)
        .arg("--plot-dir")
        .arg(&plot_dir)
        .args(["--plot-size", "640x360"])
        .status()
        .unwrap();
    assert!(status.success());

    let raw = std::fs::read_to_string(&out_path).unwrap();
    let records: Vec<RunRecord> = raw
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.function, "sphere");
        assert_eq!(record.n_var, 4);
        assert_eq!(record.seed, 4563);
        assert_eq!(record.batch_size, 8);
        assert_eq!(record.iterations, 20);
        assert_eq!(record.trace.len(), 20);
        assert_eq!(record.initial_guess.len(), 4);
        let last = record.trace.last().unwrap();
        assert_eq!(last.iteration, 19);
        assert_eq!(last.evaluations, 160);
        assert_eq!(record.final_best, Some(last.best));
        assert!(record.comparisons >= 20 * 7);
    }
    assert_eq!(records[0].p_err, 0.0);
    assert_eq!(records[1].p_err, 0.3);
    assert_eq!(records[0].initial_guess, records[1].initial_guess);

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("function,n_var,p_err,iteration,evaluations,best")
    );
    assert_eq!(lines.count(), 40);

    let svg = std::fs::read_to_string(plot_dir.join("sphere_4.svg")).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains(r#"width="640" height="360""#));
}

#[test]
fn run_accepts_config_file_with_flag_overrides() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.json");
    let out_path = dir.path().join("runs.jsonl");
    std::fs::write(
        &config_path,
        r#"{"functions": ["griewank"], "n_var_list": [2], "p_err_list": [0.1], "max_eval": 60}"#,
    )
    .unwrap();

    let status = robustness()
        .arg("run")
        .arg("--config")
        .arg(&config_path)
        .args(["--seed", "7", "--noise-policy", "per-comparison"])
        .arg("--out")
        .arg(&out_path)
        .status()
        .unwrap();
    assert!(status.success());

    let raw = std::fs::read_to_string(&out_path).unwrap();
    let record: RunRecord = serde_json::from_str(raw.lines().next().unwrap()).unwrap();
    assert_eq!(record.function, "griewank");
    assert_eq!(record.seed, 7);
    assert_eq!(record.batch_size, 6);
    assert_eq!(record.iterations, 10);
}

#[test]
fn functions_lists_every_benchmark() {
    let output = robustness().arg("functions").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let names: Vec<&str> = stdout.lines().collect();
    for name in ["ackley", "rosenbrock", "sphere", "zakharov", "rastrigin", "griewank"] {
        assert!(names.contains(&name), "missing {name}");
    }
}

#[test]
fn config_prints_default_sweep() {
    let output = robustness().arg("config").output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["seed"], 4563);
    assert_eq!(value["max_eval"], 2000);
    assert_eq!(value["functions"], serde_json::json!(["ackley"]));
    assert_eq!(value["n_var_list"], serde_json::json!([4, 8, 16, 32]));
}

#[test]
fn invalid_arguments_fail() {
    let status = robustness()
        .args(["run", "--function", "sphere", "--n-var", "2", "--p-err", "1.5"])
        .status()
        .unwrap();
    assert!(!status.success());

    let status = robustness()
        .args(["run", "--function", "nonexistent", "--n-var", "2"])
        .status()
        .unwrap();
    assert!(!status.success());

    let dir = tempdir().unwrap();
    let status = robustness()
        .args(["run", "--function", "sphere", "--n-var", "2", "--max-eval", "12"])
        .arg("--plot-dir")
        .arg(dir.path())
        .args(["--plot-size", "wide"])
        .status()
        .unwrap();
    assert!(!status.success());
}
