use assert_fs::prelude::*;
use predicates::prelude::*;

const THROUGHPUT_YAML: &str = "- date: 2026-01-26
  completed_issues: 2
- date: 2026-01-27
  completed_issues: 2
- date: 2026-01-28
  completed_issues: 2";

fn throughput_file(dir: &assert_fs::TempDir, contents: &str) -> std::path::PathBuf {
    let file = dir.child("throughput.yaml");
    file.write_str(contents).unwrap();
    file.path().to_path_buf()
}

#[test]
fn how_many_prints_and_writes_report() {
    let dir = assert_fs::TempDir::new().unwrap();
    let throughput = throughput_file(&dir, THROUGHPUT_YAML);
    let output = dir.child("how_many.yaml");

    let mut cmd = assert_cmd::cargo_bin_cmd!("flow-forecasts");
    cmd.arg("how-many")
        .arg("-f")
        .arg(&throughput)
        .args(["-d", "10", "--trials", "50", "-o"])
        .arg(output.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("How Many Forecast"))
        .stdout(predicate::str::contains("P85 | 20"))
        .stdout(predicate::str::contains("Forecast written to"));

    output.assert(predicate::str::contains("days: 10"));
    output.assert(predicate::str::contains("p50: 20"));
    output.assert(predicate::str::contains("predictability_score: 1.0"));
}

#[test]
fn when_reports_dates_and_likelihood() {
    let dir = assert_fs::TempDir::new().unwrap();
    let throughput = throughput_file(&dir, THROUGHPUT_YAML);
    let output = dir.child("when.yaml");

    let mut cmd = assert_cmd::cargo_bin_cmd!("flow-forecasts");
    cmd.arg("when")
        .arg("-f")
        .arg(&throughput)
        .args([
            "-n",
            "10",
            "-s",
            "2026-02-01",
            "--target-date",
            "2026-02-04",
            "--trials",
            "40",
            "-o",
        ])
        .arg(output.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("P95 | 5 | 2026-02-06"))
        .stdout(predicate::str::contains("Likelihood by 2026-02-04: 0.0%"));

    output.assert(predicate::str::contains("remaining_items: 10"));
    output.assert(predicate::str::contains("2026-02-06"));
}

#[test]
fn when_writes_histogram() {
    let dir = assert_fs::TempDir::new().unwrap();
    let throughput = throughput_file(&dir, "- date: 2026-01-26\n  completed_issues: 1\n- date: 2026-01-27\n  completed_issues: 3\n");
    let histogram = dir.child("when.png");

    let mut cmd = assert_cmd::cargo_bin_cmd!("flow-forecasts");
    cmd.arg("when")
        .arg("-f")
        .arg(&throughput)
        .args(["-n", "12", "--trials", "200", "--histogram"])
        .arg(histogram.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Histogram written to"));
    histogram.assert(predicate::path::exists());
}

#[test]
fn when_without_throughput_fails() {
    let dir = assert_fs::TempDir::new().unwrap();
    let throughput = throughput_file(&dir, "- date: 2026-01-26\n  completed_issues: 0\n");

    let mut cmd = assert_cmd::cargo_bin_cmd!("flow-forecasts");
    cmd.arg("when").arg("-f").arg(&throughput).args(["-n", "3"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to forecast when"))
        .stderr(predicate::str::contains("no nonzero values"));
}

#[test]
fn invalid_start_date_is_rejected() {
    let dir = assert_fs::TempDir::new().unwrap();
    let throughput = throughput_file(&dir, THROUGHPUT_YAML);

    let mut cmd = assert_cmd::cargo_bin_cmd!("flow-forecasts");
    cmd.arg("when")
        .arg("-f")
        .arg(&throughput)
        .args(["-n", "3", "-s", "01.02.2026"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("invalid date 01.02.2026"));
}
