//! End-to-end tests driving the `ste` binary.
//!
//! Each test runs in its own temporary home so user configuration files and
//! environment never leak in.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const LOG: &str = "case_id,Activity,Resource,start_time,end_time,Lifecycle,cost\n\
                   c1,A,alice,,2025-01-15 09:00:00,complete,1\n\
                   c1,B,bob,,2025-01-15 09:30:00,complete,2\n\
                   c1,B,bob,,2025-01-15 09:20:00,start,2\n\
                   c1,C,bob,,2025-01-15 09:40:00,complete,3\n\
                   c2,A,alice,,2025-01-15 09:10:00,complete,4\n\
                   c2,C,system,,2025-01-15 09:50:00,complete,5\n\
                   c2,B,bob,,2025-01-15 10:00:00,complete,6\n";

fn ste_binary() -> String {
    env!("CARGO_BIN_EXE_ste").to_string()
}

fn ste(home: &Path, args: &[&str]) -> Output {
    Command::new(ste_binary())
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run ste")
}

fn setup() -> (TempDir, String) {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("log.csv");
    std::fs::write(&input, LOG).unwrap();
    let input = input.to_string_lossy().into_owned();
    (temp, input)
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "ste should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_estimate_writes_enriched_log() {
    let (temp, input) = setup();
    let output_path = temp.path().join("estimated.csv");

    let output = ste(
        temp.path(),
        &[
            "estimate",
            input.as_str(),
            output_path.to_str().unwrap(),
            "--bot",
            "system",
            "--source-column",
        ],
    );
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Estimated start times of 6 events"));

    let written = std::fs::read_to_string(&output_path).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(
        lines[0],
        "case_id,Activity,Resource,start_time,end_time,Lifecycle,cost,enabled_time,available_time,estimated_start_time,estimate_source"
    );
    // The non-complete record is dropped
    assert_eq!(lines.len(), 7);
    // Bot resources finish the moment they are available
    let bot_row = lines.iter().find(|line| line.contains(",system,")).unwrap();
    assert!(bot_row.ends_with(
        "2025-01-15T09:50:00.000+00:00,2025-01-15T09:50:00.000+00:00,availability"
    ));
}

#[test]
fn test_estimate_replaces_start_times_in_gzip_output() {
    let (temp, input) = setup();
    let output_path = temp.path().join("estimated.csv.gz");

    let output = ste(
        temp.path(),
        &[
            "estimate",
            input.as_str(),
            output_path.to_str().unwrap(),
            "--replace-start-times",
            "--re-estimation",
            "set_instant",
        ],
    );
    assert_success(&output);

    let table =
        ste_log::read_event_log(&output_path, &ste_core::Configuration::default()).unwrap();
    assert!(!table.columns().iter().any(|c| c == "estimated_start_time"));
    for event in table.log().events() {
        let start = event.start.expect("every event gets a start");
        assert!(start <= event.end);
        assert!(event.attribute("cost").is_some());
    }
}

#[test]
fn test_config_file_and_env_layers() {
    let (temp, input) = setup();
    let config_path = temp.path().join("ste.toml");
    std::fs::write(&config_path, "[estimation]\nconcurrency_oracle = \"alpha\"\n").unwrap();

    let output = ste(
        temp.path(),
        &["--config", config_path.to_str().unwrap(), "concurrency", input.as_str()],
    );
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Concurrency oracle: alpha"), "{stdout}");
    assert!(stdout.contains("- B: C"), "{stdout}");

    let output = Command::new(ste_binary())
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env("STE_ESTIMATION__CONCURRENCY_ORACLE", "none")
        .args(["--config", config_path.to_str().unwrap(), "concurrency", input.as_str()])
        .output()
        .unwrap();
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Concurrency oracle: none"), "{stdout}");

    // Flags win over every layer
    let output = ste(
        temp.path(),
        &[
            "--config",
            config_path.to_str().unwrap(),
            "concurrency",
            input.as_str(),
            "--oracle",
            "deactivated",
            "--json",
        ],
    );
    assert_success(&output);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "{}");
}

#[test]
fn test_unsupported_availability_fails_without_output() {
    let (temp, input) = setup();
    let output_path = temp.path().join("estimated.csv");

    let output = Command::new(ste_binary())
        .env("HOME", temp.path())
        .env("XDG_CONFIG_HOME", temp.path().join(".config"))
        .env("STE_ESTIMATION__RESOURCE_AVAILABILITY", "with_calendar")
        .args(["estimate", input.as_str(), output_path.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not supported"), "{stderr}");
    assert!(!output_path.exists());
}

#[test]
fn test_unreadable_input_fails() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("missing.csv");
    let output = ste(temp.path(), &["enabled", missing.to_str().unwrap(), "out.csv"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read"), "{stderr}");
}

#[test]
fn test_enabled_writes_one_extra_column() {
    let (temp, input) = setup();
    let output_path = temp.path().join("enabled.csv");

    let output = ste(
        temp.path(),
        &[
            "enabled",
            input.as_str(),
            output_path.to_str().unwrap(),
            "--unknown-as-trace-start",
        ],
    );
    assert_success(&output);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "Enabled times of 6 events (6 known)"
    );

    let written = std::fs::read_to_string(&output_path).unwrap();
    assert!(written.lines().next().unwrap().ends_with(",cost,enabled_time"));
}

const XES_LOG: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<log xes.version="1.0" xmlns="http://www.xes-standard.org/">
  <trace>
    <string key="concept:name" value="c1"/>
    <event>
      <string key="concept:name" value="A"/>
      <string key="org:resource" value="alice"/>
      <date key="time:timestamp" value="2025-01-15T09:00:00.000+00:00"/>
    </event>
    <event>
      <string key="concept:name" value="B"/>
      <string key="org:resource" value="bob"/>
      <date key="time:timestamp" value="2025-01-15T09:30:00.000+00:00"/>
    </event>
  </trace>
</log>
"#;

#[test]
fn test_estimate_reads_and_writes_xes() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("log.xes");
    std::fs::write(&input, XES_LOG).unwrap();
    let output_path = temp.path().join("estimated.xes.gz");

    let output = ste(
        temp.path(),
        &[
            "estimate",
            input.to_str().unwrap(),
            output_path.to_str().unwrap(),
            "--field-names",
            "xes",
            "--replace-start-times",
        ],
    );
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Estimated start times of 2 events"), "{stdout}");

    let config = ste_core::Configuration {
        log_ids: ste_core::EventLogIds::xes(),
        ..ste_core::Configuration::default()
    };
    let table = ste_log::read_event_log(&output_path, &config).unwrap();
    let starts: Vec<_> = table.log().events().iter().map(|event| event.start).collect();
    assert_eq!(starts.len(), 2);
    assert_eq!(starts[1], Some(table.log().events()[0].end));
}

#[test]
fn test_csv_input_cannot_be_written_as_xes() {
    let (temp, input) = setup();
    let output_path = temp.path().join("estimated.xes");

    let output = ste(temp.path(), &["estimate", input.as_str(), output_path.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not read from an XES file"), "{stderr}");
    assert!(!output_path.exists());
}
