use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;
use tempfile::tempdir;

#[derive(Debug, Deserialize)]
struct RunSummary {
    topic: String,
    completed: bool,
    events: Vec<EventEntry>,
    variables: std::collections::BTreeMap<String, i32>,
}

#[derive(Debug, Deserialize)]
struct EventEntry {
    sequence: u32,
    frame: u32,
    label: String,
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn intro_topic_plays_to_completion() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for event log")?;
    let event_log_path = temp_dir.path().join("intro_events.json");
    let conversation = fixture("intro.json");

    let output = Command::new(env!("CARGO_BIN_EXE_colloquy_player"))
        .arg("--conversation")
        .arg(&conversation)
        .args(["--file", "office", "--topic", "intro", "--choices", "1"])
        .arg("--event-log-json")
        .arg(&event_log_path)
        .output()
        .context("executing colloquy_player")?;

    assert!(
        output.status.success(),
        "colloquy_player exited with {:?}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(
        event_log_path.is_file(),
        "colloquy_player did not produce an event log"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Saved playback event log"));

    let data = fs::read_to_string(&event_log_path).context("reading event log")?;
    let summary: RunSummary = serde_json::from_str(&data).context("parsing event log")?;

    assert_eq!(summary.topic, "office/intro");
    assert!(summary.completed, "intro should finish inside the time limit");
    assert_eq!(summary.variables.get("answer"), Some(&1));
    assert_eq!(summary.variables.get("rings"), Some(&2));
    assert_eq!(summary.variables.get("shifts"), Some(&1));
    assert_eq!(summary.variables.get("visits"), Some(&1));

    let labels: Vec<&str> = summary
        .events
        .iter()
        .map(|event| event.label.as_str())
        .collect();
    for expected in ["side.add side#1", "side.remove side#1", "choice.select 1", "playback.end"] {
        assert!(labels.contains(&expected), "missing {expected} in {labels:?}");
    }
    assert!(summary
        .events
        .windows(2)
        .all(|pair| pair[0].sequence < pair[1].sequence && pair[0].frame <= pair[1].frame));

    Ok(())
}

#[test]
fn unknown_topic_fails() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_colloquy_player"))
        .arg("--conversation")
        .arg(fixture("intro.json"))
        .args(["--topic", "epilogue"])
        .output()
        .context("executing colloquy_player")?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("topic epilogue not found"), "stderr: {stderr}");
    Ok(())
}
