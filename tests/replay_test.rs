//! Replaying recordings through the frame loop and the command-line tool

mod test_helpers;

use pupillary_distance::{
    config::Config,
    replay::RecordingSource,
    runner::FrameLoop,
    session::{MeasurementSession, SessionState},
};
use std::process::Command;
use std::sync::{mpsc, Arc, Mutex};
use tempfile::tempdir;
use test_helpers::{face_with_pd, write_recording};

#[test]
fn test_frame_loop_replays_recording() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    let mut frames = vec![None, None];
    frames.extend((0..10).map(|i| Some(face_with_pd(62.0 + f64::from(i % 3) * 0.1))));
    frames.push(None);
    write_recording(&path, &frames).unwrap();

    let session = Arc::new(Mutex::new(MeasurementSession::new(&Config::default()).unwrap()));
    let (tx, rx) = mpsc::channel();
    let source = RecordingSource::open(&path).unwrap();
    let frame_loop = FrameLoop::start(Box::new(source), Arc::clone(&session), 1000, tx).unwrap();

    let snapshots: Vec<_> = rx.iter().collect();
    let stats = frame_loop.wait().unwrap();

    assert_eq!(stats.processed, frames.len() as u64);
    assert!(snapshots.iter().any(|s| s.state.is_stable()));
    assert!(snapshots.windows(2).all(|w| w[0].frame_index < w[1].frame_index));

    let session = session.lock().unwrap();
    assert_eq!(session.state(), SessionState::Stable(10));
    let captured = session.capture().unwrap();
    assert!((captured.result.value.total_pd - 62.1).abs() < 0.1);
}

fn pd_replay() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pd-replay"))
}

#[test]
fn test_cli_prints_capture() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.jsonl");
    write_recording(&path, &vec![Some(face_with_pd(64.0)); 8]).unwrap();

    let output = pd_replay()
        .args(["--recording", path.to_str().unwrap(), "--fps", "1000", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let captured: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(captured["formatted"]["pd"], "64.0");
    assert_eq!(captured["result"]["samples"], 8);
}

#[test]
fn test_cli_reports_insufficient_data() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.jsonl");
    write_recording(&path, &[Some(face_with_pd(64.0)), None]).unwrap();

    let output = pd_replay()
        .args(["--recording", path.to_str().unwrap(), "--fps", "1000"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No stable measurement"));
}

#[test]
fn test_cli_rejects_unknown_frame() {
    let dir = tempdir().unwrap();
    let recording = dir.path().join("session.jsonl");
    write_recording(&recording, &[None]).unwrap();

    let output = pd_replay()
        .args([
            "--recording",
            recording.to_str().unwrap(),
            "--catalog",
            dir.path().join("frames.yaml").to_str().unwrap(),
            "--frame",
            "NOPE",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_cli_print_config() {
    let output = pd_replay().arg("--print-config").output().unwrap();
    assert!(output.status.success());
    let config = Config::from_yaml(&String::from_utf8_lossy(&output.stdout)).unwrap();
    config.validate().unwrap();
}
