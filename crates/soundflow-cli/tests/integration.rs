//! Integration tests for soundflow-cli.
//!
//! Tests cover CLI binary invocation on device-free paths (help, offline
//! tone rendering, failure exits) and end-to-end graph playback through the
//! library crates.

use std::process::Command;

/// Helper to get the path to the `soundflow` binary built by cargo.
fn soundflow_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_soundflow"))
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `soundflow --help` / `--version`
// ---------------------------------------------------------------------------

#[test]
fn cli_help_works() {
    let output = soundflow_bin()
        .arg("--help")
        .output()
        .expect("failed to run soundflow --help");

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Soundflow audio graph shell"));
    assert!(stdout.contains("play"));
    assert!(stdout.contains("tone"));
}

#[test]
fn cli_version_works() {
    let output = soundflow_bin()
        .arg("--version")
        .output()
        .expect("failed to run soundflow --version");

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("soundflow"),
        "version output should contain 'soundflow'"
    );
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `soundflow tone --output` (offline, no device needed)
// ---------------------------------------------------------------------------

#[test]
fn cli_tone_renders_offline_wav() {
    use soundflow_graph::{AudioFormat, PcmDecoder};
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let output_path = dir.path().join("tone.wav");

    let output = soundflow_bin()
        .args([
            "tone",
            "--freq",
            "440",
            "--duration",
            "0.1",
            "--output",
            output_path.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run soundflow tone");

    assert!(
        output.status.success(),
        "soundflow tone failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output_path.exists());

    // Decode what we just wrote; 0.1 s at 44.1 kHz is 4410 frames.
    let format = AudioFormat {
        sample_rate: 44_100,
        channels: 2,
    };
    let mut producer = soundflow_io::WavDecoder
        .open_file(output_path.to_str().unwrap(), format)
        .unwrap();
    let mut buf = vec![0.0_f32; 8192 * 2];
    let frames = producer.render(8192, &mut buf);
    assert!(
        (4400..=4410).contains(&frames),
        "expected ~4410 frames, got {frames}"
    );
    assert!(buf.iter().any(|s| s.abs() > 0.1), "tone should be audible");
}

#[test]
fn cli_tone_filtered_attenuates_output() {
    use soundflow_graph::{AudioFormat, PcmDecoder};
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let plain_path = dir.path().join("plain.wav");
    let filtered_path = dir.path().join("filtered.wav");

    for (path, extra) in [(&plain_path, None), (&filtered_path, Some("--filtered"))] {
        let mut args = vec![
            "tone",
            "--freq",
            "4000",
            "--duration",
            "0.1",
            "--output",
            path.to_str().unwrap(),
        ];
        if let Some(flag) = extra {
            args.push(flag);
        }
        let output = soundflow_bin().args(&args).output().expect("tone failed");
        assert!(output.status.success());
    }

    let format = AudioFormat {
        sample_rate: 44_100,
        channels: 2,
    };
    let rms = |path: &std::path::Path| {
        let mut producer = soundflow_io::WavDecoder
            .open_file(path.to_str().unwrap(), format)
            .unwrap();
        let mut buf = vec![0.0_f32; 8192 * 2];
        let frames = producer.render(8192, &mut buf);
        let n = frames * 2;
        (buf[..n].iter().map(|s| s * s).sum::<f32>() / n as f32).sqrt()
    };

    // 4 kHz sits far above the ~551 Hz cutoff; the filtered tone must be
    // much quieter than the plain one.
    assert!(rms(&filtered_path) < rms(&plain_path) * 0.3);
}

// ---------------------------------------------------------------------------
// CLI binary tests -- failure exits
// ---------------------------------------------------------------------------

#[test]
fn cli_play_nonexistent_file_fails() {
    let output = soundflow_bin()
        .args(["play", "/tmp/nonexistent_soundflow_test_12345.wav"])
        .output()
        .expect("failed to run soundflow");

    assert!(
        !output.status.success(),
        "play with nonexistent input should fail"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("resource init failed") || stderr.contains("nonexistent"),
        "error should mention the failure, got: {stderr}"
    );
}

#[test]
fn cli_play_malformed_patch_fails() {
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let patch_path = dir.path().join("broken.toml");
    std::fs::write(&patch_path, "name = [not valid toml").unwrap();

    let output = soundflow_bin()
        .args(["play", "--patch", patch_path.to_str().unwrap()])
        .output()
        .expect("failed to run soundflow");

    assert!(!output.status.success(), "malformed patch should fail");
}

#[test]
fn cli_play_requires_a_file_or_patch() {
    let output = soundflow_bin()
        .arg("play")
        .output()
        .expect("failed to run soundflow");

    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// Library-level tests -- offline render through the public crates
// ---------------------------------------------------------------------------

#[test]
fn graph_renders_a_decoded_wav_end_to_end() {
    use soundflow_graph::{AudioFormat, GraphConfig, NodeSpec, Patch, Rect};
    use soundflow_io::{WavDecoder, write_wav};
    use tempfile::TempDir;

    let dir = TempDir::new().unwrap();
    let wav_path = dir.path().join("input.wav");

    let format = AudioFormat {
        sample_rate: 48_000,
        channels: 2,
    };
    let samples: Vec<f32> = (0..4800)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * (i / 2) as f32 / 48_000.0).sin() * 0.5)
        .collect();
    write_wav(&wav_path, &samples, format).unwrap();

    let (mut patch, mut graph) = Patch::new(GraphConfig::default(), Box::new(WavDecoder));
    let src = patch
        .create(
            NodeSpec::SourceDecoder {
                path: wav_path.to_str().unwrap(),
            },
            "src",
            Rect::default(),
        )
        .unwrap();
    let out = patch
        .create(NodeSpec::Endpoint, "out", Rect::default())
        .unwrap();
    patch.link(out, 0, src, 0).unwrap();

    let mut buf = vec![0.0_f32; 512 * 2];
    graph.render(&mut buf);
    assert!(buf.iter().any(|s| s.abs() > 0.05), "audio should flow");

    // Drain the rest of the file; the graph must settle into silence.
    for _ in 0..16 {
        graph.render(&mut buf);
    }
    assert!(buf.iter().all(|s| *s == 0.0), "ended file must be silent");
}
