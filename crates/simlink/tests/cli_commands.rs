#![cfg(all(unix, feature = "cli"))]

use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/simlink-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn simlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_simlink"))
        .args(["--log-level", "error"])
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("simlink should run")
}

#[test]
fn version_prints_package_version() {
    let output = simlink(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("simlink {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn keys_lists_full_keypad_as_json() {
    let output = simlink(&["--format", "json", "keys", "--model", "q1"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"model\":\"q1\""));
    assert!(stdout.contains("{\"host\":\"F6\",\"device\":\"0x1d\",\"code\":29}"));
    assert!(stdout.contains("{\"host\":\"Ctrl+Z\",\"action\":\"snapshot\"}"));
}

#[test]
fn keys_table_for_numeric_keypad() {
    let output = simlink(&["--format", "table", "keys", "--model", "mk4"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("HOST"));
    assert!(stdout.contains("Enter"));
    assert!(!stdout.contains("PageUp"));
}

#[test]
fn decode_reports_frame_statistics() {
    let dir = unique_temp_dir("decode");
    let capture = dir.join("display.bin");
    let image = dir.join("frame.ppm");
    let mut frame = vec![0u8; 1024];
    frame[0] = 0xff;
    std::fs::write(&capture, &frame).unwrap();

    let output = simlink(&[
        "--format",
        "json",
        "decode",
        capture.to_str().unwrap(),
        "--model",
        "mk4",
        "--ppm",
        image.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"width\":128"));
    assert!(stdout.contains("\"lit_pixels\":8"));
    let ppm = std::fs::read(&image).unwrap();
    assert!(ppm.starts_with(b"P6\n128 64\n255\n"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_truncated_capture_is_data_invalid() {
    let dir = unique_temp_dir("decode-short");
    let capture = dir.join("display.bin");
    std::fs::write(&capture, [0u8; 100]).unwrap();

    let output = simlink(&["decode", capture.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn run_drains_when_firmware_exits() {
    let dir = unique_temp_dir("run");
    let sock = dir.join("sim.sock");
    drop(UnixListener::bind(&sock).unwrap());

    // one blank frame, then linger so the bridge sees it before the exit
    let script = "head -c 1024 /dev/zero > /dev/fd/$1; sleep 1";
    let output = simlink(&[
        "--format",
        "json",
        "run",
        "--render",
        "none",
        "--socket-path",
        sock.to_str().unwrap(),
        "--",
        "sh",
        "-c",
        script,
        "sh",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"reason\":\"firmware_exited\""));
    assert!(stdout.contains("\"code\":0"));
    assert!(stdout.contains("\"frames\":1"));
    assert!(!sock.exists(), "stale socket should be removed");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn run_refuses_to_remove_non_socket() {
    let dir = unique_temp_dir("run-file");
    let path = dir.join("sim.sock");
    std::fs::write(&path, b"keep me").unwrap();

    let output = simlink(&[
        "run",
        "--render",
        "none",
        "--socket-path",
        path.to_str().unwrap(),
        "--",
        "true",
    ]);

    assert!(!output.status.success());
    assert_eq!(std::fs::read(&path).unwrap(), b"keep me");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn run_missing_firmware_fails() {
    let dir = unique_temp_dir("run-missing");
    let sock = dir.join("sim.sock");

    let output = simlink(&[
        "run",
        "--render",
        "none",
        "--socket-path",
        sock.to_str().unwrap(),
        "--",
        "/nonexistent/simlink-firmware",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to start"));

    let _ = std::fs::remove_dir_all(&dir);
}
