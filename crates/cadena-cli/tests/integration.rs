//! Integration tests for the `cadena` binary: invocation, exit codes, and
//! end-to-end file processing.

use cadena_core::{Encoding, Sample, SampleSize, SignalSpec};
use cadena_format::{FormatReader, FormatWriter};
use std::process::Command;
use tempfile::TempDir;

/// Helper to get the `cadena` binary built by cargo.
fn cadena_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cadena"))
}

fn spec(rate: u32, channels: u32) -> SignalSpec {
    SignalSpec {
        rate,
        channels,
        size: SampleSize::Bytes2,
        encoding: Encoding::Signed,
    }
}

fn write_wav(dir: &TempDir, name: &str, spec: SignalSpec, samples: &[Sample]) -> String {
    let path = dir.path().join(name);
    let mut writer = cadena_format::wav::WavWriter::create(&path, spec, None).unwrap();
    writer.write(samples).unwrap();
    writer.finalize().unwrap();
    path.to_string_lossy().into_owned()
}

fn read_wav_all(path: &str) -> (Vec<Sample>, SignalSpec) {
    let mut reader = cadena_format::wav::WavReader::open(path).unwrap();
    let spec = reader.signal();
    let mut samples = Vec::new();
    let mut chunk = vec![0; 4096];
    loop {
        let n = reader.read(&mut chunk).unwrap();
        if n == 0 {
            break;
        }
        samples.extend_from_slice(&chunk[..n]);
    }
    (samples, spec)
}

fn tone(len: usize) -> Vec<Sample> {
    (0..len).map(|i| (((i % 2000) as Sample) - 1000) << 16).collect()
}

// ---------------------------------------------------------------------------
// Invocation basics
// ---------------------------------------------------------------------------

#[test]
fn cli_help_works() {
    let output = cadena_bin()
        .arg("--help")
        .output()
        .expect("failed to run cadena --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("audio pipeline"));
    assert!(stdout.contains("--combine"));
    assert!(stdout.contains("--effects"));
}

#[test]
fn cli_version_works() {
    let output = cadena_bin()
        .arg("--version")
        .output()
        .expect("failed to run cadena --version");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cadena"));
}

#[test]
fn cli_list_effects() {
    let output = cadena_bin()
        .arg("--list-effects")
        .output()
        .expect("failed to run cadena --list-effects");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["vol", "trim", "mixer", "rate", "reverse", "repeat"] {
        assert!(stdout.contains(name), "listing should contain `{name}`");
    }
}

#[test]
fn cli_no_files_is_a_usage_error() {
    let output = cadena_bin().output().expect("failed to run cadena");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn cli_tiny_buffer_is_rejected() {
    let output = cadena_bin()
        .args(["--buffer", "8", "a.wav", "b.wav"])
        .output()
        .expect("failed to run cadena");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("buffer size"), "{stderr}");
}

// ---------------------------------------------------------------------------
// End-to-end processing
// ---------------------------------------------------------------------------

#[test]
fn cli_copies_a_file() {
    let dir = TempDir::new().unwrap();
    let samples = tone(4000);
    let input = write_wav(&dir, "in.wav", spec(8000, 1), &samples);
    let output = dir.path().join("out.wav").to_string_lossy().into_owned();

    let result = cadena_bin()
        .args([&input, &output])
        .output()
        .expect("failed to run cadena");
    assert!(
        result.status.success(),
        "cadena failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let (loaded, _) = read_wav_all(&output);
    assert_eq!(loaded, samples);
}

#[test]
fn cli_applies_an_effects_chain() {
    let dir = TempDir::new().unwrap();
    let samples: Vec<Sample> = (0..1000).map(|i| (i as Sample) << 16).collect();
    let input = write_wav(&dir, "in.wav", spec(8000, 1), &samples);
    let output = dir.path().join("out.wav").to_string_lossy().into_owned();

    let result = cadena_bin()
        .args([&input, &output, "--effects", "vol:0.5"])
        .output()
        .expect("failed to run cadena");
    assert!(
        result.status.success(),
        "{}",
        String::from_utf8_lossy(&result.stderr)
    );

    let (loaded, _) = read_wav_all(&output);
    assert_eq!(loaded.len(), 1000);
    for (i, &sample) in loaded.iter().enumerate() {
        let expected = ((i as i64) << 16) / 2;
        assert!((sample as i64 - expected).abs() <= 1 << 16);
    }
}

#[test]
fn cli_concatenates_two_files() {
    let dir = TempDir::new().unwrap();
    let a = write_wav(&dir, "a.wav", spec(8000, 1), &tone(1200));
    let b = write_wav(&dir, "b.wav", spec(8000, 1), &tone(800));
    let output = dir.path().join("out.wav").to_string_lossy().into_owned();

    let result = cadena_bin()
        .args([&a, &b, &output])
        .output()
        .expect("failed to run cadena");
    assert!(result.status.success());

    let (loaded, _) = read_wav_all(&output);
    assert_eq!(loaded.len(), 2000);
}

#[test]
fn cli_merges_mono_files_into_stereo() {
    let dir = TempDir::new().unwrap();
    let a = write_wav(&dir, "a.wav", spec(44100, 1), &tone(1000));
    let b = write_wav(&dir, "b.wav", spec(44100, 1), &tone(500));
    let output = dir.path().join("st.wav").to_string_lossy().into_owned();

    let result = cadena_bin()
        .args(["-M", &a, &b, &output])
        .output()
        .expect("failed to run cadena");
    assert!(
        result.status.success(),
        "{}",
        String::from_utf8_lossy(&result.stderr)
    );

    let (loaded, out_spec) = read_wav_all(&output);
    assert_eq!(out_spec.channels, 2);
    assert_eq!(loaded.len(), 2000);
    // The shorter input pads with silence.
    assert_eq!(loaded[1999], 0);
}

#[test]
fn cli_resamples_with_output_rate_option() {
    let dir = TempDir::new().unwrap();
    let input = write_wav(&dir, "in.wav", spec(8000, 1), &tone(8000));
    let output = dir.path().join("out.wav").to_string_lossy().into_owned();

    let result = cadena_bin()
        .args(["-r", "4000", &input, &output])
        .output()
        .expect("failed to run cadena");
    assert!(
        result.status.success(),
        "{}",
        String::from_utf8_lossy(&result.stderr)
    );

    let (loaded, out_spec) = read_wav_all(&output);
    assert_eq!(out_spec.rate, 4000);
    assert!((loaded.len() as i64 - 4000).abs() <= 2);
}

#[test]
fn cli_reads_headerless_input_with_hints() {
    let dir = TempDir::new().unwrap();
    // 100 signed 16-bit little-endian samples.
    let raw_path = dir.path().join("in.raw");
    let bytes: Vec<u8> = (0..100i16).flat_map(|i| i.to_le_bytes()).collect();
    std::fs::write(&raw_path, bytes).unwrap();
    let output = dir.path().join("out.wav").to_string_lossy().into_owned();

    let result = cadena_bin()
        .args([
            "--in-rate",
            "8000",
            "--in-channels",
            "1",
            "--in-bits",
            "16",
            "--in-encoding",
            "signed",
            raw_path.to_str().unwrap(),
            &output,
        ])
        .output()
        .expect("failed to run cadena");
    assert!(
        result.status.success(),
        "{}",
        String::from_utf8_lossy(&result.stderr)
    );

    let (loaded, out_spec) = read_wav_all(&output);
    assert_eq!(out_spec.rate, 8000);
    assert_eq!(loaded.len(), 100);
    assert_eq!(loaded[99], 99 << 16);
}

#[test]
fn cli_expands_playlists() {
    let dir = TempDir::new().unwrap();
    write_wav(&dir, "one.wav", spec(8000, 1), &tone(300));
    write_wav(&dir, "two.wav", spec(8000, 1), &tone(200));
    let playlist = dir.path().join("set.m3u");
    std::fs::write(&playlist, "one.wav\ntwo.wav\n").unwrap();
    let output = dir.path().join("out.wav").to_string_lossy().into_owned();

    let result = cadena_bin()
        .args([playlist.to_str().unwrap(), &output])
        .output()
        .expect("failed to run cadena");
    assert!(
        result.status.success(),
        "{}",
        String::from_utf8_lossy(&result.stderr)
    );

    let (loaded, _) = read_wav_all(&output);
    assert_eq!(loaded.len(), 500);
}

#[test]
fn cli_effects_file_drives_the_chain() {
    let dir = TempDir::new().unwrap();
    let samples = tone(400);
    let input = write_wav(&dir, "in.wav", spec(8000, 1), &samples);
    let chain = dir.path().join("chain.toml");
    std::fs::write(
        &chain,
        "[[effect]]\nname = \"reverse\"\n",
    )
    .unwrap();
    let output = dir.path().join("out.wav").to_string_lossy().into_owned();

    let result = cadena_bin()
        .args([
            "--effects-file",
            chain.to_str().unwrap(),
            &input,
            &output,
        ])
        .output()
        .expect("failed to run cadena");
    assert!(
        result.status.success(),
        "{}",
        String::from_utf8_lossy(&result.stderr)
    );

    let (loaded, _) = read_wav_all(&output);
    let reversed: Vec<Sample> = samples.iter().rev().copied().collect();
    assert_eq!(loaded, reversed);
}

// ---------------------------------------------------------------------------
// Failure modes
// ---------------------------------------------------------------------------

#[test]
fn cli_missing_input_exits_2() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.wav").to_string_lossy().into_owned();

    let result = cadena_bin()
        .args(["/no/such/file.wav", &output])
        .output()
        .expect("failed to run cadena");
    assert_eq!(result.status.code(), Some(2));
}

#[test]
fn cli_unknown_effect_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = write_wav(&dir, "in.wav", spec(8000, 1), &tone(10));
    let output = dir.path().join("out.wav").to_string_lossy().into_owned();

    let result = cadena_bin()
        .args([&input, &output, "--effects", "flanger"])
        .output()
        .expect("failed to run cadena");
    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("does not exist"), "{stderr}");
}

#[test]
fn cli_mismatched_concat_exits_1_and_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let a = write_wav(&dir, "a.wav", spec(8000, 1), &tone(100));
    let b = write_wav(&dir, "b.wav", spec(8000, 2), &tone(100));
    let output = dir.path().join("out.wav").to_string_lossy().into_owned();

    let result = cadena_bin()
        .args([&a, &b, &output])
        .output()
        .expect("failed to run cadena");
    assert_eq!(result.status.code(), Some(1));
    assert!(!std::path::Path::new(&output).exists());
}
