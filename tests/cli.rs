use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const HEADER: &str = "id\tfs\tsnr_dB\tspeech_uid\tnoise_uid\trir_uid\taugmentation\tlength\tclean_path\tnoisy_path";

fn speechsim() -> Command {
    Command::cargo_bin("speechsim").unwrap()
}

fn setup(dir: &Path, augmentation: &str) -> (PathBuf, PathBuf, PathBuf) {
    let speech = dir.join("speech.scp");
    let noise = dir.join("noise.scp");
    let manifest = dir.join("manifest.tsv");
    fs::write(&speech, "spk_a 16000 /data/spk_a.wav\n").unwrap();
    fs::write(&noise, "# noise\nbabble 16000 /data/babble.wav\n").unwrap();
    fs::write(
        &manifest,
        format!(
            "{}\nfileid_1\t16000\t5\tspk_a\tbabble\tnone\t{}\t16000\tclean/1.wav\tnoisy/1.wav\n",
            HEADER, augmentation
        ),
    )
    .unwrap();
    (speech, noise, manifest)
}

#[test]
fn help_lists_the_main_options() {
    speechsim()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--manifest"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--wind-noise-scps"));
}

#[test]
fn dry_run_accepts_valid_rows() {
    let dir = TempDir::new().unwrap();
    let (speech, noise, manifest) = setup(dir.path(), "bandwidth_limitation-kaiser_best->8000/clipping(min=0.0,max=0.95)");

    speechsim()
        .arg("--manifest").arg(&manifest)
        .arg("--speech-scps").arg(&speech)
        .arg("--noise-scps").arg(&noise)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 rows checked, 0 invalid"));
}

#[test]
fn dry_run_fails_on_bad_recipe() {
    let dir = TempDir::new().unwrap();
    let (speech, noise, manifest) = setup(dir.path(), "reverse(amount=1)");

    speechsim()
        .arg("--manifest").arg(&manifest)
        .arg("--speech-scps").arg(&speech)
        .arg("--noise-scps").arg(&noise)
        .arg("--dry-run")
        .assert()
        .failure()
        .stdout(predicate::str::contains("1 invalid"));
}

#[test]
fn missing_manifest_is_an_error() {
    let dir = TempDir::new().unwrap();
    let (speech, noise, _) = setup(dir.path(), "none");

    speechsim()
        .arg("--manifest").arg(dir.path().join("absent.tsv"))
        .arg("--speech-scps").arg(&speech)
        .arg("--noise-scps").arg(&noise)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot load manifest"));
}

#[test]
fn missing_source_lists_are_rejected() {
    speechsim()
        .args(["--manifest", "manifest.tsv", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn save_config_writes_toml() {
    let dir = TempDir::new().unwrap();
    let (speech, noise, manifest) = setup(dir.path(), "none");
    let saved = dir.path().join("saved.toml");

    speechsim()
        .arg("--manifest").arg(&manifest)
        .arg("--speech-scps").arg(&speech)
        .arg("--noise-scps").arg(&noise)
        .arg("--save-config").arg(&saved)
        .arg("--dry-run")
        .assert()
        .success();

    let content = fs::read_to_string(&saved).unwrap();
    assert!(content.contains("[processing]"));
    assert!(content.contains("speech.scp"));
}

#[test]
fn verbose_run_prints_version() {
    let dir = TempDir::new().unwrap();
    let (speech, noise, manifest) = setup(dir.path(), "none");

    speechsim()
        .arg("--manifest").arg(&manifest)
        .arg("--speech-scps").arg(&speech)
        .arg("--noise-scps").arg(&noise)
        .args(["--dry-run", "--verbose"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("v{}", env!("CARGO_PKG_VERSION"))));
}
