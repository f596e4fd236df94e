use std::f32::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tempfile::TempDir;

use speechsim::audio::{read_wav, write_wav, AudioBuffer, AudioFormat};
use speechsim::config::SourceConfig;
use speechsim::manifest::read_manifest;
use speechsim::processing::{BatchDispatcher, SampleSimulator, SimulationOptions};
use speechsim::registry::SourceRegistry;
use speechsim::transforms::{LossyCodec, SidechainCompressor, SidechainOutput, SidechainParams};
use speechsim::Result;

const FS: u32 = 16000;
const HEADER: &str =
    "id\tfs\tsnr_dB\tspeech_uid\tnoise_uid\trir_uid\taugmentation\tlength\tclean_path\tnoisy_path\tnoise_path";

struct AddingCompressor;

impl SidechainCompressor for AddingCompressor {
    fn compress_and_mix(
        &self,
        carrier: &AudioBuffer,
        modulator: &AudioBuffer,
        _params: &SidechainParams,
        _tag: &str,
    ) -> Result<SidechainOutput> {
        let mix = AudioBuffer::new(carrier.sample_rate(), carrier.data() + modulator.data())?;
        Ok(SidechainOutput { mix, modulator: modulator.clone() })
    }
}

struct PassthroughCodec;

impl LossyCodec for PassthroughCodec {
    fn round_trip(&self, audio: &AudioBuffer, _vbr_quality: f64, _tag: &str) -> Result<AudioBuffer> {
        Ok(audio.clone())
    }
}

fn write_source(dir: &Path, name: &str, samples: Vec<f32>) -> PathBuf {
    let path = dir.join("sources").join(name);
    let buffer = AudioBuffer::from_mono(FS, samples).unwrap();
    write_wav(&path, &buffer, AudioFormat::Float32).unwrap();
    path
}

fn write_list(dir: &Path, name: &str, rows: &[(&str, &Path)]) -> PathBuf {
    let path = dir.join(name);
    let content: String = rows.iter().map(|(uid, p)| format!("{} {} {}\n", uid, FS, p.display())).collect();
    fs::write(&path, content).unwrap();
    path
}

struct Corpus {
    dir: TempDir,
    sources: SourceConfig,
}

impl Corpus {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        let speech: Vec<f32> = (0..FS as usize)
            .map(|i| {
                let t = i as f32 / FS as f32;
                0.4 * (2.0 * PI * 200.0 * t).sin() + 0.2 * (2.0 * PI * 3100.0 * t).sin()
            })
            .collect();
        let mut rng = Pcg32::seed_from_u64(42);
        let noise: Vec<f32> = (0..FS as usize).map(|_| rng.gen_range(-0.5f32..0.5)).collect();

        let speech_path = write_source(root, "speech.wav", speech);
        let noise_path = write_source(root, "white.wav", noise.clone());
        let wind_path = write_source(root, "gust.wav", noise);

        let sources = SourceConfig {
            speech_scps: vec![write_list(root, "speech.scp", &[("spk_a", &speech_path)])],
            noise_scps: vec![write_list(root, "noise.scp", &[("white", &noise_path)])],
            wind_noise_scps: vec![write_list(root, "wind.scp", &[("wind_noise_gust", &wind_path)])],
            rir_scps: Vec::new(),
        };
        Self { dir, sources }
    }

    fn manifest(&self, rows: &[(&str, &str, &str)]) -> PathBuf {
        let out = self.dir.path().join("out");
        let mut content = format!("{}\n", HEADER);
        for (id, noise_uid, augmentation) in rows {
            content.push_str(&format!(
                "{id}\t{FS}\t5\tspk_a\t{noise_uid}\tnone\t{augmentation}\t{FS}\t{clean}\t{noisy}\t{noise}\n",
                clean = out.join("clean").join(format!("{}.wav", id)).display(),
                noisy = out.join("noisy").join(format!("{}.wav", id)).display(),
                noise = out.join("noise").join(format!("{}.wav", id)).display(),
            ));
        }
        let path = self.dir.path().join("manifest.tsv");
        fs::write(&path, content).unwrap();
        path
    }

    fn output(&self, kind: &str, id: &str) -> PathBuf {
        self.dir.path().join("out").join(kind).join(format!("{}.wav", id))
    }
}

fn options() -> SimulationOptions {
    SimulationOptions { store_noise: true, output_format: AudioFormat::Float32, ..Default::default() }
}

#[test]
fn bandwidth_and_clipping_keep_length_and_headroom() {
    let corpus = Corpus::new();
    let manifest = corpus.manifest(&[(
        "fileid_1",
        "white",
        "bandwidth_limitation-kaiser_best->8000/clipping(min=0.0,max=0.95)",
    )]);

    let registry = SourceRegistry::from_config(&corpus.sources).unwrap();
    let entries = read_manifest(&manifest).unwrap();
    let simulator = SampleSimulator::new(&registry, options(), Arc::new(AddingCompressor), Arc::new(PassthroughCodec));
    let report = BatchDispatcher::new(2, 1).run_simulation(&entries, &simulator).unwrap();

    assert!(report.is_success(), "{}", report);
    assert_eq!(report.succeeded, 1);

    let noisy = read_wav(corpus.output("noisy", "fileid_1")).unwrap();
    let clean = read_wav(corpus.output("clean", "fileid_1")).unwrap();
    let noise = read_wav(corpus.output("noise", "fileid_1")).unwrap();

    assert_eq!(noisy.num_frames(), FS as usize);
    assert_eq!(clean.num_frames(), FS as usize);
    assert_eq!(noise.num_frames(), FS as usize);
    assert!(noisy.peak() <= 0.9 + 1e-5);
    let loudest = noisy.peak().max(clean.peak()).max(noise.peak());
    assert!((loudest - 0.9).abs() < 1e-4);
}

#[test]
fn wind_rows_go_through_the_compressor() {
    let corpus = Corpus::new();
    let recipe =
        "wind_noise(threshold=0.1,ratio=4,attack=5,release=50,sc_gain=1,clipping=False,clipping_threshold=0.9)";
    let manifest = corpus.manifest(&[
        ("fileid_2", "wind_noise_gust", recipe),
        ("fileid_3", "wind_noise_gust", "none"),
    ]);

    let registry = SourceRegistry::from_config(&corpus.sources).unwrap();
    assert!(registry.is_wind_noise("wind_noise_gust"));
    let entries = read_manifest(&manifest).unwrap();
    let simulator = SampleSimulator::new(&registry, options(), Arc::new(AddingCompressor), Arc::new(PassthroughCodec));
    let report = BatchDispatcher::new(2, 1).run_simulation(&entries, &simulator).unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].uid, "fileid_3");
    assert_eq!(report.failures[0].kind(), "parse");

    let noisy = read_wav(corpus.output("noisy", "fileid_2")).unwrap();
    assert_eq!(noisy.num_frames(), FS as usize);
    assert!(noisy.peak() <= 0.9 + 1e-5);
    assert!(!corpus.output("noisy", "fileid_3").exists());
}

#[test]
fn same_manifest_renders_identically() {
    let corpus = Corpus::new();
    let manifest = corpus.manifest(&[("fileid_9", "white", "clipping(min=0.05,max=0.95)")]);
    let registry = SourceRegistry::from_config(&corpus.sources).unwrap();
    let entries = read_manifest(&manifest).unwrap();
    let simulator = SampleSimulator::new(&registry, options(), Arc::new(AddingCompressor), Arc::new(PassthroughCodec));

    let first = simulator.render(&entries[0]).unwrap();
    let second = simulator.render(&entries[0]).unwrap();
    assert_eq!(first.noisy.data(), second.noisy.data());
    assert_eq!(first.gain, second.gain);
}
