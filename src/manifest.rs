//! Simulation manifest (TSV) parsing

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SimulationError, Result};

const REQUIRED_COLUMNS: [&str; 10] = [
    "id",
    "fs",
    "snr_dB",
    "speech_uid",
    "noise_uid",
    "rir_uid",
    "augmentation",
    "length",
    "clean_path",
    "noisy_path",
];

/// One row of the manifest: everything needed to render one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub id: String,
    pub sample_rate: u32,
    pub snr_db: f64,
    pub speech_uid: String,
    pub noise_uid: String,
    /// `None` when the row says `none` or leaves the cell empty.
    pub rir_uid: Option<String>,
    pub augmentation: String,
    pub length: usize,
    pub clean_path: PathBuf,
    pub noisy_path: PathBuf,
    pub noise_path: Option<PathBuf>,
}

pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<ManifestEntry>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .map_err(|e| SimulationError::manifest(format!("Cannot read {}: {}", path.display(), e)))?;
    parse_manifest(&content, &path.display().to_string())
}

/// Parse manifest text. `origin` only appears in error messages.
pub fn parse_manifest(content: &str, origin: &str) -> Result<Vec<ManifestEntry>> {
    let mut lines = content.lines().enumerate().filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| SimulationError::manifest(format!("{}: manifest is empty", origin)))?;
    let columns: HashMap<&str, usize> = header.split('\t').map(str::trim).enumerate().map(|(i, c)| (c, i)).collect();
    if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| !columns.contains_key(*c)) {
        return Err(SimulationError::manifest(format!("{}: missing column `{}`", origin, missing)));
    }

    let mut entries = Vec::new();
    for (index, line) in lines {
        let cells: Vec<&str> = line.split('\t').collect();
        let cell = |name: &str| cell_value(&columns, &cells, name);
        let at = |what: &str, value: &str| {
            SimulationError::manifest(format!("{}:{}: invalid {} `{}`", origin, index + 1, what, value))
        };

        let id = cell("id");
        if id.is_empty() {
            return Err(SimulationError::manifest(format!("{}:{}: empty id", origin, index + 1)));
        }
        let sample_rate = cell("fs").parse::<u32>().ok().filter(|&fs| fs > 0).ok_or_else(|| at("fs", cell("fs")))?;
        let snr_db = cell("snr_dB").parse::<f64>().ok().filter(|x| x.is_finite()).ok_or_else(|| at("snr_dB", cell("snr_dB")))?;
        let length = cell("length").parse::<usize>().map_err(|_| at("length", cell("length")))?;

        let rir_uid = match cell("rir_uid") {
            "" | "none" => None,
            uid => Some(uid.to_string()),
        };
        let noise_path = match cell("noise_path") {
            "" => None,
            p => Some(PathBuf::from(p)),
        };

        entries.push(ManifestEntry {
            id: id.to_string(),
            sample_rate,
            snr_db,
            speech_uid: cell("speech_uid").to_string(),
            noise_uid: cell("noise_uid").to_string(),
            rir_uid,
            augmentation: cell("augmentation").to_string(),
            length,
            clean_path: PathBuf::from(cell("clean_path")),
            noisy_path: PathBuf::from(cell("noisy_path")),
            noise_path,
        });
    }
    Ok(entries)
}

fn cell_value<'a>(columns: &HashMap<&str, usize>, cells: &[&'a str], name: &str) -> &'a str {
    columns.get(name).and_then(|&i| cells.get(i)).map_or("", |s| s.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "id\tfs\tsnr_dB\tspeech_uid\tnoise_uid\trir_uid\taugmentation\tlength\tclean_path\tnoisy_path\tnoise_path";

    #[test]
    fn test_parse_rows() {
        let content = format!(
            "{}\n\
             fileid_1\t16000\t5.0\tspk_a\tnoise_b\tnone\tclipping(min=0.0,max=0.9)\t16000\tclean/1.wav\tnoisy/1.wav\tnoise/1.wav\n\
             \n\
             fileid_2\t48000\t-2.5\tspk_c\twind_noise_d\trir_e\tnone\t48000\tclean/2.wav\tnoisy/2.wav\n",
            HEADER
        );
        let entries = parse_manifest(&content, "meta.tsv").unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].id, "fileid_1");
        assert_eq!(entries[0].rir_uid, None);
        assert_eq!(entries[0].augmentation, "clipping(min=0.0,max=0.9)");
        assert_eq!(entries[0].noise_path, Some(PathBuf::from("noise/1.wav")));

        assert_eq!(entries[1].sample_rate, 48000);
        assert_eq!(entries[1].snr_db, -2.5);
        assert_eq!(entries[1].rir_uid.as_deref(), Some("rir_e"));
        // Missing trailing cell reads as empty.
        assert_eq!(entries[1].noise_path, None);
    }

    #[test]
    fn test_column_order_is_free() {
        let content = "noisy_path\tclean_path\tlength\taugmentation\trir_uid\tnoise_uid\tspeech_uid\tsnr_dB\tfs\tid\n\
                       n.wav\tc.wav\t100\tnone\tnone\tnz\tsp\t10\t8000\tfileid_3\n";
        let entries = parse_manifest(content, "meta.tsv").unwrap();
        assert_eq!(entries[0].id, "fileid_3");
        assert_eq!(entries[0].sample_rate, 8000);
        assert_eq!(entries[0].noisy_path, PathBuf::from("n.wav"));
    }

    #[test]
    fn test_errors() {
        assert!(parse_manifest("", "meta.tsv").is_err());
        assert!(parse_manifest("id\tfs\n", "meta.tsv").is_err());

        let bad_fs = format!("{}\nfileid_1\tfast\t5\ts\tn\tnone\tnone\t10\tc\tn\t\n", HEADER);
        let err = parse_manifest(&bad_fs, "meta.tsv").unwrap_err();
        assert_eq!(err.kind(), "manifest");
        assert!(err.to_string().contains("meta.tsv:2"));
    }
}
