//! Per-id batch processing
//!
//! One function per [`ProcessingMode`]. Ids run sequentially in resolved
//! order and the first failure halts the batch; outputs of earlier ids stay
//! on disk.

use std::path::{Path, PathBuf};

use vocprep_common::fs::ensure_directory_exists;

use crate::archive::FeatureArchive;
use crate::error::ProcessResult;
use crate::file_ids::{resolve_file_ids, LABEL_SUFFIX, WAV_SUFFIX};
use crate::file_io::{save_bin, save_proto, save_txt};
use crate::mode::ProcessingMode;
use crate::pairing::validate_pairing;
use crate::types::{FileId, Label, LabelLoader, Wav, WavLoader};

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: &'static str,
    pub processed: usize,
    pub files_written: usize,
}

/// Drives one run over a label loader and a waveform loader
pub struct Processor<L, W> {
    labels: L,
    wavs: W,
    out_dir: PathBuf,
}

impl<L, W> Processor<L, W>
where
    L: LabelLoader,
    W: WavLoader,
{
    pub fn new(labels: L, wavs: W, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            labels,
            wavs,
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Run the selected mode over every resolved id
    ///
    /// `id_list`, when given, replaces directory scanning for every input
    /// directory of the mode.
    pub fn run(&self, mode: &ProcessingMode, id_list: Option<&Path>) -> ProcessResult<RunSummary> {
        ensure_directory_exists(&self.out_dir)?;

        tracing::info!(
            mode = mode.name(),
            out_dir = %self.out_dir.display(),
            "Starting run"
        );

        let (processed, files_written) = match mode {
            ProcessingMode::Combined { lab_dir, wav_dir } => {
                let label_ids = resolve_file_ids(lab_dir, LABEL_SUFFIX, id_list)?;
                let wav_ids = resolve_file_ids(wav_dir, WAV_SUFFIX, id_list)?;
                let ids = validate_pairing(label_ids, wav_ids)?;
                for id in &ids {
                    self.process_combined(id, lab_dir, wav_dir)?;
                }
                (ids.len(), ids.len())
            }
            ProcessingMode::LabelOnly { lab_dir } => {
                let ids = resolve_file_ids(lab_dir, LABEL_SUFFIX, id_list)?;
                for id in &ids {
                    self.process_label(id, lab_dir)?;
                }
                (ids.len(), ids.len() * 2)
            }
            ProcessingMode::WaveformOnly { wav_dir } => {
                let ids = resolve_file_ids(wav_dir, WAV_SUFFIX, id_list)?;
                for id in &ids {
                    self.process_wav(id, wav_dir)?;
                }
                (ids.len(), ids.len() * 3)
            }
        };

        Ok(RunSummary {
            mode: mode.name(),
            processed,
            files_written,
        })
    }

    /// `{id}.proto` holding label, duration and vocoder features
    fn process_combined(&self, id: &FileId, lab_dir: &Path, wav_dir: &Path) -> ProcessResult<()> {
        tracing::debug!(id = %id, "Processing label and waveform");

        let label = self.labels.load(&input_path(lab_dir, id, LABEL_SUFFIX))?;
        let wav = self.wavs.load(&input_path(wav_dir, id, WAV_SUFFIX))?;

        let binary_label = label.binarize("")?;
        let duration = label.count_frames();
        let features = wav.extract_features()?;

        let vocoder_frames = features.frame_count();
        if frame_counts_disagree(duration, vocoder_frames) {
            tracing::warn!(
                id = %id,
                label_frames = duration,
                vocoder_frames = vocoder_frames,
                "Label and vocoder frame counts differ"
            );
        } else if vocoder_frames != duration {
            tracing::debug!(
                id = %id,
                label_frames = duration,
                vocoder_frames = vocoder_frames,
                "Edge frame difference between label and vocoder"
            );
        }

        let archive = FeatureArchive::new(binary_label, duration, features);
        save_proto(&archive, &self.output_path(id, "proto"))?;

        tracing::info!(id = %id, frames = duration, "Wrote feature archive");
        Ok(())
    }

    /// `{id}.dur` (text frame count) and `{id}.lab` (raw binary label)
    fn process_label(&self, id: &FileId, lab_dir: &Path) -> ProcessResult<()> {
        tracing::debug!(id = %id, "Processing label");

        let label = self.labels.load(&input_path(lab_dir, id, LABEL_SUFFIX))?;

        let duration = label.count_frames();
        save_txt(&duration, &self.output_path(id, "dur"))?;

        let binary_label = label.binarize("")?;
        save_bin(&binary_label, &self.output_path(id, "lab"))?;

        tracing::info!(
            id = %id,
            frames = duration,
            dimension = binary_label.cols(),
            "Wrote label features"
        );
        Ok(())
    }

    /// `{id}.f0`, `{id}.mgc` and `{id}.bap` as raw binary
    fn process_wav(&self, id: &FileId, wav_dir: &Path) -> ProcessResult<()> {
        tracing::debug!(id = %id, "Processing waveform");

        let wav = self.wavs.load(&input_path(wav_dir, id, WAV_SUFFIX))?;
        let features = wav.extract_features()?;

        save_bin(&features.f0, &self.output_path(id, "f0"))?;
        save_bin(&features.mgc, &self.output_path(id, "mgc"))?;
        save_bin(&features.bap, &self.output_path(id, "bap"))?;

        tracing::info!(id = %id, frames = features.frame_count(), "Wrote vocoder features");
        Ok(())
    }

    fn output_path(&self, id: &FileId, extension: &str) -> PathBuf {
        self.out_dir.join(format!("{}.{}", id, extension))
    }
}

/// Frames by which label and vocoder streams may differ without a warning
///
/// Vocoder framing yields `n / hop + 1` frames, one more than a label
/// covering the same span.
const FRAME_COUNT_TOLERANCE: usize = 1;

fn frame_counts_disagree(label_frames: usize, vocoder_frames: usize) -> bool {
    label_frames.abs_diff(vocoder_frames) > FRAME_COUNT_TOLERANCE
}

fn input_path(dir: &Path, id: &FileId, suffix: &str) -> PathBuf {
    dir.join(format!("{}{}", id, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessError;
    use crate::label::LabelError;
    use crate::types::{FeatureMatrix, VocoderFeatures};
    use crate::vocoder::ExtractionError;
    use std::fs;
    use tempfile::TempDir;

    /// Label whose frame count is the number in the file
    struct CountLabel(usize);

    impl Label for CountLabel {
        fn binarize(&self, _context: &str) -> Result<FeatureMatrix, LabelError> {
            Ok(FeatureMatrix::from_vec(self.0, 2, vec![1.0; self.0 * 2]).unwrap())
        }

        fn count_frames(&self) -> usize {
            self.0
        }
    }

    struct CountLabelLoader;

    impl LabelLoader for CountLabelLoader {
        type Label = CountLabel;

        fn load(&self, path: &Path) -> Result<CountLabel, LabelError> {
            let content = fs::read_to_string(path).map_err(|source| LabelError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let frames = content.trim().parse().map_err(|_| LabelError::Parse {
                path: path.to_path_buf(),
                line: 1,
                reason: "not a number".to_string(),
            })?;
            Ok(CountLabel(frames))
        }
    }

    struct FixedWav(usize);

    impl Wav for FixedWav {
        fn extract_features(&self) -> Result<VocoderFeatures, ExtractionError> {
            Ok(VocoderFeatures {
                f0: FeatureMatrix::column(vec![100.0; self.0]),
                mgc: FeatureMatrix::from_vec(self.0, 3, vec![0.5; self.0 * 3]).unwrap(),
                bap: FeatureMatrix::from_vec(self.0, 1, vec![-20.0; self.0]).unwrap(),
            })
        }
    }

    struct FixedWavLoader;

    impl WavLoader for FixedWavLoader {
        type Wav = FixedWav;

        fn load(&self, path: &Path) -> Result<FixedWav, ExtractionError> {
            if !path.exists() {
                return Err(ExtractionError::Decode {
                    path: path.to_path_buf(),
                    reason: "missing".to_string(),
                });
            }
            Ok(FixedWav(4))
        }
    }

    fn setup(ids: &[&str]) -> (TempDir, PathBuf, PathBuf, PathBuf) {
        let root = TempDir::new().unwrap();
        let lab_dir = root.path().join("lab");
        let wav_dir = root.path().join("wav");
        let out_dir = root.path().join("out");
        fs::create_dir_all(&lab_dir).unwrap();
        fs::create_dir_all(&wav_dir).unwrap();
        for id in ids {
            fs::write(lab_dir.join(format!("{}.lab", id)), "4").unwrap();
            fs::write(wav_dir.join(format!("{}.wav", id)), b"RIFF").unwrap();
        }
        (root, lab_dir, wav_dir, out_dir)
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_combined_writes_one_archive_per_id() {
        let (_root, lab_dir, wav_dir, out_dir) = setup(&["a", "b"]);
        let processor = Processor::new(CountLabelLoader, FixedWavLoader, &out_dir);

        let summary = processor
            .run(&ProcessingMode::Combined { lab_dir, wav_dir }, None)
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.files_written, 2);
        assert_eq!(listing(&out_dir), vec!["a.proto", "b.proto"]);

        let archive = crate::file_io::load_proto(&out_dir.join("a.proto")).unwrap();
        assert_eq!(archive.duration, 4);
        assert_eq!(archive.lab.rows(), 4);
        assert_eq!(archive.mgc.cols(), 3);
    }

    #[test]
    fn test_edge_frame_difference_is_tolerated() {
        assert!(!frame_counts_disagree(40, 40));
        assert!(!frame_counts_disagree(40, 41));
        assert!(!frame_counts_disagree(41, 40));
        assert!(frame_counts_disagree(40, 42));
        assert!(frame_counts_disagree(10, 0));
    }

    #[test]
    fn test_label_only_writes_dur_and_lab() {
        let (_root, lab_dir, _wav_dir, out_dir) = setup(&["p"]);
        let processor = Processor::new(CountLabelLoader, FixedWavLoader, &out_dir);

        processor
            .run(&ProcessingMode::LabelOnly { lab_dir }, None)
            .unwrap();

        assert_eq!(listing(&out_dir), vec!["p.dur", "p.lab"]);
        assert_eq!(fs::read_to_string(out_dir.join("p.dur")).unwrap(), "4\n");
        assert_eq!(fs::read(out_dir.join("p.lab")).unwrap().len(), 4 * 2 * 4);
    }

    #[test]
    fn test_waveform_only_writes_three_streams() {
        let (_root, _lab_dir, wav_dir, out_dir) = setup(&["p"]);
        let processor = Processor::new(CountLabelLoader, FixedWavLoader, &out_dir);

        let summary = processor
            .run(&ProcessingMode::WaveformOnly { wav_dir }, None)
            .unwrap();

        assert_eq!(summary.files_written, 3);
        assert_eq!(listing(&out_dir), vec!["p.bap", "p.f0", "p.mgc"]);
        assert_eq!(fs::read(out_dir.join("p.mgc")).unwrap().len(), 4 * 3 * 4);
    }

    #[test]
    fn test_combined_rejects_mismatched_ids_before_writing() {
        let (_root, lab_dir, wav_dir, out_dir) = setup(&["a"]);
        fs::write(wav_dir.join("b.wav"), b"RIFF").unwrap();
        let processor = Processor::new(CountLabelLoader, FixedWavLoader, &out_dir);

        let err = processor
            .run(&ProcessingMode::Combined { lab_dir, wav_dir }, None)
            .unwrap_err();

        assert!(matches!(err, ProcessError::Config(_)));
        assert!(listing(&out_dir).is_empty());
    }

    #[test]
    fn test_failure_halts_batch_keeping_earlier_outputs() {
        let (_root, lab_dir, _wav_dir, out_dir) = setup(&["a", "c"]);
        fs::write(lab_dir.join("b.lab"), "not a count").unwrap();
        let processor = Processor::new(CountLabelLoader, FixedWavLoader, &out_dir);

        let err = processor
            .run(&ProcessingMode::LabelOnly { lab_dir }, None)
            .unwrap_err();

        assert!(matches!(err, ProcessError::Label(LabelError::Parse { .. })));
        assert_eq!(listing(&out_dir), vec!["a.dur", "a.lab"]);
    }

    #[test]
    fn test_id_list_restricts_and_orders() {
        let (root, lab_dir, _wav_dir, out_dir) = setup(&["a", "b", "c"]);
        let list = root.path().join("ids.txt");
        fs::write(&list, "c\na\n").unwrap();
        let processor = Processor::new(CountLabelLoader, FixedWavLoader, &out_dir);

        let summary = processor
            .run(&ProcessingMode::LabelOnly { lab_dir }, Some(&list))
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(listing(&out_dir), vec!["a.dur", "a.lab", "c.dur", "c.lab"]);
    }

    #[test]
    fn test_listed_id_without_input_fails() {
        let (root, _lab_dir, wav_dir, out_dir) = setup(&["a"]);
        let list = root.path().join("ids.txt");
        fs::write(&list, "a\nmissing\n").unwrap();
        let processor = Processor::new(CountLabelLoader, FixedWavLoader, &out_dir);

        let err = processor
            .run(&ProcessingMode::WaveformOnly { wav_dir }, Some(&list))
            .unwrap_err();

        assert!(matches!(
            err,
            ProcessError::Extraction(ExtractionError::Decode { .. })
        ));
    }
}
