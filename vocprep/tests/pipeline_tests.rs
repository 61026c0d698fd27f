//! End-to-end runs of each processing mode over generated corpora

mod helpers;

use helpers::{read_f32, Corpus, ToneConfig};
use vocprep::file_io::load_proto;
use vocprep::{
    HtsLabelLoader, ProcessError, ProcessingMode, Processor, VocoderSettings, VocoderWavLoader,
};
use vocprep_common::config::{LabelConfig, VocoderConfig};

fn default_processor(corpus: &Corpus) -> Processor<HtsLabelLoader, VocoderWavLoader> {
    let labels = HtsLabelLoader::from_config(&LabelConfig::default(), 5.0).unwrap();
    let wavs = VocoderWavLoader::new(VocoderSettings::default());
    Processor::new(labels, wavs, &corpus.out_dir)
}

fn combined(corpus: &Corpus) -> ProcessingMode {
    ProcessingMode::from_dirs(Some(&corpus.lab_dir), Some(&corpus.wav_dir)).unwrap()
}

#[test]
fn test_combined_mode_writes_single_archive() {
    let corpus = Corpus::new().unwrap();
    corpus.add_label("p", 40).unwrap();
    corpus.add_wav("p", &ToneConfig::default()).unwrap();

    let summary = default_processor(&corpus)
        .run(&combined(&corpus), None)
        .unwrap();

    assert_eq!(summary.mode, "combined");
    assert_eq!(summary.processed, 1);
    assert_eq!(corpus.outputs(), vec!["p.proto"]);

    let archive = load_proto(&corpus.out_dir.join("p.proto")).unwrap();
    assert_eq!(archive.duration, 40);
    assert_eq!(archive.lab.rows(), 40);
    assert_eq!(archive.lab.cols(), 2);
    // 3200 samples at an 80 sample hop
    assert_eq!(archive.f0.rows(), 41);
    assert_eq!(archive.mgc.rows(), 41);
    assert_eq!(archive.mgc.cols(), 60);
    assert_eq!(archive.bap.rows(), 41);
}

#[test]
fn test_combined_mode_one_frame_label() {
    let corpus = Corpus::new().unwrap();
    corpus.add_label("p", 1).unwrap();
    corpus
        .add_wav(
            "p",
            &ToneConfig {
                duration_seconds: 0.005,
                ..Default::default()
            },
        )
        .unwrap();

    default_processor(&corpus)
        .run(&combined(&corpus), None)
        .unwrap();

    let archive = load_proto(&corpus.out_dir.join("p.proto")).unwrap();
    assert_eq!(archive.duration, 1);
    assert_eq!(archive.lab.rows(), 1);
    assert!(archive.f0.rows() > 0);
    assert!(archive.mgc.rows() > 0);
    assert!(archive.bap.rows() > 0);
}

#[test]
fn test_combined_mode_rejects_unpaired_ids() {
    let corpus = Corpus::new().unwrap();
    corpus.add_label("p", 10).unwrap();
    corpus.add_label("q", 10).unwrap();
    corpus.add_wav("p", &ToneConfig::default()).unwrap();
    corpus.add_wav("r", &ToneConfig::default()).unwrap();

    let err = default_processor(&corpus)
        .run(&combined(&corpus), None)
        .unwrap_err();

    match err {
        ProcessError::Config(message) => {
            assert!(message.starts_with("Please provide id_list"), "{}", message);
        }
        other => panic!("expected configuration error, got {:?}", other),
    }
    assert!(corpus.outputs().is_empty());
}

#[test]
fn test_id_list_pairs_subset_of_combined_inputs() {
    let corpus = Corpus::new().unwrap();
    for id in ["p", "q"] {
        corpus.add_label(id, 40).unwrap();
        corpus.add_wav(id, &ToneConfig::default()).unwrap();
    }
    // Extra waveform with no label is ignored when an id list is given
    corpus.add_wav("r", &ToneConfig::default()).unwrap();
    let list = corpus.write_file("ids.txt", "q\n\n# comment\np\n").unwrap();

    let summary = default_processor(&corpus)
        .run(&combined(&corpus), Some(&list))
        .unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(corpus.outputs(), vec!["p.proto", "q.proto"]);
}

#[test]
fn test_label_only_mode_writes_dur_and_lab() {
    let corpus = Corpus::new().unwrap();
    corpus.add_label("p", 40).unwrap();

    let mode = ProcessingMode::from_dirs(Some(&corpus.lab_dir), None).unwrap();
    default_processor(&corpus).run(&mode, None).unwrap();

    assert_eq!(corpus.outputs(), vec!["p.dur", "p.lab"]);
    let dur = std::fs::read_to_string(corpus.out_dir.join("p.dur")).unwrap();
    assert_eq!(dur.trim().parse::<usize>().unwrap(), 40);
    assert_eq!(read_f32(&corpus.out_dir.join("p.lab")).len(), 40 * 2);
}

#[test]
fn test_label_only_with_question_file() {
    let corpus = Corpus::new().unwrap();
    corpus.add_label("p", 4).unwrap();
    let questions = corpus
        .write_file("questions.hed", "QS \"C-a\" {*-a+*}\nQS \"R-sil\" {*+sil}\n")
        .unwrap();

    let config = LabelConfig {
        question_file: Some(questions),
        ..Default::default()
    };
    let labels = HtsLabelLoader::from_config(&config, 5.0).unwrap();
    let wavs = VocoderWavLoader::new(VocoderSettings::default());
    let processor = Processor::new(labels, wavs, &corpus.out_dir);

    let mode = ProcessingMode::from_dirs(Some(&corpus.lab_dir), None).unwrap();
    processor.run(&mode, None).unwrap();

    // Two questions + two phone position features per frame
    let values = read_f32(&corpus.out_dir.join("p.lab"));
    assert_eq!(values.len(), 4 * 4);
    // First phone "sil-a+b": C-a yes, R-sil no
    assert_eq!(&values[0..2], &[1.0, 0.0]);
    // Last phone "a-b+sil": C-a no, R-sil yes
    assert_eq!(&values[12..14], &[0.0, 1.0]);
}

#[test]
fn test_waveform_only_mode_writes_three_streams() {
    let corpus = Corpus::new().unwrap();
    corpus.add_wav("p", &ToneConfig::default()).unwrap();

    let mode = ProcessingMode::from_dirs(None, Some(&corpus.wav_dir)).unwrap();
    let summary = default_processor(&corpus).run(&mode, None).unwrap();

    assert_eq!(summary.files_written, 3);
    assert_eq!(corpus.outputs(), vec!["p.bap", "p.f0", "p.mgc"]);

    let f0 = read_f32(&corpus.out_dir.join("p.f0"));
    assert_eq!(f0.len(), 41);
    assert_eq!(read_f32(&corpus.out_dir.join("p.mgc")).len(), 41 * 60);
    assert_eq!(read_f32(&corpus.out_dir.join("p.bap")).len(), 41);

    for value in &f0[10..30] {
        assert!((value - 220.0).abs() < 5.0, "f0 {} far from 220 Hz", value);
    }
}

#[test]
fn test_waveform_only_resamples_stereo_input() {
    let corpus = Corpus::new().unwrap();
    corpus
        .add_wav(
            "p",
            &ToneConfig {
                sample_rate: 22050,
                channels: 2,
                ..Default::default()
            },
        )
        .unwrap();

    let config = VocoderConfig {
        sample_rate: Some(16000),
        ..Default::default()
    };
    let labels = HtsLabelLoader::from_config(&LabelConfig::default(), 5.0).unwrap();
    let wavs = VocoderWavLoader::new(VocoderSettings::from_config(&config, 5.0));
    let processor = Processor::new(labels, wavs, &corpus.out_dir);

    let mode = ProcessingMode::from_dirs(None, Some(&corpus.wav_dir)).unwrap();
    processor.run(&mode, None).unwrap();

    // About 3200 samples after resampling, 80 sample hop
    let frames = read_f32(&corpus.out_dir.join("p.f0")).len();
    assert!((35..=45).contains(&frames), "{} frames", frames);
    assert_eq!(read_f32(&corpus.out_dir.join("p.mgc")).len(), frames * 60);
}

#[test]
fn test_unreadable_waveform_halts_run() {
    let corpus = Corpus::new().unwrap();
    corpus.add_wav("a", &ToneConfig::default()).unwrap();
    std::fs::write(corpus.wav_dir.join("b.wav"), b"not a wave file").unwrap();
    corpus.add_wav("c", &ToneConfig::default()).unwrap();

    let mode = ProcessingMode::from_dirs(None, Some(&corpus.wav_dir)).unwrap();
    let err = default_processor(&corpus).run(&mode, None).unwrap_err();

    assert!(matches!(err, ProcessError::Extraction(_)));
    assert_eq!(corpus.outputs(), vec!["a.bap", "a.f0", "a.mgc"]);
}

#[test]
fn test_no_input_directories_rejected() {
    let err = ProcessingMode::from_dirs(None, None).unwrap_err();
    assert!(matches!(err, ProcessError::Config(_)));
}
