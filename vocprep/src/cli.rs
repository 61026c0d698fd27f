//! Command-line arguments
//!
//! Flags keep the snake_case spelling of the preprocessing scripts this tool
//! replaces (`--lab_dir`, not `--lab-dir`). Values given here override the
//! TOML config; `VOCPREP_CONFIG` and `VOCPREP_LOG` are resolved by
//! [`vocprep_common::config`].

use std::path::PathBuf;

use clap::Parser;
use vocprep_common::config::TomlConfig;

/// Command-line arguments for vocprep
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "vocprep")]
#[command(about = "Convert alignment labels and waveforms into synthesizer training features")]
#[command(version)]
pub struct Args {
    /// Directory of `{id}.lab` alignment labels
    #[arg(long = "lab_dir", value_name = "DIR")]
    pub lab_dir: Option<PathBuf>,

    /// Directory of `{id}.wav` waveforms
    #[arg(long = "wav_dir", value_name = "DIR")]
    pub wav_dir: Option<PathBuf>,

    /// Newline-delimited ids to process instead of scanning the input directories
    #[arg(long = "id_list", value_name = "FILE")]
    pub id_list: Option<PathBuf>,

    /// Output directory, created if missing
    #[arg(long = "out_dir", value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Labels are state-level aligned
    #[arg(long = "state_level")]
    pub state_level: bool,

    /// HTS question file for label binarization
    #[arg(long = "question_file", value_name = "FILE")]
    pub question_file: Option<PathBuf>,

    /// Frame shift in milliseconds
    #[arg(long = "frame_shift_ms", value_name = "MS")]
    pub frame_shift_ms: Option<f64>,

    /// Resample waveforms to this rate before analysis
    #[arg(long = "sample_rate", value_name = "HZ")]
    pub sample_rate: Option<u32>,

    /// TOML config file (default: $VOCPREP_CONFIG, then ~/.config/vocprep/config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (default: $VOCPREP_LOG, then config)
    #[arg(long = "log_level", value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Args {
    /// Apply command-line values over the loaded config
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if self.state_level {
            config.label.state_level = true;
        }
        if let Some(path) = &self.question_file {
            config.label.question_file = Some(path.clone());
        }
        if let Some(shift) = self.frame_shift_ms {
            config.frame_shift_ms = shift;
        }
        if let Some(rate) = self.sample_rate {
            config.vocoder.sample_rate = Some(rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case_flags() {
        let args = Args::try_parse_from([
            "vocprep",
            "--lab_dir",
            "labs",
            "--wav_dir",
            "wavs",
            "--id_list",
            "ids.txt",
            "--out_dir",
            "out",
            "--state_level",
        ])
        .unwrap();

        assert_eq!(args.lab_dir, Some(PathBuf::from("labs")));
        assert_eq!(args.wav_dir, Some(PathBuf::from("wavs")));
        assert_eq!(args.id_list, Some(PathBuf::from("ids.txt")));
        assert_eq!(args.out_dir, PathBuf::from("out"));
        assert!(args.state_level);
    }

    #[test]
    fn test_out_dir_required() {
        assert!(Args::try_parse_from(["vocprep", "--lab_dir", "labs"]).is_err());
    }

    #[test]
    fn test_overrides_win_over_config() {
        let args = Args::try_parse_from([
            "vocprep",
            "--out_dir",
            "out",
            "--frame_shift_ms",
            "10",
            "--sample_rate",
            "22050",
            "--question_file",
            "qs.hed",
        ])
        .unwrap();

        let mut config = TomlConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.frame_shift_ms, 10.0);
        assert_eq!(config.vocoder.sample_rate, Some(22050));
        assert_eq!(config.label.question_file, Some(PathBuf::from("qs.hed")));
        assert!(!config.label.state_level);
    }

    #[test]
    fn test_override_replaces_invalid_file_value_before_validation() {
        let args =
            Args::try_parse_from(["vocprep", "--out_dir", "out", "--frame_shift_ms", "5"]).unwrap();

        let mut config = TomlConfig::parse("frame_shift_ms = 0.0\n").unwrap();
        assert!(config.validate().is_err());

        args.apply_overrides(&mut config);
        config.validate().unwrap();
        assert_eq!(config.frame_shift_ms, 5.0);
    }
}
