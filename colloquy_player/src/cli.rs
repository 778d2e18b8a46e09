use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Headless player that steps a conversation topic frame by frame",
    version
)]
pub struct Args {
    /// Conversation document (JSON)
    #[arg(long)]
    pub conversation: PathBuf,

    /// File id holding the topic; any file when omitted
    #[arg(long)]
    pub file: Option<String>,

    /// Topic id to play
    #[arg(long)]
    pub topic: String,

    /// Simulated frames per second
    #[arg(long, default_value_t = 30)]
    pub frame_rate: u32,

    /// Stop stepping after this many simulated seconds
    #[arg(long, default_value_t = 120.0)]
    pub max_seconds: f32,

    /// Skip through actor speech instead of waiting it out
    #[arg(long)]
    pub fast_forward: bool,

    /// Hold command actions until the player acknowledges them
    #[arg(long)]
    pub no_auto_advance: bool,

    /// Option indices picked at successive player choices (default: first option)
    #[arg(long, value_delimiter = ',')]
    pub choices: Vec<usize>,

    /// Playback options JSON (auto_advance_commands, fast_forward_step, ...)
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Path to write the playback event log as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Print every playback event
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct PlayArgs {
    pub conversation: PathBuf,
    pub file: Option<String>,
    pub topic: String,
    pub frame_rate: u32,
    pub max_seconds: f32,
    pub fast_forward: bool,
    pub no_auto_advance: bool,
    pub choices: Vec<usize>,
    pub options: Option<PathBuf>,
    pub event_log_json: Option<PathBuf>,
    pub verbose: bool,
}

pub fn parse() -> Result<PlayArgs> {
    Args::parse().into_play_args()
}

impl Args {
    fn into_play_args(self) -> Result<PlayArgs> {
        if self.frame_rate == 0 {
            bail!("--frame-rate must be positive");
        }
        if !(self.max_seconds > 0.0) {
            bail!("--max-seconds must be positive (got {})", self.max_seconds);
        }
        if self.topic.trim().is_empty() {
            bail!("--topic must not be empty");
        }

        Ok(PlayArgs {
            conversation: self.conversation,
            file: self.file.filter(|file| !file.is_empty()),
            topic: self.topic,
            frame_rate: self.frame_rate,
            max_seconds: self.max_seconds,
            fast_forward: self.fast_forward,
            no_auto_advance: self.no_auto_advance,
            choices: self.choices,
            options: self.options,
            event_log_json: self.event_log_json,
            verbose: self.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_from(args: &[&str]) -> Result<PlayArgs> {
        let mut argv = vec!["colloquy_player"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv)?.into_play_args()
    }

    #[test]
    fn defaults_apply() {
        let args = parse_from(&["--conversation", "talk.json", "--topic", "intro"]).unwrap();
        assert_eq!(args.frame_rate, 30);
        assert_eq!(args.max_seconds, 120.0);
        assert!(args.file.is_none());
        assert!(args.choices.is_empty());
    }

    #[test]
    fn choices_split_on_commas() {
        let args = parse_from(&[
            "--conversation",
            "talk.json",
            "--topic",
            "intro",
            "--choices",
            "1,0,2",
        ])
        .unwrap();
        assert_eq!(args.choices, vec![1, 0, 2]);
    }

    #[test]
    fn zero_frame_rate_is_rejected() {
        let err = parse_from(&[
            "--conversation",
            "talk.json",
            "--topic",
            "intro",
            "--frame-rate",
            "0",
        ])
        .expect_err("zero frame rate must fail");
        assert!(err.to_string().contains("--frame-rate"));
    }
}
