use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tokio::process::Command;

use super::process::run_bounded;
use crate::error::TranscodeError;

const SHOW_ARGS: &[&str] = &["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    #[serde(default, rename = "codec_name")]
    pub codec: String,
    #[serde(default, rename = "codec_type")]
    pub kind: String,
    #[serde(default, rename = "r_frame_rate")]
    pub frame_rate: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub bit_rate: i64,
    #[serde(default)]
    pub channels: i64,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeFormat {
    #[serde(default, rename = "format_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_float")]
    pub duration: f64,
    #[serde(default, deserialize_with = "lenient_int")]
    pub bit_rate: i64,
}

/// The subset of `ffprobe -show_format -show_streams` output used for
/// preset selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub format: ProbeFormat,
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
}

impl ProbeReport {
    /// The audio and video streams of a file holding exactly one of each.
    pub fn audio_video(&self) -> Option<(&ProbeStream, &ProbeStream)> {
        match self.streams.as_slice() {
            [a, v] if a.kind == "audio" && v.kind == "video" => Some((a, v)),
            [v, a] if a.kind == "audio" && v.kind == "video" => Some((a, v)),
            _ => None,
        }
    }
}

// ffprobe prints most numbers as JSON strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(value) => value,
        NumberOrString::Float(value) => value as i64,
        NumberOrString::Text(text) => text.trim().parse().unwrap_or(0),
    })
}

fn lenient_float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Int(value) => value as f64,
        NumberOrString::Float(value) => value,
        NumberOrString::Text(text) => text.trim().parse().unwrap_or(0.0),
    })
}

/// ffprobe wrapper.
#[derive(Debug, Clone)]
pub struct FfProbe {
    ffprobe_path: String,
    timeout: Duration,
}

impl FfProbe {
    pub fn new(ffprobe_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    /// Raw JSON description of `source`.
    pub async fn show_format(&self, source: &Path) -> Result<serde_json::Value, TranscodeError> {
        let raw = self.run(source).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub async fn probe(&self, source: &Path) -> Result<ProbeReport, TranscodeError> {
        let raw = self.run(source).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn run(&self, source: &Path) -> Result<Vec<u8>, TranscodeError> {
        let mut cmd = Command::new(&self.ffprobe_path);
        cmd.args(SHOW_ARGS).arg(source);
        let finished = run_bounded(cmd, &self.ffprobe_path, self.timeout).await;
        match finished.error {
            Some(err) => Err(err),
            None => Ok(finished.stdout),
        }
    }
}
