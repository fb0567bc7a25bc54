use std::path::Path;

use serde::{Deserialize, Serialize};

use super::probe::{FfProbe, ProbeReport};
use crate::error::TranscodeError;

const WMV_PRESET: &str = "-c:v libx264 -profile:v main -preset fast -b:v 128k -c:a libfdk_aac -b:a 48k";
const FLV_PRESET: &str = "-c:v libx264 -profile:v main -preset fast -b:v 256k -c:a libfdk_aac -b:a 48k";

/// How encoder parameters are chosen for a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetMode {
    /// Bitrate tiers derived from an ffprobe run.
    #[default]
    Probe,
    /// Fixed presets keyed by file extension.
    Extension,
}

/// Encoder parameters matched to the source's stream properties, or `None`
/// unless the source has exactly one audio and one video stream.
pub fn select_preset(report: &ProbeReport) -> Option<String> {
    let (audio, video) = report.audio_video()?;

    let audio_kbps = if audio.channels == 1 {
        match audio.bit_rate {
            rate if rate < 40_000 => 32,
            rate if rate < 62_000 => 48,
            _ => 64,
        }
    } else if audio.bit_rate > 90_000 {
        96
    } else {
        64
    };

    let video_rate = match video.bit_rate {
        0 => report.format.bit_rate.saturating_sub(audio.bit_rate),
        rate => rate,
    };
    let video_kbps = match video_rate {
        rate if rate < 180_000 => 128,
        rate if rate > 600_000 => 512,
        rate if rate > 400_000 => 384,
        _ => 256,
    };

    let vsync = if video.frame_rate == "1000/1" {
        " -vsync vfr"
    } else {
        ""
    };

    Some(format!(
        "-c:v libx264 -profile:v main -preset fast -b:v {video_kbps}k{vsync} -c:a libfdk_aac -b:a {audio_kbps}k"
    ))
}

pub fn preset_by_extension(source: &Path) -> Option<&'static str> {
    match source.extension()?.to_str()? {
        "wmv" | "WMV" => Some(WMV_PRESET),
        "flv" | "FLV" => Some(FLV_PRESET),
        _ => None,
    }
}

/// Picks the preset for `source` according to `mode`.
pub async fn choose_preset(
    mode: PresetMode,
    probe: &FfProbe,
    source: &Path,
) -> Result<String, TranscodeError> {
    let preset = match mode {
        PresetMode::Extension => preset_by_extension(source).map(str::to_string),
        PresetMode::Probe => select_preset(&probe.probe(source).await?),
    };
    preset.ok_or_else(|| TranscodeError::NoPreset(source.display().to_string()))
}
