//! ffmpeg/ffprobe sidecar processes.
//!
//! Video decode and media probing are delegated to the system `ffmpeg` and
//! `ffprobe` binaries. A missing sidecar surfaces as an
//! [`ExtractError::Sidecar`], which the pipeline boundary turns into a
//! degraded (but successful) ingest.

use omnivault_core::ExtractError;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Stream and container facts probed from a media file.
#[derive(Debug, Clone, Default)]
pub struct MediaProbe {
    pub duration_s: Option<f64>,
    pub fps: Option<f64>,
    pub frame_count: Option<u64>,
}

/// Run `ffprobe` and parse duration plus (when a video stream exists) frame
/// rate and frame count.
pub async fn probe_media(path: &Path) -> Result<MediaProbe, ExtractError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=avg_frame_rate,nb_frames",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| ExtractError::Sidecar(format!("ffprobe not runnable: {e}")))?;

    if !output.status.success() {
        return Err(ExtractError::Sidecar(format!(
            "ffprobe exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let value: serde_json::Value = serde_json::from_slice(&output.stdout)
        .map_err(|e| ExtractError::Sidecar(format!("ffprobe output unparsable: {e}")))?;

    let mut probe = MediaProbe::default();

    if let Some(duration) = value
        .pointer("/format/duration")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<f64>().ok())
    {
        probe.duration_s = Some(duration);
    }

    if let Some(stream) = value.pointer("/streams/0") {
        probe.fps = stream
            .get("avg_frame_rate")
            .and_then(|v| v.as_str())
            .and_then(parse_rational);
        probe.frame_count = stream
            .get("nb_frames")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<u64>().ok());
    }

    debug!("Probed {:?}: {:?}", path, probe);
    Ok(probe)
}

/// Dump `count` frames, evenly spread over `duration_s` seconds, as PNGs
/// into `out_dir`. Returns the frame paths in temporal order.
pub async fn sample_frames(
    path: &Path,
    count: usize,
    duration_s: f64,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, ExtractError> {
    if count == 0 || duration_s <= 0.0 {
        return Ok(vec![]);
    }

    let out_fps = count as f64 / duration_s;
    let pattern = out_dir.join("frame_%05d.png");

    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args(["-vf", &format!("fps={out_fps}")])
        .args(["-frames:v", &count.to_string()])
        .arg(&pattern)
        .output()
        .await
        .map_err(|e| ExtractError::Sidecar(format!("ffmpeg not runnable: {e}")))?;

    if !output.status.success() {
        return Err(ExtractError::Sidecar(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let mut frames: Vec<PathBuf> = std::fs::read_dir(out_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|e| e == "png"))
        .collect();
    frames.sort();
    Ok(frames)
}

/// Parse an ffprobe rational like `"30000/1001"` (or `"25"`).
fn parse_rational(s: &str) -> Option<f64> {
    match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => s.parse().ok(),
    }
}
