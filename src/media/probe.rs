use std::path::{Path, PathBuf};

use crate::foundation::core::Canvas;
use crate::foundation::error::{GrisailleError, GrisailleResult};

#[derive(Clone, Debug)]
/// Basic metadata about a loaded source video.
///
/// Immutable once probed; loading a different file produces a new handle.
pub struct SourceInfo {
    /// Absolute source path used for decoding.
    pub source_path: PathBuf,
    /// Total duration in seconds.
    pub duration_secs: f64,
    /// Native pixel dimensions, when the container reports them.
    pub dimensions: Option<Canvas>,
}

/// Probe source video metadata through `ffprobe`.
pub fn probe_source(source_path: &Path) -> GrisailleResult<SourceInfo> {
    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| GrisailleError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(GrisailleError::media(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    parse_probe_output(source_path, &out.stdout)
}

/// Parse raw `ffprobe` JSON into a [`SourceInfo`].
///
/// Split from [`probe_source`] so malformed or partial probe output is
/// testable without the tool installed.
pub fn parse_probe_output(source_path: &Path, json: &[u8]) -> GrisailleResult<SourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| GrisailleError::media(format!("ffprobe json parse failed: {e}")))?;

    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| GrisailleError::media("no video stream found"))?;

    let duration_secs = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .ok_or_else(|| GrisailleError::media("missing duration from ffprobe"))?
        .parse::<f64>()
        .map_err(|e| GrisailleError::media(format!("unparsable duration from ffprobe: {e}")))?;
    if !duration_secs.is_finite() || duration_secs < 0.0 {
        return Err(GrisailleError::media(
            "ffprobe reported a negative or non-finite duration",
        ));
    }

    // Width and height may be absent for exotic streams; downstream sizing
    // falls back to a fixed canvas in that case.
    let dimensions = match (video_stream.width, video_stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            Some(Canvas { width, height })
        }
        _ => None,
    };

    Ok(SourceInfo {
        source_path: source_path.to_path_buf(),
        duration_secs,
        dimensions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GrisailleResult<SourceInfo> {
        parse_probe_output(Path::new("clip.mp4"), json.as_bytes())
    }

    #[test]
    fn full_probe_output_parses() {
        let info = parse(
            r#"{
                "streams": [
                    {"codec_type": "audio"},
                    {"codec_type": "video", "width": 1280, "height": 720}
                ],
                "format": {"duration": "12.480000"}
            }"#,
        )
        .unwrap();
        assert_eq!(info.duration_secs, 12.48);
        assert_eq!(
            info.dimensions,
            Some(Canvas {
                width: 1280,
                height: 720
            })
        );
    }

    #[test]
    fn missing_dimensions_are_tolerated() {
        let info = parse(
            r#"{
                "streams": [{"codec_type": "video"}],
                "format": {"duration": "1.0"}
            }"#,
        )
        .unwrap();
        assert_eq!(info.dimensions, None);
    }

    #[test]
    fn missing_video_stream_is_an_error() {
        let err = parse(r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "1"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("no video stream"));
    }

    #[test]
    fn missing_or_bad_duration_is_an_error() {
        assert!(
            parse(r#"{"streams": [{"codec_type": "video", "width": 2, "height": 2}]}"#).is_err()
        );
        let err = parse(
            r#"{
                "streams": [{"codec_type": "video", "width": 2, "height": 2}],
                "format": {"duration": "N/A"}
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duration"));
    }
}
