//! Segment concatenation with ffmpeg.

use crate::error::{PodgenError, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Container format of the merged episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Mp3,
    Wav,
    Ogg,
    Flac,
    M4a,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Wav => "wav",
            OutputFormat::Ogg => "ogg",
            OutputFormat::Flac => "flac",
            OutputFormat::M4a => "m4a",
        }
    }

    /// ffmpeg encoder arguments for this format.
    fn codec_args(&self) -> &'static [&'static str] {
        match self {
            OutputFormat::Mp3 => &["-codec:a", "libmp3lame", "-qscale:a", "2"],
            OutputFormat::Wav => &["-codec:a", "pcm_s16le"],
            OutputFormat::Ogg => &["-codec:a", "libvorbis", "-qscale:a", "5"],
            OutputFormat::Flac => &["-codec:a", "flac"],
            OutputFormat::M4a => &["-codec:a", "aac", "-b:a", "192k"],
        }
    }
}

impl FromStr for OutputFormat {
    type Err = PodgenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "mp3" => Ok(OutputFormat::Mp3),
            "wav" => Ok(OutputFormat::Wav),
            "ogg" => Ok(OutputFormat::Ogg),
            "flac" => Ok(OutputFormat::Flac),
            "m4a" => Ok(OutputFormat::M4a),
            other => Err(PodgenError::Config(format!(
                "Unsupported output format: {} (expected mp3, wav, ogg, flac or m4a)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Joins audio segments into one file.
#[async_trait]
pub trait AudioMerger: Send + Sync {
    /// Concatenate `segments` in order into `output`.
    async fn merge(&self, segments: &[PathBuf], output: &Path) -> Result<()>;
}

/// Merger backed by the ffmpeg concat demuxer.
pub struct FfmpegMerger {
    format: OutputFormat,
}

impl FfmpegMerger {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }
}

/// Body of a concat demuxer list file.
fn concat_list(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|path| {
            let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
            format!("file '{}'\n", path.to_string_lossy().replace('\'', r"'\''"))
        })
        .collect()
}

/// Concatenate `segments` in order into `output`, re-encoded as `format`.
///
/// Runs the ffmpeg concat demuxer over a list file written next to the
/// segments. A single segment still goes through ffmpeg. ffmpeg writes to a
/// temporary file beside `output` that replaces `output` only on success, so
/// a failed merge leaves any existing file at that path untouched.
#[instrument(skip(segments, format), fields(segments = segments.len(), format = %format))]
pub async fn merge_segments(segments: &[PathBuf], output: &Path, format: OutputFormat) -> Result<()> {
    if segments.is_empty() {
        return Err(PodgenError::AudioMerge("No segments to merge".to_string()));
    }

    let output_dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(output_dir)?;

    let list_dir = segments[0].parent().unwrap_or_else(|| Path::new("."));
    let mut list = tempfile::Builder::new()
        .prefix("concat_")
        .suffix(".txt")
        .tempfile_in(list_dir)?;
    list.write_all(concat_list(segments).as_bytes())?;
    list.flush()?;

    // ffmpeg picks the muxer from the extension
    let staged = tempfile::Builder::new()
        .prefix(".podgen_merge_")
        .suffix(&format!(".{}", format.extension()))
        .tempfile_in(output_dir)?
        .into_temp_path();

    debug!("Merging segments listed in {:?}", list.path());

    let result = Command::new("ffmpeg")
        .arg("-f").arg("concat")
        .arg("-safe").arg("0")
        .arg("-i").arg(list.path())
        .arg("-vn")
        .args(format.codec_args())
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(&*staged)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => {
            staged.persist(output).map_err(|e| PodgenError::Io(e.error))?;
            info!("Merged {} segments into {}", segments.len(), output.display());
            Ok(())
        }
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(PodgenError::AudioMerge(format!("ffmpeg concat failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PodgenError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(PodgenError::AudioMerge(format!("ffmpeg error: {e}"))),
    }
}

#[async_trait]
impl AudioMerger for FfmpegMerger {
    async fn merge(&self, segments: &[PathBuf], output: &Path) -> Result<()> {
        merge_segments(segments, output, self.format).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("mp3".parse::<OutputFormat>().unwrap(), OutputFormat::Mp3);
        assert_eq!(".WAV".parse::<OutputFormat>().unwrap(), OutputFormat::Wav);
        assert_eq!("m4a".parse::<OutputFormat>().unwrap().extension(), "m4a");
        assert!(matches!("aiff".parse::<OutputFormat>(), Err(PodgenError::Config(_))));
    }

    #[test]
    fn test_concat_list_quotes_paths() {
        let list = concat_list(&[
            PathBuf::from("/tmp/does-not-exist/000.mp3"),
            PathBuf::from("/tmp/it's here/001.mp3"),
        ]);
        assert_eq!(
            list,
            "file '/tmp/does-not-exist/000.mp3'\nfile '/tmp/it'\\''s here/001.mp3'\n"
        );
    }

    #[tokio::test]
    async fn test_merge_without_segments_fails() {
        let merger = FfmpegMerger::new(OutputFormat::Mp3);
        let result = merger.merge(&[], Path::new("out.mp3")).await;
        assert!(matches!(result, Err(PodgenError::AudioMerge(_))));
        assert!(!Path::new("out.mp3").exists());
    }

    #[tokio::test]
    async fn test_failed_merge_keeps_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let segment = dir.path().join("000.mp3");
        std::fs::write(&segment, "not audio").unwrap();
        let output = dir.path().join("episode.mp3");
        std::fs::write(&output, "last week's episode").unwrap();

        // Fails either because ffmpeg is missing or because the segment is not audio
        let result = merge_segments(&[segment], &output, OutputFormat::Mp3).await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "last week's episode");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(".podgen_merge_"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
