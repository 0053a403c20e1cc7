//! Audio extraction through external tools: `ffmpeg` for local files and
//! `yt-dlp` for share links. Outputs land in a caller-provided directory.

use crate::error::ExtractionError;
use crate::{logi, logw};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Transcription endpoints reject uploads over 25 MB.
pub const MAX_AUDIO_MB: f64 = 24.0;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REFERER: &str = "https://www.douyin.com/";
const FFMPEG_FALLBACK_PATHS: &[&str] = &[
    "/usr/local/bin/ffmpeg",
    "/opt/homebrew/bin/ffmpeg",
    "/usr/bin/ffmpeg",
];

static URL_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"https?://(?:[-\w.]|(?:%[\da-fA-F]{2}))+[^\s]*").ok());

/// First http(s) link in pasted share text, or the text itself.
pub fn extract_url(text: &str) -> String {
    URL_RE
        .as_ref()
        .and_then(|re| re.find(text))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| text.trim().to_string())
}

async fn runs(program: &Path, arg: &str) -> bool {
    match Command::new(program).arg(arg).output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Locates an `ffmpeg` binary: `PATH` first, then common install locations.
pub async fn find_ffmpeg() -> Option<PathBuf> {
    let on_path = PathBuf::from("ffmpeg");
    if runs(&on_path, "-version").await {
        return Some(on_path);
    }
    for candidate in FFMPEG_FALLBACK_PATHS {
        let path = PathBuf::from(candidate);
        if path.exists() && runs(&path, "-version").await {
            return Some(path);
        }
    }
    None
}

pub async fn file_size_mb(path: &Path) -> f64 {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

/// Re-encodes a video's audio track to 16 kHz mono 64 kbps mp3 in `out_dir`.
pub async fn extract_audio(
    ffmpeg: &Path,
    video: &Path,
    out_dir: &Path,
) -> Result<PathBuf, ExtractionError> {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    let out_mp3 = out_dir.join(format!("{}.mp3", stem));

    logi(format!("Extracting audio from file: {}", video.display()));
    let output = Command::new(ffmpeg)
        .args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(video)
        .args([
            "-vn", "-acodec", "libmp3lame", "-ar", "16000", "-ac", "1", "-b:a", "64k", "-y",
        ])
        .arg(&out_mp3)
        .output()
        .await
        .map_err(|e| ExtractionError::AudioExtraction(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        logw(format!("ffmpeg failed: {}", stderr));
        return Err(ExtractionError::AudioExtraction(stderr));
    }
    if !out_mp3.exists() {
        return Err(ExtractionError::AudioExtraction("no output produced".to_string()));
    }
    Ok(out_mp3)
}

/// Downloads the audio of a share link as mp3 into `out_dir` with `yt-dlp`.
pub async fn download_audio(
    ffmpeg: &Path,
    share_text: &str,
    out_dir: &Path,
) -> Result<PathBuf, ExtractionError> {
    let url = extract_url(share_text);
    logi(format!("Downloading audio from: {}", url));

    let template = out_dir.join("%(id)s.%(ext)s");
    let mut cmd = Command::new("yt-dlp");
    cmd.args(["-f", "bestaudio/best", "-x", "--audio-format", "mp3", "--audio-quality", "192K"])
        .args(["--user-agent", USER_AGENT, "--referer", REFERER, "--no-check-certificate"])
        .args(["--print", "after_move:filepath", "-o"])
        .arg(&template);
    if let Some(dir) = ffmpeg.parent().filter(|d| !d.as_os_str().is_empty()) {
        cmd.arg("--ffmpeg-location").arg(dir);
    }
    let output = cmd
        .arg(&url)
        .output()
        .await
        .map_err(|e| ExtractionError::Download(format!("yt-dlp not runnable: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let last = stderr.lines().last().unwrap_or_default().trim().to_string();
        logw(format!("yt-dlp failed: {}", last));
        return Err(ExtractionError::Download(last));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .rev()
        .map(|line| PathBuf::from(line.trim()))
        .find(|path| path.is_file())
        .ok_or_else(|| ExtractionError::Download("yt-dlp reported no audio file".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulls_link_out_of_share_text() {
        let text = "7.89 复制打开抖音，看看【某某的作品】... https://v.douyin.com/k9k9k9/ ...";
        assert_eq!(extract_url(text), "https://v.douyin.com/k9k9k9/");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(extract_url("  not a link "), "not a link");
    }

    #[tokio::test]
    async fn missing_file_has_zero_size() {
        assert_eq!(file_size_mb(Path::new("/definitely/not/here.mp3")).await, 0.0);
    }
}
