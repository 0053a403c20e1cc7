use std::path::PathBuf;

/// Failures of the project history store.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Corrupt project record {path}: {source}")]
    CorruptRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("History I/O failed on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode project {id}: {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl HistoryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures reported by a generation backend.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Authentication failed ({status}): {message}. Check the API key and base URL.")]
    Authentication { status: u16, message: String },

    #[error("LLM API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM response had no message content")]
    EmptyResponse,
}

impl GenerationError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

/// Failures while turning an input into story text. Every message carries the
/// `Error:` marker so it is never mistaken for story content.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Error: FFmpeg not found in PATH. Install it first (macOS: brew install ffmpeg).")]
    FfmpegMissing,

    #[error("Error: input file not found: {0}")]
    MissingFile(PathBuf),

    #[error("Error: failed to read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Error: unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Error: download failed. Check that the link is valid and the network is reachable. ({0})")]
    Download(String),

    #[error("Error: failed to extract audio from file. ({0})")]
    AudioExtraction(String),

    #[error("Error: extracted audio is too large ({size_mb:.1}MB), over the 25MB transcription limit. Upload a shorter clip.")]
    AudioTooLarge { size_mb: f64 },

    #[error("Error: transcription failed: {0}")]
    Transcription(String),

    #[error("Error: no text was extracted from the input.")]
    Empty,
}

/// Failures of a session operation. The session state passed in is left
/// untouched whenever one of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("The series outline has not been generated yet")]
    MissingOutline,

    #[error("Episode {0} is outside the 1-10 series range")]
    EpisodeOutOfRange(u32),
}
