use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::errors::{Result, ScoutError};

const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Where the clip's bytes live.
#[derive(Debug, Clone)]
pub enum VideoSource {
    /// Already in memory (e.g. handed over by a file picker).
    Bytes(Arc<[u8]>),
    /// On disk; read in full when the analysis starts.
    Path(PathBuf),
}

/// A clip selected by the user, plus the media type it was declared with.
#[derive(Debug, Clone)]
pub struct VideoFile {
    pub name: String,
    /// e.g. `video/mp4`.
    pub media_type: String,
    pub source: VideoSource,
}

impl VideoFile {
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            media_type: media_type.into(),
            source: VideoSource::Bytes(Arc::from(bytes)),
        }
    }

    /// Reference a file on disk. Nothing is read yet; the media type is
    /// guessed from the extension.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video.mp4".to_string());

        Self {
            name,
            media_type: guess_media_type(path).to_string(),
            source: VideoSource::Path(path.to_path_buf()),
        }
    }

    pub fn is_video(&self) -> bool {
        is_video_media_type(&self.media_type)
    }

    /// Read the whole clip into memory.
    pub async fn read(&self) -> Result<Vec<u8>> {
        match &self.source {
            VideoSource::Bytes(bytes) => Ok(bytes.to_vec()),
            VideoSource::Path(path) => Ok(tokio::fs::read(path).await?),
        }
    }
}

/// Lowercased `type/subtype` with surrounding whitespace and any
/// `;`-parameters removed, e.g. ` Video/MP4; codecs=avc1` becomes `video/mp4`.
pub fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `true` if the declared media type is in the `video/*` family.
pub fn is_video_media_type(media_type: &str) -> bool {
    normalize_media_type(media_type).starts_with("video/")
}

/// Map a file extension to a video media type, or `application/octet-stream`.
pub fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "3gp" => "video/3gpp",
        "mpeg" | "mpg" => "video/mpeg",
        _ => FALLBACK_MEDIA_TYPE,
    }
}

/// A clip as base64 text plus its media type, ready for a JSON request body.
///
/// Not `Clone`: a payload is built for exactly one analysis request.
#[derive(PartialEq, Eq)]
pub struct EncodedPayload {
    /// Standard-alphabet, padded base64. No `data:` prefix.
    pub data: String,
    pub mime_type: String,
}

impl EncodedPayload {
    /// The media type is normalized with [`normalize_media_type`].
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        Self {
            data: STANDARD.encode(bytes),
            mime_type: normalize_media_type(mime_type),
        }
    }

    /// Build a payload from a `data:<mime>;base64,<body>` URI.
    ///
    /// Returns [`ScoutError::Validation`] if `uri` is not in that form.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let (mime_type, body) = split_data_uri(uri)
            .ok_or_else(|| ScoutError::Validation("malformed base64 data URI".into()))?;

        Ok(Self {
            data: body.to_string(),
            mime_type: normalize_media_type(mime_type),
        })
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Size of the original clip in bytes.
    pub fn decoded_len(&self) -> usize {
        let padding = self.data.bytes().rev().take_while(|&b| b == b'=').count();
        (self.data.len() / 4 * 3).saturating_sub(padding)
    }
}

impl fmt::Debug for EncodedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedPayload")
            .field("mime_type", &self.mime_type)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Drop a leading `data:<mime>;base64,` if present. Anything else,
/// including a non-base64 data URI, comes back unchanged.
pub fn strip_data_uri_prefix(text: &str) -> &str {
    split_data_uri(text).map_or(text, |(_, body)| body)
}

/// Split `data:<mime>;base64,<body>` into `(mime, body)`.
fn split_data_uri(text: &str) -> Option<(&str, &str)> {
    let (header, body) = text.strip_prefix("data:")?.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    Some((mime_type, body))
}

/// Read the whole clip and encode it.
///
/// # Errors
///
/// [`ScoutError::Io`](crate::ScoutError::Io) if the file vanished or cannot be read.
pub async fn encode(file: &VideoFile) -> Result<EncodedPayload> {
    let bytes = file.read().await?;
    tracing::debug!(file = %file.name, bytes = bytes.len(), "encoding clip");
    Ok(EncodedPayload::from_bytes(&bytes, &file.media_type))
}

/// Read `reader` to the end, then encode.
pub async fn encode_reader<R>(mut reader: R, media_type: &str) -> Result<EncodedPayload>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    Ok(EncodedPayload::from_bytes(&bytes, media_type))
}
