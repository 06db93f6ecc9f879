use image::codecs::jpeg::JpegEncoder;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Error, Result};

/// Input extensions picked up by [`list_jobs`].
const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Image container detected from leading bytes.
///
/// Use [`classify`] to sniff a buffer and [`ImageKind::mime_type`] to tag it
/// for the edit service.
///
/// # Example
///
/// ```rust
/// use dewatermark::pipeline::{classify, ImageKind};
///
/// assert_eq!(classify(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageKind::Jpeg);
/// assert_eq!(classify(b"GIF89a"), ImageKind::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Unknown,
}

impl ImageKind {
    /// MIME type to send to the edit service. Unknown data is sent as JPEG.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg | Self::Unknown => "image/jpeg",
        }
    }
}

/// Classify raw bytes by signature. Looks at no more than the first 8 bytes.
pub fn classify(bytes: &[u8]) -> ImageKind {
    if bytes.starts_with(&PNG_SIGNATURE) {
        ImageKind::Png
    } else if bytes.starts_with(&JPEG_SOI) {
        ImageKind::Jpeg
    } else {
        ImageKind::Unknown
    }
}

/// MIME type derived from a file name's extension.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Check if a file has a JPEG extension (case-insensitive).
fn is_jpeg_name(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| JPEG_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// List JPEG file names directly inside `dir`.
///
/// Not recursive; directories are skipped even when their name ends in `.jpg`.
/// Names come back in the order the filesystem reports them.
///
/// # Example
///
/// ```rust,no_run
/// use dewatermark::pipeline::list_jobs;
///
/// for name in list_jobs("input".as_ref()).unwrap() {
///     println!("{name}");
/// }
/// ```
pub fn list_jobs(dir: &Path) -> Result<Vec<String>> {
    // WalkDir yields a non-directory root at depth 0, which min_depth(1) would hide.
    std::fs::read_dir(dir).map_err(|e| Error::fs(dir, e))?;

    let mut names = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
    {
        let entry = match entry {
            Ok(entry) => entry,
            // Broken links and unreadable entries don't make the directory unreadable.
            Err(e) if e.path().is_some_and(|p| p != dir) => {
                log::warn!("Skipping unreadable entry: {e}");
                continue;
            }
            Err(e) => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                return Err(Error::fs(dir, source));
            }
        };

        if entry.file_type().is_file() && is_jpeg_name(entry.path()) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    Ok(names)
}

/// One input image and where its result goes.
#[derive(Debug, Clone)]
pub struct Job {
    pub file_name: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Original bytes, unchanged for the life of the job.
    pub original: Vec<u8>,
    /// MIME type of the original, from its extension.
    pub original_mime: &'static str,
}

impl Job {
    /// Read the original image for `file_name` from the configured input directory.
    pub fn load(config: &Config, file_name: &str) -> Result<Self> {
        let input_path = config.paths.input_dir.join(file_name);
        let output_path = config.paths.output_dir.join(file_name);
        let original = std::fs::read(&input_path).map_err(|e| Error::fs(&input_path, e))?;

        Ok(Self {
            file_name: file_name.to_string(),
            original_mime: mime_type_for(&input_path),
            input_path,
            output_path,
            original,
        })
    }
}

/// Decode any supported image and re-encode it as baseline JPEG.
///
/// Alpha is dropped; JPEG has no transparency.
pub fn reencode_to_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)?;
    let rgb = decoded.to_rgb8();

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(out)
}

/// Create the output directory if it does not exist yet.
pub fn ensure_output_dir(config: &Config) -> Result<()> {
    let dir = &config.paths.output_dir;
    std::fs::create_dir_all(dir).map_err(|e| Error::fs(dir, e))
}
