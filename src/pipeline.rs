use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ScanConfig;
use crate::container;
use crate::metadata::{ParsedMetadata, parse_metadata};
use crate::tags::RawTags;

/// Supported image extensions.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "tif", "tiff"];

/// Container format of an image.
///
/// Detection from bytes ([`ImageKind::from_bytes`]) is what the reader
/// trusts; the extension ([`ImageKind::from_path`]) is only used to pick
/// candidate files while scanning folders.
///
/// # Example
///
/// ```rust
/// use sd_meta::pipeline::ImageKind;
/// use std::path::Path;
///
/// let kind = ImageKind::from_path(Path::new("render.PNG"));
/// assert_eq!(kind, Some(ImageKind::Png));
///
/// let kind = ImageKind::from_bytes(b"\xFF\xD8\xFF\xE0");
/// assert_eq!(kind, Some(ImageKind::Jpeg));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageKind {
    /// PNG — tEXt/zTXt/iTXt chunks, eXIf
    Png,
    /// JPEG — EXIF, XMP and IPTC segments
    Jpeg,
    /// WebP — EXIF and XMP in RIFF chunks
    WebP,
    /// TIFF — the file itself is an EXIF structure
    Tiff,
}

impl ImageKind {
    /// Determine the image kind from a file path extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    /// Determine the image kind from its leading magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::WebP)
        } else if bytes.starts_with(b"II\x2a\x00") || bytes.starts_with(b"MM\x00\x2a") {
            Some(Self::Tiff)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Tiff => "image/tiff",
        }
    }
}

/// Everything read from one image: its raw tags and the parsed record.
#[derive(Debug, Clone)]
pub struct ImageReport {
    pub path: PathBuf,
    pub kind: ImageKind,
    pub tags: RawTags,
    pub metadata: ParsedMetadata,
}

/// Read and parse one image, keeping the raw tags alongside the result.
///
/// Unlike [`read_metadata`], failures are returned to the caller.
pub fn read_image(path: &Path) -> Result<ImageReport> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let kind = ImageKind::from_bytes(&bytes)
        .with_context(|| format!("Unrecognised image format: {}", path.display()))?;
    let tags = container::read_tags_from_bytes(&bytes)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let metadata = parse_metadata(&tags);

    Ok(ImageReport {
        path: path.to_path_buf(),
        kind,
        tags,
        metadata,
    })
}

/// Read the metadata of the image at `path`.
///
/// This is the main entry point for the library. Any failure (missing file,
/// unknown format, corrupt container) is logged and collapses to `None`;
/// this function never panics or returns an error.
///
/// # Example
///
/// ```rust,no_run
/// use sd_meta::read_metadata;
/// use std::path::Path;
///
/// if let Some(metadata) = read_metadata(Path::new("render.png")) {
///     if let Some(ai) = &metadata.ai {
///         println!("{}", serde_json::to_string_pretty(ai).unwrap());
///     }
/// }
/// ```
pub fn read_metadata(path: &Path) -> Option<ParsedMetadata> {
    match read_image(path) {
        Ok(report) => Some(report.metadata),
        Err(e) => {
            log::error!("Failed to read metadata from {}: {e:#}", path.display());
            None
        }
    }
}

/// [`read_metadata`] for an image already in memory.
pub fn read_metadata_from_bytes(bytes: &[u8]) -> Option<ParsedMetadata> {
    match container::read_tags_from_bytes(bytes) {
        Ok(tags) => Some(parse_metadata(&tags)),
        Err(e) => {
            log::error!("Failed to read metadata: {e:#}");
            None
        }
    }
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// according to `scan` (recursion, symlinks). Only files with supported
/// image extensions are included.
///
/// # Example
///
/// ```rust,no_run
/// use sd_meta::config::ScanConfig;
/// use sd_meta::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(
///     &[
///         PathBuf::from("render.png"),   // single file
///         PathBuf::from("./outputs/"),   // entire directory
///     ],
///     &ScanConfig::default(),
/// );
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf], scan: &ScanConfig) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            let mut walker = WalkDir::new(path).follow_links(scan.follow_links).sort_by_file_name();
            if !scan.recursive {
                walker = walker.max_depth(1);
            }
            for entry in walker.into_iter().filter_map(|e| e.ok()) {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
