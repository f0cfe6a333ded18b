//! Image container parsing: raw tags out of PNG, JPEG, WebP and TIFF files.
//!
//! - [`read_tags`] / [`read_tags_from_bytes`] — detect the format from the
//!   magic bytes and collect every tag the reader understands into a
//!   [`RawTags`]
//!
//! Each format module knows where its container hides metadata; the payload
//! decoders ([`exif`], [`iptc`], [`xmp`]) are shared between formats.

pub mod exif;
pub mod iptc;
pub mod jpeg;
pub mod png;
pub mod webp;
pub mod xmp;

#[cfg(test)]
pub(crate) mod testdata;

use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::pipeline::ImageKind;
use crate::tags::{RawTags, Tag, TagGroup, TagSource};

/// Read every recognised tag from the image at `path`.
pub fn read_tags(path: &Path) -> Result<RawTags> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    read_tags_from_bytes(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Read every recognised tag from an in-memory image.
///
/// Fails only when the bytes are not a supported container. A damaged
/// metadata block inside a valid container is logged and skipped.
pub fn read_tags_from_bytes(bytes: &[u8]) -> Result<RawTags> {
    let Some(kind) = ImageKind::from_bytes(bytes) else {
        bail!("Unrecognised image format");
    };

    let mut tags = RawTags::new();
    match kind {
        ImageKind::Png => png::read(bytes, &mut tags)?,
        ImageKind::Jpeg => jpeg::read(bytes, &mut tags)?,
        ImageKind::WebP => webp::read(bytes, &mut tags)?,
        ImageKind::Tiff => read_tiff(bytes, &mut tags)?,
    }

    log::debug!("Read {} tags from {kind:?} image", tags.len());
    Ok(tags)
}

/// A TIFF file is its own EXIF block; its dimensions live in IFD0.
fn read_tiff(bytes: &[u8], tags: &mut RawTags) -> Result<()> {
    exif::read_exif(bytes, tags)?;

    let width = tags.get_number(TagGroup::Exif, "ImageWidth");
    let height = tags.get_number(TagGroup::Exif, "ImageHeight");
    if let (Some(width), Some(height)) = (width, height) {
        insert_dimensions(tags, width, height);
    }
    Ok(())
}

/// Insert `Image Width` / `Image Height` file tags. A zero side means the
/// header is bogus, so nothing is recorded.
pub(crate) fn insert_dimensions(tags: &mut RawTags, width: u64, height: u64) {
    if width == 0 || height == 0 {
        log::debug!("Ignoring {width}x{height} image header");
        return;
    }
    tags.insert(TagGroup::File, "Image Width", Tag::number(width));
    tags.insert(TagGroup::File, "Image Height", Tag::number(height));
}

/// Run a payload decoder, logging rather than propagating its failure so one
/// bad block does not hide the rest of the file.
pub(crate) fn decode_or_log(what: &str, result: Result<()>) {
    if let Err(e) = result {
        log::debug!("Skipping unreadable {what} block: {e:#}");
    }
}
