//! JPEG: frame dimensions, APP1 EXIF/XMP and APP13 IPTC.

use anyhow::{Result, anyhow};
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};

use super::iptc::{self, PHOTOSHOP_HEADER};
use super::{decode_or_log, exif, insert_dimensions, xmp};
use crate::tags::RawTags;

const MARKER_APP1: u8 = 0xE1;
const MARKER_APP13: u8 = 0xED;

const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

pub fn read(bytes: &[u8], tags: &mut RawTags) -> Result<()> {
    let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes)).map_err(|e| anyhow!("Failed to parse JPEG: {e}"))?;

    for segment in jpeg.segments() {
        let marker = segment.marker();
        let contents = segment.contents();

        if is_start_of_frame(marker) {
            if let Some((width, height)) = frame_dimensions(contents) {
                insert_dimensions(tags, width, height);
            }
        } else if marker == MARKER_APP1 {
            if let Some(packet) = contents.strip_prefix(XMP_HEADER) {
                decode_or_log("JPEG XMP", xmp::read_xmp(&xmp::packet_text(packet), tags));
            }
        } else if marker == MARKER_APP13 && contents.starts_with(PHOTOSHOP_HEADER) {
            decode_or_log("JPEG IPTC", iptc::read_iptc(contents, tags));
        }
    }

    if let Some(exif) = jpeg.exif() {
        decode_or_log("JPEG EXIF", exif::read_exif(&exif, tags));
    }

    Ok(())
}

/// SOF0..SOF15, minus DHT (C4), JPG (C8) and DAC (CC) which share the range.
fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

/// Frame header: precision, then height and width as big-endian u16.
fn frame_dimensions(contents: &[u8]) -> Option<(u64, u64)> {
    let height = u16::from_be_bytes([*contents.get(1)?, *contents.get(2)?]);
    let width = u16::from_be_bytes([*contents.get(3)?, *contents.get(4)?]);
    Some((width.into(), height.into()))
}
