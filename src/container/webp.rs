//! WebP: RIFF chunks for dimensions, EXIF and XMP.

use anyhow::{Result, anyhow};
use img_parts::webp::{CHUNK_VP8, CHUNK_VP8L, CHUNK_VP8X, CHUNK_XMP, WebP};
use img_parts::{Bytes, ImageEXIF};

use super::{decode_or_log, exif, insert_dimensions, xmp};
use crate::tags::RawTags;

const EXIF_PREFIX: &[u8] = b"Exif\0\0";

pub fn read(bytes: &[u8], tags: &mut RawTags) -> Result<()> {
    let webp = WebP::from_bytes(Bytes::copy_from_slice(bytes)).map_err(|e| anyhow!("Failed to parse WebP: {e}"))?;

    // `WebP::dimensions` reads the VP8X canvas at the wrong offset and panics
    // on a damaged VP8 header, so the frame headers are decoded here.
    let size = [CHUNK_VP8X, CHUNK_VP8, CHUNK_VP8L].into_iter().find_map(|id| {
        let data = webp.chunk_by_id(id)?.content().data()?;
        frame_dimensions(id, data)
    });
    if let Some((width, height)) = size {
        insert_dimensions(tags, width, height);
    }

    if let Some(packet) = webp.chunk_by_id(CHUNK_XMP).and_then(|chunk| chunk.content().data()) {
        decode_or_log("WebP XMP", xmp::read_xmp(&xmp::packet_text(packet), tags));
    }

    if let Some(exif) = webp.exif() {
        // Some writers keep the JPEG-style prefix inside the chunk.
        let tiff = exif.strip_prefix(EXIF_PREFIX).unwrap_or(&exif[..]);
        decode_or_log("WebP EXIF", exif::read_exif(tiff, tags));
    }

    Ok(())
}

/// Canvas or frame size from the body of a `VP8X`, `VP8 ` or `VP8L` chunk.
fn frame_dimensions(id: [u8; 4], data: &[u8]) -> Option<(u64, u64)> {
    match id {
        // Canvas width-1 and height-1 as 24-bit little-endian after 4 flag bytes.
        CHUNK_VP8X => {
            let d = data.get(4..10)?;
            let width = u32::from_le_bytes([d[0], d[1], d[2], 0]) + 1;
            let height = u32::from_le_bytes([d[3], d[4], d[5], 0]) + 1;
            Some((width.into(), height.into()))
        }
        // Lossy keyframe: 3-byte frame tag, start code, 14-bit sizes.
        CHUNK_VP8 => {
            let d = data.get(0..10)?;
            if d[0] & 1 != 0 || d[3..6] != [0x9D, 0x01, 0x2A] {
                return None;
            }
            let width = u16::from_le_bytes([d[6], d[7]]) & 0x3FFF;
            let height = u16::from_le_bytes([d[8], d[9]]) & 0x3FFF;
            Some((width.into(), height.into()))
        }
        // Lossless: signature byte, then 14-bit width-1 and height-1.
        CHUNK_VP8L => {
            let d = data.get(0..5)?;
            if d[0] != 0x2F {
                return None;
            }
            let bits = u32::from_le_bytes([d[1], d[2], d[3], d[4]]);
            let width = (bits & 0x3FFF) + 1;
            let height = ((bits >> 14) & 0x3FFF) + 1;
            Some((width.into(), height.into()))
        }
        _ => None,
    }
}
