//! PNG: textual chunks, `IHDR` dimensions, `eXIf` and embedded XMP.

use anyhow::{Result, anyhow, bail};
use flate2::read::ZlibDecoder;
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF};
use std::io::Read;

use super::{decode_or_log, exif, insert_dimensions, xmp};
use crate::tags::{RawTags, Tag, TagGroup};

const CHUNK_IHDR: [u8; 4] = *b"IHDR";
const CHUNK_TEXT: [u8; 4] = *b"tEXt";
const CHUNK_ZTXT: [u8; 4] = *b"zTXt";
const CHUNK_ITXT: [u8; 4] = *b"iTXt";

/// iTXt keyword Adobe uses for an XMP packet.
const XMP_KEYWORD: &str = "XML:com.adobe.xmp";

pub fn read(bytes: &[u8], tags: &mut RawTags) -> Result<()> {
    let png = Png::from_bytes(Bytes::copy_from_slice(bytes)).map_err(|e| anyhow!("Failed to parse PNG: {e}"))?;

    for chunk in png.chunks() {
        let contents = chunk.contents();
        let decoded = match chunk.kind() {
            CHUNK_IHDR => {
                if let Some((width, height)) = header_dimensions(contents) {
                    insert_dimensions(tags, width, height);
                }
                continue;
            }
            CHUNK_TEXT => decode_text(contents),
            CHUNK_ZTXT => decode_ztxt(contents),
            CHUNK_ITXT => decode_itxt(contents),
            _ => continue,
        };

        match decoded {
            Ok((keyword, text)) if keyword == XMP_KEYWORD => {
                decode_or_log("PNG XMP", xmp::read_xmp(&xmp::packet_text(text.as_bytes()), tags));
            }
            Ok((keyword, text)) => tags.insert(TagGroup::Png, keyword, Tag::text(text)),
            Err(e) => log::debug!("Skipping unreadable PNG text chunk: {e:#}"),
        }
    }

    if let Some(exif) = png.exif() {
        decode_or_log("PNG eXIf", exif::read_exif(&exif, tags));
    }

    Ok(())
}

/// `IHDR` starts with the width and height as big-endian u32.
fn header_dimensions(data: &[u8]) -> Option<(u64, u64)> {
    let width = u32::from_be_bytes(data.get(0..4)?.try_into().ok()?);
    let height = u32::from_be_bytes(data.get(4..8)?.try_into().ok()?);
    Some((width.into(), height.into()))
}

/// Split `keyword\0rest`.
fn split_keyword(data: &[u8]) -> Result<(String, &[u8])> {
    let Some(null) = data.iter().position(|&b| b == 0) else {
        bail!("missing keyword terminator");
    };
    if null == 0 {
        bail!("empty keyword");
    }
    Ok((latin1(&data[..null]), &data[null + 1..]))
}

/// `tEXt`: keyword, NUL, Latin-1 text. Some writers put UTF-8 in it anyway,
/// so valid UTF-8 is taken as such.
fn decode_text(data: &[u8]) -> Result<(String, String)> {
    let (keyword, text) = split_keyword(data)?;
    let text = match std::str::from_utf8(text) {
        Ok(s) => s.to_string(),
        Err(_) => latin1(text),
    };
    Ok((keyword, text))
}

/// `zTXt`: keyword, NUL, compression method, zlib stream.
fn decode_ztxt(data: &[u8]) -> Result<(String, String)> {
    let (keyword, rest) = split_keyword(data)?;
    let Some((&method, compressed)) = rest.split_first() else {
        bail!("zTXt chunk {keyword:?} is truncated");
    };
    if method != 0 {
        bail!("zTXt chunk {keyword:?} uses unknown compression method {method}");
    }
    let inflated = inflate(compressed)?;
    let text = match String::from_utf8(inflated) {
        Ok(s) => s,
        Err(e) => latin1(e.as_bytes()),
    };
    Ok((keyword, text))
}

/// `iTXt`: keyword, NUL, compression flag, method, language tag, NUL,
/// translated keyword, NUL, UTF-8 text (zlib-compressed when flagged).
fn decode_itxt(data: &[u8]) -> Result<(String, String)> {
    let (keyword, rest) = split_keyword(data)?;
    if rest.len() < 2 {
        bail!("iTXt chunk {keyword:?} is truncated");
    }
    let compressed = rest[0] == 1;

    let mut fields = rest[2..].splitn(3, |&b| b == 0);
    let _language = fields.next();
    let _translated = fields.next();
    let Some(payload) = fields.next() else {
        bail!("iTXt chunk {keyword:?} is missing its text");
    };

    let text = if compressed {
        String::from_utf8_lossy(&inflate(payload)?).into_owned()
    } else {
        String::from_utf8_lossy(payload).into_owned()
    };
    Ok((keyword, text))
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| anyhow!("Failed to inflate text chunk: {e}"))?;
    Ok(out)
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
