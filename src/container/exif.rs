//! EXIF (TIFF-structured) blocks, read with nom-exif.

use anyhow::{Context, Result};
use nom_exif::*;
use std::io::Cursor;

use crate::tags::{RawTags, Tag, TagGroup};

// XPComment lives in IFD0 but has no ExifTag variant.
const TAG_XP_COMMENT: u16 = 0x9C9C;
const TAG_USER_COMMENT: u16 = 0x9286;

/// Plain text tags, by IFD tag code.
const TEXT_TAGS: &[(u16, &str)] = &[
    (0x010E, "ImageDescription"),
    (0x010F, "Make"),
    (0x0110, "Model"),
    (0x0131, "Software"),
    (0x0132, "DateTime"),
    (0x013B, "Artist"),
    (0x9003, "DateTimeOriginal"),
];

/// Tags that also keep their numeric value.
const NUMERIC_TAGS: &[(u16, &str)] = &[(0x0100, "ImageWidth"), (0x0101, "ImageHeight")];

/// Zero bytes appended to every block before parsing. nom-exif sniffs a
/// fixed-size header and then insists on reading more, so a block that ends
/// inside that window fails with an unexpected EOF.
const PARSE_PADDING: usize = 4096;

/// Decode a TIFF-structured EXIF block (as found in `eXIf`, APP1 after the
/// `Exif\0\0` prefix, or a whole TIFF file) into `exif` tags.
pub fn read_exif(tiff: &[u8], tags: &mut RawTags) -> Result<()> {
    // IFD offsets are absolute from the block start, so trailing zeros are
    // never reached by the IFD walk.
    let mut block = Vec::with_capacity(tiff.len() + PARSE_PADDING);
    block.extend_from_slice(tiff);
    block.resize(tiff.len() + PARSE_PADDING, 0);

    let mut parser = MediaParser::new();
    let ms = MediaSource::seekable(Cursor::new(block)).context("Failed to open EXIF block")?;
    let iter: ExifIter = parser.parse(ms).context("Failed to parse EXIF block")?;
    let exif: Exif = iter.into();

    for &(code, name) in TEXT_TAGS {
        if let Some(text) = exif.get_by_ifd_tag_code(0, code).and_then(entry_to_string) {
            tags.insert(TagGroup::Exif, name, Tag::text(text));
        }
    }

    for &(code, name) in NUMERIC_TAGS {
        if let Some(number) = exif.get_by_ifd_tag_code(0, code).and_then(entry_to_number) {
            tags.insert(TagGroup::Exif, name, Tag::number(number));
        }
    }

    if let Some(comment) = exif.get_by_ifd_tag_code(0, TAG_USER_COMMENT).and_then(decode_user_comment) {
        tags.insert(TagGroup::Exif, "UserComment", Tag::text(comment));
    }

    if let Some(comment) = exif.get_by_ifd_tag_code(0, TAG_XP_COMMENT).and_then(decode_xp_string) {
        tags.insert(TagGroup::Exif, "XPComment", Tag::text(comment));
    }

    Ok(())
}

/// Convert an EntryValue to an Option<String>.
fn entry_to_string(val: &EntryValue) -> Option<String> {
    let s = match val {
        EntryValue::Text(s) => s.clone(),
        other => other.to_string(),
    };
    let s = s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).to_string();
    if s.is_empty() { None } else { Some(s) }
}

fn entry_to_number(val: &EntryValue) -> Option<u64> {
    val.to_string().trim().parse().ok()
}

fn entry_bytes(val: &EntryValue) -> Option<&[u8]> {
    match val {
        EntryValue::Undefined(bytes) | EntryValue::U8Array(bytes) => Some(bytes.as_slice()),
        EntryValue::Text(s) => Some(s.as_bytes()),
        _ => None,
    }
}

/// UserComment: an 8-byte character code followed by the text.
fn decode_user_comment(val: &EntryValue) -> Option<String> {
    let bytes = entry_bytes(val)?;
    let text = match bytes.split_at_checked(8) {
        Some((b"UNICODE\0", rest)) => match rest {
            [0xFE, 0xFF, body @ ..] => decode_utf16(body, true),
            [0xFF, 0xFE, body @ ..] => decode_utf16(body, false),
            _ => decode_utf16(rest, guess_big_endian(rest)),
        },
        Some((b"ASCII\0\0\0", rest)) | Some((b"\0\0\0\0\0\0\0\0", rest)) => String::from_utf8_lossy(rest).into_owned(),
        Some((b"JIS\0\0\0\0\0", rest)) => {
            log::debug!("JIS-encoded UserComment, reading as lossy UTF-8");
            String::from_utf8_lossy(rest).into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if text.is_empty() { None } else { Some(text.to_string()) }
}

/// Windows XP* tags are UTF-16LE byte arrays.
fn decode_xp_string(val: &EntryValue) -> Option<String> {
    let text = decode_utf16(entry_bytes(val)?, false);
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if text.is_empty() { None } else { Some(text.to_string()) }
}

/// Writers disagree on UTF-16 byte order inside UserComment. Text is mostly
/// ASCII, so whichever half of each code unit is more often zero is the
/// high byte.
fn guess_big_endian(bytes: &[u8]) -> bool {
    let zeros_at = |offset: usize| bytes.iter().skip(offset).step_by(2).filter(|&&b| b == 0).count();
    zeros_at(0) > zeros_at(1)
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            if big_endian { u16::from_be_bytes(pair) } else { u16::from_le_bytes(pair) }
        })
        .collect();
    String::from_utf16_lossy(&units)
}
