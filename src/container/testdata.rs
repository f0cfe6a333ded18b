//! Byte-level builders for the container tests.

use flate2::Compression;
use flate2::Crc;
use flate2::write::ZlibEncoder;
use std::io::Write;

pub const TIFF_BYTE: u16 = 1;
pub const TIFF_ASCII: u16 = 2;
pub const TIFF_SHORT: u16 = 3;
pub const TIFF_LONG: u16 = 4;
pub const TIFF_UNDEFINED: u16 = 7;

pub type Chunk = (&'static [u8; 4], Vec<u8>);

// ── PNG ──────────────────────────────────────────────────────────────

/// A 64x32 PNG holding `chunks` between `IHDR` and `IEND`.
pub fn png_file(chunks: &[Chunk]) -> Vec<u8> {
    let mut out = b"\x89PNG\r\n\x1a\n".to_vec();

    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&64u32.to_be_bytes());
    ihdr.extend_from_slice(&32u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
    write_png_chunk(&mut out, b"IHDR", &ihdr);

    for (kind, data) in chunks {
        write_png_chunk(&mut out, kind, data);
    }
    write_png_chunk(&mut out, b"IEND", &[]);
    out
}

fn write_png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let mut crc = Crc::new();
    crc.update(kind);
    crc.update(data);
    out.extend_from_slice(&crc.sum().to_be_bytes());
}

pub fn text_chunk(keyword: &str, text: &str) -> Chunk {
    let mut data = keyword.as_bytes().to_vec();
    data.push(0);
    data.extend_from_slice(text.as_bytes());
    (b"tEXt", data)
}

pub fn ztxt_chunk(keyword: &str, text: &str) -> Chunk {
    let mut data = keyword.as_bytes().to_vec();
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(&deflate(text.as_bytes()));
    (b"zTXt", data)
}

pub fn itxt_chunk(keyword: &str, text: &str, compressed: bool) -> Chunk {
    let mut data = keyword.as_bytes().to_vec();
    data.push(0);
    data.extend_from_slice(&[compressed as u8, 0]);
    data.extend_from_slice(b"en\0\0");
    if compressed {
        data.extend_from_slice(&deflate(text.as_bytes()));
    } else {
        data.extend_from_slice(text.as_bytes());
    }
    (b"iTXt", data)
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

// ── TIFF / EXIF ──────────────────────────────────────────────────────

pub type IfdEntry = (u16, u16, Vec<u8>);

/// NUL-terminated ASCII value.
pub fn ascii(s: &str) -> Vec<u8> {
    let mut out = s.as_bytes().to_vec();
    out.push(0);
    out
}

/// EXIF UserComment with an 8-byte character code.
pub fn user_comment(code: &[u8; 8], text: &[u8]) -> Vec<u8> {
    let mut out = code.to_vec();
    out.extend_from_slice(text);
    out
}

pub fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

pub fn utf16be(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

/// Little-endian TIFF with `ifd0` and, when non-empty, an EXIF sub-IFD.
pub fn tiff_le(ifd0: &[IfdEntry], exif_ifd: &[IfdEntry]) -> Vec<u8> {
    let mut entries = ifd0.to_vec();
    if !exif_ifd.is_empty() {
        entries.push((0x8769, TIFF_LONG, 0u32.to_le_bytes().to_vec()));
    }

    // IFD0 size does not depend on the pointer value, so lay it out once to
    // learn where the sub-IFD lands.
    let exif_offset = 8 + ifd_bytes(&entries, 8).len();
    for entry in entries.iter_mut().filter(|e| e.0 == 0x8769) {
        entry.2 = (exif_offset as u32).to_le_bytes().to_vec();
    }

    let mut out = b"II\x2a\x00".to_vec();
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&ifd_bytes(&entries, 8));
    if !exif_ifd.is_empty() {
        out.extend_from_slice(&ifd_bytes(exif_ifd, exif_offset));
    }
    out
}

fn type_size(kind: u16) -> usize {
    match kind {
        TIFF_SHORT => 2,
        TIFF_LONG => 4,
        _ => 1,
    }
}

/// One IFD placed at absolute offset `start`, followed by its out-of-line data.
fn ifd_bytes(entries: &[IfdEntry], start: usize) -> Vec<u8> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|e| e.0);

    let header_len = 2 + 12 * sorted.len() + 4;
    let mut table = Vec::new();
    let mut data = Vec::new();

    table.extend_from_slice(&(sorted.len() as u16).to_le_bytes());
    for (tag, kind, value) in &sorted {
        table.extend_from_slice(&tag.to_le_bytes());
        table.extend_from_slice(&kind.to_le_bytes());
        table.extend_from_slice(&((value.len() / type_size(*kind)) as u32).to_le_bytes());
        if value.len() <= 4 {
            let mut inline = value.clone();
            inline.resize(4, 0);
            table.extend_from_slice(&inline);
        } else {
            let offset = start + header_len + data.len();
            table.extend_from_slice(&(offset as u32).to_le_bytes());
            data.extend_from_slice(value);
            if data.len() % 2 == 1 {
                data.push(0);
            }
        }
    }
    table.extend_from_slice(&0u32.to_le_bytes());
    table.extend_from_slice(&data);
    table
}

// ── JPEG ─────────────────────────────────────────────────────────────

pub const XMP_APP1_PREFIX: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

/// A baseline JPEG of `width`x`height` with `segments` after SOI.
pub fn jpeg_file(segments: &[(u8, Vec<u8>)], width: u16, height: u16) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    for (marker, contents) in segments {
        write_jpeg_segment(&mut out, *marker, contents);
    }

    let mut sof = vec![8];
    sof.extend_from_slice(&height.to_be_bytes());
    sof.extend_from_slice(&width.to_be_bytes());
    sof.extend_from_slice(&[1, 1, 0x11, 0]);
    write_jpeg_segment(&mut out, 0xC0, &sof);

    write_jpeg_segment(&mut out, 0xDA, &[1, 1, 0, 0, 0x3F, 0]);
    out.extend_from_slice(&[0x12, 0x34]);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

fn write_jpeg_segment(out: &mut Vec<u8>, marker: u8, contents: &[u8]) {
    out.extend_from_slice(&[0xFF, marker]);
    out.extend_from_slice(&((contents.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(contents);
}

pub fn exif_app1(tiff: &[u8]) -> (u8, Vec<u8>) {
    let mut contents = b"Exif\0\0".to_vec();
    contents.extend_from_slice(tiff);
    (0xE1, contents)
}

pub fn xmp_app1(packet: &str) -> (u8, Vec<u8>) {
    let mut contents = XMP_APP1_PREFIX.to_vec();
    contents.extend_from_slice(packet.as_bytes());
    (0xE1, contents)
}

/// APP13 holding one IPTC-IIM resource with `(dataset, value)` records from
/// the application record.
pub fn iptc_app13(records: &[(u8, &str)]) -> (u8, Vec<u8>) {
    let mut iim = vec![0x1C, 0x02, 0x00, 0x00, 0x02, 0x00, 0x04];
    for (dataset, value) in records {
        iim.extend_from_slice(&[0x1C, 0x02, *dataset]);
        iim.extend_from_slice(&(value.len() as u16).to_be_bytes());
        iim.extend_from_slice(value.as_bytes());
    }

    let mut contents = b"Photoshop 3.0\0".to_vec();
    // An unrelated resource first, so the walk has to skip it.
    contents.extend_from_slice(b"8BIM");
    contents.extend_from_slice(&0x03EDu16.to_be_bytes());
    contents.extend_from_slice(&[0, 0]);
    contents.extend_from_slice(&3u32.to_be_bytes());
    contents.extend_from_slice(&[1, 2, 3, 0]);

    contents.extend_from_slice(b"8BIM");
    contents.extend_from_slice(&0x0404u16.to_be_bytes());
    contents.extend_from_slice(&[0, 0]);
    contents.extend_from_slice(&(iim.len() as u32).to_be_bytes());
    contents.extend_from_slice(&iim);
    if iim.len() % 2 == 1 {
        contents.push(0);
    }
    (0xED, contents)
}

// ── WebP ─────────────────────────────────────────────────────────────

pub fn webp_file(chunks: &[Chunk]) -> Vec<u8> {
    let mut body = b"WEBP".to_vec();
    for (id, data) in chunks {
        body.extend_from_slice(*id);
        body.extend_from_slice(&(data.len() as u32).to_le_bytes());
        body.extend_from_slice(data);
        if data.len() % 2 == 1 {
            body.push(0);
        }
    }
    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// Extended-format header announcing EXIF and XMP.
pub fn vp8x_chunk(width: u32, height: u32) -> Chunk {
    let mut data = vec![0x0C, 0, 0, 0];
    data.extend_from_slice(&(width - 1).to_le_bytes()[..3]);
    data.extend_from_slice(&(height - 1).to_le_bytes()[..3]);
    (b"VP8X", data)
}

/// Lossless bitstream header; only the size fields matter here.
pub fn vp8l_chunk(width: u32, height: u32) -> Chunk {
    let bits = (width - 1) | ((height - 1) << 14);
    let mut data = vec![0x2F];
    data.extend_from_slice(&bits.to_le_bytes());
    (b"VP8L", data)
}
