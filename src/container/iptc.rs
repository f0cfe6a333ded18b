//! IPTC-IIM records inside a Photoshop `8BIM` resource block (JPEG APP13).

use anyhow::{Result, bail};

use crate::tags::{RawTags, Tag, TagGroup};

pub const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const RESOURCE_SIGNATURE: &[u8] = b"8BIM";
const RESOURCE_IPTC: u16 = 0x0404;

const IIM_MARKER: u8 = 0x1C;
const APPLICATION_RECORD: u8 = 2;

/// Application-record datasets we surface.
const DATASETS: &[(u8, &str)] = &[(5, "Object Name"), (25, "Keywords"), (80, "By-line"), (120, "Caption")];

/// Decode an APP13 segment (including the `Photoshop 3.0\0` header).
pub fn read_iptc(app13: &[u8], tags: &mut RawTags) -> Result<()> {
    let Some(resources) = app13.strip_prefix(PHOTOSHOP_HEADER) else {
        bail!("APP13 segment is not a Photoshop resource block");
    };

    let mut found = false;
    for (id, data) in resource_blocks(resources) {
        if id == RESOURCE_IPTC {
            read_records(data, tags);
            found = true;
        }
    }
    if !found {
        log::debug!("Photoshop resource block has no IPTC-IIM resource");
    }
    Ok(())
}

/// Walk `8BIM` resources: signature, id, padded Pascal name, length, data
/// (padded to even).
fn resource_blocks(data: &[u8]) -> Vec<(u16, &[u8])> {
    let mut blocks = Vec::new();
    let mut pos = 0;
    while pos + 12 <= data.len() {
        if &data[pos..pos + 4] != RESOURCE_SIGNATURE {
            break;
        }
        let id = u16::from_be_bytes([data[pos + 4], data[pos + 5]]);
        let name_len = data[pos + 6] as usize;
        // Length byte plus name, padded to even.
        let name_padded = (name_len + 2) & !1;
        let len_start = pos + 6 + name_padded;
        if len_start + 4 > data.len() {
            break;
        }
        let len = u32::from_be_bytes([data[len_start], data[len_start + 1], data[len_start + 2], data[len_start + 3]])
            as usize;
        let start = len_start + 4;
        let end = (start + len).min(data.len());
        blocks.push((id, &data[start..end]));
        pos = start + len + (len & 1);
    }
    blocks
}

/// IIM datasets: `0x1C`, record, dataset, big-endian u16 length, value.
/// Repeated keywords are joined with `", "`.
fn read_records(data: &[u8], tags: &mut RawTags) {
    let mut keywords = Vec::new();
    let mut pos = 0;

    while pos + 5 <= data.len() && data[pos] == IIM_MARKER {
        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let len = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
        if len & 0x8000 != 0 {
            log::debug!("Extended-length IIM dataset {record}:{dataset}, stopping");
            break;
        }
        let start = pos + 5;
        let end = (start + len).min(data.len());
        let value = String::from_utf8_lossy(&data[start..end]).trim().to_string();
        pos = start + len;

        if record != APPLICATION_RECORD || value.is_empty() {
            continue;
        }
        let Some(&(_, name)) = DATASETS.iter().find(|(id, _)| *id == dataset) else {
            continue;
        };
        if name == "Keywords" {
            keywords.push(value);
        } else {
            tags.insert(TagGroup::Iptc, name, Tag::text(value));
        }
    }

    if !keywords.is_empty() {
        tags.insert(TagGroup::Iptc, "Keywords", Tag::text(keywords.join(", ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::testdata::iptc_app13;
    use crate::tags::TagSource;

    #[test]
    fn reads_application_records() {
        let (_, app13) = iptc_app13(&[
            (5, "Sunset"),
            (25, "beach"),
            (25, "evening"),
            (80, "someone"),
            (120, "a prompt\nSteps: 20"),
        ]);
        let mut tags = RawTags::new();
        read_iptc(&app13, &mut tags).unwrap();

        assert_eq!(tags.get_text(TagGroup::Iptc, "Object Name"), Some("Sunset"));
        assert_eq!(tags.get_text(TagGroup::Iptc, "Keywords"), Some("beach, evening"));
        assert_eq!(tags.get_text(TagGroup::Iptc, "By-line"), Some("someone"));
        assert_eq!(tags.get_text(TagGroup::Iptc, "Caption"), Some("a prompt\nSteps: 20"));
    }

    #[test]
    fn record_version_is_not_a_tag() {
        let (_, app13) = iptc_app13(&[]);
        let mut tags = RawTags::new();
        read_iptc(&app13, &mut tags).unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn rejects_other_app13() {
        let mut tags = RawTags::new();
        assert!(read_iptc(b"Adobe_CM\0stuff", &mut tags).is_err());
    }

    #[test]
    fn truncated_resource_is_tolerated() {
        let (_, mut app13) = iptc_app13(&[(120, "a caption that gets cut")]);
        app13.truncate(app13.len() - 5);
        let mut tags = RawTags::new();
        read_iptc(&app13, &mut tags).unwrap();
        assert_eq!(tags.get_text(TagGroup::Iptc, "Caption"), Some("a caption that gets"));
    }
}
