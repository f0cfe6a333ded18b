//! XMP packets. Properties of each top-level `rdf:Description` are stored by
//! local name (`dc:description` → `description`), from either attribute or
//! element form.

use anyhow::{Context, Result};
use roxmltree::{Document, Node};

use crate::tags::{RawTags, Tag, TagGroup};

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// RDF containers whose first item stands in for the whole property.
const RDF_ARRAYS: &[&str] = &["Alt", "Seq", "Bag"];

/// Pull the XML packet out of surrounding bytes (JPEG APP1 after its
/// namespace prefix, a WebP `XMP ` chunk, ...).
pub fn packet_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c == '\0' || c == '\u{FEFF}' || c.is_whitespace())
        .to_string()
}

/// Collect simple properties from an XMP packet into `xmp` tags.
///
/// Language alternatives, sequences and bags contribute their first item;
/// nested structures are skipped.
pub fn read_xmp(packet: &str, tags: &mut RawTags) -> Result<()> {
    let doc = Document::parse(packet).context("Failed to parse XMP packet")?;
    let before = tags.len();

    let descriptions = doc.descendants().filter(|node| {
        node.has_tag_name((RDF_NS, "Description"))
            && node.parent_element().is_some_and(|parent| parent.has_tag_name((RDF_NS, "RDF")))
    });

    for description in descriptions {
        for attr in description.attributes() {
            if is_property(attr.namespace()) && !attr.value().trim().is_empty() {
                tags.insert(TagGroup::Xmp, attr.name(), Tag::text(attr.value()));
            }
        }

        for property in description.children().filter(Node::is_element) {
            if !is_property(property.tag_name().namespace()) {
                continue;
            }
            if let Some(value) = property_value(property) {
                tags.insert(TagGroup::Xmp, property.tag_name().name(), Tag::text(value));
            }
        }
    }

    log::debug!("Read {} XMP properties", tags.len() - before);
    Ok(())
}

/// RDF syntax and `xml:lang` are structure, not properties.
fn is_property(namespace: Option<&str>) -> bool {
    matches!(namespace, Some(ns) if ns != RDF_NS && ns != XML_NS)
}

fn property_value(property: Node<'_, '_>) -> Option<String> {
    let node = match property.children().find(Node::is_element) {
        None => property,
        Some(container) if is_rdf_array(container) => {
            container.children().find(|n| n.has_tag_name((RDF_NS, "li")))?
        }
        Some(_) => return None,
    };

    if node.children().any(|n| n.is_element()) {
        return None;
    }
    let text = node.text()?.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}

fn is_rdf_array(node: Node<'_, '_>) -> bool {
    node.tag_name().namespace() == Some(RDF_NS) && RDF_ARRAYS.contains(&node.tag_name().name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagSource;

    const PACKET: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""
        xmlns:dc="http://purl.org/dc/elements/1.1/"
        xmlns:xmp="http://ns.adobe.com/xap/1.0/"
        xmp:CreatorTool="ComfyUI">
      <dc:description>
        <rdf:Alt><rdf:li xml:lang="x-default">a cat &amp; a dog</rdf:li></rdf:Alt>
      </dc:description>
      <dc:subject>
        <rdf:Bag><rdf:li>first</rdf:li><rdf:li>second</rdf:li></rdf:Bag>
      </dc:subject>
      <sd:Parameters xmlns:sd="http://example.com/sd/">prompt&#10;Steps: 20</sd:Parameters>
      <dc:creator/>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

    fn read(packet: &str) -> RawTags {
        let mut tags = RawTags::new();
        read_xmp(packet, &mut tags).unwrap();
        tags
    }

    fn wrap(description: &str) -> String {
        format!(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">{description}</rdf:RDF></x:xmpmeta>"#
        )
    }

    // ── properties ───────────────────────────────────────────────────

    #[test]
    fn attribute_properties() {
        let tags = read(PACKET);
        assert_eq!(tags.get_text(TagGroup::Xmp, "CreatorTool"), Some("ComfyUI"));
        assert!(tags.get_tag(TagGroup::Xmp, "about").is_none());
        assert!(tags.get_tag(TagGroup::Xmp, "dc").is_none());
    }

    #[test]
    fn element_properties() {
        let tags = read(PACKET);
        assert_eq!(tags.get_text(TagGroup::Xmp, "description"), Some("a cat & a dog"));
        assert_eq!(tags.get_text(TagGroup::Xmp, "subject"), Some("first"));
        assert_eq!(tags.get_text(TagGroup::Xmp, "Parameters"), Some("prompt\nSteps: 20"));
        assert!(tags.get_tag(TagGroup::Xmp, "creator").is_none());
    }

    #[test]
    fn structural_elements_skipped() {
        let tags = read(PACKET);
        for name in ["RDF", "about", "Alt", "Bag", "li", "xmpmeta", "lang"] {
            assert!(tags.get_tag(TagGroup::Xmp, name).is_none(), "{name} should not be a property");
        }
    }

    #[test]
    fn cdata_value() {
        let packet = wrap(
            r#"<rdf:Description xmlns:sd="http://example.com/sd/"><sd:Parameters><![CDATA[a <b> & c
Steps: 4]]></sd:Parameters></rdf:Description>"#,
        );
        let tags = read(&packet);
        assert_eq!(tags.get_text(TagGroup::Xmp, "Parameters"), Some("a <b> & c\nSteps: 4"));
    }

    #[test]
    fn nested_structures_skipped() {
        let packet = wrap(
            r#"<rdf:Description xmlns:xmpMM="http://ns.adobe.com/xap/1.0/mm/" xmlns:stRef="http://ns.adobe.com/xap/1.0/sType/ResourceRef#" xmpMM:DocumentID="doc-1">
                 <xmpMM:DerivedFrom><rdf:Description stRef:instanceID="inner"/></xmpMM:DerivedFrom>
                 <xmpMM:History rdf:parseType="Resource"><stRef:action>saved</stRef:action></xmpMM:History>
               </rdf:Description>"#,
        );
        let tags = read(&packet);
        assert_eq!(tags.get_text(TagGroup::Xmp, "DocumentID"), Some("doc-1"));
        for name in ["DerivedFrom", "instanceID", "History", "action", "parseType"] {
            assert!(tags.get_tag(TagGroup::Xmp, name).is_none(), "{name} should not be a property");
        }
    }

    #[test]
    fn several_descriptions() {
        let packet = wrap(
            r#"<rdf:Description xmlns:tiff="http://ns.adobe.com/tiff/1.0/" tiff:Make="Canon"/>
               <rdf:Description xmlns:xmp="http://ns.adobe.com/xap/1.0/"><xmp:CreatorTool>InvokeAI</xmp:CreatorTool></rdf:Description>"#,
        );
        let tags = read(&packet);
        assert_eq!(tags.get_text(TagGroup::Xmp, "Make"), Some("Canon"));
        assert_eq!(tags.get_text(TagGroup::Xmp, "CreatorTool"), Some("InvokeAI"));
    }

    // ── packet handling ──────────────────────────────────────────────

    #[test]
    fn packet_text_trims_padding() {
        assert_eq!(packet_text(b"  <x:xmpmeta/>\n\0\0"), "<x:xmpmeta/>");
        assert_eq!(packet_text("\u{FEFF}<x:xmpmeta/>".as_bytes()), "<x:xmpmeta/>");
    }

    #[test]
    fn not_xml() {
        let mut tags = RawTags::new();
        assert!(read_xmp("just some words", &mut tags).is_err());
        assert!(read_xmp("<rdf:RDF><unclosed>", &mut tags).is_err());
        assert!(tags.is_empty());
    }
}
