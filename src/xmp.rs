//! XMP packet extracted from a JPEG APP1 segment or a PNG iTXt chunk.
//!
//! The packet is kept as raw bytes. [`XmpPacket::properties`] offers a flat
//! view of simple properties for viewers; full RDF interpretation is left to
//! dedicated XMP libraries.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::constants::{JPEG_XMP_SIGNATURE, PNG_XMP_SIGNATURE};
use crate::error::{MetadataError, Result};

/// A simple XMP property: qualified name and text value. Array items are
/// reported once per item under the array's property name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpProperty {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpPacket {
    packet: Vec<u8>,
}

impl XmpPacket {
    /// Strips the 29 byte namespace signature of a JPEG APP1 segment.
    pub fn from_jpeg_segment(block: &[u8]) -> Result<Self> {
        Self::strip_signature(block, JPEG_XMP_SIGNATURE)
    }

    /// Strips the 22 byte iTXt keyword header of a PNG chunk.
    pub fn from_png_chunk(block: &[u8]) -> Result<Self> {
        Self::strip_signature(block, PNG_XMP_SIGNATURE)
    }

    fn strip_signature(block: &[u8], signature: &[u8]) -> Result<Self> {
        let packet = block
            .strip_prefix(signature)
            .ok_or(MetadataError::XmpSignatureMismatch)?;
        Ok(Self {
            packet: packet.to_vec(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.packet
    }

    /// The packet as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.packet).ok()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.packet
    }

    /// Lists the simple properties of the packet: attributes of
    /// `rdf:Description` elements and text-valued property elements.
    pub fn properties(&self) -> Result<Vec<XmpProperty>> {
        let mut reader = Reader::from_reader(self.packet.as_slice());

        let mut buf = Vec::new();
        let mut open_elements: Vec<String> = Vec::new();
        // Character data of the innermost open element. Entity references
        // arrive as separate events and are resolved into it.
        let mut text = String::new();
        let mut properties = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let name = qualified_name(e);
                    if name == "rdf:Description" {
                        description_attributes(e, &mut properties)?;
                    }
                    open_elements.push(name);
                    text.clear();
                }
                Ok(Event::Empty(ref e)) => {
                    if qualified_name(e) == "rdf:Description" {
                        description_attributes(e, &mut properties)?;
                    }
                }
                Ok(Event::Text(ref e)) => {
                    let raw = std::str::from_utf8(e).map_err(|e| MetadataError::Xml(e.to_string()))?;
                    text.push_str(&unescape(raw)?);
                }
                Ok(Event::GeneralRef(ref e)) => {
                    let name = std::str::from_utf8(e).map_err(|e| MetadataError::Xml(e.to_string()))?;
                    text.push_str(&resolve_reference(name));
                }
                Ok(Event::End(_)) => {
                    let value = text.trim();
                    if !value.is_empty() {
                        if let Some(name) = property_name(&open_elements) {
                            properties.push(XmpProperty {
                                name: name.to_string(),
                                value: value.to_string(),
                            });
                        }
                    }
                    open_elements.pop();
                    text.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(MetadataError::Xml(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(properties)
    }
}

/// Resolves a predefined entity or a character reference. Anything else is
/// kept verbatim.
fn resolve_reference(name: &str) -> String {
    let reference = format!("&{};", name);
    match quick_xml::escape::unescape(&reference) {
        Ok(resolved) => resolved.into_owned(),
        Err(_) => reference,
    }
}

fn qualified_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn unescape(raw: &str) -> Result<String> {
    quick_xml::escape::unescape(raw)
        .map(|v| v.into_owned())
        .map_err(|e| MetadataError::Xml(e.to_string()))
}

fn description_attributes(e: &BytesStart<'_>, properties: &mut Vec<XmpProperty>) -> Result<()> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MetadataError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if key.starts_with("xmlns") || key.starts_with("rdf:") {
            continue;
        }
        let value = unescape(&String::from_utf8_lossy(&attr.value))?;
        properties.push(XmpProperty { name: key, value });
    }
    Ok(())
}

/// The innermost open element that is not RDF container syntax.
fn property_name(open_elements: &[String]) -> Option<&str> {
    open_elements
        .iter()
        .rev()
        .map(String::as_str)
        .find(|name| !name.starts_with("rdf:") && !name.starts_with("x:"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKET: &str = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="" xmlns:xmp="http://ns.adobe.com/xap/1.0/"
    xmlns:dc="http://purl.org/dc/elements/1.1/" xmp:CreatorTool="Tool &amp; Co">
   <dc:subject><rdf:Bag><rdf:li>sky</rdf:li><rdf:li>sea</rdf:li></rdf:Bag></dc:subject>
   <dc:format>image/jpeg</dc:format>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>"#;

    #[test]
    fn test_strip_signatures() {
        let mut jpeg = JPEG_XMP_SIGNATURE.to_vec();
        jpeg.extend_from_slice(b"<x/>");
        assert_eq!(XmpPacket::from_jpeg_segment(&jpeg).unwrap().as_bytes(), b"<x/>");

        let mut png = PNG_XMP_SIGNATURE.to_vec();
        png.extend_from_slice(b"<x/>");
        assert_eq!(XmpPacket::from_png_chunk(&png).unwrap().as_str(), Some("<x/>"));

        assert!(matches!(
            XmpPacket::from_png_chunk(&jpeg),
            Err(MetadataError::XmpSignatureMismatch)
        ));
    }

    #[test]
    fn test_properties() {
        let mut block = JPEG_XMP_SIGNATURE.to_vec();
        block.extend_from_slice(PACKET.as_bytes());
        let packet = XmpPacket::from_jpeg_segment(&block).unwrap();
        let properties = packet.properties().unwrap();

        let find = |name: &str| -> Vec<&str> {
            properties
                .iter()
                .filter(|p| p.name == name)
                .map(|p| p.value.as_str())
                .collect()
        };
        assert_eq!(find("xmp:CreatorTool"), vec!["Tool & Co"]);
        assert_eq!(find("dc:subject"), vec!["sky", "sea"]);
        assert_eq!(find("dc:format"), vec!["image/jpeg"]);
        assert!(find("rdf:about").is_empty());
    }

    #[test]
    fn test_entity_references_in_element_text() {
        let packet = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="" xmlns:dc="http://purl.org/dc/elements/1.1/">
   <dc:format>Tom &amp; Jerry</dc:format>
   <dc:source>&lt;scan&gt; &#169; &#x41;&unknown;</dc:source>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>"#;
        let mut block = PNG_XMP_SIGNATURE.to_vec();
        block.extend_from_slice(packet.as_bytes());
        let properties = XmpPacket::from_png_chunk(&block).unwrap().properties().unwrap();

        let values: Vec<(&str, &str)> = properties
            .iter()
            .map(|p| (p.name.as_str(), p.value.as_str()))
            .collect();
        assert_eq!(
            values,
            vec![
                ("dc:format", "Tom & Jerry"),
                ("dc:source", "<scan> \u{a9} A&unknown;"),
            ]
        );
    }
}
