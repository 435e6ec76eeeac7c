// src/exif_parser.rs
//
// Tag extraction on top of kamadak-exif. EXIF/TIFF/GPS decoding is left to the
// crate; this module only locates the JFIF header and the XMP packet inside
// the container and walks the XMP RDF with quick-xml.

use crate::exif_data::*;
use exif::{Context, Exif, Field, In, Reader, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::Bytes;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use serde_json::json;
use std::io::Cursor;
use thiserror::Error;

const XMP_MARKER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const JFIF_MARKER: &[u8] = b"JFIF\0";
const XMP_PACKET_START: &[u8] = b"<x:xmpmeta";
const XMP_PACKET_END: &[u8] = b"</x:xmpmeta>";

const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file is empty")]
    Empty,
    #[error("unsupported or corrupt image: {0}")]
    Exif(#[from] exif::Error),
}

/// Parse the full tag set of an image, restricted to the requested groups.
///
/// A container without an EXIF block yields whatever the other groups found
/// (possibly nothing). Unknown or corrupt containers are errors.
pub fn parse_tags(bytes: &[u8], groups: &TagGroups) -> Result<MetadataMap, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut tags = MetadataMap::new();

    if groups.reads_exif() {
        if let Some(exif) = read_exif(bytes)? {
            collect_exif_fields(&exif, groups, &mut tags);
        }
    }

    // Not a JPEG (or a truncated one): no JFIF header, XMP found by scanning
    let jpeg = Jpeg::from_bytes(Bytes::copy_from_slice(bytes)).ok();

    if groups.jfif {
        if let Some(header) = jpeg.as_ref().and_then(|j| app_segment(j, APP0, JFIF_MARKER)) {
            collect_jfif(&header, &mut tags);
        }
    }

    if groups.xmp {
        if let Some(packet) = find_xmp_packet(jpeg.as_ref(), bytes) {
            match parse_xmp(&packet) {
                Ok(properties) => {
                    for (name, value) in properties {
                        tags.entry(name).or_insert(value);
                    }
                }
                Err(e) => log::warn!("Skipping malformed XMP packet: {}", e),
            }
        }
    }

    Ok(tags)
}

/// Read only the GPS position. Independent of `parse_tags`.
pub fn extract_gps(bytes: &[u8]) -> Result<Option<GpsCoordinate>, ParseError> {
    let Some(exif) = read_exif(bytes)? else {
        return Ok(None);
    };

    let latitude = gps_degrees(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, b'S');
    let longitude = gps_degrees(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, b'W');

    Ok(GpsCoordinate::from_parts(latitude, longitude))
}

fn read_exif(bytes: &[u8]) -> Result<Option<Exif>, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::Empty);
    }
    match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => Ok(Some(exif)),
        Err(exif::Error::NotFound(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn collect_exif_fields(exif: &Exif, groups: &TagGroups, tags: &mut MetadataMap) {
    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY {
            continue;
        }
        if matches!(
            field.tag,
            Tag::ExifIFDPointer | Tag::GPSInfoIFDPointer | Tag::InteropIFDPointer
        ) {
            continue;
        }
        let wanted = match field.tag.context() {
            Context::Gps => groups.gps,
            _ => groups.tiff,
        };
        if !wanted {
            continue;
        }
        if let Some(value) = tag_value(field) {
            tags.insert(field.tag.to_string(), value);
        }
    }

    if groups.tiff {
        if let Some(thumbnail) = thumbnail_bytes(exif) {
            tags.insert(THUMBNAIL_KEY.to_string(), TagValue::Structured(json!(thumbnail)));
        }
    }
}

fn thumbnail_bytes(exif: &Exif) -> Option<&[u8]> {
    let offset = exif
        .get_field(Tag::JPEGInterchangeFormat, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    let length = exif
        .get_field(Tag::JPEGInterchangeFormatLength, In::THUMBNAIL)?
        .value
        .get_uint(0)? as usize;
    exif.buf().get(offset..offset.checked_add(length)?)
}

fn tag_value(field: &Field) -> Option<TagValue> {
    match &field.value {
        Value::Byte(v) => integers(v.iter().map(|&n| i64::from(n))),
        Value::Short(v) => integers(v.iter().map(|&n| i64::from(n))),
        Value::Long(v) => integers(v.iter().map(|&n| i64::from(n))),
        Value::SByte(v) => integers(v.iter().map(|&n| i64::from(n))),
        Value::SShort(v) => integers(v.iter().map(|&n| i64::from(n))),
        Value::SLong(v) => integers(v.iter().map(|&n| i64::from(n))),
        Value::Rational(v) => floats(v.iter().map(|r| r.to_f64())),
        Value::SRational(v) => floats(v.iter().map(|r| r.to_f64())),
        Value::Float(v) => floats(v.iter().map(|&n| f64::from(n))),
        Value::Double(v) => floats(v.iter().copied()),
        Value::Ascii(strings) => Some(TagValue::Text(ascii_text(strings))),
        Value::Undefined(bytes, _) => Some(undefined_value(bytes)),
        _ => None,
    }
}

fn integers(values: impl Iterator<Item = i64>) -> Option<TagValue> {
    let values: Vec<i64> = values.collect();
    match values.as_slice() {
        [] => None,
        [single] => Some(TagValue::Number(*single as f64)),
        _ => Some(TagValue::Structured(json!(values))),
    }
}

fn floats(values: impl Iterator<Item = f64>) -> Option<TagValue> {
    let values: Vec<f64> = values.collect();
    match values.as_slice() {
        [] => None,
        [single] => Some(TagValue::Number(*single)),
        _ => Some(TagValue::Structured(json!(values))),
    }
}

fn ascii_text(strings: &[Vec<u8>]) -> String {
    strings
        .iter()
        .map(|s| {
            String::from_utf8_lossy(s)
                .trim_end_matches(|c: char| c == '\0' || c.is_whitespace())
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Short printable blobs (ExifVersion, FlashpixVersion) read as text; the rest
/// stay raw bytes.
fn undefined_value(bytes: &[u8]) -> TagValue {
    let printable = bytes.iter().all(|b| (0x20..0x7f).contains(b));
    if !bytes.is_empty() && bytes.len() <= 16 && printable {
        TagValue::Text(String::from_utf8_lossy(bytes).into_owned())
    } else {
        TagValue::Structured(json!(bytes))
    }
}

/// Decode a degree/minute/second rational triple, negated by the hemisphere
/// reference.
fn gps_degrees(exif: &Exif, tag: Tag, ref_tag: Tag, negative_ref: u8) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let parts: Vec<f64> = match &field.value {
        Value::Rational(v) => v.iter().map(|r| r.to_f64()).collect(),
        Value::SRational(v) => v.iter().map(|r| r.to_f64()).collect(),
        _ => return None,
    };

    let degrees = match parts.as_slice() {
        [] => return None,
        [d] => *d,
        [d, m] => d + m / 60.0,
        [d, m, s, ..] => d + m / 60.0 + s / 3600.0,
    };

    let negate = exif
        .get_field(ref_tag, In::PRIMARY)
        .map_or(false, |f| match &f.value {
            Value::Ascii(strings) => strings
                .first()
                .and_then(|s| s.first())
                .map_or(false, |c| c.eq_ignore_ascii_case(&negative_ref)),
            _ => false,
        });

    Some(if negate { -degrees } else { degrees })
}

fn collect_jfif(header: &[u8], tags: &mut MetadataMap) {
    let &[major, minor, units, xd_hi, xd_lo, yd_hi, yd_lo, thumb_w, thumb_h, ..] = header else {
        return;
    };

    let entries = [
        ("JFIFVersion", TagValue::Text(format!("{}.{:02}", major, minor))),
        ("ResolutionUnit", TagValue::Number(f64::from(units))),
        (
            "XResolution",
            TagValue::Number(f64::from(u16::from_be_bytes([xd_hi, xd_lo]))),
        ),
        (
            "YResolution",
            TagValue::Number(f64::from(u16::from_be_bytes([yd_hi, yd_lo]))),
        ),
        ("ThumbnailWidth", TagValue::Number(f64::from(thumb_w))),
        ("ThumbnailHeight", TagValue::Number(f64::from(thumb_h))),
    ];

    // TIFF values win on name clashes
    for (name, value) in entries {
        tags.entry(name.to_string()).or_insert(value);
    }
}

/// Contents of the first `marker` segment whose payload starts with
/// `prefix`, with the prefix stripped.
fn app_segment(jpeg: &Jpeg, marker: u8, prefix: &[u8]) -> Option<Bytes> {
    jpeg.segments()
        .iter()
        .find(|segment| segment.marker() == marker && segment.contents().starts_with(prefix))
        .map(|segment| segment.contents().slice(prefix.len()..))
}

/// Locate the XMP packet: the JPEG APP1 XMP segment, or an uncompressed
/// `<x:xmpmeta>` packet anywhere in other containers.
fn find_xmp_packet(jpeg: Option<&Jpeg>, bytes: &[u8]) -> Option<Bytes> {
    jpeg.and_then(|jpeg| app_segment(jpeg, APP1, XMP_MARKER))
        .or_else(|| {
            let start = find_subslice(bytes, XMP_PACKET_START)?;
            let length = find_subslice(&bytes[start..], XMP_PACKET_END)? + XMP_PACKET_END.len();
            Some(Bytes::copy_from_slice(&bytes[start..start + length]))
        })
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Value being collected for one XMP property element.
struct XmpProperty {
    name: String,
    items: Vec<String>,
}

impl XmpProperty {
    fn into_value(self) -> Option<(String, TagValue)> {
        let value = match self.items.len() {
            0 => return None,
            1 => TagValue::Text(self.items.into_iter().next()?),
            _ => TagValue::Structured(json!(self.items)),
        };
        Some((self.name, value))
    }
}

/// Flatten every `rdf:Description` of an XMP packet into local-name keyed
/// properties. Attribute-form properties and element-form properties are both
/// collected; `rdf:Seq`/`Bag`/`Alt` items become arrays.
fn parse_xmp(packet: &[u8]) -> Result<MetadataMap, quick_xml::Error> {
    let mut reader = XmlReader::from_reader(packet);
    reader.trim_text(true);

    let mut properties = MetadataMap::new();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut description_depth: Option<usize> = None;
    let mut property: Option<XmpProperty> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                depth += 1;
                let name = local_name(e);
                if property.is_none() && name == "Description" {
                    collect_xmp_attributes(e, &mut properties)?;
                    description_depth = Some(depth);
                } else if property.is_none() && description_depth.map_or(false, |d| d + 1 == depth)
                {
                    property = Some(XmpProperty {
                        name,
                        items: Vec::new(),
                    });
                }
            }
            Event::Empty(ref e) => {
                let name = local_name(e);
                if property.is_none() && name == "Description" {
                    collect_xmp_attributes(e, &mut properties)?;
                } else if property.is_none() && description_depth == Some(depth) {
                    // <xmpMM:DerivedFrom rdf:resource=".."/>, <exif:Flash exif:Fired=".."/>
                    if let Some(value) = empty_property_value(e)? {
                        properties.insert(name, value);
                    }
                }
            }
            Event::Text(ref t) => {
                if let Some(current) = property.as_mut() {
                    let text = t.unescape()?.trim().to_string();
                    if !text.is_empty() {
                        current.items.push(text);
                    }
                }
            }
            Event::End(_) => {
                if property.is_some() && description_depth.map_or(false, |d| d + 1 == depth) {
                    if let Some((name, value)) = property.take().and_then(XmpProperty::into_value) {
                        properties.insert(name, value);
                    }
                } else if property.is_none() && description_depth == Some(depth) {
                    description_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(properties)
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Property attributes of an element as (local name, value), skipping
/// namespace declarations and RDF/XML syntax attributes.
fn xmp_attributes(e: &BytesStart) -> Result<Vec<(String, String)>, quick_xml::Error> {
    let mut attributes = Vec::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if key.starts_with("xmlns") || key.starts_with("rdf:") || key.starts_with("xml:") {
            continue;
        }
        let name = key.rsplit(':').next().unwrap_or(key.as_str()).to_string();
        attributes.push((name, attr.unescape_value()?.into_owned()));
    }
    Ok(attributes)
}

fn collect_xmp_attributes(
    e: &BytesStart,
    properties: &mut MetadataMap,
) -> Result<(), quick_xml::Error> {
    for (name, value) in xmp_attributes(e)? {
        properties.insert(name, TagValue::Text(value));
    }
    Ok(())
}

/// Value of a property written as an empty element: its `rdf:resource` URI,
/// or its qualifier attributes as an object.
fn empty_property_value(e: &BytesStart) -> Result<Option<TagValue>, quick_xml::Error> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"rdf:resource" {
            return Ok(Some(TagValue::Text(attr.unescape_value()?.into_owned())));
        }
    }

    let fields: serde_json::Map<String, serde_json::Value> = xmp_attributes(e)?
        .into_iter()
        .map(|(name, value)| (name, serde_json::Value::String(value)))
        .collect();
    if fields.is_empty() {
        return Ok(None);
    }
    Ok(Some(TagValue::Structured(serde_json::Value::Object(fields))))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use exif::experimental::Writer;
    use exif::{Field, In, Rational, Tag, Value};
    use std::io::Cursor;

    pub const THUMBNAIL: &[u8] = &[0xFF, 0xD8, 0xFF, 0xD9];

    pub const XMP_PACKET: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
  <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
    <rdf:Description rdf:about=""
        xmlns:xmp="http://ns.adobe.com/xap/1.0/"
        xmlns:dc="http://purl.org/dc/elements/1.1/"
        xmp:CreatorTool="Darktable 4.6"
        xmp:Rating="4">
      <dc:title>
        <rdf:Alt>
          <rdf:li xml:lang="x-default">Golden Gate at dusk</rdf:li>
        </rdf:Alt>
      </dc:title>
      <dc:subject>
        <rdf:Bag>
          <rdf:li>bridge</rdf:li>
          <rdf:li>sunset</rdf:li>
        </rdf:Bag>
      </dc:subject>
    </rdf:Description>
  </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

    fn field(tag: Tag, value: Value) -> Field {
        Field {
            tag,
            ifd_num: In::PRIMARY,
            value,
        }
    }

    fn ascii(tag: Tag, text: &str) -> Field {
        field(tag, Value::Ascii(vec![text.as_bytes().to_vec()]))
    }

    fn rational(tag: Tag, num: u32, denom: u32) -> Field {
        field(tag, Value::Rational(vec![Rational { num, denom }]))
    }

    fn dms(tag: Tag, degrees: u32, minutes: u32, seconds_hundredths: u32) -> Field {
        field(
            tag,
            Value::Rational(vec![
                Rational { num: degrees, denom: 1 },
                Rational { num: minutes, denom: 1 },
                Rational {
                    num: seconds_hundredths,
                    denom: 100,
                },
            ]),
        )
    }

    fn write_tiff(fields: &[Field], thumbnail: Option<&[u8]>) -> Vec<u8> {
        let mut writer = Writer::new();
        for f in fields {
            writer.push_field(f);
        }
        if let Some(jpeg) = thumbnail {
            writer.set_jpeg(jpeg, In::THUMBNAIL);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false).expect("write tiff fixture");
        buf.into_inner()
    }

    /// 18 displayable tags plus a maker note and an embedded thumbnail,
    /// located at 37°46'29.64"N 122°25'9.84"W.
    pub fn tiff_with_gps() -> Vec<u8> {
        let fields = vec![
            ascii(Tag::Make, "Canon"),
            ascii(Tag::Model, "EOS R5"),
            ascii(Tag::Software, "Firmware 1.8.1"),
            ascii(Tag::DateTime, "2024:05:01 18:42:10"),
            field(Tag::Orientation, Value::Short(vec![1])),
            rational(Tag::XResolution, 72, 1),
            rational(Tag::YResolution, 72, 1),
            field(Tag::ResolutionUnit, Value::Short(vec![2])),
            rational(Tag::ExposureTime, 1, 250),
            rational(Tag::FNumber, 28, 10),
            field(Tag::PhotographicSensitivity, Value::Short(vec![200])),
            ascii(Tag::DateTimeOriginal, "2024:05:01 18:42:10"),
            field(Tag::ExifVersion, Value::Undefined(b"0231".to_vec(), 0)),
            field(Tag::MakerNote, Value::Undefined(vec![0x42; 64], 0)),
            field(Tag::GPSVersionID, Value::Byte(vec![2, 3, 0, 0])),
            ascii(Tag::GPSLatitudeRef, "N"),
            dms(Tag::GPSLatitude, 37, 46, 2964),
            ascii(Tag::GPSLongitudeRef, "W"),
            dms(Tag::GPSLongitude, 122, 25, 984),
        ];
        write_tiff(&fields, Some(THUMBNAIL))
    }

    /// Latitude without longitude.
    pub fn tiff_with_partial_gps() -> Vec<u8> {
        let fields = vec![
            ascii(Tag::Make, "Nikon"),
            ascii(Tag::GPSLatitudeRef, "S"),
            dms(Tag::GPSLatitude, 33, 52, 0),
        ];
        write_tiff(&fields, None)
    }

    pub fn tiff_at(latitude: (u32, u32, u32, &str), longitude: (u32, u32, u32, &str)) -> Vec<u8> {
        let fields = vec![
            ascii(Tag::Make, "Fujifilm"),
            ascii(Tag::GPSLatitudeRef, latitude.3),
            dms(Tag::GPSLatitude, latitude.0, latitude.1, latitude.2),
            ascii(Tag::GPSLongitudeRef, longitude.3),
            dms(Tag::GPSLongitude, longitude.0, longitude.1, longitude.2),
        ];
        write_tiff(&fields, None)
    }

    pub fn jpeg(segments: &[(u8, Vec<u8>)]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        for (marker, payload) in segments {
            out.extend([0xFF, *marker]);
            out.extend(((payload.len() + 2) as u16).to_be_bytes());
            out.extend_from_slice(payload);
        }
        out.extend([0xFF, 0xD9]);
        out
    }

    pub fn exif_segment(tiff: &[u8]) -> (u8, Vec<u8>) {
        (0xE1, [b"Exif\0\0".as_slice(), tiff].concat())
    }

    pub fn jfif_segment() -> (u8, Vec<u8>) {
        let mut payload = b"JFIF\0".to_vec();
        payload.extend([1, 1, 1, 0, 72, 0, 72, 0, 0]);
        (0xE0, payload)
    }

    pub fn xmp_segment(xml: &str) -> (u8, Vec<u8>) {
        (
            0xE1,
            [b"http://ns.adobe.com/xap/1.0/\0".as_slice(), xml.as_bytes()].concat(),
        )
    }
}
