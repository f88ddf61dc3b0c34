//! Builders for synthetic JPEG and PNG streams.
#![allow(dead_code)]

use flate2::Compression;
use flate2::write::ZlibEncoder;
use metastream_rs::MetadataScanner;
use metastream_rs::constants::{ICC_SIGNATURE, JPEG_XMP_SIGNATURE, PNG_MAGIC_BYTES, PNG_XMP_SIGNATURE};
use metastream_rs::png_metadata_reader::chunk_crc;
use std::io::Write;

pub const XMP_PACKET: &str = r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>
<x:xmpmeta xmlns:x="adobe:ns:meta/">
 <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="" xmlns:xmp="http://ns.adobe.com/xap/1.0/" xmp:Rating="4">
   <xmp:CreatorTool>metastream test</xmp:CreatorTool>
  </rdf:Description>
 </rdf:RDF>
</x:xmpmeta>
<?xpacket end="w"?>"#;

/// Pushes `data` through a scanner `chunk_size` bytes at a time.
pub fn feed<S: MetadataScanner>(scanner: &mut S, data: &[u8], chunk_size: usize) {
    for chunk in data.chunks(chunk_size) {
        scanner.consume(chunk);
    }
}

// JPEG

pub fn jpeg_segment(marker: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, marker];
    out.extend_from_slice(&((body.len() + 2) as u16).to_be_bytes());
    out.extend_from_slice(body);
    out
}

/// SOI, the given segments, a quantization table and EOI.
pub fn jpeg_stream(segments: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    for segment in segments {
        out.extend_from_slice(segment);
    }
    out.extend_from_slice(&jpeg_segment(0xDB, &[0u8; 65]));
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

pub fn jfif_segment() -> Vec<u8> {
    jpeg_segment(0xE0, b"JFIF\0\x01\x02\0\0\x01\0\x01\0\0")
}

pub fn exif_segment_body(tiff: &[u8]) -> Vec<u8> {
    let mut body = b"Exif\0\0".to_vec();
    body.extend_from_slice(tiff);
    body
}

pub fn xmp_segment_body(packet: &[u8]) -> Vec<u8> {
    let mut body = JPEG_XMP_SIGNATURE.to_vec();
    body.extend_from_slice(packet);
    body
}

pub fn icc_segment_body(profile: &[u8], sequence: u8, count: u8) -> Vec<u8> {
    let mut body = ICC_SIGNATURE.to_vec();
    body.push(sequence);
    body.push(count);
    body.extend_from_slice(profile);
    body
}

// PNG

pub fn png_chunk(name: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = (data.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(name);
    out.extend_from_slice(data);
    out.extend_from_slice(&chunk_crc(name, data).to_be_bytes());
    out
}

/// Signature, a 16x16 RGB IHDR, the given chunks, one IDAT and IEND.
pub fn png_stream(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = PNG_MAGIC_BYTES.to_vec();
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&16u32.to_be_bytes());
    ihdr.extend_from_slice(&16u32.to_be_bytes());
    ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
    out.extend_from_slice(&png_chunk(b"IHDR", &ihdr));
    for chunk in chunks {
        out.extend_from_slice(chunk);
    }
    out.extend_from_slice(&png_chunk(b"IDAT", &zlib(&[0u8; 64])));
    out.extend_from_slice(&png_chunk(b"IEND", &[]));
    out
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn iccp_body(name: &str, profile: &[u8]) -> Vec<u8> {
    let mut body = name.as_bytes().to_vec();
    body.push(0);
    body.push(0);
    body.extend_from_slice(&zlib(profile));
    body
}

pub fn itxt_xmp_body(packet: &[u8]) -> Vec<u8> {
    let mut body = PNG_XMP_SIGNATURE.to_vec();
    body.extend_from_slice(packet);
    body
}

pub fn chrm_body(values: [u32; 8]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub const SRGB_CHRM: [u32; 8] = [31270, 32900, 64000, 33000, 30000, 60000, 15000, 6000];

// EXIF

pub struct TiffEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    data: Vec<u8>,
}

const TIFF_SHORT: u16 = 3;
const TIFF_LONG: u16 = 4;
const TIFF_RATIONAL: u16 = 5;
const TAG_EXIF_IFD_POINTER: u16 = 0x8769;

pub fn short_entry(tag: u16, value: u16) -> TiffEntry {
    TiffEntry {
        tag,
        field_type: TIFF_SHORT,
        count: 1,
        data: value.to_le_bytes().to_vec(),
    }
}

pub fn rational_entry(tag: u16, values: &[(u32, u32)]) -> TiffEntry {
    TiffEntry {
        tag,
        field_type: TIFF_RATIONAL,
        count: values.len() as u32,
        data: values
            .iter()
            .flat_map(|(n, d)| n.to_le_bytes().into_iter().chain(d.to_le_bytes()))
            .collect(),
    }
}

pub const TAG_WHITE_POINT: u16 = 0x013E;
pub const TAG_PRIMARY_CHROMATICITIES: u16 = 0x013F;
pub const TAG_COLOR_SPACE: u16 = 0xA001;
pub const TAG_GAMMA: u16 = 0xA500;

fn ifd_size(entries: usize) -> usize {
    2 + entries * 12 + 4
}

fn write_ifd(out: &mut Vec<u8>, data: &mut Vec<u8>, data_start: usize, mut entries: Vec<TiffEntry>) {
    entries.sort_by_key(|e| e.tag);
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for entry in entries {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.field_type.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        if entry.data.len() <= 4 {
            let mut inline = entry.data.clone();
            inline.resize(4, 0);
            out.extend_from_slice(&inline);
        } else {
            let offset = (data_start + data.len()) as u32;
            out.extend_from_slice(&offset.to_le_bytes());
            data.extend_from_slice(&entry.data);
            if data.len() % 2 == 1 {
                data.push(0);
            }
        }
    }
    out.extend_from_slice(&0u32.to_le_bytes());
}

/// Little-endian TIFF structure with IFD0 and an optional Exif IFD.
pub fn tiff(mut ifd0: Vec<TiffEntry>, exif_ifd: Vec<TiffEntry>) -> Vec<u8> {
    let has_exif = !exif_ifd.is_empty();
    let ifd0_len = ifd0.len() + usize::from(has_exif);
    let exif_offset = 8 + ifd_size(ifd0_len);
    let data_start = exif_offset + if has_exif { ifd_size(exif_ifd.len()) } else { 0 };

    if has_exif {
        ifd0.push(TiffEntry {
            tag: TAG_EXIF_IFD_POINTER,
            field_type: TIFF_LONG,
            count: 1,
            data: (exif_offset as u32).to_le_bytes().to_vec(),
        });
    }

    let mut out = b"II*\0".to_vec();
    out.extend_from_slice(&8u32.to_le_bytes());
    let mut data = Vec::new();
    write_ifd(&mut out, &mut data, data_start, ifd0);
    if has_exif {
        write_ifd(&mut out, &mut data, data_start, exif_ifd);
    }
    assert_eq!(out.len(), data_start);
    out.extend_from_slice(&data);
    out
}

fn chromaticity_rationals(values: &[f64]) -> Vec<(u32, u32)> {
    values.iter().map(|v| ((v * 10000.0).round() as u32, 10000)).collect()
}

/// EXIF block (with its header) declaring uncalibrated colour with the
/// given whitepoint, primaries (rx, ry, gx, gy, bx, by) and gamma.
pub fn uncalibrated_exif(white: [f64; 2], primaries: [f64; 6], gamma: Option<f64>) -> Vec<u8> {
    let ifd0 = vec![
        rational_entry(TAG_WHITE_POINT, &chromaticity_rationals(&white)),
        rational_entry(TAG_PRIMARY_CHROMATICITIES, &chromaticity_rationals(&primaries)),
    ];
    let mut exif_ifd = vec![short_entry(TAG_COLOR_SPACE, 0xFFFF)];
    if let Some(gamma) = gamma {
        exif_ifd.push(rational_entry(TAG_GAMMA, &[((gamma * 100.0).round() as u32, 100)]));
    }
    exif_segment_body(&tiff(ifd0, exif_ifd))
}

pub fn color_space_exif(color_space: u16) -> Vec<u8> {
    exif_segment_body(&tiff(Vec::new(), vec![short_entry(TAG_COLOR_SPACE, color_space)]))
}

// ICC

fn s15_fixed16(values: [f64; 3]) -> Vec<u8> {
    values
        .iter()
        .flat_map(|v| ((v * 65536.0).round() as i32).to_be_bytes())
        .collect()
}

fn xyz_tag(values: [f64; 3]) -> Vec<u8> {
    let mut data = b"XYZ \0\0\0\0".to_vec();
    data.extend_from_slice(&s15_fixed16(values));
    data
}

/// Minimal ICC v2.1 RGB display profile: colorants, white point and a
/// shared 2.2 gamma curve.
pub fn minimal_icc_profile() -> Vec<u8> {
    let mut profile = Vec::with_capacity(512);
    profile.extend_from_slice(&[0u8; 4]); // size, patched below
    profile.extend_from_slice(&[0u8; 4]);
    profile.extend_from_slice(&[0x02, 0x10, 0x00, 0x00]);
    profile.extend_from_slice(b"mntr");
    profile.extend_from_slice(b"RGB ");
    profile.extend_from_slice(b"XYZ ");
    profile.extend_from_slice(&[0u8; 12]);
    profile.extend_from_slice(b"acsp");
    profile.extend_from_slice(&[0u8; 24]);
    profile.extend_from_slice(&[0u8; 4]); // rendering intent
    profile.extend_from_slice(&s15_fixed16([0.9642, 1.0, 0.8249]));
    profile.extend_from_slice(&[0u8; 4]);
    profile.extend_from_slice(&[0u8; 16]);
    profile.extend_from_slice(&[0u8; 28]);
    assert_eq!(profile.len(), 128);

    let mut curve = b"curv\0\0\0\0".to_vec();
    curve.extend_from_slice(&1u32.to_be_bytes());
    curve.extend_from_slice(&0x0233u16.to_be_bytes());
    curve.extend_from_slice(&[0, 0]);

    let tags: [(&[u8; 4], Vec<u8>); 7] = [
        (b"wtpt", xyz_tag([0.9642, 1.0, 0.8249])),
        (b"rXYZ", xyz_tag([0.4361, 0.2225, 0.0139])),
        (b"gXYZ", xyz_tag([0.3851, 0.7169, 0.0971])),
        (b"bXYZ", xyz_tag([0.1431, 0.0606, 0.7141])),
        (b"rTRC", curve.clone()),
        (b"gTRC", curve.clone()),
        (b"bTRC", curve),
    ];

    let mut offset = 128 + 4 + tags.len() * 12;
    let mut data = Vec::new();
    profile.extend_from_slice(&(tags.len() as u32).to_be_bytes());
    for (signature, tag) in &tags {
        profile.extend_from_slice(*signature);
        profile.extend_from_slice(&(offset as u32).to_be_bytes());
        profile.extend_from_slice(&(tag.len() as u32).to_be_bytes());
        data.extend_from_slice(tag);
        offset += tag.len();
    }
    profile.extend_from_slice(&data);

    let size = profile.len() as u32;
    profile[0..4].copy_from_slice(&size.to_be_bytes());
    profile
}
