//! Derives a [`ColorProfile`] from the blocks a scanner captured.
//!
//! JPEG: embedded ICC profile, then EXIF colorimetry.
//! PNG: iCCP, then the sRGB chunk, then cHRM together with gAMA.

use exif::{In, Tag, Value};
use flate2::{Decompress, FlushDecompress, Status};

use crate::color_profile::ColorProfile;
use crate::colorimetry::{Chromaticity, RgbColorimetry};
use crate::constants::{
    DEFAULT_GAMMA, EXIF_COLOR_SPACE_ADOBE_RGB, EXIF_COLOR_SPACE_SRGB, EXIF_COLOR_SPACE_UNCALIBRATED, EXIF_HEADER_SIZE,
    ICC_HEADER_SIZE, PNG_CHRM_CHUNK_LENGTH, PNG_FIXED_POINT_SCALE, PNG_GAMA_CHUNK_LENGTH,
};
use crate::error::{MetadataError, Result};
use crate::options::ReaderOptions;

// iCCP profile names are 1 to 79 Latin-1 characters.
const ICCP_MAXIMUM_NAME_LENGTH: usize = 79;

/// Profile for a JPEG stream from its captured APP2 ICC and APP1 EXIF
/// blocks (full segment bodies, headers included).
///
/// Returns `Ok(None)` when neither block carries colour information.
pub fn jpeg_color_profile(icc: Option<&[u8]>, exif: Option<&[u8]>) -> Result<Option<ColorProfile>> {
    if let Some(icc) = icc {
        let data = icc.get(ICC_HEADER_SIZE..).unwrap_or_default();
        return ColorProfile::from_bytes(data).map(Some);
    }

    match exif {
        Some(block) => exif_color_profile(&decode_exif(block)?).map(Some),
        None => Ok(None),
    }
}

/// Decodes a captured EXIF block. The `"Exif\0\0"` prefix is stripped and the
/// TIFF structure behind it handed to kamadak-exif.
pub fn decode_exif(block: &[u8]) -> Result<exif::Exif> {
    let tiff = block
        .get(EXIF_HEADER_SIZE..)
        .filter(|tiff| !tiff.is_empty())
        .ok_or(MetadataError::MissingTiffHeader)?;
    Ok(exif::Reader::new().read_raw(tiff.to_vec())?)
}

/// Profile described by the EXIF ColorSpace tag.
///
/// Only sRGB and uncalibrated data with explicit whitepoint and primaries
/// produce a profile. Adobe RGB is recognised but not supported.
pub fn exif_color_profile(exif: &exif::Exif) -> Result<ColorProfile> {
    let color_space = exif
        .get_field(Tag::ColorSpace, In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .ok_or(MetadataError::MissingExifTag(Tag::ColorSpace))?;

    match color_space {
        EXIF_COLOR_SPACE_SRGB => Ok(ColorProfile::new_srgb()),
        EXIF_COLOR_SPACE_ADOBE_RGB => {
            log::debug!("EXIF declares Adobe RGB; no built-in profile for it");
            Err(MetadataError::UnsupportedExifColorSpace(color_space))
        }
        EXIF_COLOR_SPACE_UNCALIBRATED => {
            let white = rationals::<2>(exif, Tag::WhitePoint)?;
            let primaries = rationals::<6>(exif, Tag::PrimaryChromaticities)?;
            let gamma = match exif.get_field(Tag::Gamma, In::PRIMARY) {
                Some(_) => rationals::<1>(exif, Tag::Gamma)?[0],
                None => DEFAULT_GAMMA,
            };
            log::trace!("EXIF uncalibrated colorimetry, gamma {}", gamma);

            ColorProfile::from_colorimetry(RgbColorimetry {
                white_point: Chromaticity::new(white[0], white[1]),
                red: Chromaticity::new(primaries[0], primaries[1]),
                green: Chromaticity::new(primaries[2], primaries[3]),
                blue: Chromaticity::new(primaries[4], primaries[5]),
                gamma,
            })
        }
        other => Err(MetadataError::UnsupportedExifColorSpace(other)),
    }
}

fn rationals<const N: usize>(exif: &exif::Exif, tag: Tag) -> Result<[f64; N]> {
    let field = exif
        .get_field(tag, In::PRIMARY)
        .ok_or(MetadataError::MissingExifTag(tag))?;
    match field.value {
        Value::Rational(ref values) if values.len() >= N => {
            let mut out = [0.0; N];
            for (slot, value) in out.iter_mut().zip(values) {
                *slot = value.to_f64();
            }
            Ok(out)
        }
        _ => Err(MetadataError::MissingExifTag(tag)),
    }
}

/// Profile for a PNG stream from its captured chunk bodies.
pub fn png_color_profile(
    iccp: Option<&[u8]>,
    srgb: Option<&[u8]>,
    chrm: Option<&[u8]>,
    gama: Option<&[u8]>,
    options: &ReaderOptions,
) -> Result<Option<ColorProfile>> {
    if let Some(iccp) = iccp {
        let profile = iccp_profile_data(iccp, options)?;
        return ColorProfile::from_bytes(&profile).map(Some);
    }

    if srgb.is_some() {
        return Ok(Some(ColorProfile::new_srgb()));
    }

    match (chrm, gama) {
        (Some(chrm), Some(gama)) => {
            let colorimetry = png_colorimetry(chrm, gama)?;
            if colorimetry.matches_srgb() {
                log::trace!("cHRM/gAMA match sRGB, using the built-in profile");
                Ok(Some(ColorProfile::new_srgb()))
            } else {
                ColorProfile::from_colorimetry(colorimetry).map(Some)
            }
        }
        _ => Ok(None),
    }
}

/// Inflated ICC profile of an iCCP chunk body.
///
/// Layout: NUL-terminated profile name, compression method (always 0),
/// zlib stream.
pub fn iccp_profile_data(iccp: &[u8], options: &ReaderOptions) -> Result<Vec<u8>> {
    let name_end = iccp
        .iter()
        .take(ICCP_MAXIMUM_NAME_LENGTH + 1)
        .position(|&b| b == 0)
        .filter(|&len| len > 0)
        .ok_or(MetadataError::InvalidIccpChunk)?;

    let method = *iccp.get(name_end + 1).ok_or(MetadataError::InvalidIccpChunk)?;
    if method != 0 {
        return Err(MetadataError::UnsupportedCompressionMethod(method));
    }

    inflate_icc_profile(&iccp[name_end + 2..], options)
}

/// Inflates a zlib stream into a buffer that starts at
/// `options.inflate_step` bytes and doubles until the stream ends or
/// `options.max_icc_size` is reached.
pub fn inflate_icc_profile(compressed: &[u8], options: &ReaderOptions) -> Result<Vec<u8>> {
    let limit = options.max_icc_size;
    // One spare byte lets a profile of exactly `limit` bytes reach the end
    // of its stream.
    let ceiling = limit.saturating_add(1);
    let mut decompress = Decompress::new(true);
    let mut output = Vec::with_capacity(options.inflate_step.clamp(1, ceiling));

    loop {
        let consumed = decompress.total_in() as usize;
        let produced = decompress.total_out();
        let status = decompress.decompress_vec(
            &compressed[consumed..],
            &mut output,
            FlushDecompress::Finish,
        )?;

        if output.len() > limit {
            return Err(MetadataError::IccProfileTooLarge { limit });
        }
        if status == Status::StreamEnd {
            return Ok(output);
        }

        if output.len() == output.capacity() {
            let grown = (output.capacity() * 2).min(ceiling);
            output.reserve_exact(grown - output.len());
        } else if decompress.total_in() as usize == compressed.len()
            || (decompress.total_in() as usize == consumed && decompress.total_out() == produced)
        {
            return Err(MetadataError::TruncatedDeflateStream);
        }
    }
}

fn read_fixed_point(data: &[u8], index: usize) -> f64 {
    let offset = index * 4;
    let value = u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]);
    value as f64 / PNG_FIXED_POINT_SCALE
}

/// Decodes cHRM (whitepoint and primaries) and gAMA (inverse gamma) bodies.
pub fn png_colorimetry(chrm: &[u8], gama: &[u8]) -> Result<RgbColorimetry> {
    if chrm.len() != PNG_CHRM_CHUNK_LENGTH as usize || gama.len() != PNG_GAMA_CHUNK_LENGTH as usize {
        return Err(MetadataError::InvalidChromaticity);
    }

    let inverse_gamma = read_fixed_point(gama, 0);
    if inverse_gamma == 0.0 {
        return Err(MetadataError::InvalidGamma(0.0));
    }

    let colorimetry = RgbColorimetry {
        white_point: Chromaticity::new(read_fixed_point(chrm, 0), read_fixed_point(chrm, 1)),
        red: Chromaticity::new(read_fixed_point(chrm, 2), read_fixed_point(chrm, 3)),
        green: Chromaticity::new(read_fixed_point(chrm, 4), read_fixed_point(chrm, 5)),
        blue: Chromaticity::new(read_fixed_point(chrm, 6), read_fixed_point(chrm, 7)),
        gamma: 1.0 / inverse_gamma,
    };
    colorimetry.validate()?;
    Ok(colorimetry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_profile::ProfileSource;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn fixed(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    const SRGB_CHRM: [u32; 8] = [31270, 32900, 64000, 33000, 30000, 60000, 15000, 6000];

    #[test]
    fn test_inflate_grows_buffer() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let options = ReaderOptions::default().with_inflate_step(16);
        assert_eq!(inflate_icc_profile(&zlib(&data), &options).unwrap(), data);
    }

    #[test]
    fn test_inflate_ceiling() {
        let data = vec![7u8; 4096];
        let options = ReaderOptions::default().with_max_icc_size(1000);
        assert!(matches!(
            inflate_icc_profile(&zlib(&data), &options),
            Err(MetadataError::IccProfileTooLarge { limit: 1000 })
        ));
    }

    #[test]
    fn test_inflate_truncated_stream() {
        let data = vec![1u8; 2048];
        let compressed = zlib(&data);
        let truncated = &compressed[..compressed.len() / 2];
        assert!(inflate_icc_profile(truncated, &ReaderOptions::default()).is_err());
    }

    #[test]
    fn test_iccp_layout() {
        let options = ReaderOptions::default();
        let mut body = b"name\0\0".to_vec();
        body.extend(zlib(b"profile"));
        assert_eq!(iccp_profile_data(&body, &options).unwrap(), b"profile");

        body[5] = 1;
        assert!(matches!(
            iccp_profile_data(&body, &options),
            Err(MetadataError::UnsupportedCompressionMethod(1))
        ));

        assert!(matches!(
            iccp_profile_data(b"\0\0abc", &options),
            Err(MetadataError::InvalidIccpChunk)
        ));
        assert!(matches!(
            iccp_profile_data(b"no terminator", &options),
            Err(MetadataError::InvalidIccpChunk)
        ));
    }

    #[test]
    fn test_png_srgb_substitution() {
        let chrm = fixed(&SRGB_CHRM);
        let gama = fixed(&[45455]);
        let profile = png_color_profile(None, None, Some(&chrm), Some(&gama), &ReaderOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(profile.source(), ProfileSource::BuiltinSrgb);
    }

    #[test]
    fn test_png_custom_profile() {
        let mut values = SRGB_CHRM;
        values[2] = 68000;
        values[3] = 32000;
        let chrm = fixed(&values);
        let gama = fixed(&[55555]);
        let profile = png_color_profile(None, None, Some(&chrm), Some(&gama), &ReaderOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(profile.source(), ProfileSource::Synthesized);
        let colorimetry = profile.colorimetry().unwrap();
        assert!((colorimetry.red.x - 0.68).abs() < 1e-9);
        assert!((colorimetry.gamma - 1.8).abs() < 1e-3);
    }

    #[test]
    fn test_png_precedence_and_absence() {
        let options = ReaderOptions::default();
        let chrm = fixed(&SRGB_CHRM);
        let gama = fixed(&[45455]);

        assert!(png_color_profile(None, None, Some(&chrm), None, &options).unwrap().is_none());
        assert!(png_color_profile(None, None, None, Some(&gama), &options).unwrap().is_none());
        assert!(png_color_profile(None, None, None, None, &options).unwrap().is_none());

        let srgb = png_color_profile(None, Some(&[0]), None, None, &options).unwrap().unwrap();
        assert!(srgb.is_builtin_srgb());
    }

    #[test]
    fn test_png_zero_gamma() {
        let chrm = fixed(&SRGB_CHRM);
        let gama = fixed(&[0]);
        assert!(matches!(
            png_color_profile(None, None, Some(&chrm), Some(&gama), &ReaderOptions::default()),
            Err(MetadataError::InvalidGamma(_))
        ));
    }

    #[test]
    fn test_exif_block_without_tiff() {
        assert!(matches!(decode_exif(b"Exif\0\0"), Err(MetadataError::MissingTiffHeader)));
        assert!(matches!(decode_exif(b"Exif"), Err(MetadataError::MissingTiffHeader)));
    }

    #[test]
    fn test_jpeg_without_blocks() {
        assert!(jpeg_color_profile(None, None).unwrap().is_none());
    }
}
