//! Container-independent entry point.
//!
//! [`MetadataReader`] owns exactly one format scanner, chosen when it is
//! constructed, and forwards every call to it. Derived values (colour
//! profile, decoded EXIF, XMP view) are computed on request. Failures in
//! those derivations are logged at `debug` level and surface as `None`.

use log::debug;

use crate::color_profile::ColorProfile;
use crate::constants::{ICC_HEADER_SIZE, PNG_MAGIC_BYTES};
use crate::error::Result;
use crate::jpeg_metadata_reader::JpegMetadataReader;
use crate::options::ReaderOptions;
use crate::png_metadata_reader::PngMetadataReader;
use crate::profile_synthesizer;
use crate::xmp::XmpPacket;

/// Incremental consumer of an image byte stream.
///
/// `consume` may be called with slices of any length, including empty ones,
/// as long as they arrive in stream order. Once `finished` reports true any
/// further input is ignored.
pub trait MetadataScanner {
    fn consume(&mut self, buf: &[u8]);
    fn finished(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Jpeg,
    Png,
}

impl ImageType {
    /// Guesses the container from the first bytes of a stream.
    ///
    /// Readers never detect the type themselves; callers that do not know
    /// it up front can use this before constructing one.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8]) {
            Some(ImageType::Jpeg)
        } else if data.starts_with(&PNG_MAGIC_BYTES) {
            Some(ImageType::Png)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ImageType::Jpeg => "JPEG",
            ImageType::Png => "PNG",
        }
    }
}

#[derive(Debug)]
enum Scanner {
    Jpeg(JpegMetadataReader),
    Png(PngMetadataReader),
}

#[derive(Debug)]
pub struct MetadataReader {
    scanner: Scanner,
    options: ReaderOptions,
}

impl MetadataReader {
    pub fn new(image_type: ImageType) -> Self {
        Self::with_options(image_type, ReaderOptions::default())
    }

    pub fn with_options(image_type: ImageType, options: ReaderOptions) -> Self {
        let scanner = match image_type {
            ImageType::Jpeg => Scanner::Jpeg(JpegMetadataReader::new()),
            ImageType::Png => Scanner::Png(PngMetadataReader::new()),
        };
        Self { scanner, options }
    }

    pub fn image_type(&self) -> ImageType {
        match self.scanner {
            Scanner::Jpeg(_) => ImageType::Jpeg,
            Scanner::Png(_) => ImageType::Png,
        }
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn consume(&mut self, buf: &[u8]) {
        match &mut self.scanner {
            Scanner::Jpeg(reader) => reader.consume(buf),
            Scanner::Png(reader) => reader.consume(buf),
        }
    }

    pub fn finished(&self) -> bool {
        match &self.scanner {
            Scanner::Jpeg(reader) => reader.finished(),
            Scanner::Png(reader) => reader.finished(),
        }
    }

    /// Moves the captured EXIF block (with its `"Exif\0\0"` header) to the
    /// caller. A second call returns `None`, as does any PNG reader.
    pub fn get_raw_exif(&mut self) -> Option<Vec<u8>> {
        match &mut self.scanner {
            Scanner::Jpeg(reader) => reader.take_exif(),
            Scanner::Png(_) => None,
        }
    }

    /// Moves the captured IPTC (APP14) block to the caller. JPEG only.
    pub fn get_raw_iptc(&mut self) -> Option<Vec<u8>> {
        match &mut self.scanner {
            Scanner::Jpeg(reader) => reader.take_iptc(),
            Scanner::Png(_) => None,
        }
    }

    /// The embedded ICC profile bytes: the APP2 payload after its header for
    /// JPEG, the inflated iCCP profile for PNG.
    pub fn get_raw_icc(&self) -> Option<Vec<u8>> {
        match &self.scanner {
            Scanner::Jpeg(reader) => reader.icc()?.get(ICC_HEADER_SIZE..).map(<[u8]>::to_vec),
            Scanner::Png(reader) => ok_or_log(
                profile_synthesizer::iccp_profile_data(reader.icc()?, &self.options),
                "ICC profile",
            ),
        }
    }

    /// Synthesizes the colour profile the stream describes, if any.
    pub fn get_color_profile(&self) -> Option<ColorProfile> {
        let result = match &self.scanner {
            Scanner::Jpeg(reader) => profile_synthesizer::jpeg_color_profile(reader.icc(), reader.exif()),
            Scanner::Png(reader) => profile_synthesizer::png_color_profile(
                reader.icc(),
                reader.srgb(),
                reader.chrm(),
                reader.gama(),
                &self.options,
            ),
        };
        ok_or_log(result, "color profile").flatten()
    }

    pub fn get_xmp(&self) -> Option<XmpPacket> {
        let result = match &self.scanner {
            Scanner::Jpeg(reader) => XmpPacket::from_jpeg_segment(reader.xmp()?),
            Scanner::Png(reader) => XmpPacket::from_png_chunk(reader.xmp()?),
        };
        ok_or_log(result, "XMP packet")
    }

    /// The EXIF block decoded with kamadak-exif. The raw block stays in the
    /// reader.
    pub fn get_exif_decoded(&self) -> Option<exif::Exif> {
        match &self.scanner {
            Scanner::Jpeg(reader) => ok_or_log(profile_synthesizer::decode_exif(reader.exif()?), "EXIF block"),
            Scanner::Png(_) => None,
        }
    }
}

impl MetadataScanner for MetadataReader {
    fn consume(&mut self, buf: &[u8]) {
        MetadataReader::consume(self, buf)
    }

    fn finished(&self) -> bool {
        MetadataReader::finished(self)
    }
}

fn ok_or_log<T>(result: Result<T>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("Discarding {}: {}", what, e);
            None
        }
    }
}
