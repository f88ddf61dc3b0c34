use thiserror::Error;

/// Errors raised while deriving values from captured metadata blocks.
///
/// The state machines themselves never fail; these only surface from the
/// synthesis and decoding steps that run after capture.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Invalid iCCP chunk layout")]
    InvalidIccpChunk,
    #[error("Unsupported iCCP compression method {0}")]
    UnsupportedCompressionMethod(u8),
    #[error("Inflated ICC profile exceeds {limit} bytes")]
    IccProfileTooLarge { limit: usize },
    #[error("Truncated deflate stream")]
    TruncatedDeflateStream,
    #[error("Deflate error: {0}")]
    Inflate(#[from] flate2::DecompressError),
    #[error("ICC profile parse error: {0}")]
    ProfileParse(String),
    #[error("EXIF block has no TIFF header")]
    MissingTiffHeader,
    #[error("EXIF decode error: {0}")]
    Exif(#[from] exif::Error),
    #[error("EXIF color space {0:#06x} has no usable profile")]
    UnsupportedExifColorSpace(u32),
    #[error("Required EXIF tag {0} missing or malformed")]
    MissingExifTag(exif::Tag),
    #[error("Invalid chromaticity values")]
    InvalidChromaticity,
    #[error("Invalid gamma value {0}")]
    InvalidGamma(f64),
    #[error("XMP packet signature mismatch")]
    XmpSignatureMismatch,
    #[error("XMP parse error: {0}")]
    Xml(String),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
