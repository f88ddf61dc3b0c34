// JPEG segment layout.

// The size in bytes of the segment length field.
pub const SEGMENT_LENGTH_SIZE: usize = 2;

/// APP1 signature of an EXIF segment. The full header is "Exif\0\0", only the
/// first five bytes are required to match.
pub const EXIF_SIGNATURE: &[u8] = b"Exif\0";
pub const EXIF_HEADER_SIZE: usize = 6;

/// APP1 signature of an XMP segment, including the terminating NUL.
pub const JPEG_XMP_SIGNATURE: &[u8; 29] = b"http://ns.adobe.com/xap/1.0/\0";

// APP2 carries "ICC_PROFILE\0" followed by the chunk sequence number and the
// total chunk count.
pub const ICC_SIGNATURE: &[u8; 12] = b"ICC_PROFILE\0";
pub const ICC_HEADER_SIZE: usize = 14;
pub const ICC_SINGLE_CHUNK_SEQUENCE: u16 = 0x0101;

// PNG stream layout.

pub const PNG_MAGIC_BYTES: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
pub const PNG_CHUNK_NAME_SIZE: usize = 4;
pub const PNG_CRC_SIZE: usize = 4;

// PNG chunk lengths are limited to 2^31 - 1.
pub const PNG_MAXIMUM_CHUNK_LENGTH: u32 = 0x7FFF_FFFF;
pub const PNG_IHDR_LENGTH: u32 = 13;

/// iTXt keyword, NUL separator, compression flag/method and two empty
/// language/translated keyword fields.
pub const PNG_XMP_SIGNATURE: &[u8; 22] = b"XML:com.adobe.xmp\0\0\0\0\0";

// An iTXt chunk smaller than this cannot hold the signature plus a minimal
// XMP packet wrapper.
pub const PNG_XMP_MINIMUM_CHUNK_LENGTH: u32 = 22 + 54;

pub const PNG_SRGB_CHUNK_LENGTH: u32 = 1;
pub const PNG_CHRM_CHUNK_LENGTH: u32 = 32;
pub const PNG_GAMA_CHUNK_LENGTH: u32 = 4;

// cHRM and gAMA store values multiplied by 100000.
pub const PNG_FIXED_POINT_SCALE: f64 = 100_000.0;

// Colorimetry.

pub const DEFAULT_GAMMA: f64 = 2.2;
pub const EXIF_COLOR_SPACE_SRGB: u32 = 1;
pub const EXIF_COLOR_SPACE_ADOBE_RGB: u32 = 2;
pub const EXIF_COLOR_SPACE_UNCALIBRATED: u32 = 0xFFFF;

// Inflate defaults for compressed iCCP profiles.
pub const DEFAULT_INFLATE_STEP: usize = 1024;
pub const DEFAULT_MAXIMUM_ICC_SIZE: usize = 16 * 1024 * 1024;
