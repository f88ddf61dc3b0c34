//! Incremental metadata extraction for JPEG and PNG streams.
//!
//! Bytes are pushed into a [`MetadataReader`] in chunks of any size as they
//! arrive. The reader isolates the EXIF, XMP, ICC and IPTC blocks without
//! buffering the image, and can synthesize a colour profile from them.
//!
//! ```
//! use metastream_rs::{ImageType, MetadataReader};
//!
//! let mut reader = MetadataReader::new(ImageType::Jpeg);
//! for chunk in [&[0xFF, 0xD8][..], &[0xFF, 0xD9]] {
//!     reader.consume(chunk);
//! }
//! assert!(reader.get_raw_exif().is_none());
//! ```

pub mod block_copier;
pub mod color_profile;
pub mod colorimetry;
pub mod constants;
pub mod error;
pub mod jpeg_marker_code;
pub mod jpeg_metadata_reader;
pub mod metadata_reader;
pub mod options;
pub mod png_metadata_reader;
pub mod profile_synthesizer;
pub mod xmp;

pub use color_profile::{ColorProfile, ProfileSource};
pub use colorimetry::{Chromaticity, RgbColorimetry};
pub use error::MetadataError;
pub use jpeg_metadata_reader::{JpegMetadataReader, JpegReaderState};
pub use metadata_reader::{ImageType, MetadataReader, MetadataScanner};
pub use options::ReaderOptions;
pub use png_metadata_reader::{PngMetadataReader, PngReaderState};
pub use xmp::{XmpPacket, XmpProperty};
