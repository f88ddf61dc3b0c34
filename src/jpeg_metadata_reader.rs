//! Incremental scanner for metadata segments in a JPEG marker stream.
//!
//! The scanner looks at APPn and COM segments only. APP1 segments are
//! classified as EXIF or XMP by their signature, APP2 carries a single chunk
//! ICC profile and APP14 is captured as IPTC. Scanning stops at the first
//! byte that does not fit the marker structure, which in practice is the
//! first non-APPn segment's payload.

use crate::block_copier::PendingCopy;
use crate::constants::{
    EXIF_SIGNATURE, ICC_HEADER_SIZE, ICC_SIGNATURE, ICC_SINGLE_CHUNK_SEQUENCE, JPEG_XMP_SIGNATURE,
    SEGMENT_LENGTH_SIZE,
};
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::metadata_reader::MetadataScanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegReaderState {
    /// Expecting the 0xFF marker start byte.
    Read,
    ReadMarker,
    ReadSizeHighByte,
    ReadSizeLowByte,
    SkipBytes,
    /// Gathering the APP1 signature.
    ReadApp1,
    ReadExif,
    ReadXmp,
    ReadIcc,
    ReadIptc,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegBlock {
    Exif,
    Xmp,
    Icc,
    Iptc,
}

impl JpegBlock {
    fn read_state(self) -> JpegReaderState {
        match self {
            JpegBlock::Exif => JpegReaderState::ReadExif,
            JpegBlock::Xmp => JpegReaderState::ReadXmp,
            JpegBlock::Icc => JpegReaderState::ReadIcc,
            JpegBlock::Iptc => JpegReaderState::ReadIptc,
        }
    }
}

/// Classifies an APP1 segment from its leading bytes.
///
/// `signature` holds up to the first 29 bytes of the segment body; an XMP
/// match requires all 29.
pub fn identify_app1(signature: &[u8]) -> Option<JpegBlock> {
    if signature.starts_with(EXIF_SIGNATURE) {
        Some(JpegBlock::Exif)
    } else if signature == JPEG_XMP_SIGNATURE {
        Some(JpegBlock::Xmp)
    } else {
        None
    }
}

/// Checks the APP2 identification header of a captured ICC block.
///
/// Only profiles stored in a single chunk (sequence 1 of 1) are accepted.
pub fn is_single_chunk_icc(block: &[u8]) -> bool {
    block.len() >= ICC_HEADER_SIZE
        && block.starts_with(ICC_SIGNATURE)
        && u16::from_le_bytes([block[12], block[13]]) == ICC_SINGLE_CHUNK_SEQUENCE
}

#[derive(Debug)]
pub struct JpegMetadataReader {
    state: JpegReaderState,
    last_marker: Option<JpegMarkerCode>,
    size: usize,
    pending: PendingCopy,
    app1_signature: [u8; 29],
    block: Vec<u8>,
    exif: Option<Vec<u8>>,
    xmp: Option<Vec<u8>>,
    icc: Option<Vec<u8>>,
    iptc: Option<Vec<u8>>,
}

impl Default for JpegMetadataReader {
    fn default() -> Self {
        Self::new()
    }
}

impl JpegMetadataReader {
    pub fn new() -> Self {
        Self {
            state: JpegReaderState::Read,
            last_marker: None,
            size: 0,
            pending: PendingCopy::default(),
            app1_signature: [0u8; 29],
            block: Vec::new(),
            exif: None,
            xmp: None,
            icc: None,
            iptc: None,
        }
    }

    pub fn state(&self) -> JpegReaderState {
        self.state
    }

    pub fn finished(&self) -> bool {
        self.state == JpegReaderState::Finished
    }

    pub fn consume(&mut self, buf: &[u8]) {
        let mut position = 0;

        while position < buf.len() && self.state != JpegReaderState::Finished {
            match self.state {
                JpegReaderState::Read => {
                    let byte = buf[position];
                    position += 1;
                    if byte == JPEG_MARKER_START_BYTE {
                        self.state = JpegReaderState::ReadMarker;
                    } else {
                        log::trace!("jpeg: expected marker start, found {:#04x}; stopping", byte);
                        self.state = JpegReaderState::Finished;
                    }
                }
                JpegReaderState::ReadMarker => {
                    let byte = buf[position];
                    position += 1;
                    match JpegMarkerCode::from_segment_byte(byte) {
                        Some(marker) => {
                            log::trace!("jpeg: APPx or COM marker {:?}", marker);
                            self.last_marker = Some(marker);
                            self.size = 0;
                            self.state = JpegReaderState::ReadSizeHighByte;
                        }
                        None => self.state = JpegReaderState::Read,
                    }
                }
                JpegReaderState::ReadSizeHighByte => {
                    self.size = usize::from(buf[position]) << 8;
                    position += 1;
                    self.state = JpegReaderState::ReadSizeLowByte;
                }
                JpegReaderState::ReadSizeLowByte => {
                    self.size |= usize::from(buf[position]);
                    position += 1;
                    self.size = self.size.saturating_sub(SEGMENT_LENGTH_SIZE);
                    self.begin_segment();
                }
                JpegReaderState::SkipBytes => {
                    self.state = self.pending.skip(
                        buf,
                        &mut position,
                        JpegReaderState::Read,
                        JpegReaderState::SkipBytes,
                    );
                }
                JpegReaderState::ReadApp1 => self.read_app1(buf, &mut position),
                JpegReaderState::ReadExif => self.read_block(JpegBlock::Exif, buf, &mut position),
                JpegReaderState::ReadXmp => self.read_block(JpegBlock::Xmp, buf, &mut position),
                JpegReaderState::ReadIcc => self.read_block(JpegBlock::Icc, buf, &mut position),
                JpegReaderState::ReadIptc => self.read_block(JpegBlock::Iptc, buf, &mut position),
                JpegReaderState::Finished => {}
            }
        }
    }

    fn begin_segment(&mut self) {
        let marker = self.last_marker.take();
        self.pending = PendingCopy::new(self.size);

        if self.size == 0 {
            self.state = JpegReaderState::Read;
            return;
        }

        self.state = match marker {
            Some(JpegMarkerCode::ApplicationData1) if self.exif.is_none() || self.xmp.is_none() => {
                self.pending = PendingCopy::new(self.size.min(JPEG_XMP_SIGNATURE.len()));
                JpegReaderState::ReadApp1
            }
            // The first 14 bytes are the identification header.
            Some(JpegMarkerCode::ApplicationData2)
                if self.icc.is_none() && self.size > ICC_HEADER_SIZE =>
            {
                self.start_block(&[]);
                JpegReaderState::ReadIcc
            }
            Some(JpegMarkerCode::ApplicationData14) if self.iptc.is_none() => {
                self.start_block(&[]);
                JpegReaderState::ReadIptc
            }
            _ => JpegReaderState::SkipBytes,
        };
    }

    fn read_app1(&mut self, buf: &[u8], position: &mut usize) {
        let signature_len = self.size.min(JPEG_XMP_SIGNATURE.len());
        let complete = self.pending.copy_into(
            &mut self.app1_signature[..signature_len],
            buf,
            position,
            true,
            false,
        );
        if !complete {
            return;
        }

        let signature = self.app1_signature;
        let signature = &signature[..signature_len];
        let target = match identify_app1(signature) {
            Some(JpegBlock::Exif) if self.exif.is_none() => Some(JpegBlock::Exif),
            Some(JpegBlock::Xmp) if self.xmp.is_none() => Some(JpegBlock::Xmp),
            other => {
                log::trace!("jpeg: skipping APP1 segment ({:?}), {} bytes", other, self.size);
                None
            }
        };

        self.pending = PendingCopy::new(self.size - signature_len);
        match target {
            Some(block) => {
                log::debug!("jpeg: reading {:?} segment, {} bytes", block, self.size);
                self.start_block(signature);
                if self.pending.is_complete() {
                    self.store_block(block);
                } else {
                    self.state = block.read_state();
                }
            }
            None if self.pending.is_complete() => self.state = JpegReaderState::Read,
            None => self.state = JpegReaderState::SkipBytes,
        }
    }

    fn start_block(&mut self, prefix: &[u8]) {
        self.block = Vec::with_capacity(self.size);
        self.block.extend_from_slice(prefix);
    }

    fn read_block(&mut self, target: JpegBlock, buf: &[u8], position: &mut usize) {
        if self.pending.copy_block(&mut self.block, buf, position, true, false) {
            self.store_block(target);
        }
    }

    fn store_block(&mut self, target: JpegBlock) {
        let block = std::mem::take(&mut self.block);
        self.state = JpegReaderState::Read;

        match target {
            JpegBlock::Exif => self.exif = Some(block),
            JpegBlock::Xmp => self.xmp = Some(block),
            JpegBlock::Iptc => self.iptc = Some(block),
            JpegBlock::Icc => {
                if !is_single_chunk_icc(&block) {
                    // Multi-chunk profiles land here as well.
                    log::debug!("jpeg: supposed ICC segment did not validate; stopping");
                    self.state = JpegReaderState::Finished;
                    return;
                }
                self.icc = Some(block);
            }
        }

        if self.exif.is_some() && self.xmp.is_some() && self.icc.is_some() && self.iptc.is_some() {
            self.state = JpegReaderState::Finished;
        }
    }

    /// The captured EXIF segment body, starting with "Exif\0\0".
    pub fn exif(&self) -> Option<&[u8]> {
        self.exif.as_deref()
    }

    /// Moves the captured EXIF block out of the reader.
    pub fn take_exif(&mut self) -> Option<Vec<u8>> {
        self.exif.take()
    }

    /// The captured XMP segment body, including its namespace signature.
    pub fn xmp(&self) -> Option<&[u8]> {
        self.xmp.as_deref()
    }

    /// The captured ICC segment body, including the 14 byte APP2 header.
    pub fn icc(&self) -> Option<&[u8]> {
        self.icc.as_deref()
    }

    pub fn iptc(&self) -> Option<&[u8]> {
        self.iptc.as_deref()
    }

    pub fn take_iptc(&mut self) -> Option<Vec<u8>> {
        self.iptc.take()
    }
}

impl MetadataScanner for JpegMetadataReader {
    fn consume(&mut self, buf: &[u8]) {
        JpegMetadataReader::consume(self, buf)
    }

    fn finished(&self) -> bool {
        JpegMetadataReader::finished(self)
    }
}
