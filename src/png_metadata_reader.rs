//! Incremental scanner for metadata chunks in a PNG stream.
//!
//! Every captured chunk is verified against its CRC32 before it is kept. A
//! CRC mismatch ends the scan; a bad XMP signature only drops that chunk.

use flate2::Crc;

use crate::block_copier::PendingCopy;
use crate::constants::{
    PNG_CHRM_CHUNK_LENGTH, PNG_CHUNK_NAME_SIZE, PNG_CRC_SIZE, PNG_GAMA_CHUNK_LENGTH, PNG_IHDR_LENGTH,
    PNG_MAGIC_BYTES, PNG_MAXIMUM_CHUNK_LENGTH, PNG_SRGB_CHUNK_LENGTH, PNG_XMP_MINIMUM_CHUNK_LENGTH,
    PNG_XMP_SIGNATURE,
};
use crate::metadata_reader::MetadataScanner;

// Chunk buffers grow with the data actually received past this size.
const PREALLOCATION_LIMIT: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngReaderState {
    ReadMagic,
    ReadSizeHighHighByte,
    ReadSizeHighLowByte,
    ReadSizeLowHighByte,
    ReadSizeLowLowByte,
    ReadChunkName,
    SkipBytes,
    CheckCrc,
    SkipCrc,
    ReadXmpItxt,
    ReadIccp,
    ReadSrgb,
    ReadChrm,
    ReadGama,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngBlock {
    Xmp,
    Icc,
    Srgb,
    Chrm,
    Gama,
}

impl PngBlock {
    fn read_state(self) -> PngReaderState {
        match self {
            PngBlock::Xmp => PngReaderState::ReadXmpItxt,
            PngBlock::Icc => PngReaderState::ReadIccp,
            PngBlock::Srgb => PngReaderState::ReadSrgb,
            PngBlock::Chrm => PngReaderState::ReadChrm,
            PngBlock::Gama => PngReaderState::ReadGama,
        }
    }
}

/// CRC32 over the chunk type followed by the chunk data.
pub fn chunk_crc(chunk_name: &[u8; 4], data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(chunk_name);
    crc.update(data);
    crc.sum()
}

#[derive(Debug)]
pub struct PngMetadataReader {
    state: PngReaderState,
    sub_step: usize,
    size: u32,
    chunk_name: [u8; PNG_CHUNK_NAME_SIZE],
    has_ihdr: bool,
    pending: PendingCopy,
    current: Option<PngBlock>,
    block: Vec<u8>,
    target_crc: u32,
    xmp: Option<Vec<u8>>,
    icc: Option<Vec<u8>>,
    srgb: Option<Vec<u8>>,
    chrm: Option<Vec<u8>>,
    gama: Option<Vec<u8>>,
}

impl Default for PngMetadataReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PngMetadataReader {
    pub fn new() -> Self {
        Self {
            state: PngReaderState::ReadMagic,
            sub_step: 0,
            size: 0,
            chunk_name: [0u8; PNG_CHUNK_NAME_SIZE],
            has_ihdr: false,
            pending: PendingCopy::default(),
            current: None,
            block: Vec::new(),
            target_crc: 0,
            xmp: None,
            icc: None,
            srgb: None,
            chrm: None,
            gama: None,
        }
    }

    pub fn state(&self) -> PngReaderState {
        self.state
    }

    pub fn finished(&self) -> bool {
        self.state == PngReaderState::Finished
    }

    pub fn consume(&mut self, buf: &[u8]) {
        let mut position = 0;

        while position < buf.len() && self.state != PngReaderState::Finished {
            match self.state {
                PngReaderState::ReadMagic => {
                    let byte = buf[position];
                    position += 1;
                    if byte != PNG_MAGIC_BYTES[self.sub_step] {
                        log::trace!("png: signature mismatch at byte {}", self.sub_step);
                        self.state = PngReaderState::Finished;
                    } else if self.sub_step == PNG_MAGIC_BYTES.len() - 1 {
                        self.sub_step = 0;
                        self.state = PngReaderState::ReadSizeHighHighByte;
                    } else {
                        self.sub_step += 1;
                    }
                }
                PngReaderState::ReadSizeHighHighByte => {
                    self.size = u32::from(buf[position]) << 24;
                    position += 1;
                    self.state = PngReaderState::ReadSizeHighLowByte;
                }
                PngReaderState::ReadSizeHighLowByte => {
                    self.size |= u32::from(buf[position]) << 16;
                    position += 1;
                    self.state = PngReaderState::ReadSizeLowHighByte;
                }
                PngReaderState::ReadSizeLowHighByte => {
                    self.size |= u32::from(buf[position]) << 8;
                    position += 1;
                    self.state = PngReaderState::ReadSizeLowLowByte;
                }
                PngReaderState::ReadSizeLowLowByte => {
                    self.size |= u32::from(buf[position]);
                    position += 1;
                    if self.size <= PNG_MAXIMUM_CHUNK_LENGTH {
                        self.sub_step = 0;
                        self.state = PngReaderState::ReadChunkName;
                    } else {
                        log::debug!("png: chunk size {:#x} larger than 2^31-1; stopping", self.size);
                        self.state = PngReaderState::Finished;
                    }
                }
                PngReaderState::ReadChunkName => {
                    self.chunk_name[self.sub_step] = buf[position];
                    position += 1;
                    self.sub_step += 1;
                    if self.sub_step == PNG_CHUNK_NAME_SIZE {
                        self.sub_step = 0;
                        self.begin_chunk();
                    }
                }
                PngReaderState::SkipBytes | PngReaderState::SkipCrc => {
                    self.state = self.pending.skip(
                        buf,
                        &mut position,
                        PngReaderState::ReadSizeHighHighByte,
                        self.state,
                    );
                }
                PngReaderState::CheckCrc => {
                    self.target_crc = (self.target_crc << 8) | u32::from(buf[position]);
                    position += 1;
                    self.sub_step += 1;
                    if self.sub_step == PNG_CRC_SIZE {
                        self.sub_step = 0;
                        self.check_crc();
                    }
                }
                PngReaderState::ReadXmpItxt
                | PngReaderState::ReadIccp
                | PngReaderState::ReadSrgb
                | PngReaderState::ReadChrm
                | PngReaderState::ReadGama => {
                    if self.pending.copy_block(&mut self.block, buf, &mut position, true, false) {
                        self.end_chunk_data();
                    }
                }
                PngReaderState::Finished => {}
            }
        }
    }

    fn begin_chunk(&mut self) {
        let size = self.size;

        if !self.has_ihdr {
            if size == PNG_IHDR_LENGTH && &self.chunk_name == b"IHDR" {
                self.has_ihdr = true;
            } else {
                log::debug!("png: first chunk is not a valid IHDR; stopping");
                self.state = PngReaderState::Finished;
                return;
            }
        }

        let target = match &self.chunk_name {
            b"iTXt" if size > PNG_XMP_MINIMUM_CHUNK_LENGTH && self.xmp.is_none() => {
                Some(PngBlock::Xmp)
            }
            b"iCCP" if self.icc.is_none() => Some(PngBlock::Icc),
            b"sRGB" if size == PNG_SRGB_CHUNK_LENGTH && self.srgb.is_none() => Some(PngBlock::Srgb),
            b"cHRM" if size == PNG_CHRM_CHUNK_LENGTH && self.chrm.is_none() => Some(PngBlock::Chrm),
            b"gAMA" if size == PNG_GAMA_CHUNK_LENGTH && self.gama.is_none() => Some(PngBlock::Gama),
            b"IEND" => {
                self.state = PngReaderState::Finished;
                return;
            }
            _ => None,
        };

        let size = size as usize;
        match target {
            Some(block) => {
                log::trace!("png: reading {:?} chunk, {} bytes", block, size);
                self.current = Some(block);
                self.block = Vec::with_capacity(size.min(PREALLOCATION_LIMIT));
                self.pending = PendingCopy::new(size);
                if self.pending.is_complete() {
                    self.end_chunk_data();
                } else {
                    self.state = block.read_state();
                }
            }
            None => {
                // Chunk data and the trailing CRC are skipped together.
                self.pending = PendingCopy::new(size + PNG_CRC_SIZE);
                self.state = PngReaderState::SkipBytes;
            }
        }
    }

    fn end_chunk_data(&mut self) {
        if self.current == Some(PngBlock::Xmp) && !self.block.starts_with(PNG_XMP_SIGNATURE) {
            log::debug!("png: iTXt chunk is not an XMP packet; ignoring");
            self.discard_block();
            self.pending = PendingCopy::new(PNG_CRC_SIZE);
            self.state = PngReaderState::SkipCrc;
            return;
        }

        self.sub_step = 0;
        self.target_crc = 0;
        self.state = PngReaderState::CheckCrc;
    }

    fn check_crc(&mut self) {
        let crc = chunk_crc(&self.chunk_name, &self.block);
        log::trace!("png: checking CRC: chunk {:#010x}, target {:#010x}", crc, self.target_crc);

        if crc != self.target_crc {
            log::debug!(
                "png: CRC mismatch in {} chunk; stopping",
                String::from_utf8_lossy(&self.chunk_name)
            );
            self.discard_block();
            self.state = PngReaderState::Finished;
            return;
        }

        let block = std::mem::take(&mut self.block);
        match self.current.take() {
            Some(PngBlock::Xmp) => self.xmp = Some(block),
            Some(PngBlock::Icc) => self.icc = Some(block),
            Some(PngBlock::Srgb) => self.srgb = Some(block),
            Some(PngBlock::Chrm) => self.chrm = Some(block),
            Some(PngBlock::Gama) => self.gama = Some(block),
            None => {}
        }
        self.state = PngReaderState::ReadSizeHighHighByte;
    }

    fn discard_block(&mut self) {
        self.block = Vec::new();
        self.current = None;
    }

    /// The captured iTXt chunk data, starting with the XMP keyword header.
    pub fn xmp(&self) -> Option<&[u8]> {
        self.xmp.as_deref()
    }

    /// The captured iCCP chunk data: profile name, compression method and
    /// the compressed profile.
    pub fn icc(&self) -> Option<&[u8]> {
        self.icc.as_deref()
    }

    pub fn srgb(&self) -> Option<&[u8]> {
        self.srgb.as_deref()
    }

    pub fn chrm(&self) -> Option<&[u8]> {
        self.chrm.as_deref()
    }

    pub fn gama(&self) -> Option<&[u8]> {
        self.gama.as_deref()
    }
}

impl MetadataScanner for PngMetadataReader {
    fn consume(&mut self, buf: &[u8]) {
        PngMetadataReader::consume(self, buf)
    }

    fn finished(&self) -> bool {
        PngMetadataReader::finished(self)
    }
}
