//! Encoding and validation of a single slot: `[crc: u16][generation: u32][payload]`, all
//! little endian. The CRC covers the generation followed by the payload.

use crate::crc::CRC16_INIT;
use crate::error::Error;
use crate::layout::{HEADER_SIZE, Region};
use crate::platform::{ByteOps, Crc, Platform};
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// Payload bytes are streamed from the device in chunks of this size
const STREAM_CHUNK_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct BlockHeader {
    pub(crate) crc: u16,
    /// 0 marks an erased block that never held data
    pub(crate) generation: u32,
}

impl BlockHeader {
    pub(crate) fn new<T: Crc>(generation: u32, data: &[u8]) -> Self {
        Self {
            crc: T::crc16(Self::seed::<T>(generation), data),
            generation,
        }
    }

    /// CRC over the header without the CRC field itself
    fn seed<T: Crc>(generation: u32) -> u16 {
        T::crc16(CRC16_INIT, &generation.to_le_bytes())
    }

    fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let [c0, c1] = self.crc.to_le_bytes();
        let [g0, g1, g2, g3] = self.generation.to_le_bytes();
        [c0, c1, g0, g1, g2, g3]
    }

    fn from_bytes(raw: [u8; HEADER_SIZE]) -> Self {
        let [c0, c1, g0, g1, g2, g3] = raw;
        Self {
            crc: u16::from_le_bytes([c0, c1]),
            generation: u32::from_le_bytes([g0, g1, g2, g3]),
        }
    }
}

/// Display status of a block
#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockStatus {
    #[strum(serialize = "GOOD")]
    Good,
    #[strum(serialize = "BAD")]
    Bad,
    #[strum(serialize = "EMPTY")]
    Empty,
}

/// Result of validating a block on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Validation {
    pub(crate) header: BlockHeader,
    pub(crate) crc_ok: bool,
}

impl Validation {
    pub(crate) fn status(&self) -> BlockStatus {
        match (self.header.generation, self.crc_ok) {
            (0, _) => BlockStatus::Empty,
            (_, true) => BlockStatus::Good,
            (_, false) => BlockStatus::Bad,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// Generation 0, the payload was not read
    NoData,
    Valid(BlockHeader),
    /// The header is still reported, callers use the generation to fall back to older data
    Corrupt(BlockHeader),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparison {
    Identical,
    Different,
    NoData,
}

/// A single slot of a region
#[derive(Debug, Clone, Copy)]
pub(crate) struct Block {
    offset: usize,
    size: usize,
}

impl Block {
    pub(crate) fn new(region: &Region, offset: usize) -> Self {
        debug_assert!(
            region.contains(offset, region.block_size()),
            "block outside of its region"
        );
        Self {
            offset,
            size: region.record_size(),
        }
    }

    fn payload_offset(&self) -> usize {
        self.offset + HEADER_SIZE
    }

    pub(crate) fn load_header<T: Platform>(&self, hal: &mut T) -> Result<BlockHeader, Error> {
        let mut raw = [0u8; HEADER_SIZE];
        hal.read_bytes(self.offset, &mut raw)
            .map_err(|_| Error::DeviceError)?;
        Ok(BlockHeader::from_bytes(raw))
    }

    /// Calculates the CRC of the stored block without copying the payload to the caller.
    pub(crate) fn validate<T: Platform>(&self, hal: &mut T) -> Result<Validation, Error> {
        let header = self.load_header(hal)?;

        let mut crc = BlockHeader::seed::<T>(header.generation);
        let mut chunk = [0u8; STREAM_CHUNK_SIZE];
        let mut pos = 0;
        while pos < self.size {
            let len = STREAM_CHUNK_SIZE.min(self.size - pos);
            hal.read_bytes(self.payload_offset() + pos, &mut chunk[..len])
                .map_err(|_| Error::DeviceError)?;
            crc = T::crc16(crc, &chunk[..len]);
            pos += len;
        }

        #[cfg(feature = "debug-logs")]
        println!(
            "  block: validate @{:#06x}: crc: {:#06x}, stored: {:#06x}, generation: {}",
            self.offset, crc, header.crc, header.generation
        );

        Ok(Validation {
            header,
            crc_ok: crc == header.crc,
        })
    }

    /// Reads the payload into `data[..size]`. Blocks without data are not read.
    pub(crate) fn read<T: Platform>(&self, hal: &mut T, data: &mut [u8]) -> Result<ReadOutcome, Error> {
        let header = self.load_header(hal)?;
        if header.generation == 0 {
            return Ok(ReadOutcome::NoData);
        }

        let data = &mut data[..self.size];
        hal.read_bytes(self.payload_offset(), data)
            .map_err(|_| Error::DeviceError)?;

        #[cfg(feature = "debug-logs")]
        println!(
            "  block: read @{:#06x}: crc: {:#06x}, generation: {}",
            self.offset, header.crc, header.generation
        );

        if BlockHeader::new::<T>(header.generation, data).crc == header.crc {
            Ok(ReadOutcome::Valid(header))
        } else {
            Ok(ReadOutcome::Corrupt(header))
        }
    }

    /// Writes header and payload and reads the block back. Repeats up to `attempts` times until
    /// the device holds exactly what was written.
    pub(crate) fn write<T: Platform>(
        &self,
        hal: &mut T,
        generation: u32,
        data: &[u8],
        attempts: u8,
    ) -> Result<bool, Error> {
        let data = &data[..self.size];
        let header = BlockHeader::new::<T>(generation, data);

        #[cfg(feature = "debug-logs")]
        println!(
            "  block: write @{:#06x}: crc: {:#06x}, generation: {}",
            self.offset, header.crc, header.generation
        );

        for _attempt in 0..attempts.max(1) {
            #[cfg(feature = "defmt")]
            trace!(
                "write @{:#06x}: generation {}, attempt {}",
                self.offset,
                generation,
                _attempt + 1
            );

            hal.update_bytes(self.offset, &header.to_bytes())
                .map_err(|_| Error::DeviceError)?;
            hal.update_bytes(self.payload_offset(), data)
                .map_err(|_| Error::DeviceError)?;

            let validation = self.validate(hal)?;
            if validation.crc_ok && validation.header == header {
                return Ok(true);
            }
        }

        #[cfg(feature = "defmt")]
        warn!("write @{:#06x}: verification failed", self.offset);

        Ok(false)
    }

    /// Compares the stored block with `data` byte by byte instead of relying on the CRC alone.
    pub(crate) fn compare<T: Platform>(&self, hal: &mut T, data: &[u8]) -> Result<Comparison, Error> {
        let header = self.load_header(hal)?;
        if header.generation == 0 {
            return Ok(Comparison::NoData);
        }

        let data = &data[..self.size];
        if BlockHeader::new::<T>(header.generation, data).crc != header.crc {
            return Ok(Comparison::Different);
        }

        for (i, &expected) in data.iter().enumerate() {
            let stored = hal
                .read_byte(self.payload_offset() + i)
                .map_err(|_| Error::DeviceError)?;
            if stored != expected {
                return Ok(Comparison::Different);
            }
        }

        Ok(Comparison::Identical)
    }
}

/// Writes an empty header (generation 0 with a matching CRC) and a zeroed payload to every slot
/// of the region. Padding between slots is left untouched.
pub(crate) fn erase_blocks<T: Platform>(hal: &mut T, region: &Region) -> Result<(), Error> {
    let zeros = [0u8; STREAM_CHUNK_SIZE];
    let mut crc = BlockHeader::seed::<T>(0);
    let mut remaining = region.record_size();
    while remaining > 0 {
        let len = STREAM_CHUNK_SIZE.min(remaining);
        crc = T::crc16(crc, &zeros[..len]);
        remaining -= len;
    }
    let header = BlockHeader { crc, generation: 0 };

    #[cfg(feature = "defmt")]
    trace!(
        "erase @{:#06x}: {} slots of {} bytes",
        region.offset(),
        region.slots(),
        region.slot_size()
    );

    for offset in region.slot_offsets() {
        let block = Block::new(region, offset);
        hal.update_bytes(block.offset, &header.to_bytes())
            .map_err(|_| Error::DeviceError)?;

        let mut pos = 0;
        while pos < block.size {
            let len = STREAM_CHUNK_SIZE.min(block.size - pos);
            hal.update_bytes(block.payload_offset() + pos, &zeros[..len])
                .map_err(|_| Error::DeviceError)?;
            pos += len;
        }
    }

    Ok(())
}
