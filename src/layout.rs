//! Configuration and the derived geometry of the storage.
//!
//! ```text
//! start_offset
//! |  reserved  | static copy 0 | ... | static copy N-1 | wl slot 0 | ... | wl slot M-1 | unused |
//!              ^ static_data.offset                    ^ wear_level.offset
//! ```
//!
//! Every slot holds a [`HEADER_SIZE`] byte header followed by the record and is padded to a
//! multiple of the page size, so a slot never straddles two pages if the device writes pages.

use crate::error::Error;

/// CRC (u16) followed by the generation (u32)
pub const HEADER_SIZE: usize = 6;

/// Static data copies are selected with an u8 bitset
pub const MAX_STATIC_DATA_COPIES: u8 = 8;

/// Storage configuration. Build it once, preferably in a const context:
///
/// ```
/// use eeprom_wl::layout::{Config, Layout};
///
/// const CONFIG: Config = Config::new(1024, 8, 5)
///     .with_static_data_copies(3)
///     .with_wear_level_data_copies(2);
/// const LAYOUT: Layout = match Layout::new(&CONFIG) {
///     Ok(layout) => layout,
///     Err(_) => panic!("storage does not fit"),
/// };
/// assert_eq!(LAYOUT.wear_level().offset(), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub(crate) capacity: usize,
    pub(crate) start_offset: usize,
    pub(crate) length: Option<usize>,
    pub(crate) reserved: usize,
    pub(crate) page_size: usize,
    pub(crate) static_data_size: usize,
    pub(crate) wear_level_data_size: usize,
    pub(crate) static_data_copies: u8,
    pub(crate) wear_level_data_copies: u8,
    pub(crate) write_retries: u8,
}

impl Config {
    /// `capacity` is the size of the whole device, the record sizes are the payload sizes
    /// without header.
    pub const fn new(capacity: usize, static_data_size: usize, wear_level_data_size: usize) -> Self {
        Self {
            capacity,
            start_offset: 0,
            length: None,
            reserved: 0,
            page_size: 1,
            static_data_size,
            wear_level_data_size,
            static_data_copies: 3,
            wear_level_data_copies: 2,
            write_retries: 3,
        }
    }

    /// First byte used. It is rounded up to the page size.
    pub const fn with_start_offset(mut self, start_offset: usize) -> Self {
        self.start_offset = start_offset;
        self
    }

    /// Number of bytes used starting at the start offset. Defaults to the rest of the device.
    pub const fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Bytes kept free in front of the static data
    pub const fn with_reserved(mut self, reserved: usize) -> Self {
        self.reserved = reserved;
        self
    }

    /// Slots are aligned to the page size
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Less than 2 copies cannot ensure data integrity
    pub const fn with_static_data_copies(mut self, copies: u8) -> Self {
        self.static_data_copies = copies;
        self
    }

    /// Number of consecutive slots written for every wear level write. With a single copy, a
    /// torn write falls back to the data of the previous write.
    pub const fn with_wear_level_data_copies(mut self, copies: u8) -> Self {
        self.wear_level_data_copies = copies;
        self
    }

    /// Write and verify attempts per block. 0 behaves like 1.
    pub const fn with_write_retries(mut self, retries: u8) -> Self {
        self.write_retries = retries;
        self
    }
}

/// A sequence of equally sized slots. The end of the region is checked for overflow on
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    offset: usize,
    record_size: usize,
    slot_size: usize,
    slots: usize,
}

impl Region {
    /// `None` if the region does not fit into the address space
    const fn new(offset: usize, record_size: usize, page_size: usize, slots: usize) -> Option<Self> {
        let Some(block_size) = record_size.checked_add(HEADER_SIZE) else {
            return None;
        };
        let Some(slot_size) = align_ceil(block_size, page_size) else {
            return None;
        };
        let Some(length) = slot_size.checked_mul(slots) else {
            return None;
        };
        if offset.checked_add(length).is_none() {
            return None;
        }

        Some(Self {
            offset,
            record_size,
            slot_size,
            slots,
        })
    }

    /// Absolute offset of the first slot
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Payload size without header
    pub const fn record_size(&self) -> usize {
        self.record_size
    }

    /// Header and payload
    pub const fn block_size(&self) -> usize {
        self.record_size + HEADER_SIZE
    }

    /// Block size rounded up to the page size
    pub const fn slot_size(&self) -> usize {
        self.slot_size
    }

    pub const fn slots(&self) -> usize {
        self.slots
    }

    pub const fn length(&self) -> usize {
        self.slot_size * self.slots
    }

    /// First byte after the region
    pub const fn end(&self) -> usize {
        self.offset + self.length()
    }

    pub const fn slot_offset(&self, index: usize) -> usize {
        self.offset + index * self.slot_size
    }

    pub const fn last_slot_offset(&self) -> usize {
        self.end() - self.slot_size
    }

    /// Offset of the slot `steps` slots after the slot at `offset`, wrapping around at the end
    pub(crate) const fn slot_after(&self, offset: usize, steps: usize) -> usize {
        let index = (offset - self.offset) / self.slot_size;
        self.slot_offset((index + steps % self.slots) % self.slots)
    }

    pub(crate) fn slot_offsets(&self) -> impl Iterator<Item = usize> + use<> {
        let (offset, slot_size) = (self.offset, self.slot_size);
        (0..self.slots).map(move |index| offset + index * slot_size)
    }

    pub(crate) const fn contains(&self, offset: usize, size: usize) -> bool {
        offset >= self.offset && offset + size <= self.end()
    }
}

/// The geometry derived from a [`Config`]. It is immutable and cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Layout {
    capacity: usize,
    page_size: usize,
    start_offset: usize,
    length: usize,
    static_data: Region,
    wear_level: Region,
    wear_level_data_copies: u8,
    write_retries: u8,
}

impl Layout {
    /// Computes the geometry and verifies that it fits into the device. The wear level ring has
    /// to hold more generations than copies written per cycle.
    pub const fn new(config: &Config) -> Result<Layout, Error> {
        let page_size = config.page_size;
        if page_size == 0 {
            return Err(Error::InvalidPageSize);
        }
        if config.static_data_copies == 0
            || config.static_data_copies > MAX_STATIC_DATA_COPIES
            || config.wear_level_data_copies == 0
        {
            return Err(Error::InvalidCopies);
        }

        // device offsets are u32
        if config.capacity > u32::MAX as usize {
            return Err(Error::RegionExceedsDevice);
        }

        let Some(start_offset) = align_ceil(config.start_offset, page_size) else {
            return Err(Error::RegionExceedsDevice);
        };
        let length = match config.length {
            Some(length) => length,
            None => config.capacity.saturating_sub(start_offset),
        };
        let length = align_floor(length, page_size);
        if start_offset.saturating_add(length) > config.capacity {
            return Err(Error::RegionExceedsDevice);
        }

        let Some(static_data_offset) =
            align_ceil(start_offset.saturating_add(config.reserved), page_size)
        else {
            return Err(Error::RegionExceedsDevice);
        };
        let Some(static_data) = Region::new(
            static_data_offset,
            config.static_data_size,
            page_size,
            config.static_data_copies as usize,
        ) else {
            return Err(Error::RegionExceedsDevice);
        };

        let Some(wear_level_offset) = align_ceil(static_data.end(), page_size) else {
            return Err(Error::RegionExceedsDevice);
        };
        if wear_level_offset - start_offset > length {
            return Err(Error::RegionExceedsDevice);
        }
        let wear_level_max_length = length - (wear_level_offset - start_offset);
        let Some(empty_ring) = Region::new(wear_level_offset, config.wear_level_data_size, page_size, 0)
        else {
            return Err(Error::RegionExceedsDevice);
        };
        let Some(wear_level) = Region::new(
            wear_level_offset,
            config.wear_level_data_size,
            page_size,
            wear_level_max_length / empty_ring.slot_size,
        ) else {
            return Err(Error::RegionExceedsDevice);
        };

        let held = wear_level.slots / config.wear_level_data_copies as usize;
        if held <= config.wear_level_data_copies as usize {
            return Err(Error::InsufficientGenerations {
                held,
                copies: config.wear_level_data_copies,
            });
        }

        Ok(Layout {
            capacity: config.capacity,
            page_size,
            start_offset,
            length,
            static_data,
            wear_level,
            wear_level_data_copies: config.wear_level_data_copies,
            write_retries: config.write_retries,
        })
    }

    /// Size of the device this layout was computed for
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub const fn start_offset(&self) -> usize {
        self.start_offset
    }

    /// Usable length starting at [`Layout::start_offset`]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// First byte after the usable area
    pub const fn end(&self) -> usize {
        self.start_offset + self.length
    }

    pub const fn static_data(&self) -> &Region {
        &self.static_data
    }

    pub const fn static_data_copies(&self) -> u8 {
        self.static_data.slots as u8
    }

    /// Bitset with one bit per static data copy
    pub const fn static_data_mask(&self) -> u8 {
        (((1u16) << self.static_data.slots) - 1) as u8
    }

    pub const fn wear_level(&self) -> &Region {
        &self.wear_level
    }

    /// Redundancy factor: slots written per wear level write
    pub const fn wear_level_data_copies(&self) -> u8 {
        self.wear_level_data_copies
    }

    /// Number of write cycles the ring holds before it wraps
    pub const fn wear_level_generations(&self) -> usize {
        self.wear_level.slots / self.wear_level_data_copies as usize
    }

    pub const fn write_retries(&self) -> u8 {
        self.write_retries
    }

    /// Bytes after the wear level area that are not used
    pub const fn unused(&self) -> usize {
        self.end() - self.wear_level.end()
    }
}

#[inline(always)]
const fn align_ceil(size: usize, alignment: usize) -> Option<usize> {
    let Some(padded) = size.checked_add(alignment - 1) else {
        return None;
    };
    if alignment.is_power_of_two() {
        Some(padded & !(alignment - 1))
    } else {
        Some(padded / alignment * alignment)
    }
}

#[inline(always)]
const fn align_floor(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size & !(alignment - 1)
    } else {
        size / alignment * alignment
    }
}
