#![doc = include_str ! ("../README.md")]
#![cfg_attr(not(target_arch = "x86_64"), no_std)]

mod block;
pub mod crc;
mod dump;
pub mod error;
pub mod layout;
pub mod platform;
mod record;
mod static_data;
mod wear_level;

pub use block::BlockStatus;
pub use record::Record;
pub use static_data::ALL_COPIES;

extern crate alloc;

use crate::error::Error;
use crate::layout::Layout;
use crate::platform::Platform;
#[cfg(feature = "defmt")]
use defmt::trace;

/// Selects the areas for [`Eeprom::erase_and_initialize`] and [`Eeprom::dump`]
#[derive(strum::FromRepr, strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Area {
    Static = 0x01,
    WearLevel = 0x02,
    All = 0x03,
}

impl Area {
    pub(crate) fn contains(self, other: Area) -> bool {
        self as u8 & other as u8 != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BasicInfo {
    pub static_data: StaticDataInfo,
    pub wear_level_data: WearLevelDataInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StaticDataInfo {
    /// Number of copies holding the latest generation
    pub valid: u8,
    /// Bitset of the copies holding the latest generation
    pub valid_bits: u8,
    pub copies: u8,
    /// Equals the latest generation
    pub write_cycles: u32,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WearLevelDataInfo {
    pub valid: bool,
    /// Approximation: latest generation divided by the number of slots
    pub write_cycles: u32,
    pub generation: u32,
    pub size: usize,
}

/// The storage instance. It does not cache any data, the device is the only source of truth.
/// Concurrent access has to be serialized by the caller, e.g. by wrapping the instance in a
/// critical section mutex.
pub struct Eeprom<T: Platform> {
    pub(crate) hal: T,
    pub(crate) layout: Layout,
    /// Number of times the wear level ring wrapped around since creation. Diagnostics only.
    pub(crate) rotations: u32,
    pub(crate) faulted: bool,
}

impl<T: Platform> Eeprom<T> {
    /// Takes ownership of the device. Fails without any I/O if the layout does not fit into
    /// the device.
    pub fn new(layout: Layout, hal: T) -> Result<Eeprom<T>, Error> {
        if layout.end() > hal.capacity() {
            return Err(Error::RegionExceedsDevice);
        }

        Ok(Self {
            hal,
            layout,
            rotations: 0,
            faulted: false,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Wear level ring wraparounds observed by this instance
    pub fn rotations(&self) -> u32 {
        self.rotations
    }

    pub fn device(&self) -> &T {
        &self.hal
    }

    pub fn device_mut(&mut self) -> &mut T {
        &mut self.hal
    }

    /// Returns the device
    pub fn release(self) -> T {
        self.hal
    }

    /// Clears the selected areas: every slot gets generation 0, a zeroed payload and a valid
    /// CRC. Reads fail until data is written once, writes succeed afterwards.
    pub fn erase_and_initialize(&mut self, area: Area) -> Result<(), Error> {
        if self.faulted {
            return Err(Error::DeviceError);
        }

        #[cfg(feature = "defmt")]
        trace!("erase_and_initialize: {}", area);

        let result = self.erase_areas(area);
        self.track_fault(result)
    }

    fn erase_areas(&mut self, area: Area) -> Result<(), Error> {
        if area.contains(Area::Static) {
            block::erase_blocks(&mut self.hal, self.layout.static_data())?;
        }
        if area.contains(Area::WearLevel) {
            block::erase_blocks(&mut self.hal, self.layout.wear_level())?;
        }
        Ok(())
    }

    /// Scans both areas
    pub fn basic_info(&mut self) -> Result<BasicInfo, Error> {
        let result = self.scan_basic_info();
        self.track_fault(result)
    }

    fn scan_basic_info(&mut self) -> Result<BasicInfo, Error> {
        let scan = self.scan_generations()?;
        let latest = self.find_slot(0, u32::MAX)?;
        let generation = latest.map_or(0, |slot| slot.generation);

        Ok(BasicInfo {
            static_data: StaticDataInfo {
                valid: scan.freshest.count_ones() as u8,
                valid_bits: scan.freshest,
                copies: self.layout.static_data_copies(),
                write_cycles: scan.max_generation,
                size: self.layout.static_data().record_size(),
            },
            wear_level_data: WearLevelDataInfo {
                valid: latest.is_some(),
                write_cycles: generation / self.layout.wear_level().slots() as u32,
                generation,
                size: self.layout.wear_level().record_size(),
            },
        })
    }

    /// Remembers device failures. Once faulted, mutating operations are refused.
    pub(crate) fn track_fault<R>(&mut self, result: Result<R, Error>) -> Result<R, Error> {
        if let Err(Error::DeviceError) = result {
            self.faulted = true;
        }
        result
    }

    pub(crate) fn check_buffer(len: usize, size: usize) -> Result<(), Error> {
        if len < size {
            return Err(Error::BufferTooSmall);
        }
        Ok(())
    }
}
