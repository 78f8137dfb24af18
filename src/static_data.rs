//! Static data: one record stored as N copies at fixed offsets. All copies written together get
//! the same generation, copies that were not selected or failed to write keep their older
//! generation and are recognized as stale.

use crate::block::{Block, Comparison, ReadOutcome};
use crate::error::Error;
use crate::layout::MAX_STATIC_DATA_COPIES;
use crate::platform::Platform;
use crate::Eeprom;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// Selects every static data copy
pub const ALL_COPIES: u8 = 0xFF;

/// The copies holding the highest valid generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GenerationScan {
    pub(crate) max_generation: u32,
    pub(crate) freshest: u8,
}

impl<T: Platform> Eeprom<T> {
    fn static_block(&self, index: usize) -> Block {
        let region = self.layout.static_data();
        Block::new(region, region.slot_offset(index))
    }

    fn selected_copies(&self, copies: u8) -> impl Iterator<Item = usize> + use<T> {
        (0..self.layout.static_data_copies() as usize).filter(move |index| copies & (1 << index) != 0)
    }

    /// Validates every copy. Copies with a CRC mismatch are ignored, no matter how high their
    /// generation is. Erased copies count as generation 0.
    pub(crate) fn scan_generations(&mut self) -> Result<GenerationScan, Error> {
        let mut generations = [None; MAX_STATIC_DATA_COPIES as usize];
        let mut max_generation = 0;

        for (index, generation) in generations
            .iter_mut()
            .take(self.layout.static_data_copies() as usize)
            .enumerate()
        {
            let validation = self.static_block(index).validate(&mut self.hal)?;
            if validation.crc_ok {
                *generation = Some(validation.header.generation);
                max_generation = max_generation.max(validation.header.generation);
            }
        }

        let freshest = generations
            .iter()
            .enumerate()
            .filter(|(_, generation)| **generation == Some(max_generation))
            .fold(0u8, |mask, (index, _)| mask | (1 << index));

        Ok(GenerationScan {
            max_generation,
            freshest,
        })
    }

    /// Reads the first valid copy selected by `copies` into `data` and returns its bit, or 0
    /// if none of the selected copies can be read. Stale copies are not repaired.
    pub fn read_static_data(&mut self, data: &mut [u8], copies: u8) -> Result<u8, Error> {
        Self::check_buffer(data.len(), self.layout.static_data().record_size())?;
        let result = self.read_static_data_copies(data, copies);
        self.track_fault(result)
    }

    fn read_static_data_copies(&mut self, data: &mut [u8], copies: u8) -> Result<u8, Error> {
        for index in self.selected_copies(copies) {
            match self.static_block(index).read(&mut self.hal, data)? {
                ReadOutcome::Valid(_) => return Ok(1 << index),
                ReadOutcome::NoData => {}
                ReadOutcome::Corrupt(_header) => {
                    #[cfg(feature = "defmt")]
                    warn!(
                        "static data copy {}: crc mismatch, generation {}",
                        index, _header.generation
                    );
                }
            }
        }
        Ok(0)
    }

    /// Writes `data` to the copies selected by `copies` and returns the bitset of copies that
    /// were verified. The new generation is the highest valid generation of all copies plus
    /// one. Writing fails (returns 0) if the area was never initialized or is unreadable.
    pub fn write_static_data(&mut self, data: &[u8], copies: u8) -> Result<u8, Error> {
        if self.faulted {
            return Err(Error::DeviceError);
        }
        Self::check_buffer(data.len(), self.layout.static_data().record_size())?;
        let result = self.write_static_data_copies(data, copies);
        self.track_fault(result)
    }

    fn write_static_data_copies(&mut self, data: &[u8], copies: u8) -> Result<u8, Error> {
        let scan = self.scan_generations()?;
        if scan.freshest == 0 {
            #[cfg(feature = "defmt")]
            warn!("static data: no valid copy, area not initialized");
            return Ok(0);
        }
        let Some(generation) = scan.max_generation.checked_add(1) else {
            #[cfg(feature = "defmt")]
            warn!("static data: generation overflow");
            return Ok(0);
        };

        #[cfg(feature = "defmt")]
        trace!("static data: write generation {}, copies {:#04x}", generation, copies);

        let attempts = self.layout.write_retries();
        let mut written = 0u8;
        for index in self.selected_copies(copies) {
            if self
                .static_block(index)
                .write(&mut self.hal, generation, data, attempts)?
            {
                written |= 1 << index;
            }
        }
        Ok(written)
    }

    /// Returns the bitset of selected copies that differ from `data` or hold no data. The
    /// payload is compared byte by byte.
    pub fn is_static_data_modified(&mut self, data: &[u8], copies: u8) -> Result<u8, Error> {
        Self::check_buffer(data.len(), self.layout.static_data().record_size())?;
        let result = self.compare_static_data_copies(data, copies);
        self.track_fault(result)
    }

    fn compare_static_data_copies(&mut self, data: &[u8], copies: u8) -> Result<u8, Error> {
        let mut modified = 0u8;
        for index in self.selected_copies(copies) {
            if self.static_block(index).compare(&mut self.hal, data)? != Comparison::Identical {
                modified |= 1 << index;
            }
        }
        Ok(modified)
    }
}
