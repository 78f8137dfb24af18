//! Human readable diagnostics. Output goes to any `core::fmt::Write` sink.

use crate::block::Block;
use crate::error::Error;
use crate::platform::Platform;
use crate::{Area, BasicInfo, Eeprom};
use core::fmt::{self, Display, Formatter, Write};

impl<T: Platform> Eeprom<T> {
    /// Prints the geometry. Ranges are `offset:length`.
    pub fn dump_offsets<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        let layout = &self.layout;
        let static_data = layout.static_data();
        let wear_level = layout.wear_level();

        writeln!(out, "page size:        {}", layout.page_size())?;
        writeln!(out, "start:            {}:{}", layout.start_offset(), layout.length())?;
        writeln!(
            out,
            "static:           {}:{} (copies {}, size {}/{}/{})",
            static_data.offset(),
            static_data.length(),
            static_data.slots(),
            static_data.record_size(),
            static_data.block_size(),
            static_data.slot_size()
        )?;
        writeln!(out, "end:              {}", static_data.end() - 1)?;
        writeln!(
            out,
            "wear level:       {}:{} (slots {}, generations {}, copies {}, size {}/{}/{})",
            wear_level.offset(),
            wear_level.length(),
            wear_level.slots(),
            layout.wear_level_generations(),
            layout.wear_level_data_copies(),
            wear_level.record_size(),
            wear_level.block_size(),
            wear_level.slot_size()
        )?;
        writeln!(out, "end:              {}", wear_level.end() - 1)?;
        writeln!(out, "unused:           {}:{}", wear_level.end(), layout.unused())?;
        writeln!(out, "device end:       {}", layout.end() - 1)?;
        Ok(())
    }

    /// Prints the geometry followed by the state of every slot of the selected areas
    pub fn dump<W: Write>(&mut self, out: &mut W, area: Area) -> Result<(), Error> {
        let result = self.dump_slots(out, area);
        self.track_fault(result)
    }

    fn dump_slots<W: Write>(&mut self, out: &mut W, area: Area) -> Result<(), Error> {
        let copies = self.layout.static_data_copies();
        let scan = self.scan_generations()?;

        self.dump_offsets(out)?;

        write!(out, "Static data: {} / {} (", scan.freshest.count_ones(), copies)?;
        for index in 0..copies {
            out.write_char(if scan.freshest & (1 << index) != 0 { '1' } else { 'x' })?;
        }
        writeln!(out, ")")?;

        match self.find_slot(0, u32::MAX)? {
            Some(slot) => writeln!(
                out,
                "Wear level: offset = {}, generation = {}",
                slot.offset, slot.generation
            )?,
            None => writeln!(out, "Wear level: no valid data")?,
        }
        writeln!(out, "Rotations: {}", self.rotations)?;

        if area.contains(Area::Static) {
            let region = *self.layout.static_data();
            writeln!(out, "Ofs   CRC  Gen      Status")?;
            for offset in region.slot_offsets() {
                let validation = Block::new(&region, offset).validate(&mut self.hal)?;
                writeln!(
                    out,
                    "{:04x}: {:04x} {:08x} {}",
                    offset,
                    validation.header.crc,
                    validation.header.generation,
                    validation.status()
                )?;
            }
        }

        if area.contains(Area::WearLevel) {
            let region = *self.layout.wear_level();
            let copies = self.layout.wear_level_data_copies() as u32;
            let generations = self.layout.wear_level_generations() as u32;
            writeln!(out, "Slot  Ofs  Cycle CRC  Gen      Status")?;
            for (index, offset) in region.slot_offsets().enumerate() {
                let validation = Block::new(&region, offset).validate(&mut self.hal)?;
                let cycle = (validation.header.generation.saturating_sub(1) / copies) % generations;
                writeln!(
                    out,
                    "{:>2}/{:<2} {:04x} {:>5} {:04x} {:08x} {}",
                    index + 1,
                    region.slots(),
                    offset,
                    cycle,
                    validation.header.crc,
                    validation.header.generation,
                    validation.status()
                )?;
            }
        }

        Ok(())
    }
}

impl Display for BasicInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let static_data = &self.static_data;
        let wear_level = &self.wear_level_data;
        writeln!(
            f,
            "static data: valid={}/{}, write cycles={}, size={}",
            static_data.valid, static_data.copies, static_data.write_cycles, static_data.size
        )?;
        writeln!(
            f,
            "wear level: valid={}, write cycles={}, generation={}, size={}",
            wear_level.valid, wear_level.write_cycles, wear_level.generation, wear_level.size
        )
    }
}
