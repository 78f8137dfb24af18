use embedded_storage::Storage;

/// Any byte addressable storage implementing [`embedded_storage::Storage`] can be used. The
/// `write()` implementation is expected to change exactly the given bytes; there is no erase
/// step for EEPROM class devices.
///
/// See README.md for an example implementation.
pub trait Platform: Crc + Storage {}

impl<T: Crc + Storage> Platform for T {}

/// CRC-16 used for the block headers. The provided method is the software implementation from
/// [`crate::crc`]. Override it if the MCU has a faster way to calculate the same checksum, the
/// result has to be identical or previously stored data becomes unreadable.
pub trait Crc {
    fn crc16(init: u16, data: &[u8]) -> u16 {
        crate::crc::crc16_update(init, data)
    }
}

impl<T: Crc> Crc for &mut T {
    fn crc16(init: u16, data: &[u8]) -> u16 {
        T::crc16(init, data)
    }
}

/// Byte level primitives on top of [`Storage`]. Offsets are absolute device offsets and always
/// fit into the `u32` offsets of [`Storage`], [`Layout::new`](crate::layout::Layout::new) rejects
/// larger devices.
pub trait ByteOps: Platform {
    fn read_byte(&mut self, offset: usize) -> Result<u8, Self::Error> {
        let mut buf = [0u8; 1];
        self.read(offset as u32, &mut buf)?;
        Ok(buf[0])
    }

    fn read_bytes(&mut self, offset: usize, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.read(offset as u32, bytes)
    }

    /// Writes the byte only if the stored value differs to save write cycles.
    fn update_byte(&mut self, offset: usize, value: u8) -> Result<(), Self::Error> {
        if self.read_byte(offset)? != value {
            self.write(offset as u32, &[value])?;
        }
        Ok(())
    }

    fn update_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), Self::Error> {
        for (i, &value) in bytes.iter().enumerate() {
            self.update_byte(offset + i, value)?;
        }
        Ok(())
    }
}

impl<T: Platform> ByteOps for T {}
