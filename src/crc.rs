//! CRC-16 as used by the serial protocol framing of the AVR family (`_crc16_update`): reflected
//! polynomial 0xA001, initialized with 0xFFFF and without final XOR. These are the parameters
//! of CRC-16/MODBUS.

/// Initial value of every block checksum
pub const CRC16_INIT: u16 = 0xFFFF;

const POLYNOMIAL: u16 = 0xA001;

/// Continues the checksum `crc` over `data`.
pub const fn crc16_update(mut crc: u16, data: &[u8]) -> u16 {
    let mut i = 0;
    while i < data.len() {
        crc ^= data[i] as u16;
        let mut bit = 0;
        while bit < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        i += 1;
    }
    crc
}
