mod common;

use common::STATIC_DATA_SIZE;
use eeprom_wl::ALL_COPIES;
use eeprom_wl::error::Error;
use pretty_assertions::assert_eq;

const OFFSETS: [usize; 3] = [0, 14, 28];

fn generations(eeprom: &eeprom_wl::Eeprom<common::Memory>) -> Vec<u32> {
    OFFSETS
        .iter()
        .map(|&offset| common::header(eeprom.device(), offset).1)
        .collect()
}

#[test]
fn uninitialized() {
    let mut eeprom = common::eeprom();
    let mut buf = [0u8; STATIC_DATA_SIZE];

    assert_eq!(eeprom.read_static_data(&mut buf, ALL_COPIES).unwrap(), 0);
    assert_eq!(eeprom.write_static_data(&[1u8; 8], ALL_COPIES).unwrap(), 0);
    assert_eq!(eeprom.is_static_data_modified(&[1u8; 8], ALL_COPIES).unwrap(), 0b111);
}

#[test]
fn round_trip() {
    let mut eeprom = common::initialized();
    let mut buf = [0u8; STATIC_DATA_SIZE];

    assert_eq!(eeprom.read_static_data(&mut buf, ALL_COPIES).unwrap(), 0);
    assert_eq!(eeprom.is_static_data_modified(&[0u8; 8], ALL_COPIES).unwrap(), 0b111);

    let data = *b"settings";
    assert_eq!(eeprom.write_static_data(&data, ALL_COPIES).unwrap(), 0b111);
    assert_eq!(generations(&eeprom), vec![1, 1, 1]);

    assert_eq!(eeprom.read_static_data(&mut buf, ALL_COPIES).unwrap(), 0b001);
    assert_eq!(buf, data);
    assert_eq!(eeprom.is_static_data_modified(&data, ALL_COPIES).unwrap(), 0);
    assert_eq!(eeprom.is_static_data_modified(b"Settings", ALL_COPIES).unwrap(), 0b111);
}

#[test]
fn larger_buffers_are_accepted() {
    let mut eeprom = common::initialized();
    let data = [7u8; 32];
    assert_eq!(eeprom.write_static_data(&data, ALL_COPIES).unwrap(), 0b111);

    let mut buf = [0u8; 32];
    assert_eq!(eeprom.read_static_data(&mut buf, ALL_COPIES).unwrap(), 0b001);
    assert_eq!(&buf[..STATIC_DATA_SIZE], &[7u8; STATIC_DATA_SIZE]);
    assert_eq!(&buf[STATIC_DATA_SIZE..], &[0u8; 32 - STATIC_DATA_SIZE]);
}

#[test]
fn buffer_too_small() {
    let mut eeprom = common::initialized();
    let mut buf = [0u8; STATIC_DATA_SIZE - 1];

    assert_eq!(
        eeprom.read_static_data(&mut buf, ALL_COPIES),
        Err(Error::BufferTooSmall)
    );
    assert_eq!(
        eeprom.write_static_data(&buf, ALL_COPIES),
        Err(Error::BufferTooSmall)
    );
    assert_eq!(
        eeprom.is_static_data_modified(&buf, ALL_COPIES),
        Err(Error::BufferTooSmall)
    );
}

#[test]
fn freshest_copies() {
    let mut eeprom = common::initialized();

    for value in 1..=3u8 {
        assert_eq!(eeprom.write_static_data(&[value; 8], ALL_COPIES).unwrap(), 0b111);
    }
    for value in 4..=5u8 {
        assert_eq!(eeprom.write_static_data(&[value; 8], 0b011).unwrap(), 0b011);
    }
    assert_eq!(generations(&eeprom), vec![5, 5, 3]);

    let info = eeprom.basic_info().unwrap();
    assert_eq!(info.static_data.write_cycles, 5);
    assert_eq!(info.static_data.valid_bits, 0b011);
    assert_eq!(info.static_data.valid, 2);

    // the stale copy can still be read on request
    let mut buf = [0u8; STATIC_DATA_SIZE];
    assert_eq!(eeprom.read_static_data(&mut buf, 0b100).unwrap(), 0b100);
    assert_eq!(buf, [3u8; 8]);
    assert_eq!(eeprom.is_static_data_modified(&[5u8; 8], ALL_COPIES).unwrap(), 0b100);

    // the next write continues with the highest generation
    assert_eq!(eeprom.write_static_data(&[6u8; 8], ALL_COPIES).unwrap(), 0b111);
    assert_eq!(generations(&eeprom), vec![6, 6, 6]);
    assert_eq!(eeprom.basic_info().unwrap().static_data.valid_bits, 0b111);
}

#[test]
fn unselected_copies_keep_generation() {
    let mut eeprom = common::initialized();

    assert_eq!(eeprom.write_static_data(&[1u8; 8], 0b100).unwrap(), 0b100);
    assert_eq!(generations(&eeprom), vec![0, 0, 1]);

    // copies 0 and 1 are empty, the first readable copy is returned
    let mut buf = [0u8; STATIC_DATA_SIZE];
    assert_eq!(eeprom.read_static_data(&mut buf, ALL_COPIES).unwrap(), 0b100);
    assert_eq!(buf, [1u8; 8]);

    assert_eq!(eeprom.write_static_data(&[2u8; 8], 0b001).unwrap(), 0b001);
    assert_eq!(generations(&eeprom), vec![2, 0, 1]);
    assert_eq!(eeprom.basic_info().unwrap().static_data.valid_bits, 0b001);
}

#[test]
fn corrupted_copy_is_never_freshest() {
    let mut eeprom = common::initialized();
    for value in 1..=3u8 {
        eeprom.write_static_data(&[value; 8], ALL_COPIES).unwrap();
    }

    // copy 0 claims a much higher generation but its CRC does not match
    eeprom.device_mut().buf[2..6].copy_from_slice(&1000u32.to_le_bytes());

    let info = eeprom.basic_info().unwrap();
    assert_eq!(info.static_data.write_cycles, 3);
    assert_eq!(info.static_data.valid_bits, 0b110);

    let mut buf = [0u8; STATIC_DATA_SIZE];
    assert_eq!(eeprom.read_static_data(&mut buf, ALL_COPIES).unwrap(), 0b010);
    assert_eq!(buf, [3u8; 8]);

    assert_eq!(eeprom.write_static_data(&[4u8; 8], ALL_COPIES).unwrap(), 0b111);
    assert_eq!(generations(&eeprom), vec![4, 4, 4]);
}

#[test]
fn all_copies_corrupted() {
    let mut eeprom = common::initialized();
    eeprom.write_static_data(&[1u8; 8], ALL_COPIES).unwrap();

    for offset in OFFSETS {
        eeprom.device_mut().flip_bit(offset + 8, 0);
    }

    let mut buf = [0u8; STATIC_DATA_SIZE];
    assert_eq!(eeprom.read_static_data(&mut buf, ALL_COPIES).unwrap(), 0);
    assert_eq!(eeprom.write_static_data(&[2u8; 8], ALL_COPIES).unwrap(), 0);
    assert_eq!(eeprom.basic_info().unwrap().static_data.valid, 0);
}

#[test]
fn failed_copy_does_not_stop_the_others() {
    let mut eeprom = common::initialized();
    eeprom.device_mut().worn_out = Some(0..14);

    assert_eq!(eeprom.write_static_data(&[1u8; 8], ALL_COPIES).unwrap(), 0b110);
    assert_eq!(generations(&eeprom), vec![0, 1, 1]);
    assert_eq!(eeprom.basic_info().unwrap().static_data.valid_bits, 0b110);

    // copy 0 still holds its erased block
    let mut buf = [0u8; STATIC_DATA_SIZE];
    assert_eq!(eeprom.read_static_data(&mut buf, ALL_COPIES).unwrap(), 0b010);
    assert_eq!(buf, [1u8; 8]);
    assert_eq!(eeprom.is_static_data_modified(&[1u8; 8], ALL_COPIES).unwrap(), 0b001);
}

#[test]
fn mask_bits_without_copy_are_ignored() {
    let mut eeprom = common::initialized();
    assert_eq!(eeprom.write_static_data(&[1u8; 8], 0b1111_1000).unwrap(), 0);
    assert_eq!(generations(&eeprom), vec![0, 0, 0]);
    assert_eq!(eeprom.is_static_data_modified(&[1u8; 8], 0b1111_1000).unwrap(), 0);
}

#[test]
fn generation_overflow() {
    let mut eeprom = common::initialized();
    eeprom.write_static_data(&[1u8; 8], ALL_COPIES).unwrap();

    // forge a valid copy at the maximum generation
    let mut raw = Vec::new();
    raw.extend_from_slice(&u32::MAX.to_le_bytes());
    raw.extend_from_slice(&[1u8; 8]);
    let crc = eeprom_wl::crc::crc16_update(eeprom_wl::crc::CRC16_INIT, &raw);
    let memory = eeprom.device_mut();
    memory.buf[0..2].copy_from_slice(&crc.to_le_bytes());
    memory.buf[2..6].copy_from_slice(&u32::MAX.to_le_bytes());

    assert_eq!(eeprom.basic_info().unwrap().static_data.write_cycles, u32::MAX);
    assert_eq!(eeprom.write_static_data(&[2u8; 8], ALL_COPIES).unwrap(), 0);
}

#[test]
fn page_aligned_copies() {
    let layout =
        eeprom_wl::layout::Layout::new(&common::config().with_page_size(4)).unwrap();
    let mut eeprom = eeprom_wl::Eeprom::new(layout, common::Memory::new(common::CAPACITY)).unwrap();
    eeprom.erase_and_initialize(eeprom_wl::Area::All).unwrap();

    assert_eq!(eeprom.write_static_data(b"aligned!", ALL_COPIES).unwrap(), 0b111);
    for offset in [0, 16, 32] {
        assert_eq!(common::header(eeprom.device(), offset).1, 1);
        assert_eq!(common::payload(eeprom.device(), offset, STATIC_DATA_SIZE), b"aligned!");
        // padding is never written
        assert_eq!(&eeprom.device().buf[offset + 14..offset + 16], &[0xFF, 0xFF]);
    }

    let mut buf = [0u8; STATIC_DATA_SIZE];
    assert_eq!(eeprom.read_static_data(&mut buf, 0b110).unwrap(), 0b010);
    assert_eq!(&buf, b"aligned!");
}
