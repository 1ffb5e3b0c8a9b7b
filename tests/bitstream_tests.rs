//! Reader/writer round trips and wire-layout checks.

use bitwire::{BitBuffer, BitReader, BitWriter, BitwireError};

#[test]
fn mixed_scalar_round_trip() {
    // 7-bit field, bool, 16-bit field packed into exactly three bytes.
    let mut data = [0u8; 3];
    let mut writer = BitWriter::new(&mut data);
    writer.write_bits(0x7F, 7).unwrap();
    writer.write_bool(true).unwrap();
    writer.write_bits(0x1234, 16).unwrap();
    assert_eq!(writer.bit_position(), 24);
    assert_eq!(data, [0xFF, 0x12, 0x34]);

    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_bits(7).unwrap(), 127);
    assert!(reader.read_bool().unwrap());
    assert_eq!(reader.read_bits(16).unwrap(), 4660);
}

#[test]
fn zero_width_read_does_not_advance() {
    let data = [0xAB];
    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_bits(0).unwrap(), 0);
    assert_eq!(reader.bit_position(), 0);
    assert_eq!(reader.read_bits(8).unwrap(), 0xAB);
}

#[test]
fn unaligned_reads_across_cache_refills() {
    // 17 bytes forces at least one cache refill on the 64-bit path.
    let data: Vec<u8> = (0u8..17).collect();
    let mut reader = BitReader::new(&data);
    let mut collected = Vec::new();
    // 5-bit strides walk every misalignment.
    for _ in 0..27 {
        collected.push(reader.read_bits(5).unwrap());
    }
    assert_eq!(reader.bit_position(), 135);

    // Reassemble and compare against the source bits.
    let mut bits = Vec::new();
    for value in collected {
        for bit in (0..5).rev() {
            bits.push((value >> bit) & 1);
        }
    }
    for (index, bit) in bits.iter().enumerate() {
        let byte = data[index / 8];
        let expected = (byte >> (7 - index % 8)) & 1;
        assert_eq!(*bit, u32::from(expected), "bit {index}");
    }
}

#[test]
fn signed_fields_sign_extend() {
    let mut data = [0u8; 4];
    let mut writer = BitWriter::new(&mut data);
    writer.write_signed_bits(-3, 5).unwrap();
    writer.write_signed_bits(7, 5).unwrap();
    writer.write_signed_bits_64(-1, 22).unwrap();

    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_signed_bits(5).unwrap(), -3);
    assert_eq!(reader.read_signed_bits(5).unwrap(), 7);
    assert_eq!(reader.read_signed_bits_64(22).unwrap(), -1);
}

#[test]
fn full_width_signed_fields_pass_through() {
    let mut data = [0u8; 12];
    let mut writer = BitWriter::new(&mut data);
    writer.write_signed_bits(i32::MIN, 32).unwrap();
    writer.write_signed_bits_64(i64::MIN, 64).unwrap();

    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_signed_bits(32).unwrap(), i32::MIN);
    assert_eq!(reader.read_signed_bits_64(64).unwrap(), i64::MIN);
}

#[test]
fn invalid_bit_widths_are_rejected() {
    let data = [0u8; 16];
    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_bits(33), Err(BitwireError::InvalidNumBits));
    assert_eq!(reader.read_bits_64(65), Err(BitwireError::InvalidNumBits));

    let mut buffer = [0u8; 16];
    let mut writer = BitWriter::new(&mut buffer);
    assert_eq!(writer.write_bits(0, 33), Err(BitwireError::InvalidNumBits));
    assert_eq!(
        writer.write_bits_64(0, 65),
        Err(BitwireError::InvalidNumBits)
    );
}

#[test]
fn end_of_stream_leaves_prior_reads_intact() {
    let data = [0xA5];
    let mut reader = BitReader::new(&data);
    let first = reader.read_bits(4).unwrap();
    assert_eq!(reader.read_bits(8), Err(BitwireError::EndOfStream));
    assert_eq!(first, 0xA);
}

#[test]
fn writer_capacity_is_enforced() {
    let mut data = [0u8; 1];
    let mut writer = BitWriter::new(&mut data);
    writer.write_bits(0, 6).unwrap();
    assert_eq!(writer.write_bits(0, 3), Err(BitwireError::BufferOverflow));
}

#[test]
fn varint32_boundary_encodings() {
    let cases: [(i32, &[u8]); 4] = [
        (0, &[0x00]),
        (-1, &[0x81]),
        (64, &[0x40, 0x40]),
        (-64, &[0xC0, 0x40]),
    ];
    for (value, expected) in cases {
        let mut data = [0u8; 4];
        let mut writer = BitWriter::new(&mut data);
        writer.write_varint32(value).unwrap();
        let written = writer.bit_position() / 8;
        assert_eq!(&data[..written], expected, "encoding of {value}");

        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_varint32().unwrap(), value);
    }
}

#[test]
fn varint_negative_zero_is_i64_min() {
    let data = [0x80];
    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_varint().unwrap(), i64::MIN);

    let mut encoded = [0u8; 9];
    let mut writer = BitWriter::new(&mut encoded);
    writer.write_varint(i64::MIN).unwrap();
    assert_eq!(writer.bit_position(), 8);
    assert_eq!(encoded[0], 0x80);
}

#[test]
fn varint_multi_byte_negative_zero_is_plain_zero() {
    // Sign set, continuation set, zero magnitude over two bytes: the
    // negative-zero shortcut only applies to the single-byte form.
    let data = [0xC0, 0x00];
    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_varint().unwrap(), 0);
}

#[test]
fn varint_family_extremes_round_trip() {
    let mut data = [0u8; 64];
    let mut writer = BitWriter::new(&mut data);
    writer.write_varint16(-8191).unwrap();
    writer.write_varint32(268_435_455).unwrap();
    writer.write_varint64(-(1i64 << 55) + 1).unwrap();
    writer.write_varint(i64::MAX).unwrap();
    writer.write_varint(i64::MIN + 1).unwrap();
    writer.write_varuint16(u16::MAX >> 1).unwrap();
    writer.write_varuint32(u32::MAX >> 4).unwrap();
    writer.write_varuint64((1u64 << 57) - 1).unwrap();
    writer.write_varuint(u64::MAX).unwrap();
    writer.write_varsize((1 << 31) - 1).unwrap();

    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_varint16().unwrap(), -8191);
    assert_eq!(reader.read_varint32().unwrap(), 268_435_455);
    assert_eq!(reader.read_varint64().unwrap(), -(1i64 << 55) + 1);
    assert_eq!(reader.read_varint().unwrap(), i64::MAX);
    assert_eq!(reader.read_varint().unwrap(), i64::MIN + 1);
    assert_eq!(reader.read_varuint16().unwrap(), u16::MAX >> 1);
    assert_eq!(reader.read_varuint32().unwrap(), u32::MAX >> 4);
    assert_eq!(reader.read_varuint64().unwrap(), (1u64 << 57) - 1);
    assert_eq!(reader.read_varuint().unwrap(), u64::MAX);
    assert_eq!(reader.read_varsize().unwrap(), (1 << 31) - 1);
}

#[test]
fn varsize_over_limit_is_out_of_range() {
    // Five continuation-heavy bytes decode past 2^31 - 1.
    let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_varsize(), Err(BitwireError::OutOfRange));

    let mut buffer = [0u8; 8];
    let mut writer = BitWriter::new(&mut buffer);
    assert_eq!(
        writer.write_varsize(1 << 31),
        Err(BitwireError::OutOfRange)
    );
}

#[test]
fn truncated_varint_is_end_of_stream() {
    // Continuation bit set but nothing follows.
    let data = [0xC0];
    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_varint32(), Err(BitwireError::EndOfStream));
}

#[test]
fn float_round_trips() {
    let mut data = [0u8; 14];
    let mut writer = BitWriter::new(&mut data);
    writer.write_float16(1.0).unwrap();
    writer.write_float32(-2.5).unwrap();
    writer.write_float64(1.0e300).unwrap();

    // Half-precision 1.0 is sign 0, exponent 15, significand 0.
    assert_eq!(&data[..2], &[0x3C, 0x00]);

    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_float16().unwrap(), 1.0);
    assert_eq!(reader.read_float32().unwrap(), -2.5);
    assert_eq!(reader.read_float64().unwrap(), 1.0e300);
}

#[test]
fn float16_special_values() {
    for value in [0.0f32, -0.0, 65504.0, f32::INFINITY, f32::NEG_INFINITY] {
        let mut data = [0u8; 2];
        let mut writer = BitWriter::new(&mut data);
        writer.write_float16(value).unwrap();
        let mut reader = BitReader::new(&data);
        let read_back = reader.read_float16().unwrap();
        assert_eq!(read_back.to_bits(), value.to_bits(), "{value}");
    }

    // NaN survives as NaN.
    let mut data = [0u8; 2];
    let mut writer = BitWriter::new(&mut data);
    writer.write_float16(f32::NAN).unwrap();
    let mut reader = BitReader::new(&data);
    assert!(reader.read_float16().unwrap().is_nan());

    // Values beyond the half range overflow to infinity.
    let mut data = [0u8; 2];
    let mut writer = BitWriter::new(&mut data);
    writer.write_float16(1.0e6).unwrap();
    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_float16().unwrap(), f32::INFINITY);
}

#[test]
fn string_framing() {
    let mut data = [0u8; 3];
    let mut writer = BitWriter::new(&mut data);
    writer.write_string("hi").unwrap();
    assert_eq!(data, [0x02, 0x68, 0x69]);

    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_string().unwrap(), "hi");
}

#[test]
fn unaligned_string_round_trip() {
    let mut data = [0u8; 16];
    let mut writer = BitWriter::new(&mut data);
    writer.write_bits(0b101, 3).unwrap();
    writer.write_string("abc").unwrap();

    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_bits(3).unwrap(), 0b101);
    assert_eq!(reader.read_string().unwrap(), "abc");
}

#[test]
fn bytes_round_trip_aligned_and_unaligned() {
    for lead_bits in [0u8, 5] {
        let payload = vec![0xDE, 0xAD, 0xBE, 0xEF];
        let mut data = [0u8; 16];
        let mut writer = BitWriter::new(&mut data);
        if lead_bits > 0 {
            writer.write_bits(0, lead_bits).unwrap();
        }
        writer.write_bytes(&payload).unwrap();

        let mut reader = BitReader::new(&data);
        if lead_bits > 0 {
            reader.read_bits(lead_bits).unwrap();
        }
        assert_eq!(reader.read_bytes().unwrap(), payload);
    }
}

#[test]
fn bit_buffer_sub_byte_tail_round_trip() {
    // Eleven bits: the final three live in the high bits of byte two.
    let original = BitBuffer::from_bits(vec![0xCA, 0xA0], 11).unwrap();

    for lead_bits in [0u8, 3] {
        let mut data = [0u8; 8];
        let mut writer = BitWriter::new(&mut data);
        if lead_bits > 0 {
            writer.write_bits(0b111, lead_bits).unwrap();
        }
        writer.write_bit_buffer(&original).unwrap();

        let mut reader = BitReader::new(&data);
        if lead_bits > 0 {
            reader.read_bits(lead_bits).unwrap();
        }
        let read_back = reader.read_bit_buffer().unwrap();
        assert_eq!(read_back, original);
        // The reader zeroes the undefined tail bits.
        assert_eq!(read_back.data()[1] & 0x1F, 0);
    }
}

#[test]
fn overlong_payload_prefix_is_end_of_stream() {
    // The prefix announces ten bytes but only two follow; the aligned
    // wholesale path and the unaligned byte-by-byte path agree.
    let data = [0x0A, 0x01, 0x02];
    let mut reader = BitReader::new(&data);
    assert_eq!(reader.read_bytes(), Err(BitwireError::EndOfStream));

    // Three lead bits, then the same ten-byte prefix straddling a byte
    // boundary.
    let unaligned = [0x01, 0x41, 0x02, 0x03];
    let mut reader = BitReader::new(&unaligned);
    reader.read_bits(3).unwrap();
    assert_eq!(reader.read_bytes(), Err(BitwireError::EndOfStream));

    // Same for bit buffers: 80 bits announced, 8 present.
    let bits = [0x50, 0x01];
    let mut reader = BitReader::new(&bits);
    assert_eq!(reader.read_bit_buffer(), Err(BitwireError::EndOfStream));
}

#[test]
fn position_control() {
    let data = [0xAB, 0xCD, 0xEF];
    let mut reader = BitReader::new(&data);

    reader.set_bit_position(12).unwrap();
    assert_eq!(reader.bit_position(), 12);
    assert_eq!(reader.read_bits(4).unwrap(), 0xD);

    reader.set_bit_position(0).unwrap();
    reader.read_bits(3).unwrap();
    reader.align_to(8).unwrap();
    assert_eq!(reader.bit_position(), 8);
    // Aligning an aligned position costs nothing.
    reader.align_to(8).unwrap();
    assert_eq!(reader.bit_position(), 8);

    assert_eq!(
        reader.set_bit_position(25),
        Err(BitwireError::InvalidBitPosition)
    );
}

#[test]
fn writer_alignment_preserves_neighbors() {
    let mut data = [0u8; 2];
    let mut writer = BitWriter::new(&mut data);
    writer.write_bits(0b111, 3).unwrap();
    writer.align_to(8).unwrap();
    writer.write_bits(0xAA, 8).unwrap();
    assert_eq!(data[0] & 0xE0, 0xE0);
    assert_eq!(data[1], 0xAA);
}

#[test]
fn measurement_mode_matches_real_writes() {
    let mut measuring = BitWriter::measuring(usize::MAX);
    measuring.write_bits(1, 3).unwrap();
    measuring.write_varuint32(300).unwrap();
    measuring.write_string("xyz").unwrap();
    measuring.write_bool(true).unwrap();
    let predicted = measuring.bit_position();

    let mut data = [0u8; 16];
    let mut writer = BitWriter::new(&mut data);
    writer.write_bits(1, 3).unwrap();
    writer.write_varuint32(300).unwrap();
    writer.write_string("xyz").unwrap();
    writer.write_bool(true).unwrap();
    assert_eq!(writer.bit_position(), predicted);
    assert!(!measuring.has_buffer());
}

#[test]
fn measurement_mode_enforces_declared_capacity() {
    let mut measuring = BitWriter::measuring(8);
    measuring.write_bits(0, 8).unwrap();
    assert_eq!(measuring.write_bits(0, 1), Err(BitwireError::BufferOverflow));
}

#[test]
fn shortened_bit_size_is_honored() {
    let data = [0xFF, 0xFF];
    let mut reader = BitReader::with_bit_size(&data, 10);
    assert_eq!(reader.read_bits(10).unwrap(), 0x3FF);
    assert_eq!(reader.read_bits(1), Err(BitwireError::EndOfStream));
}

#[test]
fn inconsistent_bit_size_is_rejected() {
    let data = [0xFF];
    let mut reader = BitReader::with_bit_size(&data, 9);
    assert_eq!(reader.read_bits(1), Err(BitwireError::WrongBufferBitSize));
}
