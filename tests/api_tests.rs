//! Facade round trips, including the file helpers.

use bitwire::{BitReader, BitWriter, BitwireError, Record, Result};
use tempfile::tempdir;

#[derive(Debug, Clone, PartialEq)]
struct Telemetry {
    source: String,
    flags: u8,
    samples: Vec<u32>,
}

impl Record for Telemetry {
    fn read(reader: &mut BitReader<'_>) -> Result<Self> {
        let source = reader.read_string()?;
        let flags = reader.read_bits(4)? as u8;
        let count = reader.read_varsize()? as usize;
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            samples.push(reader.read_varuint32()?);
        }
        Ok(Self {
            source,
            flags,
            samples,
        })
    }

    fn write(&self, writer: &mut BitWriter<'_>) -> Result<()> {
        writer.write_string(&self.source)?;
        writer.write_bits(self.flags.into(), 4)?;
        writer.write_varsize(self.samples.len() as u32)?;
        for sample in &self.samples {
            writer.write_varuint32(*sample)?;
        }
        Ok(())
    }

    fn bit_size_of(&self, _bit_position: usize) -> Result<usize> {
        let mut size = bitwire::size::bit_size_of_string(&self.source)? + 4;
        size += bitwire::size::bit_size_of_varsize(self.samples.len() as u32)?;
        for sample in &self.samples {
            size += bitwire::size::bit_size_of_varuint32(*sample)?;
        }
        Ok(size)
    }
}

fn sample_record() -> Telemetry {
    Telemetry {
        source: "probe-7".to_string(),
        flags: 0b1010,
        samples: vec![0, 127, 128, 65_536, u32::MAX],
    }
}

#[test]
fn serialize_produces_an_exactly_sized_buffer() {
    let mut record = sample_record();
    let expected_bits = record.bit_size_of(0).unwrap();
    let buffer = bitwire::serialize(&mut record).unwrap();
    assert_eq!(buffer.bit_size(), expected_bits);
    assert_eq!(buffer.byte_size(), (expected_bits + 7) / 8);
}

#[test]
fn buffer_round_trip() {
    let mut record = sample_record();
    let buffer = bitwire::serialize(&mut record).unwrap();
    let read_back: Telemetry = bitwire::deserialize(&buffer).unwrap();
    assert_eq!(read_back, record);
}

#[test]
fn byte_round_trip() {
    let mut record = sample_record();
    let bytes = bitwire::serialize_to_bytes(&mut record).unwrap();
    let read_back: Telemetry = bitwire::deserialize_from_bytes(&bytes).unwrap();
    assert_eq!(read_back, record);
}

#[test]
fn file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("telemetry.bin");

    let mut record = sample_record();
    bitwire::serialize_to_file(&mut record, &path).unwrap();
    let read_back: Telemetry = bitwire::deserialize_from_file(&path).unwrap();
    assert_eq!(read_back, record);
}

#[test]
fn missing_file_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("does-not-exist.bin");
    let result: std::result::Result<Telemetry, _> = bitwire::deserialize_from_file(&path);
    assert!(matches!(
        result,
        Err(BitwireError::FileOpenFailed | BitwireError::FileReadFailed)
    ));
}

#[test]
fn truncated_image_fails_cleanly() {
    let mut record = sample_record();
    let bytes = bitwire::serialize_to_bytes(&mut record).unwrap();
    let truncated = &bytes[..bytes.len() / 2];
    let result: std::result::Result<Telemetry, _> = bitwire::deserialize_from_bytes(truncated);
    assert_eq!(result, Err(BitwireError::EndOfStream));
}
