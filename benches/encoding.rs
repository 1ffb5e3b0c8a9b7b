#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

use bitwire::{Array, BitReader, BitWriter, Normal, UnsignedBitFieldTraits, VarUIntTraits};

const SAMPLE_COUNT: usize = 4096;

fn bench_bit_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("bit_writes");
    group.throughput(Throughput::Elements(SAMPLE_COUNT as u64));

    let mut data = vec![0u8; SAMPLE_COUNT * 8];
    group.bench_function("write_bits_13", |b| {
        b.iter(|| {
            let mut writer = BitWriter::new(&mut data);
            for value in 0..SAMPLE_COUNT as u32 {
                writer.write_bits(black_box(value & 0x1FFF), 13).unwrap();
            }
            writer.bit_position()
        })
    });

    let mut filled = vec![0u8; SAMPLE_COUNT * 8];
    {
        let mut writer = BitWriter::new(&mut filled);
        for value in 0..SAMPLE_COUNT as u32 {
            writer.write_bits(value & 0x1FFF, 13).unwrap();
        }
    }
    group.bench_function("read_bits_13", |b| {
        b.iter(|| {
            let mut reader = BitReader::new(&filled);
            let mut total = 0u64;
            for _ in 0..SAMPLE_COUNT {
                total = total.wrapping_add(u64::from(reader.read_bits(13).unwrap()));
            }
            black_box(total)
        })
    });

    group.finish();
}

fn bench_varints(c: &mut Criterion) {
    let mut group = c.benchmark_group("varints");
    group.throughput(Throughput::Elements(SAMPLE_COUNT as u64));

    // Mixed magnitudes so every encoding length shows up.
    let values: Vec<u64> = (0..SAMPLE_COUNT as u64)
        .map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> (i % 57))
        .collect();

    let mut data = vec![0u8; SAMPLE_COUNT * 9];
    group.bench_function("write_varuint", |b| {
        b.iter(|| {
            let mut writer = BitWriter::new(&mut data);
            for value in &values {
                writer.write_varuint(black_box(*value)).unwrap();
            }
            writer.bit_position()
        })
    });

    let mut filled = vec![0u8; SAMPLE_COUNT * 9];
    {
        let mut writer = BitWriter::new(&mut filled);
        for value in &values {
            writer.write_varuint(*value).unwrap();
        }
    }
    group.bench_function("read_varuint", |b| {
        b.iter(|| {
            let mut reader = BitReader::new(&filled);
            let mut total = 0u64;
            for _ in 0..SAMPLE_COUNT {
                total = total.wrapping_add(reader.read_varuint().unwrap());
            }
            black_box(total)
        })
    });

    group.finish();
}

fn bench_packed_arrays(c: &mut Criterion) {
    let mut group = c.benchmark_group("packed_arrays");
    group.throughput(Throughput::Elements(SAMPLE_COUNT as u64));

    // A slowly drifting series: the delta-friendly case.
    let elements: Vec<u32> = (0..SAMPLE_COUNT as u32)
        .map(|i| 1_000_000 + i * 3 + (i % 7))
        .collect();
    let array: Array<_, Normal> = Array::from_elements(
        UnsignedBitFieldTraits::<u32>::full_width(),
        elements.clone(),
    );

    group.bench_function("bit_size_of_packed", |b| {
        b.iter(|| black_box(&array).bit_size_of_packed(0).unwrap())
    });

    let packed_bits = array.bit_size_of_packed(0).unwrap();
    let mut data = vec![0u8; (packed_bits + 7) / 8];
    group.bench_function("write_packed", |b| {
        b.iter(|| {
            let mut writer = BitWriter::with_bit_size(&mut data, packed_bits).unwrap();
            black_box(&array).write_packed(&mut writer).unwrap();
            writer.bit_position()
        })
    });

    let mut filled = vec![0u8; (packed_bits + 7) / 8];
    {
        let mut writer = BitWriter::with_bit_size(&mut filled, packed_bits).unwrap();
        array.write_packed(&mut writer).unwrap();
    }
    group.bench_function("read_packed", |b| {
        b.iter(|| {
            let mut read_back: Array<_, Normal> =
                Array::new(UnsignedBitFieldTraits::<u32>::full_width());
            let mut reader = BitReader::with_bit_size(&filled, packed_bits);
            read_back.read_packed(&mut reader, SAMPLE_COUNT).unwrap();
            black_box(read_back.len())
        })
    });

    group.finish();
}

fn bench_var_size_elements(c: &mut Criterion) {
    let mut group = c.benchmark_group("var_size_elements");

    let array: Array<_, Normal> = Array::from_elements(
        VarUIntTraits,
        (0..256u64).map(|i| i * i * 31).collect(),
    );
    group.bench_function("bit_size_of_varuint_array", |b| {
        b.iter(|| black_box(&array).bit_size_of(0).unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_bit_writes,
    bench_varints,
    bench_packed_arrays,
    bench_var_size_elements
);
criterion_main!(benches);
