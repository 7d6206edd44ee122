use yame_core::column::{Column, Serialized};
use yame_core::format::Format;
use yame_core::index::SampleIndex;
use yame_core::reader::Reader;
use yame_core::writer::Writer;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("yame_test_{}.ydb", name))
}

fn bit_column(rows: u64, bytes: Vec<u8>) -> Column<Serialized> {
    Column::new_serialized(Format::Bit, rows, None, bytes)
}

#[test]
fn write_then_read_single_record() {
    let path = temp_path("single_record");
    let mut w = Writer::create(&path).unwrap();
    let col = bit_column(10, vec![0b1010_1010, 0b0000_0010]);
    w.write_one(&col).unwrap();
    drop(w);

    let mut r = Reader::open(&path).unwrap();
    let back = r.read_next().unwrap().unwrap();
    assert_eq!(back.fmt(), Format::Bit);
    assert_eq!(back.rows(), 10);
    assert_eq!(back.payload(), &[0b1010_1010, 0b0000_0010]);
    assert!(r.read_next().unwrap().is_none());
}

#[test]
fn sequential_records_preserve_order() {
    let path = temp_path("sequential_order");
    let mut w = Writer::create(&path).unwrap();
    for i in 0..5u8 {
        let col = Column::new_serialized(Format::Rle, 3, None, vec![i, i, i]);
        w.write_one(&col).unwrap();
    }
    drop(w);

    let mut r = Reader::open(&path).unwrap();
    for i in 0..5u8 {
        let col = r.read_next().unwrap().unwrap();
        assert_eq!(col.payload(), &[i, i, i]);
    }
    assert!(r.read_next().unwrap().is_none());
}

#[test]
fn read_by_offsets_jumps_directly() {
    let path = temp_path("read_by_offsets");
    let mut w = Writer::create(&path).unwrap();
    let mut offsets = Vec::new();

    let mut tell_writer_offset = 0u64;
    for i in 0..4u8 {
        offsets.push(tell_writer_offset);
        let col = Column::new_serialized(Format::Rle, 2, None, vec![i, i]);
        w.write_one(&col).unwrap();
        tell_writer_offset = w.tell().unwrap();
    }
    drop(w);

    let mut r = Reader::open(&path).unwrap();
    let wanted = [offsets[3], offsets[1]];
    let records = r.read_by_offsets(&wanted).unwrap();
    assert_eq!(records[0].payload(), &[3u8, 3u8]);
    assert_eq!(records[1].payload(), &[1u8, 1u8]);
}

#[test]
fn read_head_and_range() {
    let path = temp_path("read_head_range");
    let mut w = Writer::create(&path).unwrap();
    for i in 0..6u8 {
        w.write_one(&Column::new_serialized(Format::Rle, 1, None, vec![i])).unwrap();
    }
    drop(w);

    let mut r = Reader::open(&path).unwrap();
    let head = r.read_head(3).unwrap();
    assert_eq!(head.len(), 3);
    assert_eq!(head[0].payload(), &[0u8]);
    assert_eq!(head[2].payload(), &[2u8]);

    let mut r2 = Reader::open(&path).unwrap();
    let middle = r2.read_range(2, 4).unwrap();
    assert_eq!(middle.len(), 2);
    assert_eq!(middle[0].payload(), &[2u8]);
    assert_eq!(middle[1].payload(), &[3u8]);
}

#[test]
fn sample_index_round_trips_and_feeds_read_by_names() {
    let path = temp_path("index_driven_lookup");
    let idx_path = temp_path("index_driven_lookup_idx");

    let mut w = Writer::create(&path).unwrap();
    let mut index = SampleIndex::new();
    for (i, name) in ["alpha", "beta", "gamma"].iter().enumerate() {
        let offset = w.tell().unwrap();
        index.insert(*name, offset).unwrap();
        w.write_one(&Column::new_serialized(Format::Rle, 1, None, vec![i as u8])).unwrap();
    }
    drop(w);
    index.write(&idx_path).unwrap();

    let loaded = SampleIndex::load(&idx_path).unwrap();
    assert_eq!(loaded.names(), vec!["alpha", "beta", "gamma"]);

    let mut r = Reader::open(&path).unwrap();
    let recs = r.read_by_names(&loaded, &["gamma", "alpha"]).unwrap();
    assert_eq!(recs[0].payload(), &[2u8]);
    assert_eq!(recs[1].payload(), &[0u8]);
}

/// Three records of formats 3, 6, 2 back-to-back; read sequentially; each
/// record's `fmt`, `n`, and payload must match what was written, and the
/// header signature must be the documented magic constant. `n` here is the
/// raw header field: the payload's byte length for formats 3 and 2, the true
/// row count for format 6 (see `Column::rows`'s doc) — this test is about
/// framing fidelity, not about recovering logical row counts.
#[test]
fn mixed_format_records_frame_correctly() {
    let path = temp_path("mixed_format_framing");

    let fmt3_payload = vec![0xAAu8, 0xBB, 0xCC, 0xDD]; // 2 rows at unit=2, opaque bytes here
    let fmt6_payload = vec![0b0011_1000u8]; // 4 rows packed 2 bits each
    let fmt2_payload = {
        let mut p = b"x\0y\0\0".to_vec();
        p.push(1); // unit byte
        p.extend_from_slice(&[0, 2, 0, 1, 1, 0]); // (0,run=2),(1,run=1)
        p
    };

    let rec3 = Column::new_serialized(Format::SequencingCounts, fmt3_payload.len() as u64, None, fmt3_payload.clone());
    let rec6 = Column::new_serialized(Format::SetUniverse, 4, None, fmt6_payload.clone());
    let rec2 = Column::new_serialized(Format::Categorical, fmt2_payload.len() as u64, None, fmt2_payload.clone());

    let mut w = Writer::create(&path).unwrap();
    w.write_one(&rec3).unwrap();
    w.write_one(&rec6).unwrap();
    w.write_one(&rec2).unwrap();
    drop(w);

    let bytes = std::fs::read(&path).unwrap();
    let signature = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
    assert_eq!(signature, yame_core::record::SIGNATURE);

    let mut r = Reader::open(&path).unwrap();
    let a = r.read_next().unwrap().unwrap();
    assert_eq!(a.fmt(), Format::SequencingCounts);
    assert_eq!(a.rows(), fmt3_payload.len() as u64); // header n == byte length for fmt 3
    assert_eq!(a.payload(), fmt3_payload.as_slice());

    let b = r.read_next().unwrap().unwrap();
    assert_eq!(b.fmt(), Format::SetUniverse);
    assert_eq!(b.rows(), 4); // header n == row count for fmt 6
    assert_eq!(b.payload(), fmt6_payload.as_slice());

    let c = r.read_next().unwrap().unwrap();
    assert_eq!(c.fmt(), Format::Categorical);
    assert_eq!(c.rows(), fmt2_payload.len() as u64); // header n == byte length for fmt 2
    assert_eq!(c.payload(), fmt2_payload.as_slice());

    assert!(r.read_next().unwrap().is_none());
}

#[test]
fn corrupt_signature_is_fatal() {
    let path = temp_path("corrupt_signature");
    let mut w = Writer::create(&path).unwrap();
    w.write_one(&bit_column(8, vec![0xff])).unwrap();
    drop(w);

    let bytes = std::fs::read(&path).unwrap();
    let mut corrupted = bytes.clone();
    corrupted[0] ^= 0xff;
    std::fs::write(&path, corrupted).unwrap();

    let mut r = Reader::open(&path).unwrap();
    let err = r.read_next().unwrap_err();
    assert!(matches!(err, yame_core::error::Error::SignatureMismatch { .. }));
}
