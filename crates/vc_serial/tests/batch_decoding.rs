//! Decoding record sequences and reporting where they stop.

mod common;

use std::sync::Arc;

use common::Telemetry;
use vc_serial::backend::{
    ByteReader, ByteWriter, MemoryReader, MemoryWriter, StreamReader, StreamWriter,
};
use vc_serial::config::{ContextConfig, EngineConfig};
use vc_serial::contract::Versioned;
use vc_serial::engine::{GraphEngine, HierarchicalEngine, Serializer};
use vc_serial::events::{Direction, SerialEvent};
use vc_serial::{FaultKind, SerialError};

fn telemetry(id: u32) -> Telemetry {
    Telemetry {
        id,
        reading: id as f32 / 4.0,
        note: (id % 2 == 0).then(|| format!("even {id}")),
        seen_version: 0,
    }
}

fn read_all<T: Versioned>(
    engine: &mut HierarchicalEngine,
    reader: &mut dyn ByteReader,
) -> Vec<T> {
    let mut out = Vec::new();
    while let Some(value) = engine.read_next(reader, |s: &mut Serializer<'_>| {
        let mut value = T::default();
        s.add_versioned_value(&mut value)?;
        Ok(value)
    }) {
        out.push(value);
    }
    out
}

fn faults(events: &[SerialEvent]) -> Vec<(Direction, SerialError)> {
    events
        .iter()
        .filter_map(|event| match event {
            SerialEvent::Fault { direction, error } => Some((*direction, error.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn clean_batch_ends_without_fault() {
    let ctx = common::context(&ContextConfig::default());
    let events = common::record_events(&ctx);
    let mut engine = HierarchicalEngine::new(ctx);

    let mut writer = MemoryWriter::new();
    for id in 0..5 {
        engine.write_versioned(&mut writer, &mut telemetry(id)).unwrap();
    }

    let mut reader = MemoryReader::new(writer.as_slice());
    let decoded: Vec<Telemetry> = read_all(&mut engine, &mut reader);
    let ids: Vec<u32> = decoded.iter().map(|t| t.id).collect();
    assert_eq!(ids, [0, 1, 2, 3, 4]);
    assert_eq!(decoded[2].note.as_deref(), Some("even 2"));
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn truncated_tail_stops_with_one_incomplete_fault() {
    for sections in [true, false] {
        let ctx = common::context(&ContextConfig::default());
        let events = common::record_events(&ctx);
        let config = EngineConfig::default().with_sections(sections);
        let mut engine = HierarchicalEngine::with_config(ctx, config);

        let mut writer = MemoryWriter::new();
        for id in 0..3 {
            engine.write_versioned(&mut writer, &mut telemetry(id)).unwrap();
        }
        let bytes = writer.into_inner();
        let truncated = &bytes[..bytes.len() - 3];

        let mut reader = MemoryReader::new(truncated);
        let decoded: Vec<Telemetry> = read_all(&mut engine, &mut reader);
        assert_eq!(decoded.len(), 2, "sections: {sections}");

        let faults = faults(&events.lock().unwrap());
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].0, Direction::Read);
        assert!(faults[0].1.is_incomplete(), "{:?}", faults[0].1);
    }
}

#[test]
fn stream_backend_batch() {
    let ctx = common::context(&ContextConfig::default());
    let mut writer = StreamWriter::new(Vec::new());
    let mut engine = HierarchicalEngine::new(Arc::clone(&ctx));
    for id in 10..14 {
        engine.write_versioned(&mut writer, &mut telemetry(id)).unwrap();
    }
    writer.flush().unwrap();
    let bytes = writer.into_inner();

    let config = EngineConfig::default().with_sections(false);
    let mut engine = HierarchicalEngine::with_config(ctx, config);
    let mut reader = StreamReader::new(bytes.as_slice());
    let decoded: Vec<Telemetry> = read_all(&mut engine, &mut reader);
    assert_eq!(decoded.len(), 4);
    assert_eq!(decoded[3], Telemetry { seen_version: 7, ..telemetry(13) });
}

#[test]
fn corrupt_presence_byte_is_malformed() {
    let ctx = common::context(&ContextConfig::default());
    let events = common::record_events(&ctx);
    let mut engine = GraphEngine::new(ctx);

    let mut reader = MemoryReader::new(&[2, 0, 0, 0]);
    let err = engine.read_object::<common::Leaf>(&mut reader).unwrap_err();
    assert_eq!(err.kind(), FaultKind::Malformed);
    assert_eq!(faults(&events.lock().unwrap()).len(), 1);
}

#[test]
fn instance_id_beyond_limit_is_malformed() {
    let config = EngineConfig::default().with_max_objects(2);
    let mut engine = GraphEngine::with_config(common::context(&ContextConfig::default()), config);

    // Present, then an id the slot table may not grow to.
    let mut writer = MemoryWriter::new();
    writer.write_bool(true).unwrap();
    writer.write_u32(3).unwrap();
    let mut reader = MemoryReader::new(writer.as_slice());
    let err = engine.read_object::<common::Leaf>(&mut reader).unwrap_err();
    assert_eq!(err.kind(), FaultKind::Malformed, "{err:?}");
    assert!(engine.identity().slots().is_empty());
}

#[test]
fn failed_record_leaves_earlier_records_intact() {
    let ctx = common::context(&ContextConfig::default());
    let mut engine = HierarchicalEngine::new(ctx);

    let mut writer = MemoryWriter::new();
    engine.write_versioned(&mut writer, &mut telemetry(1)).unwrap();
    let good = writer.len();

    let err = engine
        .write(&mut writer, |s| {
            s.add_u64(&mut 7)?;
            Err(SerialError::Io("disk full".into()))
        })
        .unwrap_err();
    assert_eq!(err, SerialError::Io("disk full".into()));
    assert_eq!(writer.len(), good);

    let mut reader = MemoryReader::new(writer.as_slice());
    let decoded: Vec<Telemetry> = read_all(&mut engine, &mut reader);
    assert_eq!(decoded.len(), 1);
}
