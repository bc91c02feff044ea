//! Encoding and decoding engines.
//!
//! An [`Engine`] drives one top-level call at a time: it opens a
//! [`Serializer`] over a backend, runs the caller's transfer logic, and on
//! failure rolls the writer back and publishes a single
//! [`SerialEvent::Fault`].
//!
//! ## Menu
//!
//! - [`HierarchicalEngine`]: tree encoding. Shared objects are duplicated,
//!   cycles are rejected.
//! - [`GraphEngine`]: reference deduplication and cycle-safe decoding.
//! - [`IdentityLayer`]: the seam between the two.
//!
//! Engines are cheap, single-threaded and meant to live per worker. The
//! [`SerialContext`] they share is `Send + Sync`.

// -----------------------------------------------------------------------------
// Modules

mod graph;
mod identity;
mod serializer;
mod trace;

// -----------------------------------------------------------------------------
// Exports

pub use graph::{BACK_REFERENCE, GraphIdentity, RecordSlot};
pub use identity::{IdentityLayer, ReadRef, RefWrite, TreeIdentity};
pub use serializer::Serializer;

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use serializer::Stream;

use crate::backend::{ByteReader, ByteWriter};
use crate::config::EngineConfig;
use crate::context::SerialContext;
use crate::contract::{Dynamic, Obj, SerialObject, SerialValue, Versioned};
use crate::events::{Direction, SerialEvent};
use crate::{SerialError, SerialResult};

/// Engine without identity tracking.
pub type HierarchicalEngine = Engine<TreeIdentity>;

/// Engine with reference deduplication and cycle support.
pub type GraphEngine = Engine<GraphIdentity>;

// -----------------------------------------------------------------------------
// Engine

/// Runs top-level encode and decode calls.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vc_serial::backend::{MemoryReader, MemoryWriter};
/// use vc_serial::contract::{Obj, SerialObject};
/// use vc_serial::engine::{GraphEngine, Serializer};
/// use vc_serial::registry::TypeRegistry;
/// use vc_serial::{SerialContext, SerialResult, impl_typed};
///
/// #[derive(Default)]
/// struct Node {
///     value: u32,
///     next: Option<Obj<Node>>,
/// }
///
/// impl SerialObject for Node {
///     fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
///         s.add_u32(&mut self.value)?;
///         s.add_object(&mut self.next)
///     }
/// }
///
/// impl_typed!(Node, Reference, "node");
///
/// let registry = Arc::new(TypeRegistry::new());
/// registry.register_object::<Node>().unwrap();
/// let mut engine = GraphEngine::new(SerialContext::new(registry));
///
/// // A two-node ring.
/// let a = Obj::new(Node { value: 1, next: None });
/// let b = Obj::new(Node { value: 2, next: Some(a.clone()) });
/// a.borrow_mut().next = Some(b.clone());
///
/// let mut writer = MemoryWriter::new();
/// engine.write_object(&mut writer, &a).unwrap();
///
/// let mut reader = MemoryReader::new(writer.as_slice());
/// let a2 = engine.read_object::<Node>(&mut reader).unwrap().unwrap();
/// let b2 = a2.borrow().next.clone().unwrap();
/// let back = b2.borrow().next.clone().unwrap();
///
/// assert_eq!(b2.borrow().value, 2);
/// assert!(back.ptr_eq(&a2));
/// # a.borrow_mut().next = None;
/// # a2.borrow_mut().next = None;
/// ```
pub struct Engine<I: IdentityLayer> {
    ctx: Arc<SerialContext>,
    config: EngineConfig,
    identity: I,
}

impl<I: IdentityLayer + Default> Engine<I> {
    /// Creates an engine with the default [`EngineConfig`].
    #[inline]
    pub fn new(ctx: Arc<SerialContext>) -> Self {
        Self::with_config(ctx, EngineConfig::default())
    }

    pub fn with_config(ctx: Arc<SerialContext>, config: EngineConfig) -> Self {
        Self {
            ctx,
            config,
            identity: I::default(),
        }
    }
}

impl<I: IdentityLayer> Engine<I> {
    #[inline]
    pub fn context(&self) -> &Arc<SerialContext> {
        &self.ctx
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn identity(&self) -> &I {
        &self.identity
    }

    /// Clears all identity state.
    ///
    /// Done automatically before each call when
    /// [`auto_reset`](EngineConfig::auto_reset) is on. With it off, ids and
    /// slots carry over so later records may refer to earlier objects.
    #[inline]
    pub fn reset(&mut self) {
        self.identity.reset();
    }

    // -------------------------------------------------------------------------
    // Top-level calls

    /// Encodes one record.
    ///
    /// On failure the writer is rolled back to where the record started, if
    /// the backend allows it, ids handed out during the call are forgotten,
    /// and a [`SerialEvent::Fault`] is published.
    pub fn write<F>(&mut self, writer: &mut dyn ByteWriter, transfer: F) -> SerialResult<()>
    where
        F: FnOnce(&mut Serializer<'_>) -> SerialResult<()>,
    {
        if self.config.auto_reset {
            self.identity.reset();
        }
        let start = writer.position();
        let mark = self.identity.mark();
        let sections = self.config.sections && writer.supports_sections();
        if self.config.sections && !sections {
            log::debug!("backend cannot backpatch, writing without sections");
        }
        log::trace!("write pass starts at byte {start}");

        let failure = {
            let mut s = Serializer::new(
                Stream::Writer(&mut *writer),
                &self.ctx,
                &mut self.identity,
                &self.config,
                sections,
            );
            match transfer(&mut s) {
                Ok(()) => None,
                Err(err) => Some((err, s.failure_path())),
            }
        };

        match failure {
            None => Ok(()),
            Some((err, path)) => {
                self.identity.rollback(mark);
                if !writer.rollback(start) {
                    log::debug!("backend kept the bytes of the failed record");
                }
                Err(self.fault(Direction::Write, err, path))
            }
        }
    }

    /// Decodes one record.
    ///
    /// Targets already filled when a failure occurs keep their partial
    /// state. The failure is published as a [`SerialEvent::Fault`].
    pub fn read<R, F>(&mut self, reader: &mut dyn ByteReader, transfer: F) -> SerialResult<R>
    where
        F: FnOnce(&mut Serializer<'_>) -> SerialResult<R>,
    {
        if self.config.auto_reset {
            self.identity.reset();
        }
        let sections = self.config.sections && reader.supports_sections();
        log::trace!("read pass starts at byte {}", reader.position());

        let outcome = {
            let mut s = Serializer::new(
                Stream::Reader(&mut *reader),
                &self.ctx,
                &mut self.identity,
                &self.config,
                sections,
            );
            transfer(&mut s).map_err(|err| (err, s.failure_path()))
        };

        outcome.map_err(|(err, path)| self.fault(Direction::Read, err, path))
    }

    /// Decodes the next record of a batch.
    ///
    /// Returns `None` once the reader is exhausted, and also when decoding
    /// fails; the failure has then been published on the event hub, which
    /// is where batch loops learn why they stopped.
    pub fn read_next<R, F>(&mut self, reader: &mut dyn ByteReader, transfer: F) -> Option<R>
    where
        F: FnOnce(&mut Serializer<'_>) -> SerialResult<R>,
    {
        match reader.at_end() {
            Ok(true) => None,
            Ok(false) => self.read(reader, transfer).ok(),
            Err(err) => {
                let _ = self.fault(Direction::Read, err, None);
                None
            }
        }
    }

    // -------------------------------------------------------------------------
    // Conveniences

    pub fn write_value<T: SerialValue>(
        &mut self,
        writer: &mut dyn ByteWriter,
        value: &mut T,
    ) -> SerialResult<()> {
        self.write(writer, |s| s.add_value(value))
    }

    pub fn read_value<T: SerialValue>(&mut self, reader: &mut dyn ByteReader) -> SerialResult<T> {
        self.read(reader, |s| {
            let mut value = T::default();
            s.add_value(&mut value)?;
            Ok(value)
        })
    }

    pub fn write_versioned<T: Versioned>(
        &mut self,
        writer: &mut dyn ByteWriter,
        value: &mut T,
    ) -> SerialResult<()> {
        self.write(writer, |s| s.add_versioned_value(value).map(drop))
    }

    /// Returns the decoded value and the version it was stored with.
    pub fn read_versioned<T: Versioned>(
        &mut self,
        reader: &mut dyn ByteReader,
    ) -> SerialResult<(T, u8)> {
        self.read(reader, |s| {
            let mut value = T::default();
            let version = s.add_versioned_value(&mut value)?;
            Ok((value, version))
        })
    }

    pub fn write_object<T: SerialObject>(
        &mut self,
        writer: &mut dyn ByteWriter,
        obj: &Obj<T>,
    ) -> SerialResult<()> {
        let mut slot = Some(obj.clone());
        self.write(writer, |s| s.add_object(&mut slot))
    }

    pub fn read_object<T: SerialObject>(
        &mut self,
        reader: &mut dyn ByteReader,
    ) -> SerialResult<Option<Obj<T>>> {
        self.read(reader, |s| {
            let mut slot = None;
            s.add_object(&mut slot)?;
            Ok(slot)
        })
    }

    pub fn write_dynamic(
        &mut self,
        writer: &mut dyn ByteWriter,
        slot: &mut Option<Dynamic>,
    ) -> SerialResult<()> {
        self.write(writer, |s| s.add_dynamic(slot))
    }

    pub fn read_dynamic(&mut self, reader: &mut dyn ByteReader) -> SerialResult<Option<Dynamic>> {
        self.read(reader, |s| {
            let mut slot = None;
            s.add_dynamic(&mut slot)?;
            Ok(slot)
        })
    }

    fn fault(&self, direction: Direction, error: SerialError, path: Option<String>) -> SerialError {
        match path {
            Some(path) => log::error!("{direction:?} failed in {path}: {error}"),
            None => log::error!("{direction:?} failed: {error}"),
        }
        self.ctx.events().publish(SerialEvent::Fault {
            direction,
            error: error.clone(),
        });
        error
    }
}

impl<I: IdentityLayer + fmt::Debug> fmt::Debug for Engine<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;
    use std::sync::Mutex;

    use super::{GraphEngine, HierarchicalEngine};
    use crate::backend::{ByteWriter, MemoryReader, MemoryWriter, StreamReader, StreamWriter};
    use crate::config::EngineConfig;
    use crate::contract::{Obj, SerialObject, SerialValue};
    use crate::engine::Serializer;
    use crate::events::{Direction, SerialEvent};
    use crate::registry::TypeRegistry;
    use crate::{SerialContext, SerialError, SerialResult};

    #[derive(Default, Debug, PartialEq)]
    struct Sample {
        flag: bool,
        small: i8,
        wide: u128,
        ratio: f64,
        letter: char,
        name: Option<String>,
        blob: Option<Vec<u8>>,
        items: Vec<u16>,
    }

    impl SerialValue for Sample {
        fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
            s.add_bool(&mut self.flag)?;
            s.add_i8(&mut self.small)?;
            s.add_u128(&mut self.wide)?;
            s.add_f64(&mut self.ratio)?;
            s.add_char(&mut self.letter)?;
            s.add_string(&mut self.name)?;
            s.add_bytes(&mut self.blob)?;
            s.add_value(&mut self.items)
        }
    }

    #[derive(Default)]
    struct Link {
        next: Option<Obj<Link>>,
    }

    impl SerialObject for Link {
        fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
            s.add_object(&mut self.next)
        }
    }

    crate::impl_typed!(Link, Reference, "link");

    fn context() -> Arc<SerialContext> {
        let registry = Arc::new(TypeRegistry::new());
        registry.register_object::<Link>().unwrap();
        SerialContext::new(registry)
    }

    fn sample() -> Sample {
        Sample {
            flag: true,
            small: -7,
            wide: u128::MAX - 3,
            ratio: 0.25,
            letter: 'Ж',
            name: Some(String::new()),
            blob: None,
            items: vec![1, 2, 3],
        }
    }

    #[test]
    fn value_round_trip_in_both_framings() {
        for sections in [true, false] {
            let config = EngineConfig::default().with_sections(sections);
            let mut engine = HierarchicalEngine::with_config(context(), config);
            let mut source = sample();

            let mut writer = MemoryWriter::new();
            engine.write_value(&mut writer, &mut source).unwrap();
            let mut reader = MemoryReader::new(writer.as_slice());
            assert_eq!(engine.read_value::<Sample>(&mut reader).unwrap(), source);
        }
    }

    #[test]
    fn stream_backend_writes_unsectioned() {
        let ctx = context();
        let mut writer = StreamWriter::new(Vec::new());
        let mut engine = HierarchicalEngine::new(Arc::clone(&ctx));
        engine.write_value(&mut writer, &mut sample()).unwrap();
        let bytes = writer.into_inner();

        // The reader has to be told the stream carries no sections.
        let mut reader = StreamReader::new(bytes.as_slice());
        let mut engine = HierarchicalEngine::with_config(ctx, EngineConfig::default().with_sections(false));
        assert_eq!(engine.read_value::<Sample>(&mut reader).unwrap(), sample());
    }

    #[test]
    fn hierarchical_engine_rejects_cycles() {
        let ctx = context();
        let faults = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&faults);
        ctx.events().subscribe(move |event| {
            if let SerialEvent::Fault { direction, error } = event {
                sink.lock().unwrap().push((*direction, error.clone()));
            }
        });

        let a = Obj::new(Link::default());
        a.borrow_mut().next = Some(a.clone());

        let mut writer = MemoryWriter::new();
        writer.write_u8(0xAB).unwrap();
        let mut engine = HierarchicalEngine::new(ctx);
        let err = engine.write_object(&mut writer, &a).unwrap_err();

        assert!(matches!(err, SerialError::Misuse(_)));
        assert_eq!(writer.as_slice(), &[0xAB]);
        assert_eq!(faults.lock().unwrap().len(), 1);
        assert_eq!(faults.lock().unwrap()[0].0, Direction::Write);
        a.borrow_mut().next = None;
    }

    #[test]
    fn graph_engine_deduplicates() {
        let shared = Obj::new(Link::default());
        let head = Obj::new(Link {
            next: Some(shared.clone()),
        });

        let mut engine = GraphEngine::new(context());
        let mut writer = MemoryWriter::new();
        engine
            .write(&mut writer, |s| {
                s.add_object(&mut Some(head.clone()))?;
                s.add_object(&mut Some(shared.clone()))
            })
            .unwrap();
        assert_eq!(engine.identity().written(), 2);

        let mut reader = MemoryReader::new(writer.as_slice());
        let (head2, shared2) = engine
            .read(&mut reader, |s| {
                let (mut a, mut b) = (None::<Obj<Link>>, None::<Obj<Link>>);
                s.add_object(&mut a)?;
                s.add_object(&mut b)?;
                Ok((a, b))
            })
            .unwrap();
        let inner = head2.unwrap().borrow().next.clone().unwrap();
        assert!(inner.ptr_eq(&shared2.unwrap()));
    }

    #[test]
    fn depth_limit() {
        let config = EngineConfig::default().with_max_depth(3);
        let mut engine = HierarchicalEngine::with_config(context(), config);
        let chain = Obj::new(Link::default());
        let mut tail = chain.clone();
        for _ in 0..4 {
            let next = Obj::new(Link::default());
            tail.borrow_mut().next = Some(next.clone());
            tail = next;
        }

        let mut writer = MemoryWriter::new();
        assert_eq!(
            engine.write_object(&mut writer, &chain),
            Err(SerialError::DepthExceeded(3))
        );
    }

    #[test]
    fn caught_failures_leave_depth_balanced() {
        let config = EngineConfig::default().with_max_depth(2);
        let mut engine = HierarchicalEngine::with_config(context(), config);
        let chain = Obj::new(Link {
            next: Some(Obj::new(Link {
                next: Some(Obj::new(Link::default())),
            })),
        });

        let mut writer = MemoryWriter::new();
        engine
            .write(&mut writer, |s| {
                let mut deep = Some(chain.clone());
                assert_eq!(s.add_object(&mut deep), Err(SerialError::DepthExceeded(2)));
                assert_eq!(s.depth(), 0);

                let mut shallow = Some(Obj::new(Link::default()));
                s.add_object(&mut shallow)?;
                assert_eq!(s.depth(), 0);
                Ok(())
            })
            .unwrap();

        let mut reader = MemoryReader::new(&[]);
        let depth = engine
            .read(&mut reader, |s| {
                let mut items: Vec<u16> = Vec::new();
                assert!(s.add_value(&mut items).unwrap_err().is_incomplete());
                Ok(s.depth())
            })
            .unwrap();
        assert_eq!(depth, 0);
    }
}
