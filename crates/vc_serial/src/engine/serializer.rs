use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::any::{TypeId, type_name};

use super::identity::{IdentityLayer, ReadRef, RefWrite};
use super::trace::Trace;
use crate::backend::{ByteReader, ByteWriter, SectionMark};
use crate::config::EngineConfig;
use crate::context::SerialContext;
use crate::contract::{Dynamic, Obj, SerialObject, SerialValue, Versioned};
use crate::events::SerialEvent;
use crate::info::TypeShape;
use crate::resolver::TagResolution;
use crate::{SerialError, SerialResult};

// -----------------------------------------------------------------------------
// Stream

pub(crate) enum Stream<'a> {
    Writer(&'a mut dyn ByteWriter),
    Reader(&'a mut dyn ByteReader),
}

enum Frame {
    Write(SectionMark),
    Read { declared: usize, start: usize },
}

macro_rules! add_primitive {
    ($($add:ident, $write:ident, $read:ident: $ty:ty;)*) => {
        $(
            #[inline]
            pub fn $add(&mut self, value: &mut $ty) -> SerialResult<()> {
                match &mut self.stream {
                    Stream::Writer(writer) => writer.$write(*value),
                    Stream::Reader(reader) => {
                        *value = reader.$read()?;
                        Ok(())
                    }
                }
            }
        )*
    };
}

// -----------------------------------------------------------------------------
// Serializer

/// The bidirectional view a payload describes its fields through.
///
/// A serializer is handed out by an [`Engine`](super::Engine) for the
/// duration of one top-level call. Every `add_*` method writes the field
/// when [`is_writer`](Self::is_writer) holds and overwrites it with the
/// decoded value otherwise, so one `transfer` method serves both
/// directions.
///
/// # Examples
///
/// ```
/// use vc_serial::backend::{MemoryReader, MemoryWriter};
/// use vc_serial::contract::Versioned;
/// use vc_serial::engine::{HierarchicalEngine, Serializer};
/// use vc_serial::registry::TypeRegistry;
/// use vc_serial::{SerialContext, SerialResult};
///
/// #[derive(Default, Debug, PartialEq)]
/// struct Settings {
///     volume: u8,
///     label: Option<String>,
/// }
///
/// impl Versioned for Settings {
///     const VERSION: u8 = 2;
///
///     fn transfer_versioned(&mut self, s: &mut Serializer<'_>, version: u8) -> SerialResult<()> {
///         s.add_u8(&mut self.volume)?;
///         if version >= 2 {
///             s.add_string(&mut self.label)?;
///         }
///         Ok(())
///     }
/// }
///
/// let ctx = SerialContext::new(std::sync::Arc::new(TypeRegistry::new()));
/// let mut engine = HierarchicalEngine::new(ctx);
///
/// let mut source = Settings { volume: 3, label: Some("main".into()) };
/// let mut writer = MemoryWriter::new();
/// engine.write(&mut writer, |s| s.add_versioned_value(&mut source).map(drop)).unwrap();
///
/// let mut reader = MemoryReader::new(writer.as_slice());
/// let decoded = engine
///     .read(&mut reader, |s| {
///         let mut value = Settings::default();
///         s.add_versioned_value(&mut value)?;
///         Ok(value)
///     })
///     .unwrap();
/// assert_eq!(decoded, source);
/// ```
pub struct Serializer<'a> {
    stream: Stream<'a>,
    ctx: &'a SerialContext,
    identity: &'a mut dyn IdentityLayer,
    config: &'a EngineConfig,
    sections: bool,
    depth: usize,
    trace: Trace,
    failure: Option<String>,
}

impl<'a> Serializer<'a> {
    pub(crate) fn new(
        stream: Stream<'a>,
        ctx: &'a SerialContext,
        identity: &'a mut dyn IdentityLayer,
        config: &'a EngineConfig,
        sections: bool,
    ) -> Self {
        Self {
            stream,
            ctx,
            identity,
            config,
            sections,
            depth: 0,
            trace: Trace::default(),
            failure: None,
        }
    }

    /// Returns `true` when encoding.
    #[inline]
    pub fn is_writer(&self) -> bool {
        matches!(self.stream, Stream::Writer(_))
    }

    /// Returns `true` when decoding.
    #[inline]
    pub fn is_reader(&self) -> bool {
        !self.is_writer()
    }

    /// Whether compound bodies are wrapped in sections in this pass.
    #[inline]
    pub fn sections(&self) -> bool {
        self.sections
    }

    #[inline]
    pub fn context(&self) -> &'a SerialContext {
        self.ctx
    }

    /// Current payload nesting depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn failure_path(&self) -> Option<String> {
        self.failure.clone().or_else(|| self.trace.render())
    }

    // -------------------------------------------------------------------------
    // Primitives

    add_primitive! {
        add_bool, write_bool, read_bool: bool;
        add_u8, write_u8, read_u8: u8;
        add_i8, write_i8, read_i8: i8;
        add_u16, write_u16, read_u16: u16;
        add_i16, write_i16, read_i16: i16;
        add_u32, write_u32, read_u32: u32;
        add_i32, write_i32, read_i32: i32;
        add_u64, write_u64, read_u64: u64;
        add_i64, write_i64, read_i64: i64;
        add_u128, write_u128, read_u128: u128;
        add_i128, write_i128, read_i128: i128;
        add_f32, write_f32, read_f32: f32;
        add_f64, write_f64, read_f64: f64;
        add_char, write_char, read_char: char;
    }

    /// A nullable string. `None` and `Some("")` stay distinct.
    pub fn add_string(&mut self, value: &mut Option<String>) -> SerialResult<()> {
        match &mut self.stream {
            Stream::Writer(writer) => writer.write_str(value.as_deref()),
            Stream::Reader(reader) => {
                *value = reader.read_str()?;
                Ok(())
            }
        }
    }

    /// A string that must not be null.
    pub fn add_text(&mut self, value: &mut String) -> SerialResult<()> {
        match &mut self.stream {
            Stream::Writer(writer) => writer.write_str(Some(value.as_str())),
            Stream::Reader(reader) => match reader.read_str()? {
                Some(text) => {
                    *value = text;
                    Ok(())
                }
                None => Err(SerialError::malformed("null where a string is required")),
            },
        }
    }

    /// A nullable byte array.
    pub fn add_bytes(&mut self, value: &mut Option<Vec<u8>>) -> SerialResult<()> {
        match &mut self.stream {
            Stream::Writer(writer) => writer.write_bytes(value.as_deref()),
            Stream::Reader(reader) => {
                *value = reader.read_bytes()?;
                Ok(())
            }
        }
    }

    /// Copies exactly `buf.len()` bytes, without a length prefix.
    pub fn add_raw(&mut self, buf: &mut [u8]) -> SerialResult<()> {
        match &mut self.stream {
            Stream::Writer(writer) => writer.write_raw(buf),
            Stream::Reader(reader) => reader.read_raw(buf),
        }
    }

    /// Writes `current`, or returns the version byte found in the stream.
    pub fn add_version(&mut self, current: u8) -> SerialResult<u8> {
        match &mut self.stream {
            Stream::Writer(writer) => writer.write_u8(current).map(|()| current),
            Stream::Reader(reader) => reader.read_u8(),
        }
    }

    /// A `u32` element count followed by each element.
    ///
    /// When reading, the list is cleared and refilled with default
    /// elements that `each` then decodes into.
    pub fn add_list<T: Default>(
        &mut self,
        list: &mut Vec<T>,
        mut each: impl FnMut(&mut Self, &mut T) -> SerialResult<()>,
    ) -> SerialResult<()> {
        if self.is_writer() {
            let mut count = u32::try_from(list.len())
                .map_err(|_| SerialError::misuse("list longer than u32::MAX elements"))?;
            self.add_u32(&mut count)?;
            for item in list.iter_mut() {
                each(&mut *self, item)?;
            }
        } else {
            let mut count = 0_u32;
            self.add_u32(&mut count)?;
            list.clear();
            list.reserve((count as usize).min(4096));
            for _ in 0..count {
                let mut item = T::default();
                each(&mut *self, &mut item)?;
                list.push(item);
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Compound payloads

    /// A nested value. No identity, always recursed into.
    pub fn add_value<T: SerialValue>(&mut self, value: &mut T) -> SerialResult<()> {
        self.nested(type_name::<T>(), |s| value.transfer(s))
    }

    /// A versioned value: `[version][body]`.
    ///
    /// Returns the version the body was transferred with.
    pub fn add_versioned_value<T: Versioned>(&mut self, value: &mut T) -> SerialResult<u8> {
        self.nested(type_name::<T>(), |s| {
            let version = s.add_version(T::VERSION)?;
            value.transfer_versioned(s, version)?;
            Ok(version)
        })
    }

    /// A nullable object: a presence byte, then the identity path.
    pub fn add_object<T: SerialObject>(&mut self, slot: &mut Option<Obj<T>>) -> SerialResult<()> {
        if self.is_writer() {
            self.add_presence(slot.is_some())?;
            match slot {
                Some(obj) => self.write_reference(obj),
                None => Ok(()),
            }
        } else {
            *slot = if self.add_presence(false)? {
                self.read_instance::<T>()?
            } else {
                None
            };
            Ok(())
        }
    }

    /// Writes a non-null object through the identity layer.
    ///
    /// Building block of [`add_object`](Self::add_object) and of object
    /// extensions.
    pub fn write_reference<T: SerialObject>(&mut self, obj: &Obj<T>) -> SerialResult<()> {
        let Stream::Writer(writer) = &mut self.stream else {
            return Err(SerialError::misuse("write_reference called while reading"));
        };
        let instance = obj.erased();
        match self.identity.write_ref(&instance, &mut **writer)? {
            RefWrite::Known => Ok(()),
            RefWrite::Body => {
                let mut target = obj.try_borrow_mut().map_err(|_| {
                    SerialError::misuse(format!(
                        "`{}` re-entered while being written, cyclic graphs require the graph engine",
                        type_name::<T>()
                    ))
                })?;
                self.nested(type_name::<T>(), |s| target.transfer(s))
            }
        }
    }

    /// Reads a non-null object through the identity layer.
    ///
    /// A fresh instance is obtained from the construction service and bound
    /// to its slot before its body is decoded.
    ///
    /// A reference to an object whose body was inside a skipped payload
    /// fails with [`UnresolvedType`](SerialError::UnresolvedType).
    pub fn read_reference<T: SerialObject>(&mut self) -> SerialResult<Obj<T>> {
        self.read_instance::<T>()?.ok_or_else(|| {
            SerialError::unresolved(format!(
                "`{}` instance was defined inside a skipped payload",
                type_name::<T>()
            ))
        })
    }

    // `None` stands for a reference into a skipped payload, tolerated
    // only with partial results.
    fn read_instance<T: SerialObject>(&mut self) -> SerialResult<Option<Obj<T>>> {
        let max_objects = self.config.max_objects;
        let Stream::Reader(reader) = &mut self.stream else {
            return Err(SerialError::misuse("read_reference called while writing"));
        };
        match self.identity.read_ref(&mut **reader, max_objects)? {
            ReadRef::Resolved(instance) => match Obj::from_erased(instance) {
                Some(obj) => Ok(Some(obj)),
                None => Err(SerialError::malformed(format!(
                    "instance id refers to an object that is not a `{}`",
                    type_name::<T>()
                ))),
            },
            ReadRef::Missing(id) if self.config.partial_results => {
                log::warn!("instance {id} was never decoded, reading it as null");
                Ok(None)
            }
            ReadRef::Missing(id) => Err(SerialError::malformed(format!(
                "instance id {id} is referenced before its body"
            ))),
            ReadRef::Pending(slot) => {
                let Some(instance) = self.ctx.construction().construct(TypeId::of::<T>()) else {
                    return Err(SerialError::ConstructionFailure {
                        type_name: self.display_name::<T>(),
                    });
                };
                let Some(obj) = Obj::<T>::from_erased(Rc::clone(&instance)) else {
                    return Err(SerialError::misuse(format!(
                        "construction service returned an instance of another type than `{}`",
                        type_name::<T>()
                    )));
                };
                self.identity.bind(slot, instance);

                self.nested(type_name::<T>(), |s| {
                    let mut target = obj.try_borrow_mut().map_err(|_| {
                        SerialError::misuse("freshly constructed object is already borrowed")
                    })?;
                    target.transfer(s)
                })?;
                Ok(Some(obj))
            }
        }
    }

    /// A nullable, runtime-typed payload: presence byte, type tag, body.
    ///
    /// The payload type must be registered. If the extension factory cannot
    /// serve it, an [`ExtensionFailed`](SerialEvent::ExtensionFailed) event
    /// is published; with
    /// [`partial_results`](EngineConfig::partial_results) the slot is then
    /// written as null (or skipped and read as null) instead of failing.
    pub fn add_dynamic(&mut self, slot: &mut Option<Dynamic>) -> SerialResult<()> {
        if self.is_writer() {
            self.write_dynamic(slot)
        } else {
            self.read_dynamic(slot)
        }
    }

    fn write_dynamic(&mut self, slot: &mut Option<Dynamic>) -> SerialResult<()> {
        let ctx = self.ctx;
        let Some(payload) = slot.as_mut() else {
            return self.add_presence(false).map(drop);
        };

        let Some(meta) = ctx.registry().get(payload.payload_type()) else {
            return Err(SerialError::unresolved(
                "dynamic payload type is not registered",
            ));
        };
        let shape = meta.shape();
        let extension = match ctx.extensions().resolve(shape) {
            Ok(extension) => extension,
            Err(cause) => {
                self.report_extension_failure(shape, &cause);
                if self.config.partial_results {
                    return self.add_presence(false).map(drop);
                }
                return Err(cause);
            }
        };
        if extension.element_type() != shape.type_id() {
            return Err(SerialError::misuse(format!(
                "extension resolved for `{}` is bound to another type",
                shape.path()
            )));
        }
        self.check_guard(shape);

        self.add_presence(true)?;
        let Stream::Writer(writer) = &mut self.stream else {
            return Err(SerialError::misuse("stream direction changed"));
        };
        ctx.resolver().encode(&mut **writer, shape)?;

        self.nested(shape.path(), |s| extension.write(payload.payload_mut(), s))
    }

    fn read_dynamic(&mut self, slot: &mut Option<Dynamic>) -> SerialResult<()> {
        let ctx = self.ctx;
        if !self.add_presence(false)? {
            *slot = None;
            return Ok(());
        }

        let Stream::Reader(reader) = &mut self.stream else {
            return Err(SerialError::misuse("stream direction changed"));
        };
        let meta = match ctx.resolver().decode(&mut **reader)? {
            TagResolution::Resolved(meta) => meta,
            TagResolution::Unresolved(cause) => return self.skip_dynamic(slot, cause),
        };
        let shape = meta.shape();
        let extension = match ctx.extensions().resolve(shape) {
            Ok(extension) => extension,
            Err(cause) => {
                self.report_extension_failure(shape, &cause);
                return self.skip_dynamic(slot, cause);
            }
        };
        self.check_guard(shape);

        let value = self.nested(shape.path(), |s| extension.read(s))?;

        if value.payload_type() != shape.type_id() {
            return Err(SerialError::misuse(format!(
                "extension for `{}` decoded a payload of another type",
                shape.path()
            )));
        }
        *slot = Some(value);
        Ok(())
    }

    // Drops an unusable dynamic body when the policy and framing allow it.
    fn skip_dynamic(&mut self, slot: &mut Option<Dynamic>, cause: SerialError) -> SerialResult<()> {
        if !(self.config.partial_results && self.sections) {
            return Err(cause);
        }
        log::warn!("skipping dynamic payload: {cause}");
        self.skip_section()?;
        *slot = None;
        Ok(())
    }

    fn report_extension_failure(&self, shape: &TypeShape, cause: &SerialError) {
        log::debug!("no extension for `{}`: {cause}", shape.path());
        self.ctx.events().publish(SerialEvent::ExtensionFailed {
            type_name: shape.path().to_string(),
            cause: cause.clone(),
        });
    }

    // Advisory: a flagged instantiation is reported and processing goes on.
    fn check_guard(&self, shape: &TypeShape) {
        if let Err(SerialError::AotUnsafeInstantiation { type_name }) =
            self.ctx.guard().check(shape)
        {
            self.ctx
                .events()
                .publish(SerialEvent::AotUnsafe { type_name });
        }
    }

    // -------------------------------------------------------------------------
    // Framing

    fn add_presence(&mut self, present: bool) -> SerialResult<bool> {
        match &mut self.stream {
            Stream::Writer(writer) => writer.write_bool(present).map(|()| present),
            Stream::Reader(reader) => reader.read_bool(),
        }
    }

    // Runs `body` inside a section when sections are on.
    fn framed<R>(&mut self, body: impl FnOnce(&mut Self) -> SerialResult<R>) -> SerialResult<R> {
        if !self.sections {
            return body(self);
        }

        let frame = match &mut self.stream {
            Stream::Writer(writer) => Frame::Write(writer.begin_section()?),
            Stream::Reader(reader) => {
                let declared = reader.read_u32()? as usize;
                if let Some(available) = reader.remaining() {
                    if declared > available {
                        return Err(SerialError::IncompleteInput {
                            needed: declared,
                            available,
                        });
                    }
                }
                Frame::Read {
                    declared,
                    start: reader.position(),
                }
            }
        };

        let out = body(self)?;

        match (&mut self.stream, frame) {
            (Stream::Writer(writer), Frame::Write(mark)) => writer.end_section(mark)?,
            (Stream::Reader(reader), Frame::Read { declared, start }) => {
                let consumed = reader.position() - start;
                if consumed > declared {
                    return Err(SerialError::SectionOverrun { declared, consumed });
                }
                reader.skip(declared - consumed)?;
            }
            _ => return Err(SerialError::misuse("stream direction changed")),
        }
        Ok(out)
    }

    fn skip_section(&mut self) -> SerialResult<()> {
        match &mut self.stream {
            Stream::Reader(reader) => {
                let declared = reader.read_u32()? as usize;
                reader.skip(declared)
            }
            Stream::Writer(_) => Err(SerialError::misuse("cannot skip while writing")),
        }
    }

    // One level deeper, framed. Depth and trace are restored on every exit;
    // the innermost failing path is kept for the fault report.
    fn nested<R>(
        &mut self,
        name: &str,
        body: impl FnOnce(&mut Self) -> SerialResult<R>,
    ) -> SerialResult<R> {
        if self.depth >= self.config.max_depth {
            return Err(SerialError::DepthExceeded(self.config.max_depth));
        }
        // Reaching a new level means any earlier failure was handled.
        self.failure = None;
        self.depth += 1;
        self.trace.push(name);

        let out = self.framed(body);
        if out.is_err() && self.failure.is_none() {
            self.failure = self.trace.render();
        }

        self.depth -= 1;
        self.trace.pop();
        out
    }

    fn display_name<T: 'static>(&self) -> String {
        match self.ctx.registry().get(TypeId::of::<T>()) {
            Some(meta) => meta.path().to_string(),
            None => type_name::<T>().to_string(),
        }
    }
}
