//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use vc_serial::config::ContextConfig;
use vc_serial::contract::{Obj, SerialObject, SerialValue, Versioned};
use vc_serial::engine::Serializer;
use vc_serial::events::SerialEvent;
use vc_serial::info::{TypeKind, TypeShape, Typed};
use vc_serial::registry::TypeRegistry;
use vc_serial::{SerialContext, SerialResult, impl_typed};

// -----------------------------------------------------------------------------
// Objects

#[derive(Default, Debug)]
pub struct Leaf {
    pub weight: u32,
}

impl SerialObject for Leaf {
    fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
        s.add_u32(&mut self.weight)
    }
}

impl_typed!(Leaf, Reference, "leaf");

#[derive(Default, Debug)]
pub struct Node {
    pub label: String,
    pub next: Option<Obj<Node>>,
    pub peer: Option<Obj<Node>>,
}

impl Node {
    pub fn named(label: &str) -> Obj<Node> {
        Obj::new(Node {
            label: label.to_string(),
            ..Node::default()
        })
    }
}

impl SerialObject for Node {
    fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
        s.add_text(&mut self.label)?;
        s.add_object(&mut self.next)?;
        s.add_object(&mut self.peer)
    }
}

impl_typed!(Node, Reference, "node");

// -----------------------------------------------------------------------------
// Generic fixtures

/// How a type argument is stored inside the generic fixtures.
pub trait Member: Typed {
    type Slot: Default + 'static;

    fn transfer_slot(slot: &mut Self::Slot, s: &mut Serializer<'_>) -> SerialResult<()>;
}

impl Member for i32 {
    type Slot = i32;

    fn transfer_slot(slot: &mut i32, s: &mut Serializer<'_>) -> SerialResult<()> {
        s.add_i32(slot)
    }
}

impl Member for Leaf {
    type Slot = Option<Obj<Leaf>>;

    fn transfer_slot(slot: &mut Self::Slot, s: &mut Serializer<'_>) -> SerialResult<()> {
        s.add_object(slot)
    }
}

impl Member for Node {
    type Slot = Option<Obj<Node>>;

    fn transfer_slot(slot: &mut Self::Slot, s: &mut Serializer<'_>) -> SerialResult<()> {
        s.add_object(slot)
    }
}

pub struct Wrapper<T: Member> {
    pub item: T::Slot,
}

impl<T: Member> Default for Wrapper<T> {
    fn default() -> Self {
        Self {
            item: T::Slot::default(),
        }
    }
}

impl<T: Member> SerialObject for Wrapper<T> {
    fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
        T::transfer_slot(&mut self.item, s)
    }
}

impl<T: Member> Typed for Wrapper<T> {
    fn type_shape() -> TypeShape {
        TypeShape::generic::<Self>("common::Wrapper", TypeKind::Reference, vec![T::type_shape()])
            .with_version("1.0.0")
            .with_stable_id("wrapper")
    }
}

impl<T: Member> Member for Wrapper<T> {
    type Slot = Option<Obj<Wrapper<T>>>;

    fn transfer_slot(slot: &mut Self::Slot, s: &mut Serializer<'_>) -> SerialResult<()> {
        s.add_object(slot)
    }
}

pub struct Pair<A: Member, B: Member> {
    pub first: A::Slot,
    pub second: B::Slot,
}

impl<A: Member, B: Member> Default for Pair<A, B> {
    fn default() -> Self {
        Self {
            first: A::Slot::default(),
            second: B::Slot::default(),
        }
    }
}

impl<A: Member, B: Member> SerialValue for Pair<A, B> {
    fn transfer(&mut self, s: &mut Serializer<'_>) -> SerialResult<()> {
        A::transfer_slot(&mut self.first, s)?;
        B::transfer_slot(&mut self.second, s)
    }
}

impl<A: Member, B: Member> Typed for Pair<A, B> {
    fn type_shape() -> TypeShape {
        TypeShape::generic::<Self>(
            "common::Pair",
            TypeKind::Value,
            vec![A::type_shape(), B::type_shape()],
        )
        .with_version("1.0.0")
        .with_stable_id("pair")
    }
}

pub type Nested = Pair<Wrapper<Leaf>, Wrapper<i32>>;

// -----------------------------------------------------------------------------
// Versioned fixture

#[derive(Default, Debug, PartialEq)]
pub struct Telemetry {
    pub id: u32,
    pub reading: f32,
    pub note: Option<String>,
    /// Version seen by the last transfer, not serialized.
    pub seen_version: u8,
}

impl Versioned for Telemetry {
    const VERSION: u8 = 7;

    fn transfer_versioned(&mut self, s: &mut Serializer<'_>, version: u8) -> SerialResult<()> {
        self.seen_version = version;
        s.add_u32(&mut self.id)?;
        s.add_f32(&mut self.reading)?;
        if version >= 7 {
            s.add_string(&mut self.note)?;
        }
        Ok(())
    }
}

impl_typed!(Telemetry, Value, "telemetry");

// -----------------------------------------------------------------------------
// Context helpers

/// A registry with every fixture registered.
pub fn registry() -> Arc<TypeRegistry> {
    let registry = Arc::new(TypeRegistry::new());
    registry.register_object::<Leaf>().unwrap();
    registry.register_object::<Node>().unwrap();
    registry.register_object::<Wrapper<Leaf>>().unwrap();
    registry.register_object::<Wrapper<Node>>().unwrap();
    registry.register_object::<Wrapper<i32>>().unwrap();
    registry.register_value::<Nested>().unwrap();
    registry.register_versioned::<Telemetry>().unwrap();
    registry
}

pub fn context(config: &ContextConfig) -> Arc<SerialContext> {
    SerialContext::builder(registry()).with_config(config).build()
}

/// Collects every event published on `ctx`.
pub fn record_events(ctx: &SerialContext) -> Arc<Mutex<Vec<SerialEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    ctx.events()
        .subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    events
}
