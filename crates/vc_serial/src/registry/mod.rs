//! Closed-world type registry.
//!
//! Types are registered once at startup. Each registration stores a
//! [`TypeMeta`]: the type's [`TypeShape`](crate::info::TypeShape), an
//! optional constructor and an optional [`Extension`]. The registry then
//! serves as the default [`ConstructionService`] and [`ExtensionFactory`]
//! and as the lookup table for both tag resolvers.
//!
//! ## Menu
//!
//! - [`TypeRegistry`]: the concurrent table and its name/tag/arity indices.
//! - [`TypeMeta`]: per-type entry.
//! - [`Extension`], [`ValueExtension`], [`VersionedExtension`],
//!   [`ObjectExtension`]: dynamic body handlers.
//! - [`ConstructionService`], [`ExtensionFactory`]: the seams the engine
//!   calls through.
//!
//! ## auto_register
//!
//! With the `auto_register` feature, [`auto_register!`](crate::auto_register)
//! submits registrations through the [`inventory`] crate and
//! [`TypeRegistry::auto_register`] applies them.

// -----------------------------------------------------------------------------
// Modules

#[cfg(feature = "auto_register")]
#[doc(hidden)]
pub mod auto;
mod extension;
mod type_meta;
mod type_registry;

// -----------------------------------------------------------------------------
// Exports

pub use extension::{Extension, ExtensionFactory};
pub use extension::{ObjectExtension, ValueExtension, VersionedExtension};
pub use type_meta::{Constructor, TypeMeta};
pub use type_registry::{ConstructionService, TypeRegistry};
