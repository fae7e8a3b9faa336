//! The schema layer: type classification, field declarations and the derived schema cache.
//!
//! Everything the binder knows about a target type flows from its [binding::Bind]
//! implementation, which classifies the type into one of the supported shapes.  Object shapes
//! additionally carry a [declare::Descriptor] listing their fields, and are compiled down into
//! cached schemas by the machinery in [cache].

/// The [binding::Bind] trait and the shape classification behind it
pub mod binding;
/// Schema derivation and the per-type schema cache
pub mod cache;
/// The declaration surface used to describe object types, field by field
pub mod declare;
