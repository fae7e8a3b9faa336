//! Seeds are the half-built values that accumulate while a document streams past.
//!
//! Each JSON composite in the input gets a [Seed], picked by [route] from the shape of the
//! *target type* at that position, never from the shape of the JSON.  Scalars are decoded the
//! moment they arrive; completed child seeds are adopted by their parents and sit there until
//! the document closes, at which point [Seed::spawn] runs the whole tree bottom-up, firing
//! each object's constructor on the way.
use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::{Boxed, CodecRegistry, ErasedCodec, Scalar};
use crate::coords::Coords;
use crate::errors::{BindError, BindResult, Details, ErrorKind};
use crate::schema::binding::{Binding, ScalarBinding};
use crate::schema::cache::{self, ParamShape, SchemaCache, TypeSchema};
use crate::schema::declare::Args;
use crate::schema_error;

/// Shared state for one bind: the schema cache and the codec registry
pub(crate) struct Session<'a> {
    pub schemas: &'a SchemaCache,
    pub codecs: &'a CodecRegistry,
}

impl Session<'_> {
    /// Resolve the codec for a free-standing scalar binding, e.g. a sequence element or a
    /// mapping key
    pub fn resolve_codec(&self, binding: &ScalarBinding) -> BindResult<Arc<dyn ErasedCodec>> {
        cache::resolve_codec(binding, self.codecs, None)
    }
}

/// The two composite forms JSON can open at any point
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Container {
    Object,
    Array,
}

impl Container {
    pub fn describe(self) -> &'static str {
        match self {
            Container::Object => "an object",
            Container::Array => "an array",
        }
    }
}

/// Where a value lands within its parent: under an object key, or as the next array item
#[derive(Copy, Clone)]
pub(crate) enum Slot<'a> {
    Key(&'a str),
    Item,
}

impl<'a> Slot<'a> {
    fn key(self) -> &'a str {
        match self {
            Slot::Key(key) => key,
            Slot::Item => unreachable!("array items never land in keyed seeds"),
        }
    }
}

/// Attach coordinates to an error that doesn't already carry any
fn tag_coords<T>(result: BindResult<T>, at: Coords) -> BindResult<T> {
    result.map_err(|mut error| {
        if error.coords.is_none() {
            error.coords = Some(at);
        }
        error
    })
}

/// Run a scalar through its codec, stepping through the nullable hooks where the target is
/// optional
fn decode_scalar(
    binding: &ScalarBinding,
    codec: &Arc<dyn ErasedCodec>,
    scalar: &Scalar,
    at: Coords,
) -> BindResult<Boxed> {
    match binding.nullable {
        Some(hooks) => match scalar {
            Scalar::Null => Ok((hooks.vacant)()),
            _ => Ok((hooks.wrap)(tag_coords(codec.decode_boxed(scalar), at)?)),
        },
        None => tag_coords(codec.decode_boxed(scalar), at),
    }
}

/// A half-built value of one of the five supported compositions
pub(crate) enum Seed {
    /// A struct being populated field by field
    Object(ObjectSeed),
    /// A sequence of scalars, decoded as they arrive
    ScalarSequence(ScalarSequenceSeed),
    /// A sequence of composites, adopted as child seeds
    SeedSequence(SeedSequenceSeed),
    /// A mapping from keys to scalars
    ScalarMapping(ScalarMappingSeed),
    /// A mapping from keys to composites
    SeedMapping(SeedMappingSeed),
}

impl Seed {
    /// Feed one scalar value into the seed
    pub fn scalar(&mut self, slot: Slot, scalar: Scalar, at: Coords) -> BindResult<()> {
        match self {
            Seed::Object(seed) => seed.scalar(slot, scalar, at),
            Seed::ScalarSequence(seed) => seed.scalar(scalar, at),
            Seed::SeedSequence(seed) => seed.scalar(scalar, at),
            Seed::ScalarMapping(seed) => seed.scalar(slot, scalar, at),
            Seed::SeedMapping(seed) => seed.scalar(slot, scalar, at),
        }
    }

    /// A nested composite is opening; work out the seed that should absorb it
    pub fn child(
        &mut self,
        slot: Slot,
        container: Container,
        at: Coords,
        session: &Session,
    ) -> BindResult<Seed> {
        match self {
            Seed::Object(seed) => seed.child(slot, container, at, session),
            Seed::ScalarSequence(seed) => seed.child(container, at),
            Seed::SeedSequence(seed) => seed.child(container, at, session),
            Seed::ScalarMapping(seed) => seed.child(slot, container, at),
            Seed::SeedMapping(seed) => seed.child(slot, container, at, session),
        }
    }

    /// Take back a completed child seed.  It stays pending until [Seed::spawn]
    pub fn adopt(&mut self, slot: Slot, child: Seed) {
        match self {
            Seed::Object(seed) => seed.adopt(slot, child),
            Seed::SeedSequence(seed) => seed.adopt(child),
            Seed::SeedMapping(seed) => seed.adopt(child),
            _ => unreachable!("scalar seeds never produce children"),
        }
    }

    /// Collapse the seed into a finished boxed value, spawning pending children first
    pub fn spawn(self) -> BindResult<Boxed> {
        match self {
            Seed::Object(seed) => seed.spawn(),
            Seed::ScalarSequence(seed) => Ok((seed.assemble)(seed.items)),
            Seed::SeedSequence(seed) => seed.spawn(),
            Seed::ScalarMapping(seed) => Ok((seed.assemble)(seed.entries)),
            Seed::SeedMapping(seed) => seed.spawn(),
        }
    }
}

/// Pick the seed for a composite opening at `at`, based on the target binding.  The JSON
/// container only ever *vetoes* a pairing; it never picks the shape
pub(crate) fn route(
    binding: &Binding,
    container: Container,
    at: Coords,
    session: &Session,
) -> BindResult<Seed> {
    match binding {
        Binding::Object(object) => match container {
            Container::Object => {
                let schema = session.schemas.resolve(object, session.codecs)?;
                Ok(Seed::Object(ObjectSeed::new(schema, at)))
            }
            Container::Array => schema_error!(
                Details::ShapeMismatch {
                    type_name: object.type_name,
                    found: container.describe(),
                },
                at
            ),
        },
        Binding::Sequence(sequence) => match container {
            Container::Array => match (sequence.element)() {
                Binding::Scalar(element) => {
                    let codec = session.resolve_codec(&element)?;
                    Ok(Seed::ScalarSequence(ScalarSequenceSeed {
                        binding: element,
                        codec,
                        assemble: sequence.assemble,
                        items: vec![],
                    }))
                }
                _ => Ok(Seed::SeedSequence(SeedSequenceSeed {
                    element: sequence.element,
                    assemble: sequence.assemble,
                    children: vec![],
                })),
            },
            Container::Object => schema_error!(
                Details::ShapeMismatch {
                    type_name: sequence.type_name,
                    found: container.describe(),
                },
                at
            ),
        },
        Binding::Mapping(mapping) => match container {
            Container::Object => {
                let key_codec = match (mapping.key)() {
                    Binding::Scalar(key) => {
                        if key.nullable.is_some() {
                            return schema_error!(
                                Details::UnsupportedKeyType(key.type_name),
                                at
                            );
                        }
                        let codec = session.resolve_codec(&key)?;
                        if codec.key_kind().is_none() {
                            return schema_error!(
                                Details::UnsupportedKeyType(key.type_name),
                                at
                            );
                        }
                        codec
                    }
                    other => {
                        return schema_error!(
                            Details::UnsupportedKeyType(other.type_name()),
                            at
                        )
                    }
                };
                let key_kind = key_codec.key_kind().unwrap();
                match (mapping.value)() {
                    Binding::Scalar(value) => {
                        let value_codec = session.resolve_codec(&value)?;
                        Ok(Seed::ScalarMapping(ScalarMappingSeed {
                            key_codec,
                            key_kind,
                            value_binding: value,
                            value_codec,
                            assemble: mapping.assemble,
                            entries: vec![],
                        }))
                    }
                    _ => Ok(Seed::SeedMapping(SeedMappingSeed {
                        key_codec,
                        key_kind,
                        value: mapping.value,
                        assemble: mapping.assemble,
                        entries: vec![],
                    })),
                }
            }
            Container::Array => schema_error!(
                Details::ShapeMismatch {
                    type_name: mapping.type_name,
                    found: container.describe(),
                },
                at
            ),
        },
        Binding::Scalar(scalar) => schema_error!(
            Details::ShapeMismatch {
                type_name: scalar.type_name,
                found: container.describe(),
            },
            at
        ),
    }
}

/// Builds one struct value.  Slots are filled by JSON name; completed children go to
/// `pending` keyed by field index and only spawn when this seed spawns
pub(crate) struct ObjectSeed {
    schema: Arc<TypeSchema>,
    args: Vec<Option<Boxed>>,
    pending: Vec<(usize, Seed)>,
    at: Coords,
}

impl ObjectSeed {
    fn new(schema: Arc<TypeSchema>, at: Coords) -> Self {
        let args = schema.params.iter().map(|_| None).collect();
        ObjectSeed {
            schema,
            args,
            pending: vec![],
            at,
        }
    }

    fn lookup(&self, key: &str, at: Coords) -> BindResult<usize> {
        match self.schema.by_name.get(key) {
            Some(&index) => Ok(index),
            None => schema_error!(
                Details::UnmappedField {
                    type_name: self.schema.type_name,
                    field: key.to_string(),
                },
                at
            ),
        }
    }

    fn scalar(&mut self, slot: Slot, scalar: Scalar, at: Coords) -> BindResult<()> {
        let index = self.lookup(slot.key(), at)?;
        match &self.schema.params[index].shape {
            ParamShape::Scalar { binding, codec } => {
                // a repeated key simply overwrites the previous value
                self.args[index] = Some(decode_scalar(binding, codec, &scalar, at)?);
                Ok(())
            }
            ParamShape::Composite { thunk } => schema_error!(
                Details::ShapeMismatch {
                    type_name: thunk().type_name(),
                    found: scalar.kind(),
                },
                at
            ),
        }
    }

    fn child(
        &mut self,
        slot: Slot,
        container: Container,
        at: Coords,
        session: &Session,
    ) -> BindResult<Seed> {
        let index = self.lookup(slot.key(), at)?;
        match &self.schema.params[index].shape {
            ParamShape::Composite { thunk } => route(&thunk(), container, at, session),
            ParamShape::Scalar { binding, .. } => schema_error!(
                Details::ShapeMismatch {
                    type_name: binding.type_name,
                    found: container.describe(),
                },
                at
            ),
        }
    }

    fn adopt(&mut self, slot: Slot, child: Seed) {
        let index = self.schema.by_name[slot.key()];
        self.pending.push((index, child));
    }

    fn spawn(mut self) -> BindResult<Boxed> {
        for (index, child) in self.pending {
            self.args[index] = Some(child.spawn()?);
        }
        let mut values = HashMap::with_capacity(self.schema.params.len());
        for (index, param) in self.schema.params.iter().enumerate() {
            let value = match self.args[index].take() {
                Some(value) => Some(value),
                None => param.vacant.map(|vacant| vacant()),
            };
            let value = match (value, &param.coerce) {
                (Some(value), Some(coerce)) => Some((*coerce.wrap)(value)),
                (value, _) => value,
            };
            match value {
                Some(value) => {
                    values.insert(param.name, value);
                }
                None => {
                    return schema_error!(
                        Details::MissingField {
                            type_name: self.schema.type_name,
                            field: param.name,
                        },
                        self.at
                    )
                }
            }
        }
        let mut args = Args {
            type_name: self.schema.type_name,
            values,
        };
        tag_coords((*self.schema.construct)(&mut args), self.at)
    }
}

pub(crate) struct ScalarSequenceSeed {
    binding: ScalarBinding,
    codec: Arc<dyn ErasedCodec>,
    assemble: fn(Vec<Boxed>) -> Boxed,
    items: Vec<Boxed>,
}

impl ScalarSequenceSeed {
    fn scalar(&mut self, scalar: Scalar, at: Coords) -> BindResult<()> {
        self.items
            .push(decode_scalar(&self.binding, &self.codec, &scalar, at)?);
        Ok(())
    }

    fn child(&mut self, container: Container, at: Coords) -> BindResult<Seed> {
        schema_error!(
            Details::ShapeMismatch {
                type_name: self.binding.type_name,
                found: container.describe(),
            },
            at
        )
    }
}

pub(crate) struct SeedSequenceSeed {
    element: fn() -> Binding,
    assemble: fn(Vec<Boxed>) -> Boxed,
    children: Vec<Seed>,
}

impl SeedSequenceSeed {
    fn scalar(&mut self, scalar: Scalar, at: Coords) -> BindResult<()> {
        schema_error!(
            Details::ShapeMismatch {
                type_name: (self.element)().type_name(),
                found: scalar.kind(),
            },
            at
        )
    }

    fn child(&mut self, container: Container, at: Coords, session: &Session) -> BindResult<Seed> {
        route(&(self.element)(), container, at, session)
    }

    fn adopt(&mut self, child: Seed) {
        self.children.push(child);
    }

    fn spawn(self) -> BindResult<Boxed> {
        let mut items = Vec::with_capacity(self.children.len());
        for child in self.children {
            items.push(child.spawn()?);
        }
        Ok((self.assemble)(items))
    }
}

pub(crate) struct ScalarMappingSeed {
    key_codec: Arc<dyn ErasedCodec>,
    key_kind: &'static str,
    value_binding: ScalarBinding,
    value_codec: Arc<dyn ErasedCodec>,
    assemble: fn(Vec<(Boxed, Boxed)>) -> Boxed,
    entries: Vec<(Boxed, Boxed)>,
}

impl ScalarMappingSeed {
    fn parse_key(&self, raw: &str, at: Coords) -> BindResult<Boxed> {
        match self.key_codec.parse_key(raw) {
            Some(key) => Ok(key),
            None => schema_error!(
                Details::InvalidKey {
                    raw: raw.to_string(),
                    kind: self.key_kind,
                },
                at
            ),
        }
    }

    fn scalar(&mut self, slot: Slot, scalar: Scalar, at: Coords) -> BindResult<()> {
        let key = self.parse_key(slot.key(), at)?;
        let value = decode_scalar(&self.value_binding, &self.value_codec, &scalar, at)?;
        self.entries.push((key, value));
        Ok(())
    }

    fn child(&mut self, slot: Slot, container: Container, at: Coords) -> BindResult<Seed> {
        self.parse_key(slot.key(), at)?;
        schema_error!(
            Details::ShapeMismatch {
                type_name: self.value_binding.type_name,
                found: container.describe(),
            },
            at
        )
    }
}

pub(crate) struct SeedMappingSeed {
    key_codec: Arc<dyn ErasedCodec>,
    key_kind: &'static str,
    value: fn() -> Binding,
    assemble: fn(Vec<(Boxed, Boxed)>) -> Boxed,
    entries: Vec<(Boxed, Option<Seed>)>,
}

impl SeedMappingSeed {
    fn parse_key(&self, raw: &str, at: Coords) -> BindResult<Boxed> {
        match self.key_codec.parse_key(raw) {
            Some(key) => Ok(key),
            None => schema_error!(
                Details::InvalidKey {
                    raw: raw.to_string(),
                    kind: self.key_kind,
                },
                at
            ),
        }
    }

    fn scalar(&mut self, slot: Slot, scalar: Scalar, at: Coords) -> BindResult<()> {
        self.parse_key(slot.key(), at)?;
        schema_error!(
            Details::ShapeMismatch {
                type_name: (self.value)().type_name(),
                found: scalar.kind(),
            },
            at
        )
    }

    fn child(
        &mut self,
        slot: Slot,
        container: Container,
        at: Coords,
        session: &Session,
    ) -> BindResult<Seed> {
        let key = self.parse_key(slot.key(), at)?;
        self.entries.push((key, None));
        route(&(self.value)(), container, at, session)
    }

    fn adopt(&mut self, child: Seed) {
        self.entries.last_mut().unwrap().1 = Some(child);
    }

    fn spawn(self) -> BindResult<Boxed> {
        let mut entries = Vec::with_capacity(self.entries.len());
        for (key, child) in self.entries {
            entries.push((key, child.unwrap().spawn()?));
        }
        Ok((self.assemble)(entries))
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::{route, Container, Seed, Session, Slot};
    use crate::codec::{CodecRegistry, Scalar};
    use crate::coords::Coords;
    use crate::errors::Details;
    use crate::schema::binding::Bind;
    use crate::schema::cache::SchemaCache;

    struct Fixture {
        schemas: SchemaCache,
        codecs: CodecRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                schemas: SchemaCache::default(),
                codecs: CodecRegistry::default(),
            }
        }

        fn session(&self) -> Session<'_> {
            Session {
                schemas: &self.schemas,
                codecs: &self.codecs,
            }
        }
    }

    #[test]
    fn scalar_sequences_should_collect_decoded_items() {
        let fixture = Fixture::new();
        let session = fixture.session();
        let binding = Vec::<i64>::binding();
        let mut seed = route(&binding, Container::Array, Coords::default(), &session).unwrap();
        for value in [1, 2, 3] {
            seed.scalar(Slot::Item, Scalar::Integer(value), Coords::default())
                .unwrap();
        }
        let spawned = seed.spawn().unwrap();
        assert_eq!(*spawned.downcast::<Vec<i64>>().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn sequences_should_veto_an_object_container() {
        let fixture = Fixture::new();
        let session = fixture.session();
        let binding = Vec::<i64>::binding();
        let result = route(&binding, Container::Object, Coords::default(), &session);
        assert!(matches!(
            result.err().unwrap().details,
            Details::ShapeMismatch { .. }
        ));
    }

    #[test]
    fn nested_sequences_should_route_by_element_shape() {
        let fixture = Fixture::new();
        let session = fixture.session();
        let binding = Vec::<Vec<u8>>::binding();
        let mut outer = route(&binding, Container::Array, Coords::default(), &session).unwrap();
        let mut inner = outer
            .child(Slot::Item, Container::Array, Coords::default(), &session)
            .unwrap();
        inner
            .scalar(Slot::Item, Scalar::Integer(7), Coords::default())
            .unwrap();
        outer.adopt(Slot::Item, inner);
        let spawned = outer.spawn().unwrap();
        assert_eq!(*spawned.downcast::<Vec<Vec<u8>>>().unwrap(), vec![vec![7]]);
    }

    #[test]
    fn scalar_mappings_should_convert_keys_strictly() {
        let fixture = Fixture::new();
        let session = fixture.session();
        let binding = IndexMap::<i32, f64>::binding();
        let mut seed = route(&binding, Container::Object, Coords::default(), &session).unwrap();
        seed.scalar(Slot::Key("42"), Scalar::Float(1.5), Coords::default())
            .unwrap();
        let error = seed
            .scalar(Slot::Key("4x"), Scalar::Float(2.5), Coords::default())
            .err()
            .unwrap();
        assert_eq!(
            error.details,
            Details::InvalidKey {
                raw: "4x".to_string(),
                kind: "i32",
            }
        );
    }

    #[test]
    fn mappings_should_preserve_insertion_order() {
        let fixture = Fixture::new();
        let session = fixture.session();
        let binding = IndexMap::<String, i64>::binding();
        let mut seed = route(&binding, Container::Object, Coords::default(), &session).unwrap();
        for (key, value) in [("zulu", 1), ("alpha", 2), ("mike", 3)] {
            seed.scalar(Slot::Key(key), Scalar::Integer(value), Coords::default())
                .unwrap();
        }
        let spawned = seed.spawn().unwrap();
        let map = *spawned.downcast::<IndexMap<String, i64>>().unwrap();
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["zulu", "alpha", "mike"]);
    }

    #[test]
    fn repeated_mapping_keys_should_keep_the_last_value() {
        let fixture = Fixture::new();
        let session = fixture.session();
        let binding = IndexMap::<String, i64>::binding();
        let mut seed = route(&binding, Container::Object, Coords::default(), &session).unwrap();
        for value in [1, 2] {
            seed.scalar(Slot::Key("dup"), Scalar::Integer(value), Coords::default())
                .unwrap();
        }
        let spawned = seed.spawn().unwrap();
        let map = *spawned.downcast::<IndexMap<String, i64>>().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["dup"], 2);
    }

    #[test]
    fn optional_keys_should_be_rejected_up_front() {
        let fixture = Fixture::new();
        let session = fixture.session();
        let binding = IndexMap::<Option<i32>, i64>::binding();
        let result = route(&binding, Container::Object, Coords::default(), &session);
        assert!(matches!(
            result.err().unwrap().details,
            Details::UnsupportedKeyType(_)
        ));
    }
}
