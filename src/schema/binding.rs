//! Classification of Rust types into the shapes the binder knows how to drive.
//!
//! A [Bind] implementation hands back a [Binding], which sorts the implementing type into one
//! of four shapes: a scalar, a sequence, a mapping or an object.  Composite shapes never touch
//! their child types while being built; children sit behind `fn()` thunks which are only pulled
//! on when a child value actually turns up in the input.  That keeps self-referential type
//! graphs from recursing at classification time.
use std::any::{Any, TypeId};
use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::codec::{Boxed, ErasedCodec, Scalar};
use crate::decode_error;
use crate::encode_error;
use crate::errors::{BindError, BindResult, Details, ErrorKind};
use crate::schema::declare::Descriptor;

/// Implemented by any type the binder can decode into, or encode from.
///
/// Implementations for the primitive scalars, [String], [`Option`], [`Vec`] and [IndexMap] ship
/// with the crate.  Object types are normally covered via the
/// [bind_object](crate::bind_object) and [bind_enum](crate::bind_enum) macros rather than by
/// hand.
pub trait Bind: 'static {
    /// Classify the implementing type
    fn binding() -> Binding;
}

/// The shape of a target type, as seen by the binder
pub enum Binding {
    /// A single JSON scalar value
    Scalar(ScalarBinding),
    /// A JSON array of values
    Sequence(SequenceBinding),
    /// A JSON object treated as a keyed collection
    Mapping(MappingBinding),
    /// A JSON object mapped field-by-field onto a struct
    Object(ObjectBinding),
}

impl Binding {
    /// Classify `T` as a plain scalar, with codec resolution deferred to bind time
    pub fn scalar<T: 'static>() -> Self {
        Binding::Scalar(ScalarBinding {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            source: CodecSource::Registry,
            nullable: None,
        })
    }

    /// Classify `T` as an object shape, described by the supplied [Descriptor] thunk
    pub fn object<T: 'static>(descriptor: fn() -> Descriptor) -> Self {
        Binding::Object(ObjectBinding {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            descriptor,
        })
    }

    /// Classify `E` as an enumeration: a scalar which travels as a string drawn from a fixed
    /// set of constant names
    pub fn enumeration<E: PartialEq + 'static>(
        name: &'static str,
        constants: &'static [(&'static str, fn() -> E)],
    ) -> Self {
        Binding::Scalar(ScalarBinding {
            type_id: TypeId::of::<E>(),
            type_name: name,
            source: CodecSource::Inline(Arc::new(EnumCodec { name, constants })),
            nullable: None,
        })
    }

    /// The name of the bound type, for error reporting
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Binding::Scalar(scalar) => scalar.type_name,
            Binding::Sequence(sequence) => sequence.type_name,
            Binding::Mapping(mapping) => mapping.type_name,
            Binding::Object(object) => object.type_name,
        }
    }
}

/// Where the codec for a scalar binding comes from
#[derive(Clone)]
pub(crate) enum CodecSource {
    /// The binding carries its own codec, e.g. an enumeration constant table
    Inline(Arc<dyn ErasedCodec>),
    /// Resolve against the registry at bind time
    Registry,
    /// The type can't currently be bound; carries the reason
    Unsupported(&'static str),
}

/// A scalar shape.  For `Option` targets the `type_id` is that of the *inner* type, since that
/// is what the codec converts, while `nullable` carries the hooks for stepping in and out of
/// the option
#[derive(Clone)]
pub struct ScalarBinding {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) source: CodecSource,
    pub(crate) nullable: Option<NullableHooks>,
}

/// The view through a nullable value at encode time
pub(crate) enum NullPeek<'a> {
    /// The value is absent and renders as `null`
    Null,
    /// The value is present; the reference is to the inner value
    Inner(&'a dyn Any),
}

/// Monomorphised hooks for moving between `T` and `Option<T>` without knowing `T`
#[derive(Copy, Clone)]
pub(crate) struct NullableHooks {
    /// Produce a boxed `None`
    pub vacant: fn() -> Boxed,
    /// Lift a boxed inner value into a boxed `Some`
    pub wrap: fn(Boxed) -> Boxed,
    /// Look through a borrowed option at the inner value
    pub peek: for<'a> fn(&'a dyn Any) -> NullPeek<'a>,
}

/// A sequence shape, with the element type behind a thunk
pub struct SequenceBinding {
    pub(crate) type_name: &'static str,
    /// Classification thunk for the element type
    pub(crate) element: fn() -> Binding,
    /// Collect decoded elements into a boxed sequence value
    pub(crate) assemble: fn(Vec<Boxed>) -> Boxed,
    /// Borrow the elements of a sequence value for encoding
    pub(crate) elements: for<'a> fn(&'a dyn Any) -> Vec<&'a dyn Any>,
}

/// A mapping shape, with both the key and value types behind thunks
pub struct MappingBinding {
    pub(crate) type_name: &'static str,
    /// Classification thunk for the key type
    pub(crate) key: fn() -> Binding,
    /// Classification thunk for the value type
    pub(crate) value: fn() -> Binding,
    /// Collect decoded entries into a boxed mapping value
    pub(crate) assemble: fn(Vec<(Boxed, Boxed)>) -> Boxed,
    /// Borrow the entries of a mapping value for encoding
    pub(crate) entries: for<'a> fn(&'a dyn Any) -> Vec<(&'a dyn Any, &'a dyn Any)>,
}

/// An object shape.  The field list sits behind a thunk so that an object type may refer to
/// itself, directly or through intermediate composites
pub struct ObjectBinding {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) descriptor: fn() -> Descriptor,
}

/// Codec backing an enumeration binding: decodes exact constant names, encodes by scanning the
/// constant table for an equal value
struct EnumCodec<E: 'static> {
    name: &'static str,
    constants: &'static [(&'static str, fn() -> E)],
}

impl<E: PartialEq + 'static> ErasedCodec for EnumCodec<E> {
    fn target(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn type_name(&self) -> &'static str {
        self.name
    }

    fn decode_boxed(&self, scalar: &Scalar) -> BindResult<Boxed> {
        match scalar {
            Scalar::Str(raw) => match self.constants.iter().find(|(name, _)| *name == raw.as_str()) {
                Some((_, constant)) => Ok(Box::new(constant())),
                None => decode_error!(Details::InvalidEnumConstant {
                    raw: raw.clone(),
                    type_name: self.name,
                }),
            },
            other => decode_error!(Details::ScalarMismatch {
                expected: "a string",
                found: other.kind(),
            }),
        }
    }

    fn encode_boxed(&self, value: &dyn Any) -> BindResult<Scalar> {
        let value = value.downcast_ref::<E>().unwrap();
        match self.constants.iter().find(|(_, constant)| constant() == *value) {
            Some((name, _)) => Ok(Scalar::Str(name.to_string())),
            None => encode_error!(Details::UnmappedEnumConstant(self.name)),
        }
    }

    fn key_kind(&self) -> Option<&'static str> {
        Some(self.name)
    }

    fn parse_key(&self, raw: &str) -> Option<Boxed> {
        self.constants
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, constant)| Box::new(constant()) as Boxed)
    }

    fn render_key(&self, value: &dyn Any) -> Option<String> {
        let value = value.downcast_ref::<E>()?;
        self.constants
            .iter()
            .find(|(_, constant)| constant() == *value)
            .map(|(name, _)| name.to_string())
    }
}

macro_rules! scalar_bind {
    ($($t : ty),*) => {
        $(
            impl Bind for $t {
                fn binding() -> Binding {
                    Binding::scalar::<$t>()
                }
            }
        )*
    };
}

scalar_bind!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, String);

fn vacant_option<T: 'static>() -> Boxed {
    Box::new(None::<T>)
}

fn wrap_option<T: 'static>(inner: Boxed) -> Boxed {
    Box::new(Some(*inner.downcast::<T>().unwrap()))
}

fn peek_option<T: 'static>(value: &dyn Any) -> NullPeek<'_> {
    match value.downcast_ref::<Option<T>>().unwrap() {
        Some(inner) => NullPeek::Inner(inner),
        None => NullPeek::Null,
    }
}

impl<T: Bind> Bind for Option<T> {
    /// Options are only supported over scalar types, where they absorb `null` and absent
    /// fields.  An option over a composite classifies as unsupported rather than panicking,
    /// so the failure surfaces as a schema error against the owning type
    fn binding() -> Binding {
        let unsupported = |reason| {
            Binding::Scalar(ScalarBinding {
                type_id: TypeId::of::<Option<T>>(),
                type_name: std::any::type_name::<Option<T>>(),
                source: CodecSource::Unsupported(reason),
                nullable: None,
            })
        };
        match T::binding() {
            Binding::Scalar(inner) => {
                if inner.nullable.is_some() {
                    return unsupported("options can't nest");
                }
                Binding::Scalar(ScalarBinding {
                    type_id: inner.type_id,
                    type_name: std::any::type_name::<Option<T>>(),
                    source: inner.source,
                    nullable: Some(NullableHooks {
                        vacant: vacant_option::<T>,
                        wrap: wrap_option::<T>,
                        peek: peek_option::<T>,
                    }),
                })
            }
            _ => unsupported("only scalar values can be optional"),
        }
    }
}

fn assemble_vec<T: 'static>(items: Vec<Boxed>) -> Boxed {
    Box::new(
        items
            .into_iter()
            .map(|item| *item.downcast::<T>().unwrap())
            .collect::<Vec<T>>(),
    )
}

fn elements_vec<T: 'static>(value: &dyn Any) -> Vec<&dyn Any> {
    value
        .downcast_ref::<Vec<T>>()
        .unwrap()
        .iter()
        .map(|item| item as &dyn Any)
        .collect()
}

impl<T: Bind> Bind for Vec<T> {
    fn binding() -> Binding {
        Binding::Sequence(SequenceBinding {
            type_name: std::any::type_name::<Vec<T>>(),
            element: T::binding,
            assemble: assemble_vec::<T>,
            elements: elements_vec::<T>,
        })
    }
}

fn assemble_map<K, V>(entries: Vec<(Boxed, Boxed)>) -> Boxed
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    Box::new(
        entries
            .into_iter()
            .map(|(key, value)| (*key.downcast::<K>().unwrap(), *value.downcast::<V>().unwrap()))
            .collect::<IndexMap<K, V>>(),
    )
}

fn entries_map<K, V>(value: &dyn Any) -> Vec<(&dyn Any, &dyn Any)>
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    value
        .downcast_ref::<IndexMap<K, V>>()
        .unwrap()
        .iter()
        .map(|(key, value)| (key as &dyn Any, value as &dyn Any))
        .collect()
}

impl<K, V> Bind for IndexMap<K, V>
where
    K: Bind + Eq + Hash,
    V: Bind,
{
    fn binding() -> Binding {
        Binding::Mapping(MappingBinding {
            type_name: std::any::type_name::<IndexMap<K, V>>(),
            key: K::binding,
            value: V::binding,
            assemble: assemble_map::<K, V>,
            entries: entries_map::<K, V>,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Bind, Binding, CodecSource, NullPeek};
    use crate::codec::{ErasedCodec, Scalar};
    use indexmap::IndexMap;

    #[test]
    fn primitives_should_classify_as_scalars() {
        assert!(matches!(i32::binding(), Binding::Scalar(_)));
        assert!(matches!(String::binding(), Binding::Scalar(_)));
        assert!(matches!(bool::binding(), Binding::Scalar(_)));
    }

    #[test]
    fn vectors_should_classify_as_sequences() {
        assert!(matches!(Vec::<i32>::binding(), Binding::Sequence(_)));
        assert!(matches!(
            Vec::<Vec<String>>::binding(),
            Binding::Sequence(_)
        ));
    }

    #[test]
    fn maps_should_classify_as_mappings() {
        assert!(matches!(
            IndexMap::<String, f64>::binding(),
            Binding::Mapping(_)
        ));
    }

    #[test]
    fn options_should_stay_scalar_and_pick_up_null_hooks() {
        match Option::<u32>::binding() {
            Binding::Scalar(scalar) => {
                let hooks = scalar.nullable.expect("hooks should be present");
                let vacant = (hooks.vacant)();
                assert!(matches!((hooks.peek)(vacant.as_ref()), NullPeek::Null));
                let wrapped = (hooks.wrap)(Box::new(42u32));
                assert_eq!(
                    *wrapped.downcast::<Option<u32>>().unwrap(),
                    Some(42u32)
                );
            }
            _ => panic!("expected a scalar binding"),
        }
    }

    #[test]
    fn options_over_composites_should_classify_as_unsupported() {
        match Option::<Vec<i32>>::binding() {
            Binding::Scalar(scalar) => {
                assert!(matches!(scalar.source, CodecSource::Unsupported(_)))
            }
            _ => panic!("expected a scalar binding"),
        }
    }

    #[test]
    fn enumerations_should_decode_exact_constant_names() {
        #[derive(Debug, PartialEq)]
        enum Colour {
            Red,
            Teal,
        }
        impl Bind for Colour {
            fn binding() -> Binding {
                const CONSTANTS: &[(&str, fn() -> Colour)] =
                    &[("RED", || Colour::Red), ("TEAL", || Colour::Teal)];
                Binding::enumeration::<Colour>("Colour", CONSTANTS)
            }
        }

        let binding = Colour::binding();
        let codec = match &binding {
            Binding::Scalar(scalar) => match &scalar.source {
                CodecSource::Inline(codec) => codec.clone(),
                _ => panic!("expected an inline codec"),
            },
            _ => panic!("expected a scalar binding"),
        };
        let decoded = codec.decode_boxed(&Scalar::Str("TEAL".to_string())).unwrap();
        assert_eq!(*decoded.downcast::<Colour>().unwrap(), Colour::Teal);
        assert!(codec.decode_boxed(&Scalar::Str("teal".to_string())).is_err());
        assert_eq!(
            codec.encode_boxed(&Colour::Red).unwrap(),
            Scalar::Str("RED".to_string())
        );
    }
}
