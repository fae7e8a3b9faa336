//! Scalar codecs sit at the boundary between JSON scalar values and their Rust counterparts.
//!
//! Every scalar field conversion, in both directions, runs through a [ScalarCodec]. The crate
//! ships codecs for the primitive integer widths, floats, booleans and [String]; anything more
//! exotic can be covered by registering a custom codec against the target type, or by attaching
//! one directly to a field declaration.
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use crate::decode_error;
use crate::encode_error;
use crate::errors::{BindError, BindResult, Details, ErrorKind};

/// Values built up during a bind are passed around type-erased
pub(crate) type Boxed = Box<dyn Any>;

/// A single JSON scalar value, lifted out of the token stream
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// A string value, with all escapes already translated
    Str(String),
    /// A numeric value with no fractional or exponent part in the input
    Integer(i64),
    /// A numeric value written with a fractional or exponent part
    Float(f64),
    /// Either of the `true` / `false` literals
    Boolean(bool),
    /// The `null` literal
    Null,
}

impl Scalar {
    /// A short description of the flavour of scalar, used in error reporting
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Str(_) => "a string",
            Scalar::Integer(_) => "an integer",
            Scalar::Float(_) => "a float",
            Scalar::Boolean(_) => "a boolean",
            Scalar::Null => "null",
        }
    }
}

/// A symmetric pair of conversions between a JSON scalar and a Rust value of type `T`.
///
/// Implementations registered with a
/// [Binder](crate::parser::Binder) take precedence over the built-in codecs for the same target
/// type, and a codec attached to an individual field takes precedence over both.
pub trait ScalarCodec<T>: Send + Sync + 'static {
    /// Convert a JSON scalar into a `T`
    fn decode(&self, scalar: &Scalar) -> BindResult<T>;
    /// Convert a `T` back into a JSON scalar
    fn encode(&self, value: &T) -> BindResult<Scalar>;
}

/// Object-safe face of a [ScalarCodec], with the target type boxed away.
///
/// Codecs covering types which are usable as JSON object keys additionally implement the
/// `*_key` family; everything else reports [None] and is rejected when a mapping is derived.
pub(crate) trait ErasedCodec: Send + Sync {
    /// The [TypeId] of the conversion target
    fn target(&self) -> TypeId;
    /// Name of the conversion target, for error reporting
    fn type_name(&self) -> &'static str;
    /// Decode into a boxed value of the target type
    fn decode_boxed(&self, scalar: &Scalar) -> BindResult<Boxed>;
    /// Encode from a borrowed value of the target type
    fn encode_boxed(&self, value: &dyn Any) -> BindResult<Scalar>;
    /// A short description of the key flavour, if the target can be an object key
    fn key_kind(&self) -> Option<&'static str>;
    /// Strictly convert a raw object key into a boxed value of the target type
    fn parse_key(&self, raw: &str) -> Option<Boxed>;
    /// Render a value of the target type as a raw object key
    fn render_key(&self, value: &dyn Any) -> Option<String>;
}

/// Bridges a user-supplied [ScalarCodec] onto the erased interface
pub(crate) struct CodecAdapter<T, C> {
    codec: C,
    target: PhantomData<fn() -> T>,
}

impl<T, C> CodecAdapter<T, C> {
    pub fn new(codec: C) -> Self {
        CodecAdapter {
            codec,
            target: PhantomData,
        }
    }
}

impl<T: 'static, C: ScalarCodec<T>> ErasedCodec for CodecAdapter<T, C> {
    fn target(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn decode_boxed(&self, scalar: &Scalar) -> BindResult<Boxed> {
        self.codec.decode(scalar).map(|value| Box::new(value) as Boxed)
    }

    fn encode_boxed(&self, value: &dyn Any) -> BindResult<Scalar> {
        self.codec.encode(value.downcast_ref::<T>().unwrap())
    }

    fn key_kind(&self) -> Option<&'static str> {
        None
    }

    fn parse_key(&self, _raw: &str) -> Option<Boxed> {
        None
    }

    fn render_key(&self, _value: &dyn Any) -> Option<String> {
        None
    }
}

macro_rules! integer_codec {
    ($name : ident, $t : ty) => {
        pub(crate) struct $name;

        impl ErasedCodec for $name {
            fn target(&self) -> TypeId {
                TypeId::of::<$t>()
            }

            fn type_name(&self) -> &'static str {
                stringify!($t)
            }

            fn decode_boxed(&self, scalar: &Scalar) -> BindResult<Boxed> {
                match scalar {
                    Scalar::Integer(value) => match <$t>::try_from(*value) {
                        Ok(converted) => Ok(Box::new(converted)),
                        Err(_) => decode_error!(Details::OutOfRange {
                            value: value.to_string(),
                            type_name: stringify!($t),
                        }),
                    },
                    other => decode_error!(Details::ScalarMismatch {
                        expected: "an integer",
                        found: other.kind(),
                    }),
                }
            }

            fn encode_boxed(&self, value: &dyn Any) -> BindResult<Scalar> {
                let value = value.downcast_ref::<$t>().unwrap();
                match i64::try_from(*value) {
                    Ok(converted) => Ok(Scalar::Integer(converted)),
                    Err(_) => encode_error!(Details::OutOfRange {
                        value: value.to_string(),
                        type_name: "i64",
                    }),
                }
            }

            fn key_kind(&self) -> Option<&'static str> {
                Some(stringify!($t))
            }

            fn parse_key(&self, raw: &str) -> Option<Boxed> {
                lexical::parse::<$t, _>(raw)
                    .ok()
                    .map(|value| Box::new(value) as Boxed)
            }

            fn render_key(&self, value: &dyn Any) -> Option<String> {
                value.downcast_ref::<$t>().map(|value| value.to_string())
            }
        }
    };
}

integer_codec!(I8Codec, i8);
integer_codec!(I16Codec, i16);
integer_codec!(I32Codec, i32);
integer_codec!(I64Codec, i64);
integer_codec!(IsizeCodec, isize);
integer_codec!(U8Codec, u8);
integer_codec!(U16Codec, u16);
integer_codec!(U32Codec, u32);
integer_codec!(U64Codec, u64);
integer_codec!(UsizeCodec, usize);

/// Floats will happily absorb an integer representation as well as a float one
macro_rules! float_codec {
    ($name : ident, $t : ty, $widen : expr) => {
        pub(crate) struct $name;

        impl ErasedCodec for $name {
            fn target(&self) -> TypeId {
                TypeId::of::<$t>()
            }

            fn type_name(&self) -> &'static str {
                stringify!($t)
            }

            fn decode_boxed(&self, scalar: &Scalar) -> BindResult<Boxed> {
                match scalar {
                    Scalar::Float(value) => Ok(Box::new(*value as $t)),
                    Scalar::Integer(value) => Ok(Box::new(*value as $t)),
                    other => decode_error!(Details::ScalarMismatch {
                        expected: "a number",
                        found: other.kind(),
                    }),
                }
            }

            fn encode_boxed(&self, value: &dyn Any) -> BindResult<Scalar> {
                let value = value.downcast_ref::<$t>().unwrap();
                Ok(Scalar::Float($widen(*value)))
            }

            fn key_kind(&self) -> Option<&'static str> {
                None
            }

            fn parse_key(&self, _raw: &str) -> Option<Boxed> {
                None
            }

            fn render_key(&self, _value: &dyn Any) -> Option<String> {
                None
            }
        }
    };
}

float_codec!(F32Codec, f32, widen_f32);
float_codec!(F64Codec, f64, std::convert::identity);

/// Widen an `f32` by bouncing through its shortest decimal representation, so that a value such
/// as `0.1f32` renders as `0.1` rather than the raw widened `0.10000000149011612`
fn widen_f32(value: f32) -> f64 {
    if !value.is_finite() {
        return value as f64;
    }
    let mut buffer = ryu::Buffer::new();
    fast_float::parse(buffer.format(value)).unwrap()
}

pub(crate) struct BoolCodec;

impl ErasedCodec for BoolCodec {
    fn target(&self) -> TypeId {
        TypeId::of::<bool>()
    }

    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn decode_boxed(&self, scalar: &Scalar) -> BindResult<Boxed> {
        match scalar {
            Scalar::Boolean(value) => Ok(Box::new(*value)),
            other => decode_error!(Details::ScalarMismatch {
                expected: "a boolean",
                found: other.kind(),
            }),
        }
    }

    fn encode_boxed(&self, value: &dyn Any) -> BindResult<Scalar> {
        Ok(Scalar::Boolean(*value.downcast_ref::<bool>().unwrap()))
    }

    fn key_kind(&self) -> Option<&'static str> {
        Some("bool")
    }

    fn parse_key(&self, raw: &str) -> Option<Boxed> {
        match raw {
            "true" => Some(Box::new(true)),
            "false" => Some(Box::new(false)),
            _ => None,
        }
    }

    fn render_key(&self, value: &dyn Any) -> Option<String> {
        value.downcast_ref::<bool>().map(|value| value.to_string())
    }
}

pub(crate) struct StringCodec;

impl ErasedCodec for StringCodec {
    fn target(&self) -> TypeId {
        TypeId::of::<String>()
    }

    fn type_name(&self) -> &'static str {
        "String"
    }

    fn decode_boxed(&self, scalar: &Scalar) -> BindResult<Boxed> {
        match scalar {
            Scalar::Str(value) => Ok(Box::new(value.clone())),
            other => decode_error!(Details::ScalarMismatch {
                expected: "a string",
                found: other.kind(),
            }),
        }
    }

    fn encode_boxed(&self, value: &dyn Any) -> BindResult<Scalar> {
        Ok(Scalar::Str(value.downcast_ref::<String>().unwrap().clone()))
    }

    fn key_kind(&self) -> Option<&'static str> {
        Some("string")
    }

    fn parse_key(&self, raw: &str) -> Option<Boxed> {
        Some(Box::new(raw.to_string()))
    }

    fn render_key(&self, value: &dyn Any) -> Option<String> {
        value.downcast_ref::<String>().cloned()
    }
}

/// Locate the built-in codec for a given target type, if there is one
fn builtin(target: TypeId) -> Option<Arc<dyn ErasedCodec>> {
    macro_rules! check {
        ($t : ty, $codec : expr) => {
            if target == TypeId::of::<$t>() {
                return Some(Arc::new($codec));
            }
        };
    }
    check!(i8, I8Codec);
    check!(i16, I16Codec);
    check!(i32, I32Codec);
    check!(i64, I64Codec);
    check!(isize, IsizeCodec);
    check!(u8, U8Codec);
    check!(u16, U16Codec);
    check!(u32, U32Codec);
    check!(u64, U64Codec);
    check!(usize, UsizeCodec);
    check!(f32, F32Codec);
    check!(f64, F64Codec);
    check!(bool, BoolCodec);
    check!(String, StringCodec);
    None
}

/// Holds the custom codecs registered against a [Binder](crate::parser::Binder), and fronts the
/// built-in set
#[derive(Default)]
pub(crate) struct CodecRegistry {
    extra: RwLock<HashMap<TypeId, Arc<dyn ErasedCodec>>>,
}

impl CodecRegistry {
    /// Register a custom codec for `T`, displacing any built-in or previously registered codec
    /// covering the same type
    pub fn register<T: 'static>(&self, codec: impl ScalarCodec<T>) {
        self.extra
            .write()
            .unwrap()
            .insert(TypeId::of::<T>(), Arc::new(CodecAdapter::new(codec)));
    }

    /// Find the codec covering a target type.  Registered codecs win over built-ins
    pub fn lookup(&self, target: TypeId) -> Option<Arc<dyn ErasedCodec>> {
        self.extra
            .read()
            .unwrap()
            .get(&target)
            .cloned()
            .or_else(|| builtin(target))
    }
}
