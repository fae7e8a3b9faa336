//! The declaration surface for object types.
//!
//! A [Descriptor] lists the fields of an object type along with a constructor closure, and is
//! what a [Bind](crate::schema::binding::Bind) implementation hands back for object shapes.
//! Each [Field] pairs a declared name with an accessor and a classification thunk, plus the
//! optional trimmings: a JSON rename, exclusion, a field-level codec or a concrete type
//! override.  The [bind_object](crate::bind_object) macro generates all of this for the common
//! cases; the builder API is there for anything the macro doesn't reach.
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::{Boxed, CodecAdapter, ErasedCodec, ScalarCodec};
use crate::errors::{BindError, BindResult, Details, ErrorKind};
use crate::schema::binding::{Bind, Binding};
use crate::schema_error;

/// Type-erased field accessor: borrows a field value out of a borrowed owner
pub(crate) type Access = Arc<dyn for<'a> Fn(&'a dyn Any) -> &'a (dyn Any + 'static) + Send + Sync>;

/// Type-erased constructor, assembling an owner value from its collected fields
pub(crate) type Construct = Arc<dyn Fn(&mut Args) -> BindResult<Boxed> + Send + Sync>;

/// The pair of conversions carried by a concrete type override
pub(crate) struct Coerce {
    /// Lift a decoded value of the concrete type into the declared field type
    pub wrap: Arc<dyn Fn(Boxed) -> Boxed + Send + Sync>,
    /// Borrow the concrete value back out of the declared field type
    pub peek: Access,
}

fn make_access<T: 'static, F: 'static>(get: fn(&T) -> &F) -> Access {
    Arc::new(move |value: &dyn Any| -> &dyn Any { get(value.downcast_ref::<T>().unwrap()) })
}

fn scalar_stub<F: 'static>() -> Binding {
    Binding::scalar::<F>()
}

/// A single field declaration on an object type
pub struct Field {
    pub(crate) name: &'static str,
    pub(crate) json_name: Option<&'static str>,
    pub(crate) excluded: bool,
    pub(crate) codec: Option<Arc<dyn ErasedCodec>>,
    pub(crate) binding: fn() -> Binding,
    pub(crate) coerce: Option<Coerce>,
    pub(crate) access: Access,
}

impl Field {
    /// Declare a field of type `F` on owner `T`, classified through `F`'s own [Bind]
    /// implementation
    pub fn bound<T: 'static, F: Bind>(name: &'static str, get: fn(&T) -> &F) -> Self {
        Field {
            name,
            json_name: None,
            excluded: false,
            codec: None,
            binding: F::binding,
            coerce: None,
            access: make_access(get),
        }
    }

    /// Declare a scalar field of type `F` on owner `T`, for field types with no [Bind]
    /// implementation of their own.  The codec is resolved at bind time, so the field needs
    /// either a field-level codec or one registered for `F`
    pub fn scalar<T: 'static, F: 'static>(name: &'static str, get: fn(&T) -> &F) -> Self {
        Field {
            name,
            json_name: None,
            excluded: false,
            codec: None,
            binding: scalar_stub::<F>,
            coerce: None,
            access: make_access(get),
        }
    }

    /// Declare a field whose declared type `F` is populated through a concrete type `C`.  On
    /// the way in the field decodes as a `C` and is lifted via `wrap`; on the way out `peek`
    /// projects the `C` back out of the stored `F`
    pub fn concrete<T: 'static, F: 'static, C: Bind>(
        name: &'static str,
        get: fn(&T) -> &F,
        wrap: fn(C) -> F,
        peek: fn(&F) -> &C,
    ) -> Self {
        Field {
            name,
            json_name: None,
            excluded: false,
            codec: None,
            binding: C::binding,
            coerce: Some(Coerce {
                wrap: Arc::new(move |value: Boxed| {
                    Box::new(wrap(*value.downcast::<C>().unwrap())) as Boxed
                }),
                peek: make_access(peek),
            }),
            access: make_access(get),
        }
    }

    /// Map this field onto a different JSON name
    pub fn rename(mut self, json_name: &'static str) -> Self {
        self.json_name = Some(json_name);
        self
    }

    /// Drop this field from both directions.  Excluded fields must be optional, since the
    /// constructor still has to come up with a value for them
    pub fn exclude(mut self) -> Self {
        self.excluded = true;
        self
    }

    /// Attach a codec to this field alone, displacing whatever would otherwise be resolved
    /// for the field type
    pub fn with_codec<F: 'static>(mut self, codec: impl ScalarCodec<F>) -> Self {
        self.codec = Some(Arc::new(CodecAdapter::new(codec)));
        self
    }

    /// The name this field travels under in JSON
    pub(crate) fn effective_name(&self) -> &'static str {
        self.json_name.unwrap_or(self.name)
    }
}

/// The full field-by-field description of an object type
pub struct Descriptor {
    pub(crate) fields: Vec<Field>,
    pub(crate) construct: Option<Construct>,
}

impl Default for Descriptor {
    fn default() -> Self {
        Descriptor {
            fields: vec![],
            construct: None,
        }
    }
}

impl Descriptor {
    /// Start an empty descriptor
    pub fn new() -> Self {
        Descriptor::default()
    }

    /// Append a field declaration
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Supply the constructor closure.  The closure pulls each field it needs out of the
    /// supplied [Args] by declared name
    pub fn construct<T: 'static>(
        mut self,
        construct: impl Fn(&mut Args) -> BindResult<T> + Send + Sync + 'static,
    ) -> Self {
        self.construct = Some(Arc::new(move |args: &mut Args| {
            construct(args).map(|value| Box::new(value) as Boxed)
        }));
        self
    }
}

/// The decoded field values for one object, keyed by declared field name, handed to the
/// type's constructor closure
pub struct Args {
    pub(crate) type_name: &'static str,
    pub(crate) values: HashMap<&'static str, Boxed>,
}

impl Args {
    /// Remove and return the value decoded for the named field
    pub fn take<F: 'static>(&mut self, name: &'static str) -> BindResult<F> {
        match self.values.remove(name) {
            Some(boxed) => match boxed.downcast::<F>() {
                Ok(value) => Ok(*value),
                Err(_) => schema_error!(Details::ArgumentTypeMismatch {
                    type_name: self.type_name,
                    param: name,
                }),
            },
            None => schema_error!(Details::UnmappedParameter {
                type_name: self.type_name,
                param: name,
            }),
        }
    }
}

/// Implement [Bind](crate::schema::binding::Bind) for a struct, mapping each listed field
/// straight onto a JSON member.  An optional `=> "name"` after the field type renames the JSON
/// side, and a trailing `= exclude` keeps the field out of the document in both directions.
/// Excluded fields have to be optional, since decoding can never supply them:
///
/// ```
/// use chisel_bind::bind_object;
///
/// struct Book {
///     title: String,
///     price: f64,
///     stock: Option<u32>,
/// }
///
/// bind_object!(Book {
///     title: String => "bookTitle",
///     price: f64,
///     stock: Option<u32> = exclude,
/// });
/// ```
#[macro_export]
macro_rules! bind_object {
    ($ty : ident { $($field : ident : $ftype : ty $(=> $json : literal)? $(= $marker : ident)?),* $(,)? }) => {
        impl $crate::schema::binding::Bind for $ty {
            fn binding() -> $crate::schema::binding::Binding {
                $crate::schema::binding::Binding::object::<$ty>(|| {
                    $crate::schema::declare::Descriptor::new()
                        $(.field({
                            let field = $crate::schema::declare::Field::bound::<$ty, $ftype>(
                                stringify!($field),
                                |value: &$ty| &value.$field,
                            );
                            $(let field = field.rename($json);)?
                            $(let field = field.$marker();)?
                            field
                        }))*
                        .construct::<$ty>(|args| {
                            Ok($ty {
                                $($field: args.take(stringify!($field))?,)*
                            })
                        })
                })
            }
        }
    };
}

/// Implement [Bind](crate::schema::binding::Bind) for a fieldless enum, mapping each listed
/// variant onto a JSON string constant:
///
/// ```
/// use chisel_bind::bind_enum;
///
/// #[derive(PartialEq)]
/// enum Colour {
///     Red,
///     Teal,
/// }
///
/// bind_enum!(Colour {
///     Red => "RED",
///     Teal => "TEAL",
/// });
/// ```
#[macro_export]
macro_rules! bind_enum {
    ($ty : ty { $($variant : ident => $name : literal),* $(,)? }) => {
        impl $crate::schema::binding::Bind for $ty {
            fn binding() -> $crate::schema::binding::Binding {
                const CONSTANTS: &[(&str, fn() -> $ty)] = &[
                    $(($name, || <$ty>::$variant),)*
                ];
                $crate::schema::binding::Binding::enumeration::<$ty>(stringify!($ty), CONSTANTS)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::{Args, Descriptor, Field};
    use crate::errors::{Details, ErrorKind};
    use std::collections::HashMap;

    struct Gauge {
        label: String,
        level: u8,
    }

    #[test]
    fn renames_should_change_the_effective_name() {
        let field = Field::bound::<Gauge, String>("label", |gauge| &gauge.label);
        assert_eq!(field.effective_name(), "label");
        let field = field.rename("gaugeLabel");
        assert_eq!(field.effective_name(), "gaugeLabel");
    }

    #[test]
    fn accessors_should_reach_the_declared_field() {
        let field = Field::bound::<Gauge, u8>("level", |gauge| &gauge.level);
        let gauge = Gauge {
            label: "x".to_string(),
            level: 250,
        };
        let borrowed = (*field.access)(&gauge);
        assert_eq!(*borrowed.downcast_ref::<u8>().unwrap(), 250);
    }

    #[test]
    fn descriptors_should_accumulate_fields_in_declaration_order() {
        let descriptor = Descriptor::new()
            .field(Field::bound::<Gauge, String>("label", |gauge| &gauge.label))
            .field(Field::bound::<Gauge, u8>("level", |gauge| &gauge.level));
        let names: Vec<&str> = descriptor.fields.iter().map(|field| field.name).collect();
        assert_eq!(names, ["label", "level"]);
        assert!(descriptor.construct.is_none());
    }

    #[test]
    fn take_should_complain_about_unknown_parameters() {
        let mut args = Args {
            type_name: "Gauge",
            values: HashMap::new(),
        };
        let result = args.take::<u8>("level");
        let error = result.err().unwrap();
        assert_eq!(error.kind, ErrorKind::Schema);
        assert_eq!(
            error.details,
            Details::UnmappedParameter {
                type_name: "Gauge",
                param: "level",
            }
        );
    }

    #[test]
    fn take_should_complain_about_mistyped_parameters() {
        let mut args = Args {
            type_name: "Gauge",
            values: HashMap::from([("level", Box::new(3u8) as crate::codec::Boxed)]),
        };
        let result = args.take::<String>("level");
        assert_eq!(
            result.err().unwrap().details,
            Details::ArgumentTypeMismatch {
                type_name: "Gauge",
                param: "level",
            }
        );
    }
}
