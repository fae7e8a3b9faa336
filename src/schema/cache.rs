//! Derivation of per-type schemas, and the cache which makes each derivation a one-off.
//!
//! A [TypeSchema] is the compiled form of an object type's [Descriptor]: fields are checked
//! and indexed, scalar codecs are resolved up front, and composite children are left behind
//! their classification thunks to be pulled on during a bind.  Schemas are derived at most
//! once per type and shared from then on.
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::codec::{Boxed, CodecRegistry, ErasedCodec};
use crate::errors::{BindError, BindResult, Details, ErrorKind};
use crate::schema::binding::{Binding, CodecSource, ObjectBinding, ScalarBinding};
use crate::schema::declare::{Access, Coerce, Construct};
use crate::schema_error;

/// The compiled schema for a single object type
pub(crate) struct TypeSchema {
    pub type_name: &'static str,
    /// All declared fields, in declaration order, excluded ones included
    pub params: Vec<ParamSchema>,
    /// Effective JSON name to index into `params`.  Excluded fields don't appear
    pub by_name: HashMap<&'static str, usize>,
    pub construct: Construct,
}

/// One field of a compiled schema
pub(crate) struct ParamSchema {
    /// The declared field name, as used by the constructor
    pub name: &'static str,
    /// The name the field travels under in JSON
    pub json_name: &'static str,
    pub excluded: bool,
    pub shape: ParamShape,
    /// Fallback for optional fields.  A field with no fallback must turn up in the input
    pub vacant: Option<fn() -> Boxed>,
    pub coerce: Option<Coerce>,
    pub access: Access,
}

/// The compiled shape of one field
pub(crate) enum ParamShape {
    /// A scalar field, with its codec resolved at derivation time
    Scalar {
        binding: ScalarBinding,
        codec: Arc<dyn ErasedCodec>,
    },
    /// A composite field, still behind its classification thunk
    Composite { thunk: fn() -> Binding },
}

/// Resolve the codec for a scalar binding.  A field-level codec wins outright (provided it
/// targets the right type), then anything the binding carries inline, then the registry
pub(crate) fn resolve_codec(
    binding: &ScalarBinding,
    codecs: &CodecRegistry,
    override_codec: Option<&Arc<dyn ErasedCodec>>,
) -> BindResult<Arc<dyn ErasedCodec>> {
    if let Some(codec) = override_codec {
        if codec.target() != binding.type_id {
            return schema_error!(Details::CodecTargetMismatch {
                type_name: binding.type_name,
                codec: codec.type_name(),
            });
        }
        return Ok(codec.clone());
    }
    match &binding.source {
        CodecSource::Inline(codec) => Ok(codec.clone()),
        CodecSource::Registry => match codecs.lookup(binding.type_id) {
            Some(codec) => Ok(codec),
            None => schema_error!(Details::UnresolvedCodec(binding.type_name)),
        },
        CodecSource::Unsupported(reason) => schema_error!(Details::Unclassifiable {
            type_name: binding.type_name,
            reason: *reason,
        }),
    }
}

/// Compile a descriptor down into a [TypeSchema], validating as we go
fn derive(object: &ObjectBinding, codecs: &CodecRegistry) -> BindResult<TypeSchema> {
    let descriptor = (object.descriptor)();
    let construct = match descriptor.construct {
        Some(construct) => construct,
        None => return schema_error!(Details::NoConstructor(object.type_name)),
    };
    let mut params = Vec::with_capacity(descriptor.fields.len());
    let mut by_name = HashMap::new();
    for field in descriptor.fields {
        let shape = match (field.binding)() {
            Binding::Scalar(binding) => {
                let codec = resolve_codec(&binding, codecs, field.codec.as_ref())?;
                ParamShape::Scalar { binding, codec }
            }
            _ => ParamShape::Composite {
                thunk: field.binding,
            },
        };
        let (required, vacant) = match &shape {
            ParamShape::Scalar { binding, .. } => match binding.nullable {
                Some(hooks) => (false, Some(hooks.vacant)),
                None => (true, None),
            },
            ParamShape::Composite { .. } => (true, None),
        };
        if field.excluded && required {
            return schema_error!(Details::ExcludedRequired {
                type_name: object.type_name,
                field: field.name,
            });
        }
        if !field.excluded {
            let json_name = field.effective_name();
            if by_name.insert(json_name, params.len()).is_some() {
                return schema_error!(Details::DuplicateField {
                    type_name: object.type_name,
                    field: json_name,
                });
            }
        }
        params.push(ParamSchema {
            name: field.name,
            json_name: field.effective_name(),
            excluded: field.excluded,
            shape,
            vacant,
            coerce: field.coerce,
            access: field.access,
        });
    }
    Ok(TypeSchema {
        type_name: object.type_name,
        params,
        by_name,
        construct,
    })
}

/// The per-binder schema cache.  Each object type is derived at most once; every bind after
/// that shares the same compiled schema
#[derive(Default)]
pub(crate) struct SchemaCache {
    cells: RwLock<HashMap<TypeId, Arc<TypeSchema>>>,
}

impl SchemaCache {
    /// Fetch the schema for an object binding, deriving and caching it on first sight.  Two
    /// threads racing on the same fresh type will both derive, but only one result is kept
    pub fn resolve(
        &self,
        object: &ObjectBinding,
        codecs: &CodecRegistry,
    ) -> BindResult<Arc<TypeSchema>> {
        if let Some(schema) = self.cells.read().unwrap().get(&object.type_id) {
            return Ok(schema.clone());
        }
        let derived = Arc::new(derive(object, codecs)?);
        Ok(self
            .cells
            .write()
            .unwrap()
            .entry(object.type_id)
            .or_insert(derived)
            .clone())
    }
}
