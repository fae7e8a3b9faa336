//! The writer: walks a typed value under the direction of its binding and renders compact
//! JSON into a string buffer.  Integers go through `itoa`, floats through `ryu`, so numeric
//! output is the shortest representation that survives a round trip.
use std::any::Any;
use std::sync::Arc;

use crate::codec::{ErasedCodec, Scalar};
use crate::errors::{BindError, BindResult, Details, ErrorKind};
use crate::schema::binding::{Binding, NullPeek, ScalarBinding};
use crate::schema::cache::ParamShape;
use crate::seed::Session;
use crate::encode_error;

/// Render one value into the buffer, dispatching on the shape of its binding
pub(crate) fn write_value(
    binding: &Binding,
    value: &dyn Any,
    session: &Session,
    buffer: &mut String,
) -> BindResult<()> {
    match binding {
        Binding::Scalar(scalar) => {
            let codec = session.resolve_codec(scalar)?;
            encode_scalar(scalar, &codec, value, buffer)
        }
        Binding::Sequence(sequence) => {
            let items = (sequence.elements)(value);
            buffer.push('[');
            match (sequence.element)() {
                Binding::Scalar(element) => {
                    let codec = session.resolve_codec(&element)?;
                    for (index, item) in items.iter().enumerate() {
                        if index > 0 {
                            buffer.push(',');
                        }
                        encode_scalar(&element, &codec, *item, buffer)?;
                    }
                }
                element => {
                    for (index, item) in items.iter().enumerate() {
                        if index > 0 {
                            buffer.push(',');
                        }
                        write_value(&element, *item, session, buffer)?;
                    }
                }
            }
            buffer.push(']');
            Ok(())
        }
        Binding::Mapping(mapping) => {
            // key support is checked before anything is emitted, so an unencodable mapping
            // fails even when it happens to be empty
            let key_codec = match (mapping.key)() {
                Binding::Scalar(key) if key.nullable.is_none() => {
                    let codec = session.resolve_codec(&key)?;
                    if codec.key_kind().is_none() {
                        return encode_error!(Details::UnsupportedKeyType(key.type_name));
                    }
                    codec
                }
                other => return encode_error!(Details::UnsupportedKeyType(other.type_name())),
            };
            let entries = (mapping.entries)(value);
            buffer.push('{');
            match (mapping.value)() {
                Binding::Scalar(entry) => {
                    let codec = session.resolve_codec(&entry)?;
                    for (index, (key, item)) in entries.iter().enumerate() {
                        if index > 0 {
                            buffer.push(',');
                        }
                        write_key(&key_codec, *key, buffer)?;
                        encode_scalar(&entry, &codec, *item, buffer)?;
                    }
                }
                entry => {
                    for (index, (key, item)) in entries.iter().enumerate() {
                        if index > 0 {
                            buffer.push(',');
                        }
                        write_key(&key_codec, *key, buffer)?;
                        write_value(&entry, *item, session, buffer)?;
                    }
                }
            }
            buffer.push('}');
            Ok(())
        }
        Binding::Object(object) => {
            let schema = session.schemas.resolve(object, session.codecs)?;
            buffer.push('{');
            let mut first = true;
            for param in &schema.params {
                if param.excluded {
                    continue;
                }
                if !first {
                    buffer.push(',');
                }
                first = false;
                write_escaped_string(param.json_name, buffer);
                buffer.push(':');
                let mut field = (*param.access)(value);
                if let Some(coerce) = &param.coerce {
                    field = (*coerce.peek)(field);
                }
                match &param.shape {
                    ParamShape::Scalar { binding, codec } => {
                        encode_scalar(binding, codec, field, buffer)?
                    }
                    ParamShape::Composite { thunk } => {
                        write_value(&thunk(), field, session, buffer)?
                    }
                }
            }
            buffer.push('}');
            Ok(())
        }
    }
}

/// Encode one scalar slot, emitting `null` for a vacant optional
fn encode_scalar(
    binding: &ScalarBinding,
    codec: &Arc<dyn ErasedCodec>,
    value: &dyn Any,
    buffer: &mut String,
) -> BindResult<()> {
    match binding.nullable {
        Some(hooks) => match (hooks.peek)(value) {
            NullPeek::Null => {
                buffer.push_str("null");
                Ok(())
            }
            NullPeek::Inner(inner) => write_scalar(&codec.encode_boxed(inner)?, buffer),
        },
        None => write_scalar(&codec.encode_boxed(value)?, buffer),
    }
}

/// Render a mapping key, quoted, along with its trailing colon
fn write_key(codec: &Arc<dyn ErasedCodec>, key: &dyn Any, buffer: &mut String) -> BindResult<()> {
    match codec.render_key(key) {
        Some(text) => {
            write_escaped_string(&text, buffer);
            buffer.push(':');
            Ok(())
        }
        None => encode_error!(Details::UnmappedEnumConstant(codec.type_name())),
    }
}

fn write_scalar(scalar: &Scalar, buffer: &mut String) -> BindResult<()> {
    match scalar {
        Scalar::Str(value) => {
            write_escaped_string(value, buffer);
            Ok(())
        }
        Scalar::Integer(value) => {
            let mut scratch = itoa::Buffer::new();
            buffer.push_str(scratch.format(*value));
            Ok(())
        }
        Scalar::Float(value) => {
            if !value.is_finite() {
                return encode_error!(Details::NonFiniteNumber(*value));
            }
            let mut scratch = ryu::Buffer::new();
            buffer.push_str(scratch.format(*value));
            Ok(())
        }
        Scalar::Boolean(value) => {
            buffer.push_str(if *value { "true" } else { "false" });
            Ok(())
        }
        Scalar::Null => {
            buffer.push_str("null");
            Ok(())
        }
    }
}

/// Strings are escaped minimally: the two JSON metacharacters and the shorthand control
/// escapes, with the numeric form for the remaining characters below U+0020.  Everything
/// else, DEL and the C1 range included, passes through verbatim
fn write_escaped_string(value: &str, buffer: &mut String) {
    buffer.push('"');
    for c in value.chars() {
        match c {
            '"' => buffer.push_str("\\\""),
            '\\' => buffer.push_str("\\\\"),
            '\u{0008}' => buffer.push_str("\\b"),
            '\u{000c}' => buffer.push_str("\\f"),
            '\n' => buffer.push_str("\\n"),
            '\r' => buffer.push_str("\\r"),
            '\t' => buffer.push_str("\\t"),
            c if (c as u32) < 0x20 => buffer.push_str(&format!("\\u{:04x}", c as u32)),
            c => buffer.push(c),
        }
    }
    buffer.push('"');
}
