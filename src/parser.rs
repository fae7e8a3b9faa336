//! The binder: a recursive descent parser that checks the document against the target type as
//! it goes, feeding tokens into the [Seed] hierarchy rather than building any intermediate
//! tree.  One [Binder] can be shared across many decode and encode calls; the schemas it
//! derives are cached for the lifetime of the instance.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::codec::{CodecRegistry, Scalar, ScalarCodec};
use crate::decoders::{DecoderSelector, Encoding};
use crate::errors::{BindError, BindResult, Details, ErrorKind};
use crate::lexer::{Lexer, PackedToken, Token};
use crate::malformed_error;
use crate::schema::binding::Bind;
use crate::schema::cache::SchemaCache;
use crate::seed::{route, Container, Seed, Session, Slot};
use crate::writer;

/// Binds JSON documents to strongly typed values, and typed values back to JSON
pub struct Binder {
    decoders: DecoderSelector,
    encoding: Encoding,
    schemas: SchemaCache,
    codecs: CodecRegistry,
}

impl Default for Binder {
    /// The default encoding is Utf-8
    fn default() -> Self {
        Self {
            decoders: Default::default(),
            encoding: Default::default(),
            schemas: Default::default(),
            codecs: Default::default(),
        }
    }
}

impl Binder {
    /// Create a new instance of the binder using a specific [Encoding]
    pub fn with_encoding(encoding: Encoding) -> Self {
        Self {
            encoding,
            ..Default::default()
        }
    }

    /// Register a custom [ScalarCodec] for `T`.  The codec takes over all conversions for `T`
    /// on this binder, displacing the built-in one if there is any
    pub fn register_codec<T: 'static>(&self, codec: impl ScalarCodec<T>) {
        self.codecs.register(codec)
    }

    /// Decode the contents of a file into a `T`
    pub fn decode_file<T: Bind, PathLike: AsRef<Path>>(&self, path: PathLike) -> BindResult<T> {
        match File::open(&path) {
            Ok(f) => {
                let mut reader = BufReader::new(f);
                let mut chars = self.decoders.new_decoder(&mut reader, self.encoding);
                self.decode(&mut chars)
            }
            Err(_) => {
                malformed_error!(Details::InvalidFile)
            }
        }
    }

    /// Decode a byte slice into a `T`, running the bytes through the configured [Encoding]
    pub fn decode_bytes<T: Bind>(&self, bytes: &[u8]) -> BindResult<T> {
        if bytes.is_empty() {
            return malformed_error!(Details::ZeroLengthInput);
        }
        let mut reader = BufReader::new(bytes);
        let mut chars = self.decoders.new_decoder(&mut reader, self.encoding);
        self.decode(&mut chars)
    }

    /// Decode a string slice into a `T`.  Strings are already unicode, so no byte decoding
    /// takes place
    pub fn decode_str<T: Bind>(&self, str: &str) -> BindResult<T> {
        if str.is_empty() {
            return malformed_error!(Details::ZeroLengthInput);
        }
        self.decode(&mut str.chars())
    }

    /// Decode directly from a stream of `char`s.  The document must consist of exactly one
    /// top level object, and every member of it must land somewhere in `T`.
    ///
    /// Nesting is handled by recursion, so stack use grows with the depth of the document
    pub fn decode<T: Bind>(&self, chars: &mut impl Iterator<Item = char>) -> BindResult<T> {
        let mut lexer = Lexer::new(chars);
        let session = Session {
            schemas: &self.schemas,
            codecs: &self.codecs,
        };
        let mut root = match lexer.consume()? {
            (Token::StartObject, span) => {
                route(&T::binding(), Container::Object, span.start, &session)?
            }
            (_, span) => return malformed_error!(Details::InvalidRootObject, span.start),
        };
        self.fill_object(&mut lexer, &mut root, &session)?;
        match lexer.consume()? {
            (Token::EndOfInput, _) => (),
            (token, span) => return malformed_error!(Details::TrailingContent(token), span.start),
        }
        let value = root.spawn()?;
        // the root seed was routed from T's own binding, so this downcast always succeeds
        Ok(*value.downcast::<T>().unwrap())
    }

    /// Encode a value back into its JSON representation
    pub fn encode<T: Bind>(&self, value: &T) -> BindResult<String> {
        let session = Session {
            schemas: &self.schemas,
            codecs: &self.codecs,
        };
        let mut buffer = String::new();
        writer::write_value(&T::binding(), value, &session, &mut buffer)?;
        Ok(buffer)
    }

    /// An object is a comma separated list of KV pairs.  The opening brace has already been
    /// consumed by the caller
    fn fill_object(&self, lexer: &mut Lexer, seed: &mut Seed, session: &Session) -> BindResult<()> {
        match lexer.consume()? {
            (Token::EndObject, _) => return Ok(()),
            (Token::Str(key), _) => self.fill_pair(lexer, seed, &key, session)?,
            (_, span) => return malformed_error!(Details::InvalidObject, span.start),
        }
        loop {
            match lexer.consume()? {
                (Token::EndObject, _) => return Ok(()),
                (Token::Comma, _) => match lexer.consume()? {
                    (Token::Str(key), _) => self.fill_pair(lexer, seed, &key, session)?,
                    (_, span) => return malformed_error!(Details::PairExpected, span.start),
                },
                (_, span) => return malformed_error!(Details::InvalidObject, span.start),
            }
        }
    }

    /// A single `"key" : value` pair, the key having already been consumed
    fn fill_pair(
        &self,
        lexer: &mut Lexer,
        seed: &mut Seed,
        key: &str,
        session: &Session,
    ) -> BindResult<()> {
        match lexer.consume()? {
            (Token::Colon, _) => (),
            (_, span) => return malformed_error!(Details::PairExpected, span.start),
        }
        let token = lexer.consume()?;
        self.fill_value(lexer, seed, Slot::Key(key), token, session)
    }

    /// An array is a comma separated list of values.  The opening bracket has already been
    /// consumed by the caller
    fn fill_array(&self, lexer: &mut Lexer, seed: &mut Seed, session: &Session) -> BindResult<()> {
        match lexer.consume()? {
            (Token::EndArray, _) => return Ok(()),
            token => self.fill_value(lexer, seed, Slot::Item, token, session)?,
        }
        loop {
            match lexer.consume()? {
                (Token::EndArray, _) => return Ok(()),
                (Token::Comma, _) => {
                    let token = lexer.consume()?;
                    self.fill_value(lexer, seed, Slot::Item, token, session)?
                }
                (_, span) => return malformed_error!(Details::InvalidArray, span.start),
            }
        }
    }

    /// Route one already consumed token into the seed: scalars are decoded on the spot,
    /// composites open a child seed which is filled recursively and then adopted
    fn fill_value(
        &self,
        lexer: &mut Lexer,
        seed: &mut Seed,
        slot: Slot,
        token: PackedToken,
        session: &Session,
    ) -> BindResult<()> {
        match token {
            (Token::StartObject, span) => {
                let mut child = seed.child(slot, Container::Object, span.start, session)?;
                self.fill_object(lexer, &mut child, session)?;
                seed.adopt(slot, child);
                Ok(())
            }
            (Token::StartArray, span) => {
                let mut child = seed.child(slot, Container::Array, span.start, session)?;
                self.fill_array(lexer, &mut child, session)?;
                seed.adopt(slot, child);
                Ok(())
            }
            (Token::Str(value), span) => seed.scalar(slot, Scalar::Str(value), span.start),
            (Token::Integer(value), span) => seed.scalar(slot, Scalar::Integer(value), span.start),
            (Token::Float(value), span) => seed.scalar(slot, Scalar::Float(value), span.start),
            (Token::Boolean(value), span) => seed.scalar(slot, Scalar::Boolean(value), span.start),
            (Token::Null, span) => seed.scalar(slot, Scalar::Null, span.start),
            (token, span) => malformed_error!(Details::UnexpectedToken(token), span.start),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytesize::ByteSize;
    use indexmap::IndexMap;

    use crate::errors::{Details, ErrorKind};
    use crate::parser::Binder;
    use crate::relative_file;
    use std::fs;
    use std::path::PathBuf;

    #[derive(Debug, PartialEq)]
    struct Reading {
        sensor: String,
        value: f64,
        flagged: bool,
    }

    crate::bind_object!(Reading {
        sensor: String,
        value: f64,
        flagged: bool,
    });

    #[derive(Debug, PartialEq)]
    struct Catalogue {
        book_price: IndexMap<String, f64>,
    }

    crate::bind_object!(Catalogue {
        book_price: IndexMap<String, f64> => "bookPrice",
    });

    #[test]
    fn should_bind_a_flat_object() {
        let binder = Binder::default();
        let reading: Reading = binder
            .decode_str(r#"{ "sensor": "ambient", "value": 21.5, "flagged": false }"#)
            .unwrap();
        assert_eq!(
            reading,
            Reading {
                sensor: "ambient".to_string(),
                value: 21.5,
                flagged: false,
            }
        );
    }

    #[test]
    fn should_reject_non_object_roots() {
        let binder = Binder::default();
        for input in ["[1, 2, 3]", "42", "\"text\"", "true", "null"] {
            let result = binder.decode_str::<Reading>(input);
            println!("{} decoded to {:?}", input, result);
            assert_eq!(result.err().unwrap().details, Details::InvalidRootObject);
        }
    }

    #[test]
    fn should_reject_zero_length_input() {
        let binder = Binder::default();
        let result = binder.decode_str::<Reading>("");
        assert_eq!(result.err().unwrap().details, Details::ZeroLengthInput);
        let result = binder.decode_bytes::<Reading>(&[]);
        assert_eq!(result.err().unwrap().details, Details::ZeroLengthInput);
    }

    #[test]
    fn should_reject_trailing_content() {
        let binder = Binder::default();
        let result = binder
            .decode_str::<IndexMap<String, i64>>(r#"{ "a": 1 } { "b": 2 }"#);
        assert!(matches!(
            result.err().unwrap().details,
            Details::TrailingContent(_)
        ));
    }

    #[test]
    fn should_insist_on_separators() {
        let binder = Binder::default();
        for input in [
            r#"{ "a": 1 "b": 2 }"#,
            r#"{ "a": 1,, "b": 2 }"#,
            r#"{ "a": 1, }"#,
            r#"{ "a" 1 }"#,
            r#"{ , }"#,
        ] {
            let result = binder.decode_str::<IndexMap<String, i64>>(input);
            println!("{} decoded to {:?}", input, result);
            assert!(result.is_err());
        }
    }

    #[test]
    fn array_separators_should_be_just_as_strict() {
        let binder = Binder::default();
        for input in [
            r#"{ "xs": [1 2] }"#,
            r#"{ "xs": [1,,2] }"#,
            r#"{ "xs": [1,] }"#,
            r#"{ "xs": [,1] }"#,
        ] {
            let result = binder.decode_str::<IndexMap<String, Vec<i64>>>(input);
            println!("{} decoded to {:?}", input, result);
            assert!(result.is_err());
        }
    }

    #[test]
    fn errors_should_carry_the_offending_coordinates() {
        let binder = Binder::default();
        let result = binder.decode_str::<IndexMap<String, i64>>("{ \"a\": 1,\n  \"b\": x }");
        let error = result.err().unwrap();
        let coords = error.coords.unwrap();
        assert_eq!(coords.line, 2);
    }

    #[test]
    fn should_decode_documents_straight_from_disk() {
        let binder = Binder::default();
        let catalogue: Catalogue = binder
            .decode_file(relative_file!("fixtures/json/valid/catalogue.json"))
            .unwrap();
        assert_eq!(catalogue.book_price.len(), 2);
        assert_eq!(catalogue.book_price["Catch-22"], 10.92);
        assert_eq!(catalogue.book_price["The Lord of the Rings"], 11.49);
    }

    #[test]
    fn missing_files_should_surface_as_errors() {
        let binder = Binder::default();
        let result =
            binder.decode_file::<Reading, _>(relative_file!("fixtures/json/valid/no-such.json"));
        assert_eq!(result.err().unwrap().details, Details::InvalidFile);
    }

    #[test]
    fn each_invalid_fixture_should_be_malformed() {
        let binder = Binder::default();
        for entry in fs::read_dir(relative_file!("fixtures/json/invalid")).unwrap() {
            let path = entry.unwrap().path();
            let size = ByteSize(fs::metadata(&path).unwrap().len());
            let error = binder
                .decode_file::<IndexMap<String, i64>, _>(&path)
                .err()
                .unwrap();
            println!("{:?} ({}) -> {}", path, size, error);
            assert_eq!(error.kind, ErrorKind::MalformedInput);
        }
    }
}
