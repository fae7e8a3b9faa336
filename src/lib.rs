//! Strongly typed, schema-driven JSON binding.
//!
//! A [Binder](parser::Binder) decodes JSON documents straight into your own types, checking the
//! document against a schema derived from the target type as it streams past, and encodes those
//! types back into compact JSON.  Implementations of [Bind](schema::binding::Bind) describe how
//! a type maps onto a document; for structs and fieldless enums the [bind_object] and
//! [bind_enum] macros write the implementation for you.
//!
//! ```
//! use chisel_bind::bind_object;
//! use chisel_bind::parser::Binder;
//!
//! #[derive(Debug, PartialEq)]
//! struct Book {
//!     title: String,
//!     price: f64,
//! }
//!
//! bind_object!(Book {
//!     title: String => "bookTitle",
//!     price: f64,
//! });
//!
//! let binder = Binder::default();
//! let book: Book = binder
//!     .decode_str(r#"{ "bookTitle": "Catch-22", "price": 10.92 }"#)
//!     .unwrap();
//! assert_eq!(book.price, 10.92);
//!
//! let encoded = binder.encode(&book).unwrap();
//! assert_eq!(encoded, r#"{"bookTitle":"Catch-22","price":10.92}"#);
//! ```
pub mod codec;
pub mod coords;
pub mod decoders;
pub mod errors;
pub mod lexer;
pub mod parser;
pub mod schema;

pub(crate) mod seed;
pub(crate) mod writer;

#[cfg(test)]
mod test_macros;
