//! The lexer: turns a stream of `char`s into a stream of JSON [Token]s.
//!
//! Strings are unescaped as they are matched, so a [Token::Str] carries exactly the characters
//! the document author meant.  Numbers are split lexically: anything written with a fractional
//! part or an exponent comes out as a [Token::Float], everything else as a [Token::Integer].
use crate::coords::{Coords, Span};
use crate::errors::{BindError, BindResult, Details, ErrorKind};
use crate::malformed_error;

/// Default capacity for the internal scratch buffer
const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Enumeration of valid JSON tokens
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    Colon,
    Comma,
    Str(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    EndOfInput,
}

/// A packed token consists of a [Token] and the [Span] associated with it
pub type PackedToken = (Token, Span);

/// Convenience macro for packing tokens along with their positional information
macro_rules! packed_token {
    ($t:expr, $s:expr, $e:expr) => {
        ($t, Span { start: $s, end: $e })
    };
    ($t:expr, $s:expr) => {
        ($t, Span { start: $s, end: $s })
    };
}

/// A lexer over a stream of `char`s, with a single character of lookahead
pub struct Lexer<'a> {
    /// The underlying character stream
    chars: &'a mut dyn Iterator<Item = char>,
    /// One character of lookahead, not yet counted by `position`
    lookahead: Option<char>,
    /// Coordinates of the most recently consumed character
    position: Coords,
    /// Scratch buffer for strings and numbers
    buffer: String,
}

impl<'a> Lexer<'a> {
    pub fn new(chars: &'a mut impl Iterator<Item = char>) -> Self {
        Lexer {
            chars,
            lookahead: None,
            position: Coords::default(),
            buffer: String::with_capacity(DEFAULT_BUFFER_CAPACITY),
        }
    }

    /// Look at the next character without consuming it
    fn peek(&mut self) -> Option<char> {
        if self.lookahead.is_none() {
            self.lookahead = self.chars.next();
        }
        self.lookahead
    }

    /// Consume the next character, advancing the coordinates over it
    fn take(&mut self) -> Option<char> {
        let next = match self.lookahead.take() {
            Some(c) => Some(c),
            None => self.chars.next(),
        };
        if let Some(c) = next {
            self.position.advance(c);
        }
        next
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.take();
        }
    }

    /// Consume the next token from the input.  This is a straightforward LA(1) affair: the
    /// first significant character decides which matcher runs
    pub fn consume(&mut self) -> BindResult<PackedToken> {
        self.skip_whitespace();
        match self.take() {
            None => Ok(packed_token!(Token::EndOfInput, self.position)),
            Some('{') => Ok(packed_token!(Token::StartObject, self.position)),
            Some('}') => Ok(packed_token!(Token::EndObject, self.position)),
            Some('[') => Ok(packed_token!(Token::StartArray, self.position)),
            Some(']') => Ok(packed_token!(Token::EndArray, self.position)),
            Some(':') => Ok(packed_token!(Token::Colon, self.position)),
            Some(',') => Ok(packed_token!(Token::Comma, self.position)),
            Some('"') => self.match_string(),
            Some('t') => self.match_keyword("true", Token::Boolean(true)),
            Some('f') => self.match_keyword("false", Token::Boolean(false)),
            Some('n') => self.match_keyword("null", Token::Null),
            Some(c) if c == '-' || c.is_ascii_digit() => self.match_number(c),
            Some(c) => malformed_error!(Details::InvalidCharacter(c), self.position),
        }
    }

    /// Match the remainder of a literal keyword, the first character having already been
    /// consumed.  A trailing alphanumeric turns the whole thing into an invalid keyword, so
    /// that e.g. `trueX` doesn't lex as `true` followed by garbage
    fn match_keyword(&mut self, literal: &'static str, token: Token) -> BindResult<PackedToken> {
        let start = self.position;
        for (index, expected) in literal.chars().enumerate().skip(1) {
            match self.take() {
                Some(c) if c == expected => (),
                Some(c) => {
                    return malformed_error!(
                        Details::InvalidKeyword(format!("{}{}", &literal[..index], c)),
                        self.position
                    )
                }
                None => return malformed_error!(Details::EndOfInput, self.position),
            }
        }
        if let Some(next) = self.peek() {
            if next.is_alphanumeric() || next == '_' {
                return malformed_error!(
                    Details::InvalidKeyword(format!("{}{}", literal, next)),
                    self.position
                );
            }
        }
        Ok(packed_token!(token, start, self.position))
    }

    /// Attempts to match a string token, translating escape sequences as it goes
    fn match_string(&mut self) -> BindResult<PackedToken> {
        let start = self.position;
        self.buffer.clear();
        loop {
            match self.take() {
                None => return malformed_error!(Details::EndOfInput, self.position),
                Some('"') => break,
                Some('\\') => {
                    let unescaped = self.match_escape_sequence()?;
                    self.buffer.push(unescaped);
                }
                Some(c) if (c as u32) < 0x20 => {
                    return malformed_error!(Details::InvalidCharacter(c), self.position)
                }
                Some(c) => self.buffer.push(c),
            }
        }
        Ok(packed_token!(
            Token::Str(self.buffer.clone()),
            start,
            self.position
        ))
    }

    /// Match a valid string escape sequence, returning the character it denotes
    fn match_escape_sequence(&mut self) -> BindResult<char> {
        match self.take() {
            None => malformed_error!(Details::EndOfInput, self.position),
            Some('"') => Ok('"'),
            Some('\\') => Ok('\\'),
            Some('/') => Ok('/'),
            Some('b') => Ok('\u{0008}'),
            Some('f') => Ok('\u{000c}'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('u') => self.match_unicode_escape_sequence(),
            Some(c) => malformed_error!(
                Details::InvalidEscapeSequence(format!("\\{}", c)),
                self.position
            ),
        }
    }

    /// Match a unicode escape in the form `uXXXX`, combining surrogate pairs into the single
    /// character they encode.  A lone surrogate half is an error
    fn match_unicode_escape_sequence(&mut self) -> BindResult<char> {
        let high = self.match_hex_quad()?;
        if (0xdc00..=0xdfff).contains(&high) {
            return malformed_error!(
                Details::InvalidUnicodeEscapeSequence(format!("\\u{:04x}", high)),
                self.position
            );
        }
        if (0xd800..=0xdbff).contains(&high) {
            if self.take() != Some('\\') || self.take() != Some('u') {
                return malformed_error!(
                    Details::InvalidUnicodeEscapeSequence(format!("\\u{:04x}", high)),
                    self.position
                );
            }
            let low = self.match_hex_quad()?;
            if !(0xdc00..=0xdfff).contains(&low) {
                return malformed_error!(
                    Details::InvalidUnicodeEscapeSequence(format!(
                        "\\u{:04x}\\u{:04x}",
                        high, low
                    )),
                    self.position
                );
            }
            let combined = 0x10000 + ((high - 0xd800) << 10) + (low - 0xdc00);
            return match char::from_u32(combined) {
                Some(c) => Ok(c),
                None => malformed_error!(
                    Details::InvalidUnicodeEscapeSequence(format!(
                        "\\u{:04x}\\u{:04x}",
                        high, low
                    )),
                    self.position
                ),
            };
        }
        match char::from_u32(high) {
            Some(c) => Ok(c),
            None => malformed_error!(
                Details::InvalidUnicodeEscapeSequence(format!("\\u{:04x}", high)),
                self.position
            ),
        }
    }

    /// Match exactly four hex digits
    fn match_hex_quad(&mut self) -> BindResult<u32> {
        let mut value = 0u32;
        for _ in 1..=4 {
            match self.take() {
                Some(c) => match c.to_digit(16) {
                    Some(digit) => value = (value << 4) | digit,
                    None => {
                        return malformed_error!(
                            Details::InvalidUnicodeEscapeSequence(format!("\\u..{}", c)),
                            self.position
                        )
                    }
                },
                None => return malformed_error!(Details::EndOfInput, self.position),
            }
        }
        Ok(value)
    }

    fn digit_follows(&mut self) -> bool {
        matches!(self.peek(), Some(c) if c.is_ascii_digit())
    }

    /// Attempt to match on a number representation.  The grammar rules are checked here, the
    /// final conversion is handed off to `fast_float` for floats and `lexical` for integers,
    /// with the choice made purely on what appeared in the input
    fn match_number(&mut self, first: char) -> BindResult<PackedToken> {
        let start = self.position;
        self.buffer.clear();
        self.buffer.push(first);
        let mut float = false;
        let mut exponent = false;

        if first == '-' {
            match self.peek() {
                Some(c) if c.is_ascii_digit() => {
                    self.take();
                    self.buffer.push(c);
                }
                _ => {
                    return malformed_error!(
                        Details::InvalidNumericRepresentation(self.buffer.clone()),
                        start
                    )
                }
            }
        }
        // leading zeros are forbidden, although the conversions below would absorb them
        if self.buffer.ends_with('0') {
            if let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.buffer.push(c);
                    return malformed_error!(
                        Details::InvalidNumericRepresentation(self.buffer.clone()),
                        start
                    );
                }
            }
        }

        loop {
            match self.peek() {
                Some(c) if c.is_ascii_digit() => {
                    self.take();
                    self.buffer.push(c);
                }
                Some('.') => {
                    self.take();
                    self.buffer.push('.');
                    if float || !self.digit_follows() {
                        return malformed_error!(
                            Details::InvalidNumericRepresentation(self.buffer.clone()),
                            start
                        );
                    }
                    float = true;
                }
                Some(c) if c == 'e' || c == 'E' => {
                    self.take();
                    self.buffer.push(c);
                    if exponent {
                        return malformed_error!(
                            Details::InvalidNumericRepresentation(self.buffer.clone()),
                            start
                        );
                    }
                    if let Some(sign) = self.peek() {
                        if sign == '+' || sign == '-' {
                            self.take();
                            self.buffer.push(sign);
                        }
                    }
                    if !self.digit_follows() {
                        return malformed_error!(
                            Details::InvalidNumericRepresentation(self.buffer.clone()),
                            start
                        );
                    }
                    float = true;
                    exponent = true;
                }
                Some(c) if c.is_alphabetic() => {
                    self.buffer.push(c);
                    return malformed_error!(
                        Details::InvalidNumericRepresentation(self.buffer.clone()),
                        start
                    );
                }
                _ => break,
            }
        }

        if float {
            match fast_float::parse(self.buffer.as_bytes()) {
                Ok(value) => Ok(packed_token!(Token::Float(value), start, self.position)),
                Err(_) => malformed_error!(
                    Details::InvalidNumericRepresentation(self.buffer.clone()),
                    start
                ),
            }
        } else {
            match lexical::parse::<i64, _>(self.buffer.as_bytes()) {
                Ok(value) => Ok(packed_token!(Token::Integer(value), start, self.position)),
                Err(_) => malformed_error!(
                    Details::InvalidNumericRepresentation(self.buffer.clone()),
                    start
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::{Lexer, Token};
    use crate::lines_from_relative_file;
    use std::fs::File;
    use std::io::{BufRead, BufReader};
    use std::path::PathBuf;

    #[test]
    fn should_parse_basic_tokens() {
        let mut chars = "{}[],:".chars();
        let mut lexer = Lexer::new(&mut chars);
        let mut tokens: Vec<Token> = vec![];
        for _ in 1..=7 {
            tokens.push(lexer.consume().unwrap().0);
        }
        assert_eq!(
            tokens,
            [
                Token::StartObject,
                Token::EndObject,
                Token::StartArray,
                Token::EndArray,
                Token::Comma,
                Token::Colon,
                Token::EndOfInput
            ]
        );
    }

    #[test]
    fn should_parse_null_and_booleans() {
        let mut chars = "null true    false".chars();
        let mut lexer = Lexer::new(&mut chars);
        let mut tokens: Vec<Token> = vec![];
        for _ in 1..=4 {
            tokens.push(lexer.consume().unwrap().0);
        }
        assert_eq!(
            tokens,
            [
                Token::Null,
                Token::Boolean(true),
                Token::Boolean(false),
                Token::EndOfInput
            ]
        );
    }

    #[test]
    fn should_reject_extended_keywords() {
        for input in ["trueX", "true_", "null9", "falsey"] {
            let mut chars = input.chars();
            let mut lexer = Lexer::new(&mut chars);
            let token = lexer.consume();
            println!("{} lexed to {:?}", input, token);
            assert!(token.is_err());
        }
    }

    #[test]
    fn should_split_numbers_lexically() {
        let mut chars = "123 -4 0 12.5 -0.5 1e5 1E-5 6.02e23".chars();
        let mut lexer = Lexer::new(&mut chars);
        let mut tokens: Vec<Token> = vec![];
        loop {
            let token = lexer.consume().unwrap().0;
            if token == Token::EndOfInput {
                break;
            }
            tokens.push(token);
        }
        assert_eq!(
            tokens,
            [
                Token::Integer(123),
                Token::Integer(-4),
                Token::Integer(0),
                Token::Float(12.5),
                Token::Float(-0.5),
                Token::Float(1e5),
                Token::Float(1e-5),
                Token::Float(6.02e23)
            ]
        );
    }

    #[test]
    fn should_reject_invalid_numbers() {
        for input in [
            "--1", "-x", "01", "00", "-01", "1.", "1.e5", "1e", "1e+", "1.2.3", "1e5e5", "12q",
        ] {
            let mut chars = input.chars();
            let mut lexer = Lexer::new(&mut chars);
            let token = lexer.consume();
            println!("{} lexed to {:?}", input, token);
            assert!(token.is_err());
        }
    }

    #[test]
    fn should_unescape_strings() {
        let cases = [
            (r#""plain""#, "plain"),
            (r#""tab\there""#, "tab\there"),
            (r#""quote \" slash \\ solidus \/""#, "quote \" slash \\ solidus /"),
            (r#""controls \b\f\n\r""#, "controls \u{8}\u{c}\n\r"),
            (r#""unicode é""#, "unicode é"),
            (r#""escaped \u00e9""#, "escaped é"),
            (r#""pair \ud83d\ude00""#, "pair 😀"),
            ("\"del \u{7f} nel \u{85}\"", "del \u{7f} nel \u{85}"),
        ];
        for (input, expected) in cases {
            let mut chars = input.chars();
            let mut lexer = Lexer::new(&mut chars);
            match lexer.consume().unwrap().0 {
                Token::Str(value) => assert_eq!(value, expected),
                token => panic!("expected a string, got {:?}", token),
            }
        }
    }

    #[test]
    fn should_reject_dodgy_strings() {
        let cases = [
            r#""unterminated"#,
            r#""bad escape \q""#,
            r#""bad hex \u12g4""#,
            r#""lone high \ud83d""#,
            r#""lone low \ude00""#,
            "\"raw\nnewline\"",
        ];
        for input in cases {
            let mut chars = input.chars();
            let mut lexer = Lexer::new(&mut chars);
            let token = lexer.consume();
            println!("{} lexed to {:?}", input, token);
            assert!(token.is_err());
        }
    }

    #[test]
    fn should_track_spans() {
        let mut chars = "  true".chars();
        let mut lexer = Lexer::new(&mut chars);
        let (token, span) = lexer.consume().unwrap();
        assert_eq!(token, Token::Boolean(true));
        assert_eq!(span.start.column, 3);
        assert_eq!(span.end.column, 6);
    }

    #[test]
    fn should_lex_the_number_samples() {
        let lines = lines_from_relative_file!("fixtures/utf-8/numbers.txt");
        for line in lines.flatten() {
            if line.is_empty() {
                continue;
            }
            let expected: f64 = fast_float::parse(line.as_str()).unwrap();
            let mut chars = line.chars();
            let mut lexer = Lexer::new(&mut chars);
            match lexer.consume().unwrap().0 {
                Token::Integer(value) => assert_eq!(value as f64, expected),
                Token::Float(value) => assert_eq!(value, expected),
                token => panic!("expected a number from {}, got {:?}", line, token),
            }
        }
    }

    #[test]
    fn should_reject_the_invalid_number_samples() {
        let lines = lines_from_relative_file!("fixtures/utf-8/invalid_numbers.txt");
        for line in lines.flatten() {
            if line.is_empty() {
                continue;
            }
            let mut chars = line.chars();
            let mut lexer = Lexer::new(&mut chars);
            let token = lexer.consume();
            println!("{} lexed to {:?}", line, token);
            assert!(token.is_err());
        }
    }

    #[test]
    fn should_reject_the_dodgy_string_samples() {
        let lines = lines_from_relative_file!("fixtures/utf-8/dodgy_strings.txt");
        for line in lines.flatten() {
            if line.is_empty() {
                continue;
            }
            let mut chars = line.chars();
            let mut lexer = Lexer::new(&mut chars);
            let mut error = None;
            loop {
                match lexer.consume() {
                    Ok((Token::EndOfInput, _)) => break,
                    Ok(_) => (),
                    Err(err) => {
                        println!("dodgy string '{}' -> {}", line, err);
                        error = Some(err);
                        break;
                    }
                }
            }
            assert!(error.is_some());
        }
    }
}
