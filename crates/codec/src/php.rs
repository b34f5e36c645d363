//! PHP `serialize()` format.
//!
//! Arrays decode to JSON objects in insertion order; integer keys become
//! their decimal string. Encoding turns canonical integer strings back into
//! integer keys, which is the same normalisation PHP applies to array keys.
//! Objects, references and custom-serialized classes are rejected.

use serde_json::{Map, Number, Value};

use crate::{CodecError, ConfigCodec};

const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, Default)]
pub struct PhpSerializeCodec;

impl ConfigCodec for PhpSerializeCodec {
    fn decode(&self, blob: &str) -> Result<Value, CodecError> {
        let mut parser = Parser {
            input: blob.as_bytes(),
            pos: 0,
        };
        let value = parser.value(0)?;
        if !parser.rest().iter().all(u8::is_ascii_whitespace) {
            return Err(parser.error("trailing data after value"));
        }
        Ok(value)
    }

    fn encode(&self, value: &Value) -> Result<String, CodecError> {
        let mut out = String::new();
        write_value(&mut out, value)?;
        Ok(out)
    }
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    fn error(&self, message: impl Into<String>) -> CodecError {
        CodecError::Syntax {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn next_byte(&mut self) -> Result<u8, CodecError> {
        let byte = *self
            .input
            .get(self.pos)
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        Ok(byte)
    }

    fn expect(&mut self, expected: u8) -> Result<(), CodecError> {
        let start = self.pos;
        let byte = self.next_byte()?;
        if byte != expected {
            self.pos = start;
            return Err(self.error(format!(
                "expected `{}`, found `{}`",
                expected as char, byte as char
            )));
        }
        Ok(())
    }

    /// Bytes up to (not including) `delimiter`; the delimiter is consumed.
    fn until(&mut self, delimiter: u8) -> Result<&'a str, CodecError> {
        let rest = self.rest();
        let len = rest
            .iter()
            .position(|b| *b == delimiter)
            .ok_or_else(|| self.error(format!("missing `{}`", delimiter as char)))?;
        let token = std::str::from_utf8(&rest[..len]).map_err(|_| self.error("invalid utf-8"))?;
        self.pos += len + 1;
        Ok(token)
    }

    fn int(&mut self, delimiter: u8) -> Result<i64, CodecError> {
        let start = self.pos;
        let token = self.until(delimiter)?;
        token.parse::<i64>().map_err(|_| CodecError::Syntax {
            offset: start,
            message: format!("invalid integer `{token}`"),
        })
    }

    fn length(&mut self) -> Result<usize, CodecError> {
        let start = self.pos;
        let token = self.until(b':')?;
        token.parse::<usize>().map_err(|_| CodecError::Syntax {
            offset: start,
            message: format!("invalid length `{token}`"),
        })
    }

    fn string_body(&mut self) -> Result<String, CodecError> {
        let len = self.length()?;
        self.expect(b'"')?;
        let start = self.pos;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or_else(|| self.error("string length exceeds input"))?;
        let text = std::str::from_utf8(&self.input[start..end])
            .map_err(|_| self.error("string is not valid utf-8"))?
            .to_string();
        self.pos = end;
        self.expect(b'"')?;
        Ok(text)
    }

    fn value(&mut self, depth: usize) -> Result<Value, CodecError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        let tag = self.next_byte()?;
        match tag {
            b'N' => {
                self.expect(b';')?;
                Ok(Value::Null)
            }
            b'b' => {
                self.expect(b':')?;
                match self.until(b';')? {
                    "0" => Ok(Value::Bool(false)),
                    "1" => Ok(Value::Bool(true)),
                    other => Err(self.error(format!("invalid boolean `{other}`"))),
                }
            }
            b'i' => {
                self.expect(b':')?;
                Ok(Value::Number(self.int(b';')?.into()))
            }
            b'd' => {
                self.expect(b':')?;
                let token = self.until(b';')?;
                let number = token
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .and_then(Number::from_f64)
                    .ok_or_else(|| CodecError::Unsupported(format!("float `{token}`")))?;
                Ok(Value::Number(number))
            }
            b's' => {
                self.expect(b':')?;
                let text = self.string_body()?;
                self.expect(b';')?;
                Ok(Value::String(text))
            }
            b'a' => {
                self.expect(b':')?;
                let count = self.length()?;
                self.expect(b'{')?;
                let mut map = Map::new();
                for _ in 0..count {
                    let key = self.key()?;
                    let value = self.value(depth + 1)?;
                    map.insert(key, value);
                }
                self.expect(b'}')?;
                Ok(Value::Object(map))
            }
            b'O' | b'C' => Err(CodecError::Unsupported("serialized objects".to_string())),
            b'r' | b'R' => Err(CodecError::Unsupported("serialized references".to_string())),
            b'E' => Err(CodecError::Unsupported("serialized enums".to_string())),
            other => {
                self.pos -= 1;
                Err(self.error(format!("unknown type tag `{}`", other as char)))
            }
        }
    }

    fn key(&mut self) -> Result<String, CodecError> {
        match self.next_byte()? {
            b'i' => {
                self.expect(b':')?;
                Ok(self.int(b';')?.to_string())
            }
            b's' => {
                self.expect(b':')?;
                let text = self.string_body()?;
                self.expect(b';')?;
                Ok(text)
            }
            other => {
                self.pos -= 1;
                Err(self.error(format!("invalid array key type `{}`", other as char)))
            }
        }
    }
}

fn write_value(out: &mut String, value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Null => out.push_str("N;"),
        Value::Bool(b) => out.push_str(if *b { "b:1;" } else { "b:0;" }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                out.push_str(&format!("i:{i};"));
            } else if let Some(f) = n.as_f64() {
                out.push_str(&format!("d:{f};"));
            } else {
                return Err(CodecError::Unsupported(format!("number {n}")));
            }
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push_str(&format!("a:{}:{{", items.len()));
            for (idx, item) in items.iter().enumerate() {
                out.push_str(&format!("i:{idx};"));
                write_value(out, item)?;
            }
            out.push('}');
        }
        Value::Object(map) => {
            out.push_str(&format!("a:{}:{{", map.len()));
            for (key, item) in map {
                if is_integer_key(key) {
                    out.push_str(&format!("i:{key};"));
                } else {
                    write_string(out, key);
                }
                write_value(out, item)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_string(out: &mut String, s: &str) {
    out.push_str(&format!("s:{}:\"{s}\";", s.len()));
}

/// Decimal integer strings without leading zeros, as PHP casts array keys.
fn is_integer_key(key: &str) -> bool {
    let digits = key.strip_prefix('-').unwrap_or(key);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if digits.starts_with('0') && (digits.len() > 1 || key.starts_with('-')) {
        return false;
    }
    key.parse::<i64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const UC: &str = r#"a:3:{s:11:"startModule";s:17:"help_aboutmodules";s:8:"titleLen";i:50;s:4:"edit";a:2:{i:0;b:1;i:1;N;}}"#;

    #[test]
    fn decodes_nested_arrays_in_order() {
        let value = PhpSerializeCodec.decode(UC).unwrap();
        assert_eq!(
            value,
            json!({
                "startModule": "help_aboutmodules",
                "titleLen": 50,
                "edit": { "0": true, "1": null }
            })
        );
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["startModule", "titleLen", "edit"]);
    }

    #[test]
    fn encode_restores_original_blob() {
        let value = PhpSerializeCodec.decode(UC).unwrap();
        assert_eq!(PhpSerializeCodec.encode(&value).unwrap(), UC);
    }

    #[test]
    fn string_lengths_count_bytes() {
        let value = PhpSerializeCodec.decode(r#"s:6:"héllo";"#).unwrap();
        assert_eq!(value, json!("héllo"));
        assert_eq!(
            PhpSerializeCodec.encode(&value).unwrap(),
            r#"s:6:"héllo";"#
        );
    }

    #[test]
    fn floats_and_negative_keys() {
        let value = PhpSerializeCodec.decode("a:2:{i:-3;d:0.5;s:2:\"07\";i:1;}").unwrap();
        assert_eq!(value, json!({ "-3": 0.5, "07": 1 }));
        assert_eq!(
            PhpSerializeCodec.encode(&value).unwrap(),
            "a:2:{i:-3;d:0.5;s:2:\"07\";i:1;}"
        );
    }

    #[test]
    fn truncated_input_is_a_syntax_error() {
        let err = PhpSerializeCodec.decode(r#"s:10:"abc";"#).unwrap_err();
        assert!(matches!(err, CodecError::Syntax { .. }), "{err}");
        assert!(PhpSerializeCodec.decode("a:2:{i:0;b:1;}").is_err());
        assert!(PhpSerializeCodec.decode("").is_err());
        assert!(PhpSerializeCodec.decode("i:1;garbage").is_err());
    }

    #[test]
    fn objects_are_unsupported() {
        let err = PhpSerializeCodec
            .decode(r#"O:8:"stdClass":0:{}"#)
            .unwrap_err();
        assert!(matches!(err, CodecError::Unsupported(_)));
        assert!(matches!(
            PhpSerializeCodec.decode("d:INF;"),
            Err(CodecError::Unsupported(_))
        ));
    }

    #[test]
    fn integer_key_detection() {
        assert!(is_integer_key("0"));
        assert!(is_integer_key("42"));
        assert!(is_integer_key("-7"));
        assert!(!is_integer_key("-0"));
        assert!(!is_integer_key("007"));
        assert!(!is_integer_key("1.5"));
        assert!(!is_integer_key(""));
        assert!(!is_integer_key("99999999999999999999"));
    }
}
