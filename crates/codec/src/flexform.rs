//! FlexForm XML.
//!
//! Decoding follows the host's `xml2array` conventions: the document element
//! is dropped, an element's key is its `index` attribute (falling back to the
//! tag name), elements with children become objects and leaf elements become
//! strings. Encoding writes the canonical `T3FlexForms` layout back.

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

use crate::{CodecError, ConfigCodec};

const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"yes\" ?>";
const DOCUMENT_TAG: &str = "T3FlexForms";

#[derive(Debug, Clone, Copy, Default)]
pub struct FlexFormCodec;

struct Frame {
    key: String,
    text: String,
    children: Map<String, Value>,
}

impl Frame {
    fn new(key: String) -> Self {
        Self {
            key,
            text: String::new(),
            children: Map::new(),
        }
    }

    fn into_entry(self) -> (String, Value) {
        let value = if self.children.is_empty() {
            Value::String(self.text)
        } else {
            Value::Object(self.children)
        };
        (self.key, value)
    }
}

impl ConfigCodec for FlexFormCodec {
    fn decode(&self, blob: &str) -> Result<Value, CodecError> {
        let mut reader = Reader::from_str(blob);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Frame> = Vec::new();
        let mut document: Option<Value> = None;

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) => {
                    if document.is_some() {
                        return Err(CodecError::Xml("content after document element".into()));
                    }
                    stack.push(Frame::new(element_key(&e)?));
                }
                Event::Empty(e) => {
                    let key = element_key(&e)?;
                    match stack.last_mut() {
                        Some(parent) => {
                            parent.children.insert(key, Value::String(String::new()));
                        }
                        None if document.is_none() => document = Some(Value::Object(Map::new())),
                        None => {
                            return Err(CodecError::Xml("content after document element".into()));
                        }
                    }
                }
                Event::Text(t) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.text.push_str(&t.unescape().map_err(xml_error)?);
                    }
                }
                Event::CData(c) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::End(_) => {
                    let frame = stack
                        .pop()
                        .ok_or_else(|| CodecError::Xml("unbalanced end tag".into()))?;
                    let (key, value) = frame.into_entry();
                    match stack.last_mut() {
                        Some(parent) => {
                            parent.children.insert(key, value);
                        }
                        None => document = Some(value),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(CodecError::Xml("unclosed element at end of input".into()));
        }
        match document {
            Some(Value::Object(map)) => Ok(Value::Object(map)),
            Some(_) => Err(CodecError::Unsupported(
                "document element holds text instead of elements".into(),
            )),
            None => Err(CodecError::Xml("empty document".into())),
        }
    }

    fn encode(&self, value: &Value) -> Result<String, CodecError> {
        let map = value.as_object().ok_or_else(|| {
            CodecError::Unsupported("FlexForm document must be an object".into())
        })?;
        let mut out = format!("{XML_HEADER}\n<{DOCUMENT_TAG}>\n");
        write_children(&mut out, DOCUMENT_TAG, map, 1)?;
        out.push_str(&format!("</{DOCUMENT_TAG}>"));
        Ok(out)
    }
}

fn xml_error(err: impl std::fmt::Display) -> CodecError {
    CodecError::Xml(err.to_string())
}

fn element_key(e: &BytesStart<'_>) -> Result<String, CodecError> {
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        if attr.key.as_ref() == b"index" {
            return Ok(attr.unescape_value().map_err(xml_error)?.into_owned());
        }
    }
    Ok(String::from_utf8_lossy(e.name().as_ref()).into_owned())
}

/// Tag used for children of `parent`; children of these carry an `index`.
fn indexed_child_tag(parent: &str) -> Option<&'static str> {
    match parent {
        "data" => Some("sheet"),
        "sheet" => Some("language"),
        "language" | "el" => Some("field"),
        "field" => Some("value"),
        _ => None,
    }
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn write_children(
    out: &mut String,
    parent: &str,
    map: &Map<String, Value>,
    depth: usize,
) -> Result<(), CodecError> {
    let indent = "    ".repeat(depth);
    for (key, value) in map {
        let (tag, index) = match indexed_child_tag(parent) {
            Some(tag) => (tag, Some(key.as_str())),
            None if is_xml_name(key) => (key.as_str(), None),
            None => ("n", Some(key.as_str())),
        };
        let open = match index {
            Some(index) => format!("<{tag} index=\"{}\">", escape(index)),
            None => format!("<{tag}>"),
        };
        match value {
            Value::Object(children) => {
                out.push_str(&format!("{indent}{open}\n"));
                write_children(out, tag, children, depth + 1)?;
                out.push_str(&format!("{indent}</{tag}>\n"));
            }
            Value::Array(_) => {
                return Err(CodecError::Unsupported(format!(
                    "list value under `{key}`"
                )));
            }
            scalar => {
                let text = match scalar {
                    Value::Null => String::new(),
                    Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.push_str(&format!("{indent}{open}{}</{tag}>\n", escape(&text)));
            }
        }
    }
    Ok(())
}
