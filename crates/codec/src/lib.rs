//! Structured-config codecs.
//!
//! Some host tables keep configuration as opaque text blobs: PHP
//! `serialize()` output for user settings and FlexForm XML for content
//! element options. Wizards only see the decoded structure as a
//! [`serde_json::Value`] and go through [`ConfigCodec`] for both directions.

pub mod flexform;
pub mod php;

use serde_json::Value;

pub use flexform::FlexFormCodec;
pub use php::PhpSerializeCodec;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed input at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unsupported value: {0}")]
    Unsupported(String),

    #[error("xml error: {0}")]
    Xml(String),
}

pub trait ConfigCodec: Send + Sync {
    fn decode(&self, blob: &str) -> Result<Value, CodecError>;

    fn encode(&self, value: &Value) -> Result<String, CodecError>;
}
