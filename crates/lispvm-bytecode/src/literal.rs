//! Serializable function literals
//!
//! A [`FunctionLiteral`] mirrors the printed shape of a compiled function:
//! argument list, code, constants, maximum stack depth and two optional
//! metadata slots. Constants are plain [`Datum`] trees so images can be
//! produced and consumed without a running machine.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::error::{BytecodeError, Result};
use crate::{IMAGE_MAGIC, IMAGE_VERSION};

const HEADER_LEN: usize = 16;

/// A constant value in serialized form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    /// The empty list
    Nil,
    /// Small integer
    Int(i64),
    /// Float
    Float(f64),
    /// Byte string
    Str(Vec<u8>),
    /// Symbol by name
    Symbol(String),
    /// Proper list
    List(Vec<Datum>),
    /// List whose last cdr is not nil
    Dotted(Vec<Datum>, Box<Datum>),
    /// Vector
    Vector(Vec<Datum>),
    /// Nested compiled function
    Function(Box<FunctionLiteral>),
}

impl Datum {
    /// Symbol datum
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// String datum from UTF-8 text
    pub fn string(text: &str) -> Self {
        Self::Str(text.as_bytes().to_vec())
    }

    /// Proper list datum; an empty list is `Nil`
    pub fn list(items: Vec<Datum>) -> Self {
        if items.is_empty() {
            Self::Nil
        } else {
            Self::List(items)
        }
    }
}

/// Documentation slot of a function literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DocLiteral {
    /// Inline docstring
    Text(String),
    /// Docstring stored elsewhere, loaded lazily by the host
    External {
        /// Resource holding the documentation
        file: String,
        /// Position inside the resource
        offset: i64,
    },
}

/// Serialized compiled function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionLiteral {
    /// Packed integer descriptor or list of parameter names
    pub arglist: Datum,
    /// Instruction stream
    pub code: Vec<u8>,
    /// Constant pool
    pub constants: Vec<Datum>,
    /// Declared maximum operand-stack depth
    pub max_depth: u32,
    /// Optional documentation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<DocLiteral>,
    /// Optional interactive form, evaluated by the host and never executed here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive: Option<Datum>,
}

impl FunctionLiteral {
    /// Serialize to a self-describing image
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let data =
            serde_json::to_vec(self).map_err(|e| BytecodeError::MalformedImage(e.to_string()))?;
        let len = u32::try_from(data.len())
            .map_err(|_| BytecodeError::MalformedImage("payload too large".to_string()))?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + data.len());
        bytes.extend_from_slice(&IMAGE_MAGIC);
        bytes.extend_from_slice(&IMAGE_VERSION.to_le_bytes());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&data);
        Ok(bytes)
    }

    /// Deserialize from an image produced by [`FunctionLiteral::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(BytecodeError::UnexpectedEnd(bytes.len()));
        }
        if bytes[0..8] != IMAGE_MAGIC {
            return Err(BytecodeError::InvalidMagic);
        }

        let version = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        if version != IMAGE_VERSION {
            return Err(BytecodeError::UnsupportedVersion(version));
        }

        let data_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
        let data = bytes
            .get(HEADER_LEN..HEADER_LEN + data_len)
            .ok_or(BytecodeError::UnexpectedEnd(bytes.len()))?;

        serde_json::from_slice(data).map_err(|e| BytecodeError::MalformedImage(e.to_string()))
    }

    /// Write the image to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }

    /// Read an image from a reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }
}
