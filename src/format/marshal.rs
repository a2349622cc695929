//! Decoder for the subset of Python's `marshal` format used by PYZ
//! directories.
//!
//! A PYZ directory is written with `marshal.dump(list(toc.items()))`, i.e. a
//! list of `(name, (type_code, offset, length))` tuples. Older builds store a
//! dict instead. Only the object types needed to express those structures
//! are supported; anything else (code objects, floats, sets, ...) is
//! reported as a corrupt directory.
//!
//! Objects flagged with `FLAG_REF` are remembered so that later `TYPE_REF`
//! back-references resolve to them. A container reserves its reference slot
//! before its children are read, matching the writer's numbering.
//!
//! A back-reference expands to a full copy of its target, so a few bytes of
//! input can describe an exponentially large value. The decoder charges
//! every produced value against [`MAX_DECODED_SIZE`] and stops once the
//! budget is spent.

use std::io::Read;

use super::reader::{read_bytes, read_i32_le, read_u8, read_u16_le, read_u32_le};
use crate::{Error, Result};

const TYPE_NULL: u8 = b'0';
const TYPE_NONE: u8 = b'N';
const TYPE_FALSE: u8 = b'F';
const TYPE_TRUE: u8 = b'T';
const TYPE_INT: u8 = b'i';
const TYPE_LONG: u8 = b'l';
const TYPE_STRING: u8 = b's';
const TYPE_INTERNED: u8 = b't';
const TYPE_REF: u8 = b'r';
const TYPE_TUPLE: u8 = b'(';
const TYPE_LIST: u8 = b'[';
const TYPE_DICT: u8 = b'{';
const TYPE_UNICODE: u8 = b'u';
const TYPE_ASCII: u8 = b'a';
const TYPE_ASCII_INTERNED: u8 = b'A';
const TYPE_SMALL_TUPLE: u8 = b')';
const TYPE_SHORT_ASCII: u8 = b'z';
const TYPE_SHORT_ASCII_INTERNED: u8 = b'Z';

const FLAG_REF: u8 = 0x80;

/// Bits per digit of a marshalled `long`.
const PYLONG_SHIFT: u32 = 15;

/// Maximum nesting depth accepted by the decoder.
pub const MAX_DEPTH: usize = 64;

/// Upper bound for container pre-allocation; the real size is validated by
/// reading the elements.
const MAX_PREALLOC: usize = 4096;

/// Upper bound for the in-memory size of a decoded value (64 MiB).
///
/// Every node costs `size_of::<Value>()` plus its string or byte payload.
/// Real PYZ directories stay far below this.
pub const MAX_DECODED_SIZE: usize = 64 * 1024 * 1024;

const NODE_COST: usize = std::mem::size_of::<Value>();

/// A decoded marshal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `None`.
    None,
    /// `True` / `False`.
    Bool(bool),
    /// An integer that fits into `i64`.
    Int(i64),
    /// A text string.
    Str(String),
    /// A byte string.
    Bytes(Vec<u8>),
    /// A tuple.
    Tuple(Vec<Value>),
    /// A list.
    List(Vec<Value>),
    /// A dict, as key/value pairs in stream order.
    Dict(Vec<(Value, Value)>),
}

impl Value {
    /// Returns the elements of a tuple or list.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) | Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Returns the string value; byte strings are accepted if they are
    /// valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }
}

/// Streaming marshal decoder.
pub struct MarshalReader<R> {
    reader: R,
    position: u64,
    /// Remembered objects with their decoded cost.
    refs: Vec<Option<(Value, usize)>>,
    decoded: usize,
}

impl<R: Read> MarshalReader<R> {
    /// Creates a decoder reading from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
            refs: Vec::new(),
            decoded: 0,
        }
    }

    /// Decodes a single top-level object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptHeader`] for unsupported or malformed data,
    /// with the offset relative to the start of the stream.
    pub fn read_value(&mut self) -> Result<Value> {
        match self.read_object(0)? {
            Some(value) => Ok(value),
            None => Err(self.corrupt("unexpected NULL object at top level")),
        }
    }

    /// Charges `cost` bytes against the decoding budget.
    fn charge(&mut self, cost: usize) -> Result<()> {
        self.decoded = self
            .decoded
            .checked_add(cost)
            .filter(|&total| total <= MAX_DECODED_SIZE)
            .ok_or_else(|| {
                self.corrupt(format!(
                    "decoded value exceeds {} bytes",
                    MAX_DECODED_SIZE
                ))
            })?;
        Ok(())
    }

    fn corrupt(&self, reason: impl Into<String>) -> Error {
        Error::corrupt(self.position, reason)
    }

    fn eof(&self, e: std::io::Error) -> Error {
        self.corrupt(format!("truncated marshal data: {}", e))
    }

    fn u8(&mut self) -> Result<u8> {
        let v = read_u8(&mut self.reader).map_err(|e| self.eof(e))?;
        self.position += 1;
        Ok(v)
    }

    fn u16(&mut self) -> Result<u16> {
        let v = read_u16_le(&mut self.reader).map_err(|e| self.eof(e))?;
        self.position += 2;
        Ok(v)
    }

    fn u32(&mut self) -> Result<u32> {
        let v = read_u32_le(&mut self.reader).map_err(|e| self.eof(e))?;
        self.position += 4;
        Ok(v)
    }

    fn i32(&mut self) -> Result<i32> {
        let v = read_i32_le(&mut self.reader).map_err(|e| self.eof(e))?;
        self.position += 4;
        Ok(v)
    }

    fn bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let v = read_bytes(&mut self.reader, len).map_err(|e| self.eof(e))?;
        self.position += len as u64;
        Ok(v)
    }

    fn text(&mut self, len: usize) -> Result<String> {
        let data = self.bytes(len)?;
        String::from_utf8(data).map_err(|e| self.corrupt(format!("string is not UTF-8: {}", e)))
    }

    /// Reads one object. `None` is returned for `TYPE_NULL`, which only
    /// appears as the dict terminator.
    fn read_object(&mut self, depth: usize) -> Result<Option<Value>> {
        if depth > MAX_DEPTH {
            return Err(self.corrupt(format!("nesting deeper than {}", MAX_DEPTH)));
        }

        let code = self.u8()?;
        let flagged = code & FLAG_REF != 0;
        let kind = code & !FLAG_REF;

        if kind == TYPE_NULL {
            return Ok(None);
        }
        if kind == TYPE_REF {
            let index = self.u32()? as usize;
            let cost = match self.refs.get(index) {
                Some(Some((_, cost))) => *cost,
                Some(None) => {
                    return Err(self.corrupt(format!("reference {} to unfinished object", index)));
                }
                None => return Err(self.corrupt(format!("invalid reference {}", index))),
            };
            self.charge(cost)?;
            return Ok(self.refs[index].as_ref().map(|(value, _)| value.clone()));
        }

        let start = self.decoded;
        self.charge(NODE_COST)?;

        let slot = if flagged {
            self.refs.push(None);
            Some(self.refs.len() - 1)
        } else {
            None
        };

        let value = match kind {
            TYPE_NONE => Value::None,
            TYPE_FALSE => Value::Bool(false),
            TYPE_TRUE => Value::Bool(true),
            TYPE_INT => Value::Int(i64::from(self.i32()?)),
            TYPE_LONG => Value::Int(self.read_long()?),
            TYPE_STRING => {
                let len = self.u32()? as usize;
                self.charge(len)?;
                Value::Bytes(self.bytes(len)?)
            }
            TYPE_UNICODE | TYPE_INTERNED | TYPE_ASCII | TYPE_ASCII_INTERNED => {
                let len = self.u32()? as usize;
                self.charge(len)?;
                Value::Str(self.text(len)?)
            }
            TYPE_SHORT_ASCII | TYPE_SHORT_ASCII_INTERNED => {
                let len = self.u8()? as usize;
                self.charge(len)?;
                Value::Str(self.text(len)?)
            }
            TYPE_TUPLE => {
                let len = self.u32()? as usize;
                Value::Tuple(self.read_items(len, depth)?)
            }
            TYPE_SMALL_TUPLE => {
                let len = self.u8()? as usize;
                Value::Tuple(self.read_items(len, depth)?)
            }
            TYPE_LIST => {
                let len = self.u32()? as usize;
                Value::List(self.read_items(len, depth)?)
            }
            TYPE_DICT => Value::Dict(self.read_dict(depth)?),
            other => {
                return Err(self.corrupt(format!(
                    "unsupported marshal type code {:#04x} ({:?})",
                    other, other as char
                )));
            }
        };

        if let Some(slot) = slot {
            self.refs[slot] = Some((value.clone(), self.decoded - start));
        }
        Ok(Some(value))
    }

    fn read_items(&mut self, len: usize, depth: usize) -> Result<Vec<Value>> {
        let mut items = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            match self.read_object(depth + 1)? {
                Some(item) => items.push(item),
                None => return Err(self.corrupt("NULL object inside sequence")),
            }
        }
        Ok(items)
    }

    fn read_dict(&mut self, depth: usize) -> Result<Vec<(Value, Value)>> {
        let mut pairs = Vec::new();
        while let Some(key) = self.read_object(depth + 1)? {
            match self.read_object(depth + 1)? {
                Some(value) => pairs.push((key, value)),
                None => return Err(self.corrupt("dict key without value")),
            }
        }
        Ok(pairs)
    }

    fn read_long(&mut self) -> Result<i64> {
        let n = self.i32()?;
        let digits = n.unsigned_abs();
        let mut value: i64 = 0;
        for i in 0..digits {
            let digit = self.u16()?;
            if digit >= 1 << PYLONG_SHIFT {
                return Err(self.corrupt(format!("invalid long digit {:#x}", digit)));
            }
            let shifted = (digit as i64)
                .checked_shl(PYLONG_SHIFT * i)
                .filter(|v| v >> (PYLONG_SHIFT * i) == digit as i64);
            value = shifted
                .and_then(|v| value.checked_add(v))
                .ok_or_else(|| self.corrupt("integer does not fit into 64 bits"))?;
        }
        Ok(if n < 0 { -value } else { value })
    }
}

/// Describes the value type for error messages.
pub(crate) fn describe(value: &Value) -> &'static str {
    value.type_name()
}
