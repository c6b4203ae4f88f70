//! Field types and values.
//!
//! Every field has a fixed on-disk width so that a record of a given schema
//! always occupies the same number of bytes inside a page slot.
//!
//! ```text
//! Int:   [i32 big-endian]                          4 bytes
//! Text:  [u32 big-endian length][payload, 0-pad]   4 + 128 bytes
//! ```

use std::fmt;

use thiserror::Error;

/// Maximum payload length of a text field in bytes.
pub const STRING_LEN: usize = 128;

/// Errors from field serialization/deserialization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SerializationError {
    /// Buffer too small for the operation.
    #[error("buffer too small: need {required} bytes, have {available}")]
    BufferTooSmall {
        /// Bytes required.
        required: usize,
        /// Bytes available.
        available: usize,
    },
    /// Invalid data format.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// Returns `SerializationError::BufferTooSmall` if the buffer is too small.
#[macro_export]
macro_rules! ensure_buf_len {
    ($buf:expr, $required:expr) => {
        if $buf.len() < $required {
            return Err($crate::datum::SerializationError::BufferTooSmall {
                required: $required,
                available: $buf.len(),
            });
        }
    };
}

/// Field data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 4-byte signed integer.
    Int,
    /// Fixed-width string of at most [`STRING_LEN`] bytes.
    Text,
}

impl Type {
    /// Returns the number of bytes a field of this type occupies on disk.
    pub const fn byte_len(self) -> usize {
        match self {
            Type::Int => 4,
            Type::Text => 4 + STRING_LEN,
        }
    }

    /// Returns the value a freshly constructed record holds for this type.
    pub fn default_value(self) -> Value {
        match self {
            Type::Int => Value::Int(0),
            Type::Text => Value::Text(String::new()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT_TYPE"),
            Type::Text => write!(f, "STRING_TYPE"),
        }
    }
}

/// A typed field value.
///
/// `Eq` and `Hash` are derived so values can serve directly as group keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// 32-bit signed integer.
    Int(i32),
    /// Text; truncated to [`STRING_LEN`] bytes when written to a page.
    Text(String),
}

impl Value {
    /// Returns the data type of this value.
    pub fn data_type(&self) -> Type {
        match self {
            Value::Int(_) => Type::Int,
            Value::Text(_) => Type::Text,
        }
    }

    /// Returns the integer payload, or `None` for text.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    /// Returns the text payload, or `None` for integers.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Int(_) => None,
            Value::Text(s) => Some(s),
        }
    }

    /// Serializes this value into exactly `self.data_type().byte_len()` bytes.
    ///
    /// Text longer than [`STRING_LEN`] is cut at the last character boundary
    /// that fits; the unused payload bytes are zeroed.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError::BufferTooSmall` if the buffer is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializationError> {
        match self {
            Value::Int(n) => {
                ensure_buf_len!(buf, 4);
                buf[0..4].copy_from_slice(&n.to_be_bytes());
                Ok(4)
            }
            Value::Text(s) => {
                let required = Type::Text.byte_len();
                ensure_buf_len!(buf, required);
                let data = truncate_to_boundary(s, STRING_LEN).as_bytes();
                buf[0..4].copy_from_slice(&(data.len() as u32).to_be_bytes());
                buf[4..4 + data.len()].copy_from_slice(data);
                buf[4 + data.len()..required].fill(0);
                Ok(required)
            }
        }
    }

    /// Deserializes a value of type `ty` from the start of `buf`.
    ///
    /// Returns the value and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError::BufferTooSmall` if the buffer is too small.
    /// Returns `SerializationError::InvalidFormat` for an oversized length
    /// prefix or a payload that is not UTF-8.
    pub fn deserialize(buf: &[u8], ty: Type) -> Result<(Self, usize), SerializationError> {
        match ty {
            Type::Int => {
                ensure_buf_len!(buf, 4);
                let n = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
                Ok((Value::Int(n), 4))
            }
            Type::Text => {
                let required = Type::Text.byte_len();
                ensure_buf_len!(buf, required);
                let len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
                if len > STRING_LEN {
                    return Err(SerializationError::InvalidFormat(format!(
                        "text length {} exceeds maximum {}",
                        len, STRING_LEN
                    )));
                }
                let s = std::str::from_utf8(&buf[4..4 + len])
                    .map_err(|e| SerializationError::InvalidFormat(e.to_string()))?;
                Ok((Value::Text(s.to_string()), required))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Returns the longest prefix of `s` that is at most `max` bytes and ends on
/// a character boundary.
fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_len() {
        assert_eq!(Type::Int.byte_len(), 4);
        assert_eq!(Type::Text.byte_len(), 132);
    }

    #[test]
    fn test_int_is_big_endian() {
        let mut buf = [0u8; 4];
        Value::Int(0x0102_0304).serialize(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);

        let (value, read) = Value::deserialize(&buf, Type::Int).unwrap();
        assert_eq!(value, Value::Int(0x0102_0304));
        assert_eq!(read, 4);
    }

    #[test]
    fn test_negative_int() {
        let mut buf = [0u8; 4];
        Value::Int(-7).serialize(&mut buf).unwrap();
        let (value, _) = Value::deserialize(&buf, Type::Int).unwrap();
        assert_eq!(value, Value::Int(-7));
    }

    #[test]
    fn test_text_layout() {
        let mut buf = vec![0xffu8; Type::Text.byte_len()];
        let written = Value::Text("abc".into()).serialize(&mut buf).unwrap();

        assert_eq!(written, 132);
        assert_eq!(&buf[0..4], &[0, 0, 0, 3]);
        assert_eq!(&buf[4..7], b"abc");
        assert!(buf[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_text_truncated_on_char_boundary() {
        // 127 ASCII bytes followed by a 3-byte character straddling the limit.
        let s = format!("{}{}", "a".repeat(127), "日本");
        let mut buf = vec![0u8; Type::Text.byte_len()];
        Value::Text(s).serialize(&mut buf).unwrap();

        let (value, _) = Value::deserialize(&buf, Type::Text).unwrap();
        assert_eq!(value, Value::Text("a".repeat(127)));
    }

    #[test]
    fn test_text_length_prefix_too_large() {
        let mut buf = vec![0u8; Type::Text.byte_len()];
        buf[0..4].copy_from_slice(&200u32.to_be_bytes());
        assert!(matches!(
            Value::deserialize(&buf, Type::Text),
            Err(SerializationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_text_invalid_utf8() {
        let mut buf = vec![0u8; Type::Text.byte_len()];
        buf[0..4].copy_from_slice(&2u32.to_be_bytes());
        buf[4] = 0xc3;
        buf[5] = 0x28;
        assert!(matches!(
            Value::deserialize(&buf, Type::Text),
            Err(SerializationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buf = [0u8; 3];
        assert_eq!(
            Value::Int(1).serialize(&mut buf),
            Err(SerializationError::BufferTooSmall {
                required: 4,
                available: 3
            })
        );
        assert!(matches!(
            Value::deserialize(&buf, Type::Text),
            Err(SerializationError::BufferTooSmall { required: 132, .. })
        ));
    }

    #[test]
    fn test_default_values() {
        assert_eq!(Type::Int.default_value(), Value::Int(0));
        assert_eq!(Type::Text.default_value(), Value::Text(String::new()));
        assert_eq!(Value::Int(3).data_type(), Type::Int);
        assert_eq!(Value::Text("x".into()).data_type(), Type::Text);
    }
}
