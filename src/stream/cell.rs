//! Typed cell values and the records that make up a document stream.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;

/// One typed value written into a document stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// Plain text.
    Str(String),
    Int32(i32),
    Bool(bool),
    /// Single byte, used for format tags among other things.
    Char(u8),
    Real(f64),
    DateTime(NaiveDateTime),
    /// PNG-encoded image bytes.
    Image(ByteBuf),
    /// Literal HTML fragment.
    Html(String),
    /// An embedded sub-document, opaque to the container.
    Bml(ByteBuf),
}

impl Cell {
    /// Name of the value's type, for trace output.
    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Str(_) => "Str",
            Cell::Int32(_) => "Int32",
            Cell::Bool(_) => "Bool",
            Cell::Char(_) => "Char",
            Cell::Real(_) => "Real",
            Cell::DateTime(_) => "DateTime",
            Cell::Image(_) => "Image",
            Cell::Html(_) => "Html",
            Cell::Bml(_) => "Bml",
        }
    }

    /// Short human-readable rendering for trace output; binary payloads
    /// show their length only.
    pub fn pretty(&self) -> String {
        match self {
            Cell::Str(s) | Cell::Html(s) => format!("{s:?}"),
            Cell::Int32(v) => v.to_string(),
            Cell::Bool(v) => v.to_string(),
            Cell::Char(c) => format!("{:?}", char::from(*c)),
            Cell::Real(v) => v.to_string(),
            Cell::DateTime(dt) => dt.to_string(),
            Cell::Image(b) => format!("<image {} bytes>", b.len()),
            Cell::Bml(b) => format!("<bml {} bytes>", b.len()),
        }
    }
}

/// One record of the serialized stream: a cell or a structural marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Cell {
        name: Option<String>,
        value: Cell,
    },
    BeginFrame {
        name: Option<String>,
    },
    EndFrame,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_hides_binary_payloads() {
        let img = Cell::Image(ByteBuf::from(vec![0u8; 128]));
        assert_eq!(img.pretty(), "<image 128 bytes>");
        assert_eq!(Cell::Str("x".into()).pretty(), "\"x\"");
    }
}
