//! Command table and typed command values.
//!
//! The wire protocol identifies each operation by a small integer code
//! (0–23). The static [`TABLE`] gives the decoder the parameter kinds it
//! must read for each code; once all parameters are in, they are assembled
//! into one [`Command`] variant so downstream code matches exhaustively
//! instead of indexing by integer.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ProtocolError;

/// Highest valid command code.
pub const MAX_COMMAND: u32 = 23;

/// Maximum parameters any command takes.
pub const MAX_PARAMS: usize = 3;

/// Kind of a single wire parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    None,
    /// Length-prefixed UTF-8 text.
    Str,
    /// Delimiter-terminated signed decimal.
    Int,
    /// Delimiter-terminated single byte.
    Char,
    /// Delimiter-terminated "0" or "1".
    Bool,
    /// Delimiter-terminated decimal float.
    Real,
    /// Length-prefixed date text.
    Date,
}

impl ParamKind {
    /// Length-prefixed kinds carry a decimal count before the value.
    pub fn has_length(self) -> bool {
        matches!(self, ParamKind::Str | ParamKind::Date)
    }
}

/// One entry of the static command table.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub code: u32,
    pub name: &'static str,
    pub params: [ParamKind; MAX_PARAMS],
}

impl CommandSpec {
    /// Number of parameters before the first `None`.
    pub fn arity(&self) -> usize {
        self.params.iter().take_while(|k| **k != ParamKind::None).count()
    }
}

use ParamKind::{Bool, Char, Date, Int, None as PNone, Real, Str};

/// The full, fixed command table. Index = wire code.
pub static TABLE: [CommandSpec; 24] = [
    CommandSpec { code: 0, name: "OpenStream", params: [Str, PNone, PNone] },
    CommandSpec { code: 1, name: "CloseStream", params: [PNone, PNone, PNone] },
    CommandSpec { code: 2, name: "StringVal", params: [Str, PNone, PNone] },
    CommandSpec { code: 3, name: "StringValName", params: [Str, Str, PNone] },
    CommandSpec { code: 4, name: "IntVal", params: [Int, PNone, PNone] },
    CommandSpec { code: 5, name: "IntValName", params: [Int, Str, PNone] },
    CommandSpec { code: 6, name: "BoolVal", params: [Bool, PNone, PNone] },
    CommandSpec { code: 7, name: "BoolValName", params: [Bool, Str, PNone] },
    CommandSpec { code: 8, name: "CharVal", params: [Char, PNone, PNone] },
    CommandSpec { code: 9, name: "CharValName", params: [Char, Str, PNone] },
    CommandSpec { code: 10, name: "RealVal", params: [Real, PNone, PNone] },
    CommandSpec { code: 11, name: "RealValName", params: [Real, Str, PNone] },
    CommandSpec { code: 12, name: "DateVal", params: [Date, PNone, PNone] },
    CommandSpec { code: 13, name: "DateValName", params: [Date, Str, PNone] },
    CommandSpec { code: 14, name: "LoadImg", params: [Str, Bool, PNone] },
    CommandSpec { code: 15, name: "LoadImgName", params: [Str, Bool, Str] },
    CommandSpec { code: 16, name: "StartFrame", params: [PNone, PNone, PNone] },
    CommandSpec { code: 17, name: "StartFrameName", params: [Str, PNone, PNone] },
    CommandSpec { code: 18, name: "EndFrame", params: [PNone, PNone, PNone] },
    CommandSpec { code: 19, name: "StartEmbed", params: [PNone, PNone, PNone] },
    CommandSpec { code: 20, name: "EndEmbed", params: [PNone, PNone, PNone] },
    CommandSpec { code: 21, name: "EndEmbedName", params: [Str, PNone, PNone] },
    CommandSpec { code: 22, name: "PasteString", params: [PNone, PNone, PNone] },
    CommandSpec { code: 23, name: "PasteStringName", params: [Str, PNone, PNone] },
];

/// Look up a command spec by wire code.
pub fn spec(code: u32) -> Option<&'static CommandSpec> {
    TABLE.get(code as usize)
}

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i32),
    Char(u8),
    Bool(bool),
    Real(f64),
    Date(NaiveDateTime),
}

/// Coerce accumulated raw bytes into a [`Value`] of the given kind.
///
/// Matches the wire contract: strings are plain UTF-8, bools are exactly
/// "0"/"1", chars exactly one byte, dates one of three fixed formats.
pub fn coerce(kind: ParamKind, raw: &[u8]) -> Result<Value, ProtocolError> {
    let lossy = || String::from_utf8_lossy(raw).into_owned();
    match kind {
        ParamKind::Str | ParamKind::Date => {
            let text = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidString)?;
            if kind == ParamKind::Str {
                Ok(Value::Str(text.to_owned()))
            } else {
                parse_date(text)
                    .map(Value::Date)
                    .ok_or_else(|| ProtocolError::InvalidDate(text.to_owned()))
            }
        }
        ParamKind::Int => {
            let text = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidInteger(lossy()))?;
            text.parse::<i32>()
                .map(Value::Int)
                .map_err(|_| ProtocolError::InvalidInteger(text.to_owned()))
        }
        ParamKind::Char => {
            if raw.len() == 1 {
                Ok(Value::Char(raw[0]))
            } else {
                Err(ProtocolError::InvalidChar(lossy()))
            }
        }
        ParamKind::Bool => match raw {
            b"0" => Ok(Value::Bool(false)),
            b"1" => Ok(Value::Bool(true)),
            _ => Err(ProtocolError::InvalidBool(lossy())),
        },
        ParamKind::Real => {
            let text = std::str::from_utf8(raw).map_err(|_| ProtocolError::InvalidReal(lossy()))?;
            text.parse::<f64>()
                .map(Value::Real)
                .map_err(|_| ProtocolError::InvalidReal(text.to_owned()))
        }
        ParamKind::None => unreachable!("ParamKind::None is never read from the wire"),
    }
}

/// Parse the three date shapes the scripting side can produce:
/// `yyyy-MM-dd h:m:s`, `yyyy-MM-dd`, `h:m:s`. Time-only values anchor to
/// 1900-01-01, matching the legacy exporter.
fn parse_date(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(t) = chrono::NaiveTime::parse_from_str(text, "%H:%M:%S") {
        return Some(NaiveDate::from_ymd_opt(1900, 1, 1)?.and_time(t));
    }
    None
}

/// A fully decoded protocol command.
///
/// One variant per wire code, payloads already typed. The dispatcher
/// matches this exhaustively; adding a command is a compile-time exercise.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    OpenStream(String),
    CloseStream,
    StringVal(String),
    StringValName(String, String),
    IntVal(i32),
    IntValName(i32, String),
    BoolVal(bool),
    BoolValName(bool, String),
    CharVal(u8),
    CharValName(u8, String),
    RealVal(f64),
    RealValName(f64, String),
    DateVal(NaiveDateTime),
    DateValName(NaiveDateTime, String),
    LoadImg { path: String, delete: bool },
    LoadImgName { path: String, delete: bool, name: String },
    StartFrame,
    StartFrameName(String),
    EndFrame,
    StartEmbed,
    EndEmbed,
    EndEmbedName(String),
    PasteString,
    PasteStringName(String),
}

impl Command {
    /// Assemble a typed command from a wire code and its coerced values.
    ///
    /// The decoder guarantees `values` matches the table entry for `code`,
    /// so mismatches here are internal bugs, not wire errors.
    pub(crate) fn assemble(code: u32, values: &mut Vec<Value>) -> Command {
        let mut take = values.drain(..);
        macro_rules! s {
            () => {
                match take.next() {
                    Some(Value::Str(v)) => v,
                    other => unreachable!("table/value mismatch: {other:?}"),
                }
            };
        }
        macro_rules! v {
            ($variant:ident) => {
                match take.next() {
                    Some(Value::$variant(v)) => v,
                    other => unreachable!("table/value mismatch: {other:?}"),
                }
            };
        }
        match code {
            0 => Command::OpenStream(s!()),
            1 => Command::CloseStream,
            2 => Command::StringVal(s!()),
            3 => Command::StringValName(s!(), s!()),
            4 => Command::IntVal(v!(Int)),
            5 => Command::IntValName(v!(Int), s!()),
            6 => Command::BoolVal(v!(Bool)),
            7 => Command::BoolValName(v!(Bool), s!()),
            8 => Command::CharVal(v!(Char)),
            9 => Command::CharValName(v!(Char), s!()),
            10 => Command::RealVal(v!(Real)),
            11 => Command::RealValName(v!(Real), s!()),
            12 => Command::DateVal(v!(Date)),
            13 => Command::DateValName(v!(Date), s!()),
            14 => Command::LoadImg { path: s!(), delete: v!(Bool) },
            15 => Command::LoadImgName { path: s!(), delete: v!(Bool), name: s!() },
            16 => Command::StartFrame,
            17 => Command::StartFrameName(s!()),
            18 => Command::EndFrame,
            19 => Command::StartEmbed,
            20 => Command::EndEmbed,
            21 => Command::EndEmbedName(s!()),
            22 => Command::PasteString,
            23 => Command::PasteStringName(s!()),
            other => unreachable!("command code {other} passed validation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_exhaustive_and_ordered() {
        assert_eq!(TABLE.len(), MAX_COMMAND as usize + 1);
        for (i, entry) in TABLE.iter().enumerate() {
            assert_eq!(entry.code as usize, i);
        }
        assert_eq!(TABLE[15].arity(), 3);
        assert_eq!(TABLE[1].arity(), 0);
    }

    #[test]
    fn test_coerce_bool_strict() {
        assert_eq!(coerce(ParamKind::Bool, b"0").unwrap(), Value::Bool(false));
        assert_eq!(coerce(ParamKind::Bool, b"1").unwrap(), Value::Bool(true));
        assert!(matches!(
            coerce(ParamKind::Bool, b"true"),
            Err(ProtocolError::InvalidBool(_))
        ));
    }

    #[test]
    fn test_coerce_char_exactly_one_byte() {
        assert_eq!(coerce(ParamKind::Char, b"x").unwrap(), Value::Char(b'x'));
        assert!(matches!(
            coerce(ParamKind::Char, b"xy"),
            Err(ProtocolError::InvalidChar(_))
        ));
        assert!(matches!(
            coerce(ParamKind::Char, b""),
            Err(ProtocolError::InvalidChar(_))
        ));
    }

    #[test]
    fn test_coerce_int_signed() {
        assert_eq!(coerce(ParamKind::Int, b"-42").unwrap(), Value::Int(-42));
        assert!(matches!(
            coerce(ParamKind::Int, b"4.2"),
            Err(ProtocolError::InvalidInteger(_))
        ));
    }

    #[test]
    fn test_coerce_date_three_formats() {
        let full = coerce(ParamKind::Date, b"2009-02-21 14:23:12").unwrap();
        let Value::Date(dt) = full else { panic!() };
        assert_eq!(dt.to_string(), "2009-02-21 14:23:12");

        let date_only = coerce(ParamKind::Date, b"2009-02-21").unwrap();
        let Value::Date(dt) = date_only else { panic!() };
        assert_eq!(dt.to_string(), "2009-02-21 00:00:00");

        let time_only = coerce(ParamKind::Date, b"14:23:12").unwrap();
        let Value::Date(dt) = time_only else { panic!() };
        assert_eq!(dt.to_string(), "1900-01-01 14:23:12");

        assert!(matches!(
            coerce(ParamKind::Date, b"21.02.2009"),
            Err(ProtocolError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_assemble_three_param_command() {
        let mut values = vec![
            Value::Str("img.png".into()),
            Value::Bool(true),
            Value::Str("pic".into()),
        ];
        let cmd = Command::assemble(15, &mut values);
        assert_eq!(
            cmd,
            Command::LoadImgName {
                path: "img.png".into(),
                delete: true,
                name: "pic".into()
            }
        );
        assert!(values.is_empty());
    }
}
