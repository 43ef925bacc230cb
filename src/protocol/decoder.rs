//! Incremental decoder for the pipe-delimited command protocol.
//!
//! Wire shape: `<code>|[<len>|]<value>|[<len>|]<value>|...` where string and
//! date parameters announce their length and the rest terminate at the next
//! `|`. The decoder is a byte-at-a-time state machine:
//! - `Idle`: skip spaces between commands
//! - `ReadingCode`: accumulate the command code
//! - `ReadingLength`: accumulate the declared count of a string-like value
//! - `ReadingValue`: accumulate the value itself (counted or delimited)
//!
//! It never looks ahead past the current byte and tolerates arbitrary
//! chunking, so the connection loop can push whatever a socket read
//! returned. One decoder exists per connection; after any decode error it
//! is terminal and rejects further input.

use bytes::BytesMut;

use super::command::{coerce, spec, Command, CommandSpec, Value};
use crate::error::ProtocolError;

/// Counting basis for length-prefixed values.
///
/// The scripting side historically declared character counts while the
/// receiver counted raw bytes; which basis a given producer uses is now an
/// explicit choice instead of an accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum LengthUnit {
    /// One count unit per raw byte consumed.
    #[default]
    Bytes,
    /// One count unit per decoded character (UTF-8 start byte).
    Chars,
}

const BAR: u8 = b'|';

/// Is this byte a UTF-8 continuation byte?
#[inline]
fn is_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    ReadingCode,
    ReadingLength,
    /// `counted` distinguishes length-prefixed values from delimited ones.
    ReadingValue { counted: bool },
    /// A decode error closed this decoder.
    Failed,
}

/// Per-connection incremental protocol decoder.
pub struct Decoder {
    state: State,
    /// Scratch buffer for the token being accumulated.
    buf: BytesMut,
    /// Table entry of the command being decoded.
    current: Option<&'static CommandSpec>,
    /// Index of the parameter being read.
    param: usize,
    /// Remaining count units for a length-prefixed value.
    remaining: u32,
    /// Parameters collected so far.
    values: Vec<Value>,
    unit: LengthUnit,
}

impl Decoder {
    /// Decoder counting length prefixes in bytes (the default wire basis).
    pub fn new() -> Self {
        Self::with_length_unit(LengthUnit::Bytes)
    }

    /// Decoder with an explicit counting basis.
    pub fn with_length_unit(unit: LengthUnit) -> Self {
        Self {
            state: State::Idle,
            buf: BytesMut::with_capacity(256),
            current: None,
            param: 0,
            remaining: 0,
            values: Vec::with_capacity(3),
            unit,
        }
    }

    /// True once a decode error has closed this decoder.
    pub fn is_halted(&self) -> bool {
        self.state == State::Failed
    }

    /// Feed a chunk and collect every command completed by it.
    ///
    /// On error the decoder halts; bytes after the error are not consumed.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Command>, ProtocolError> {
        let mut out = Vec::new();
        for &b in data {
            if let Some(cmd) = self.feed(b)? {
                out.push(cmd);
            }
        }
        Ok(out)
    }

    /// Feed one byte; yields a command when the byte completes one.
    pub fn feed(&mut self, b: u8) -> Result<Option<Command>, ProtocolError> {
        match self.fail_on_err(b) {
            Ok(cmd) => Ok(cmd),
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    fn fail_on_err(&mut self, b: u8) -> Result<Option<Command>, ProtocolError> {
        match self.state {
            State::Failed => Err(ProtocolError::Halted),
            State::Idle => {
                if b != b' ' {
                    self.buf.clear();
                    self.buf.extend_from_slice(&[b]);
                    self.state = State::ReadingCode;
                }
                Ok(None)
            }
            State::ReadingCode => {
                if b != BAR {
                    self.buf.extend_from_slice(&[b]);
                    return Ok(None);
                }
                let text = String::from_utf8_lossy(&self.buf).into_owned();
                let code: u32 = text
                    .parse()
                    .map_err(|_| ProtocolError::InvalidCommand(text.clone()))?;
                let spec = spec(code).ok_or(ProtocolError::InvalidCommand(text))?;
                self.current = Some(spec);
                self.values.clear();
                if spec.arity() == 0 {
                    self.state = State::Idle;
                    return Ok(Some(Command::assemble(spec.code, &mut self.values)));
                }
                self.param = 0;
                self.begin_param();
                Ok(None)
            }
            State::ReadingLength => {
                if b != BAR {
                    self.buf.extend_from_slice(&[b]);
                    return Ok(None);
                }
                let text = String::from_utf8_lossy(&self.buf).into_owned();
                self.remaining = text
                    .parse()
                    .map_err(|_| ProtocolError::InvalidLength(text))?;
                self.buf.clear();
                self.state = State::ReadingValue { counted: true };
                Ok(None)
            }
            State::ReadingValue { counted: false } => {
                if b != BAR {
                    self.buf.extend_from_slice(&[b]);
                    Ok(None)
                } else {
                    self.finish_param()
                }
            }
            State::ReadingValue { counted: true } => {
                if self.remaining > 0 {
                    self.buf.extend_from_slice(&[b]);
                    let consumed = match self.unit {
                        LengthUnit::Bytes => 1,
                        // A character is counted once, at its start byte.
                        LengthUnit::Chars => u32::from(!is_continuation(b)),
                    };
                    self.remaining -= consumed.min(self.remaining);
                    Ok(None)
                } else if self.unit == LengthUnit::Chars
                    && is_continuation(b)
                    && !self.buf.is_empty()
                {
                    // Trailing continuation bytes of the final character.
                    self.buf.extend_from_slice(&[b]);
                    Ok(None)
                } else if b != BAR {
                    Err(ProtocolError::ExpectedTerminator(
                        String::from_utf8_lossy(&self.buf).into_owned(),
                    ))
                } else {
                    self.finish_param()
                }
            }
        }
    }

    /// Set up the scratch state for the parameter at `self.param`.
    fn begin_param(&mut self) {
        let spec = self.current.expect("begin_param without a command");
        self.buf.clear();
        if spec.params[self.param].has_length() {
            self.state = State::ReadingLength;
        } else {
            self.state = State::ReadingValue { counted: false };
        }
    }

    /// Coerce the accumulated value, then either advance to the next
    /// parameter or assemble and yield the command.
    fn finish_param(&mut self) -> Result<Option<Command>, ProtocolError> {
        let spec = self.current.expect("finish_param without a command");
        let value = coerce(spec.params[self.param], &self.buf)?;
        self.values.push(value);
        self.param += 1;
        if self.param >= spec.arity() {
            self.state = State::Idle;
            Ok(Some(Command::assemble(spec.code, &mut self.values)))
        } else {
            self.begin_param();
            Ok(None)
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> Vec<Command> {
        Decoder::new().push(input).unwrap()
    }

    #[test]
    fn test_zero_param_command() {
        let cmds = decode_all(b"1|");
        assert_eq!(cmds, vec![Command::CloseStream]);
    }

    #[test]
    fn test_length_prefixed_string() {
        let cmds = decode_all(b"2|5|hello|");
        assert_eq!(cmds, vec![Command::StringVal("hello".into())]);
    }

    #[test]
    fn test_empty_string_value() {
        let cmds = decode_all(b"2|0||");
        assert_eq!(cmds, vec![Command::StringVal(String::new())]);
    }

    #[test]
    fn test_two_string_params() {
        let cmds = decode_all(b"3|5|value|4|name|");
        assert_eq!(
            cmds,
            vec![Command::StringValName("value".into(), "name".into())]
        );
    }

    #[test]
    fn test_delimited_params() {
        let cmds = decode_all(b"4|-17|");
        assert_eq!(cmds, vec![Command::IntVal(-17)]);

        let cmds = decode_all(b"10|3.25|");
        assert_eq!(cmds, vec![Command::RealVal(3.25)]);

        let cmds = decode_all(b"6|1|");
        assert_eq!(cmds, vec![Command::BoolVal(true)]);

        let cmds = decode_all(b"8|x|");
        assert_eq!(cmds, vec![Command::CharVal(b'x')]);
    }

    #[test]
    fn test_three_param_command() {
        let cmds = decode_all(b"15|7|img.png|0|3|ole|");
        assert_eq!(
            cmds,
            vec![Command::LoadImgName {
                path: "img.png".into(),
                delete: false,
                name: "ole".into()
            }]
        );
    }

    #[test]
    fn test_spaces_between_commands_skipped() {
        let cmds = decode_all(b"  16|  18|   1|");
        assert_eq!(
            cmds,
            vec![Command::StartFrame, Command::EndFrame, Command::CloseStream]
        );
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut dec = Decoder::new();
        let input = b"0|4|spec|2|5|hello|1|";
        let mut cmds = Vec::new();
        for &b in input.iter() {
            if let Some(c) = dec.feed(b).unwrap() {
                cmds.push(c);
            }
        }
        assert_eq!(
            cmds,
            vec![
                Command::OpenStream("spec".into()),
                Command::StringVal("hello".into()),
                Command::CloseStream,
            ]
        );
    }

    #[test]
    fn test_arbitrary_chunking() {
        let input = b"3|5|value|4|name|";
        for split in 1..input.len() {
            let mut dec = Decoder::new();
            let mut cmds = dec.push(&input[..split]).unwrap();
            cmds.extend(dec.push(&input[split..]).unwrap());
            assert_eq!(cmds.len(), 1, "split at {split}");
        }
    }

    #[test]
    fn test_invalid_command_code() {
        let mut dec = Decoder::new();
        let err = dec.push(b"99|").unwrap_err();
        assert_eq!(err, ProtocolError::InvalidCommand("99".into()));
        assert!(dec.is_halted());
        // Nothing more is accepted.
        assert_eq!(dec.push(b"1|").unwrap_err(), ProtocolError::Halted);
    }

    #[test]
    fn test_non_numeric_command_code() {
        let err = Decoder::new().push(b"abc|").unwrap_err();
        assert_eq!(err, ProtocolError::InvalidCommand("abc".into()));
    }

    #[test]
    fn test_invalid_length() {
        let err = Decoder::new().push(b"2|x|").unwrap_err();
        assert_eq!(err, ProtocolError::InvalidLength("x".into()));
    }

    #[test]
    fn test_length_mismatch_never_misaligns() {
        // Declared 3 but the value runs longer; the byte where the
        // terminator was expected raises instead of sliding the stream.
        let err = Decoder::new().push(b"2|3|hello|").unwrap_err();
        assert_eq!(err, ProtocolError::ExpectedTerminator("hel".into()));
    }

    #[test]
    fn test_invalid_bool_and_char() {
        let err = Decoder::new().push(b"6|2|").unwrap_err();
        assert_eq!(err, ProtocolError::InvalidBool("2".into()));

        let err = Decoder::new().push(b"8|xy|").unwrap_err();
        assert_eq!(err, ProtocolError::InvalidChar("xy".into()));
    }

    #[test]
    fn test_invalid_date() {
        let err = Decoder::new().push(b"12|10|21.02.2009|").unwrap_err();
        assert_eq!(err, ProtocolError::InvalidDate("21.02.2009".into()));
    }

    #[test]
    fn test_date_command() {
        let cmds = decode_all(b"12|19|2009-02-21 14:23:12|");
        let [Command::DateVal(dt)] = cmds.as_slice() else {
            panic!("expected DateVal, got {cmds:?}");
        };
        assert_eq!(dt.to_string(), "2009-02-21 14:23:12");
    }

    #[test]
    fn test_byte_counted_multibyte_value() {
        // "héllo" is 6 bytes / 5 chars. Byte basis wants the byte count.
        let input = "2|6|héllo|".as_bytes();
        let cmds = decode_all(input);
        assert_eq!(cmds, vec![Command::StringVal("héllo".into())]);
    }

    #[test]
    fn test_char_counted_multibyte_value() {
        let mut dec = Decoder::with_length_unit(LengthUnit::Chars);
        let cmds = dec.push("2|5|héllo|".as_bytes()).unwrap();
        assert_eq!(cmds, vec![Command::StringVal("héllo".into())]);
    }

    #[test]
    fn test_char_counted_trailing_multibyte() {
        let mut dec = Decoder::with_length_unit(LengthUnit::Chars);
        // The final character's continuation byte arrives after the
        // counter reaches zero and must still be consumed.
        let cmds = dec.push("2|5|hellö|".as_bytes()).unwrap();
        assert_eq!(cmds, vec![Command::StringVal("hellö".into())]);
    }
}
