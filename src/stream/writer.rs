//! Document stream writer.
//!
//! Appends [`Record`]s to an output target. The byte layout is owned
//! entirely by this module: each record is one MessagePack value encoded
//! with `rmp_serde::encode::write_named` (struct-as-map, so the stream
//! stays self-describing for outside consumers), records simply
//! concatenated.
//! Nothing outside this module interprets the bytes.

use std::io::Write;

use crate::error::Result;
use crate::stream::cell::{Cell, Record};

/// Output target of one writer.
enum Sink {
    /// No `open` happened yet; every write fails.
    Unopened,
    /// Root document stream.
    Stream(Box<dyn Write + Send>),
    /// Embed level, buffered so the finished bytes become a Bml cell.
    Memory(Vec<u8>),
}

/// Serializer for one document stream or embed level.
pub struct DsdxWriter {
    sink: Sink,
}

impl DsdxWriter {
    /// Writer with no target; used for the root slot before `open`.
    pub fn unopened() -> Self {
        Self { sink: Sink::Unopened }
    }

    /// Writer appending to an externally created target.
    pub fn to_stream(out: Box<dyn Write + Send>) -> Self {
        Self { sink: Sink::Stream(out) }
    }

    /// Memory-backed writer for an embed level.
    pub fn in_memory() -> Self {
        Self { sink: Sink::Memory(Vec::new()) }
    }

    /// Whether this writer has a live target.
    pub fn is_open(&self) -> bool {
        !matches!(self.sink, Sink::Unopened)
    }

    fn write_record(&mut self, record: &Record) -> Result<()> {
        match &mut self.sink {
            Sink::Unopened => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no open stream",
            )
            .into()),
            Sink::Stream(out) => {
                rmp_serde::encode::write_named(out, record)?;
                Ok(())
            }
            Sink::Memory(buf) => {
                rmp_serde::encode::write_named(buf, record)?;
                Ok(())
            }
        }
    }

    /// Append a named or positional cell.
    pub fn write_cell(&mut self, name: Option<&str>, value: &Cell) -> Result<()> {
        self.write_record(&Record::Cell {
            name: name.map(str::to_owned),
            value: value.clone(),
        })
    }

    /// Open a structural frame.
    pub fn start_frame(&mut self, name: Option<&str>) -> Result<()> {
        self.write_record(&Record::BeginFrame {
            name: name.map(str::to_owned),
        })
    }

    /// Close the innermost structural frame.
    pub fn end_frame(&mut self) -> Result<()> {
        self.write_record(&Record::EndFrame)
    }

    /// Flush a stream-backed target.
    pub fn flush(&mut self) -> Result<()> {
        if let Sink::Stream(out) = &mut self.sink {
            out.flush()?;
        }
        Ok(())
    }

    /// Consume a memory-backed writer, yielding the serialized bytes.
    /// Returns `None` for stream-backed or unopened writers.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self.sink {
            Sink::Memory(buf) => Some(buf),
            _ => None,
        }
    }
}

/// Decode a finished stream back into records.
///
/// Consumers of `.dsdx` files use this; tests use it to assert on
/// document structure.
pub fn read_records(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut cursor = std::io::Cursor::new(bytes);
    let mut records = Vec::new();
    while (cursor.position() as usize) < bytes.len() {
        let mut de = rmp_serde::Deserializer::new(&mut cursor);
        records.push(serde::Deserialize::deserialize(&mut de)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unopened_writer_rejects_writes() {
        let mut w = DsdxWriter::unopened();
        assert!(!w.is_open());
        assert!(w.write_cell(None, &Cell::Bool(true)).is_err());
    }

    #[test]
    fn test_memory_roundtrip() {
        let mut w = DsdxWriter::in_memory();
        w.start_frame(Some("obj")).unwrap();
        w.write_cell(Some("Absolute Number"), &Cell::Int32(1)).unwrap();
        w.write_cell(None, &Cell::Str("hello".into())).unwrap();
        w.end_frame().unwrap();

        let bytes = w.into_bytes().unwrap();
        let records = read_records(&bytes).unwrap();
        assert_eq!(
            records,
            vec![
                Record::BeginFrame { name: Some("obj".into()) },
                Record::Cell {
                    name: Some("Absolute Number".into()),
                    value: Cell::Int32(1)
                },
                Record::Cell { name: None, value: Cell::Str("hello".into()) },
                Record::EndFrame,
            ]
        );
    }

    #[test]
    fn test_stream_sink_writes_through() {
        // A shared Vec behind a writer adapter stands in for the file.
        struct Shared(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let target = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut w = DsdxWriter::to_stream(Box::new(Shared(target.clone())));
        w.write_cell(Some("Name"), &Cell::Str("doc".into())).unwrap();
        w.flush().unwrap();

        let bytes = target.lock().unwrap().clone();
        let records = read_records(&bytes).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_empty_memory_stream_yields_no_records() {
        let w = DsdxWriter::in_memory();
        let bytes = w.into_bytes().unwrap();
        assert!(read_records(&bytes).unwrap().is_empty());
    }
}
