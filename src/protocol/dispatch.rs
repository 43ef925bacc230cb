//! Command dispatcher: one decoded command, one FrameStack operation.
//!
//! The match is exhaustive over [`Command`]; malformed input never reaches
//! this layer because the decoder halts on any coercion failure.

use super::command::Command;
use crate::stream::FrameStack;

/// Executes decoded commands against one [`FrameStack`] instance.
pub struct Dispatcher {
    agent: FrameStack,
}

impl Dispatcher {
    pub fn new(agent: FrameStack) -> Self {
        Self { agent }
    }

    /// Access the underlying frame stack.
    pub fn agent(&self) -> &FrameStack {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut FrameStack {
        &mut self.agent
    }

    /// Execute one command. Execution failures are absorbed by the
    /// FrameStack and reported on its log channel.
    pub fn execute(&mut self, cmd: Command) {
        let a = &mut self.agent;
        match cmd {
            Command::OpenStream(name) => {
                a.open(&name);
            }
            Command::CloseStream => a.close(),
            Command::StringVal(v) => a.write_str(&v, None),
            Command::StringValName(v, n) => a.write_str(&v, Some(&n)),
            Command::IntVal(v) => a.write_int(v, None),
            Command::IntValName(v, n) => a.write_int(v, Some(&n)),
            Command::BoolVal(v) => a.write_bool(v, None),
            Command::BoolValName(v, n) => a.write_bool(v, Some(&n)),
            Command::CharVal(v) => a.write_char(v, None),
            Command::CharValName(v, n) => a.write_char(v, Some(&n)),
            Command::RealVal(v) => a.write_real(v, None),
            Command::RealValName(v, n) => a.write_real(v, Some(&n)),
            Command::DateVal(v) => a.write_date(v, None),
            Command::DateValName(v, n) => a.write_date(v, Some(&n)),
            Command::LoadImg { path, delete } => a.load_image(&path, delete, None),
            Command::LoadImgName { path, delete, name } => {
                a.load_image(&path, delete, Some(&name))
            }
            Command::StartFrame => a.start_frame(None),
            Command::StartFrameName(n) => a.start_frame(Some(&n)),
            Command::EndFrame => a.end_frame(),
            Command::StartEmbed => a.start_embed(),
            Command::EndEmbed => a.end_embed(None),
            Command::EndEmbedName(n) => a.end_embed(Some(&n)),
            Command::PasteString => a.paste_string(None),
            Command::PasteStringName(n) => a.paste_string(Some(&n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EtlConfig;
    use crate::event::MemorySink;
    use crate::protocol::Decoder;
    use crate::stream::cell::{Cell, Record};
    use crate::stream::writer::read_records;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    struct Shared(Arc<Mutex<Vec<u8>>>);
    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<Mutex<Vec<u8>>>) {
        let sink = Arc::new(MemorySink::new());
        let mut agent = FrameStack::new(EtlConfig::new("."), sink);
        let target = Arc::new(Mutex::new(Vec::new()));
        agent.open_writer(Box::new(Shared(target.clone())), "test");
        (Dispatcher::new(agent), target)
    }

    fn run(input: &[u8]) -> Vec<Record> {
        let (mut d, target) = dispatcher();
        for cmd in Decoder::new().push(input).unwrap() {
            d.execute(cmd);
        }
        let bytes = target.lock().unwrap().clone();
        read_records(&bytes).unwrap()
    }

    #[test]
    fn test_typed_writes_land_in_order() {
        let recs = run(b"3|5|hello|4|Name|5|42|3|num|7|1|3|yes|9|k|3|chr|11|2.5|4|real|");
        assert_eq!(
            recs,
            vec![
                Record::Cell { name: Some("Name".into()), value: Cell::Str("hello".into()) },
                Record::Cell { name: Some("num".into()), value: Cell::Int32(42) },
                Record::Cell { name: Some("yes".into()), value: Cell::Bool(true) },
                Record::Cell { name: Some("chr".into()), value: Cell::Char(b'k') },
                Record::Cell { name: Some("real".into()), value: Cell::Real(2.5) },
            ]
        );
    }

    #[test]
    fn test_unnamed_variants_write_positional_cells() {
        let recs = run(b"2|2|hi|4|7|");
        assert_eq!(
            recs,
            vec![
                Record::Cell { name: None, value: Cell::Str("hi".into()) },
                Record::Cell { name: None, value: Cell::Int32(7) },
            ]
        );
    }

    #[test]
    fn test_frames_and_embeds() {
        let recs = run(b"17|3|par|18|19|2|5|inner|21|1|x|");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0], Record::BeginFrame { name: Some("par".into()) });
        assert_eq!(recs[1], Record::EndFrame);
        let Record::Cell { name: Some(n), value: Cell::Bml(b) } = &recs[2] else {
            panic!("expected Bml cell, got {recs:?}");
        };
        assert_eq!(n, "x");
        assert_eq!(read_records(b).unwrap().len(), 1);
    }

    #[test]
    fn test_date_dispatch() {
        let recs = run(b"13|10|2009-02-21|4|when|");
        let Record::Cell { name: Some(n), value: Cell::DateTime(dt) } = &recs[0] else {
            panic!();
        };
        assert_eq!(n, "when");
        assert_eq!(dt.to_string(), "2009-02-21 00:00:00");
    }
}
