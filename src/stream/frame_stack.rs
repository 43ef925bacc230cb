//! The frame-stack document writer.
//!
//! A [`FrameStack`] owns a stack of [`Slot`]s: slot 0 is the root document
//! stream, every `start_embed` pushes an independent memory-backed slot
//! whose finished bytes become one opaque Bml cell in its parent. Each
//! slot tracks its own structural-frame depth.
//!
//! Every operation is infallible at the call boundary: serialization and
//! resource failures are converted into events on the log channel, so
//! neither the protocol dispatcher nor the HTML transformer needs error
//! handling around individual writes.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDateTime;
use serde_bytes::ByteBuf;

use crate::config::EtlConfig;
use crate::event::{Events, LogKind};
use crate::stream::cell::Cell;
use crate::stream::image;
use crate::stream::writer::DsdxWriter;

/// One embed level: an independent writer target plus its frame depth.
struct Slot {
    out: DsdxWriter,
    frames_open: u32,
}

impl Slot {
    fn unopened() -> Self {
        Self { out: DsdxWriter::unopened(), frames_open: 0 }
    }

    fn embed() -> Self {
        Self { out: DsdxWriter::in_memory(), frames_open: 0 }
    }
}

/// Stack-disciplined writer front-end shared by both producers.
pub struct FrameStack {
    slots: Vec<Slot>,
    config: EtlConfig,
    events: Events,
}

impl FrameStack {
    pub fn new(config: EtlConfig, events: Events) -> Self {
        Self { slots: vec![Slot::unopened()], config, events }
    }

    fn trace(&self, msg: impl Into<String>) {
        self.events.log(LogKind::Trace, msg.into());
    }

    fn status(&self, msg: impl Into<String>) {
        self.events.log(LogKind::Status, msg.into());
    }

    fn error(&self, msg: impl Into<String>) {
        self.events.log(LogKind::Error, msg.into());
    }

    /// Number of live slots (1 = root only).
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Whether the root slot has an output target.
    pub fn is_open(&self) -> bool {
        self.slots[0].out.is_open()
    }

    /// Begin a new document stream named `name` in the configured output
    /// directory. Any prior state is discarded. Returns false when the
    /// output file cannot be created; the open attempt is then aborted.
    pub fn open(&mut self, name: &str) -> bool {
        self.slots.clear();
        self.slots.push(Slot::unopened());

        let path = self.config.out_dir.join(format!("{name}.dsdx"));
        match File::create(&path) {
            Ok(f) => {
                self.status(format!("Created stream {}", path.display()));
                self.slots[0].out = DsdxWriter::to_stream(Box::new(f));
                true
            }
            Err(e) => {
                self.error(format!("open: cannot create {}: {e}", path.display()));
                false
            }
        }
    }

    /// Begin a document stream on an externally provided target. Used by
    /// host shells that manage their own output (and by tests).
    pub fn open_writer(&mut self, out: Box<dyn Write + Send>, label: &str) {
        self.slots.clear();
        self.slots.push(Slot { out: DsdxWriter::to_stream(out), frames_open: 0 });
        self.status(format!("Created stream {label}"));
    }

    /// Finish the stream. Unclosed embeds are reported but never block the
    /// close; the stack is emptied either way.
    pub fn close(&mut self) {
        if self.slots.len() > 1 {
            self.error(format!(
                "close: endEmbed missing from level {}",
                self.slots.len()
            ));
        }
        if let Some(root) = self.slots.first_mut() {
            if let Err(e) = root.out.flush() {
                self.error(format!("close: {e}"));
            }
        }
        self.slots.clear();
        self.slots.push(Slot::unopened());
        self.status("Closing stream");
    }

    /// Append a cell to the top slot, reporting failures on the log
    /// channel.
    fn write_cell(&mut self, name: Option<&str>, value: &Cell) {
        self.trace(format!(
            "WriteCell '{}' ({}) = {}",
            name.unwrap_or_default(),
            value.type_name(),
            value.pretty()
        ));
        let top = self.slots.last_mut().expect("slot stack never empty");
        if let Err(e) = top.out.write_cell(name, value) {
            self.error(format!("writeCell: {e}"));
        }
    }

    pub fn write_str(&mut self, value: &str, name: Option<&str>) {
        self.write_cell(name, &Cell::Str(value.to_owned()));
    }

    pub fn write_html(&mut self, value: &str, name: Option<&str>) {
        self.write_cell(name, &Cell::Html(value.to_owned()));
    }

    pub fn write_int(&mut self, value: i32, name: Option<&str>) {
        self.write_cell(name, &Cell::Int32(value));
    }

    pub fn write_bool(&mut self, value: bool, name: Option<&str>) {
        self.write_cell(name, &Cell::Bool(value));
    }

    pub fn write_char(&mut self, value: u8, name: Option<&str>) {
        self.write_cell(name, &Cell::Char(value));
    }

    pub fn write_real(&mut self, value: f64, name: Option<&str>) {
        self.write_cell(name, &Cell::Real(value));
    }

    pub fn write_date(&mut self, value: NaiveDateTime, name: Option<&str>) {
        self.write_cell(name, &Cell::DateTime(value));
    }

    /// Write the configured clipboard's text. An empty clipboard is
    /// reported and yields an empty string cell.
    pub fn paste_string(&mut self, name: Option<&str>) {
        let text = match self.config.clipboard.text() {
            Some(t) => t,
            None => {
                self.error("pasteString: clipboard has no text");
                String::new()
            }
        };
        self.write_cell(name, &Cell::Str(text));
    }

    /// Load an image file into a PNG cell. Load failure substitutes the
    /// placeholder and reports an error; the cell is written either way.
    /// On success the source file is removed when `delete_afterwards`.
    pub fn load_image(&mut self, path: &str, delete_afterwards: bool, name: Option<&str>) {
        self.trace(format!("LoadImg {path}"));
        let loaded = image::load(Path::new(path));
        let failed = loaded.is_none();
        let img = loaded.unwrap_or_else(image::placeholder);
        self.write_png(name, &img);
        if failed {
            self.error(format!("loadImg: cannot load image file {path}"));
        } else if delete_afterwards {
            if let Err(e) = std::fs::remove_file(path) {
                self.error(format!("loadImg: cannot delete {path}: {e}"));
            }
        }
    }

    /// As [`load_image`](Self::load_image) without deletion, with an
    /// aspect-ratio-preserving downscale when both dimensions are
    /// positive.
    pub fn read_image(&mut self, path: &str, w: i32, h: i32, name: Option<&str>) {
        self.trace(format!("ReadImg {path}"));
        match image::load(Path::new(path)) {
            Some(img) => {
                let img = image::scaled(img, w, h);
                self.write_png(name, &img);
            }
            None => {
                self.write_png(name, &image::placeholder());
                self.error(format!("readImg: cannot load image file {path}"));
            }
        }
    }

    fn write_png(&mut self, name: Option<&str>, img: &image::DynamicImage) {
        match image::to_png(img) {
            Ok(png) => self.write_cell(name, &Cell::Image(ByteBuf::from(png))),
            Err(e) => self.error(format!("writeImage: {e}")),
        }
    }

    /// Open a structural frame in the top slot.
    pub fn start_frame(&mut self, name: Option<&str>) {
        self.trace(format!("StartFrame {}", name.unwrap_or_default()));
        let top = self.slots.last_mut().expect("slot stack never empty");
        match top.out.start_frame(name) {
            Ok(()) => top.frames_open += 1,
            Err(e) => self.error(format!("startFrame: {e}")),
        }
    }

    /// Close the innermost frame of the top slot. An unmatched call is a
    /// reported structural error, not a fault.
    pub fn end_frame(&mut self) {
        self.trace("EndFrame");
        let top = self.slots.last_mut().expect("slot stack never empty");
        if top.frames_open == 0 {
            self.error("endFrame: no open frame");
            return;
        }
        match top.out.end_frame() {
            Ok(()) => top.frames_open -= 1,
            Err(e) => self.error(format!("endFrame: {e}")),
        }
    }

    /// Push a fresh, independent embed level.
    pub fn start_embed(&mut self) {
        self.slots.push(Slot::embed());
        self.trace("StartEmbed");
    }

    /// Pop the top embed level and write its serialized content as one
    /// Bml cell into the parent. Without a matching `start_embed` this is
    /// a reported error and a no-op.
    pub fn end_embed(&mut self, name: Option<&str>) {
        if self.slots.len() <= 1 {
            self.error("endEmbed: startEmbed mismatch");
            return;
        }
        self.trace(format!("EndEmbed {}", name.unwrap_or_default()));
        let slot = self.slots.pop().expect("checked above");
        let bytes = slot.out.into_bytes().unwrap_or_default();
        self.write_cell(name, &Cell::Bml(ByteBuf::from(bytes)));
    }
}
