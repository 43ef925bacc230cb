//! Explicit configuration for the ETL pipelines.
//!
//! Everything the original tool looked up from ambient settings (output
//! directory, listen port) or global process state (the clipboard) is
//! modeled here as a value passed into the entry points.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::LengthUnit;

/// Default listen port for the scripting-side producer.
pub const DEFAULT_PORT: u16 = 5093;

/// Source of clipboard text for the `PasteString` commands.
///
/// The core never touches a real clipboard; the host shell decides what
/// this resolves to.
pub trait Clipboard: Send + Sync {
    /// Current clipboard text, if any.
    fn text(&self) -> Option<String>;
}

/// Clipboard that always holds the same text. Host shells without clipboard
/// access use `StaticClipboard::empty()`.
#[derive(Debug, Clone, Default)]
pub struct StaticClipboard(pub Option<String>);

impl StaticClipboard {
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self(Some(text.into()))
    }
}

impl Clipboard for StaticClipboard {
    fn text(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Configuration shared by both producers.
#[derive(Clone)]
pub struct EtlConfig {
    /// Directory the `.dsdx` output files are created in.
    pub out_dir: PathBuf,
    /// Counting basis for length-prefixed wire parameters.
    pub length_unit: LengthUnit,
    /// Clipboard backing the paste commands.
    pub clipboard: Arc<dyn Clipboard>,
}

impl EtlConfig {
    /// Config writing into `out_dir` with default wire semantics and no
    /// clipboard.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            length_unit: LengthUnit::Bytes,
            clipboard: Arc::new(StaticClipboard::empty()),
        }
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_length_unit(mut self, unit: LengthUnit) -> Self {
        self.length_unit = unit;
        self
    }
}

impl std::fmt::Debug for EtlConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtlConfig")
            .field("out_dir", &self.out_dir)
            .field("length_unit", &self.length_unit)
            .finish_non_exhaustive()
    }
}

/// Persisted settings (replaces the original's registry-backed settings).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// IPC listen port.
    pub port: u16,
    /// Output directory for document streams.
    pub out_dir: PathBuf,
    /// Counting basis for length-prefixed wire parameters.
    pub length_unit: LengthUnit,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            out_dir: PathBuf::from("."),
            length_unit: LengthUnit::Bytes,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write settings back as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        // Missing file yields defaults.
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.port, DEFAULT_PORT);

        let custom = Settings {
            port: 6000,
            out_dir: PathBuf::from("/tmp/out"),
            length_unit: LengthUnit::Chars,
        };
        custom.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.port, 6000);
        assert_eq!(loaded.out_dir, PathBuf::from("/tmp/out"));
        assert_eq!(loaded.length_unit, LengthUnit::Chars);
    }

    #[test]
    fn test_static_clipboard() {
        assert_eq!(StaticClipboard::empty().text(), None);
        assert_eq!(
            StaticClipboard::with_text("copied").text(),
            Some("copied".to_string())
        );
    }
}
