//! Macro storage - one JSON document holding the list and the selection
//!
//! ```json
//! { "macros": [{"id": "...", "name": "...", "commands": "tap,1,2\ndelay,5"}],
//!   "selected_macro": "..." }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use touchmacro_core::{Action, Macro, MacroLibrary};
use tracing::{debug, warn};

pub const STORE_FILE: &str = "macros.json";
pub const HOME_ENV: &str = "TOUCHMACRO_HOME";

/// On-disk shape of one macro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMacro {
    pub id: String,
    pub name: String,
    pub commands: String,
}

impl From<&Macro> for StoredMacro {
    fn from(m: &Macro) -> Self {
        Self {
            id: m.id().to_string(),
            name: m.name().to_string(),
            commands: m.commands(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Document {
    macros: Vec<StoredMacro>,
    selected_macro: Option<String>,
}

pub struct MacroStorage {
    dir: PathBuf,
}

impl MacroStorage {
    /// `$TOUCHMACRO_HOME`, or `~/.touchmacro`.
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(HOME_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = std::env::var("HOME").context("HOME not set")?;
                PathBuf::from(home).join(".touchmacro")
            }
        };
        Self::with_dir(dir)
    }

    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn file(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    /// Load the library. A missing file is an empty library; records without
    /// an id or name are skipped.
    pub fn load(&self) -> Result<MacroLibrary> {
        let path = self.file();
        if !path.exists() {
            debug!(path = %path.display(), "no macro store yet");
            return Ok(MacroLibrary::new());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if text.trim().is_empty() {
            return Ok(MacroLibrary::new());
        }
        let root: Value = serde_json::from_str(&text)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;

        let macros = root
            .get("macros")
            .and_then(Value::as_array)
            .map(|records| records.iter().filter_map(parse_record).collect())
            .unwrap_or_default();
        let selected = root
            .get("selected_macro")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(MacroLibrary::from_parts(macros, selected))
    }

    /// Write the whole library atomically (temp file then rename).
    pub fn save(&self, library: &MacroLibrary) -> Result<()> {
        let doc = Document {
            macros: library.macros().iter().map(StoredMacro::from).collect(),
            selected_macro: library.selected_id().map(str::to_string),
        };
        let json = serde_json::to_string_pretty(&doc)?;
        let path = self.file();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        debug!(path = %path.display(), macros = doc.macros.len(), "macro store saved");
        Ok(())
    }

    /// Create, persist and return a new macro.
    pub fn add(&self, name: &str, actions: Vec<Action>) -> Result<Macro> {
        let mut library = self.load()?;
        let created = library.create(name, actions).clone();
        self.save(&library)?;
        Ok(created)
    }

    /// Persist a macro built elsewhere (e.g. an import).
    pub fn insert(&self, macro_def: Macro) -> Result<()> {
        let mut library = self.load()?;
        library.add(macro_def)?;
        self.save(&library)
    }

    pub fn update(&self, id: &str, name: &str, actions: Vec<Action>) -> Result<()> {
        let mut library = self.load()?;
        library.update(id, name, actions)?;
        self.save(&library)
    }

    pub fn delete(&self, id: &str) -> Result<Macro> {
        let mut library = self.load()?;
        let removed = library.remove(id)?;
        self.save(&library)?;
        Ok(removed)
    }

    pub fn set_selected(&self, id: Option<&str>) -> Result<()> {
        let mut library = self.load()?;
        match id {
            Some(id) => library.select(id)?,
            None => library.clear_selection(),
        }
        self.save(&library)
    }

    pub fn selected_macro(&self) -> Result<Option<Macro>> {
        Ok(self.load()?.selected().cloned())
    }
}

fn parse_record(record: &Value) -> Option<Macro> {
    let id = record.get("id").and_then(Value::as_str);
    let name = record.get("name").and_then(Value::as_str);
    let (Some(id), Some(name)) = (id, name) else {
        warn!(%record, "skipping stored macro without id or name");
        return None;
    };
    let commands = record.get("commands").and_then(Value::as_str).unwrap_or("");
    Some(Macro::from_commands(id, name, commands))
}
