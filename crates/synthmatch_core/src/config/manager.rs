//! Reading and writing the settings file.
//!
//! Writes go to a sibling `.tmp` file that is renamed into place, so a crash
//! never leaves a half-written config. Updating one section edits that table
//! with `toml_edit` and keeps the rest of the document as the user wrote it.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O: {0}")]
    Io(#[from] io::Error),

    #[error("malformed settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("malformed TOML document: {0}")]
    Document(#[from] toml_edit::TomlError),

    #[error("no settings file at {}", .0.display())]
    Missing(PathBuf),

    #[error("{key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// In-memory [`Settings`] bound to a file path.
pub struct ConfigManager {
    path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Starts from defaults; nothing is read until [`load`](Self::load) or
    /// [`load_or_create`](Self::load_or_create).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Edits stay in memory until [`save`](Self::save) or
    /// [`update_section`](Self::update_section).
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Read and validate the file. A missing file is an error.
    pub fn load(&mut self) -> ConfigResult<()> {
        let text = self
            .read_file()?
            .ok_or_else(|| ConfigError::Missing(self.path.clone()))?;
        let settings: Settings = toml::from_str(&text)?;
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Read the file, or write a default one when there is none.
    ///
    /// Unknown tables are stripped and absent ones filled with defaults; the
    /// file is rewritten if either happened.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        let Some(text) = self.read_file()? else {
            tracing::info!("No config at {}, writing defaults", self.path.display());
            self.settings = Settings::default();
            return self.save();
        };

        let (settings, dirty) = strip_unknown_sections(&text)?;
        settings.validate()?;
        self.settings = settings;

        if dirty {
            tracing::info!("Normalizing config at {}", self.path.display());
            self.save()?;
        }
        Ok(())
    }

    /// Rewrite the whole file from the in-memory settings.
    pub fn save(&self) -> ConfigResult<()> {
        let text = self.render()?;
        self.replace_file(&text)?;
        Ok(())
    }

    /// Replace a single table in the file on disk.
    ///
    /// Other tables, and any comments in them, come through unchanged even if
    /// their in-memory values were edited.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        self.settings.validate()?;

        let mut doc = match self.read_file()? {
            Some(text) if !text.trim().is_empty() => text.parse::<DocumentMut>()?,
            _ => DocumentMut::new(),
        };

        let table: DocumentMut = self.section_toml(section)?.parse()?;
        doc[section.table_name()] = Item::Table(table.as_table().clone());

        self.replace_file(&doc.to_string())?;
        Ok(())
    }

    fn read_file(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        let text = match section {
            ConfigSection::Logging => toml::to_string_pretty(&self.settings.logging)?,
            ConfigSection::Matching => toml::to_string_pretty(&self.settings.matching)?,
            ConfigSection::Picking => toml::to_string_pretty(&self.settings.picking)?,
        };
        Ok(text)
    }

    fn render(&self) -> ConfigResult<String> {
        let mut out = String::from("# synthmatch settings\n");
        for section in ConfigSection::ALL {
            out.push_str(&format!(
                "\n# {}\n[{}]\n",
                section.description(),
                section.table_name()
            ));
            for line in self.section_toml(section)?.lines() {
                out.push_str(line);
                out.push('\n');
            }
        }
        Ok(out)
    }

    fn replace_file(&self, text: &str) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let staging = self.path.with_extension("toml.tmp");
        let mut file = fs::File::create(&staging)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&staging, &self.path)
    }
}

/// Parse settings after removing top-level tables that no section owns.
///
/// The flag is set when a table was removed or one was absent.
fn strip_unknown_sections(text: &str) -> ConfigResult<(Settings, bool)> {
    let mut doc: DocumentMut = text.parse()?;
    let known: Vec<&str> = ConfigSection::ALL.iter().map(|s| s.table_name()).collect();

    let stray: Vec<String> = doc
        .iter()
        .map(|(name, _)| name.to_string())
        .filter(|name| !known.contains(&name.as_str()))
        .collect();
    for name in &stray {
        tracing::warn!("Dropping unknown config table [{}]", name);
        doc.remove(name);
    }

    let absent = known.iter().any(|name| !doc.contains_key(name));
    let settings: Settings = toml::from_str(&doc.to_string())?;

    Ok((settings, absent || !stray.is_empty()))
}
