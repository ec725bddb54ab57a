//! The in-memory configuration tree.
//!
//! A [`ConfigTree`] is an ordered list of named sections; a [`Section`] is
//! an ordered list of `key = value` string pairs. Both section names and
//! keys compare case-insensitively, matching the INI dialect the
//! configuration files are written in.
//!
//! Keys are *consumed*: the field engine removes each key as it is
//! successfully parsed, so whatever is left in a section afterwards is an
//! unknown or misspelled setting and gets surfaced as a warning.
//!
//! # Example
//!
//! ```
//! use digconf::tree::ConfigTree;
//!
//! let tree = ConfigTree::from_ini_str(
//!     "[digi1]\nLinkType = USB\nLinkNum = 0\n",
//! ).unwrap();
//! let section = tree.section("DIGI1").unwrap();
//! assert_eq!(section.get("linktype"), Some("USB"));
//! ```

use crate::error::{ConfigError, Result};

/// One named section of the configuration: an ordered, case-insensitive
/// mapping of keys to string values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    /// Creates an empty section with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// The section name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts or replaces a key. An existing key (case-insensitive match)
    /// keeps its position; a new key is appended.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some((_, v)) => *v = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Looks up a key without consuming it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Removes a key and returns its value.
    ///
    /// Only the first matching entry is removed; a duplicated key leaves
    /// its remaining instances in place, where the unknown-keys pass will
    /// report them.
    pub fn take(&mut self, key: &str) -> Option<String> {
        let pos = self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))?;
        Some(self.entries.remove(pos).1)
    }

    /// Iterates over the remaining `(key, value)` pairs in order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of remaining keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no keys remain.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An ordered collection of configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTree {
    sections: Vec<Section>,
}

impl ConfigTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a section. An existing section of the same name
    /// (case-insensitive) is replaced in place.
    pub fn push(&mut self, section: Section) {
        match self
            .sections
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(&section.name))
        {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
    }

    /// Looks up a section by name.
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Looks up a section by name, mutably.
    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Iterates over the sections in order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Iterates over the sections in order, mutably.
    pub fn sections_mut(&mut self) -> impl Iterator<Item = &mut Section> {
        self.sections.iter_mut()
    }

    /// Parses INI-formatted text.
    ///
    /// `[name]` starts a section; `key = value` adds an entry; empty lines
    /// and lines starting with `;` or `#` are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IniParse`] (with the 1-based line number) for
    /// an unterminated section header, a key before any section, or a line
    /// without `=`.
    pub fn from_ini_str(input: &str) -> Result<Self> {
        let mut tree = Self::new();
        for (lineno, raw) in input.lines().enumerate() {
            let line = raw.trim();
            let lineno = lineno + 1;
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .ok_or_else(|| ConfigError::ini_parse(lineno, "unterminated section header"))?
                    .trim();
                if name.is_empty() {
                    return Err(ConfigError::ini_parse(lineno, "empty section name"));
                }
                tree.sections.push(Section::new(name));
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| ConfigError::ini_parse(lineno, "expected 'key = value'"))?;
            let section = tree
                .sections
                .last_mut()
                .ok_or_else(|| ConfigError::ini_parse(lineno, "key before any [section]"))?;
            // raw append: duplicate keys in the input are preserved so the
            // unknown-keys diagnostic can point at them
            section
                .entries
                .push((key.trim().to_string(), value.trim().to_string()));
        }
        Ok(tree)
    }

    /// Serializes the tree back into INI text.
    pub fn to_ini_string(&self) -> String {
        let mut out = String::new();
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("[{}]\n", section.name));
            for (key, value) in section.entries() {
                out.push_str(&format!("{key} = {value}\n"));
            }
        }
        out
    }
}
