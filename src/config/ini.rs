//! Ordered INI reader/writer.

use std::fs;
use std::path::Path;

use super::Result;

/// An INI document: ordered sections holding ordered `key=value` pairs.
///
/// Section and key names are case-sensitive. Lines whose first non-blank
/// character is `#` or `;` are comments. Keys appearing before any section
/// header land in an unnamed section that is emitted first on save.
#[derive(Debug, Clone, Default)]
pub struct IniFile {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl IniFile {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from a string.
    pub fn parse(input: &str) -> Self {
        let mut doc = Self::new();
        let mut current = String::new();

        for raw in input.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                current = line[1..line.len() - 1].trim().to_string();
                doc.section_entry(&current);
                continue;
            }
            let Some(eq) = line.find('=') else {
                // Malformed line, skip.
                continue;
            };
            let key = line[..eq].trim().to_string();
            let value = line[eq + 1..].trim().to_string();
            doc.set(&current, &key, value);
        }
        doc
    }

    /// Load a document from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Write the document to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    /// Look up a value.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(name, _)| name == section)?
            .1
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, replacing an existing key in place or appending it.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        let idx = self.section_entry(section);
        let entries = &mut self.sections[idx].1;
        if let Some(entry) = entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value.into();
        } else {
            entries.push((key.to_string(), value.into()));
        }
    }

    /// Whether a section exists.
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.iter().any(|(name, _)| name == section)
    }

    /// Iterate `(key, value)` pairs of a section, in file order.
    pub fn section<'a>(&'a self, section: &str) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.sections
            .iter()
            .find(|(name, _)| name == section)
            .map(|(_, entries)| entries.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn section_entry(&mut self, section: &str) -> usize {
        if let Some(idx) = self.sections.iter().position(|(name, _)| name == section) {
            return idx;
        }
        self.sections.push((section.to_string(), Vec::new()));
        self.sections.len() - 1
    }
}

impl std::fmt::Display for IniFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, entries) in &self.sections {
            if !name.is_empty() {
                writeln!(f, "[{name}]")?;
            }
            for (key, value) in entries {
                writeln!(f, "{key}={value}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
