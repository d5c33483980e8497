use std::collections::HashMap;

use log::debug;

use crate::ast::Location;
use crate::error::AsmError;

#[derive(Debug, Clone, PartialEq)]
pub struct LabelEntry {
  /// Name as first written in the source.
  pub name: String,
  pub position: usize,
  /// Index of the instruction the label binds to. Equals the instruction
  /// count when the label sits after the last instruction.
  pub index: usize,
  pub loc: Location,
}

/// Labels of one assembly unit, keyed case-insensitively.
#[derive(Debug, Default)]
pub struct LabelTable {
  entries: HashMap<String, LabelEntry>,
}

impl LabelTable {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn declare(&mut self, name: &str, position: usize, index: usize, loc: &Location) -> Result<(), AsmError> {
    let key = name.to_ascii_lowercase();
    if let Some(first) = self.entries.get(&key) {
      return Err(AsmError::DuplicateLabel {
        label: name.to_string(),
        loc: loc.clone(),
        first: first.loc.clone(),
      });
    }

    debug!("Label `{}` bound to position {}", name, position);
    self.entries.insert(key, LabelEntry { name: name.to_string(), position, index, loc: loc.clone() });
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<&LabelEntry> {
    self.entries.get(&name.to_ascii_lowercase())
  }

  /// Entries ordered by position.
  pub fn entries(&self) -> Vec<&LabelEntry> {
    let mut entries: Vec<_> = self.entries.values().collect();
    entries.sort_by_key(|e| (e.position, e.index));
    entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }
}
