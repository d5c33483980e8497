use thiserror::Error;

/// Failures of the type registry: construction, bounds checks and the wire codec.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
  #[error("no {class} encoding is {bytes} byte(s) wide")]
  UndefinedWidth { class: &'static str, bytes: u8 },

  #[error("value {value} out of range [{min}..{max}] for {kind}")]
  OutOfRange { value: String, min: String, max: String, kind: String },

  #[error("array of {count} element(s) does not fit a {bytes}-byte length prefix")]
  ArrayTooLong { count: usize, bytes: usize },

  #[error("{kind} cannot hold {found}")]
  Shape { kind: String, found: &'static str },

  #[error("{bits:#x} is not a {kind} NaN")]
  NotNan { bits: u64, kind: String },

  #[error("truncated input: {kind} needs {needed} byte(s), {available} left")]
  Truncated { kind: String, needed: usize, available: usize },
}

/// Failures of the instruction spec: lookups, validation and document loading.
#[derive(Error, Debug)]
pub enum SpecError {
  #[error("unknown opcode `{0}`")]
  UnknownOpcode(String),

  #[error("unknown magic `{0}`")]
  UnknownMagic(String),

  #[error("unknown type `{name}` referenced by `{opcode}`")]
  UnknownType { name: String, opcode: String },

  #[error("invalid type `{name}`: {source}")]
  InvalidType {
    name: String,
    #[source]
    source: TypeError,
  },

  #[error("opcode `{0}` is defined more than once")]
  DuplicateOpcode(String),

  #[error("magic `{0}` is defined more than once")]
  DuplicateMagic(String),

  #[error("{0} opcodes do not fit a one-byte opcode index")]
  TooManyOpcodes(usize),

  #[error("`{opcode}` expects {expected} argument(s), got {actual}")]
  ArityMismatch { opcode: String, expected: usize, actual: usize },

  #[error("argument {index} (`{arg}`) of `{opcode}` expects {expected}, got {found}")]
  TypeMismatch { opcode: String, index: usize, arg: String, expected: String, found: &'static str },

  #[error("failed to parse spec document: {0}")]
  Document(#[from] toml::de::Error),

  #[error("failed to read spec document {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn out_of_range_display() {
    let err = TypeError::OutOfRange {
      value: "256".into(),
      min: "0".into(),
      max: "255".into(),
      kind: "u8".into(),
    };
    assert_eq!(err.to_string(), "value 256 out of range [0..255] for u8");
  }

  #[test]
  fn arity_display_names_both_counts() {
    let err = SpecError::ArityMismatch { opcode: "JMP".into(), expected: 1, actual: 0 };
    assert_eq!(err.to_string(), "`JMP` expects 1 argument(s), got 0");
  }
}
