use ssm_common::{SpecError, TypeError};
use thiserror::Error;

use crate::ast::Location;

#[derive(Error, Debug)]
pub enum AsmError {
  #[error("{loc}: syntax error: {msg}")]
  Syntax { loc: Location, msg: String },

  /// Unknown opcode or magic, wrong argument count, or wrong argument shape.
  #[error("{loc}: {source}")]
  Spec {
    loc: Location,
    #[source]
    source: SpecError,
  },

  #[error("{loc}: duplicate label `{label}` (first defined at {first})")]
  DuplicateLabel { label: String, loc: Location, first: Location },

  #[error("{loc}: undefined label `{label}`")]
  UndefinedLabel { label: String, loc: Location },

  #[error("{loc}: {source}")]
  Bounds {
    loc: Location,
    #[source]
    source: TypeError,
  },

  #[error("{}", join(.errors))]
  Multiple { errors: Vec<AsmError> },
}

#[derive(Error, Debug)]
pub enum DsmError {
  #[error("{loc}: unknown opcode {index:#04x}")]
  UnknownOpcode { loc: Location, index: u8 },

  #[error("{loc}: argument `{arg}` of `{opcode}`: {source}")]
  Truncated {
    loc: Location,
    opcode: String,
    arg: String,
    #[source]
    source: TypeError,
  },

  #[error("{loc}: offset {offset} targets {target}, which is not an instruction boundary")]
  Misaligned { loc: Location, offset: i128, target: i128 },

  #[error("{loc}: unknown magic index {index}")]
  UnknownMagic { loc: Location, index: i128 },

  #[error("{}", join(.errors))]
  Multiple { errors: Vec<DsmError> },
}

fn join<E: std::fmt::Display>(errors: &[E]) -> String {
  errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n")
}

macro_rules! aggregate {
  ($ty:ident) => {
    impl $ty {
      /// Folds the errors collected by one pipeline stage into a result.
      pub(crate) fn check(mut errors: Vec<$ty>) -> Result<(), $ty> {
        match errors.len() {
          0 => Ok(()),
          1 => Err(errors.remove(0)),
          _ => Err($ty::Multiple { errors }),
        }
      }

      /// Every individual error, with `Multiple` flattened.
      pub fn errors(&self) -> Vec<&$ty> {
        match self {
          $ty::Multiple { errors } => errors.iter().flat_map(|e| e.errors()).collect(),
          other => vec![other],
        }
      }
    }
  };
}

aggregate!(AsmError);
aggregate!(DsmError);
