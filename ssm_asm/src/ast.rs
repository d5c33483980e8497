use std::fmt;
use std::sync::Arc;

use ssm_common::{ArgValue, Op, TypeError};

/// Where an instruction or diagnostic comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
  /// 1-based line of an assembly source file.
  Line { file: Arc<str>, line: usize },
  /// Byte position in a bytecode stream.
  Byte { file: Arc<str>, pos: usize },
}

impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Location::Line { file, line } => write!(f, "{}:{}", file, line),
      Location::Byte { file, pos } => write!(f, "{}@{}", file, pos),
    }
  }
}

/// One literal or identifier of an argument, as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
  Int(i128),
  /// Float literals keep their text so they can be read at the target width.
  Float(String),
  /// `nan:0x...`, a NaN with these IEEE bits.
  NanBits(u64),
  /// Raw bytes between the quotes of a string literal.
  Str(Vec<u8>),
  Ident(String),
}

impl Token {
  pub fn describe(&self) -> &'static str {
    match self {
      Token::Int(_) => "an integer",
      Token::Float(_) => "a float",
      Token::NanBits(_) => "a NaN",
      Token::Str(_) => "a string",
      Token::Ident(_) => "a name",
    }
  }
}

/// The tokens between two commas.
#[derive(Debug, Clone, PartialEq)]
pub enum RawArg {
  /// `[]`, an array with no elements.
  Empty,
  Tokens(Vec<Token>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
  pub label: Option<String>,
  pub opcode: String,
  pub args: Vec<RawArg>,
  pub loc: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
  Statement(Statement),
  LabelOnly { label: String, loc: Location },
}

/// An instruction bound to its opcode, with typed arguments and its byte
/// position in the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction<'s> {
  pub label: Option<String>,
  pub op: &'s Op,
  pub args: Vec<ArgValue>,
  pub loc: Location,
  pub position: usize,
}

impl Instruction<'_> {
  /// Encoded size: the opcode byte plus every argument.
  pub fn size(&self) -> Result<usize, TypeError> {
    self
      .op
      .args
      .iter()
      .zip(&self.args)
      .try_fold(1, |size, (arg, value)| Ok(size + arg.ty.encoded_size(value)?))
  }
}

/// An ordered instruction list with final positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Program<'s> {
  pub instructions: Vec<Instruction<'s>>,
  /// Position one past the last instruction.
  pub end: usize,
  /// Label bound to `end`, if any jump targets it.
  pub end_label: Option<String>,
}
