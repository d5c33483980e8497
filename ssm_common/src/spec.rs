//! The instruction spec: opcode and magic tables shared read-only by the
//! assembler and the disassembler.

use std::collections::HashMap;

use log::debug;

use crate::error::SpecError;
use crate::types::{ArgType, NumKind};
use crate::value::{ArgValue, Scalar};

/// One declared argument of an opcode.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
  /// Lower-cased argument name.
  pub name: String,
  pub ty: ArgType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Op {
  /// Position in the opcode table, and the instruction's tag byte on the wire.
  pub index: u8,
  /// Upper-cased canonical name.
  pub name: String,
  pub args: Vec<Arg>,
  pub desc: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Magic {
  pub index: usize,
  /// Upper-cased canonical name.
  pub name: String,
  pub desc: String,
}

/// Lookup key for opcodes and magics: a case-insensitive name or a table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
  Name(&'a str),
  Index(usize),
}

impl<'a> From<&'a str> for Key<'a> {
  fn from(name: &'a str) -> Self {
    Key::Name(name)
  }
}

impl From<usize> for Key<'_> {
  fn from(index: usize) -> Self {
    Key::Index(index)
  }
}

impl From<u8> for Key<'_> {
  fn from(index: u8) -> Self {
    Key::Index(index as usize)
  }
}

#[derive(Debug)]
pub struct Spec {
  ops: Vec<Op>,
  op_names: HashMap<String, usize>,
  magics: Vec<Magic>,
  magic_names: HashMap<String, usize>,
}

impl Spec {
  pub fn builder() -> SpecBuilder {
    SpecBuilder::default()
  }

  pub fn ops(&self) -> &[Op] {
    &self.ops
  }

  pub fn magics(&self) -> &[Magic] {
    &self.magics
  }

  pub fn lookup_op<'k>(&self, key: impl Into<Key<'k>>) -> Result<&Op, SpecError> {
    match key.into() {
      Key::Name(name) => self
        .op_names
        .get(&name.to_ascii_uppercase())
        .map(|i| &self.ops[*i])
        .ok_or_else(|| SpecError::UnknownOpcode(name.to_string())),
      Key::Index(index) => self
        .ops
        .get(index)
        .ok_or_else(|| SpecError::UnknownOpcode(format!("#{}", index))),
    }
  }

  pub fn lookup_magic<'k>(&self, key: impl Into<Key<'k>>) -> Result<&Magic, SpecError> {
    match key.into() {
      Key::Name(name) => self
        .magic_names
        .get(&name.to_ascii_uppercase())
        .map(|i| &self.magics[*i])
        .ok_or_else(|| SpecError::UnknownMagic(name.to_string())),
      Key::Index(index) => self
        .magics
        .get(index)
        .ok_or_else(|| SpecError::UnknownMagic(format!("#{}", index))),
    }
  }

  /// Checks arity and the shape of every supplied value against `op`.
  ///
  /// Only the value class is compared (integer, float, symbolic name, array),
  /// never the configured width; range checks belong to the type registry.
  /// Offset arguments must still be label references.
  pub fn validate(&self, op: &Op, values: &[ArgValue]) -> Result<(), SpecError> {
    if values.len() != op.args.len() {
      return Err(SpecError::ArityMismatch {
        opcode: op.name.clone(),
        expected: op.args.len(),
        actual: values.len(),
      });
    }
    for (index, (arg, value)) in op.args.iter().zip(values).enumerate() {
      let fits = match (&arg.ty, value) {
        (ArgType::Scalar(kind), ArgValue::Scalar(v)) => scalar_fits(*kind, v),
        (ArgType::Array { elem, .. }, ArgValue::Array(items)) => {
          items.iter().all(|v| scalar_fits(*elem, v))
        }
        _ => false,
      };
      if !fits {
        let found = match value {
          ArgValue::Array(items) => items
            .iter()
            .find(|v| !scalar_fits(arg.ty.kind(), v))
            .map(|v| v.shape())
            .unwrap_or("an array"),
          ArgValue::Scalar(v) => v.shape(),
        };
        return Err(SpecError::TypeMismatch {
          opcode: op.name.clone(),
          index,
          arg: arg.name.clone(),
          expected: arg.ty.to_string(),
          found,
        });
      }
    }
    Ok(())
  }
}

fn scalar_fits(kind: NumKind, value: &Scalar) -> bool {
  match kind {
    NumKind::SignedInt(_) | NumKind::UnsignedInt(_) => matches!(value, Scalar::Int(_)),
    NumKind::Float(_) => matches!(value, Scalar::Float(_)),
    // Offsets stay label references until their distance is known.
    NumKind::Offset(_) => matches!(value, Scalar::Name(_)),
    NumKind::Magic(_) => matches!(value, Scalar::Int(_) | Scalar::Name(_)),
  }
}

/// Collects opcode and magic definitions in index order.
#[derive(Debug, Default)]
pub struct SpecBuilder {
  ops: Vec<(String, Vec<Arg>, String)>,
  magics: Vec<(String, String)>,
}

impl SpecBuilder {
  pub fn op(mut self, name: &str, args: &[(&str, ArgType)], desc: &str) -> Self {
    let args = args
      .iter()
      .map(|(name, ty)| Arg { name: name.to_ascii_lowercase(), ty: *ty })
      .collect();
    self.ops.push((name.to_string(), args, desc.to_string()));
    self
  }

  pub fn magic(mut self, name: &str, desc: &str) -> Self {
    self.magics.push((name.to_string(), desc.to_string()));
    self
  }

  pub fn build(self) -> Result<Spec, SpecError> {
    if self.ops.len() > u8::MAX as usize + 1 {
      return Err(SpecError::TooManyOpcodes(self.ops.len()));
    }

    let mut ops = Vec::with_capacity(self.ops.len());
    let mut op_names = HashMap::new();
    for (index, (name, args, desc)) in self.ops.into_iter().enumerate() {
      let name = name.to_ascii_uppercase();
      if op_names.insert(name.clone(), index).is_some() {
        return Err(SpecError::DuplicateOpcode(name));
      }
      ops.push(Op { index: index as u8, name, args, desc });
    }

    let mut magics = Vec::with_capacity(self.magics.len());
    let mut magic_names = HashMap::new();
    for (index, (name, desc)) in self.magics.into_iter().enumerate() {
      let name = name.to_ascii_uppercase();
      if magic_names.insert(name.clone(), index).is_some() {
        return Err(SpecError::DuplicateMagic(name));
      }
      magics.push(Magic { index, name, desc });
    }

    debug!("Built spec with {} opcodes and {} magics", ops.len(), magics.len());
    Ok(Spec { ops, op_names, magics, magic_names })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::Width;

  fn small_spec() -> Spec {
    Spec::builder()
      .op("add", &[], "Add two integers")
      .op("jmp", &[("target", ArgType::Scalar(NumKind::Offset(Width::W2)))], "Jump")
      .op(
        "long",
        &[("data", ArgType::Array { len: Width::W4, elem: NumKind::UnsignedInt(Width::W1) })],
        "Byte blob",
      )
      .op("pushf", &[("value", ArgType::Scalar(NumKind::Float(crate::types::FloatWidth::F32)))], "")
      .magic("nop", "Nothing")
      .magic("halt", "Stop")
      .build()
      .unwrap()
  }

  #[test]
  fn indices_follow_declaration_order() {
    let spec = small_spec();
    assert_eq!(spec.lookup_op("ADD").unwrap().index, 0);
    assert_eq!(spec.lookup_op("Jmp").unwrap().index, 1);
    assert_eq!(spec.lookup_op(2u8).unwrap().name, "LONG");
    assert_eq!(spec.lookup_magic("Halt").unwrap().index, 1);
    assert_eq!(spec.lookup_magic(0usize).unwrap().name, "NOP");
  }

  #[test]
  fn unknown_lookups_fail() {
    let spec = small_spec();
    assert!(matches!(spec.lookup_op("mul"), Err(SpecError::UnknownOpcode(n)) if n == "mul"));
    assert!(matches!(spec.lookup_op(200u8), Err(SpecError::UnknownOpcode(_))));
    assert!(matches!(spec.lookup_magic(9usize), Err(SpecError::UnknownMagic(_))));
  }

  #[test]
  fn duplicate_names_are_rejected() {
    let err = Spec::builder().op("nop", &[], "").op("NOP", &[], "").build().unwrap_err();
    assert!(matches!(err, SpecError::DuplicateOpcode(n) if n == "NOP"));
    let err = Spec::builder().magic("e", "").magic("E", "").build().unwrap_err();
    assert!(matches!(err, SpecError::DuplicateMagic(_)));
  }

  #[test]
  fn more_than_256_opcodes_is_an_error() {
    let mut builder = Spec::builder();
    for i in 0..257 {
      builder = builder.op(&format!("op{}", i), &[], "");
    }
    assert!(matches!(builder.build(), Err(SpecError::TooManyOpcodes(257))));
  }

  #[test]
  fn validate_checks_arity_both_ways() {
    let spec = small_spec();
    let add = spec.lookup_op("add").unwrap();
    let err = spec.validate(add, &[ArgValue::int(1)]).unwrap_err();
    assert!(matches!(err, SpecError::ArityMismatch { expected: 0, actual: 1, .. }));
    let jmp = spec.lookup_op("jmp").unwrap();
    let err = spec.validate(jmp, &[]).unwrap_err();
    assert!(matches!(err, SpecError::ArityMismatch { expected: 1, actual: 0, .. }));
  }

  #[test]
  fn validate_checks_shapes() {
    let spec = small_spec();
    let jmp = spec.lookup_op("jmp").unwrap();
    assert!(spec.validate(jmp, &[ArgValue::name("start")]).is_ok());
    let err = spec.validate(jmp, &[ArgValue::int(4)]).unwrap_err();
    assert!(matches!(err, SpecError::TypeMismatch { index: 0, found: "an integer", .. }));
    let err = spec.validate(jmp, &[ArgValue::Array(vec![])]).unwrap_err();
    assert!(matches!(err, SpecError::TypeMismatch { index: 0, .. }));

    let long = spec.lookup_op("long").unwrap();
    assert!(spec.validate(long, &[ArgValue::bytes(b"hi")]).is_ok());
    let err = spec
      .validate(long, &[ArgValue::Array(vec![Scalar::Int(1), Scalar::Float(2.0)])])
      .unwrap_err();
    assert!(matches!(err, SpecError::TypeMismatch { found: "a float", .. }));

    let pushf = spec.lookup_op("pushf").unwrap();
    assert!(spec.validate(pushf, &[ArgValue::int(1)]).is_err());
    assert!(spec.validate(pushf, &[ArgValue::float(1.5)]).is_ok());
  }
}
