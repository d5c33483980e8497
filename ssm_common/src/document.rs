//! Loading a [`Spec`] from a TOML instruction-set document.
//!
//! ```toml
//! [types.o32]
//! type = "offset"
//! bytes = 4
//!
//! [types.b32]
//! type = "array"
//! bytes = 4
//! elem = { type = "uint", bytes = 1 }
//!
//! [[opcodes]]
//! name = "JMP"
//! desc = "Jump"
//! args = [{ name = "target", type = "o32" }]
//!
//! [[magics]]
//! name = "NOP"
//! desc = "Do nothing"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::error::{SpecError, TypeError};
use crate::spec::Spec;
use crate::types::{ArgType, NumKind, Width};

const BUILTIN: &str = include_str!("../spec/ssm.toml");

#[derive(Debug, Deserialize)]
struct SpecDocument {
  #[serde(default)]
  types: BTreeMap<String, TypeDef>,
  #[serde(default)]
  opcodes: Vec<OpcodeDef>,
  #[serde(default)]
  magics: Vec<MagicDef>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TypeClass {
  Int,
  #[serde(alias = "global")]
  Uint,
  Float,
  Offset,
  Magic,
  Array,
}

#[derive(Debug, Deserialize)]
struct TypeDef {
  #[serde(rename = "type")]
  class: TypeClass,
  bytes: u8,
  elem: Option<ElemDef>,
}

#[derive(Debug, Deserialize)]
struct ElemDef {
  #[serde(rename = "type")]
  class: TypeClass,
  bytes: u8,
}

#[derive(Debug, Deserialize)]
struct OpcodeDef {
  name: String,
  #[serde(default)]
  desc: String,
  #[serde(default)]
  args: Vec<ArgDef>,
}

#[derive(Debug, Deserialize)]
struct ArgDef {
  name: String,
  #[serde(rename = "type")]
  ty: String,
}

#[derive(Debug, Deserialize)]
struct MagicDef {
  name: String,
  #[serde(default)]
  desc: String,
}

fn num_kind(class: TypeClass, bytes: u8) -> Result<NumKind, TypeError> {
  match class {
    TypeClass::Int => NumKind::int(bytes),
    TypeClass::Uint => NumKind::uint(bytes),
    TypeClass::Float => NumKind::float(bytes),
    TypeClass::Offset => NumKind::offset(bytes),
    TypeClass::Magic => NumKind::magic(bytes),
    TypeClass::Array => Err(TypeError::UndefinedWidth { class: "array element", bytes }),
  }
}

impl TypeDef {
  fn resolve(&self) -> Result<ArgType, TypeError> {
    match (self.class, &self.elem) {
      (TypeClass::Array, Some(elem)) => Ok(ArgType::Array {
        len: Width::from_bytes(self.bytes, "array length")?,
        elem: num_kind(elem.class, elem.bytes)?,
      }),
      (TypeClass::Array, None) => Err(TypeError::Shape { kind: "array".into(), found: "no element type" }),
      (class, _) => num_kind(class, self.bytes).map(ArgType::Scalar),
    }
  }
}

impl Spec {
  /// Parses a TOML instruction-set document.
  pub fn from_toml_str(source: &str) -> Result<Spec, SpecError> {
    let document: SpecDocument = toml::from_str(source)?;

    let mut types = BTreeMap::new();
    for (name, def) in &document.types {
      let ty = def
        .resolve()
        .map_err(|source| SpecError::InvalidType { name: name.clone(), source })?;
      types.insert(name.to_ascii_lowercase(), ty);
    }

    let mut builder = Spec::builder();
    for op in &document.opcodes {
      let mut args = Vec::with_capacity(op.args.len());
      for arg in &op.args {
        let ty = types.get(&arg.ty.to_ascii_lowercase()).ok_or_else(|| SpecError::UnknownType {
          name: arg.ty.clone(),
          opcode: op.name.clone(),
        })?;
        args.push((arg.name.as_str(), *ty));
      }
      builder = builder.op(&op.name, &args, &op.desc);
    }
    for magic in &document.magics {
      builder = builder.magic(&magic.name, &magic.desc);
    }
    builder.build()
  }

  /// Reads and parses a TOML instruction-set document from disk.
  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Spec, SpecError> {
    let path = path.as_ref();
    info!("Loading spec from {}", path.display());
    let source = std::fs::read_to_string(path)
      .map_err(|source| SpecError::Io { path: path.display().to_string(), source })?;
    Spec::from_toml_str(&source)
  }

  /// The default SSM instruction set bundled with this crate.
  pub fn builtin() -> Result<Spec, SpecError> {
    Spec::from_toml_str(BUILTIN)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::FloatWidth;

  const DOC: &str = r#"
[types.I16]
type = "int"
bytes = 2

[types.f64]
type = "float"
bytes = 8

[types.j16]
type = "array"
bytes = 2
elem = { type = "offset", bytes = 4 }

[types.g32]
type = "global"
bytes = 4

[[opcodes]]
name = "nop"
desc = "Nothing"

[[opcodes]]
name = "push"
args = [{ name = "Slot", type = "i16" }, { name = "value", type = "F64" }]

[[opcodes]]
name = "switch"
args = [{ name = "table", type = "j16" }, { name = "global", type = "g32" }]

[[magics]]
name = "pi"
"#;

  #[test]
  fn loads_types_opcodes_and_magics() {
    let spec = Spec::from_toml_str(DOC).unwrap();
    let push = spec.lookup_op("PUSH").unwrap();
    assert_eq!(push.index, 1);
    assert_eq!(push.args[0].name, "slot");
    assert_eq!(push.args[0].ty, ArgType::Scalar(NumKind::SignedInt(Width::W2)));
    assert_eq!(push.args[1].ty, ArgType::Scalar(NumKind::Float(FloatWidth::F64)));
    let switch = spec.lookup_op(2u8).unwrap();
    assert_eq!(switch.args[0].ty, ArgType::Array { len: Width::W2, elem: NumKind::Offset(Width::W4) });
    assert_eq!(switch.args[1].ty, ArgType::Scalar(NumKind::UnsignedInt(Width::W4)));
    assert_eq!(spec.lookup_magic("PI").unwrap().index, 0);
  }

  #[test]
  fn undefined_width_fails_construction() {
    let doc = "[types.i3]\ntype = \"int\"\nbytes = 3\n";
    let err = Spec::from_toml_str(doc).unwrap_err();
    assert!(matches!(err, SpecError::InvalidType { name, .. } if name == "i3"));
  }

  #[test]
  fn unknown_type_reference_fails() {
    let doc = "[[opcodes]]\nname = \"x\"\nargs = [{ name = \"a\", type = \"u128\" }]\n";
    let err = Spec::from_toml_str(doc).unwrap_err();
    assert!(matches!(err, SpecError::UnknownType { .. }));
  }

  #[test]
  fn malformed_document_is_reported() {
    assert!(matches!(Spec::from_toml_str("opcodes = 3"), Err(SpecError::Document(_))));
  }

  #[test]
  fn builtin_spec_loads() {
    let spec = Spec::builtin().unwrap();
    assert_eq!(spec.lookup_op("NOP").unwrap().index, 0);
    assert_eq!(spec.lookup_op("xfn").unwrap().index as usize, spec.ops().len() - 1);
    assert_eq!(spec.lookup_magic("FFILOAD").unwrap().index, spec.magics().len() - 1);
    let jtag = spec.lookup_op("JTAG").unwrap();
    assert!(matches!(jtag.args[0].ty, ArgType::Array { elem: NumKind::Offset(_), .. }));
  }
}
