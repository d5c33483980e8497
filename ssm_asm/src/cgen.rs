//! C sources for the VM, generated from the opcode table: the opcode
//! numbering header, the operand-reading dispatch cases and the
//! computed-goto jump table.

use std::fmt::{self, Write as _};
use std::io::Write;

use log::{debug, info};
use ssm_common::{ArgType, FloatWidth, NumKind, Op, Spec};

use crate::common::WriteableResource;

const BANNER: &str = "// Generated by ssm";

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
  pub name: &'static str,
  pub text: String,
}

impl WriteableResource for Generated {
  fn write_to(&self, writer: &mut dyn Write) -> std::io::Result<()> {
    writer.write_all(self.text.as_bytes())?;
    writer.flush()
  }
}

pub fn generate(spec: &Spec) -> Result<Vec<Generated>, fmt::Error> {
  let files = vec![
    Generated { name: "ssm_ops.h", text: header(spec)? },
    Generated { name: "sw.c", text: switch(spec)? },
    Generated { name: "jmptbl.c", text: jump_table(spec)? },
  ];
  info!("Generated {} C files for {} opcodes", files.len(), spec.ops().len());
  Ok(files)
}

/// `SSM_OP_<NAME>` defines in index order.
pub fn header(spec: &Spec) -> Result<String, fmt::Error> {
  let mut out = String::new();
  writeln!(out, "{}", BANNER)?;
  writeln!(out, "#include <stdint.h>")?;
  for op in spec.ops() {
    writeln!(out, "#define SSM_OP_{} ((ssmOp){})", c_name(&op.name), op.index)?;
  }
  Ok(out)
}

/// One `OP(<NAME>)` case per opcode, reading every operand relative to `ip`.
pub fn switch(spec: &Spec) -> Result<String, fmt::Error> {
  let mut out = String::new();
  writeln!(out, "{}", BANNER)?;
  for op in spec.ops() {
    case(&mut out, op)?;
  }
  Ok(out)
}

pub fn jump_table(spec: &Spec) -> Result<String, fmt::Error> {
  let mut out = String::new();
  writeln!(out, "{}", BANNER)?;
  for op in spec.ops() {
    writeln!(out, "&&L_op_{},", c_name(&op.name))?;
  }
  Ok(out)
}

/// Byte offset from `ip`: a constant part plus one term per array read so far.
struct Cursor {
  fixed: usize,
  arrays: Vec<String>,
}

impl fmt::Display for Cursor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.fixed)?;
    for term in &self.arrays {
      write!(f, " + {}", term)?;
    }
    Ok(())
  }
}

fn case(out: &mut String, op: &Op) -> fmt::Result {
  writeln!(out, "OP({}): {{", c_name(&op.name))?;
  // The opcode byte sits at `ip + 0`.
  let mut cursor = Cursor { fixed: 1, arrays: Vec::new() };
  for (index, arg) in op.args.iter().enumerate() {
    match arg.ty {
      ArgType::Scalar(kind) => {
        let (ctype, reader) = c_scalar(kind);
        writeln!(out, "  {} a{} = {}(ip + {});", ctype, index, reader, cursor)?;
        cursor.fixed += kind.width();
      }
      ArgType::Array { len, elem } => {
        let (ctype, reader) = c_scalar(NumKind::UnsignedInt(len));
        writeln!(out, "  {} a{}_len = {}(ip + {});", ctype, index, reader, cursor)?;
        cursor.fixed += len.bytes();
        writeln!(out, "  const uint8_t *a{} = ip + {};", index, cursor)?;
        cursor.arrays.push(format!("a{}_len * {}", index, elem.width()));
      }
    }
  }
  writeln!(out, "}} NEXT({});", cursor)?;
  debug!("Generated dispatch case for {}", op.name);
  Ok(())
}

/// C type and read macro for one scalar field.
fn c_scalar(kind: NumKind) -> (String, String) {
  let bits = kind.width() * 8;
  match kind {
    NumKind::SignedInt(_) | NumKind::Offset(_) => (format!("int{}_t", bits), format!("SSM_READ_I{}", bits)),
    NumKind::UnsignedInt(_) | NumKind::Magic(_) => (format!("uint{}_t", bits), format!("SSM_READ_U{}", bits)),
    NumKind::Float(FloatWidth::F32) => ("float".into(), "SSM_READ_F32".into()),
    NumKind::Float(FloatWidth::F64) => ("double".into(), "SSM_READ_F64".into()),
  }
}

/// Opcode names may carry `.` or `-`, which C identifiers cannot.
fn c_name(name: &str) -> String {
  name.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect()
}
