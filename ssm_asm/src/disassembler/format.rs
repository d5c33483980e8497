use std::fmt;

use ssm_common::{ArgType, ArgValue, FloatWidth, NumKind, Scalar};

use crate::ast::Program;

/// Assembly text the assembler reads back to the same bytes: label lines,
/// then `  OPCODE arg,arg` per instruction.
impl fmt::Display for Program<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for instruction in &self.instructions {
      if let Some(label) = &instruction.label {
        writeln!(f, "{}:", label)?;
      }
      write!(f, "  {}", instruction.op.name)?;
      for (index, (arg, value)) in instruction.op.args.iter().zip(&instruction.args).enumerate() {
        f.write_str(if index == 0 { " " } else { "," })?;
        write_arg(f, &arg.ty, value)?;
      }
      writeln!(f)?;
    }
    if let Some(label) = &self.end_label {
      writeln!(f, "{}:", label)?;
    }
    Ok(())
  }
}

fn write_arg(f: &mut fmt::Formatter<'_>, ty: &ArgType, value: &ArgValue) -> fmt::Result {
  match value {
    ArgValue::Scalar(scalar) => write_scalar(f, ty.kind(), scalar),
    ArgValue::Array(items) if items.is_empty() => f.write_str("[]"),
    ArgValue::Array(items) if ty.is_bytes() => f.write_str(&byte_tokens(items).join(" ")),
    ArgValue::Array(items) => {
      for (index, item) in items.iter().enumerate() {
        if index > 0 {
          f.write_str(" ")?;
        }
        write_scalar(f, ty.kind(), item)?;
      }
      Ok(())
    }
  }
}

fn write_scalar(f: &mut fmt::Formatter<'_>, kind: NumKind, scalar: &Scalar) -> fmt::Result {
  match (kind, scalar) {
    (NumKind::Float(width), Scalar::Float(v)) if v.is_nan() => {
      let bits = width.to_bits(*v);
      if bits == width.canonical_nan() {
        f.write_str("nan")
      } else {
        write!(f, "nan:{:#0digits$x}", bits, digits = 2 + 2 * width.bytes())
      }
    }
    (NumKind::Float(_), Scalar::Float(v)) if v.is_infinite() => f.write_str(if *v > 0.0 { "inf" } else { "-inf" }),
    (NumKind::Float(FloatWidth::F32), Scalar::Float(v)) => write!(f, "{:?}", *v as f32),
    (_, scalar) => write!(f, "{}", scalar),
  }
}

/// Printable ASCII runs become quoted strings, everything else `0xHH`.
fn byte_tokens(items: &[Scalar]) -> Vec<String> {
  let mut tokens = Vec::new();
  let mut run = String::new();
  for item in items {
    match item.as_int().and_then(|b| u8::try_from(b).ok()) {
      Some(byte) if (0x20..=0x7e).contains(&byte) && byte != b'"' => run.push(byte as char),
      byte => {
        if !run.is_empty() {
          tokens.push(format!("\"{}\"", run));
          run.clear();
        }
        tokens.push(match byte {
          Some(byte) => format!("0x{:02x}", byte),
          None => item.to_string(),
        });
      }
    }
  }
  if !run.is_empty() {
    tokens.push(format!("\"{}\"", run));
  }
  tokens
}
