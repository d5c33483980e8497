//! First pass: bind labels to byte positions, type every argument and size
//! every instruction.

use log::{debug, info};
use ssm_common::{Arg, ArgType, ArgValue, FloatWidth, NumKind, Op, Scalar, SpecError, TypeError};

use super::Assembler;
use crate::ast::{Instruction, Line, Location, Program, RawArg, Statement, Token};
use crate::error::AsmError;

/// The argument being converted, for diagnostics.
struct Site<'a> {
  op: &'a Op,
  index: usize,
  arg: &'a Arg,
  loc: &'a Location,
}

impl Site<'_> {
  fn mismatch(&self, found: &'static str) -> AsmError {
    self.spec(SpecError::TypeMismatch {
      opcode: self.op.name.clone(),
      index: self.index,
      arg: self.arg.name.clone(),
      expected: self.arg.ty.to_string(),
      found,
    })
  }

  fn spec(&self, source: SpecError) -> AsmError {
    AsmError::Spec { loc: self.loc.clone(), source }
  }

  fn bounds(&self, source: TypeError) -> AsmError {
    AsmError::Bounds { loc: self.loc.clone(), source }
  }
}

impl<'s> Assembler<'s> {
  pub fn refine(&mut self, lines: &[Line]) -> Result<Program<'s>, AsmError> {
    let mut position = 0;
    let mut instructions = Vec::new();
    let mut errors = Vec::new();

    for line in lines {
      let statement = match line {
        Line::LabelOnly { label, loc } => {
          if let Err(e) = self.labels.declare(label, position, instructions.len(), loc) {
            errors.push(e);
          }
          continue;
        }
        Line::Statement(statement) => statement,
      };

      if let Some(label) = &statement.label {
        if let Err(e) = self.labels.declare(label, position, instructions.len(), &statement.loc) {
          errors.push(e);
        }
      }

      match self.refine_statement(statement, position) {
        Ok((instruction, size)) => {
          debug!("{}: {} at {} ({} bytes)", instruction.loc, instruction.op.name, position, size);
          position += size;
          instructions.push(instruction);
        }
        Err(e) => errors.push(e),
      }
    }

    AsmError::check(errors)?;
    info!("Refined {} instructions, {} bytes, {} labels", instructions.len(), position, self.labels.len());
    Ok(Program { instructions, end: position, end_label: None })
  }

  fn refine_statement(&self, statement: &Statement, position: usize) -> Result<(Instruction<'s>, usize), AsmError> {
    let loc = &statement.loc;
    let spec_error = |source| AsmError::Spec { loc: loc.clone(), source };
    let op = self.spec.lookup_op(statement.opcode.as_str()).map_err(spec_error)?;

    if statement.args.len() != op.args.len() {
      return Err(spec_error(SpecError::ArityMismatch {
        opcode: op.name.clone(),
        expected: op.args.len(),
        actual: statement.args.len(),
      }));
    }

    let args = op
      .args
      .iter()
      .zip(&statement.args)
      .enumerate()
      .map(|(index, (arg, raw))| self.convert(&Site { op, index, arg, loc }, raw))
      .collect::<Result<Vec<_>, _>>()?;
    self.spec.validate(op, &args).map_err(spec_error)?;

    for (arg, value) in op.args.iter().zip(&args) {
      // Label references are range-checked once their distance is known.
      let checked = match (arg.ty.kind(), value) {
        (NumKind::Offset(_), ArgValue::Array(items)) => arg.ty.check_len(items.len()),
        (NumKind::Offset(_), ArgValue::Scalar(_)) => Ok(()),
        _ => arg.ty.check_bounds(value),
      };
      checked.map_err(|source| AsmError::Bounds { loc: loc.clone(), source })?;
    }

    let instruction = Instruction { label: statement.label.clone(), op, args, loc: loc.clone(), position };
    let size = instruction.size().map_err(|source| AsmError::Bounds { loc: loc.clone(), source })?;
    Ok((instruction, size))
  }

  fn convert(&self, site: &Site, raw: &RawArg) -> Result<ArgValue, AsmError> {
    match (&site.arg.ty, raw) {
      (ArgType::Scalar(_), RawArg::Empty) => Err(site.mismatch("an array")),
      (ArgType::Scalar(kind), RawArg::Tokens(tokens)) => match tokens.as_slice() {
        [token] => Ok(ArgValue::Scalar(self.scalar(site, *kind, token)?)),
        _ => Err(site.mismatch("several values")),
      },
      (ArgType::Array { .. }, RawArg::Empty) => Ok(ArgValue::Array(Vec::new())),
      (ArgType::Array { elem, .. }, RawArg::Tokens(tokens)) => {
        let mut items = Vec::with_capacity(tokens.len());
        for token in tokens {
          match token {
            Token::Str(bytes) if site.arg.ty.is_bytes() => {
              items.extend(bytes.iter().map(|b| Scalar::Int(*b as i128)))
            }
            token => items.push(self.scalar(site, *elem, token)?),
          }
        }
        Ok(ArgValue::Array(items))
      }
    }
  }

  fn scalar(&self, site: &Site, kind: NumKind, token: &Token) -> Result<Scalar, AsmError> {
    match (kind, token) {
      (NumKind::SignedInt(_) | NumKind::UnsignedInt(_), Token::Int(v)) => Ok(Scalar::Int(*v)),
      (NumKind::Offset(_), Token::Ident(label)) => Ok(Scalar::Name(label.clone())),
      (NumKind::Magic(_), Token::Ident(name)) => {
        let magic = self.spec.lookup_magic(name.as_str()).map_err(|e| site.spec(e))?;
        Ok(Scalar::Int(magic.index as i128))
      }
      (NumKind::Magic(_), Token::Int(v)) => {
        let index = usize::try_from(*v).map_err(|_| site.spec(SpecError::UnknownMagic(v.to_string())))?;
        let magic = self.spec.lookup_magic(index).map_err(|e| site.spec(e))?;
        Ok(Scalar::Int(magic.index as i128))
      }
      (NumKind::Float(width), Token::Float(text)) => parse_float(width, text).map_err(|e| site.bounds(e)),
      (NumKind::Float(width), Token::NanBits(bits)) => {
        width.nan_from_bits(*bits).map(Scalar::Float).map_err(|e| site.bounds(e))
      }
      (NumKind::Float(_), Token::Int(v)) => {
        let value = *v as f64;
        if value as i128 == *v {
          Ok(Scalar::Float(value))
        } else {
          Err(site.bounds(TypeError::OutOfRange {
            value: v.to_string(),
            min: "-2^53".into(),
            max: "2^53".into(),
            kind: kind.to_string(),
          }))
        }
      }
      (NumKind::Float(_), Token::Ident(name)) => match name.to_ascii_lowercase().as_str() {
        "inf" | "+inf" => Ok(Scalar::Float(f64::INFINITY)),
        "-inf" => Ok(Scalar::Float(f64::NEG_INFINITY)),
        "nan" => Ok(Scalar::Float(f64::NAN)),
        _ => Err(site.mismatch(token.describe())),
      },
      _ => Err(site.mismatch(token.describe())),
    }
  }
}

/// Reads a float literal at the target width, so `f32` arguments round once.
fn parse_float(width: FloatWidth, text: &str) -> Result<Scalar, TypeError> {
  let kind = NumKind::Float(width);
  let value = match width {
    FloatWidth::F32 => text.parse::<f32>().map(|v| v as f64),
    FloatWidth::F64 => text.parse::<f64>(),
  };
  match value {
    Ok(v) if v.is_finite() => Ok(Scalar::Float(v)),
    _ => {
      let (min, max) = match width {
        FloatWidth::F32 => (format!("{:?}", f32::MIN), format!("{:?}", f32::MAX)),
        FloatWidth::F64 => (format!("{:?}", f64::MIN), format!("{:?}", f64::MAX)),
      };
      Err(TypeError::OutOfRange { value: text.to_string(), min, max, kind: kind.to_string() })
    }
  }
}
