use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, trace};
use ssm_common::{NumKind, Scalar, Spec};

use crate::ast::{Instruction, Location, Program};
use crate::error::DsmError;

pub mod format;

/// Turns SSM bytecode back into assembly text with synthesized labels.
#[derive(Debug)]
pub struct Disassembler<'s> {
  spec: &'s Spec,
}

impl<'s> Disassembler<'s> {
  pub fn new(spec: &'s Spec) -> Self {
    Self { spec }
  }

  pub fn disassemble(&self, file: &str, bytes: &[u8]) -> Result<String, DsmError> {
    info!("Unmarshalling {} bytes from {}", bytes.len(), file);
    let mut program = self.unmarshal(file, bytes)?;

    info!("Inferring labels for {} instructions", program.instructions.len());
    self.infer_labels(&mut program)?;

    info!("Formatting");
    Ok(program.to_string())
  }

  /// Decodes instructions back to back from position 0. Decoding stops at the
  /// first unknown opcode or truncated argument.
  pub fn unmarshal(&self, file: &str, bytes: &[u8]) -> Result<Program<'s>, DsmError> {
    let file: Arc<str> = Arc::from(file);
    let byte_at = |rest: &[u8]| Location::Byte { file: file.clone(), pos: bytes.len() - rest.len() };

    let mut instructions = Vec::new();
    let mut rest = bytes;
    while let Some((&tag, mut cursor)) = rest.split_first() {
      let position = bytes.len() - rest.len();
      let loc = byte_at(rest);
      let op = self.spec.lookup_op(tag).map_err(|_| DsmError::UnknownOpcode { loc: loc.clone(), index: tag })?;

      let mut args = Vec::with_capacity(op.args.len());
      for arg in &op.args {
        let (value, next) = arg.ty.unpack(cursor).map_err(|source| DsmError::Truncated {
          loc: byte_at(cursor),
          opcode: op.name.clone(),
          arg: arg.name.clone(),
          source,
        })?;
        args.push(value);
        cursor = next;
      }

      trace!("{}: {} {:?}", loc, op.name, args);
      instructions.push(Instruction { label: None, op, args, loc, position });
      rest = cursor;
    }

    Ok(Program { instructions, end: bytes.len(), end_label: None })
  }

  /// Turns offsets into label names and magic indices into magic names.
  /// Labels are named `L_0`, `L_1`, ... in the order their targets are first
  /// seen.
  pub fn infer_labels(&self, program: &mut Program<'s>) -> Result<(), DsmError> {
    let starts: HashMap<usize, usize> =
      program.instructions.iter().enumerate().map(|(index, i)| (i.position, index)).collect();
    let end = program.end;
    let mut names: HashMap<usize, String> = HashMap::new();
    let mut errors = Vec::new();

    for instruction in &mut program.instructions {
      let op = instruction.op;
      for (arg, value) in op.args.iter().zip(instruction.args.iter_mut()) {
        match arg.ty.kind() {
          NumKind::Offset(_) => {
            for scalar in value.scalars_mut() {
              let Scalar::Int(offset) = *scalar else {
                continue;
              };
              let target = instruction.position as i128 + offset;
              let aligned = usize::try_from(target).ok().filter(|t| starts.contains_key(t) || *t == end);
              match aligned {
                Some(target) => {
                  let next = names.len();
                  let name = names.entry(target).or_insert_with(|| format!("L_{}", next));
                  *scalar = Scalar::Name(name.clone());
                }
                None => errors.push(DsmError::Misaligned { loc: instruction.loc.clone(), offset, target }),
              }
            }
          }
          NumKind::Magic(_) => {
            for scalar in value.scalars_mut() {
              let Scalar::Int(index) = *scalar else {
                continue;
              };
              let magic = usize::try_from(index).ok().and_then(|i| self.spec.lookup_magic(i).ok());
              match magic {
                Some(magic) => *scalar = Scalar::Name(magic.name.clone()),
                None => errors.push(DsmError::UnknownMagic { loc: instruction.loc.clone(), index }),
              }
            }
          }
          _ => {}
        }
      }
    }

    DsmError::check(errors)?;

    for (position, name) in names {
      debug!("Label `{}` at position {}", name, position);
      match starts.get(&position) {
        Some(&index) => program.instructions[index].label = Some(name),
        None => program.end_label = Some(name),
      }
    }
    Ok(())
  }
}
