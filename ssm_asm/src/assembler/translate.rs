//! Second pass: replace label references with signed distances measured from
//! the start of the referring instruction.

use log::{info, trace};
use ssm_common::{NumKind, Scalar};

use super::Assembler;
use crate::ast::Program;
use crate::error::AsmError;

impl<'s> Assembler<'s> {
  pub fn translate(&self, program: &mut Program<'s>) -> Result<(), AsmError> {
    let mut errors = Vec::new();
    let mut resolved = 0;

    for instruction in &mut program.instructions {
      let op = instruction.op;
      for (arg, value) in op.args.iter().zip(instruction.args.iter_mut()) {
        let kind = arg.ty.kind();
        if !matches!(kind, NumKind::Offset(_)) {
          continue;
        }

        for scalar in value.scalars_mut() {
          let Scalar::Name(label) = scalar else {
            continue;
          };
          let Some(entry) = self.labels.get(label) else {
            errors.push(AsmError::UndefinedLabel { label: label.clone(), loc: instruction.loc.clone() });
            continue;
          };

          let distance = Scalar::Int(entry.position as i128 - instruction.position as i128);
          match kind.check_bounds(&distance) {
            Ok(()) => {
              trace!("{}: `{}` -> {}", instruction.loc, label, distance);
              *scalar = distance;
              resolved += 1;
            }
            Err(source) => errors.push(AsmError::Bounds { loc: instruction.loc.clone(), source }),
          }
        }
      }
    }

    AsmError::check(errors)?;
    info!("Resolved {} label references", resolved);
    Ok(())
  }
}
