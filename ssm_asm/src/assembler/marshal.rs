use log::{info, trace};

use crate::ast::Program;
use crate::error::AsmError;

/// Emits each instruction's opcode byte followed by its packed arguments.
pub fn marshal(program: &Program<'_>) -> Result<Vec<u8>, AsmError> {
  let mut out = Vec::with_capacity(program.end);
  let mut errors = Vec::new();

  for instruction in &program.instructions {
    trace!("{}: {} at byte {}", instruction.loc, instruction.op.name, out.len());
    out.push(instruction.op.index);
    for (arg, value) in instruction.op.args.iter().zip(&instruction.args) {
      if let Err(source) = arg.ty.pack(value, &mut out) {
        errors.push(AsmError::Bounds { loc: instruction.loc.clone(), source });
      }
    }
  }

  AsmError::check(errors)?;
  info!("Marshalled {} instructions into {} bytes", program.instructions.len(), out.len());
  Ok(out)
}
