use log::info;
use ssm_common::Spec;

use crate::error::AsmError;
use crate::parser::parse_program;

pub mod labels;
pub mod marshal;
pub mod refine;
pub mod translate;

pub use labels::{LabelEntry, LabelTable};
pub use marshal::marshal;

/// Turns assembly text into SSM bytecode: parse, refine, translate, marshal.
/// Each stage reports every error it finds, and a failed stage stops the run.
#[derive(Debug)]
pub struct Assembler<'s> {
  spec: &'s Spec,
  labels: LabelTable,
}

impl<'s> Assembler<'s> {
  pub fn new(spec: &'s Spec) -> Self {
    Self { spec, labels: LabelTable::new() }
  }

  pub fn assemble(&mut self, file: &str, source: &str) -> Result<Vec<u8>, AsmError> {
    self.labels.clear();

    info!("Parsing {}", file);
    let lines = parse_program(file, source)?;

    info!("Refining {} lines", lines.len());
    let mut program = self.refine(&lines)?;

    info!("Translating label references");
    self.translate(&mut program)?;

    info!("Marshalling {} instructions", program.instructions.len());
    marshal(&program)
  }

  /// Labels of the last assembled unit.
  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use ssm_common::{ArgType, NumKind, Width};

  fn spec() -> Spec {
    Spec::builder()
      .op("add", &[], "Add two integers")
      .op("jmp", &[("target", ArgType::Scalar(NumKind::Offset(Width::W2)))], "Jump")
      .build()
      .unwrap()
  }

  #[test]
  fn assembles_backward_jump() {
    let spec = spec();
    let bytes = Assembler::new(&spec).assemble("t.s", "start: ADD\n       JMP start\n").unwrap();
    assert_eq!(bytes, vec![0x00, 0x01, 0xFF, 0xFF]);
  }

  #[test]
  fn labels_reset_between_units() {
    let spec = spec();
    let mut assembler = Assembler::new(&spec);
    assembler.assemble("a.s", "start: ADD").unwrap();
    assert!(assembler.assemble("b.s", "start: JMP start").is_ok());
    assert_eq!(assembler.labels().len(), 1);
  }

  #[test]
  fn later_stages_do_not_run_after_a_failure() {
    let spec = spec();
    // The undefined label would only surface in translation.
    let err = Assembler::new(&spec).assemble("t.s", "JMP nowhere\nMUL").unwrap_err();
    assert!(matches!(err, AsmError::Spec { .. }));
  }
}
