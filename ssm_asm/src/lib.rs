//! Assembler and disassembler for SSM bytecode.
//!
//! Both directions are driven by a [`Spec`] borrowed for the duration of a
//! run. Errors from every line or instruction of a stage are collected and
//! returned together.

pub mod assembler;
pub mod ast;
pub mod cgen;
pub mod common;
pub mod disassembler;
pub mod error;
pub mod parser;

pub use assembler::{Assembler, LabelTable};
pub use disassembler::Disassembler;
pub use error::{AsmError, DsmError};

use ssm_common::Spec;

pub fn assemble(spec: &Spec, source: &str) -> Result<Vec<u8>, AsmError> {
  Assembler::new(spec).assemble("<input>", source)
}

pub fn disassemble(spec: &Spec, bytes: &[u8]) -> Result<String, DsmError> {
  Disassembler::new(spec).disassemble("<input>", bytes)
}
