//! Shared definitions for the SSM toolchain: the wire type registry, argument
//! values and the instruction spec that drives both the assembler and the
//! disassembler.

pub mod document;
pub mod error;
pub mod spec;
pub mod types;
pub mod value;

pub use error::{SpecError, TypeError};
pub use spec::{Arg, Key, Magic, Op, Spec, SpecBuilder};
pub use types::{ArgType, FloatWidth, NumKind, Width};
pub use value::{ArgValue, Scalar};
