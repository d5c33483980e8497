use proptest::prelude::*;
use ssm_asm::{AsmError, assemble, disassemble};
use ssm_common::{ArgType, ArgValue, FloatWidth, NumKind, Op, Scalar, Spec};

/// A generated instruction: which opcode, and a pool of seeds its arguments
/// draw from.
type Pick = (usize, Vec<u64>);

fn value(spec: &Spec, kind: NumKind, seed: u64, count: usize) -> Scalar {
  match kind {
    NumKind::SignedInt(_) | NumKind::UnsignedInt(_) => {
      let (min, max) = kind.range().unwrap();
      Scalar::Int(min + (seed as i128) % (max - min + 1))
    }
    // Any bit pattern, NaNs and infinities included.
    NumKind::Float(FloatWidth::F32) => Scalar::Float(FloatWidth::F32.from_bits(seed as u32 as u64)),
    NumKind::Float(FloatWidth::F64) => Scalar::Float(FloatWidth::F64.from_bits(seed)),
    NumKind::Magic(_) => Scalar::Int((seed % spec.magics().len() as u64) as i128),
    // Index of the target instruction, where `count` is the end.
    NumKind::Offset(_) => Scalar::Int((seed % (count as u64 + 1)) as i128),
  }
}

/// Encodes a well-formed instruction stream for `picks` over `spec`.
fn build(spec: &Spec, picks: &[Pick]) -> Vec<u8> {
  let count = picks.len();
  let program: Vec<(&Op, Vec<ArgValue>)> = picks
    .iter()
    .map(|(selector, seeds)| {
      let op = &spec.ops()[selector % spec.ops().len()];
      let mut seeds = seeds.iter().copied().cycle();
      let args = op
        .args
        .iter()
        .map(|arg| match arg.ty {
          ArgType::Scalar(kind) => ArgValue::Scalar(value(spec, kind, seeds.next().unwrap(), count)),
          ArgType::Array { elem, .. } => {
            let len = seeds.next().unwrap() % 6;
            ArgValue::Array((0..len).map(|_| value(spec, elem, seeds.next().unwrap(), count)).collect())
          }
        })
        .collect();
      (op, args)
    })
    .collect();

  let mut positions = vec![0i128];
  for (op, args) in &program {
    let size: usize = op.args.iter().zip(args).map(|(arg, v)| arg.ty.encoded_size(v).unwrap()).sum();
    positions.push(positions[positions.len() - 1] + 1 + size as i128);
  }

  let mut out = Vec::new();
  for (index, (op, args)) in program.iter().enumerate() {
    out.push(op.index);
    for (arg, value) in op.args.iter().zip(args) {
      let mut value = value.clone();
      if let NumKind::Offset(_) = arg.ty.kind() {
        for scalar in value.scalars_mut() {
          let target = scalar.as_int().unwrap() as usize;
          *scalar = Scalar::Int(positions[target] - positions[index]);
        }
      }
      arg.ty.pack(&value, &mut out).unwrap();
    }
  }
  out
}

fn picks() -> impl Strategy<Value = Vec<Pick>> {
  prop::collection::vec((any::<usize>(), prop::collection::vec(any::<u64>(), 1..8)), 0..40)
}

proptest! {
  #[test]
  fn assemble_inverts_disassemble(picks in picks()) {
    let spec = Spec::builtin().unwrap();
    let bytes = build(&spec, &picks);
    let text = disassemble(&spec, &bytes).unwrap();
    let again = assemble(&spec, &text).unwrap();
    prop_assert_eq!(again, bytes, "listing:\n{}", text);
  }

  #[test]
  fn pushi_accepts_exactly_the_i32_range(v in -(1i64 << 33)..(1i64 << 33)) {
    let spec = Spec::builtin().unwrap();
    let result = assemble(&spec, &format!("PUSHI {}", v));
    if i32::try_from(v).is_ok() {
      let bytes = result.unwrap();
      prop_assert_eq!(&bytes[1..], &(v as i32).to_le_bytes()[..]);
    } else {
      prop_assert!(
        matches!(result, Err(AsmError::Bounds { .. })),
        "expected a bounds error, got {:?}",
        result
      );
    }
  }

  #[test]
  fn float_bits_survive_disassembly(bits in any::<u32>()) {
    let spec = Spec::builtin().unwrap();
    let mut bytes = vec![spec.lookup_op("PUSHF").unwrap().index];
    bytes.extend_from_slice(&bits.to_le_bytes());
    let text = disassemble(&spec, &bytes).unwrap();
    prop_assert_eq!(assemble(&spec, &text).unwrap(), bytes, "listing:\n{}", text);
  }

  #[test]
  fn offsets_encode_target_minus_position(gap in 0usize..200, back in any::<bool>()) {
    let spec = Spec::builtin().unwrap();
    let filler = "NOP\n".repeat(gap);
    let source = if back {
      format!("top:\n{}JMP top\n", filler)
    } else {
      format!("JMP bottom\n{}bottom:\n", filler)
    };
    let bytes = assemble(&spec, &source).unwrap();
    let jmp = if back { gap } else { 0 };
    let offset = i32::from_le_bytes([bytes[jmp + 1], bytes[jmp + 2], bytes[jmp + 3], bytes[jmp + 4]]);
    let expected = if back { -(gap as i32) } else { 5 + gap as i32 };
    prop_assert_eq!(offset, expected);
  }
}
