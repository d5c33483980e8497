//! The type registry: every wire type an instruction argument can have, with
//! its little-endian layout, its value domain and its codec.

use std::fmt;

use log::trace;

use crate::error::TypeError;
use crate::value::{ArgValue, Scalar};

/// Byte width of an integer-like field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
  W1,
  W2,
  W4,
  W8,
}

impl Width {
  pub fn from_bytes(bytes: u8, class: &'static str) -> Result<Self, TypeError> {
    match bytes {
      1 => Ok(Width::W1),
      2 => Ok(Width::W2),
      4 => Ok(Width::W4),
      8 => Ok(Width::W8),
      _ => Err(TypeError::UndefinedWidth { class, bytes }),
    }
  }

  pub fn bytes(self) -> usize {
    match self {
      Width::W1 => 1,
      Width::W2 => 2,
      Width::W4 => 4,
      Width::W8 => 8,
    }
  }

  fn bits(self) -> u32 {
    self.bytes() as u32 * 8
  }
}

/// Byte width of an IEEE float field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
  F32,
  F64,
}

impl FloatWidth {
  pub fn from_bytes(bytes: u8) -> Result<Self, TypeError> {
    match bytes {
      4 => Ok(FloatWidth::F32),
      8 => Ok(FloatWidth::F64),
      _ => Err(TypeError::UndefinedWidth { class: "float", bytes }),
    }
  }

  pub fn bytes(self) -> usize {
    match self {
      FloatWidth::F32 => 4,
      FloatWidth::F64 => 8,
    }
  }

  /// Raw IEEE bits of `v` stored at this width.
  pub fn to_bits(self, v: f64) -> u64 {
    match self {
      FloatWidth::F32 => narrow(v).to_bits() as u64,
      FloatWidth::F64 => v.to_bits(),
    }
  }

  pub fn from_bits(self, bits: u64) -> f64 {
    match self {
      FloatWidth::F32 => widen(f32::from_bits(bits as u32)),
      FloatWidth::F64 => f64::from_bits(bits),
    }
  }

  /// Bits of the NaN written for a plain `nan`.
  pub fn canonical_nan(self) -> u64 {
    self.to_bits(f64::NAN)
  }

  /// The NaN with exactly these bits, which must fit the width and be a NaN.
  pub fn nan_from_bits(self, bits: u64) -> Result<f64, TypeError> {
    let fits = match self {
      FloatWidth::F32 => u32::try_from(bits).is_ok_and(|b| f32::from_bits(b).is_nan()),
      FloatWidth::F64 => f64::from_bits(bits).is_nan(),
    };
    if fits {
      Ok(self.from_bits(bits))
    } else {
      Err(TypeError::NotNan { bits, kind: NumKind::Float(self).to_string() })
    }
  }
}

const F32_PAYLOAD: u32 = 0x007f_ffff;
const F32_QUIET: u32 = 0x0040_0000;
/// Mantissa bits an f64 has beyond an f32.
const EXTRA_MANTISSA: u32 = 29;

/// `f32` to `f64`, moving a NaN's sign and payload bit for bit.
fn widen(v: f32) -> f64 {
  if v.is_nan() {
    let bits = v.to_bits();
    let sign = (bits >> 31) as u64;
    let payload = (bits & F32_PAYLOAD) as u64;
    f64::from_bits(sign << 63 | 0x7ffu64 << 52 | payload << EXTRA_MANTISSA)
  } else {
    v as f64
  }
}

/// Inverse of [`widen`]. A NaN whose payload lives only in the low f64
/// mantissa bits becomes the quiet f32 NaN of the same sign.
fn narrow(v: f64) -> f32 {
  if v.is_nan() {
    let bits = v.to_bits();
    let sign = (bits >> 63) as u32;
    let payload = match (bits >> EXTRA_MANTISSA) as u32 & F32_PAYLOAD {
      0 => F32_QUIET,
      payload => payload,
    };
    f32::from_bits(sign << 31 | 0xffu32 << 23 | payload)
  } else {
    v as f32
  }
}

/// A primitive wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumKind {
  SignedInt(Width),
  UnsignedInt(Width),
  Float(FloatWidth),
  /// Signed jump distance, relative to the start of the jumping instruction.
  Offset(Width),
  /// Unsigned index into the spec's magic table.
  Magic(Width),
}

impl NumKind {
  pub fn int(bytes: u8) -> Result<Self, TypeError> {
    Width::from_bytes(bytes, "int").map(NumKind::SignedInt)
  }

  pub fn uint(bytes: u8) -> Result<Self, TypeError> {
    Width::from_bytes(bytes, "uint").map(NumKind::UnsignedInt)
  }

  pub fn float(bytes: u8) -> Result<Self, TypeError> {
    FloatWidth::from_bytes(bytes).map(NumKind::Float)
  }

  pub fn offset(bytes: u8) -> Result<Self, TypeError> {
    Width::from_bytes(bytes, "offset").map(NumKind::Offset)
  }

  pub fn magic(bytes: u8) -> Result<Self, TypeError> {
    Width::from_bytes(bytes, "magic").map(NumKind::Magic)
  }

  pub fn width(self) -> usize {
    match self {
      NumKind::SignedInt(w) | NumKind::UnsignedInt(w) | NumKind::Offset(w) | NumKind::Magic(w) => {
        w.bytes()
      }
      NumKind::Float(w) => w.bytes(),
    }
  }

  /// Inclusive integer range, `None` for floats.
  pub fn range(self) -> Option<(i128, i128)> {
    match self {
      NumKind::SignedInt(w) | NumKind::Offset(w) => {
        let half = 1i128 << (w.bits() - 1);
        Some((-half, half - 1))
      }
      NumKind::UnsignedInt(w) | NumKind::Magic(w) => Some((0, (1i128 << w.bits()) - 1)),
      NumKind::Float(_) => None,
    }
  }

  fn is_signed(self) -> bool {
    matches!(self, NumKind::SignedInt(_) | NumKind::Offset(_))
  }

  pub fn check_bounds(self, value: &Scalar) -> Result<(), TypeError> {
    match (self, value) {
      (NumKind::Float(w), Scalar::Float(v)) => {
        if w == FloatWidth::F64 || v.is_nan() || (*v as f32) as f64 == *v {
          Ok(())
        } else {
          Err(TypeError::OutOfRange {
            value: format!("{:?}", v),
            min: format!("{:?}", f32::MIN),
            max: format!("{:?}", f32::MAX),
            kind: self.to_string(),
          })
        }
      }
      (NumKind::Float(_), other) => Err(self.shape_error(other)),
      (_, Scalar::Int(v)) => match self.range() {
        Some((min, max)) if (min..=max).contains(v) => Ok(()),
        Some((min, max)) => Err(TypeError::OutOfRange {
          value: v.to_string(),
          min: min.to_string(),
          max: max.to_string(),
          kind: self.to_string(),
        }),
        None => Err(self.shape_error(value)),
      },
      (_, other) => Err(self.shape_error(other)),
    }
  }

  /// Appends the little-endian encoding of `value`. The value is bounds-checked
  /// first; nothing is written when the check fails.
  pub fn pack(self, value: &Scalar, out: &mut Vec<u8>) -> Result<(), TypeError> {
    self.check_bounds(value)?;
    match (self, value) {
      (NumKind::Float(FloatWidth::F32), Scalar::Float(v)) => out.extend_from_slice(&narrow(*v).to_le_bytes()),
      (NumKind::Float(FloatWidth::F64), Scalar::Float(v)) => out.extend_from_slice(&v.to_le_bytes()),
      (_, Scalar::Int(v)) => {
        let bytes = (*v as u128).to_le_bytes();
        out.extend_from_slice(&bytes[..self.width()]);
      }
      (_, other) => return Err(self.shape_error(other)),
    }
    trace!("packed {} as {}", value, self);
    Ok(())
  }

  pub fn unpack(self, bytes: &[u8]) -> Result<(Scalar, &[u8]), TypeError> {
    let width = self.width();
    if bytes.len() < width {
      return Err(TypeError::Truncated {
        kind: self.to_string(),
        needed: width,
        available: bytes.len(),
      });
    }
    let (field, rest) = bytes.split_at(width);
    let value = match self {
      NumKind::Float(FloatWidth::F32) => {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(field);
        Scalar::Float(widen(f32::from_le_bytes(raw)))
      }
      NumKind::Float(FloatWidth::F64) => {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(field);
        Scalar::Float(f64::from_le_bytes(raw))
      }
      _ => {
        let mut raw = [0u8; 16];
        raw[..width].copy_from_slice(field);
        let raw = u128::from_le_bytes(raw);
        if self.is_signed() {
          let shift = 128 - 8 * width as u32;
          Scalar::Int(((raw << shift) as i128) >> shift)
        } else {
          Scalar::Int(raw as i128)
        }
      }
    };
    Ok((value, rest))
  }

  fn shape_error(self, found: &Scalar) -> TypeError {
    TypeError::Shape { kind: self.to_string(), found: found.shape() }
  }
}

impl fmt::Display for NumKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let prefix = match self {
      NumKind::SignedInt(_) => "i",
      NumKind::UnsignedInt(_) => "u",
      NumKind::Float(_) => "f",
      NumKind::Offset(_) => "o",
      NumKind::Magic(_) => "m",
    };
    write!(f, "{}{}", prefix, self.width() * 8)
  }
}

/// The declared type of an instruction argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
  Scalar(NumKind),
  /// Unsigned element count of width `len`, followed by that many elements.
  Array { len: Width, elem: NumKind },
}

impl ArgType {
  /// Arrays of unsigned bytes, which accept quoted strings in assembly text.
  pub fn is_bytes(&self) -> bool {
    matches!(self, ArgType::Array { elem: NumKind::UnsignedInt(Width::W1), .. })
  }

  /// The kind of the scalar, or of each array element.
  pub fn kind(&self) -> NumKind {
    match self {
      ArgType::Scalar(kind) => *kind,
      ArgType::Array { elem, .. } => *elem,
    }
  }

  pub fn encoded_size(&self, value: &ArgValue) -> Result<usize, TypeError> {
    match (self, value) {
      (ArgType::Scalar(kind), ArgValue::Scalar(_)) => Ok(kind.width()),
      (ArgType::Array { len, elem }, ArgValue::Array(items)) => Ok(len.bytes() + items.len() * elem.width()),
      _ => Err(self.shape_error(value)),
    }
  }

  pub fn check_bounds(&self, value: &ArgValue) -> Result<(), TypeError> {
    match (self, value) {
      (ArgType::Scalar(kind), ArgValue::Scalar(v)) => kind.check_bounds(v),
      (ArgType::Array { elem, .. }, ArgValue::Array(items)) => {
        self.check_len(items.len())?;
        items.iter().try_for_each(|item| elem.check_bounds(item))
      }
      _ => Err(self.shape_error(value)),
    }
  }

  pub fn pack(&self, value: &ArgValue, out: &mut Vec<u8>) -> Result<(), TypeError> {
    match (self, value) {
      (ArgType::Scalar(kind), ArgValue::Scalar(v)) => kind.pack(v, out),
      (ArgType::Array { len, elem }, ArgValue::Array(items)) => {
        self.check_len(items.len())?;
        NumKind::UnsignedInt(*len).pack(&Scalar::Int(items.len() as i128), out)?;
        items.iter().try_for_each(|item| elem.pack(item, out))
      }
      _ => Err(self.shape_error(value)),
    }
  }

  pub fn unpack<'b>(&self, bytes: &'b [u8]) -> Result<(ArgValue, &'b [u8]), TypeError> {
    match self {
      ArgType::Scalar(kind) => {
        let (value, rest) = kind.unpack(bytes)?;
        Ok((ArgValue::Scalar(value), rest))
      }
      ArgType::Array { len, elem } => {
        let (count, mut rest) = NumKind::UnsignedInt(*len).unpack(bytes)?;
        let count = count.as_int().unwrap_or_default() as usize;
        let needed = count.saturating_mul(elem.width());
        if rest.len() < needed {
          return Err(TypeError::Truncated {
            kind: self.to_string(),
            needed,
            available: rest.len(),
          });
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
          let (item, next) = elem.unpack(rest)?;
          items.push(item);
          rest = next;
        }
        Ok((ArgValue::Array(items), rest))
      }
    }
  }

  /// Checks that `count` elements fit the length prefix. Scalars always pass.
  pub fn check_len(&self, count: usize) -> Result<(), TypeError> {
    match self {
      ArgType::Scalar(_) => Ok(()),
      ArgType::Array { len, .. } => NumKind::UnsignedInt(*len)
        .check_bounds(&Scalar::Int(count as i128))
        .map_err(|_| TypeError::ArrayTooLong { count, bytes: len.bytes() }),
    }
  }

  fn shape_error(&self, found: &ArgValue) -> TypeError {
    TypeError::Shape { kind: self.to_string(), found: found.shape() }
  }
}

impl fmt::Display for ArgType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ArgType::Scalar(kind) => write!(f, "{}", kind),
      ArgType::Array { len, elem } => write!(f, "[{}; u{}]", elem, len.bits()),
    }
  }
}
