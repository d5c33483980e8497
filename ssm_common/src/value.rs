use std::fmt;

/// A single argument value or array element.
///
/// `Name` is a symbolic value: a label reference standing in for an offset, or
/// a magic name standing in for its index. Names never reach the wire; they are
/// resolved to `Int` before packing and produced again when disassembling.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
  Int(i128),
  Float(f64),
  Name(String),
}

impl Scalar {
  pub fn shape(&self) -> &'static str {
    match self {
      Scalar::Int(_) => "an integer",
      Scalar::Float(_) => "a float",
      Scalar::Name(_) => "a name",
    }
  }

  pub fn as_int(&self) -> Option<i128> {
    match self {
      Scalar::Int(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_name(&self) -> Option<&str> {
    match self {
      Scalar::Name(n) => Some(n),
      _ => None,
    }
  }
}

impl fmt::Display for Scalar {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Scalar::Int(v) => write!(f, "{}", v),
      Scalar::Float(v) => write!(f, "{:?}", v),
      Scalar::Name(n) => write!(f, "{}", n),
    }
  }
}

/// The value supplied for one instruction argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
  Scalar(Scalar),
  Array(Vec<Scalar>),
}

impl ArgValue {
  pub fn int(v: i128) -> Self {
    ArgValue::Scalar(Scalar::Int(v))
  }

  pub fn float(v: f64) -> Self {
    ArgValue::Scalar(Scalar::Float(v))
  }

  pub fn name(n: impl Into<String>) -> Self {
    ArgValue::Scalar(Scalar::Name(n.into()))
  }

  pub fn bytes(data: &[u8]) -> Self {
    ArgValue::Array(data.iter().map(|b| Scalar::Int(*b as i128)).collect())
  }

  pub fn shape(&self) -> &'static str {
    match self {
      ArgValue::Scalar(s) => s.shape(),
      ArgValue::Array(_) => "an array",
    }
  }

  /// The scalar itself, or every array element.
  pub fn scalars(&self) -> std::slice::Iter<'_, Scalar> {
    match self {
      ArgValue::Scalar(s) => std::slice::from_ref(s).iter(),
      ArgValue::Array(items) => items.iter(),
    }
  }

  pub fn scalars_mut(&mut self) -> std::slice::IterMut<'_, Scalar> {
    match self {
      ArgValue::Scalar(s) => std::slice::from_mut(s).iter_mut(),
      ArgValue::Array(items) => items.iter_mut(),
    }
  }
}
