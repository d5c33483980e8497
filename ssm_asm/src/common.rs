use std::io::{Read, Write};

pub trait WriteableResource {
  fn write_to(&self, writer: &mut dyn Write) -> std::io::Result<()>;

  fn write_to_path<P: AsRef<std::path::Path>>(&self, path: P) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    self.write_to(&mut file)
  }
}

pub trait ReadableResource {
  fn read_from(reader: &mut dyn Read) -> std::io::Result<Self>
  where
    Self: Sized;

  fn read_from_path<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self>
  where
    Self: Sized,
  {
    let mut file = std::fs::File::open(path)?;
    Self::read_from(&mut file)
  }
}

/// An SSM instruction stream. The file holds the raw concatenated
/// instructions, with no header or trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bytecode(pub Vec<u8>);

impl WriteableResource for Bytecode {
  fn write_to(&self, writer: &mut dyn Write) -> std::io::Result<()> {
    writer.write_all(&self.0)?;
    writer.flush()
  }
}

impl ReadableResource for Bytecode {
  fn read_from(reader: &mut dyn Read) -> std::io::Result<Self> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;
    Ok(Bytecode(buffer))
  }
}

/// Assembly text, as read from a source file or produced by the
/// disassembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing(pub String);

impl WriteableResource for Listing {
  fn write_to(&self, writer: &mut dyn Write) -> std::io::Result<()> {
    writer.write_all(self.0.as_bytes())?;
    writer.flush()
  }
}

impl ReadableResource for Listing {
  fn read_from(reader: &mut dyn Read) -> std::io::Result<Self> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(Listing(text))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bytecode_is_written_verbatim() {
    let code = Bytecode(vec![0x00, 0x01, 0xFE, 0xFF]);
    let mut out = Vec::new();
    code.write_to(&mut out).unwrap();
    assert_eq!(out, code.0);
    let back = Bytecode::read_from(&mut out.as_slice()).unwrap();
    assert_eq!(back, code);
  }

  #[test]
  fn listing_rejects_invalid_utf8() {
    let bytes: &[u8] = &[b'A', 0xFF];
    assert!(Listing::read_from(&mut &bytes[..]).is_err());
  }
}
