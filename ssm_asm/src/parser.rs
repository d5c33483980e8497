use std::sync::Arc;

use log::{debug, info};
use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::ast::{Line, Location, RawArg, Statement, Token};
use crate::error::AsmError;

#[derive(Parser)]
#[grammar = "grammar/ssm_asm.pest"]
pub struct SsmAsmParser;

/// Parses every line of `source`. Blank and comment-only lines produce
/// nothing but still count towards line numbers. Syntax errors from all lines
/// are reported together.
pub fn parse_program(file: &str, source: &str) -> Result<Vec<Line>, AsmError> {
  let file: Arc<str> = Arc::from(file);
  let mut lines = Vec::new();
  let mut errors = Vec::new();

  for (index, text) in source.lines().enumerate() {
    let loc = Location::Line { file: file.clone(), line: index + 1 };
    match parse_line(text, loc) {
      Ok(Some(line)) => lines.push(line),
      Ok(None) => {}
      Err(e) => errors.push(e),
    }
  }

  AsmError::check(errors)?;
  info!("Parsed {} lines from {}", lines.len(), file);
  Ok(lines)
}

pub fn parse_line(text: &str, loc: Location) -> Result<Option<Line>, AsmError> {
  let mut pairs = SsmAsmParser::parse(Rule::line, text).map_err(|e| syntax_error(&e, &loc))?;
  let Some(line) = pairs.next() else {
    return Ok(None);
  };

  let mut label = None;
  let mut statement = None;
  for item in line.into_inner() {
    match item.as_rule() {
      Rule::label => {
        let name = item.into_inner().next().map(|ident| ident.as_str().to_string()).unwrap_or_default();
        if SsmAsmParser::parse(Rule::number, &name).is_ok() {
          return Err(syntax(&loc, format!("label `{}` reads as a number", name)));
        }
        label = Some(name);
      }
      Rule::statement => statement = Some(item),
      _ => {}
    }
  }

  match (label, statement) {
    (None, None) => Ok(None),
    (Some(label), None) => {
      debug!("{}: label `{}`", loc, label);
      Ok(Some(Line::LabelOnly { label, loc }))
    }
    (label, Some(statement)) => {
      let mut inner = statement.into_inner();
      let opcode = inner.next().map(|p| p.as_str().to_string()).unwrap_or_default();
      let args = match inner.next() {
        Some(args) => args
          .into_inner()
          .map(|arg| parse_arg(arg, &loc))
          .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
      };
      debug!("{}: {} with {} argument(s)", loc, opcode, args.len());
      Ok(Some(Line::Statement(Statement { label, opcode, args, loc })))
    }
  }
}

fn parse_arg(pair: Pair<Rule>, loc: &Location) -> Result<RawArg, AsmError> {
  let mut tokens = Vec::new();
  for token in pair.into_inner() {
    match token.as_rule() {
      Rule::empty => return Ok(RawArg::Empty),
      Rule::float => tokens.push(Token::Float(token.as_str().to_string())),
      Rule::integer => tokens.push(Token::Int(parse_int(token.as_str(), loc)?)),
      Rule::nan_bits => tokens.push(Token::NanBits(parse_nan_bits(token.as_str(), loc)?)),
      Rule::string => {
        let body = token.into_inner().next().map(|b| b.as_str().as_bytes().to_vec());
        tokens.push(Token::Str(body.unwrap_or_default()));
      }
      Rule::unterminated => return Err(syntax(loc, "unterminated string literal")),
      Rule::ident => tokens.push(Token::Ident(token.as_str().to_string())),
      rule => return Err(syntax(loc, format!("unexpected {:?} in argument", rule))),
    }
  }
  Ok(RawArg::Tokens(tokens))
}

fn parse_int(text: &str, loc: &Location) -> Result<i128, AsmError> {
  let (negative, unsigned) = match text.as_bytes().first() {
    Some(b'-') => (true, &text[1..]),
    Some(b'+') => (false, &text[1..]),
    _ => (false, text),
  };
  let lower = unsigned.to_ascii_lowercase();
  let (radix, digits) = if let Some(hex) = lower.strip_prefix("0x") {
    (16, hex)
  } else if let Some(oct) = lower.strip_prefix("0o") {
    (8, oct)
  } else if let Some(bin) = lower.strip_prefix("0b") {
    (2, bin)
  } else {
    (10, lower.as_str())
  };

  let magnitude = i128::from_str_radix(digits, radix)
    .map_err(|_| syntax(loc, format!("integer literal `{}` is too large", text)))?;
  Ok(if negative { -magnitude } else { magnitude })
}

fn parse_nan_bits(text: &str, loc: &Location) -> Result<u64, AsmError> {
  // `nan:0x` is six ASCII bytes in any case.
  u64::from_str_radix(&text[6..], 16).map_err(|_| syntax(loc, format!("NaN bits `{}` are too large", text)))
}

fn syntax(loc: &Location, msg: impl Into<String>) -> AsmError {
  AsmError::Syntax { loc: loc.clone(), msg: msg.into() }
}

fn syntax_error(err: &pest::error::Error<Rule>, loc: &Location) -> AsmError {
  let column = match err.line_col {
    LineColLocation::Pos((_, column)) | LineColLocation::Span((_, column), _) => column,
  };
  syntax(loc, format!("column {}: {}", column, err.variant.message()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(asm: &str) -> Vec<Line> {
    parse_program("test.s", asm).unwrap()
  }

  fn statement(line: &Line) -> &Statement {
    match line {
      Line::Statement(statement) => statement,
      _ => panic!("Expected statement, got {:?}", line),
    }
  }

  fn tokens(tokens: Vec<Token>) -> RawArg {
    RawArg::Tokens(tokens)
  }

  #[test]
  fn parse_zero_arg_instruction() {
    let lines = parse("HALT");
    assert_eq!(lines.len(), 1);
    let stmt = statement(&lines[0]);
    assert_eq!(stmt.opcode, "HALT");
    assert!(stmt.args.is_empty());
    assert_eq!(stmt.label, None);
  }

  #[test]
  fn parse_label_only() {
    let lines = parse("start:");
    assert!(matches!(&lines[0], Line::LabelOnly { label, .. } if label == "start"));
  }

  #[test]
  fn parse_label_prefixed_instruction() {
    let lines = parse("start: JMP start\n");
    assert_eq!(lines.len(), 1);
    let stmt = statement(&lines[0]);
    assert_eq!(stmt.label.as_deref(), Some("start"));
    assert_eq!(stmt.opcode, "JMP");
    assert_eq!(stmt.args, vec![tokens(vec![Token::Ident("start".into())])]);
  }

  #[test]
  fn parse_integer_radixes() {
    let lines = parse("OP 42, -0x10, 0o17, +0b101, 0XfF");
    assert_eq!(
      statement(&lines[0]).args,
      vec![
        tokens(vec![Token::Int(42)]),
        tokens(vec![Token::Int(-16)]),
        tokens(vec![Token::Int(15)]),
        tokens(vec![Token::Int(5)]),
        tokens(vec![Token::Int(255)]),
      ]
    );
  }

  #[test]
  fn parse_floats_keep_their_text() {
    let lines = parse("PUSHF -1.5e3");
    assert_eq!(statement(&lines[0]).args, vec![tokens(vec![Token::Float("-1.5e3".into())])]);
  }

  #[test]
  fn whitespace_groups_tokens_into_one_argument() {
    let lines = parse("LONG \"hi\" 0x0a 33, next");
    let stmt = statement(&lines[0]);
    assert_eq!(
      stmt.args,
      vec![
        tokens(vec![Token::Str(b"hi".to_vec()), Token::Int(10), Token::Int(33)]),
        tokens(vec![Token::Ident("next".into())]),
      ]
    );
  }

  #[test]
  fn strings_keep_semicolons_and_raw_bytes() {
    let lines = parse(r#"LONG "a;b\n" ; trailing"#);
    assert_eq!(statement(&lines[0]).args, vec![tokens(vec![Token::Str(br"a;b\n".to_vec())])]);
  }

  #[test]
  fn empty_brackets_are_an_empty_array() {
    let lines = parse("LONG []");
    assert_eq!(statement(&lines[0]).args, vec![RawArg::Empty]);
  }

  #[test]
  fn parse_instruction_with_comment() {
    let lines = parse("ADD ; this is a comment");
    assert_eq!(statement(&lines[0]).opcode, "ADD");
    assert!(statement(&lines[0]).args.is_empty());
  }

  #[test]
  fn blank_and_comment_lines_still_count() {
    let lines = parse("\n  ; header\n\nADD\n\n  SUB  \n");
    assert_eq!(lines.len(), 2);
    let locs: Vec<_> = lines.iter().map(|l| statement(l).loc.to_string()).collect();
    assert_eq!(locs, vec!["test.s:4", "test.s:6"]);
  }

  #[test]
  fn unterminated_string_is_a_syntax_error() {
    let err = parse_program("test.s", "LONG \"abc").unwrap_err();
    assert!(matches!(err, AsmError::Syntax { ref msg, .. } if msg.contains("unterminated")));
  }

  #[test]
  fn syntax_errors_are_collected_from_every_line() {
    let err = parse_program("test.s", "ADD 1,\nNOP\nJMP ,x\n").unwrap_err();
    let lines: Vec<_> = err
      .errors()
      .iter()
      .map(|e| match e {
        AsmError::Syntax { loc, .. } => loc.to_string(),
        other => panic!("Expected syntax error, got {:?}", other),
      })
      .collect();
    assert_eq!(lines, vec!["test.s:1", "test.s:3"]);
  }

  #[test]
  fn oversized_integer_is_a_syntax_error() {
    let err = parse_program("test.s", "PUSHI 0x1000000000000000000000000000000000").unwrap_err();
    assert!(matches!(err, AsmError::Syntax { .. }));
  }

  #[test]
  fn nan_bits_are_hex_after_the_prefix() {
    let lines = parse("PUSHF NaN:0x7FC00001");
    assert_eq!(statement(&lines[0]).args, vec![tokens(vec![Token::NanBits(0x7fc0_0001)])]);
    let err = parse_program("test.s", "PUSHF nan:0x10000000000000000").unwrap_err();
    assert!(matches!(err, AsmError::Syntax { ref msg, .. } if msg.contains("too large")));
  }

  #[test]
  fn number_shaped_labels_are_rejected() {
    for source in ["10: NOP", "-5:", "0x1f: ADD", "1.5:"] {
      let err = parse_program("test.s", source).unwrap_err();
      assert!(
        matches!(err, AsmError::Syntax { ref msg, .. } if msg.contains("reads as a number")),
        "{}: {:?}",
        source,
        err
      );
    }
    assert!(parse_program("test.s", "l10: NOP
10x:
nan:").is_ok());
  }

  #[test]
  fn names_may_look_like_signed_words() {
    let lines = parse("PUSHF -inf");
    assert_eq!(statement(&lines[0]).args, vec![tokens(vec![Token::Ident("-inf".into())])]);
  }
}
