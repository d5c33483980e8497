use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser as ClapParser, Subcommand};
use env_logger::Env;
use log::{error, info};

use ssm_asm::common::{Bytecode, Listing, ReadableResource, WriteableResource};
use ssm_asm::{Assembler, Disassembler, cgen};
use ssm_common::Spec;

#[derive(ClapParser)]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Instruction set document (TOML). Defaults to the bundled SSM set.
  #[arg(long, global = true, env = "SSM_SPEC")]
  spec: Option<PathBuf>,

  /// Increase logging verbosity (-v, -vv, etc.)
  #[arg(short, long, global = true, action = clap::ArgAction::Count)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Assemble a source file into bytecode
  Asm {
    /// Input assembly file
    input: PathBuf,

    /// Output bytecode file [default: input with a .ssmb extension]
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Disassemble bytecode back into assembly text
  Dsm {
    /// Input bytecode file
    input: PathBuf,

    /// Output assembly file [default: stdout]
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// List the opcodes and magics of the instruction set
  Ops,
  /// Generate the VM C sources (ssm_ops.h, sw.c, jmptbl.c)
  Gen {
    /// Directory to write the files into
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let log_level = match cli.verbose {
    0 => "info",
    1 => "debug",
    _ => "trace",
  };
  env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      for line in e.to_string().lines() {
        error!("{}", line);
      }
      ExitCode::FAILURE
    }
  }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
  let spec = match &cli.spec {
    Some(path) => Spec::from_path(path)?,
    None => Spec::builtin()?,
  };

  match cli.command {
    Command::Asm { input, output } => {
      let output = output.unwrap_or_else(|| input.with_extension("ssmb"));
      info!("Assembling {} into {}", input.display(), output.display());

      let source = Listing::read_from_path(&input)?;
      let bytecode = Assembler::new(&spec).assemble(&input.display().to_string(), &source.0)?;
      Bytecode(bytecode).write_to_path(&output)?;
    }
    Command::Dsm { input, output } => {
      info!("Disassembling {}", input.display());

      let bytecode = Bytecode::read_from_path(&input)?;
      let text = Listing(Disassembler::new(&spec).disassemble(&input.display().to_string(), &bytecode.0)?);
      match output {
        Some(path) => text.write_to_path(path)?,
        None => text.write_to(&mut std::io::stdout().lock())?,
      }
    }
    Command::Ops => print_ops(&spec),
    Command::Gen { dir } => {
      for file in cgen::generate(&spec)? {
        let path = dir.join(file.name);
        info!("Writing {}", path.display());
        file.write_to_path(&path)?;
      }
    }
  }
  Ok(())
}

fn print_ops(spec: &Spec) {
  println!("Opcodes:");
  for op in spec.ops() {
    let args: Vec<String> = op
      .args
      .iter()
      .map(|arg| format!("{}: {}", arg.name, arg.ty))
      .collect();
    println!("  {:#04x} {:<10} {:<40} {}", op.index, op.name, args.join(", "), op.desc);
  }

  println!("Magics:");
  for magic in spec.magics() {
    println!("  {:>4} {:<12} {}", magic.index, magic.name, magic.desc);
  }
}
