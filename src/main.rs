use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use snafu::ResultExt;

use jackc::error::{ReadInputSnafu, WriteOutputSnafu};
use jackc::{compile_source, CompileResult};

/// Compile one source file, writing `<stem>.vm` next to it.
fn compile_file(path: &Path) -> CompileResult<()> {
  let label = path.display().to_string();
  let source = fs::read_to_string(path).context(ReadInputSnafu { path: label.as_str() })?;

  let output = compile_source(&label, &source)?;

  let out_path = path.with_extension("vm");
  fs::write(&out_path, output).context(WriteOutputSnafu {
    path: out_path.display().to_string(),
  })?;
  Ok(())
}

/// Collect the `.jack` files of a directory in sorted order so batch runs
/// are deterministic.
fn jack_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  for entry in fs::read_dir(dir)? {
    let path = entry?.path();
    if path.is_file() && path.extension().map(|ext| ext == "jack").unwrap_or(false) {
      files.push(path);
    }
  }
  files.sort();
  Ok(files)
}

fn run(path: &Path) -> CompileResult<()> {
  if path.is_dir() {
    let label = path.display().to_string();
    let files = jack_files(path).context(ReadInputSnafu { path: label.as_str() })?;
    // Units compile strictly in sequence; the first failure aborts the
    // whole batch.
    for file in files {
      compile_file(&file)?;
    }
    Ok(())
  } else {
    compile_file(path)
  }
}

fn main() {
  let args: Vec<String> = env::args().collect();
  if args.len() != 2 {
    let program = args.first().map(String::as_str).unwrap_or("jackc");
    eprintln!("usage: {program} <file.jack | folder>");
    // Historical behavior: a usage error still exits 0.
    return;
  }

  if let Err(err) = run(Path::new(&args[1])) {
    eprintln!("{err}");
    process::exit(1);
  }
}
