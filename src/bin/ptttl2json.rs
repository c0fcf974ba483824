//! PTTTL/RTTTL to JSON converter

use clap::Parser;
use env_logger::Env;
use ptttl::json::SongJson;
use ptttl::parser::{decompress_if_gzip, FileSource, InputSource, MemorySource};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ptttl2json")]
#[command(version = "0.1.0")]
#[command(about = "Dump the notes of a PTTTL/RTTTL file as JSON", long_about = None)]
struct Args {
    /// Input PTTTL/RTTTL file, optionally gzipped (reads from stdin if not specified)
    input: Option<PathBuf>,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print one line instead of indented JSON
    #[arg(short, long)]
    compact: bool,
}

fn main() -> Result<(), ptttl::Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    match &args.input {
        Some(path) => dump(FileSource::open(path)?, &args),
        None => {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data)?;
            dump(MemorySource::new(decompress_if_gzip(data)?), &args)
        }
    }
}

fn dump<S: InputSource>(source: S, args: &Args) -> Result<(), ptttl::Error> {
    let mut parser = ptttl::Parser::new(source)?;
    let song = SongJson::from_parser(&mut parser)?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    if args.compact {
        serde_json::to_writer(&mut out, &song)?;
    } else {
        serde_json::to_writer_pretty(&mut out, &song)?;
    }
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
