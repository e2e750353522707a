// dict-compile: Compile word/stem/tag lines into a dictionary.
//
// Reads `word<TAB>stem<TAB>tag` lines from a file or stdin and writes
// OUT.dict plus OUT.info next to it.
//
// Usage:
//   dict-compile -o OUT.dict [OPTIONS] [INPUT]
//
// Options:
//   -o, --output PATH       Dictionary file to write (required)
//   -e, --encoder KIND      none, suffix, prefix, infix or auto (default: suffix)
//   -s, --separator CHAR    Separator byte (default: +)
//   -f, --format FORMAT     fsa5 or cfsa2 (default: cfsa2)
//   --numbers               Store right-language counts
//   -h, --help              Print help

use std::path::Path;

use lexfsa_core::EncoderKind;
use lexfsa_dict::{DictionaryCompiler, DictionaryMetadata};
use lexfsa_fsa::FsaFormat;

fn main() {
    lexfsa_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if lexfsa_cli::wants_help(&args) {
        println!("dict-compile: Compile word/stem/tag lines into a dictionary.");
        println!();
        println!("Usage: dict-compile -o OUT.dict [OPTIONS] [INPUT]");
        println!();
        println!("Reads word<TAB>stem<TAB>tag lines from INPUT (or stdin) and writes");
        println!("OUT.dict and its metadata file OUT.info.");
        println!();
        println!("Options:");
        println!("  -o, --output PATH       Dictionary file to write (required)");
        println!("  -e, --encoder KIND      none, suffix, prefix, infix or auto (default: suffix)");
        println!("  -s, --separator CHAR    Separator byte (default: +)");
        println!("  -f, --format FORMAT     fsa5 or cfsa2 (default: cfsa2)");
        println!("  --numbers               Store right-language counts");
        println!("  -h, --help              Print this help");
        return;
    }

    let (numbers, args) = lexfsa_cli::take_flag(&args, &["--numbers"]);
    let option = |args: &[String], names: &[&str]| {
        lexfsa_cli::take_option(args, names).unwrap_or_else(|e| lexfsa_cli::fatal(&e))
    };
    let (output, args) = option(&args, &["-o", "--output"]);
    let (encoder, args) = option(&args, &["-e", "--encoder"]);
    let (separator, args) = option(&args, &["-s", "--separator"]);
    let (format, args) = option(&args, &["-f", "--format"]);
    let input = lexfsa_cli::single_input(&args).unwrap_or_else(|e| lexfsa_cli::fatal(&e));
    let output = output.unwrap_or_else(|| lexfsa_cli::fatal("missing -o OUT.dict"));

    let lines = lexfsa_cli::open_input(input.as_deref())
        .and_then(lexfsa_cli::read_lines)
        .unwrap_or_else(|e| lexfsa_cli::fatal(&format!("failed to read input: {e}")));
    let entries: Vec<[&[u8]; 3]> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let mut fields = line.splitn(3, |&b| b == b'\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(word), Some(stem), Some(tag)) => [word, stem, tag],
                _ => lexfsa_cli::fatal(&format!(
                    "line {}: expected word<TAB>stem<TAB>tag",
                    i + 1
                )),
            }
        })
        .collect();

    let mut metadata = DictionaryMetadata::new().with_numbers(numbers);
    if let Some(format) = format {
        let format: FsaFormat = format
            .parse()
            .unwrap_or_else(|e: String| lexfsa_cli::fatal(&e));
        metadata = metadata.with_format(format);
    }
    if let Some(separator) = separator {
        match separator.as_bytes() {
            &[byte] => metadata = metadata.with_separator(byte),
            _ => lexfsa_cli::fatal(&format!("separator must be one byte, got {separator:?}")),
        }
    }
    let encoder = match encoder.as_deref() {
        None => EncoderKind::default(),
        Some(kind) if kind.eq_ignore_ascii_case("auto") => {
            let pairs = entries.iter().map(|[word, stem, _]| (*word, *stem));
            let best = EncoderKind::best_for(pairs);
            log::info!("selected {best} encoder");
            best
        }
        Some(kind) => kind
            .parse()
            .unwrap_or_else(|e: lexfsa_core::EncoderError| lexfsa_cli::fatal(&e.to_string())),
    };
    metadata = metadata.with_encoder(encoder);

    let mut compiler =
        DictionaryCompiler::new(metadata).unwrap_or_else(|e| lexfsa_cli::fatal(&e.to_string()));
    for (i, [word, stem, tag]) in entries.iter().enumerate() {
        if let Err(e) = compiler.add(word, stem, tag) {
            lexfsa_cli::fatal(&format!("line {}: {e}", i + 1));
        }
    }
    let count = compiler.len();
    compiler
        .compile_to_path(Path::new(&output))
        .unwrap_or_else(|e| lexfsa_cli::fatal(&e.to_string()));
    log::info!("compiled {count} entries into {output}");
}
