// fsa-build: Build a minimal automaton from a list of sequences.
//
// Reads one sequence per line (raw bytes, empty lines skipped) from a file or
// stdin and writes the serialized automaton to a file or stdout.
//
// Usage:
//   fsa-build [OPTIONS] [INPUT]
//
// Options:
//   --sort                  Sort and deduplicate the input first
//   -f, --format FORMAT     fsa5 or cfsa2 (default: cfsa2)
//   --numbers               Store right-language counts
//   --label-mapping         Map frequent labels into arc bytes (cfsa2 only)
//   -o, --output PATH       Output file (default: stdout)
//   -h, --help              Print help

use lexfsa_core::ordering::sort_and_dedup;
use lexfsa_fsa::{Codec, FsaBuilder, FsaError, FsaFormat, FsaSerializer};

fn main() {
    lexfsa_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if lexfsa_cli::wants_help(&args) {
        println!("fsa-build: Build a minimal automaton from a list of sequences.");
        println!();
        println!("Usage: fsa-build [OPTIONS] [INPUT]");
        println!();
        println!("Reads one sequence per line from INPUT (or stdin). Input must be");
        println!("sorted byte-wise and free of duplicates unless --sort is given.");
        println!();
        println!("Options:");
        println!("  --sort                  Sort and deduplicate the input first");
        println!("  -f, --format FORMAT     fsa5 or cfsa2 (default: cfsa2)");
        println!("  --numbers               Store right-language counts");
        println!("  --label-mapping         Map frequent labels into arc bytes (cfsa2 only)");
        println!("  -o, --output PATH       Output file (default: stdout)");
        println!("  -h, --help              Print this help");
        return;
    }

    let (sort, args) = lexfsa_cli::take_flag(&args, &["--sort"]);
    let (numbers, args) = lexfsa_cli::take_flag(&args, &["--numbers"]);
    let (label_mapping, args) = lexfsa_cli::take_flag(&args, &["--label-mapping"]);
    let (format, args) = lexfsa_cli::take_option(&args, &["-f", "--format"])
        .unwrap_or_else(|e| lexfsa_cli::fatal(&e));
    let (output, args) = lexfsa_cli::take_option(&args, &["-o", "--output"])
        .unwrap_or_else(|e| lexfsa_cli::fatal(&e));
    let input = lexfsa_cli::single_input(&args).unwrap_or_else(|e| lexfsa_cli::fatal(&e));

    let format: FsaFormat = format
        .as_deref()
        .map_or(Ok(FsaFormat::default()), str::parse)
        .unwrap_or_else(|e: String| lexfsa_cli::fatal(&e));
    let codec = configure(Codec::new(format), numbers, label_mapping)
        .unwrap_or_else(|e| lexfsa_cli::fatal(&e.to_string()));

    let mut sequences = lexfsa_cli::open_input(input.as_deref())
        .and_then(lexfsa_cli::read_lines)
        .unwrap_or_else(|e| lexfsa_cli::fatal(&format!("failed to read input: {e}")));
    if sort {
        sequences = sort_and_dedup(sequences);
    }

    let mut builder = FsaBuilder::new();
    if let Err(e) = builder.extend(&sequences) {
        match e {
            FsaError::InputOrder { .. } | FsaError::DuplicateInput(_) => {
                lexfsa_cli::fatal(&format!("{e} (use --sort)"))
            }
            _ => lexfsa_cli::fatal(&e.to_string()),
        }
    }
    let fsa = builder
        .complete()
        .unwrap_or_else(|e| lexfsa_cli::fatal(&e.to_string()));
    log::info!("built {} sequences into {} arcs", sequences.len(), fsa.arc_count());

    let bytes = codec
        .serialize_with_progress(&fsa, Vec::new(), &mut |progress| {
            log::debug!(
                "serialized {}/{} nodes",
                progress.nodes_written, progress.total_nodes
            );
        })
        .unwrap_or_else(|e| lexfsa_cli::fatal(&e.to_string()));
    log::info!("{} automaton: {} bytes", codec.format(), bytes.len());

    lexfsa_cli::write_output(output.as_deref(), &bytes).unwrap_or_else(|e| lexfsa_cli::fatal(&e));
}

fn configure(codec: Codec, numbers: bool, label_mapping: bool) -> Result<Codec, FsaError> {
    let codec = codec.with_label_mapping(label_mapping)?;
    if numbers {
        codec.with_numbers()
    } else {
        Ok(codec)
    }
}
