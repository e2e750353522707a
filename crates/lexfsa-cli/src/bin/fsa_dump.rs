// fsa-dump: Print every sequence accepted by an automaton.
//
// Usage:
//   fsa-dump [--ranks] [FILE]
//
// Options:
//   -r, --ranks             Prefix each sequence with its rank
//   -h, --help              Print help

use std::io::{self, Write};

use lexfsa_fsa::{AnyFsa, Fsa, FsaTraversal};

fn main() {
    lexfsa_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if lexfsa_cli::wants_help(&args) {
        println!("fsa-dump: Print every sequence accepted by an automaton.");
        println!();
        println!("Usage: fsa-dump [--ranks] [FILE]");
        println!();
        println!("Reads the automaton from FILE (or stdin) and prints its sequences");
        println!("in lexicographic order, one per line.");
        println!();
        println!("Options:");
        println!("  -r, --ranks             Prefix each sequence with its rank");
        println!("  -h, --help              Print this help");
        return;
    }

    let (ranks, args) = lexfsa_cli::take_flag(&args, &["-r", "--ranks"]);
    let input = lexfsa_cli::single_input(&args).unwrap_or_else(|e| lexfsa_cli::fatal(&e));
    let (fsa, _) =
        lexfsa_cli::read_fsa(input.as_deref()).unwrap_or_else(|e| lexfsa_cli::fatal(&e));

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    lexfsa_cli::finish_output(dump(&fsa, ranks, &mut out));
}

fn dump(fsa: &AnyFsa, ranks: bool, out: &mut impl Write) -> io::Result<()> {
    let traversal = FsaTraversal::new(fsa);
    let mut sequences = fsa.sequences();
    while let Some(sequence) = sequences.advance() {
        if ranks {
            match traversal.perfect_hash(sequence) {
                Some(rank) => write!(out, "{rank}\t")?,
                None => lexfsa_cli::fatal("automaton enumerates a sequence it rejects"),
            }
        }
        out.write_all(sequence)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}
