// fsa-info: Print the format, flags and statistics of an automaton.
//
// Usage:
//   fsa-info [FILE]

use lexfsa_fsa::{Fsa, FsaInfo};

fn main() {
    lexfsa_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();

    if lexfsa_cli::wants_help(&args) {
        println!("fsa-info: Print the format, flags and statistics of an automaton.");
        println!();
        println!("Usage: fsa-info [FILE]");
        println!();
        println!("Reads the automaton from FILE (or stdin).");
        println!();
        println!("Options:");
        println!("  -h, --help              Print this help");
        return;
    }

    let input = lexfsa_cli::single_input(&args).unwrap_or_else(|e| lexfsa_cli::fatal(&e));
    let (fsa, size) =
        lexfsa_cli::read_fsa(input.as_deref()).unwrap_or_else(|e| lexfsa_cli::fatal(&e));

    if let Some(format) = fsa.format() {
        println!("format:         {format}");
    }
    println!("size:           {size} bytes");
    println!("flags:          {}", fsa.flags());
    if let Some((filler, annotation)) = fsa.separators() {
        println!(
            "separators:     filler {:?}, annotation {:?}",
            char::from(filler),
            char::from(annotation)
        );
    }
    println!("{}", FsaInfo::of(&fsa));
}
