// dict-lookup: Look up stems and tags of words.
//
// Prints one `word<TAB>stem<TAB>tag` line per dictionary entry, or
// `word<TAB>-<TAB>-` for unknown words.
//
// Usage:
//   dict-lookup [-d DICT_PATH] [WORD...]
//
// Options:
//   -d, --dict-path PATH   Dictionary file, or directory holding one
//   -h, --help              Print help

use std::io::{self, BufRead, Write};

use lexfsa_dict::DictionaryLookup;

fn main() {
    lexfsa_cli::init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (dict_path, args) = lexfsa_cli::parse_dict_path(&args);

    if lexfsa_cli::wants_help(&args) {
        println!("dict-lookup: Look up stems and tags of words.");
        println!();
        println!("Usage: dict-lookup [-d DICT_PATH] [WORD...]");
        println!();
        println!("If WORD arguments are given, looks up each word.");
        println!("Otherwise reads words from stdin (one per line).");
        println!();
        println!("Options:");
        println!("  -d, --dict-path PATH   Dictionary file, or directory holding one");
        println!(
            "                         (default: ${}, then the current directory)",
            lexfsa_cli::DICT_PATH_ENV
        );
        println!("  -h, --help              Print this help");
        return;
    }

    let words: Vec<String> = args.iter().filter(|a| !a.starts_with('-')).cloned().collect();

    let dictionary = lexfsa_cli::load_dictionary(dict_path.as_deref())
        .unwrap_or_else(|e| lexfsa_cli::fatal(&e));
    let lookup = DictionaryLookup::new(&dictionary);

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    lexfsa_cli::finish_output(run(&lookup, &words, &mut out));
}

// Stops at the first failed write.
fn run(lookup: &DictionaryLookup<'_>, words: &[String], out: &mut impl Write) -> io::Result<()> {
    let mut lookup_word = |word: &str| match lookup.lookup(word) {
        Ok(found) => lexfsa_cli::write_lookup(&mut *out, word, &found),
        Err(e) => lexfsa_cli::fatal(&format!("{word}: {e}")),
    };

    if words.is_empty() {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("error reading stdin: {e}");
                    break;
                }
            };
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            lookup_word(word)?;
        }
    } else {
        for word in words {
            lookup_word(word)?;
        }
    }
    out.flush()
}
