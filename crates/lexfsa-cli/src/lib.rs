// lexfsa-cli: shared utilities for CLI tools.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use lexfsa_dict::{Dictionary, WordData};
use lexfsa_fsa::AnyFsa;

/// Environment variable naming a dictionary file or directory.
pub const DICT_PATH_ENV: &str = "LEXFSA_DICT_PATH";

/// Extension of compiled dictionary files.
const DICT_EXTENSION: &str = "dict";

/// Initializes `env_logger`, showing warnings unless `RUST_LOG` says otherwise.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
}

/// Search for a compiled dictionary and load it.
///
/// Search order:
/// 1. `dict_path` argument (if provided)
/// 2. `LEXFSA_DICT_PATH` environment variable
/// 3. Current working directory
///
/// Each entry may name a `.dict` file or a directory holding one.
pub fn load_dictionary(dict_path: Option<&str>) -> Result<Dictionary, String> {
    let search_paths = build_search_paths(dict_path);

    for candidate in &search_paths {
        if let Some(path) = resolve_dictionary(candidate) {
            log::debug!("using dictionary {}", path.display());
            return Dictionary::read(&path)
                .map_err(|e| format!("failed to load {}: {e}", path.display()));
        }
    }

    Err(format!(
        "could not find a .{DICT_EXTENSION} file in any of the search paths:\n{}",
        search_paths
            .iter()
            .map(|p| format!("  - {}", p.display()))
            .collect::<Vec<_>>()
            .join("\n")
    ))
}

/// Build the list of places to search for a dictionary.
fn build_search_paths(dict_path: Option<&str>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(p) = dict_path {
        paths.push(PathBuf::from(p));
    }

    if let Ok(env_path) = std::env::var(DICT_PATH_ENV) {
        paths.push(PathBuf::from(env_path));
    }

    // Fallback for local use
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd);
    }

    paths
}

/// A `.dict` file itself, or the first one (by name) inside a directory.
fn resolve_dictionary(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    let mut found: Vec<PathBuf> = std::fs::read_dir(candidate)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == DICT_EXTENSION)
        })
        .collect();
    found.sort();
    if found.len() > 1 {
        log::warn!(
            "{} holds {} dictionaries, using the first",
            candidate.display(),
            found.len()
        );
    }
    found.into_iter().next()
}

/// Parse a `--dict-path=PATH` or `-d PATH` argument from command line args.
///
/// Returns `(dict_path, remaining_args)`.
pub fn parse_dict_path(args: &[String]) -> (Option<String>, Vec<String>) {
    take_option(args, &["-d", "--dict-path"]).unwrap_or_else(|e| fatal(&e))
}

/// Removes an option that takes a value (`NAME VALUE` or `NAME=VALUE` for
/// long names) from `args`. The last occurrence wins.
///
/// Returns `(value, remaining_args)`.
pub fn take_option(
    args: &[String],
    names: &[&str],
) -> Result<(Option<String>, Vec<String>), String> {
    let mut value = None;
    let mut remaining = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if names.contains(&arg.as_str()) {
            let next = iter
                .next()
                .ok_or_else(|| format!("{arg} requires a value"))?;
            value = Some(next.clone());
            continue;
        }
        let inline = names
            .iter()
            .filter(|name| name.starts_with("--"))
            .find_map(|name| arg.strip_prefix(name)?.strip_prefix('='));
        match inline {
            Some(v) => value = Some(v.to_string()),
            None => remaining.push(arg.clone()),
        }
    }

    Ok((value, remaining))
}

/// Removes a boolean flag from `args`.
///
/// Returns `(present, remaining_args)`.
pub fn take_flag(args: &[String], names: &[&str]) -> (bool, Vec<String>) {
    let (flagged, remaining): (Vec<String>, Vec<String>) = args
        .iter()
        .cloned()
        .partition(|arg| names.contains(&arg.as_str()));
    (!flagged.is_empty(), remaining)
}

/// Rejects leftover options and returns at most one positional argument.
pub fn single_input(args: &[String]) -> Result<Option<String>, String> {
    if let Some(unknown) = args.iter().find(|a| a.starts_with('-') && a.as_str() != "-") {
        return Err(format!("unknown option: {unknown}"));
    }
    match args {
        [] => Ok(None),
        [path] if path == "-" => Ok(None),
        [path] => Ok(Some(path.clone())),
        _ => Err(format!("expected at most one input, got {}", args.len())),
    }
}

/// Opens `path`, or stdin when `None`.
pub fn open_input(path: Option<&str>) -> io::Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(p) => Box::new(BufReader::new(File::open(p)?)),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

/// Reads non-empty lines as raw bytes. A trailing `\r` is dropped.
pub fn read_lines(input: impl BufRead) -> io::Result<Vec<Vec<u8>>> {
    let mut lines = Vec::new();
    for line in input.split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

/// Reads a serialized automaton from `path`, or stdin when `None`.
pub fn read_fsa(path: Option<&str>) -> Result<(AnyFsa, usize), String> {
    let mut data = Vec::new();
    open_input(path)
        .and_then(|mut input| input.read_to_end(&mut data))
        .map_err(|e| format!("failed to read {}: {e}", path.unwrap_or("stdin")))?;
    let fsa = AnyFsa::from_bytes(&data).map_err(|e| e.to_string())?;
    Ok((fsa, data.len()))
}

/// Writes `bytes` to `path`, or stdout when `None`.
pub fn write_output(path: Option<&str>, bytes: &[u8]) -> Result<(), String> {
    let result = match path {
        Some(p) => std::fs::write(p, bytes),
        None => {
            let mut out = io::stdout().lock();
            out.write_all(bytes).and_then(|()| out.flush())
        }
    };
    result.map_err(|e| format!("failed to write {}: {e}", path.unwrap_or("stdout")))
}

/// Writes the result of looking up `word`: one `word<TAB>stem<TAB>tag` line
/// per entry, or `word<TAB>-<TAB>-` when there is none.
pub fn write_lookup(out: &mut impl Write, word: &str, found: &[WordData]) -> io::Result<()> {
    if found.is_empty() {
        return writeln!(out, "{word}\t-\t-");
    }
    for data in found {
        writeln!(out, "{data}")?;
    }
    Ok(())
}

/// Ends a tool's output. A closed pipe (`... | head`) stops quietly; any
/// other write error is fatal.
pub fn finish_output(result: io::Result<()>) {
    if let Err(e) = result {
        if e.kind() != io::ErrorKind::BrokenPipe {
            fatal(&format!("failed to write output: {e}"));
        }
        log::debug!("output closed early: {e}");
    }
}

/// Prints `PROGRAM: error: MSG` to stderr and exits with status 1.
pub fn fatal(msg: &str) -> ! {
    eprintln!("{}: error: {msg}", program_name());
    process::exit(1);
}

fn program_name() -> String {
    std::env::args_os()
        .next()
        .and_then(|arg| {
            Path::new(&arg)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "lexfsa".to_string())
}

/// Whether `-h` or `--help` comes before any `--`; later arguments are
/// words, not options.
pub fn wants_help(args: &[String]) -> bool {
    args.iter()
        .take_while(|a| a.as_str() != "--")
        .any(|a| a == "--help" || a == "-h")
}
