// ABOUTME: CLI converter from JSON text to BONJSON bytes.
// ABOUTME: Reads a JSON file (5 GB cap), writes the binary document to stdout.

use std::env;
use std::fs;
use std::io::Write;
use std::process::ExitCode;

// Max size of file this program will read before balking.
// The entire file gets loaded into memory, so choose wisely.
const MAX_FILE_SIZE: u64 = 5_000_000_000;

fn main() -> ExitCode {
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: json2bonjson <file.json>");
        return ExitCode::from(2);
    };
    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("json2bonjson: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &str) -> Result<(), String> {
    let metadata = fs::metadata(path).map_err(|e| format!("{path}: {e}"))?;
    if metadata.len() > MAX_FILE_SIZE {
        return Err(format!("{path}: larger than the {MAX_FILE_SIZE} byte limit"));
    }
    let data = fs::read(path).map_err(|e| format!("{path}: {e}"))?;

    let json: serde_json::Value =
        serde_json::from_slice(&data).map_err(|e| format!("{path}: invalid JSON: {e}"))?;
    let bytes = bonjson_stream::to_vec(&json)
        .map_err(|e| format!("{path}: encode failed: {} ({e})", e.error_type()))?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&bytes)
        .and_then(|()| stdout.flush())
        .map_err(|e| format!("stdout: {e}"))
}
