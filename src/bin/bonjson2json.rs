// ABOUTME: CLI converter from BONJSON bytes to JSON text.
// ABOUTME: Reads a binary file (5 GB cap), writes JSON to stdout; errors name kind and offset.

use bonjson_stream::{Decoder, ValueBuilder};
use std::env;
use std::fs;
use std::io::Write;
use std::process::ExitCode;

// Max size of file this program will read before balking.
// The entire file gets loaded into memory, so choose wisely.
const MAX_FILE_SIZE: u64 = 5_000_000_000;

fn main() -> ExitCode {
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: bonjson2json <file.bonjson>");
        return ExitCode::from(2);
    };
    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("bonjson2json: {message}");
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

    let mut builder = ValueBuilder::new();
    let mut decoder = Decoder::new(&data);
    let consumed = decoder.decode(&mut builder).map_err(|e| {
        format!(
            "{path}: decode failed at byte {}: {}",
            decoder.position(),
            e.error_type()
        )
    })?;
    if consumed != data.len() {
        return Err(format!(
            "{path}: decode failed at byte {consumed}: trailing_bytes"
        ));
    }
    let value = builder
        .into_value()
        .map_err(|e| format!("{path}: {}", e.error_type()))?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, &value).map_err(|e| format!("stdout: {e}"))?;
    stdout
        .write_all(b"\n")
        .and_then(|()| stdout.flush())
        .map_err(|e| format!("stdout: {e}"))
}
