//! Line forwarding for command output.
//!
//! Output is captured byte-for-byte. When a label is supplied each line is
//! also written to the local terminal behind that label, which is how remote
//! command output stays visible while it is collected.

use std::io::{self, BufRead, BufReader, Read, Write};

/// Reads `source` to exhaustion, returning everything read.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails. Terminal write failures
/// are ignored so a closed local terminal cannot abort the remote command.
pub(crate) fn forward_lines<S: Read>(
    source: S,
    label: Option<&str>,
    to_stderr: bool,
) -> io::Result<Vec<u8>> {
    let mut reader = BufReader::new(source);
    let mut captured = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        captured.extend_from_slice(&line);
        if let Some(prefix) = label {
            echo_line(prefix, &line, to_stderr);
        }
    }
    Ok(captured)
}

fn echo_line(prefix: &str, line: &[u8], to_stderr: bool) {
    let decoded = String::from_utf8_lossy(line);
    let text = decoded.trim_end_matches(['\r', '\n']);
    if to_stderr {
        writeln!(io::stderr(), "{prefix}{text}").ok();
    } else {
        writeln!(io::stdout(), "{prefix}{text}").ok();
    }
}
