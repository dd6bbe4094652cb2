//! Splits an input line into whitespace-separated argument tokens.

use std::collections::TryReserveError;

/// Initial token vector capacity; the vector also grows by this amount.
pub const TOK_BUFSIZE: usize = 128;

/// Characters that separate tokens. Runs of delimiters collapse.
pub const DELIMITERS: &[char] = &[' ', '\t', '\r', '\n', '\u{7}'];

/// Split `line` into tokens on [`DELIMITERS`].
///
/// The returned slices borrow the line buffer itself; the token vector
/// holds no copies and must not outlive the line. An empty or
/// all-delimiter line yields `Some(vec![])`, meaning "nothing to execute"
/// rather than an error. `None` means the token vector could not be grown.
pub fn split_line(line: &str) -> Option<Vec<&str>> {
    let mut tokens: Vec<&str> = Vec::new();
    if grow(&mut tokens).is_err() {
        return None;
    }

    for token in line.split(DELIMITERS).filter(|t| !t.is_empty()) {
        if tokens.len() == tokens.capacity() && grow(&mut tokens).is_err() {
            return None;
        }
        tokens.push(token);
    }
    Some(tokens)
}

/// Reserve room for another `TOK_BUFSIZE` tokens, reporting failure to stderr.
fn grow<'a>(tokens: &mut Vec<&'a str>) -> Result<(), TryReserveError> {
    tokens.try_reserve_exact(TOK_BUFSIZE).inspect_err(|err| {
        eprintln!("alloc: {err}");
    })
}
