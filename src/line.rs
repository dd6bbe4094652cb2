use std::collections::TryReserveError;
use std::io::{ErrorKind, Read};

/// Initial line buffer capacity; the buffer also grows by this amount.
pub const LINE_BUFSIZE: usize = 1024;

/// Read one line of bytes from `input`, excluding the trailing newline.
///
/// Bytes are consumed one at a time until a newline is seen. Interrupted
/// reads are retried without losing bytes already collected. Returns
/// `None` on end-of-stream, on a read error, or when the buffer cannot be
/// grown; a partial line collected before end-of-stream is discarded.
/// `Some(String::new())` is an empty line, distinct from "no line".
pub fn read_line<R: Read + ?Sized>(input: &mut R) -> Option<String> {
    let mut buffer: Vec<u8> = Vec::new();
    if grow(&mut buffer).is_err() {
        return None;
    }

    let mut byte = [0u8; 1];
    loop {
        match input.read(&mut byte) {
            Err(ref err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                log::debug!("read failed: {err}");
                return None;
            }
            Ok(0) => return None,
            Ok(_) => {}
        }

        if byte[0] == b'\n' {
            return Some(String::from_utf8_lossy(&buffer).into_owned());
        }

        if buffer.len() == buffer.capacity() && grow(&mut buffer).is_err() {
            return None;
        }
        buffer.push(byte[0]);
    }
}

/// Reserve another `LINE_BUFSIZE` bytes, reporting failure to stderr.
fn grow(buffer: &mut Vec<u8>) -> Result<(), TryReserveError> {
    buffer.try_reserve_exact(LINE_BUFSIZE).inspect_err(|err| {
        eprintln!("alloc: {err}");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    #[test]
    fn test_short_line_returned_exactly() {
        let mut input = Cursor::new(b"ls -a /\n".to_vec());
        assert_eq!(read_line(&mut input), Some("ls -a /".to_string()));
    }

    #[test]
    fn test_empty_line_is_not_no_line() {
        let mut input = Cursor::new(b"\n".to_vec());
        assert_eq!(read_line(&mut input), Some(String::new()));
    }

    #[test]
    fn test_end_of_stream_yields_none() {
        let mut input = Cursor::new(Vec::new());
        assert_eq!(read_line(&mut input), None);
    }

    #[test]
    fn test_partial_line_at_end_of_stream_is_dropped() {
        let mut input = Cursor::new(b"no newline here".to_vec());
        assert_eq!(read_line(&mut input), None);
    }

    #[test]
    fn test_line_longer_than_initial_capacity() {
        let long = "x".repeat(LINE_BUFSIZE + 100);
        let mut input = Cursor::new(format!("{long}\n").into_bytes());
        assert_eq!(read_line(&mut input), Some(long));
    }

    #[test]
    fn test_line_spanning_multiple_growth_steps() {
        // Force at least three reservations and check nothing is lost or
        // reordered along the way.
        let long: String = (0..LINE_BUFSIZE * 3 + 17)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();
        let mut input = Cursor::new(format!("{long}\n").into_bytes());
        assert_eq!(read_line(&mut input), Some(long));
    }

    #[test]
    fn test_consecutive_lines_from_one_stream() {
        let mut input = Cursor::new(b"first\nsecond\n".to_vec());
        assert_eq!(read_line(&mut input), Some("first".to_string()));
        assert_eq!(read_line(&mut input), Some("second".to_string()));
        assert_eq!(read_line(&mut input), None);
    }

    /// Fails with `Interrupted` a fixed number of times before delegating.
    struct Interrupting<R> {
        inner: R,
        remaining: u32,
    }

    impl<R: Read> Read for Interrupting<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining > 0 {
                self.remaining -= 1;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_interrupted_reads_are_retried() {
        let mut input = Interrupting {
            inner: Cursor::new(b"resume\n".to_vec()),
            remaining: 3,
        };
        assert_eq!(read_line(&mut input), Some("resume".to_string()));
    }
}
