//! Private utility module
use crate::error::{NrrdError, Result};
use std::io::{self, BufRead, Read};
use std::path::Path;

/// Whether the file name asks for a detached header (`.nhdr`).
pub fn is_detached_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .extension()
        .map(|a| a.to_string_lossy().eq_ignore_ascii_case("nhdr"))
        .unwrap_or(false)
}

/// Skip `n` lines from the source, where a line ends with `\n`, `\r` or
/// `\r\n`. Returns the number of bytes skipped.
pub fn skip_lines<R: BufRead>(mut src: R, n: u64) -> Result<u64> {
    let mut left = n;
    let mut skipped = 0;
    let mut after_cr = false;
    while left > 0 || after_cr {
        let byte = src.fill_buf()?.first().copied();
        let b = match byte {
            Some(b) => b,
            None if left == 0 => break,
            None => return Err(NrrdError::UnexpectedEndOfStream),
        };
        if after_cr {
            after_cr = false;
            if b == b'\n' {
                src.consume(1);
                skipped += 1;
                continue;
            }
            if left == 0 {
                break;
            }
        }
        src.consume(1);
        skipped += 1;
        match b {
            b'\n' => left -= 1,
            b'\r' => {
                left -= 1;
                after_cr = true;
            }
            _ => {}
        }
    }
    Ok(skipped)
}

/// Skip exactly `n` bytes from the source.
pub fn skip_bytes<R: Read>(mut src: R, n: u64) -> Result<()> {
    if n == 0 {
        return Ok(());
    }
    let skipped = io::copy(&mut src.by_ref().take(n), &mut io::sink())?;
    log::debug!("Skipped {} bytes before the NRRD data", skipped);
    if skipped < n {
        return Err(NrrdError::UnexpectedEndOfStream);
    }
    Ok(())
}
