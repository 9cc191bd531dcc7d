//! Byte-level line splitting shared by the text readers.

use std::io::BufRead;

use crate::{Error, Result};

/// Call `f(line_no, line)` for every line of `reader`, 1-based.
///
/// The trailing `\n` or `\r\n` is removed. A line that is not valid UTF-8
/// is a [`Error::MalformedRecord`] carrying its lossily decoded content;
/// only failures of the reader itself surface as [`Error::Io`].
pub(crate) fn for_each_line<R, F>(mut reader: R, mut f: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(usize, String) -> Result<()>,
{
    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        line_no += 1;
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        let line = String::from_utf8(std::mem::take(&mut buf)).map_err(|e| Error::MalformedRecord {
            line: line_no,
            content: String::from_utf8_lossy(e.as_bytes()).into_owned(),
            reason: "line is not valid UTF-8".into(),
        })?;
        f(line_no, line)?;
    }
}
