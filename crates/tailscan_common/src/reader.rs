//! Backward line reader
//!
//! Reads fixed-size blocks from the end of a seekable source toward its
//! start and yields complete lines newest-first.

use std::io::{self, Read, Seek, SeekFrom};

pub struct ReverseLineReader<R> {
    inner: R,
    /// Offset of the first unread byte boundary (bytes below it are unread)
    cursor: u64,
    /// Lowest offset we are allowed to read
    floor: u64,
    block_size: usize,
    /// Unconsumed prefix of the most recently read block, forward order
    block: Vec<u8>,
    /// Later fragments of the line being assembled, newest block first.
    /// Joined once when the line is complete.
    pending: Vec<Vec<u8>>,
    bytes_read: u64,
    started: bool,
    done: bool,
}

impl<R: Read + Seek> ReverseLineReader<R> {
    /// Reader over at most the last `limit` bytes of `inner`, as of now
    pub fn new(mut inner: R, limit: u64, block_size: usize) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self::with_range(inner, len.saturating_sub(limit), len, block_size))
    }

    /// Reader over the byte range `floor..end` of `inner`
    ///
    /// Bytes past `end` are never read. If the source is shorter than `end`
    /// the first read fails with `UnexpectedEof`.
    pub fn with_range(inner: R, floor: u64, end: u64, block_size: usize) -> Self {
        Self {
            inner,
            cursor: end,
            floor: floor.min(end),
            block_size: block_size.max(1),
            block: Vec::new(),
            pending: Vec::new(),
            bytes_read: 0,
            started: false,
            done: false,
        }
    }

    /// Total bytes read from the source so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Bytes between the floor and the cursor that were never read
    pub fn bytes_unread(&self) -> u64 {
        self.cursor - self.floor
    }

    fn read_block(&mut self) -> io::Result<()> {
        let n = (self.cursor - self.floor).min(self.block_size as u64);
        let start = self.cursor - n;

        let mut block = vec![0u8; n as usize];
        self.inner.seek(SeekFrom::Start(start))?;
        self.inner.read_exact(&mut block)?;

        self.cursor = start;
        self.bytes_read += n;

        // A newline terminating the file does not open an empty line
        if !self.started {
            self.started = true;
            if block.last() == Some(&b'\n') {
                block.pop();
            }
        }
        self.block = block;
        Ok(())
    }

    /// `head` followed by the pending fragments in file order
    fn assemble(&mut self, head: Vec<u8>) -> String {
        if self.pending.is_empty() {
            return decode(head);
        }
        let total = head.len() + self.pending.iter().map(Vec::len).sum::<usize>();
        let mut line = Vec::with_capacity(total);
        line.extend_from_slice(&head);
        for fragment in self.pending.drain(..).rev() {
            line.extend_from_slice(&fragment);
        }
        decode(line)
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(pos) = self.block.iter().rposition(|&b| b == b'\n') {
                let head = self.block.split_off(pos + 1);
                self.block.truncate(pos);
                return Ok(Some(self.assemble(head)));
            }

            if self.cursor == self.floor {
                self.done = true;
                // Above a non-zero floor the leftover is the tail of a cut line
                if self.floor > 0 || (self.block.is_empty() && self.pending.is_empty()) {
                    return Ok(None);
                }
                let head = std::mem::take(&mut self.block);
                return Ok(Some(self.assemble(head)));
            }

            if !self.block.is_empty() {
                self.pending.push(std::mem::take(&mut self.block));
            }
            self.read_block()?;
        }
    }
}

impl<R: Read + Seek> Iterator for ReverseLineReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn decode(mut line: Vec<u8>) -> String {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    match String::from_utf8(line) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    fn lines(data: &str, limit: u64, block: usize) -> Vec<String> {
        ReverseLineReader::new(Cursor::new(data.as_bytes().to_vec()), limit, block)
            .unwrap()
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_yields_lines_newest_first() {
        let data = "one\ntwo\nthree\n";
        for block in [1, 2, 3, 5, 64] {
            assert_eq!(lines(data, 1024, block), vec!["three", "two", "one"]);
        }
    }

    #[test]
    fn test_missing_trailing_newline() {
        assert_eq!(lines("one\ntwo", 1024, 3), vec!["two", "one"]);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        assert_eq!(lines("a\r\n\r\nb\r\n", 1024, 4), vec!["b", "", "a"]);
    }

    #[test]
    fn test_empty_source() {
        assert!(lines("", 1024, 8).is_empty());
    }

    #[test]
    fn test_only_newline() {
        assert!(lines("\n", 1024, 8).is_empty());
    }

    #[test]
    fn test_limit_drops_cut_line() {
        // last 9 bytes: "wo\nthree\n" -> "wo" is a cut line
        let mut reader =
            ReverseLineReader::new(Cursor::new(b"one\ntwo\nthree\n".to_vec()), 9, 4).unwrap();
        assert_eq!(reader.next().unwrap().unwrap(), "three");
        assert!(reader.next().is_none());
        assert_eq!(reader.bytes_read(), 9);
    }

    #[test]
    fn test_stops_reading_early() {
        let data = "a\n".repeat(1000);
        let mut reader =
            ReverseLineReader::new(Cursor::new(data.into_bytes()), 2000, 16).unwrap();
        reader.next();
        reader.next();
        assert_eq!(reader.bytes_read(), 16);
        assert_eq!(reader.bytes_unread(), 2000 - 16);
    }

    #[test]
    fn test_line_spanning_many_blocks() {
        let long = "x".repeat(1000);
        let data = format!("first\n{}\nlast\n", long);
        for block in [1, 7, 64, 999, 1000, 4096] {
            assert_eq!(lines(&data, 4096, block), vec!["last", long.as_str(), "first"]);
        }
    }

    #[test]
    fn test_multi_mib_line_reads_in_linear_time() {
        // 4 MiB in 64-byte blocks: 65536 fragments, joined once
        let long = "y".repeat(4 * 1024 * 1024);
        let data = format!("[01-Jan-2025 00:00:00 UTC] PHP Warning:  {}\n", long);
        let len = data.len();

        let started = Instant::now();
        let out = lines(&data, len as u64, 64);
        assert!(started.elapsed() < Duration::from_secs(20));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), len - 1);
    }

    #[test]
    fn test_range_ignores_bytes_past_end() {
        let data = b"old\nkept\nappended later\n".to_vec();
        let out = ReverseLineReader::with_range(Cursor::new(data), 0, 9, 4)
            .collect::<io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(out, vec!["kept", "old"]);
    }

    #[test]
    fn test_range_past_source_end_fails() {
        let mut reader = ReverseLineReader::with_range(Cursor::new(b"short\n".to_vec()), 0, 64, 16);
        let err = reader.next().unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let mut data = b"ok\n".to_vec();
        data.extend_from_slice(&[0xff, b'x', b'\n']);
        let out = ReverseLineReader::new(Cursor::new(data), 1024, 2)
            .unwrap()
            .collect::<io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(out, vec!["\u{fffd}x".to_string(), "ok".to_string()]);
    }
}
