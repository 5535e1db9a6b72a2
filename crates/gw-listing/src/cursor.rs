use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ListingError, ListingResult};
use crate::layout::ColumnRange;

/// One physical line with its trailing whitespace removed.
#[derive(Debug, Clone)]
pub(crate) struct Line {
    pub number: usize,
    pub text: String,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn column(&self, range: ColumnRange) -> &str {
        range.slice(&self.text)
    }

    /// Parse the trimmed contents of a fixed column.
    pub fn field<T: FromStr>(
        &self,
        range: ColumnRange,
        field: &'static str,
        context: &str,
    ) -> ListingResult<T> {
        self.column(range)
            .trim()
            .parse()
            .map_err(|_| self.invalid(field, context))
    }

    pub fn invalid(&self, field: &'static str, context: &str) -> ListingError {
        ListingError::InvalidField {
            field,
            context: context.to_string(),
            line_no: self.number,
            line: self.text.clone(),
        }
    }
}

/// Forward-only line reader that counts lines and can hand one line back.
pub(crate) struct LineCursor<R> {
    reader: R,
    origin: PathBuf,
    line_no: usize,
    pushed_back: Option<Line>,
    buf: String,
}

impl<R: BufRead> LineCursor<R> {
    pub fn new(reader: R, origin: &Path) -> Self {
        Self {
            reader,
            origin: origin.to_path_buf(),
            line_no: 0,
            pushed_back: None,
            buf: String::new(),
        }
    }

    pub fn next_line(&mut self) -> ListingResult<Option<Line>> {
        if let Some(line) = self.pushed_back.take() {
            return Ok(Some(line));
        }
        self.buf.clear();
        let read = self
            .reader
            .read_line(&mut self.buf)
            .map_err(|e| ListingError::io(&self.origin, e))?;
        if read == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some(Line {
            number: self.line_no,
            text: self.buf.trim_end().to_string(),
        }))
    }

    /// Return a line so the next call to [`Self::next_line`] yields it again.
    pub fn push_back(&mut self, line: Line) {
        self.pushed_back = Some(line);
    }

    pub fn lines_read(&self) -> usize {
        self.line_no
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_whitespace_and_counts() {
        let text = "first  \r\n\nthird\n";
        let mut cursor = LineCursor::new(text.as_bytes(), Path::new("mem"));
        let a = cursor.next_line().unwrap().unwrap();
        assert_eq!((a.number, a.text.as_str()), (1, "first"));
        let b = cursor.next_line().unwrap().unwrap();
        assert!(b.is_blank());
        cursor.push_back(b);
        assert_eq!(cursor.next_line().unwrap().unwrap().number, 2);
        assert_eq!(cursor.next_line().unwrap().unwrap().text, "third");
        assert!(cursor.next_line().unwrap().is_none());
        assert_eq!(cursor.lines_read(), 3);
    }

    #[test]
    fn field_errors_carry_line_context() {
        let line = Line {
            number: 12,
            text: " REACH     x1".to_string(),
        };
        let err = line
            .field::<u32>(ColumnRange::new(7, 13), "sequence number", "riv sp1/ts1")
            .unwrap_err();
        match err {
            ListingError::InvalidField { line_no, line, .. } => {
                assert_eq!(line_no, 12);
                assert_eq!(line, " REACH     x1");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(
            line.field::<String>(ColumnRange::new(0, 6), "prefix", "")
                .unwrap(),
            "REACH"
        );
    }
}
