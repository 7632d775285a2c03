//! Text edit records.

use text_size::{TextRange, TextSize};

/// A zero-based row and byte column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    /// Zero-based row.
    pub row: u32,
    /// Byte offset from the start of the row.
    pub column: u32,
}

impl Point {
    /// Position of `offset` in `text`.
    #[must_use]
    pub fn of(text: &str, offset: TextSize) -> Self {
        let offset = usize::from(offset).min(text.len());
        let before = &text.as_bytes()[..offset];
        let row = before.iter().filter(|&&b| b == b'\n').count();
        let line_start = before.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        Self {
            row: u32::try_from(row).unwrap_or(u32::MAX),
            column: u32::try_from(offset - line_start).unwrap_or(u32::MAX),
        }
    }

    /// The point reached after `text` is inserted at `self`.
    #[must_use]
    pub fn advance(self, text: &str) -> Self {
        match text.rfind('\n') {
            Some(last) => Self {
                row: self.row + text.matches('\n').count() as u32,
                column: (text.len() - last - 1) as u32,
            },
            None => Self {
                row: self.row,
                column: self.column + text.len() as u32,
            },
        }
    }
}

/// A single replacement in a source text.
///
/// `deleted` bytes starting at `start` were replaced by `inserted` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edit {
    /// Byte offset where the edit starts.
    pub start: TextSize,
    /// Number of bytes removed from the old text.
    pub deleted: TextSize,
    /// Number of bytes inserted into the new text.
    pub inserted: TextSize,
    /// Position of `start`.
    pub start_point: Point,
    /// Position of the end of the removed text, in the old text.
    pub old_end_point: Point,
    /// Position of the end of the inserted text, in the new text.
    pub new_end_point: Point,
}

impl Edit {
    /// Describes replacing `range` of `old_text` with `replacement`.
    #[must_use]
    pub fn replace(old_text: &str, range: TextRange, replacement: &str) -> Self {
        let start_point = Point::of(old_text, range.start());
        Self {
            start: range.start(),
            deleted: range.len(),
            inserted: TextSize::of(replacement),
            start_point,
            old_end_point: Point::of(old_text, range.end()),
            new_end_point: start_point.advance(replacement),
        }
    }

    /// Describes inserting `text` at `offset` of `old_text`.
    #[must_use]
    pub fn insert(old_text: &str, offset: TextSize, text: &str) -> Self {
        Self::replace(old_text, TextRange::empty(offset), text)
    }

    /// Describes deleting `range` of `old_text`.
    #[must_use]
    pub fn delete(old_text: &str, range: TextRange) -> Self {
        Self::replace(old_text, range, "")
    }

    /// The smallest single edit turning `old_text` into `new_text`.
    #[must_use]
    pub fn diff(old_text: &str, new_text: &str) -> Self {
        let mut prefix = old_text
            .bytes()
            .zip(new_text.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        while !old_text.is_char_boundary(prefix) || !new_text.is_char_boundary(prefix) {
            prefix -= 1;
        }
        let max_suffix = old_text.len().min(new_text.len()) - prefix;
        let mut suffix = old_text
            .bytes()
            .rev()
            .zip(new_text.bytes().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();
        while !old_text.is_char_boundary(old_text.len() - suffix)
            || !new_text.is_char_boundary(new_text.len() - suffix)
        {
            suffix -= 1;
        }
        let range = TextRange::new(
            TextSize::from(prefix as u32),
            TextSize::from((old_text.len() - suffix) as u32),
        );
        Self::replace(old_text, range, &new_text[prefix..new_text.len() - suffix])
    }

    /// Removed range in the old text.
    #[must_use]
    pub fn old_range(&self) -> TextRange {
        TextRange::at(self.start, self.deleted)
    }

    /// Inserted range in the new text.
    #[must_use]
    pub fn new_range(&self) -> TextRange {
        TextRange::at(self.start, self.inserted)
    }

    /// Change in text length.
    #[must_use]
    pub fn delta(&self) -> i64 {
        i64::from(u32::from(self.inserted)) - i64::from(u32::from(self.deleted))
    }

    /// Builds the new text from `old_text` and the inserted text.
    #[must_use]
    pub fn apply(&self, old_text: &str, replacement: &str) -> String {
        let range = self.old_range();
        let mut text = String::with_capacity(old_text.len() + replacement.len());
        text.push_str(&old_text[..usize::from(range.start())]);
        text.push_str(replacement);
        text.push_str(&old_text[usize::from(range.end())..]);
        text
    }

    /// Returns `true` if the edit fits `old_len` and `new_text`.
    pub(crate) fn is_valid_for(&self, old_len: TextSize, new_text: &str) -> bool {
        let new_len = TextSize::of(new_text);
        let old_end = self.start.checked_add(self.deleted);
        let new_end = self.start.checked_add(self.inserted);
        match (old_end, new_end) {
            (Some(old_end), Some(new_end)) => {
                old_end <= old_len
                    && new_end <= new_len
                    && u32::from(old_len) - u32::from(self.deleted) + u32::from(self.inserted)
                        == u32::from(new_len)
                    && new_text.is_char_boundary(usize::from(self.start))
                    && new_text.is_char_boundary(usize::from(new_end))
            }
            _ => false,
        }
    }
}
