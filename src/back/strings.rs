//! The string pool: splitting `printf` format strings into `.rdata`
//! segments addressable one conversion at a time.
//!
//! `printf` is lowered into one call per `%` conversion (see
//! `emit_printf_expression` in `func.rs`), each call passing a literal
//! segment of the original string as the format and the matching argument
//! as the value. A string with `k` conversions therefore needs `k + 1`
//! segments: one ending at each conversion, plus the trailing tail.

use crate::back::label::{Label, LabelKind};
use crate::front::tables::StringTable;

/// Recognised `printf` conversion letters. `%%` is not split on: it has no
/// argument to pass, so it stays embedded in its segment's text.
fn is_conversion_letter(c: char) -> bool {
    matches!(c, 'd' | 'i' | 'u' | 'f' | 'c' | 's' | 'x' | 'o')
}

/// Splits one format string into segments, each ending right after a `%x`
/// conversion (except the last, which runs to the end of the string).
fn split_segments(s: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if c == '%' {
            if let Some(&next) = chars.peek() {
                if next == '%' {
                    current.push(next);
                    chars.next();
                    continue;
                }
                if is_conversion_letter(next) {
                    current.push(next);
                    chars.next();
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() || segments.is_empty() {
        segments.push(current);
    }
    segments
}

/// Every original string's segmentation, indexed the same way as
/// [`StringTable`].
pub struct StringPool {
    amount: usize,
    segments: Vec<Vec<String>>,
}

impl StringPool {
    pub fn build(strings: &StringTable) -> Self {
        let amount = strings.amount();
        let segments = (0..amount).map(|i| split_segments(strings.get(i))).collect();
        StringPool { amount, segments }
    }

    pub fn amount(&self) -> usize {
        self.amount
    }

    pub fn segment_count(&self, i: usize) -> usize {
        self.segments[i].len()
    }

    pub fn segment(&self, i: usize, j: usize) -> &str {
        &self.segments[i][j]
    }

    /// `STRING<i + j*amount>`: the label addressing the j-th segment of
    /// the i-th original string.
    pub fn label(&self, i: usize, j: usize) -> Label {
        Label::new(LabelKind::String, (i + j * self.amount) as u32)
    }

    /// Emits every segment of every string as a null-terminated `.ascii`
    /// directive under its `STRING<n>` label, escaping embedded `\n`.
    pub fn emit_rdata(&self) -> String {
        let mut out = String::new();
        out.push_str("\t.rdata\n");
        for i in 0..self.amount {
            for j in 0..self.segment_count(i) {
                let label = self.label(i, j);
                let text = self.segment(i, j).replace('\n', "\\n");
                out.push_str(&format!("{label}:\n\t.ascii \"{text}\\000\"\n"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_conversions_is_a_single_segment() {
        let segs = split_segments("hello\n");
        assert_eq!(segs, vec!["hello\n".to_string()]);
    }

    #[test]
    fn one_conversion_splits_in_two() {
        let segs = split_segments("x = %d\n");
        assert_eq!(segs, vec!["x = %d".to_string(), "\n".to_string()]);
    }

    #[test]
    fn two_conversions_split_in_three() {
        let segs = split_segments("%d and %s!");
        assert_eq!(segs, vec!["%d".to_string(), " and %s".to_string(), "!".to_string()]);
    }

    #[test]
    fn literal_percent_is_not_a_conversion() {
        let segs = split_segments("100%% done\n");
        assert_eq!(segs, vec!["100%% done\n".to_string()]);
    }
}
