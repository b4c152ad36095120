//! Ordered text edits
//!
//! [`EditList`] collects insertions, replacements and removals against one
//! immutable source text and applies them in a single deterministic pass.
//! Edits are addressed by byte offsets into the original text, so queuing an
//! edit never shifts the position of another one.

use std::ops::Range;

/// One queued change against the original text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEdit {
    /// Insert `text` at byte offset `at`
    Insert {
        /// Byte offset in the original text
        at: usize,
        /// Text to insert
        text: String,
    },
    /// Replace the bytes in `range` with `text`
    Replace {
        /// Replaced span of the original text
        range: Range<usize>,
        /// Replacement
        text: String,
    },
    /// Remove the bytes in `range`
    Remove {
        /// Removed span of the original text
        range: Range<usize>,
    },
}

impl TextEdit {
    /// Offset at which the edit starts
    #[inline]
    #[must_use]
    pub fn start(&self) -> usize {
        match self {
            Self::Insert { at, .. } => *at,
            Self::Replace { range, .. } | Self::Remove { range } => range.start,
        }
    }

    /// Offset at which the edit ends (equal to start for insertions)
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        match self {
            Self::Insert { at, .. } => *at,
            Self::Replace { range, .. } | Self::Remove { range } => range.end,
        }
    }

    /// Insertions sort before range edits starting at the same offset
    #[inline]
    fn rank(&self) -> u8 {
        match self {
            Self::Insert { .. } => 0,
            Self::Replace { .. } | Self::Remove { .. } => 1,
        }
    }
}

/// Edits queued against one source text
///
/// Insertions at the same offset keep the order in which they were queued.
///
/// # Example
///
/// ```
/// use daoweave_artifact::EditList;
///
/// let mut edits = EditList::new();
/// edits.insert(5, ", world");
/// edits.replace(0..1, "H");
/// assert_eq!(edits.apply("hello!").unwrap(), "Hello, world!");
/// ```
#[derive(Debug, Clone, Default)]
pub struct EditList {
    edits: Vec<TextEdit>,
}

impl EditList {
    /// Create empty edit list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an insertion
    pub fn insert(&mut self, at: usize, text: impl Into<String>) -> &mut Self {
        self.push(TextEdit::Insert { at, text: text.into() })
    }

    /// Queue a replacement
    pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) -> &mut Self {
        self.push(TextEdit::Replace { range, text: text.into() })
    }

    /// Queue a removal
    pub fn remove(&mut self, range: Range<usize>) -> &mut Self {
        self.push(TextEdit::Remove { range })
    }

    /// Queue any edit
    pub fn push(&mut self, edit: TextEdit) -> &mut Self {
        self.edits.push(edit);
        self
    }

    /// Queued edits in insertion order
    #[inline]
    #[must_use]
    pub fn edits(&self) -> &[TextEdit] {
        &self.edits
    }

    /// Number of queued edits
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Check if nothing is queued
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply every queued edit to `source`.
    ///
    /// # Errors
    /// - [`EditError::OutOfBounds`] if an offset lies outside `source` or
    ///   inside a multi-byte character
    /// - [`EditError::Overlap`] if two edits touch the same bytes
    pub fn apply(&self, source: &str) -> Result<String, EditError> {
        for edit in &self.edits {
            for offset in [edit.start(), edit.end()] {
                if offset > source.len() || !source.is_char_boundary(offset) {
                    return Err(EditError::OutOfBounds { offset, len: source.len() });
                }
            }
            if edit.start() > edit.end() {
                return Err(EditError::OutOfBounds { offset: edit.start(), len: source.len() });
            }
        }

        let mut ordered: Vec<&TextEdit> = self.edits.iter().collect();
        // Stable sort keeps queue order for equal keys
        ordered.sort_by_key(|e| (e.start(), e.rank()));

        let mut out = String::with_capacity(source.len() + self.inserted_len());
        let mut cursor = 0usize;
        for edit in ordered {
            let start = edit.start();
            if start < cursor {
                return Err(EditError::Overlap { offset: start });
            }
            out.push_str(&source[cursor..start]);
            match edit {
                TextEdit::Insert { text, .. } | TextEdit::Replace { text, .. } => out.push_str(text),
                TextEdit::Remove { .. } => {}
            }
            cursor = edit.end();
        }
        out.push_str(&source[cursor..]);
        Ok(out)
    }

    fn inserted_len(&self) -> usize {
        self.edits
            .iter()
            .map(|e| match e {
                TextEdit::Insert { text, .. } | TextEdit::Replace { text, .. } => text.len(),
                TextEdit::Remove { .. } => 0,
            })
            .sum()
    }
}

/// Errors raised while applying edits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    /// Offset outside of the source text
    #[error("edit offset {offset} is outside of the source text (length {len})")]
    OutOfBounds {
        /// Offending offset
        offset: usize,
        /// Length of the source text
        len: usize,
    },

    /// Two edits touch the same bytes
    #[error("overlapping edits at offset {offset}")]
    Overlap {
        /// Start of the later edit
        offset: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn empty_list_returns_source() {
        assert_eq!(EditList::new().apply("abc").unwrap(), "abc");
    }

    #[test]
    fn inserts_at_same_offset_keep_queue_order() {
        let mut edits = EditList::new();
        edits.insert(1, "x").insert(1, "y").insert(1, "z");
        assert_eq!(edits.apply("ab").unwrap(), "axyzb");
    }

    #[test]
    fn insert_before_removal_at_same_offset() {
        let mut edits = EditList::new();
        edits.remove(2..4).insert(2, "NEW");
        assert_eq!(edits.apply("abcdef").unwrap(), "abNEWef");
    }

    #[test]
    fn insert_at_end_of_removed_range() {
        let mut edits = EditList::new();
        edits.insert(4, "!").remove(2..4);
        assert_eq!(edits.apply("abcdef").unwrap(), "ab!ef");
    }

    #[test]
    fn insert_inside_removed_range_is_overlap() {
        let mut edits = EditList::new();
        edits.remove(1..5).insert(3, "x");
        assert_eq!(edits.apply("abcdef"), Err(EditError::Overlap { offset: 3 }));
    }

    #[test]
    fn overlapping_ranges_are_rejected() {
        let mut edits = EditList::new();
        edits.replace(0..3, "x").remove(2..4);
        assert!(matches!(edits.apply("abcdef"), Err(EditError::Overlap { .. })));
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut edits = EditList::new();
        edits.insert(10, "x");
        assert_eq!(edits.apply("abc"), Err(EditError::OutOfBounds { offset: 10, len: 3 }));
    }

    #[test]
    fn offsets_inside_multibyte_chars_are_rejected() {
        let mut edits = EditList::new();
        edits.insert(1, "x");
        assert!(edits.apply("é").is_err());
    }

    proptest! {
        #[test]
        fn disjoint_removals_shrink_by_removed_length(
            text in "[a-z]{0,64}",
            cuts in proptest::collection::btree_set(0usize..64, 0..16),
        ) {
            let len = text.len();
            let points: Vec<usize> = cuts.into_iter().filter(|&c| c < len).collect();
            let mut edits = EditList::new();
            let mut removed = 0;
            for pair in points.chunks_exact(2) {
                edits.remove(pair[0]..pair[1]);
                removed += pair[1] - pair[0];
            }
            let out = edits.apply(&text).unwrap();
            prop_assert_eq!(out.len(), len - removed);
        }

        #[test]
        fn insertions_preserve_original_characters_in_order(
            text in "[a-z]{0,32}",
            at in proptest::collection::vec(0usize..33, 0..8),
        ) {
            let mut edits = EditList::new();
            for &offset in &at {
                edits.insert(offset.min(text.len()), "#");
            }
            let out = edits.apply(&text).unwrap();
            prop_assert_eq!(out.replace('#', ""), text);
            prop_assert_eq!(out.matches('#').count(), at.len());
        }
    }
}
