//! Formatting profile detection
//!
//! Infers indentation and preferred line width from existing source text so
//! that generated members blend in with the hand-written ones.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Narrowest line width ever detected
pub const MIN_LINE_WIDTH: usize = 80;

/// Indentation character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentChar {
    /// `' '`
    Space,
    /// `'\t'`
    Tab,
}

impl IndentChar {
    /// The character itself
    #[inline]
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Space => ' ',
            Self::Tab => '\t',
        }
    }
}

/// Indentation character and the number of them per nesting level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tabulation {
    /// Indentation character
    pub ch: IndentChar,
    /// Characters per nesting level
    pub size: usize,
}

impl Tabulation {
    /// Create new tabulation
    #[inline]
    #[must_use]
    pub const fn new(ch: IndentChar, size: usize) -> Self {
        Self { ch, size }
    }

    /// `size` spaces per level
    #[inline]
    #[must_use]
    pub const fn spaces(size: usize) -> Self {
        Self::new(IndentChar::Space, size)
    }

    /// One tab per level
    #[inline]
    #[must_use]
    pub const fn tabs() -> Self {
        Self::new(IndentChar::Tab, 1)
    }

    /// Indentation string for one nesting level
    #[must_use]
    pub fn unit(&self) -> String {
        std::iter::repeat(self.ch.as_char()).take(self.size.max(1)).collect()
    }
}

impl Default for Tabulation {
    fn default() -> Self {
        Self::spaces(4)
    }
}

/// Indentation and line width used to render generated fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormattingProfile {
    /// Indentation
    pub tabulation: Tabulation,
    /// Preferred maximum line length
    pub line_width: usize,
}

impl FormattingProfile {
    /// Create new profile
    #[inline]
    #[must_use]
    pub const fn new(tabulation: Tabulation, line_width: usize) -> Self {
        Self { tabulation, line_width }
    }

    /// Detect the profile of `text`.
    ///
    /// A complete `override_with` is used unchanged. A partial override only
    /// replaces the parts it defines.
    #[must_use]
    pub fn detect(text: &str, override_with: Option<&FormattingOverride>) -> Self {
        if let Some(profile) = override_with.and_then(FormattingOverride::complete) {
            return profile;
        }

        let line_width = override_with
            .and_then(|o| o.line_width)
            .unwrap_or_else(|| detect_line_width(text));
        let tabulation = override_with
            .and_then(|o| o.tabulation)
            .unwrap_or_else(|| detect_tabulation(text));

        Self { tabulation, line_width }
    }
}

impl Default for FormattingProfile {
    fn default() -> Self {
        Self::new(Tabulation::default(), MIN_LINE_WIDTH)
    }
}

/// User-supplied formatting, possibly partial
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormattingOverride {
    /// Fixed indentation
    pub tabulation: Option<Tabulation>,
    /// Fixed line width
    pub line_width: Option<usize>,
}

impl FormattingOverride {
    /// Set indentation
    #[inline]
    #[must_use]
    pub fn with_tabulation(mut self, tabulation: Tabulation) -> Self {
        self.tabulation = Some(tabulation);
        self
    }

    /// Set line width
    #[inline]
    #[must_use]
    pub fn with_line_width(mut self, width: usize) -> Self {
        self.line_width = Some(width);
        self
    }

    /// Profile if every part is defined
    #[inline]
    #[must_use]
    pub fn complete(&self) -> Option<FormattingProfile> {
        Some(FormattingProfile::new(self.tabulation?, self.line_width?))
    }
}

/// Longest line rounded to the nearest multiple of ten (halves up), never below [`MIN_LINE_WIDTH`].
fn detect_line_width(text: &str) -> usize {
    let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    ((longest + 5) / 10 * 10).max(MIN_LINE_WIDTH)
}

fn detect_tabulation(text: &str) -> Tabulation {
    let leading = |c: char| -> Vec<usize> {
        text.lines()
            .map(|line| line.chars().take_while(|&ch| ch == c).count())
            .collect()
    };
    // Single leading spaces are javadoc continuation lines, not indentation
    let spaces: Vec<usize> = leading(' ').into_iter().filter(|&n| n > 1).collect();
    let tabs: Vec<usize> = leading('\t').into_iter().filter(|&n| n > 0).collect();

    if spaces.len() > tabs.len() {
        Tabulation::spaces(indent_size(&spaces, 2).unwrap_or(4))
    } else {
        Tabulation::new(IndentChar::Tab, indent_size(&tabs, 1).unwrap_or(1))
    }
}

/// Most frequent step between consecutive indentation runs.
///
/// The first run counts as a step from zero. Steps below `min` are ignored.
/// Equally frequent steps resolve to the smallest one.
fn indent_size(runs: &[usize], min: usize) -> Option<usize> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    let mut previous = 0usize;
    for &run in runs {
        if run >= previous + min {
            *counts.entry(run - previous).or_default() += 1;
        }
        previous = run;
    }
    counts
        .into_iter()
        .max_by(|(size_a, count_a), (size_b, count_b)| count_a.cmp(count_b).then(size_b.cmp(size_a)))
        .map(|(size, _)| size)
}
