//! Generated fragment formatter
//!
//! Generated members are produced from flat templates. Before they are
//! spliced into a file they are re-indented by brace depth with the file's
//! own [`FormattingProfile`], javadoc continuation lines are aligned and
//! one-line javadoc that would overflow the line width is broken up. Code
//! lines over the width are broken after argument commas, with continuation
//! lines indented by two extra units.

use daoweave_artifact::FormattingProfile;

use crate::error::{SyntaxError, SyntaxResult};
use crate::tree::check_syntax;

/// Indent units added to wrapped code lines
const CONTINUATION_UNITS: usize = 2;

/// Formats member fragments for one target file
#[derive(Debug, Clone, Default)]
pub struct FragmentFormatter {
    profile: FormattingProfile,
}

impl FragmentFormatter {
    /// Create formatter for a profile
    #[inline]
    #[must_use]
    pub fn new(profile: FormattingProfile) -> Self {
        Self { profile }
    }

    /// Profile in use
    #[inline]
    #[must_use]
    pub fn profile(&self) -> &FormattingProfile {
        &self.profile
    }

    /// Format a fragment at depth zero
    ///
    /// # Errors
    /// [`SyntaxError::Format`] if the fragment is not a valid class body member
    pub fn format(&self, fragment: &str) -> SyntaxResult<String> {
        self.format_at(fragment, "")
    }

    /// Format a fragment and prefix every non-blank line with `base`
    ///
    /// `base` counts towards the line width when long javadoc is wrapped.
    ///
    /// # Errors
    /// [`SyntaxError::Format`] if the fragment is not a valid class body member
    pub fn format_at(&self, fragment: &str, base: &str) -> SyntaxResult<String> {
        check_syntax(&format!("class __Fragment {{\n{fragment}\n}}")).map_err(|e| match e {
            SyntaxError::Invalid { line, snippet, .. } => SyntaxError::format(
                format!("syntax error at fragment line {}: {snippet}", line.saturating_sub(1)),
                fragment,
            ),
            other => SyntaxError::format(other.to_string(), fragment),
        })?;

        let unit = self.profile.tabulation.unit();
        let base_columns = self.columns(base);
        let mut out: Vec<String> = Vec::new();
        let mut depth = 0usize;
        let mut in_comment = false;

        for raw in fragment.lines() {
            let line = raw.trim();
            if line.is_empty() {
                if out.last().is_some_and(|l| !l.is_empty()) {
                    out.push(String::new());
                }
                continue;
            }

            if in_comment {
                let indent = format!("{base}{}", unit.repeat(depth));
                if line.starts_with('*') {
                    out.push(format!("{indent} {line}"));
                } else {
                    out.push(format!("{indent}{line}"));
                }
                scan_braces(line, &mut in_comment);
                continue;
            }

            let closers = line.chars().take_while(|c| *c == '}').count();
            let indent = format!("{base}{}", unit.repeat(depth.saturating_sub(closers)));

            if is_one_line_javadoc(line)
                && base_columns + self.columns(&indent[base.len()..]) + line.chars().count()
                    > self.profile.line_width
            {
                let width = self.profile.line_width.saturating_sub(base_columns);
                out.extend(wrap_javadoc(line, &indent, width, self.columns(&indent[base.len()..])));
            } else if !line.starts_with("//") && self.columns(&indent) + line.chars().count() > self.profile.line_width {
                let continuation = format!("{indent}{}", unit.repeat(CONTINUATION_UNITS));
                out.extend(wrap_code(line, &indent, &continuation, self.profile.line_width, |l| {
                    self.columns(l)
                }));
            } else {
                out.push(format!("{indent}{line}"));
            }

            let delta = scan_braces(line, &mut in_comment);
            depth = depth.saturating_add_signed(delta);
        }

        while out.last().is_some_and(String::is_empty) {
            out.pop();
        }
        Ok(out.join("\n"))
    }

    fn columns(&self, indent: &str) -> usize {
        indent
            .chars()
            .map(|c| if c == '\t' { self.profile.tabulation.size } else { 1 })
            .sum()
    }
}

fn is_one_line_javadoc(line: &str) -> bool {
    line.starts_with("/**") && line.ends_with("*/") && line.len() > 5
}

/// Break `/** text */` into a multi-line javadoc no wider than `width`
fn wrap_javadoc(line: &str, indent: &str, width: usize, indent_columns: usize) -> Vec<String> {
    let body = line
        .trim_start_matches("/**")
        .trim_end_matches("*/")
        .trim();
    let room = width.saturating_sub(indent_columns + 3).max(1);

    let mut lines = vec![format!("{indent}/**")];
    let mut current = String::new();
    for word in body.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > room {
            lines.push(format!("{indent} * {current}"));
            current.clear();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(format!("{indent} * {current}"));
    }
    lines.push(format!("{indent} */"));
    lines
}

/// Break a code line after argument commas so that lines fit `width` where possible
fn wrap_code(
    line: &str,
    indent: &str,
    continuation: &str,
    width: usize,
    columns: impl Fn(&str) -> usize,
) -> Vec<String> {
    let mut segments = split_arguments(line).into_iter();
    let mut current = format!("{indent}{}", segments.next().unwrap_or(line));
    let mut lines = Vec::new();
    for segment in segments {
        let segment = segment.trim_start();
        if columns(&current) + 1 + segment.chars().count() > width {
            lines.push(std::mem::replace(&mut current, format!("{continuation}{segment}")));
        } else {
            current.push(' ');
            current.push_str(segment);
        }
    }
    lines.push(current);
    lines
}

/// Pieces of `line` ending at commas inside parentheses, outside literals and type arguments
fn split_arguments(line: &str) -> Vec<&str> {
    let bytes = line.as_bytes();
    let mut parts = Vec::new();
    let (mut start, mut parens, mut angles) = (0usize, 0usize, 0usize);
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'(' => parens += 1,
            b')' => parens = parens.saturating_sub(1),
            b'<' if i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_') => angles += 1,
            b'>' if angles > 0 => angles -= 1,
            b',' if parens > 0 && angles == 0 => {
                parts.push(&line[start..=i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&line[start..]);
    parts
}

/// Net brace depth change of one line, ignoring literals and comments
fn scan_braces(line: &str, in_comment: &mut bool) -> isize {
    let bytes = line.as_bytes();
    let mut delta = 0isize;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        if *in_comment {
            if b == b'*' && next == Some(b'/') {
                *in_comment = false;
                i += 2;
            } else {
                i += 1;
            }
            continue;
        }
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match (b, next) {
            (b'"' | b'\'', _) => quote = Some(b),
            (b'/', Some(b'/')) => break,
            (b'/', Some(b'*')) => {
                *in_comment = true;
                i += 2;
                continue;
            }
            (b'{', _) => delta += 1,
            (b'}', _) => delta -= 1,
            _ => {}
        }
        i += 1;
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use daoweave_artifact::{canonicalize, Tabulation};
    use pretty_assertions::assert_eq;

    fn spaces(n: usize) -> FragmentFormatter {
        FragmentFormatter::new(FormattingProfile::new(Tabulation::spaces(n), 80))
    }

    #[test]
    fn reindents_by_brace_depth() {
        let out = spaces(4)
            .format("public void a() {\nif (b) {\nreturn;\n}\n}")
            .unwrap();
        assert_eq!(out, "public void a() {\n    if (b) {\n        return;\n    }\n}");
    }

    #[test]
    fn uses_tabs_when_profile_does() {
        let f = FragmentFormatter::new(FormattingProfile::new(Tabulation::tabs(), 120));
        let out = f.format("int a() {\nreturn 1;\n}").unwrap();
        assert_eq!(out, "int a() {\n\treturn 1;\n}");
    }

    #[test]
    fn ignores_braces_in_strings_and_comments() {
        let out = spaces(2)
            .format("String a() {\nreturn \"{\"; // }\n}")
            .unwrap();
        assert_eq!(out, "String a() {\n  return \"{\"; // }\n}");
    }

    #[test]
    fn aligns_javadoc_continuation_lines() {
        let out = spaces(4)
            .format("/**\n* Used to resolve relations\n*/\nprivate int a;")
            .unwrap();
        assert_eq!(out, "/**\n * Used to resolve relations\n */\nprivate int a;");
    }

    #[test]
    fn collapses_blank_lines() {
        let out = spaces(4).format("int a;\n\n\n\nint b;\n\n").unwrap();
        assert_eq!(out, "int a;\n\nint b;");
    }

    #[test]
    fn prefixes_base_indent() {
        let out = spaces(4)
            .format_at("void a() {\nreturn;\n}", "    ")
            .unwrap();
        assert_eq!(out, "    void a() {\n        return;\n    }");
    }

    #[test]
    fn wraps_long_one_line_javadoc() {
        let long = "/** Convenient call for an update operation on the entity that must be attached to a session. */\nvoid update() {\n}";
        let out = spaces(4).format_at(long, "    ").unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "    /**");
        assert!(lines[1].starts_with("     * Convenient"));
        assert!(lines.iter().all(|l| l.len() <= 80));
        assert!(out.contains("     */\n    void update() {"));
    }

    #[test]
    fn short_javadoc_stays_on_one_line() {
        let out = spaces(4).format("/** Short */\nint a;").unwrap();
        assert_eq!(out, "/** Short */\nint a;");
    }

    #[test]
    fn wraps_long_parameter_list() {
        let fragment = "public Sample(Long id, Integer count, Boolean enabled, String description, Map<String, Long> ratios) {\nthis.id = id;\n}";
        let out = spaces(4).format_at(fragment, "    ").unwrap();
        assert_eq!(
            out,
            "    public Sample(Long id, Integer count, Boolean enabled, String description,\n            \
             Map<String, Long> ratios) {\n        this.id = id;\n    }"
        );
        assert_eq!(canonicalize(&out), canonicalize(fragment));
    }

    #[test]
    fn long_line_without_arguments_is_kept() {
        let fragment = "void a() {\nthrow new IllegalStateException(\"To-one property 'customerId' has not-null constraint, cannot set to null\");\n}";
        let out = spaces(4).format(fragment).unwrap();
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn rejects_invalid_fragment() {
        let err = spaces(4).format("void a() {").unwrap_err();
        assert!(matches!(err, SyntaxError::Format { .. }));
    }
}
