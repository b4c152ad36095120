//! Canonical form of Java source snippets
//!
//! Two snippets that differ only in whitespace and layout share one canonical
//! form. Comment text stays significant: editing a comment changes the form.
//!
//! Every regular expression below is part of the fingerprint contract. Changing
//! any of them invalidates every hash already recorded in user sources.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Trailing `//` comment on the last line of the snippet.
///
/// Only a comment that runs up to the end of input (optionally followed by a
/// single final line terminator) is rewritten; earlier line comments are left
/// for the whitespace pass.
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"//([^\n\r\x{85}\x{2028}\x{2029}]*)(\r\n|[\n\r\x{85}\x{2028}\x{2029}])?\z")
        .expect("line comment pattern is valid")
});

/// Shortest `/* ... */` block, spanning lines.
static BLOCK_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern is valid"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \n\t\r]+").expect("whitespace pattern is valid"));

/// One optional whitespace character on each side of a non-word character.
static PADDED_SYMBOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[ \t\n\x0B\x0C\r]?([^a-zA-Z0-9_])[ \t\n\x0B\x0C\r]?")
        .expect("symbol padding pattern is valid")
});

/// Ownership annotation carrying arguments, with or without its package.
static GENERATED_ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@(org.greenrobot.greendao.annotation.)?Generated[(][^)]+[)]")
        .expect("generated annotation pattern is valid")
});

/// Reduce `code` to its canonical form.
///
/// # Examples
///
/// ```
/// use daoweave_artifact::canonicalize;
///
/// let a = canonicalize("public Note() {\n}");
/// let b = canonicalize("public   Note( )\n{ }");
/// assert_eq!(a, b);
/// assert_eq!(a, "public Note(){}");
/// ```
#[must_use]
pub fn canonicalize(code: &str) -> String {
    let code = LINE_COMMENT.replace(code, "/*${1}*/${2}");
    let code = BLOCK_COMMENT.replace_all(&code, |caps: &Captures<'_>| {
        let stripped = caps[0].replace('*', "");
        format!("/*{}*/", stripped.trim())
    });
    let code = WHITESPACE_RUN.replace_all(&code, " ");
    let code = PADDED_SYMBOL.replace_all(&code, "${1}");
    code.trim().to_string()
}

/// Remove every `@Generated(...)` annotation that carries arguments.
///
/// A bare `@Generated` is not touched.
#[must_use]
pub fn strip_generated(code: &str) -> Cow<'_, str> {
    GENERATED_ANNOTATION.replace_all(code, "")
}

/// Compare two snippets ignoring layout and their ownership annotations.
#[must_use]
pub fn is_same_code(left: &str, right: &str) -> bool {
    canonicalize(&strip_generated(left)) == canonicalize(&strip_generated(right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collapses_whitespace_around_symbols() {
        let code = "public void setAge(int age) {\n    this.age = age;\n}";
        assert_eq!(canonicalize(code), "public void setAge(int age){this.age=age;}");
    }

    #[test]
    fn keeps_single_space_between_words() {
        assert_eq!(canonicalize("private  transient\tDaoSession   daoSession;"), "private transient DaoSession daoSession;");
    }

    #[test]
    fn block_comment_loses_asterisks() {
        let code = "/**\n * Used to resolve relations\n */\nprivate transient DaoSession daoSession;";
        assert_eq!(
            canonicalize(code),
            "/*/Used to resolve relations/*/private transient DaoSession daoSession;"
        );
    }

    #[test]
    fn javadoc_layout_does_not_matter() {
        let one_line = "/** Used for active entity operations. */\nprivate transient NoteDao myDao;";
        let wrapped = "/**\n     * Used for active entity operations.\n     */\n    private transient NoteDao myDao;";
        assert_eq!(canonicalize(one_line), canonicalize(wrapped));
    }

    #[test]
    fn comment_text_is_significant() {
        let a = "/** To-one relationship */ void a() {}";
        let b = "/** To-many relationship */ void a() {}";
        assert_ne!(canonicalize(a), canonicalize(b));
    }

    #[test]
    fn trailing_line_comment_becomes_block() {
        assert_eq!(canonicalize("int a; // done"), "int a;/*/done/*/");
        assert_eq!(canonicalize("int a; // done\n"), "int a;/*/done/*/");
    }

    #[test]
    fn inner_line_comment_is_left_for_whitespace_pass() {
        let code = "void a() {\n    // note\n    b();\n}";
        assert_eq!(canonicalize(code), "void a(){//note b();}");
    }

    #[test]
    fn strip_generated_removes_hash_argument() {
        let code = "@Generated(hash = 1272611929)\npublic Note() {\n}";
        assert_eq!(strip_generated(code), "\npublic Note() {\n}");
    }

    #[test]
    fn strip_generated_removes_qualified_annotation() {
        let code = "@org.greenrobot.greendao.annotation.Generated(hash = 5) void a() {}";
        assert_eq!(strip_generated(code), " void a() {}");
    }

    #[test]
    fn strip_generated_keeps_bare_marker() {
        let code = "@Generated\npublic Note() {\n}";
        assert_eq!(strip_generated(code), code);
    }

    #[test]
    fn same_code_ignores_hash_and_layout() {
        let old = "@Generated(hash = 1)\npublic Note(Long id) {\n        this.id = id;\n    }";
        let new = "@Generated(hash = 2)\npublic Note(Long id) {\n    this.id = id;\n}";
        assert!(is_same_code(old, new));
        assert!(!is_same_code(old, "public Note(Long id) {}"));
    }
}
