// src/transform/minify.rs

//! Built-in production minifiers.
//!
//! All three are conservative: they only drop comments and whitespace and
//! never rewrite tokens, so their output behaves like their input.

use std::iter::Peekable;
use std::str::Chars;
use std::sync::LazyLock;

use regex::Regex;

static PRESERVE_HTML: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<pre\b.*?</pre>|<textarea\b.*?</textarea>|<script\b.*?</script>|<style\b.*?</style>")
        .expect("valid regex")
});
static BETWEEN_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapse inter-tag whitespace. Contents of `pre`, `textarea`, `script`
/// and `style` elements are kept verbatim.
pub fn collapse_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for m in PRESERVE_HTML.find_iter(html) {
        out.push_str(&collapse_segment(&html[last..m.start()]));
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&collapse_segment(&html[last..]));
    out.trim().to_string()
}

fn collapse_segment(segment: &str) -> String {
    let tight = BETWEEN_TAGS.replace_all(segment, "><");
    WHITESPACE.replace_all(&tight, " ").into_owned()
}

/// Characters after which whitespace is never needed in CSS.
const CSS_NO_SPACE_AFTER: &[char] = &['{', '}', ';', ',', '>', ':', '('];
/// Characters before which whitespace is never needed in CSS.
const CSS_NO_SPACE_BEFORE: &[char] = &['{', '}', ';', ',', '>', ')'];

/// Compressed CSS output: comments dropped, whitespace collapsed, last `;`
/// of a block removed.
pub fn compress_css(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut chars = css.chars().peekable();
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                skip_block_comment(&mut chars);
                pending_space = true;
            }
            '"' | '\'' => {
                flush_css_space(&mut out, &mut pending_space, c);
                out.push(c);
                copy_quoted(&mut chars, &mut out, c);
            }
            c if c.is_whitespace() => pending_space = true,
            _ => {
                flush_css_space(&mut out, &mut pending_space, c);
                if c == '}' && out.ends_with(';') {
                    out.pop();
                }
                out.push(c);
            }
        }
    }

    out
}

fn flush_css_space(out: &mut String, pending: &mut bool, next: char) {
    if std::mem::take(pending)
        && !out.is_empty()
        && !out.ends_with(CSS_NO_SPACE_AFTER)
        && !CSS_NO_SPACE_BEFORE.contains(&next)
    {
        out.push(' ');
    }
}

/// Minified JavaScript: comments and indentation removed, blank lines
/// dropped. Line breaks are kept so automatic semicolon insertion still
/// applies. Strings, template literals and regex literals are copied
/// verbatim.
pub fn minify_js(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut pending_space = false;
    let mut pending_newline = false;
    let mut last: Option<char> = None;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'/') => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
                pending_newline = true;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                if skip_block_comment(&mut chars) {
                    pending_newline = true;
                } else {
                    pending_space = true;
                }
            }
            '"' | '\'' | '`' => {
                flush_js_space(&mut out, &mut pending_space, &mut pending_newline, c);
                out.push(c);
                copy_quoted(&mut chars, &mut out, c);
                last = Some(c);
            }
            '/' if regex_allowed(&out, last) => {
                flush_js_space(&mut out, &mut pending_space, &mut pending_newline, c);
                out.push(c);
                copy_regex(&mut chars, &mut out);
                last = Some('/');
            }
            '\n' => pending_newline = true,
            c if c.is_whitespace() => pending_space = true,
            _ => {
                flush_js_space(&mut out, &mut pending_space, &mut pending_newline, c);
                out.push(c);
                last = Some(c);
            }
        }
    }

    out
}

fn flush_js_space(out: &mut String, space: &mut bool, newline: &mut bool, next: char) {
    let space = std::mem::take(space);
    let newline = std::mem::take(newline);
    if out.is_empty() {
        return;
    }
    if newline {
        out.push('\n');
    } else if space {
        let prev = out.chars().next_back().unwrap_or(' ');
        let both_words = is_word(prev) && is_word(next);
        // `a + +b`, `a - -b`
        let repeated_op = prev == next && (prev == '+' || prev == '-');
        if both_words || repeated_op {
            out.push(' ');
        }
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || !c.is_ascii()
}

/// A `/` starts a regex literal after an operator or keyword, and is a
/// division after an operand.
fn regex_allowed(out: &str, last: Option<char>) -> bool {
    match last {
        None => true,
        Some(c) if "(,=:[!&|?{};+-*%<>~^".contains(c) => true,
        Some(_) => ["return", "typeof", "case", "do", "else", "in"]
            .iter()
            .any(|kw| ends_with_keyword(out, kw)),
    }
}

fn ends_with_keyword(out: &str, kw: &str) -> bool {
    out.strip_suffix(kw)
        .is_some_and(|rest| !rest.chars().next_back().is_some_and(is_word))
}

/// Consume up to and including `*/`. Returns whether the comment spanned a
/// line break.
fn skip_block_comment(chars: &mut Peekable<Chars<'_>>) -> bool {
    let mut prev = '\0';
    let mut multiline = false;
    for n in chars.by_ref() {
        if prev == '*' && n == '/' {
            break;
        }
        multiline |= n == '\n';
        prev = n;
    }
    multiline
}

/// Copy a quoted string body (the opening quote is already written).
fn copy_quoted(chars: &mut Peekable<Chars<'_>>, out: &mut String, quote: char) {
    while let Some(n) = chars.next() {
        out.push(n);
        if n == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
            continue;
        }
        if n == quote {
            break;
        }
    }
}

/// Copy a regex literal body up to its closing `/`, honouring escapes and
/// character classes.
fn copy_regex(chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    let mut in_class = false;
    while let Some(n) = chars.next() {
        out.push(n);
        match n {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => break,
            '\n' => break,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_is_compressed() {
        let css = "/* header */\n.a > .b ,\n.c {\n  color : red;\n  margin: 0 auto;\n}\n";
        assert_eq!(compress_css(css), ".a>.b,.c{color :red;margin:0 auto}");
    }

    #[test]
    fn css_keeps_strings_and_media_spacing() {
        let css = "@media screen and (max-width: 10px) {\n a::after { content: \"a  ;  b\"; }\n}";
        assert_eq!(
            compress_css(css),
            "@media screen and (max-width:10px){a::after{content:\"a  ;  b\"}}"
        );
    }

    #[test]
    fn js_drops_comments_and_indentation() {
        let js = "// banner\nfunction add(a, b) {\n    /* sum */\n    return a + b; // done\n}\n\n\nadd(1, 2);\n";
        assert_eq!(minify_js(js), "function add(a,b){\nreturn a+b;\n}\nadd(1,2);");
    }

    #[test]
    fn js_keeps_strings_regexes_and_unary_operators() {
        let js = "var s = 'a // b';\nvar r = /\\/\\/ +x/g;\nvar n = a + +b;";
        assert_eq!(
            minify_js(js),
            "var s='a // b';\nvar r=/\\/\\/ +x/g;\nvar n=a+ +b;"
        );
    }

    #[test]
    fn html_collapses_between_tags_but_not_in_pre() {
        let html = "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>\n<pre>  x\n  y</pre>";
        assert_eq!(
            collapse_html(html),
            "<ul><li>a</li><li>b</li></ul> <pre>  x\n  y</pre>"
        );
    }
}
