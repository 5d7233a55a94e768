//! Lightweight syntax highlighting for module content.
//!
//! This is a tokenizer, not a parser: it never rejects input. Text is escaped
//! first and then passed through an ordered pipeline of tagging rules. The
//! buffer is a sequence of plain and tagged spans; each rule only scans plain
//! spans, so text tagged by an earlier rule is never matched again.
//!
//! Rules run on escaped text, so quotes are seen as `&quot;` and `&#39;`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Textual formats the highlighter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    /// Line-oriented, indentation-based `key: value` format.
    Secondary,
}

/// Class of a tagged token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Key,
    Str,
    Bool,
    Null,
    Num,
    Comment,
}

impl TokenClass {
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Key => "tok-key",
            Self::Str => "tok-str",
            Self::Bool => "tok-bool",
            Self::Null => "tok-null",
            Self::Num => "tok-num",
            Self::Comment => "tok-comm",
        }
    }
}

/// A tagging rule. Only the `tok` capture group is tagged; the rest of a
/// match stays plain and is not offered to later rules either.
struct Rule {
    class: TokenClass,
    pattern: Regex,
}

impl Rule {
    fn new(class: TokenClass, pattern: &str) -> Self {
        Self {
            class,
            pattern: Regex::new(pattern).expect("Valid highlight regex"),
        }
    }
}

// A quoted string in escaped text. Entities other than the closing quote are
// kept whole so a string never ends inside `&amp;` and friends.
const DQ_STRING: &str = r"&quot;(?:\\.|[^\\&\n]|&(?:amp|lt|gt|#39);)*&quot;";
const SQ_STRING: &str = r"&#39;(?:[^&\n]|&(?:amp|lt|gt|quot);)*&#39;";

const BOOL: &str = r"\b(?P<tok>true|false)\b";
const NULL: &str = r"\b(?P<tok>null)\b";
// The leading class keeps digits glued to words and the `#39` of an escaped
// quote out of the number rule.
const NUMBER: &str = r"(?m)(?:^|[^\w.#])(?P<tok>-?\d+(?:\.\d+)?)\b";

static JSON_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(TokenClass::Key, &format!(r"(?P<tok>{DQ_STRING})\s*:")),
        Rule::new(TokenClass::Str, &format!("(?P<tok>{DQ_STRING})")),
        Rule::new(TokenClass::Bool, BOOL),
        Rule::new(TokenClass::Null, NULL),
        Rule::new(TokenClass::Num, NUMBER),
    ]
});

static SECONDARY_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(TokenClass::Comment, r"(?m)^(?P<tok>[ \t]*#.*)$"),
        Rule::new(
            TokenClass::Key,
            r"(?m)^[ \t]*(?:-[ \t]+)?(?P<tok>[^:\s#-][^:\n]*):(?:[ \t]|$)",
        ),
        Rule::new(
            TokenClass::Str,
            &format!("(?P<tok>{DQ_STRING}|{SQ_STRING})"),
        ),
        Rule::new(TokenClass::Bool, BOOL),
        Rule::new(TokenClass::Null, NULL),
        Rule::new(TokenClass::Num, NUMBER),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Span {
    Plain(String),
    Tagged(TokenClass, String),
}

/// Escaped text split into plain and tagged spans.
#[derive(Debug)]
struct Spans(Vec<Span>);

impl Spans {
    fn escaped(text: &str) -> Self {
        Self(vec![Span::Plain(escape_html(text))])
    }

    fn apply(&mut self, rule: &Rule) {
        let mut out = Vec::with_capacity(self.0.len());
        for span in self.0.drain(..) {
            let text = match span {
                Span::Plain(text) => text,
                tagged => {
                    out.push(tagged);
                    continue;
                }
            };

            let mut last = 0;
            for caps in rule.pattern.captures_iter(&text) {
                let Some(tok) = caps.name("tok") else {
                    continue;
                };
                if tok.start() > last {
                    out.push(Span::Plain(text[last..tok.start()].to_string()));
                }
                out.push(Span::Tagged(rule.class, tok.as_str().to_string()));
                last = tok.end();
            }
            if last < text.len() {
                out.push(Span::Plain(text[last..].to_string()));
            }
        }
        self.0 = out;
    }

    fn into_markup(self) -> String {
        let mut markup = String::new();
        for span in self.0 {
            match span {
                Span::Plain(text) => markup.push_str(&text),
                Span::Tagged(class, text) => {
                    markup.push_str("<span class=\"");
                    markup.push_str(class.css_class());
                    markup.push_str("\">");
                    markup.push_str(&text);
                    markup.push_str("</span>");
                }
            }
        }
        markup
    }
}

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Highlight raw (un-annotated) text as markup.
///
/// Must not be applied to its own output.
pub fn highlight(text: &str, format: Format) -> String {
    let rules: &[Rule] = match format {
        Format::Json => &JSON_RULES,
        Format::Secondary => &SECONDARY_RULES,
    };
    let mut spans = Spans::escaped(text);
    for rule in rules {
        spans.apply(rule);
    }
    spans.into_markup()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_tags(markup: &str) -> String {
        let open = Regex::new(r#"<span class="tok-[a-z]+">"#).unwrap();
        open.replace_all(markup, "").replace("</span>", "")
    }

    #[test]
    fn test_json_keys_and_strings_are_distinct() {
        let out = highlight(r#"{"host": "a"}"#, Format::Json);
        assert_eq!(
            out,
            "{<span class=\"tok-key\">&quot;host&quot;</span>: <span class=\"tok-str\">&quot;a&quot;</span>}"
        );
    }

    #[test]
    fn test_json_scalars() {
        let out = highlight(r#"[true, null, -1.5, 3]"#, Format::Json);
        assert!(out.contains("<span class=\"tok-bool\">true</span>"));
        assert!(out.contains("<span class=\"tok-null\">null</span>"));
        assert!(out.contains("<span class=\"tok-num\">-1.5</span>"));
        assert!(out.contains("<span class=\"tok-num\">3</span>"));
    }

    #[test]
    fn test_tagged_tokens_are_not_retagged() {
        let out = highlight(r#"{"port8080": "true"}"#, Format::Json);
        assert_eq!(out.matches("<span").count(), 2);
        assert!(!out.contains("tok-num"));
        assert!(!out.contains("tok-bool"));
    }

    #[test]
    fn test_key_lookahead_tolerates_whitespace() {
        let out = highlight("{\"a\"  \n : 1}", Format::Json);
        assert!(out.starts_with("{<span class=\"tok-key\">&quot;a&quot;</span>"));
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let out = highlight(r#"{"k": "say \"hi\""}"#, Format::Json);
        assert!(out.contains("<span class=\"tok-str\">&quot;say \\&quot;hi\\&quot;&quot;</span>"));
    }

    #[test]
    fn test_secondary_comments_keys_and_values() {
        let text = "# top\nserver:\n  host: 'a'\n  port: 80\n  debug: false\n  # nested note\n";
        let out = highlight(text, Format::Secondary);
        assert!(out.contains("<span class=\"tok-comm\"># top</span>"));
        assert!(out.contains("<span class=\"tok-comm\">  # nested note</span>"));
        assert!(out.contains("<span class=\"tok-key\">server</span>:"));
        assert!(out.contains("  <span class=\"tok-key\">host</span>: <span class=\"tok-str\">&#39;a&#39;</span>"));
        assert!(out.contains("<span class=\"tok-num\">80</span>"));
        assert!(out.contains("<span class=\"tok-bool\">false</span>"));
    }

    #[test]
    fn test_secondary_comment_contents_are_not_retagged() {
        let out = highlight("# port: 80 true", Format::Secondary);
        assert_eq!(out, "<span class=\"tok-comm\"># port: 80 true</span>");
    }

    #[test]
    fn test_secondary_list_item_key() {
        let out = highlight("- name: cam0", Format::Secondary);
        assert_eq!(out, "- <span class=\"tok-key\">name</span>: cam0");
    }

    #[test]
    fn test_escaped_quote_digits_never_become_numbers() {
        let out = highlight("msg: it's", Format::Secondary);
        assert!(!out.contains("tok-num"));
        assert!(out.contains("it&#39;s"));
    }

    #[test]
    fn test_output_is_escape_safe() {
        let inputs = [
            r#"{"<script>": "a & b", "x": '<'}"#,
            "key: <b>\"quoted\" & 'single'</b>\n# <!-- c -->",
            "&amp; already & escaped > < ' \"",
        ];
        for input in inputs {
            for format in [Format::Json, Format::Secondary] {
                let text = strip_tags(&highlight(input, format));
                for c in ['<', '>', '"', '\''] {
                    assert!(!text.contains(c), "unescaped {c:?} in {text}");
                }
                for (i, _) in text.match_indices('&') {
                    let rest = &text[i..];
                    assert!(
                        ["&amp;", "&lt;", "&gt;", "&quot;", "&#39;"]
                            .iter()
                            .any(|e| rest.starts_with(e)),
                        "bare ampersand in {text}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_malformed_input_still_produces_output() {
        let out = highlight("{\"unterminated: [1,", Format::Json);
        assert!(out.contains("<span class=\"tok-num\">1</span>"));
    }
}
