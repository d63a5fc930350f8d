use std::collections::HashMap;

/// Lexical rules for one language. Just enough structure for the generic
/// scanner: keyword set, comment markers, string delimiters.
#[derive(Clone, Debug)]
pub struct Grammar {
    pub keywords: &'static [&'static str],
    pub line_comment: Option<&'static str>,
    pub block_comment: Option<(&'static str, &'static str)>,
    pub string_delimiters: &'static [char],
}

/// Highlighting capability: a grammar registry plus a function turning source
/// text into markup whose spans carry `token <name>` classes.
pub trait Tokenizer {
    fn grammar(&self, lang: &str) -> Option<&Grammar>;
    fn highlight(&self, text: &str, grammar: &Grammar, lang: &str) -> String;
}

/// Fallback used when no engine is configured: empty registry, passthrough
/// highlight. Rendering degrades to plain text instead of failing.
pub struct NoopTokenizer;

impl Tokenizer for NoopTokenizer {
    fn grammar(&self, _lang: &str) -> Option<&Grammar> {
        None
    }

    fn highlight(&self, text: &str, _grammar: &Grammar, _lang: &str) -> String {
        text.to_owned()
    }
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while",
];

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "int", "long", "register", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void",
    "volatile", "while",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

const JS_KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "of", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while",
    "with", "yield",
];

const PUNCTUATION: &str = "{}()[];:,.=+-*/%!&|^~?<>#@";

/// Built-in engine: a generic scanner covering strings, comments, numbers,
/// keywords and punctuation, with a small registry of common languages.
pub struct TokenEngine {
    languages: HashMap<String, Grammar>,
}

impl TokenEngine {
    pub fn new() -> TokenEngine {
        let mut engine = TokenEngine {
            languages: HashMap::new(),
        };

        engine.register(
            "rust",
            Grammar {
                keywords: RUST_KEYWORDS,
                line_comment: Some("//"),
                block_comment: Some(("/*", "*/")),
                string_delimiters: &['"'],
            },
        );
        engine.register(
            "c",
            Grammar {
                keywords: C_KEYWORDS,
                line_comment: Some("//"),
                block_comment: Some(("/*", "*/")),
                string_delimiters: &['"', '\''],
            },
        );
        engine.register(
            "python",
            Grammar {
                keywords: PYTHON_KEYWORDS,
                line_comment: Some("#"),
                block_comment: None,
                string_delimiters: &['"', '\''],
            },
        );
        let javascript = Grammar {
            keywords: JS_KEYWORDS,
            line_comment: Some("//"),
            block_comment: Some(("/*", "*/")),
            string_delimiters: &['"', '\'', '`'],
        };
        engine.register("js", javascript.clone());
        engine.register("javascript", javascript);

        engine
    }

    pub fn register(&mut self, lang: &str, grammar: Grammar) {
        self.languages.insert(lang.to_owned(), grammar);
    }
}

impl Default for TokenEngine {
    fn default() -> Self {
        TokenEngine::new()
    }
}

impl Tokenizer for TokenEngine {
    fn grammar(&self, lang: &str) -> Option<&Grammar> {
        self.languages.get(lang)
    }

    fn highlight(&self, text: &str, grammar: &Grammar, _lang: &str) -> String {
        let mut out = String::new();
        let mut i = 0;

        while i < text.len() {
            let rest = &text[i..];

            if let Some(marker) = grammar.line_comment {
                if rest.starts_with(marker) {
                    let end = rest.find('\n').map(|n| i + n).unwrap_or(text.len());
                    push_span(&mut out, "comment", &text[i..end]);
                    i = end;
                    continue;
                }
            }

            if let Some((open, close)) = grammar.block_comment {
                if rest.starts_with(open) {
                    let end = rest[open.len()..]
                        .find(close)
                        .map(|n| i + open.len() + n + close.len())
                        .unwrap_or(text.len());
                    push_span(&mut out, "comment", &text[i..end]);
                    i = end;
                    continue;
                }
            }

            let Some(c) = rest.chars().next() else { break };

            if grammar.string_delimiters.contains(&c) {
                let body_start = i + c.len_utf8();
                let mut end = text.len();
                let mut escaped = false;
                for (off, ch) in text[body_start..].char_indices() {
                    if escaped {
                        escaped = false;
                        continue;
                    }
                    if ch == '\\' {
                        escaped = true;
                        continue;
                    }
                    if ch == c {
                        end = body_start + off + ch.len_utf8();
                        break;
                    }
                }
                push_span(&mut out, "string", &text[i..end]);
                i = end;
                continue;
            }

            if c.is_ascii_digit() {
                let len = rest
                    .find(|ch: char| !ch.is_ascii_alphanumeric() && ch != '.' && ch != '_')
                    .unwrap_or(rest.len());
                push_span(&mut out, "number", &rest[..len]);
                i += len;
                continue;
            }

            if c.is_alphabetic() || c == '_' {
                let len = rest
                    .find(|ch: char| !ch.is_alphanumeric() && ch != '_')
                    .unwrap_or(rest.len());
                let word = &rest[..len];
                if grammar.keywords.contains(&word) {
                    push_span(&mut out, "keyword", word);
                } else {
                    out.push_str(&escape(word));
                }
                i += len;
                continue;
            }

            if PUNCTUATION.contains(c) {
                push_span(&mut out, "punctuation", &rest[..c.len_utf8()]);
            } else {
                out.push_str(&escape(&rest[..c.len_utf8()]));
            }
            i += c.len_utf8();
        }

        out
    }
}

fn push_span(out: &mut String, token: &str, text: &str) {
    out.push_str("<span class=\"token ");
    out.push_str(token);
    out.push_str("\">");
    out.push_str(&escape(text));
    out.push_str("</span>");
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
