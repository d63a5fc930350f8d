use std::cell::Cell;
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::dom::{Element, Node, attrs, collect_text};
use crate::parser;
use crate::tokenizer::{NoopTokenizer, Tokenizer};

/// Decoration switches, read once at construction.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HighlightOptions {
    pub show_language_name: bool,
    pub copy_by_long_press: bool,
    pub show_line_number: bool,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        HighlightOptions {
            show_language_name: true,
            copy_by_long_press: true,
            show_line_number: false,
        }
    }
}

/// Per-render-pass view state handed in by the host traversal.
pub struct ViewContext {
    pub editable: bool,
    exposed: Cell<bool>,
}

impl ViewContext {
    pub fn new(editable: bool) -> ViewContext {
        ViewContext {
            editable,
            exposed: Cell::new(false),
        }
    }

    pub fn get_text(&self, nodes: &[Node]) -> String {
        collect_text(nodes)
    }

    /// Marks the current pass as needing interactive exposure (long-press
    /// copy). The rendering layer reads this after the walk.
    pub fn expose(&self) {
        self.exposed.set(true);
    }

    pub fn exposed(&self) -> bool {
        self.exposed.get()
    }
}

/// Rewrites `pre`/`code` blocks in place: tokenized code children, normalized
/// `hl-pre`/`hl-code` classes, and the configured decorations.
pub struct Enricher {
    options: HighlightOptions,
    tokenizer: Arc<dyn Tokenizer>,
}

impl Enricher {
    /// A missing tokenizer degrades to plain-text passthrough rather than
    /// failing the render.
    pub fn new(options: HighlightOptions, tokenizer: Option<Arc<dyn Tokenizer>>) -> Enricher {
        let tokenizer = tokenizer.unwrap_or_else(|| {
            warn!("no tokenizer engine configured, code blocks will not be highlighted");
            Arc::new(NoopTokenizer)
        });
        Enricher { options, tokenizer }
    }

    pub fn process(&self, node: &mut Node, ctx: &ViewContext) {
        let Some(pre) = node.as_element_mut() else {
            return;
        };
        if pre.name != "pre" {
            return;
        }

        if ctx.editable {
            // edit mode keeps raw text; only mark the block
            pre.add_class("hl-pre");
            return;
        }

        // last code child, searched back to front
        let Some(code_idx) = pre
            .children
            .iter()
            .rposition(|child| matches!(child, Node::Element(el) if el.name == "code"))
        else {
            return;
        };

        let pre_class = pre.class().to_owned();
        let Some(code) = pre.children[code_idx].as_element() else {
            return;
        };
        let lang = detect_language(&format!("{} {}", code.class(), pre_class));

        if code.children.is_empty() {
            return;
        }
        let text = ctx.get_text(&code.children).replace("&amp;", "&");
        if text.is_empty() {
            return;
        }

        let highlighted = self.tokenizer.grammar(&lang).map(|grammar| {
            self.tokenizer
                .highlight(&text, grammar, &lang)
                .replace("token ", "hl-")
        });

        // wrapped in <pre> so whitespace survives the re-parse
        let new_children = highlighted.and_then(|markup| {
            match parser::parse(&format!("<pre>{}</pre>", markup)) {
                Ok(nodes) => nodes.into_iter().next().and_then(|root| match root {
                    Node::Element(el) => Some(el.children),
                    Node::Text(_) => None,
                }),
                Err(e) => {
                    warn!(error = %e, lang, "highlighted markup failed to re-parse, keeping plain text");
                    None
                }
            }
        });

        if let Some(code) = pre.children[code_idx].as_element_mut() {
            if let Some(children) = new_children {
                code.children = children;
            }
            code.set_attr("class", "hl-code");
        }
        pre.set_attr("class", "hl-pre");

        if self.options.show_language_name {
            pre.children.push(Node::Element(Element {
                name: "div".to_owned(),
                attrs: attrs(&[("class", "hl-language"), ("style", "user-select:none")]),
                children: vec![Node::text(&lang)],
            }));
        }

        if self.options.copy_by_long_press {
            let style = pre.attr("style").unwrap_or("").to_owned();
            pre.set_attr("style", &format!("{};user-select:none", style));
            pre.set_attr("data-content", &text);
            ctx.expose();
        }

        if self.options.show_line_number {
            let lines = text.split('\n').count();
            let rows = (0..lines)
                .map(|_| {
                    Node::Element(Element {
                        name: "span".to_owned(),
                        attrs: attrs(&[("class", "span")]),
                        children: Vec::new(),
                    })
                })
                .collect();
            pre.children.push(Node::Element(Element {
                name: "span".to_owned(),
                attrs: attrs(&[("class", "line-numbers-rows")]),
                children: rows,
            }));
        }
    }
}

/// Picks the language identifier out of a combined class string. `language-`
/// prefixed tokens win over `lang-` ones wherever they appear; no match means
/// plain `text`.
pub fn detect_language(classes: &str) -> String {
    for prefix in ["language-", "lang-"] {
        if let Some(lang) = classes
            .split_whitespace()
            .find_map(|token| token.strip_prefix(prefix))
        {
            return lang.to_owned();
        }
    }
    "text".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::dom::Text;
    use crate::tokenizer::Grammar;

    struct StubTokenizer {
        grammar: Grammar,
        langs: Vec<&'static str>,
        output: &'static str,
        seen: RefCell<Vec<String>>,
    }

    impl StubTokenizer {
        fn new(langs: Vec<&'static str>, output: &'static str) -> Arc<StubTokenizer> {
            Arc::new(StubTokenizer {
                grammar: Grammar {
                    keywords: &[],
                    line_comment: None,
                    block_comment: None,
                    string_delimiters: &[],
                },
                langs,
                output,
                seen: RefCell::new(Vec::new()),
            })
        }
    }

    impl Tokenizer for StubTokenizer {
        fn grammar(&self, lang: &str) -> Option<&Grammar> {
            self.langs.contains(&lang).then(|| &self.grammar)
        }

        fn highlight(&self, text: &str, _grammar: &Grammar, _lang: &str) -> String {
            self.seen.borrow_mut().push(text.to_owned());
            self.output.to_owned()
        }
    }

    fn code_block(pre_class: &str, code_class: &str, code_text: &str) -> Node {
        let mut code = Element::new("code");
        if !code_class.is_empty() {
            code.set_attr("class", code_class);
        }
        if !code_text.is_empty() {
            code.children.push(Node::text(code_text));
        }
        let mut pre = Element::new("pre");
        if !pre_class.is_empty() {
            pre.set_attr("class", pre_class);
        }
        pre.children.push(Node::Element(code));
        Node::Element(pre)
    }

    fn plain_options() -> HighlightOptions {
        HighlightOptions {
            show_language_name: false,
            copy_by_long_press: false,
            show_line_number: false,
        }
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("language-python"), "python");
        assert_eq!(detect_language("lang-js"), "js");
        assert_eq!(detect_language(""), "text");
        assert_eq!(detect_language("some-other class"), "text");
        assert_eq!(detect_language("language-c extra-class"), "c");
        // language- outranks lang- regardless of position
        assert_eq!(detect_language("lang-a language-b"), "b");
    }

    #[test]
    fn test_non_pre_and_codeless_pre_are_untouched() {
        let enricher = Enricher::new(plain_options(), None);
        let ctx = ViewContext::new(false);

        let mut div = Node::Element(Element::new("div"));
        let before = div.clone();
        enricher.process(&mut div, &ctx);
        assert_eq!(div, before);

        let mut pre = Node::Element(Element {
            name: "pre".to_owned(),
            attrs: attrs(&[("class", "plain")]),
            children: vec![Node::text("no code here")],
        });
        let before = pre.clone();
        enricher.process(&mut pre, &ctx);
        assert_eq!(pre, before);
    }

    #[test]
    fn test_editable_mode_only_marks_the_block() {
        let enricher = Enricher::new(plain_options(), None);
        let ctx = ViewContext::new(true);

        let mut node = code_block("outer", "language-rust", "fn main() {}");
        let code_before = node.as_element().unwrap().children.clone();

        enricher.process(&mut node, &ctx);
        enricher.process(&mut node, &ctx);

        let pre = node.as_element().unwrap();
        assert_eq!(pre.class(), "outer hl-pre");
        assert_eq!(pre.children, code_before);
    }

    #[test]
    fn test_unknown_language_keeps_children_and_normalizes_classes() {
        let stub = StubTokenizer::new(vec!["rust"], "");
        let enricher = Enricher::new(plain_options(), Some(stub.clone() as Arc<dyn Tokenizer>));
        let ctx = ViewContext::new(false);

        let mut node = code_block("", "language-perl", "print 1;");
        enricher.process(&mut node, &ctx);

        let pre = node.as_element().unwrap();
        assert_eq!(pre.class(), "hl-pre");
        let code = pre.children[0].as_element().unwrap();
        assert_eq!(code.class(), "hl-code");
        assert_eq!(code.children, vec![Node::text("print 1;")]);
        assert!(stub.seen.borrow().is_empty());
    }

    #[test]
    fn test_empty_code_element_is_left_alone() {
        let enricher = Enricher::new(plain_options(), None);
        let ctx = ViewContext::new(false);

        let mut node = code_block("wrapper", "language-rust", "");
        let before = node.clone();
        enricher.process(&mut node, &ctx);
        assert_eq!(node, before);
    }

    #[test]
    fn test_highlight_replaces_code_children_with_rewritten_classes() {
        let stub = StubTokenizer::new(
            vec!["rust"],
            "<span class=\"token keyword\">fn</span> main",
        );
        let enricher = Enricher::new(plain_options(), Some(stub as Arc<dyn Tokenizer>));
        let ctx = ViewContext::new(false);

        let mut node = code_block("", "language-rust", "fn main");
        enricher.process(&mut node, &ctx);

        let pre = node.as_element().unwrap();
        assert_eq!(pre.class(), "hl-pre");
        let code = pre.children[0].as_element().unwrap();
        assert_eq!(code.class(), "hl-code");
        assert_eq!(code.children.len(), 2);

        let span = code.children[0].as_element().unwrap();
        assert_eq!(span.attr("class"), Some("hl-keyword"));
        assert_eq!(span.children, vec![Node::text("fn")]);
        assert_eq!(code.children[1], Node::text(" main"));
    }

    #[test]
    fn test_amp_is_the_only_entity_unescaped_before_tokenizing() {
        let stub = StubTokenizer::new(vec!["rust"], "x");
        let enricher = Enricher::new(plain_options(), Some(stub.clone() as Arc<dyn Tokenizer>));
        let ctx = ViewContext::new(false);

        let mut node = code_block("", "language-rust", "a &amp;&amp; b &lt;c");
        enricher.process(&mut node, &ctx);

        assert_eq!(stub.seen.borrow().as_slice(), ["a && b &lt;c"]);
    }

    #[test]
    fn test_class_normalization_is_idempotent() {
        let enricher = Enricher::new(plain_options(), None);
        let ctx = ViewContext::new(false);

        let mut node = code_block("language-rust", "", "let x;");
        enricher.process(&mut node, &ctx);
        enricher.process(&mut node, &ctx);

        let pre = node.as_element().unwrap();
        assert_eq!(pre.class(), "hl-pre");
        assert_eq!(pre.children[0].as_element().unwrap().class(), "hl-code");
    }

    #[test]
    fn test_language_name_decoration() {
        let options = HighlightOptions {
            show_language_name: true,
            ..plain_options()
        };
        let enricher = Enricher::new(options, None);
        let ctx = ViewContext::new(false);

        let mut node = code_block("", "language-python", "pass");
        enricher.process(&mut node, &ctx);

        let pre = node.as_element().unwrap();
        let label = pre.children.last().unwrap().as_element().unwrap();
        assert_eq!(label.name, "div");
        assert_eq!(label.attr("class"), Some("hl-language"));
        assert_eq!(label.attr("style"), Some("user-select:none"));
        assert_eq!(label.children, vec![Node::text("python")]);
    }

    #[test]
    fn test_copy_by_long_press_decoration() {
        let options = HighlightOptions {
            copy_by_long_press: true,
            ..plain_options()
        };
        let enricher = Enricher::new(options, None);
        let ctx = ViewContext::new(false);

        let mut node = code_block("", "", "a &amp; b");
        enricher.process(&mut node, &ctx);

        let pre = node.as_element().unwrap();
        assert_eq!(pre.attr("style"), Some(";user-select:none"));
        assert_eq!(pre.attr("data-content"), Some("a & b"));
        assert!(ctx.exposed());
    }

    #[test]
    fn test_line_number_gutter_has_one_span_per_line() {
        let options = HighlightOptions {
            show_line_number: true,
            ..plain_options()
        };
        let enricher = Enricher::new(options, None);
        let ctx = ViewContext::new(false);

        let mut node = code_block("", "", "a\nb\nc");
        enricher.process(&mut node, &ctx);

        let pre = node.as_element().unwrap();
        let gutter = pre.children.last().unwrap().as_element().unwrap();
        assert_eq!(gutter.name, "span");
        assert_eq!(gutter.attr("class"), Some("line-numbers-rows"));
        assert_eq!(gutter.children.len(), 3);
        for row in &gutter.children {
            let row = row.as_element().unwrap();
            assert_eq!(row.attr("class"), Some("span"));
            assert!(row.children.is_empty());
        }
    }

    #[test]
    fn test_last_code_child_is_the_candidate() {
        let stub = StubTokenizer::new(vec!["rust"], "x");
        let enricher = Enricher::new(plain_options(), Some(stub as Arc<dyn Tokenizer>));
        let ctx = ViewContext::new(false);

        let mut first = Element::new("code");
        first.children.push(Node::text("ignored"));
        let mut last = Element::new("code");
        last.set_attr("class", "language-rust");
        last.children.push(Node::text("kept"));

        let mut pre = Element::new("pre");
        pre.children.push(Node::Element(first.clone()));
        pre.children.push(Node::Element(last));
        let mut node = Node::Element(pre);

        enricher.process(&mut node, &ctx);

        let pre = node.as_element().unwrap();
        // the earlier code child is untouched
        assert_eq!(pre.children[0], Node::Element(first));
        assert_eq!(pre.children[1].as_element().unwrap().class(), "hl-code");
        assert_eq!(
            pre.children[1].as_element().unwrap().children,
            vec![Node::Text(Text {
                text: "x".to_owned()
            })]
        );
    }
}
