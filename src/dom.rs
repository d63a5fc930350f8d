use std::collections::HashMap;

pub type Attributes = HashMap<String, String>;

/// Parsed markup tree. An element owns its children; text is a leaf.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(Text),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Attributes,
    pub children: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Text {
    pub text: String,
}

impl Node {
    pub fn text(text: &str) -> Node {
        Node::Text(Text {
            text: text.to_owned(),
        })
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }
}

impl Element {
    pub fn new(name: &str) -> Element {
        Element {
            name: name.to_owned(),
            attrs: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        self.attrs.insert(key.to_owned(), value.to_owned());
    }

    pub fn class(&self) -> &str {
        self.attr("class").unwrap_or("")
    }

    /// Adds a class token unless it is already present.
    pub fn add_class(&mut self, class: &str) {
        let current = self.class();
        if current.split_whitespace().any(|token| token == class) {
            return;
        }

        let merged = if current.is_empty() {
            class.to_owned()
        } else {
            format!("{} {}", current, class)
        };
        self.attrs.insert("class".to_owned(), merged);
    }
}

pub fn attrs(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

/// Flattens every text leaf under `nodes`, in document order.
pub fn collect_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    push_text(nodes, &mut out);
    out
}

fn push_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(el) => push_text(&el.children, out),
        }
    }
}

/// Visits `node` and then every descendant, parents before children.
pub fn walk_mut(node: &mut Node, visit: &mut impl FnMut(&mut Node)) {
    visit(node);
    if let Node::Element(el) = node {
        for child in &mut el.children {
            walk_mut(child, visit);
        }
    }
}

/// Serializes a node list back to markup. Text content is written verbatim;
/// attribute values get double quotes escaped so the output stays parseable.
pub fn to_markup(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&text.text),
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.name);

            let mut keys: Vec<&String> = el.attrs.keys().collect();
            keys.sort();
            for key in keys {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&el.attrs[key].replace('"', "&quot;"));
                out.push('"');
            }

            if el.children.is_empty() {
                out.push_str("/>");
                return;
            }

            out.push('>');
            for child in &el.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_text_flattens_nested_nodes() {
        let nodes = vec![
            Node::text("let "),
            Node::Element(Element {
                name: "span".to_owned(),
                attrs: attrs(&[("class", "kw")]),
                children: vec![Node::text("x"), Node::text(" = ")],
            }),
            Node::text("1;"),
        ];

        assert_eq!(collect_text(&nodes), "let x = 1;");
    }

    #[test]
    fn test_add_class_does_not_accumulate() {
        let mut el = Element::new("pre");
        el.add_class("hl-pre");
        el.add_class("hl-pre");
        assert_eq!(el.class(), "hl-pre");

        el.set_attr("class", "code hl-pre");
        el.add_class("hl-pre");
        assert_eq!(el.class(), "code hl-pre");
    }

    #[test]
    fn test_to_markup_quotes_attribute_values() {
        let mut el = Element::new("pre");
        el.set_attr("data-content", "say \"hi\"");
        el.children.push(Node::text("body"));

        assert_eq!(
            to_markup(&[Node::Element(el)]),
            "<pre data-content=\"say &quot;hi&quot;\">body</pre>"
        );
    }

    #[test]
    fn test_to_markup_self_closes_empty_elements() {
        let el = Element::new("span");
        assert_eq!(to_markup(&[Node::Element(el)]), "<span/>");
    }
}
