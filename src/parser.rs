use crate::dom::{Attributes, Element, Node, Text};
use crate::error::ParseError;

/// Recursive-descent markup parser producing a [`Node`] tree.
///
/// Text runs are kept verbatim (no trimming, no entity decoding) so that
/// whitespace-sensitive content such as code survives a parse round trip.
pub struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

pub fn parse(input: &str) -> Result<Vec<Node>, ParseError> {
    Parser { input, pos: 0 }.parse_nodes(None)
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: u8) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(ParseError::PrematureEnd(self.pos)),
        }
    }

    fn parse_nodes(
        &mut self,
        enclosing: Option<(&str, usize)>,
    ) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();

        loop {
            match self.peek() {
                None => {
                    return match enclosing {
                        Some((name, at)) => Err(ParseError::Unclosed {
                            name: name.to_owned(),
                            at,
                        }),
                        None => Ok(nodes),
                    };
                }
                Some(b'<') if self.starts_with("</") => {
                    let at = self.pos;
                    self.pos += 2;
                    let found = self.read_name()?;
                    self.skip_whitespace();
                    self.expect(b'>')?;

                    return match enclosing {
                        Some((name, _)) if name == found => Ok(nodes),
                        Some((name, _)) => Err(ParseError::MismatchedClose {
                            expected: name.to_owned(),
                            found,
                            at,
                        }),
                        None => Err(ParseError::UnexpectedClose { found, at }),
                    };
                }
                Some(b'<') => nodes.push(Node::Element(self.parse_element()?)),
                Some(_) => nodes.push(Node::Text(Text {
                    text: self.read_text(),
                })),
            }
        }
    }

    fn parse_element(&mut self) -> Result<Element, ParseError> {
        let opened_at = self.pos;
        self.pos += 1;
        let name = self.read_name()?;
        let mut attrs = Attributes::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(ParseError::PrematureEnd(self.pos)),
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    self.pos += 1;
                    self.expect(b'>')?;
                    return Ok(Element {
                        name,
                        attrs,
                        children: Vec::new(),
                    });
                }
                Some(_) => {
                    let (key, value) = self.read_attribute()?;
                    // first occurrence of a key wins
                    attrs.entry(key).or_insert(value);
                }
            }
        }

        let children = self.parse_nodes(Some((name.as_str(), opened_at)))?;
        Ok(Element {
            name,
            attrs,
            children,
        })
    }

    fn read_name(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'-' {
                self.pos += 1;
            } else {
                break;
            }
        }

        if self.pos == start {
            return Err(ParseError::InvalidName(start));
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    fn read_attribute(&mut self) -> Result<(String, String), ParseError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() || c == b'=' || c == b'>' || c == b'/' {
                break;
            }
            self.pos += 1;
        }

        if self.pos == start {
            return Err(ParseError::InvalidName(start));
        }
        let key = self.input[start..self.pos].to_owned();

        if self.peek() != Some(b'=') {
            // bare attribute, e.g. <input disabled>
            return Ok((key, String::new()));
        }
        self.pos += 1;

        let value = match self.peek() {
            Some(b'"') => {
                self.pos += 1;
                let value_start = self.pos;
                while let Some(c) = self.peek() {
                    if c == b'"' {
                        break;
                    }
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err(ParseError::PrematureEnd(self.pos));
                }
                let value = self.input[value_start..self.pos].to_owned();
                self.pos += 1;
                value
            }
            _ => {
                let value_start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_ascii_whitespace() || c == b'>' || c == b'/' {
                        break;
                    }
                    self.pos += 1;
                }
                self.input[value_start..self.pos].to_owned()
            }
        };

        Ok((key, value))
    }

    fn read_text(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == b'<' {
                break;
            }
            self.pos += 1;
        }
        self.input[start..self.pos].to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::collect_text;

    #[test]
    fn test_parse_element_with_attributes() {
        let nodes = parse("<div class=\"note\" id=\"n1\">hi</div>").unwrap();
        assert_eq!(nodes.len(), 1);

        let el = nodes[0].as_element().unwrap();
        assert_eq!(el.name, "div");
        assert_eq!(el.attr("class"), Some("note"));
        assert_eq!(el.attr("id"), Some("n1"));
        assert_eq!(collect_text(&el.children), "hi");
    }

    #[test]
    fn test_parse_preserves_interior_whitespace() {
        let nodes = parse("<pre>  fn main() {\n      0\n  }</pre>").unwrap();
        let el = nodes[0].as_element().unwrap();
        assert_eq!(collect_text(&el.children), "  fn main() {\n      0\n  }");
    }

    #[test]
    fn test_parse_tokenizer_style_output() {
        let nodes =
            parse("<pre><span class=\"hl-keyword\">fn</span> main() {}</pre>").unwrap();
        let pre = nodes[0].as_element().unwrap();
        assert_eq!(pre.children.len(), 2);

        let span = pre.children[0].as_element().unwrap();
        assert_eq!(span.attr("class"), Some("hl-keyword"));
        assert_eq!(collect_text(&span.children), "fn");
        assert_eq!(pre.children[1], Node::text(" main() {}"));
    }

    #[test]
    fn test_parse_self_closing_and_bare_attributes() {
        let nodes = parse("<p>a<br/>b<input disabled></input></p>").unwrap();
        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.children.len(), 4);
        assert_eq!(p.children[1].as_element().unwrap().name, "br");
        assert_eq!(
            p.children[3].as_element().unwrap().attr("disabled"),
            Some("")
        );
    }

    #[test]
    fn test_parse_first_attribute_occurrence_wins() {
        let nodes = parse("<div class=\"a\" class=\"b\"></div>").unwrap();
        assert_eq!(nodes[0].as_element().unwrap().attr("class"), Some("a"));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(matches!(
            parse("</div>"),
            Err(ParseError::UnexpectedClose { .. })
        ));
        assert!(matches!(
            parse("<div>unfinished"),
            Err(ParseError::Unclosed { .. })
        ));
        assert!(matches!(
            parse("<div>x</span>"),
            Err(ParseError::MismatchedClose { .. })
        ));
    }
}
