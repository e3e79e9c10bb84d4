//! Minimal XML tree parser for scene documents.
//!
//! Scene documents use a small, regular subset of XML: nested elements,
//! quoted attributes and text content holding whitespace-separated numbers
//! or paths. This parser builds a plain element tree and leaves all
//! interpretation to the loader.
//!
//! # Supported Syntax
//!
//! - `<name attr="value" other='value'> ... </name>` and `<name/>`
//! - text content (entities `&lt; &gt; &amp; &quot; &apos; &#N; &#xN;`)
//! - `<![CDATA[ ... ]]>` sections
//! - `<?xml ... ?>` declarations, `<!-- comments -->` and `<!DOCTYPE ...>` (skipped)

use thiserror::Error;

/// Errors that can occur during XML parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    #[error("XML syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Unexpected end of document")]
    UnexpectedEof,

    #[error("Mismatched closing tag at line {line}: expected </{expected}>, found </{found}>")]
    MismatchedTag {
        line: usize,
        expected: String,
        found: String,
    },
}

/// Result type for XML parsing.
pub type XmlResult<T> = Result<T, XmlError>;

/// One element of the document tree.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlNode {
    /// Tag name
    pub name: String,

    /// Attributes in document order
    pub attributes: Vec<(String, String)>,

    /// Child elements in document order
    pub children: Vec<XmlNode>,

    /// Concatenated text content, trimmed
    pub content: String,

    /// Line of the opening tag (1-based)
    pub line: usize,
}

impl XmlNode {
    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Cursor over document text.
pub struct XmlParser<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> XmlParser<'a> {
    /// Create a new parser from document contents.
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    /// Parse the whole document and return its top-level elements.
    pub fn parse(&mut self) -> XmlResult<Vec<XmlNode>> {
        let mut roots = Vec::new();

        loop {
            self.skip_misc()?;
            if self.at_end() {
                break;
            }
            if !self.rest().starts_with('<') {
                return Err(self.syntax("text outside of any element"));
            }
            roots.push(self.parse_element()?);
        }

        Ok(roots)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn syntax(&self, message: impl Into<String>) -> XmlError {
        XmlError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    /// Move forward `n` bytes, keeping the line counter current.
    fn advance(&mut self, n: usize) {
        let end = (self.pos + n).min(self.src.len());
        self.line += self.src[self.pos..end].matches('\n').count();
        self.pos = end;
    }

    fn skip_whitespace(&mut self) {
        let skipped = self.rest().len() - self.rest().trim_start().len();
        self.advance(skipped);
    }

    /// Consume input up to and including `terminator`, returning what came before it.
    fn take_until(&mut self, terminator: &str) -> XmlResult<&'a str> {
        let rest = self.rest();
        match rest.find(terminator) {
            Some(idx) => {
                let taken = &rest[..idx];
                self.advance(idx + terminator.len());
                Ok(taken)
            }
            None => Err(XmlError::UnexpectedEof),
        }
    }

    /// Skip whitespace, declarations, comments and doctype between elements.
    fn skip_misc(&mut self) -> XmlResult<()> {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("<?") {
                self.take_until("?>")?;
            } else if rest.starts_with("<!--") {
                self.take_until("-->")?;
            } else if rest.starts_with("<!") {
                self.take_until(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_name(&mut self) -> XmlResult<String> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '=' | '>' | '/' | '<' | '"' | '\''))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(self.syntax("expected a name"));
        }
        let name = rest[..len].to_string();
        self.advance(len);
        Ok(name)
    }

    fn expect(&mut self, token: &str) -> XmlResult<()> {
        if self.rest().starts_with(token) {
            self.advance(token.len());
            Ok(())
        } else if self.at_end() {
            Err(XmlError::UnexpectedEof)
        } else {
            Err(self.syntax(format!("expected '{token}'")))
        }
    }

    fn parse_attribute_value(&mut self) -> XmlResult<String> {
        let quote = match self.rest().chars().next() {
            Some(q @ ('"' | '\'')) => q,
            Some(_) => return Err(self.syntax("attribute value must be quoted")),
            None => return Err(XmlError::UnexpectedEof),
        };
        self.advance(1);
        let line = self.line;
        let raw = self.take_until(if quote == '"' { "\"" } else { "'" })?;
        decode_entities(raw).map_err(|message| XmlError::Syntax { line, message })
    }

    /// Parse one element starting at `<`.
    fn parse_element(&mut self) -> XmlResult<XmlNode> {
        let line = self.line;
        self.expect("<")?;
        let name = self.parse_name()?;
        let mut node = XmlNode {
            name,
            line,
            ..Default::default()
        };

        // Attributes
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("/>") {
                self.advance(2);
                return Ok(node);
            }
            if rest.starts_with('>') {
                self.advance(1);
                break;
            }
            if rest.is_empty() {
                return Err(XmlError::UnexpectedEof);
            }

            let key = self.parse_name()?;
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let value = self.parse_attribute_value()?;
            node.attributes.push((key, value));
        }

        // Content and children
        let mut content = String::new();
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return Err(XmlError::UnexpectedEof);
            }

            if rest.starts_with("</") {
                self.advance(2);
                let close_line = self.line;
                let closing = self.parse_name()?;
                self.skip_whitespace();
                self.expect(">")?;
                if closing != node.name {
                    return Err(XmlError::MismatchedTag {
                        line: close_line,
                        expected: node.name,
                        found: closing,
                    });
                }
                break;
            } else if rest.starts_with("<!--") {
                self.take_until("-->")?;
            } else if rest.starts_with("<![CDATA[") {
                self.advance("<![CDATA[".len());
                content.push_str(self.take_until("]]>")?);
            } else if rest.starts_with("<?") {
                self.take_until("?>")?;
            } else if rest.starts_with('<') {
                node.children.push(self.parse_element()?);
            } else {
                let len = rest.find('<').unwrap_or(rest.len());
                let text_line = self.line;
                let text = decode_entities(&rest[..len])
                    .map_err(|message| XmlError::Syntax { line: text_line, message })?;
                content.push_str(&text);
                self.advance(len);
            }
        }

        node.content = content.trim().to_string();
        Ok(node)
    }
}

/// Replace the predefined and numeric character entities.
fn decode_entities(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| format!("unterminated entity in '{raw}'"))?;
        let entity = &after[..semi];

        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| format!("unknown entity '&{entity};'"))?
            }
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Parse an XML string and return its top-level elements.
pub fn parse_xml(content: &str) -> XmlResult<Vec<XmlNode>> {
    let mut parser = XmlParser::new(content);
    parser.parse()
}
