//! Hand-written parser from raw markup to a [`Template`].
//!
//! The parser walks the source once. Anything that does not form a valid tag
//! is kept as literal text, so markup like `{ color: red }` passes through
//! untouched. Structural tags (`{#..}`, `{>..}`, `{/..}` and friends) are
//! strict: a malformed one is a [`DustError::Syntax`].
//!
//! Whitespace compression follows dust: a newline and the indentation that
//! follows it are dropped, as is every `\r`. Use `{~n}` to emit a newline.

use crate::ast::{KeyPath, Node, Param, ParamValue, SectionKind, Template};
use crate::error::DustError;

/// Parses raw markup into a template named `name`.
pub fn parse(name: &str, source: &str) -> Result<Template, DustError> {
    let mut parser = Parser::new(name, source);
    let body = parser.parse_root()?;
    Ok(Template {
        name: name.to_string(),
        body,
    })
}

/// How a body ended.
enum BodyEnd {
    Eof,
    Else,
    Close(String),
}

struct Parser<'a> {
    name: &'a str,
    chars: Vec<char>,
    pos: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '-'
}

fn flush_text(nodes: &mut Vec<Node>, text: &mut String) {
    if !text.is_empty() {
        nodes.push(Node::Buffer {
            text: std::mem::take(text),
        });
    }
}

impl<'a> Parser<'a> {
    fn new(name: &'a str, source: &str) -> Self {
        Self {
            name,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn eat(&mut self, expected: &str) -> bool {
        let matches = expected
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c));
        if matches {
            self.pos += expected.chars().count();
        }
        matches
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> DustError {
        let mut line = 1;
        let mut column = 1;
        for c in self.chars.iter().take(pos) {
            if *c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        DustError::Syntax {
            name: self.name.to_string(),
            line,
            column,
            message: message.into(),
        }
    }

    fn error(&self, message: impl Into<String>) -> DustError {
        self.error_at(self.pos, message)
    }

    fn parse_root(&mut self) -> Result<Vec<Node>, DustError> {
        let (body, end) = self.parse_body()?;
        match end {
            BodyEnd::Eof => Ok(body),
            BodyEnd::Else => Err(self.error("{:else} outside of a section")),
            BodyEnd::Close(name) => {
                Err(self.error(format!("unexpected closing tag {{/{}}}", name)))
            }
        }
    }

    fn parse_body(&mut self) -> Result<(Vec<Node>, BodyEnd), DustError> {
        let mut nodes = Vec::new();
        let mut text = String::new();

        loop {
            let Some(ch) = self.peek() else {
                flush_text(&mut nodes, &mut text);
                return Ok((nodes, BodyEnd::Eof));
            };

            match ch {
                '\r' => self.pos += 1,
                '\n' => {
                    self.pos += 1;
                    while matches!(self.peek(), Some(' ' | '\t')) {
                        self.pos += 1;
                    }
                }
                '{' => match self.peek_at(1) {
                    Some('!') => self.skip_comment()?,
                    Some('~') => text.push_str(self.parse_special()?),
                    Some(sigil @ ('#' | '?' | '^')) => {
                        flush_text(&mut nodes, &mut text);
                        nodes.push(self.parse_section(sigil)?);
                    }
                    Some(sigil @ ('+' | '<')) => {
                        flush_text(&mut nodes, &mut text);
                        nodes.push(self.parse_block(sigil)?);
                    }
                    Some('>') => {
                        flush_text(&mut nodes, &mut text);
                        nodes.push(self.parse_partial()?);
                    }
                    Some(':') => {
                        if !self.eat("{:else}") {
                            return Err(self.error("only {:else} is supported as a bodies tag"));
                        }
                        flush_text(&mut nodes, &mut text);
                        return Ok((nodes, BodyEnd::Else));
                    }
                    Some('/') => {
                        let name = self.parse_close()?;
                        flush_text(&mut nodes, &mut text);
                        return Ok((nodes, BodyEnd::Close(name)));
                    }
                    _ => match self.try_reference() {
                        Some(node) => {
                            flush_text(&mut nodes, &mut text);
                            nodes.push(node);
                        }
                        None => {
                            text.push('{');
                            self.pos += 1;
                        }
                    },
                },
                _ => {
                    text.push(ch);
                    self.pos += 1;
                }
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), DustError> {
        let open = self.pos;
        self.pos += 2;
        while self.pos < self.chars.len() {
            if self.eat("!}") {
                return Ok(());
            }
            self.pos += 1;
        }
        Err(self.error_at(open, "unclosed comment"))
    }

    fn parse_special(&mut self) -> Result<&'static str, DustError> {
        let open = self.pos;
        self.pos += 2;
        let mut name = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '}' {
                return match name.as_str() {
                    "n" => Ok("\n"),
                    "r" => Ok("\r"),
                    "s" => Ok(" "),
                    "lb" => Ok("{"),
                    "rb" => Ok("}"),
                    other => Err(self.error_at(open, format!("unknown special {{~{}}}", other))),
                };
            }
            name.push(c);
        }
        Err(self.error_at(open, "unclosed special tag"))
    }

    fn parse_close(&mut self) -> Result<String, DustError> {
        let open = self.pos;
        self.pos += 2;
        let mut name = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '}' {
                return Ok(name.trim().to_string());
            }
            name.push(c);
        }
        Err(self.error_at(open, "unclosed closing tag"))
    }

    fn expect_close(&self, expected: &str, end: BodyEnd, open: usize) -> Result<(), DustError> {
        match end {
            BodyEnd::Close(name) if name == expected => Ok(()),
            BodyEnd::Close(name) => Err(self.error(format!(
                "mismatched closing tag: expected {{/{}}}, found {{/{}}}",
                expected, name
            ))),
            BodyEnd::Eof => Err(self.error_at(open, format!("unclosed tag '{}'", expected))),
            BodyEnd::Else => Err(self.error("duplicate {:else}")),
        }
    }

    fn parse_section(&mut self, sigil: char) -> Result<Node, DustError> {
        let open = self.pos;
        let kind = match sigil {
            '#' => SectionKind::Section,
            '?' => SectionKind::Exists,
            _ => SectionKind::NotExists,
        };
        self.pos += 2;
        self.skip_ws();

        let key = self
            .parse_key_path()
            .ok_or_else(|| self.error(format!("expected a key after '{}'", sigil)))?;
        let params = self.parse_params()?;
        self.skip_ws();

        if self.eat("/}") {
            return Ok(Node::Section {
                kind,
                key,
                params,
                body: Vec::new(),
                else_body: Vec::new(),
            });
        }
        if !self.eat("}") {
            return Err(self.error("expected '}' to end the section tag"));
        }

        let (body, end) = self.parse_body()?;
        let (else_body, end) = match end {
            BodyEnd::Else => self.parse_body()?,
            other => (Vec::new(), other),
        };
        self.expect_close(&key.display(), end, open)?;

        Ok(Node::Section {
            kind,
            key,
            params,
            body,
            else_body,
        })
    }

    fn parse_block(&mut self, sigil: char) -> Result<Node, DustError> {
        let open = self.pos;
        self.pos += 2;
        let name = self
            .parse_identifier()
            .ok_or_else(|| self.error("expected a block name"))?;
        self.skip_ws();

        if sigil == '+' && self.eat("/}") {
            return Ok(Node::Block {
                name,
                body: Vec::new(),
            });
        }
        if !self.eat("}") {
            return Err(self.error("expected '}' to end the block tag"));
        }

        let (body, end) = self.parse_body()?;
        if matches!(end, BodyEnd::Else) {
            return Err(self.error("{:else} is not allowed inside a block"));
        }
        self.expect_close(&name, end, open)?;

        Ok(if sigil == '+' {
            Node::Block { name, body }
        } else {
            Node::InlinePartial { name, body }
        })
    }

    fn parse_partial(&mut self) -> Result<Node, DustError> {
        self.pos += 2;
        self.skip_ws();

        let name = if self.peek() == Some('"') {
            self.parse_quoted()?
        } else {
            let mut name = String::new();
            while let Some(c) = self.peek() {
                if c.is_whitespace() || matches!(c, ':' | '/' | '}') {
                    break;
                }
                name.push(c);
                self.pos += 1;
            }
            name
        };
        if name.is_empty() {
            return Err(self.error("expected a partial name"));
        }

        let context = if self.eat(":") {
            Some(
                self.parse_key_path()
                    .ok_or_else(|| self.error("expected a context path after ':'"))?,
            )
        } else {
            None
        };
        let params = self.parse_params()?;
        self.skip_ws();

        if !self.eat("/}") {
            return Err(self.error("partial tags must be self-closing ('/}')"));
        }

        Ok(Node::Partial {
            name,
            context,
            params,
        })
    }

    fn parse_quoted(&mut self) -> Result<String, DustError> {
        let open = self.pos;
        self.pos += 1;
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '"' {
                return Ok(value);
            }
            value.push(c);
        }
        Err(self.error_at(open, "unclosed string literal"))
    }

    fn parse_identifier(&mut self) -> Option<String> {
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        let mut ident = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            ident.push(c);
            self.pos += 1;
        }
        Some(ident)
    }

    /// Parses `name`, `a.b.c`, `a[0].b`, `.name` or `.`; restores the
    /// position and returns `None` when no path starts here.
    fn parse_key_path(&mut self) -> Option<KeyPath> {
        let start = self.pos;
        let mut current = false;
        let mut segments = Vec::new();

        if self.peek() == Some('.') {
            current = true;
            self.pos += 1;
            if !self.peek().is_some_and(is_ident_char) {
                return Some(KeyPath::head());
            }
        }

        loop {
            let first = segments.is_empty() && !current;
            let segment_ok = if first {
                self.peek().is_some_and(is_ident_start)
            } else {
                self.peek().is_some_and(is_ident_char)
            };
            if !segment_ok {
                self.pos = start;
                return None;
            }

            let mut segment = String::new();
            while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
                segment.push(c);
                self.pos += 1;
            }
            segments.push(segment);

            while self.peek() == Some('[') {
                let mut index = String::new();
                self.pos += 1;
                while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                    index.push(c);
                    self.pos += 1;
                }
                if index.is_empty() || !self.eat("]") {
                    self.pos = start;
                    return None;
                }
                segments.push(index);
            }

            if self.peek() == Some('.') && self.peek_at(1).is_some_and(is_ident_char) {
                self.pos += 1;
                continue;
            }
            return Some(KeyPath { current, segments });
        }
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, DustError> {
        let mut params = Vec::new();
        loop {
            let save = self.pos;
            self.skip_ws();
            let Some(key) = self.parse_identifier() else {
                self.pos = save;
                return Ok(params);
            };
            if !self.eat("=") {
                return Err(self.error(format!("expected '=' after parameter '{}'", key)));
            }

            let value = match self.peek() {
                Some('"') => ParamValue::Literal(self.parse_quoted()?),
                Some(c) if c.is_ascii_digit() || c == '-' => {
                    let mut number = String::new();
                    while let Some(c) = self
                        .peek()
                        .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '.'))
                    {
                        number.push(c);
                        self.pos += 1;
                    }
                    ParamValue::Literal(number)
                }
                _ => ParamValue::Path(
                    self.parse_key_path()
                        .ok_or_else(|| self.error(format!("invalid value for '{}'", key)))?,
                ),
            };
            params.push(Param { key, value });
        }
    }

    fn try_reference(&mut self) -> Option<Node> {
        let start = self.pos;
        self.pos += 1;

        let Some(path) = self.parse_key_path() else {
            self.pos = start;
            return None;
        };

        let mut filters = Vec::new();
        while self.peek() == Some('|') {
            self.pos += 1;
            let mut filter = String::new();
            while let Some(c) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
                filter.push(c);
                self.pos += 1;
            }
            if filter.is_empty() {
                self.pos = start;
                return None;
            }
            filters.push(filter);
        }

        if self.eat("}") {
            Some(Node::Reference { path, filters })
        } else {
            self.pos = start;
            None
        }
    }
}
