//! Tree builder for component tags
//!
//! Consumes the lexer's flat token stream and nests it with an explicit
//! stack of open elements. Everything between tags stays text; only the
//! component, slot and vars tags form structure.

use crate::ast::{ComponentInvocation, Document, NamedSlot, Node, VarsDeclaration};
use crate::attributes::AttributeBinding;
use crate::error::{CompilerError, Position, Result};
use crate::lexer::Token;
use crate::slots::{ensure_no_orphans, resolve_slots};
use crate::types::{AttributeKind, MAX_NESTING_DEPTH, SLOT_TAG, VARS_TAG};
use crate::utils::fragment_path;
use crate::CompilerOptions;

/// What an open element turns into once its closing tag is seen
enum ElementKind {
    Component {
        attributes: Vec<AttributeBinding>,
    },
    Slot {
        name: String,
    },
    Vars {
        attributes: Vec<AttributeBinding>,
    },
}

struct OpenElement {
    tag: String,
    kind: ElementKind,
    offset: usize,
    children: Vec<Node>,
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    source: &'a str,
    filename: &'a str,
    options: &'a CompilerOptions,
    stack: Vec<OpenElement>,
    root: Vec<Node>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, source: &'a str, filename: &'a str, options: &'a CompilerOptions) -> Self {
        Self {
            tokens,
            source,
            filename,
            options,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    pub fn parse(mut self) -> Result<Document> {
        for token in std::mem::take(&mut self.tokens) {
            match token {
                Token::Text { text, .. } => self.push_node(Node::Text { text }),
                Token::OpenTag { name, attributes, self_closing, offset } => {
                    self.open_tag(name, attributes, self_closing, offset)?
                }
                Token::CloseTag { name, offset } => self.close_tag(name, offset)?,
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(CompilerError::unterminated_tag(
                self.filename,
                &open.tag,
                Position::locate(self.source, open.offset),
            ));
        }

        ensure_no_orphans(&self.root, self.filename)?;
        log::debug!("Parsed {} into {} top-level nodes", self.filename, self.root.len());
        Ok(Document { nodes: self.root })
    }

    fn line(&self, offset: usize) -> usize {
        Position::locate(self.source, offset).line
    }

    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(open) => open.children.push(node),
            None => self.root.push(node),
        }
    }

    fn open_tag(
        &mut self,
        tag: String,
        attributes: Vec<AttributeBinding>,
        self_closing: bool,
        offset: usize,
    ) -> Result<()> {
        let kind = match tag.as_str() {
            SLOT_TAG => ElementKind::Slot {
                name: self.slot_name(&attributes, offset)?,
            },
            VARS_TAG => ElementKind::Vars { attributes },
            _ => ElementKind::Component { attributes },
        };

        let element = OpenElement {
            tag,
            kind,
            offset,
            children: Vec::new(),
        };
        if self_closing {
            let node = self.finish(element, true)?;
            self.push_node(node);
            return Ok(());
        }

        if self.stack.len() >= MAX_NESTING_DEPTH {
            return Err(CompilerError::LimitExceeded {
                limit_type: format!("component nesting depth in {}", self.filename),
                limit: MAX_NESTING_DEPTH,
            });
        }
        self.stack.push(element);
        Ok(())
    }

    fn close_tag(&mut self, tag: String, offset: usize) -> Result<()> {
        let element = match self.stack.pop() {
            Some(element) => element,
            None => {
                return Err(CompilerError::UnexpectedClosingTag {
                    file: self.filename.to_string(),
                    line: self.line(offset),
                    tag,
                })
            }
        };
        if element.tag != tag {
            return Err(CompilerError::MismatchedTag {
                file: self.filename.to_string(),
                line: self.line(offset),
                expected: element.tag,
                found: tag,
            });
        }

        let node = self.finish(element, false)?;
        self.push_node(node);
        Ok(())
    }

    fn finish(&self, element: OpenElement, self_closing: bool) -> Result<Node> {
        let line = self.line(element.offset);
        match element.kind {
            ElementKind::Component { attributes } => {
                let resolved = resolve_slots(element.children, &element.tag, self.filename)?;
                Ok(Node::Component(ComponentInvocation {
                    template: fragment_path(
                        &element.tag,
                        &self.options.component_root,
                        &self.options.template_extension,
                        self.options.snake_case_names,
                    ),
                    name: element.tag,
                    attributes,
                    slots: resolved.named,
                    default_content: resolved.default_content,
                    self_closing,
                    offset: element.offset,
                    line,
                }))
            }
            ElementKind::Slot { name } => {
                ensure_no_orphans(&element.children, self.filename)?;
                if let Some(Node::Vars(vars)) = element.children.iter().find(|n| matches!(n, Node::Vars(_))) {
                    return Err(CompilerError::vars(
                        self.filename,
                        vars.line,
                        "<c-vars> must be declared at the top level of a template",
                    ));
                }
                Ok(Node::Slot(NamedSlot {
                    name,
                    content: element.children,
                    line,
                }))
            }
            ElementKind::Vars { attributes } => {
                if !element.children.iter().all(Node::is_blank_text) {
                    return Err(CompilerError::vars(self.filename, line, "<c-vars> cannot have content"));
                }
                Ok(Node::Vars(VarsDeclaration { attributes, line }))
            }
        }
    }

    fn slot_name(&self, attributes: &[AttributeBinding], offset: usize) -> Result<String> {
        let name = attributes.iter().rev().find(|a| a.name == "name");
        match name {
            Some(binding) if binding.kind == AttributeKind::Static && !binding.value.trim().is_empty() => {
                Ok(binding.value.trim().to_string())
            }
            Some(_) => Err(CompilerError::slot(
                self.filename,
                self.line(offset),
                "<c-slot> name must be a non-empty static value",
            )),
            None => Err(CompilerError::slot(
                self.filename,
                self.line(offset),
                "<c-slot> requires a name attribute",
            )),
        }
    }
}

/// Tokenize and parse a template source into a document
pub fn parse_template(source: &str, filename: &str, options: &CompilerOptions) -> Result<Document> {
    let tokens = crate::lexer::Lexer::new(source, filename).tokenize()?;
    Parser::new(tokens, source, filename, options).parse()
}
