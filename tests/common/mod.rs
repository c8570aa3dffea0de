//! Minimal host engine for integration tests
//!
//! Renders compiled templates just far enough to exercise the runtime
//! binding layer: `{{ path }}`, `{% if path %}`, `{% for x in path %}` and the
//! cotton directives. Fragments are compiled on demand through an [`Engine`]
//! backed by a [`MemoryLoader`].

#![allow(dead_code)]

use cottonc::runtime::{ComponentCall, Context, Scope};
use cottonc::vars::VarsFrame;
use cottonc::{CompilerOptions, Engine, MemoryLoader, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Text(String),
    Variable(String),
    Block {
        name: String,
        args: String,
        body: Vec<Piece>,
    },
}

const BLOCK_TAGS: &[&str] = &[
    "for",
    "if",
    "cotton_component",
    "cotton_attr",
    "cotton_slot",
    "cotton_vars_frame",
    "cotton_var",
];

pub struct MiniHost {
    engine: Engine<MemoryLoader>,
}

impl MiniHost {
    pub fn new(templates: &[(&str, &str)]) -> Self {
        Self::with_options(templates, CompilerOptions::default())
    }

    pub fn with_options(templates: &[(&str, &str)], options: CompilerOptions) -> Self {
        let loader = MemoryLoader::with_templates(templates.iter().copied());
        Self {
            engine: Engine::new(loader, options),
        }
    }

    pub fn engine(&self) -> &Engine<MemoryLoader> {
        &self.engine
    }

    pub fn add_template(&self, id: &str, source: &str) {
        self.engine.loader().insert(id, source);
    }

    /// Compile and render a stored template against `globals`
    pub fn render(&self, id: &str, globals: &[(&str, Value)]) -> String {
        let context: HashMap<String, Value> = globals
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        self.render_template(id, &context)
    }

    /// Store `source` under a throwaway id and render it
    pub fn render_inline(&self, source: &str, globals: &[(&str, Value)]) -> String {
        self.add_template("__inline__.html", source);
        self.render("__inline__.html", globals)
    }

    fn render_template(&self, id: &str, context: &dyn Context) -> String {
        let compiled = self
            .engine
            .compile(id)
            .unwrap_or_else(|e| panic!("failed to compile {}: {}", id, e));
        let pieces = parse_pieces(&compiled.output);
        self.render_pieces(&pieces, context)
    }

    fn render_pieces(&self, pieces: &[Piece], context: &dyn Context) -> String {
        let mut out = String::new();
        for piece in pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Variable(path) => {
                    if let Some(value) = context.lookup(path) {
                        out.push_str(&value.to_string());
                    }
                }
                Piece::Block { name, args, body } => out.push_str(&self.render_block(name, args, body, context)),
            }
        }
        out
    }

    fn render_block(&self, name: &str, args: &str, body: &[Piece], context: &dyn Context) -> String {
        match name {
            "if" => {
                let truthy = match context.lookup(args.trim()) {
                    None | Some(Value::None) | Some(Value::Bool(false)) | Some(Value::Int(0)) => false,
                    Some(Value::Str(s)) => !s.is_empty(),
                    Some(Value::List(items)) => !items.is_empty(),
                    Some(_) => true,
                };
                if truthy {
                    self.render_pieces(body, context)
                } else {
                    String::new()
                }
            }
            "for" => {
                let (var, path) = args
                    .split_once(" in ")
                    .unwrap_or_else(|| panic!("bad for tag: {}", args));
                let items = match context.lookup(path.trim()) {
                    Some(Value::List(items)) => items,
                    _ => Vec::new(),
                };
                let mut out = String::new();
                for item in items {
                    let mut scope = Scope::child(context);
                    scope.set(var.trim(), item);
                    out.push_str(&self.render_pieces(body, &scope));
                }
                out
            }
            "cotton_component" => self.render_component(args, body, context),
            "cotton_vars_frame" => {
                let mut frame = VarsFrame::from_directive(args).expect("valid vars frame");
                let mut rest = Vec::new();
                for piece in body {
                    match piece {
                        Piece::Block { name, args, body } if name == "cotton_var" => {
                            frame.set_default(args.trim(), self.render_pieces(body, context));
                        }
                        other => rest.push(other.clone()),
                    }
                }
                let scope = frame.apply(context);
                self.render_pieces(&rest, &scope)
            }
            other => panic!("unexpected block {}", other),
        }
    }

    fn render_component(&self, args: &str, body: &[Piece], context: &dyn Context) -> String {
        let mut call = ComponentCall::from_directive(args).expect("valid component directive");
        let mut default_content = String::new();
        for piece in body {
            match piece {
                Piece::Block { name, args, body } if name == "cotton_attr" => {
                    call.set_attribute(args.trim(), self.render_pieces(body, context));
                }
                Piece::Block { name, args, body } if name == "cotton_slot" => {
                    call.fill_slot(args.trim(), self.render_pieces(body, context));
                }
                other => default_content.push_str(&self.render_pieces(std::slice::from_ref(other), context)),
            }
        }
        call.set_default_slot(default_content);

        let scope = call.bind(context);
        self.render_template(call.template(), &scope)
    }
}

/// Split compiled output into text, variables and nested blocks
fn parse_pieces(source: &str) -> Vec<Piece> {
    let mut stack: Vec<(String, String, Vec<Piece>)> = vec![(String::new(), String::new(), Vec::new())];
    let mut rest = source;

    while !rest.is_empty() {
        let next = [rest.find("{{"), rest.find("{%")].into_iter().flatten().min();
        let Some(start) = next else {
            push_piece(&mut stack, Piece::Text(rest.to_string()));
            break;
        };
        if start > 0 {
            push_piece(&mut stack, Piece::Text(rest[..start].to_string()));
        }
        let closer = if rest[start..].starts_with("{{") { "}}" } else { "%}" };
        let end = start + rest[start..].find(closer).expect("closed host construct");
        let inner = rest[start + 2..end].trim();
        rest = &rest[end + 2..];

        if closer == "}}" {
            push_piece(&mut stack, Piece::Variable(inner.to_string()));
            continue;
        }

        let (name, args) = inner.split_once(char::is_whitespace).unwrap_or((inner, ""));
        if BLOCK_TAGS.contains(&name) {
            stack.push((name.to_string(), args.to_string(), Vec::new()));
        } else if let Some(opened) = name.strip_prefix("end") {
            let (open_name, open_args, body) = stack.pop().expect("open block");
            assert_eq!(open_name, opened, "mismatched end tag");
            push_piece(
                &mut stack,
                Piece::Block {
                    name: open_name,
                    args: open_args,
                    body,
                },
            );
        } else {
            panic!("unsupported tag {{% {} %}}", inner);
        }
    }

    let (_, _, root) = stack.pop().expect("root");
    assert!(stack.is_empty(), "unclosed block in compiled output");
    root
}

fn push_piece(stack: &mut [(String, String, Vec<Piece>)], piece: Piece) {
    if let Some((_, _, pieces)) = stack.last_mut() {
        pieces.push(piece);
    }
}

/// Collapse runs of whitespace so assertions can ignore indentation
pub fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn list(values: &[&str]) -> Value {
    Value::List(values.iter().map(|v| Value::str(*v)).collect())
}
