//! Host directive generation
//!
//! Turns a parsed [`Document`] back into host template text: component
//! invocations become `cotton_component` blocks, the vars declaration becomes
//! a `cotton_vars_frame` wrapper, and everything else is copied through.

use crate::ast::{ComponentInvocation, Document, Node};
use crate::attributes::AttributeBinding;
use crate::error::{CompilerError, Result};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::types::*;
use crate::vars::{extract_vars_frame, VarsFrame};
use crate::{CompilationStats, CompilerOptions};

pub struct CodeGenerator<'a> {
    options: &'a CompilerOptions,
    filename: &'a str,
    /// Recursion depth of attribute values compiled as nested fragments
    depth: usize,
    components: Vec<String>,
    stats: CompilationStats,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(options: &'a CompilerOptions, filename: &'a str) -> Self {
        Self {
            options,
            filename,
            depth: 0,
            components: Vec::new(),
            stats: CompilationStats::default(),
        }
    }

    /// Fragment templates referenced by the generated output, first use order
    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn stats(&self) -> &CompilationStats {
        &self.stats
    }

    pub fn into_parts(self) -> (Vec<String>, CompilationStats) {
        (self.components, self.stats)
    }

    pub fn generate(&mut self, document: Document) -> Result<String> {
        let (frame, nodes) = extract_vars_frame(document.nodes, self.filename)?;

        let mut body = String::new();
        self.emit_nodes(&nodes, &mut body)?;

        match frame {
            Some(frame) => {
                let mut output = String::with_capacity(body.len() + 64);
                self.emit_vars_frame(&frame, body.trim(), &mut output)?;
                Ok(output)
            }
            None => Ok(body),
        }
    }

    fn emit_nodes(&mut self, nodes: &[Node], out: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text { text } => out.push_str(text),
                Node::Component(invocation) => self.emit_component(invocation, out)?,
                Node::Slot(slot) => {
                    return Err(CompilerError::slot(
                        self.filename,
                        slot.line,
                        format!("<c-slot name=\"{}\"> must be a direct child of a component", slot.name),
                    ))
                }
                Node::Vars(vars) => {
                    return Err(CompilerError::vars(
                        self.filename,
                        vars.line,
                        "<c-vars> must be declared at the top level of a template",
                    ))
                }
            }
        }
        Ok(())
    }

    fn emit_component(&mut self, invocation: &ComponentInvocation, out: &mut String) -> Result<()> {
        self.stats.component_count += 1;
        if !self.components.contains(&invocation.template) {
            self.components.push(invocation.template.clone());
        }

        let (inline, blocks) = split_block_form(&invocation.attributes, AttributeBinding::needs_block_form);
        self.stats.attribute_count += invocation.attributes.len();
        self.stats.block_attribute_count += blocks.len();

        out.push_str("{% ");
        out.push_str(COMPONENT_DIRECTIVE);
        out.push_str(" \"");
        out.push_str(&invocation.template);
        out.push('"');
        for attribute in inline {
            out.push(' ');
            out.push_str(&attribute.source_form());
        }
        out.push_str(" %}");

        for attribute in blocks {
            self.emit_block(ATTR_DIRECTIVE, ATTR_END_DIRECTIVE, attribute, out)?;
        }

        for slot in &invocation.slots {
            self.stats.slot_count += 1;
            out.push_str(&format!("{{% {} {} %}}", SLOT_DIRECTIVE, slot.name));
            self.emit_nodes(&slot.content, out)?;
            out.push_str(&format!("{{% {} %}}", SLOT_END_DIRECTIVE));
        }

        self.emit_nodes(&invocation.default_content, out)?;
        out.push_str(&format!("{{% {} %}}", COMPONENT_END_DIRECTIVE));

        log::trace!(
            "{}:{}: <c-{}> -> {} ({} attribute(s), {} slot(s))",
            self.filename,
            invocation.line,
            invocation.name,
            invocation.template,
            invocation.attributes.len(),
            invocation.slots.len()
        );
        Ok(())
    }

    fn emit_vars_frame(&mut self, frame: &VarsFrame, body: &str, out: &mut String) -> Result<()> {
        self.stats.var_count += frame.declarations.len();
        let (inline, blocks) = split_block_form(&frame.declarations, var_needs_block_form);

        out.push_str("{% ");
        out.push_str(VARS_FRAME_DIRECTIVE);
        for declaration in inline {
            out.push(' ');
            out.push_str(&var_declaration(declaration));
        }
        out.push_str(" %}");

        for declaration in blocks {
            self.emit_block(VAR_DIRECTIVE, VAR_END_DIRECTIVE, declaration, out)?;
        }

        out.push_str(body);
        out.push_str(&format!("{{% {} %}}", VARS_FRAME_END_DIRECTIVE));
        log::debug!("{}: wrapped body in vars frame with {} declaration(s)", self.filename, frame.declarations.len());
        Ok(())
    }

    fn emit_block(&mut self, open: &str, close: &str, binding: &AttributeBinding, out: &mut String) -> Result<()> {
        match binding.kind {
            AttributeKind::ValuelessBoolean => {
                out.push_str(&format!("{{% {} {}{} %}}True", open, DYNAMIC_SIGIL, binding.name));
            }
            AttributeKind::Static | AttributeKind::Dynamic => {
                out.push_str(&format!("{{% {} {} %}}", open, binding.written_name()));
                let value = self.compile_value(&binding.value)?;
                out.push_str(&value);
            }
        }
        out.push_str(&format!("{{% {} %}}", close));
        Ok(())
    }

    /// Compile an attribute value as a template of its own so that component
    /// tags inside it are expanded too
    fn compile_value(&mut self, value: &str) -> Result<String> {
        if !value.contains("<c-") {
            return Ok(value.to_string());
        }
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CompilerError::LimitExceeded {
                limit_type: format!("nested attribute templates in {}", self.filename),
                limit: MAX_NESTING_DEPTH,
            });
        }

        let tokens = Lexer::new(value, self.filename).tokenize()?;
        let document = Parser::new(tokens, value, self.filename, self.options).parse()?;

        self.depth += 1;
        let mut out = String::with_capacity(value.len());
        let result = self.emit_nodes(&document.nodes, &mut out);
        self.depth -= 1;
        result?;
        Ok(out)
    }
}

/// Split bindings into the inline prefix and the block-form rest: everything
/// from the first binding that needs block form onward goes into blocks
fn split_block_form<F>(bindings: &[AttributeBinding], needs_block: F) -> (&[AttributeBinding], &[AttributeBinding])
where
    F: Fn(&AttributeBinding) -> bool,
{
    let first_block = bindings.iter().position(needs_block).unwrap_or(bindings.len());
    bindings.split_at(first_block)
}

fn var_needs_block_form(binding: &AttributeBinding) -> bool {
    binding.needs_block_form()
        || (binding.is_dynamic() && (binding.value.is_empty() || binding.value.contains(char::is_whitespace)))
}

/// `key=key|default:VALUE`
fn var_declaration(binding: &AttributeBinding) -> String {
    let key = &binding.key;
    match binding.kind {
        AttributeKind::Static => {
            let quote = binding.emit_quote();
            format!("{key}={key}|default:{quote}{}{quote}", binding.value)
        }
        AttributeKind::Dynamic => format!("{key}={key}|default:{}", binding.value),
        AttributeKind::ValuelessBoolean => format!("{key}={key}|default:True"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_template;

    fn generate(source: &str) -> Result<String> {
        let options = CompilerOptions::default();
        let document = parse_template(source, "view.html", &options)?;
        CodeGenerator::new(&options, "view.html").generate(document)
    }

    #[test]
    fn test_text_passes_through() {
        let source = "<div>{{ user.name }}{% if x %}<c- not a tag{% endif %}</div>";
        assert_eq!(generate(source).unwrap(), source);
    }

    #[test]
    fn test_component_with_slots() {
        let out = generate(
            "<c-card title=\"Hi\" :count=\"n\" flag>\n<c-slot name=\"header\">H</c-slot>body</c-card>",
        )
        .unwrap();
        assert_eq!(
            out,
            "{% cotton_component \"cotton/card.html\" title=\"Hi\" :count=\"n\" flag %}\
             {% cotton_slot header %}H{% endcotton_slot %}\nbody{% endcotton_component %}"
        );
    }

    #[test]
    fn test_self_closing_component() {
        assert_eq!(
            generate("<c-icon />").unwrap(),
            "{% cotton_component \"cotton/icon.html\" %}{% endcotton_component %}"
        );
    }

    #[test]
    fn test_vars_frame_output() {
        let out = generate("<c-vars var1=\"string with space\" />\n\ncontent\n").unwrap();
        assert_eq!(
            out,
            "{% cotton_vars_frame var1=var1|default:\"string with space\" %}content{% endcotton_vars_frame %}"
        );
    }

    #[test]
    fn test_vars_kinds() {
        let out = generate("<c-vars a='x' :b=\"[1,2]\" c d=plain />{{ a }}").unwrap();
        assert_eq!(
            out,
            "{% cotton_vars_frame a=a|default:'x' b=b|default:[1,2] c=c|default:True d=d|default:\"plain\" %}\
             {{ a }}{% endcotton_vars_frame %}"
        );
    }

    #[test]
    fn test_vars_block_form() {
        let out = generate("<c-vars :items=\"[1, 2]\" x-data=\"{\n open: false\n}\" flag />x").unwrap();
        assert_eq!(
            out,
            "{% cotton_vars_frame %}\
             {% cotton_var :items %}[1, 2]{% endcotton_var %}\
             {% cotton_var x-data %}{\n open: false\n}{% endcotton_var %}\
             {% cotton_var :flag %}True{% endcotton_var %}\
             x{% endcotton_vars_frame %}"
        );
    }

    #[test]
    fn test_block_attributes_keep_source_order() {
        let out = generate("<c-cmp a=\"1\" x-data=\"{\n}\" b=\"2\" flag />").unwrap();
        assert_eq!(
            out,
            "{% cotton_component \"cotton/cmp.html\" a=\"1\" %}\
             {% cotton_attr x-data %}{\n}{% endcotton_attr %}\
             {% cotton_attr b %}2{% endcotton_attr %}\
             {% cotton_attr :flag %}True{% endcotton_attr %}\
             {% endcotton_component %}"
        );
    }

    #[test]
    fn test_host_syntax_in_attribute_uses_block() {
        let out = generate("<c-cmp attr1=\"Hello {{ name }}\" />").unwrap();
        assert_eq!(
            out,
            "{% cotton_component \"cotton/cmp.html\" %}\
             {% cotton_attr attr1 %}Hello {{ name }}{% endcotton_attr %}{% endcotton_component %}"
        );
    }

    #[test]
    fn test_unquoted_host_syntax_in_attribute_uses_block() {
        let out = generate("<c-x a={{ v }} b />").unwrap();
        assert_eq!(
            out,
            "{% cotton_component \"cotton/x.html\" %}\
             {% cotton_attr a %}{{ v }}{% endcotton_attr %}{% cotton_attr :b %}True{% endcotton_attr %}\
             {% endcotton_component %}"
        );
    }

    #[test]
    fn test_nested_component_in_attribute_is_compiled() {
        let options = CompilerOptions::default();
        let document = parse_template("<c-card title=\"<c-icon />\" />", "view.html", &options).unwrap();
        let mut generator = CodeGenerator::new(&options, "view.html");
        let out = generator.generate(document).unwrap();
        assert_eq!(
            out,
            "{% cotton_component \"cotton/card.html\" %}\
             {% cotton_attr title %}{% cotton_component \"cotton/icon.html\" %}{% endcotton_component %}{% endcotton_attr %}\
             {% endcotton_component %}"
        );
        assert_eq!(generator.components(), ["cotton/card.html", "cotton/icon.html"]);
        assert_eq!(generator.stats().component_count, 2);
    }

    #[test]
    fn test_mixed_quotes_use_block_form() {
        let out = generate("<c-cmp msg='say \"it&#39;s\"' />").unwrap();
        assert!(out.contains(" msg='say \"it&#39;s\"'"));
        let out = generate("<c-cmp msg=\"{{ a }}\" plain=it's />").unwrap();
        assert!(out.contains("{% cotton_attr plain %}it's{% endcotton_attr %}"));
    }

    #[test]
    fn test_components_recorded_once() {
        let options = CompilerOptions::default();
        let document = parse_template("<c-a /><c-b /><c-a />", "view.html", &options).unwrap();
        let mut generator = CodeGenerator::new(&options, "view.html");
        generator.generate(document).unwrap();
        assert_eq!(generator.components(), ["cotton/a.html", "cotton/b.html"]);
        assert_eq!(generator.stats().component_count, 3);
    }
}
