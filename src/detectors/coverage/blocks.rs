//! Structural classification of Python sources into gap blocks.
//!
//! [`BlockClassifier`] walks a parsed tree once and records a [`GapBlock`] for
//! every construct a coverage gap can be attributed to. Blocks are recorded
//! before their children are visited, so for any two overlapping blocks the
//! outer one has the lower id. [`LineIndex`] relies on that to hand out
//! per-line containment chains ordered outermost to innermost.

use std::collections::HashMap;
use std::sync::Arc;

use tree_sitter::Node;

use super::types::{BlockType, Condition, GapBlock, ScopeFrame, ScopeKind};
use crate::lang::python::{end_line, start_line, ParsedSource};

/// Id of the module-level block, always present.
pub const MODULE_BLOCK: usize = 0;

/// Enclosing functions and classes, outermost first.
///
/// Entering a scope produces a new chain; chains are never mutated in place.
#[derive(Debug, Clone, Default)]
pub struct ScopeChain {
    frames: Vec<Arc<ScopeFrame>>,
}

impl ScopeChain {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn enter(&self, frame: ScopeFrame) -> Self {
        let mut frames = self.frames.clone();
        frames.push(Arc::new(frame));
        Self { frames }
    }

    pub fn innermost(&self) -> Option<&Arc<ScopeFrame>> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn qualify(&self, name: &str) -> String {
        match self.innermost() {
            Some(parent) => format!("{}.{}", parent.qualified_name, name),
            None => name.to_string(),
        }
    }

    fn enclosing_class(&self) -> Option<&str> {
        self.innermost()
            .filter(|frame| frame.kind == ScopeKind::Class)
            .map(|frame| frame.name.as_str())
    }
}

/// Per-line containment chains over a file's blocks.
#[derive(Debug, Clone)]
pub struct LineIndex {
    chains: Vec<Vec<usize>>,
    headers: HashMap<usize, Vec<usize>>,
    module_only: Vec<usize>,
}

impl LineIndex {
    fn build(blocks: &[GapBlock], line_count: usize) -> Self {
        let mut chains = vec![Vec::new(); line_count.max(1)];
        let mut headers: HashMap<usize, Vec<usize>> = HashMap::new();

        for (id, block) in blocks.iter().enumerate() {
            let last = block.line_end.min(chains.len());
            for line in block.line_start..=last {
                chains[line - 1].push(id);
            }
            if let Some(header) = block.header_line {
                headers.entry(header).or_default().push(id);
            }
        }

        Self {
            chains,
            headers,
            module_only: vec![MODULE_BLOCK],
        }
    }

    /// Block ids covering `line`, outermost first. Lines past the end of the
    /// file only belong to the module block.
    pub fn chain(&self, line: usize) -> &[usize] {
        match line.checked_sub(1).and_then(|idx| self.chains.get(idx)) {
            Some(chain) => chain,
            None => &self.module_only,
        }
    }

    /// Blocks whose header sits on `line`.
    pub fn headed_at(&self, line: usize) -> &[usize] {
        self.headers.get(&line).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Blocks of one file together with their line index.
#[derive(Debug, Clone)]
pub struct ClassifiedFile {
    blocks: Vec<GapBlock>,
    index: LineIndex,
}

impl ClassifiedFile {
    pub fn blocks(&self) -> &[GapBlock] {
        &self.blocks
    }

    pub fn block(&self, id: usize) -> &GapBlock {
        &self.blocks[id]
    }

    pub fn index(&self) -> &LineIndex {
        &self.index
    }

    /// Blocks covering `line`, outermost first.
    pub fn chain_blocks(&self, line: usize) -> impl Iterator<Item = &GapBlock> + '_ {
        self.index.chain(line).iter().map(|&id| &self.blocks[id])
    }
}

/// Walks a parsed tree and records gap blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockClassifier;

impl BlockClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, source: &ParsedSource) -> ClassifiedFile {
        let line_count = source.line_count();
        let mut blocks = vec![GapBlock::new(
            BlockType::ModuleLevel,
            1,
            line_count.max(1),
        )];

        let mut walker = Walker {
            source,
            blocks: &mut blocks,
        };
        walker.visit_children(source.root(), &ScopeChain::root());

        let index = LineIndex::build(&blocks, line_count);
        ClassifiedFile { blocks, index }
    }
}

struct Walker<'a> {
    source: &'a ParsedSource,
    blocks: &'a mut Vec<GapBlock>,
}

impl Walker<'_> {
    fn visit(&mut self, node: Node, scope: &ScopeChain) {
        match node.kind() {
            "function_definition" => self.visit_function(node, scope),
            "class_definition" => self.visit_class(node, scope),
            "if_statement" => {
                self.record_if_arms(node, scope);
                self.visit_children(node, scope);
            }
            "for_statement" | "while_statement" => {
                if let Some(body) = body_of(node, "body") {
                    let mut block = self.body_block(BlockType::Loop, node, body, scope);
                    block.loop_keyword = Some(if node.kind() == "for_statement" {
                        "for"
                    } else {
                        "while"
                    });
                    if node.kind() == "while_statement" {
                        block.condition = node
                            .child_by_field_name("condition")
                            .map(|c| Condition {
                                text: self.source.node_text(&c).to_string(),
                                polarity: true,
                            });
                    }
                    self.blocks.push(block);
                }
                self.visit_children(node, scope);
            }
            "except_clause" | "except_group_clause" => {
                if let Some(body) = body_of(node, "body") {
                    let mut block =
                        self.body_block(BlockType::ExceptionHandler, node, body, scope);
                    block.exception = self.caught_exception(node);
                    self.blocks.push(block);
                }
                self.visit_children(node, scope);
            }
            "raise_statement" => {
                let mut block =
                    GapBlock::new(BlockType::Raise, start_line(&node), end_line(&node));
                block.owner = scope.innermost().cloned();
                block.exception = self.raised_exception(node);
                self.blocks.push(block);
                self.visit_children(node, scope);
            }
            "case_clause" => {
                if let Some(body) = body_of(node, "consequence") {
                    let mut block = self.body_block(BlockType::Branch, node, body, scope);
                    block.condition = Some(Condition {
                        text: self.case_pattern_text(node),
                        polarity: true,
                    });
                    self.blocks.push(block);
                }
                self.visit_children(node, scope);
            }
            _ => self.visit_children(node, scope),
        }
    }

    fn visit_children(&mut self, node: Node, scope: &ScopeChain) {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(child, scope);
        }
    }

    fn visit_function(&mut self, node: Node, scope: &ScopeChain) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.source.node_text(&n).to_string())
            .unwrap_or_else(|| "<anonymous>".to_string());
        let class_name = scope.enclosing_class().map(str::to_string);
        let is_method = class_name.is_some();
        let is_async = node
            .child(0)
            .is_some_and(|first| first.kind() == "async");

        let frame = ScopeFrame {
            kind: ScopeKind::Function,
            qualified_name: scope.qualify(&name),
            name,
            line_start: start_line(&node),
            line_end: end_line(&node),
            parameters: self.parameters(node, is_method),
            is_async,
            is_method,
            class_name,
        };
        let inner = scope.enter(frame);

        if let Some(body) = body_of(node, "body") {
            let block = self.body_block(BlockType::FunctionBody, node, body, &inner);
            self.blocks.push(block);
        }
        self.visit_children(node, &inner);
    }

    fn visit_class(&mut self, node: Node, scope: &ScopeChain) {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.source.node_text(&n).to_string())
            .unwrap_or_else(|| "<anonymous>".to_string());
        let frame = ScopeFrame {
            kind: ScopeKind::Class,
            qualified_name: scope.qualify(&name),
            name,
            line_start: start_line(&node),
            line_end: end_line(&node),
            parameters: Vec::new(),
            is_async: false,
            is_method: false,
            class_name: None,
        };
        let inner = scope.enter(frame);
        self.visit_children(node, &inner);
    }

    /// One branch block per arm: the `if` consequence, each `elif`
    /// consequence and the `else` body.
    fn record_if_arms(&mut self, node: Node, scope: &ScopeChain) {
        let if_condition = node
            .child_by_field_name("condition")
            .map(|c| self.source.node_text(&c).to_string())
            .unwrap_or_default();

        if let Some(body) = node.child_by_field_name("consequence") {
            let mut block = self.body_block(BlockType::Branch, node, body, scope);
            block.condition = Some(Condition {
                text: if_condition.clone(),
                polarity: true,
            });
            self.blocks.push(block);
        }

        let mut cursor = node.walk();
        let alternatives: Vec<Node> = node
            .named_children(&mut cursor)
            .filter(|child| matches!(child.kind(), "elif_clause" | "else_clause"))
            .collect();

        for clause in alternatives {
            let (field, condition) = if clause.kind() == "elif_clause" {
                let text = clause
                    .child_by_field_name("condition")
                    .map(|c| self.source.node_text(&c).to_string())
                    .unwrap_or_default();
                (
                    "consequence",
                    Condition {
                        text,
                        polarity: true,
                    },
                )
            } else {
                (
                    "body",
                    Condition {
                        text: if_condition.clone(),
                        polarity: false,
                    },
                )
            };

            if let Some(body) = body_of(clause, field) {
                let mut block = self.body_block(BlockType::Branch, clause, body, scope);
                if clause.kind() == "else_clause" {
                    // `else:` is not a statement line of its own
                    block.header_line = None;
                }
                block.condition = Some(condition);
                self.blocks.push(block);
            }
        }
    }

    fn body_block(
        &self,
        block_type: BlockType,
        header: Node,
        body: Node,
        scope: &ScopeChain,
    ) -> GapBlock {
        let mut block = GapBlock::new(block_type, start_line(&body), end_line(&body));
        let header_line = start_line(&header);
        if header_line < block.line_start {
            block.header_line = Some(header_line);
        }
        block.owner = scope.innermost().cloned();
        block
    }

    fn parameters(&self, function: Node, is_method: bool) -> Vec<String> {
        let Some(parameters) = function.child_by_field_name("parameters") else {
            return Vec::new();
        };

        let mut cursor = parameters.walk();
        let mut names: Vec<String> = parameters
            .named_children(&mut cursor)
            .filter_map(|param| self.parameter_name(param))
            .collect();

        if is_method && names.first().is_some_and(|n| n == "self" || n == "cls") {
            names.remove(0);
        }
        names
    }

    fn parameter_name(&self, param: Node) -> Option<String> {
        match param.kind() {
            "identifier" => Some(self.source.node_text(&param).to_string()),
            "default_parameter" | "typed_default_parameter" => param
                .child_by_field_name("name")
                .and_then(|name| self.parameter_name(name)),
            "typed_parameter" => param
                .named_child(0)
                .and_then(|inner| self.parameter_name(inner)),
            "list_splat_pattern" => param
                .named_child(0)
                .map(|inner| format!("*{}", self.source.node_text(&inner))),
            "dictionary_splat_pattern" => param
                .named_child(0)
                .map(|inner| format!("**{}", self.source.node_text(&inner))),
            _ => None,
        }
    }

    fn caught_exception(&self, clause: Node) -> Option<String> {
        let mut cursor = clause.walk();
        let first = clause
            .named_children(&mut cursor)
            .find(|child| !matches!(child.kind(), "block" | "comment"))?;
        let target = if first.kind() == "as_pattern" {
            first.named_child(0)?
        } else {
            first
        };
        Some(self.source.node_text(&target).to_string())
    }

    fn raised_exception(&self, statement: Node) -> Option<String> {
        let raised = statement.named_child(0)?;
        let target = match raised.kind() {
            "call" => raised.child_by_field_name("function")?,
            _ => raised,
        };
        Some(self.source.node_text(&target).to_string())
    }

    fn case_pattern_text(&self, clause: Node) -> String {
        let mut cursor = clause.walk();
        let mut parts = Vec::new();
        let mut guard = None;
        for child in clause.named_children(&mut cursor) {
            match child.kind() {
                "case_pattern" => parts.push(self.source.node_text(&child).to_string()),
                "if_clause" => guard = Some(self.source.node_text(&child).to_string()),
                _ => {}
            }
        }
        let mut text = parts.join(", ");
        if let Some(guard) = guard {
            text.push(' ');
            text.push_str(&guard);
        }
        text
    }
}

/// Body block of a compound statement: the named field when the grammar
/// provides one, otherwise the first `block` child.
fn body_of<'t>(node: Node<'t>, field: &str) -> Option<Node<'t>> {
    node.child_by_field_name(field).or_else(|| {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|child| child.kind() == "block");
        found
    })
}
