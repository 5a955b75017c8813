//! Structural risk checks.
//!
//! A [`RiskScanner`] walks the syntax tree for shapes that call for a specific
//! kind of test: bare or silent exception handlers, mutable default
//! arguments, files opened outside a `with` block, statements after a jump,
//! and functions with many decision points. Findings are advisory. They turn
//! into extra hints on the suggestions whose scope contains them and never
//! change which gaps exist or how they rank.

use tree_sitter::Node;

use crate::lang::python::{end_line, start_line, ParsedSource};

/// What a [`Risk`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskKind {
    /// `except:` without an exception type
    BareExcept,
    /// Handler whose body is a lone `pass`
    SilentHandler,
    /// Parameter defaulting to a list, dict or set literal
    MutableDefault,
    /// `open(...)` outside a `with` item
    UnclosedResource,
    /// Statements following `return`, `raise`, `break` or `continue`
    UnreachableCode,
    /// Function whose decision count exceeds the threshold
    ComplexFunction { complexity: usize },
}

/// One structural finding and the lines it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Risk {
    pub kind: RiskKind,
    pub line_start: usize,
    pub line_end: usize,
}

impl Risk {
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.line_start <= end && start <= self.line_end
    }

    /// Advice appended to a suggestion's hints.
    pub fn hint(&self) -> String {
        match self.kind {
            RiskKind::BareExcept => "Bare `except:` also catches KeyboardInterrupt and \
                SystemExit; assert which errors must propagate"
                .to_string(),
            RiskKind::SilentHandler => "Handler swallows the exception; assert on side \
                effects rather than on a raised error"
                .to_string(),
            RiskKind::MutableDefault => "Mutable default argument; call twice and assert \
                no state leaks between calls"
                .to_string(),
            RiskKind::UnclosedResource => "File opened without a context manager; assert \
                it is closed when an error occurs"
                .to_string(),
            RiskKind::UnreachableCode => "Statements after a return, raise, break or \
                continue never run; remove them instead of testing them"
                .to_string(),
            RiskKind::ComplexFunction { complexity } => format!(
                "High cyclomatic complexity ({complexity}); give each branch its own test"
            ),
        }
    }
}

const JUMPS: &[&str] = &[
    "return_statement",
    "raise_statement",
    "break_statement",
    "continue_statement",
];

const DECISIONS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "for_statement",
    "while_statement",
    "except_clause",
    "except_group_clause",
    "boolean_operator",
    "case_clause",
];

/// Finds [`Risk`]s in a parsed source.
#[derive(Debug, Clone, Copy)]
pub struct RiskScanner {
    complexity_threshold: usize,
}

impl Default for RiskScanner {
    fn default() -> Self {
        Self::new(10)
    }
}

impl RiskScanner {
    /// Functions are reported once their complexity exceeds
    /// `complexity_threshold`.
    pub fn new(complexity_threshold: usize) -> Self {
        Self {
            complexity_threshold,
        }
    }

    /// Every finding in `source`, ordered by line.
    pub fn scan(&self, source: &ParsedSource) -> Vec<Risk> {
        let mut risks = Vec::new();
        self.visit(source, source.root(), &mut risks);
        risks.sort_by_key(|risk| (risk.line_start, risk.line_end));
        risks
    }

    fn visit(&self, source: &ParsedSource, node: Node, risks: &mut Vec<Risk>) {
        match node.kind() {
            "function_definition" => {
                if has_mutable_default(node) {
                    let line = start_line(&node);
                    risks.push(Risk {
                        kind: RiskKind::MutableDefault,
                        line_start: line,
                        line_end: line,
                    });
                }
                let complexity = 1 + decision_count(node);
                if complexity > self.complexity_threshold {
                    risks.push(Risk {
                        kind: RiskKind::ComplexFunction { complexity },
                        line_start: start_line(&node),
                        line_end: end_line(&node),
                    });
                }
            }
            "except_clause" => {
                if let Some(kind) = handler_risk(node) {
                    risks.push(Risk {
                        kind,
                        line_start: start_line(&node),
                        line_end: end_line(&node),
                    });
                }
            }
            "block" => {
                if let Some(risk) = unreachable_tail(node) {
                    risks.push(risk);
                }
            }
            "call" => {
                if calls_open(source, node) && !is_with_item(node) {
                    risks.push(Risk {
                        kind: RiskKind::UnclosedResource,
                        line_start: start_line(&node),
                        line_end: end_line(&node),
                    });
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        for child in children {
            self.visit(source, child, risks);
        }
    }
}

fn statements<'t>(block: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = block.walk();
    let found = block
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect();
    found
}

fn has_mutable_default(function: Node) -> bool {
    let Some(parameters) = function.child_by_field_name("parameters") else {
        return false;
    };
    let mut cursor = parameters.walk();
    let found = parameters
        .named_children(&mut cursor)
        .filter(|param| {
            matches!(
                param.kind(),
                "default_parameter" | "typed_default_parameter"
            )
        })
        .filter_map(|param| param.child_by_field_name("value"))
        .any(|value| matches!(value.kind(), "list" | "dictionary" | "set"));
    found
}

fn decision_count(node: Node) -> usize {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    children
        .into_iter()
        .map(|child| usize::from(DECISIONS.contains(&child.kind())) + decision_count(child))
        .sum()
}

fn handler_risk(clause: Node) -> Option<RiskKind> {
    let mut cursor = clause.walk();
    let children: Vec<Node> = clause.named_children(&mut cursor).collect();

    let catches_anything = !children
        .iter()
        .any(|child| !matches!(child.kind(), "block" | "comment"));
    if catches_anything {
        return Some(RiskKind::BareExcept);
    }

    let body = children.iter().find(|child| child.kind() == "block")?;
    match statements(*body).as_slice() {
        [only] if only.kind() == "pass_statement" => Some(RiskKind::SilentHandler),
        _ => None,
    }
}

fn unreachable_tail(block: Node) -> Option<Risk> {
    let statements = statements(block);
    let jump = statements
        .iter()
        .position(|stmt| JUMPS.contains(&stmt.kind()))?;
    let (first, last) = (statements.get(jump + 1)?, statements.last()?);
    Some(Risk {
        kind: RiskKind::UnreachableCode,
        line_start: start_line(first),
        line_end: end_line(last),
    })
}

fn calls_open(source: &ParsedSource, call: Node) -> bool {
    let Some(function) = call.child_by_field_name("function") else {
        return false;
    };
    match function.kind() {
        "identifier" => source.node_text(&function) == "open",
        "attribute" => function
            .child_by_field_name("attribute")
            .is_some_and(|name| source.node_text(&name) == "open"),
        _ => false,
    }
}

fn is_with_item(call: Node) -> bool {
    let mut current = call;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "as_pattern" | "parenthesized_expression" => current = parent,
            "with_item" => return true,
            _ => return false,
        }
    }
    false
}
