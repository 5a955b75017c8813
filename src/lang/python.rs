//! Python source index with tree-sitter integration.
//!
//! [`PythonSourceIndex`] owns a tree-sitter parser configured for Python and turns
//! source text into a [`ParsedSource`]. tree-sitter recovers from syntax errors by
//! inserting `ERROR`/`MISSING` nodes; a tree containing any of those is rejected
//! with a parse error so that structural classification never runs on a guessed
//! tree.

use tree_sitter::{Node, Parser, Tree};

use crate::core::errors::{CoveredError, Result};

const LANGUAGE: &str = "python";

/// One parsed source file: path, raw text and syntax tree.
pub struct ParsedSource {
    path: String,
    text: String,
    tree: Tree,
    line_count: usize,
}

impl std::fmt::Debug for ParsedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedSource")
            .field("path", &self.path)
            .field("line_count", &self.line_count)
            .finish_non_exhaustive()
    }
}

impl ParsedSource {
    /// Path the source was loaded for (as named in the coverage report)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw source text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Root node of the syntax tree
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Number of lines in the source text
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Text of a node, trimmed. Invalid UTF-8 yields an empty string.
    pub fn node_text(&self, node: &Node) -> &str {
        node.utf8_text(self.text.as_bytes())
            .map(str::trim)
            .unwrap_or("")
    }

    /// Lines `start..=end` (1-based, inclusive) joined with newlines.
    pub fn lines(&self, start: usize, end: usize) -> String {
        if start == 0 || end < start {
            return String::new();
        }
        self.text
            .lines()
            .skip(start - 1)
            .take(end - start + 1)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// First line (1-based) occupied by a node.
pub fn start_line(node: &Node) -> usize {
    node.start_position().row + 1
}

/// Last line (1-based) occupied by a node.
///
/// Nodes that swallow a trailing newline end at column 0 of the following row;
/// that row holds none of the node's text.
pub fn end_line(node: &Node) -> usize {
    let end = node.end_position();
    if end.column == 0 && end.row > node.start_position().row {
        end.row
    } else {
        end.row + 1
    }
}

/// Python parser producing [`ParsedSource`] values
pub struct PythonSourceIndex {
    parser: Parser,
}

impl PythonSourceIndex {
    /// Create a new Python source index
    pub fn new() -> Result<Self> {
        let language = tree_sitter_python::LANGUAGE.into();
        let mut parser = Parser::new();
        parser.set_language(&language).map_err(|e| {
            CoveredError::parse(LANGUAGE, format!("Failed to set Python language: {:?}", e))
        })?;

        Ok(Self { parser })
    }

    /// Parse Python source text.
    ///
    /// Fails when the text is not syntactically valid Python.
    pub fn parse(&mut self, path: &str, text: String) -> Result<ParsedSource> {
        let tree = self.parser.parse(&text, None).ok_or_else(|| {
            CoveredError::parse_with_location(
                LANGUAGE,
                "Failed to parse Python source code",
                path,
                None,
                None,
            )
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_error_position(root)
                .map(|(line, column)| (Some(line), Some(column)))
                .unwrap_or((None, None));
            return Err(CoveredError::parse_with_location(
                LANGUAGE,
                "invalid syntax",
                path,
                line,
                column,
            ));
        }

        let line_count = text.lines().count();
        Ok(ParsedSource {
            path: path.to_string(),
            text,
            tree,
            line_count,
        })
    }
}

/// Locate the first `ERROR` or `MISSING` node in document order.
fn first_error_position(root: Node) -> Option<(usize, usize)> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let position = node.start_position();
            return Some((position.row + 1, position.column + 1));
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}
