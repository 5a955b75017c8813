use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::priority::Priority;

/// Structural construct an uncovered region belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    ExceptionHandler,
    Raise,
    Branch,
    Loop,
    FunctionBody,
    ModuleLevel,
}

impl BlockType {
    /// Every block type, in descending rank order.
    pub const ALL: [BlockType; 6] = [
        BlockType::ExceptionHandler,
        BlockType::Raise,
        BlockType::Branch,
        BlockType::Loop,
        BlockType::FunctionBody,
        BlockType::ModuleLevel,
    ];

    /// Tie-break rank used when two candidate blocks have the same span.
    /// Higher wins.
    pub const fn rank(self) -> u8 {
        match self {
            BlockType::ExceptionHandler | BlockType::Raise => 4,
            BlockType::Branch => 3,
            BlockType::Loop => 2,
            BlockType::FunctionBody => 1,
            BlockType::ModuleLevel => 0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BlockType::ExceptionHandler => "exception_handler",
            BlockType::Raise => "raise",
            BlockType::Branch => "branch",
            BlockType::Loop => "loop",
            BlockType::FunctionBody => "function_body",
            BlockType::ModuleLevel => "module_level",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::ALL
            .into_iter()
            .find(|block_type| block_type.as_str() == s)
            .ok_or_else(|| format!("unknown block type '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Function,
    Class,
}

/// A function or class enclosing a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFrame {
    pub kind: ScopeKind,
    /// Bare name (`parse`)
    pub name: String,
    /// Dotted path through enclosing scopes (`Parser.parse`)
    pub qualified_name: String,
    pub line_start: usize,
    pub line_end: usize,
    /// Parameter names, without `self`/`cls`
    pub parameters: Vec<String>,
    pub is_async: bool,
    /// Function defined directly in a class body
    pub is_method: bool,
    /// Name of the class a method belongs to
    pub class_name: Option<String>,
}

/// Condition guarding a branch arm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    /// `true` for `if`/`elif`/`case` arms, `false` for `else`
    pub polarity: bool,
}

/// A recognized construct with its line span. Carries no coverage information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapBlock {
    pub block_type: BlockType,
    pub line_start: usize,
    pub line_end: usize,
    /// Line of the `if`/`for`/`except`/`def` header when it sits above the body
    pub header_line: Option<usize>,
    pub owner: Option<Arc<ScopeFrame>>,
    pub condition: Option<Condition>,
    /// Raised or caught exception expression
    pub exception: Option<String>,
    /// Loop keyword (`for`/`while`) for loop blocks
    pub loop_keyword: Option<&'static str>,
}

impl GapBlock {
    pub fn new(block_type: BlockType, line_start: usize, line_end: usize) -> Self {
        Self {
            block_type,
            line_start,
            line_end: line_end.max(line_start),
            header_line: None,
            owner: None,
            condition: None,
            exception: None,
            loop_keyword: None,
        }
    }

    pub fn span_len(&self) -> usize {
        self.line_end - self.line_start + 1
    }

    pub fn contains(&self, line: usize) -> bool {
        (self.line_start..=self.line_end).contains(&line)
    }
}

/// One contiguous, structurally attributed uncovered region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gap {
    pub file: String,
    pub block_type: BlockType,
    pub line_start: usize,
    pub line_end: usize,
    pub owning_function: Option<String>,
    pub missed_lines: BTreeSet<usize>,
    /// Block the gap was attributed to
    pub block: GapBlock,
}

/// Externally visible test recommendation derived from one [`Gap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub file: String,
    pub priority: Priority,
    pub block_type: BlockType,
    pub line_start: usize,
    pub line_end: usize,
    pub owning_function: Option<String>,
    pub test_name: String,
    pub code_template: String,
    pub hints: Vec<String>,
    pub covers_lines: Vec<usize>,
    pub description: String,
}

/// A file that was skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub file: String,
    pub message: String,
}

impl Warning {
    pub fn new(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.message)
    }
}
