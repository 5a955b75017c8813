//! Risk tiers for coverage gaps.
//!
//! The mapping is a fixed, total table over [`BlockType`]: adding a block type
//! without extending [`priority_for`] fails to compile.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::BlockType;

/// Risk tier of a gap. Ordered so that `Critical` is the greatest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority tier for a block type.
pub const fn priority_for(block_type: BlockType) -> Priority {
    match block_type {
        BlockType::ExceptionHandler | BlockType::Raise => Priority::Critical,
        BlockType::Branch => Priority::High,
        BlockType::Loop | BlockType::FunctionBody => Priority::Medium,
        BlockType::ModuleLevel => Priority::Low,
    }
}

/// Priority tier for a block type given by name; unknown names are `Low`.
pub fn priority_for_name(name: &str) -> Priority {
    name.parse::<BlockType>()
        .map(priority_for)
        .unwrap_or(Priority::Low)
}
