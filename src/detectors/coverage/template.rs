//! Pytest skeletons for coverage gaps.
//!
//! A [`TemplateSynthesizer`] turns one [`Gap`] into a [`Suggestion`]: a test
//! name derived from the owning scope and block type, and an
//! Arrange/Act/Assert body. Call arguments are never guessed; they are written
//! as the configured placeholder followed by a comment naming the parameters.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use super::config::TemplateConfig;
use super::priority::Priority;
use super::types::{BlockType, Gap, ScopeFrame, ScopeKind, Suggestion};

const INDENT: &str = "    ";

/// Hands out unique test names, in the order requested.
#[derive(Debug, Default)]
pub struct TestNames {
    used: HashSet<String>,
}

impl TestNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// `base` if unused, otherwise the first free `base_2`, `base_3`, ...
    pub fn claim(&mut self, base: String) -> String {
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Builds test names and code templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateSynthesizer {
    config: TemplateConfig,
}

impl TemplateSynthesizer {
    pub fn new(config: TemplateConfig) -> Self {
        Self { config }
    }

    /// Suggestions for the gaps of one file, taken in line order so that
    /// duplicate names are numbered top to bottom.
    pub fn synthesize_file(&self, gaps: &[(Gap, Priority, Vec<String>)]) -> Vec<Suggestion> {
        let mut names = TestNames::new();
        let mut ordered: Vec<&(Gap, Priority, Vec<String>)> = gaps.iter().collect();
        ordered.sort_by_key(|(gap, _, _)| gap.line_start);

        ordered
            .into_iter()
            .map(|(gap, priority, hints)| {
                let name = names.claim(self.base_test_name(gap));
                self.synthesize(gap, *priority, hints.clone(), name)
            })
            .collect()
    }

    /// Suggestion for a single gap under an already chosen test name.
    pub fn synthesize(
        &self,
        gap: &Gap,
        priority: Priority,
        hints: Vec<String>,
        test_name: String,
    ) -> Suggestion {
        let code_template = self.code_template(gap, &test_name, &hints);
        Suggestion {
            file: gap.file.clone(),
            priority,
            block_type: gap.block_type,
            line_start: gap.line_start,
            line_end: gap.line_end,
            owning_function: gap.owning_function.clone(),
            test_name,
            code_template,
            hints,
            covers_lines: gap.missed_lines.iter().copied().collect(),
            description: describe(gap),
        }
    }

    /// `test_<owner-or-module>_<suffix>` before deduplication.
    pub fn base_test_name(&self, gap: &Gap) -> String {
        let subject = gap
            .owning_function
            .as_deref()
            .map(|owner| sanitize(owner, None))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| module_stem(&gap.file));

        let suffix = match gap.block_type {
            BlockType::ExceptionHandler => "handles_exception".to_string(),
            BlockType::Raise => "raises_error".to_string(),
            BlockType::Branch => {
                let (text, polarity) = gap
                    .block
                    .condition
                    .as_ref()
                    .map(|c| (c.text.as_str(), c.polarity))
                    .unwrap_or(("", true));
                let mut fragment = sanitize(text, Some(self.config.condition_fragment_max_len));
                if fragment.is_empty() {
                    fragment = "condition".to_string();
                }
                format!("when_{}_{}", fragment, polarity)
            }
            BlockType::Loop => "covers_loop".to_string(),
            BlockType::FunctionBody | BlockType::ModuleLevel => "is_covered".to_string(),
        };

        format!("test_{subject}_{suffix}")
    }

    fn code_template(&self, gap: &Gap, test_name: &str, hints: &[String]) -> String {
        let owner = gap
            .block
            .owner
            .as_deref()
            .filter(|frame| frame.kind == ScopeKind::Function);

        let mut out = String::new();
        let is_async = owner.is_some_and(|frame| frame.is_async);
        if is_async {
            out.push_str("@pytest.mark.asyncio\nasync ");
        }
        let _ = writeln!(out, "def {test_name}():");
        let _ = writeln!(
            out,
            "{INDENT}\"\"\"Cover {} (lines {}-{}).\"\"\"",
            describe(gap),
            gap.line_start,
            gap.line_end
        );

        match owner {
            Some(frame) => self.function_body(&mut out, gap, frame),
            None => self.module_body(&mut out, gap),
        }

        if self.config.include_hints && !hints.is_empty() {
            out.push('\n');
            for hint in hints {
                let _ = writeln!(out, "{INDENT}# Hint: {hint}");
            }
        }
        out
    }

    fn function_body(&self, out: &mut String, gap: &Gap, frame: &ScopeFrame) {
        let placeholder = &self.config.placeholder;
        let (receiver, callee, parameters) = call_target(frame);

        let _ = writeln!(out, "{INDENT}# Arrange");
        for line in arrange_comments(gap) {
            let _ = writeln!(out, "{INDENT}# {line}");
        }
        if self.config.edge_case_comments
            && matches!(gap.block_type, BlockType::Branch | BlockType::FunctionBody)
            && parameters == frame.parameters
        {
            for parameter in parameters.iter().filter(|p| !p.starts_with('*')) {
                let _ = writeln!(
                    out,
                    "{INDENT}# Edge cases: {parameter}=None, {parameter}=[], {parameter}=''"
                );
            }
        }
        if let Some(class_name) = &receiver {
            let _ = writeln!(
                out,
                "{INDENT}instance = {class_name}({placeholder})  # constructor arguments"
            );
        }
        let target = match &receiver {
            Some(_) => format!("instance.{callee}"),
            None => callee,
        };
        let awaited = if frame.is_async { "await " } else { "" };
        let arguments = if parameters.is_empty() {
            String::new()
        } else {
            placeholder.clone()
        };
        let call = format!("{awaited}{target}({arguments})");
        let call_comment = parameter_comment(&parameters);
        out.push('\n');

        if gap.block_type == BlockType::Raise {
            let exception = gap.block.exception.as_deref().unwrap_or("Exception");
            let _ = writeln!(out, "{INDENT}# Act / Assert");
            let _ = writeln!(out, "{INDENT}with pytest.raises({exception}):");
            let _ = writeln!(out, "{INDENT}{INDENT}{call}{call_comment}");
            return;
        }

        let _ = writeln!(out, "{INDENT}# Act");
        let _ = writeln!(out, "{INDENT}result = {call}{call_comment}");
        out.push('\n');
        let _ = writeln!(out, "{INDENT}# Assert");
        let _ = writeln!(
            out,
            "{INDENT}assert result == {placeholder}  # {}",
            expected_comment(gap)
        );
    }

    fn module_body(&self, out: &mut String, gap: &Gap) {
        let _ = writeln!(out, "{INDENT}# Arrange");
        for line in arrange_comments(gap) {
            let _ = writeln!(out, "{INDENT}# {line}");
        }
        let _ = writeln!(out, "{INDENT}import importlib");
        out.push('\n');
        let _ = writeln!(out, "{INDENT}# Act");
        let _ = writeln!(
            out,
            "{INDENT}module = importlib.import_module(\"{}\")",
            dotted_module(&gap.file)
        );
        out.push('\n');
        let _ = writeln!(out, "{INDENT}# Assert");
        let _ = writeln!(out, "{INDENT}assert module is not None");
    }
}

/// Receiver class (for methods), callable name and parameters of `frame`.
fn call_target(frame: &ScopeFrame) -> (Option<String>, String, Vec<String>) {
    if frame.is_method {
        let class_name = frame.class_name.clone().unwrap_or_else(|| "Subject".to_string());
        return (Some(class_name), frame.name.clone(), frame.parameters.clone());
    }
    match frame.qualified_name.split_once('.') {
        // Nested functions are reached through their outermost enclosing function
        Some((outer, _)) => (
            None,
            outer.to_string(),
            vec![format!("arguments that reach {}", frame.name)],
        ),
        None => (None, frame.name.clone(), frame.parameters.clone()),
    }
}

fn parameter_comment(parameters: &[String]) -> String {
    if parameters.is_empty() {
        String::new()
    } else {
        format!("  # {}", parameters.join(", "))
    }
}

fn arrange_comments(gap: &Gap) -> Vec<String> {
    let block = &gap.block;
    match gap.block_type {
        BlockType::ExceptionHandler => {
            let exception = block.exception.as_deref().unwrap_or("an exception");
            vec![
                format!("Make the guarded code raise {exception}"),
                "e.g. patch a collaborator with side_effect=...".to_string(),
            ]
        }
        BlockType::Raise => vec![format!(
            "Choose inputs that reach the raise on line {}",
            block.line_start
        )],
        BlockType::Branch => match &block.condition {
            Some(condition) => vec![format!(
                "Choose inputs so that `{}` is {}",
                condition.text,
                if condition.polarity { "True" } else { "False" }
            )],
            None => vec!["Choose inputs that take this branch".to_string()],
        },
        BlockType::Loop => match (block.loop_keyword, &block.condition) {
            (Some("while"), Some(condition)) => vec![format!(
                "Set up state so that `{}` holds at least once",
                condition.text
            )],
            _ => vec!["Provide a non-empty iterable so the loop body runs".to_string()],
        },
        BlockType::FunctionBody => vec!["Set up the inputs this function needs".to_string()],
        BlockType::ModuleLevel => {
            vec!["Import the module so its top-level statements run".to_string()]
        }
    }
}

fn expected_comment(gap: &Gap) -> String {
    match (gap.block_type, &gap.block.condition) {
        (BlockType::ExceptionHandler, _) => "expected outcome once the error is handled".into(),
        (BlockType::Branch, Some(condition)) => format!(
            "expected result when `{}` is {}",
            condition.text,
            if condition.polarity { "True" } else { "False" }
        ),
        (BlockType::Loop, _) => "expected result after iterating".into(),
        _ => "expected return value".into(),
    }
}

/// Human-readable one-liner for a gap.
pub fn describe(gap: &Gap) -> String {
    let place = gap
        .owning_function
        .as_deref()
        .map(|owner| format!(" in {owner}"))
        .unwrap_or_default();
    let block = &gap.block;
    match gap.block_type {
        BlockType::ExceptionHandler => match &block.exception {
            Some(exception) => format!("handler for {exception}{place}"),
            None => format!("exception handler{place}"),
        },
        BlockType::Raise => match &block.exception {
            Some(exception) => format!("raise of {exception}{place}"),
            None => format!("re-raise{place}"),
        },
        BlockType::Branch => match &block.condition {
            Some(condition) if condition.polarity => {
                format!("branch where `{}` is true{place}", condition.text)
            }
            Some(condition) => format!("branch where `{}` is false{place}", condition.text),
            None => format!("branch{place}"),
        },
        BlockType::Loop => format!("{} loop body{place}", block.loop_keyword.unwrap_or("loop")),
        BlockType::FunctionBody => format!("body{place}"),
        BlockType::ModuleLevel => "module-level statements".to_string(),
    }
}

/// Lowercase identifier fragment: non-identifier characters become `_`,
/// repeats collapse, and leading/trailing underscores are trimmed. Unicode
/// letters and digits are kept, as Python identifiers allow them. `max_len`
/// counts characters.
pub fn sanitize(text: &str, max_len: Option<usize>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = 0;
    for ch in text.chars().flat_map(char::to_lowercase) {
        let mapped = if ch.is_alphanumeric() { ch } else { '_' };
        if mapped == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        if max_len.is_some_and(|max_len| chars >= max_len) {
            break;
        }
        out.push(mapped);
        chars += 1;
    }
    out.trim_end_matches('_').to_string()
}

/// File stem used as the test subject for module-level gaps. Package
/// `__init__` files use their directory name.
pub fn module_stem(file: &str) -> String {
    let path = Path::new(file);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("module");
    let stem = if stem == "__init__" {
        path.parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or("package")
    } else {
        stem
    };
    let sanitized = sanitize(stem, None);
    if sanitized.is_empty() {
        "module".to_string()
    } else {
        sanitized
    }
}

/// Dotted import path for a report path (`src/pkg/mod.py` gives `pkg.mod`).
pub fn dotted_module(file: &str) -> String {
    let normalized = file.replace('\\', "/");
    let trimmed = normalized
        .trim_start_matches("./")
        .trim_start_matches('/')
        .trim_end_matches(".py");
    let trimmed = trimmed.strip_prefix("src/").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("/__init__").unwrap_or(trimmed);
    trimmed
        .split('/')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}
