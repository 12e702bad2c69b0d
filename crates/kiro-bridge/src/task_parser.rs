use std::path::Path;

use kiro_bridge_core::task::REQUIREMENTS_NOT_SPECIFIED;
use kiro_bridge_core::TaskRecord;
use tracing::warn;

/// Extract task records from a tasks document.
///
/// Looks for checklist blocks in this format:
/// ```markdown
/// - [ ] 1. Set up project structure
///   Create the module layout and wire the entry point.
///   _Requirements: 1.1, 2.3_
///
/// - [x] 2. Add validation
/// ```
/// A block runs from its marker to the next marker, the next blank line,
/// an unindented checklist item that is not a task, or the end of the text.
pub fn parse_tasks(content: &str) -> Vec<TaskRecord> {
    let mut tasks = Vec::new();
    let mut current: Option<TaskBlock> = None;

    for line in content.lines() {
        match classify(line) {
            Line::Marker {
                completed,
                number,
                title,
            } => {
                if let Some(block) = current.take() {
                    tasks.push(block.finish());
                }
                current = Some(TaskBlock::open(number, completed, title));
            }
            Line::Blank | Line::OtherChecklist => {
                if let Some(block) = current.take() {
                    tasks.push(block.finish());
                }
            }
            Line::Requirements(value) => {
                if let Some(block) = current.as_mut() {
                    block.requirements = Some(value.to_string());
                }
            }
            Line::Underscored => {}
            Line::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.push_text(text);
                }
            }
        }
    }

    // Flush trailing block (document ended without a blank line)
    if let Some(block) = current.take() {
        tasks.push(block.finish());
    }

    tasks
}

/// Read and parse a tasks document. A missing or unreadable file yields an
/// empty list.
pub fn parse_tasks_file(path: &Path) -> Vec<TaskRecord> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_tasks(&content),
        Err(e) => {
            warn!("could not read tasks file {}: {e}", path.display());
            Vec::new()
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    /// `- [ ] N. Title` / `- [x] N. Title`
    Marker {
        completed: bool,
        number: &'a str,
        title: &'a str,
    },
    Blank,
    /// A checklist item at column 0 that is not a numbered task, e.g. `- [ ] 1.1 Sub`.
    OtherChecklist,
    /// `_Requirements: 1.1, 2.3_`, value already stripped.
    Requirements(&'a str),
    /// Any other `_..._` annotation.
    Underscored,
    Text(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }

    if let Some(marker) = parse_marker(trimmed) {
        return marker;
    }

    if !line.starts_with(char::is_whitespace) && trimmed.starts_with("- [") {
        return Line::OtherChecklist;
    }

    let unbulleted = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .unwrap_or(trimmed);
    if let Some(value) = unbulleted.strip_prefix("_Requirements:") {
        let value = value.trim().trim_end_matches('_').trim();
        return Line::Requirements(value);
    }

    if trimmed.starts_with('_') {
        return Line::Underscored;
    }

    Line::Text(trimmed)
}

fn parse_marker(trimmed: &str) -> Option<Line<'_>> {
    let rest = trimmed.strip_prefix("- [")?;
    let mut chars = rest.chars();
    let completed = match chars.next()? {
        ' ' => false,
        'x' | 'X' => true,
        _ => return None,
    };
    let rest = chars.as_str().strip_prefix(']')?;
    let rest = rest.trim_start();

    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let (number, rest) = rest.split_at(digits_end);
    let rest = rest.strip_prefix('.')?;
    // `1.1 Sub-step` is a nested checklist entry, not a task marker.
    if !(rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        return None;
    }

    Some(Line::Marker {
        completed,
        number,
        title: rest.trim(),
    })
}

struct TaskBlock {
    number: String,
    completed: bool,
    title: Option<String>,
    description: Vec<String>,
    requirements: Option<String>,
}

impl TaskBlock {
    fn open(number: &str, completed: bool, title: &str) -> Self {
        Self {
            number: number.to_string(),
            completed,
            title: (!title.is_empty()).then(|| title.to_string()),
            description: Vec::new(),
            requirements: None,
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.title.is_none() {
            self.title = Some(text.to_string());
        } else {
            self.description.push(text.to_string());
        }
    }

    fn finish(self) -> TaskRecord {
        TaskRecord {
            number: self.number,
            title: self.title.unwrap_or_default(),
            description: self.description.join("\n"),
            requirements: self
                .requirements
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| REQUIREMENTS_NOT_SPECIFIED.to_string()),
            completed: self.completed,
        }
    }
}
