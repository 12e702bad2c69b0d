use std::path::Path;

use tracing::warn;

/// Returned when the start marker does not occur in the document.
pub const SECTION_PLACEHOLDER: &str = "See attached document";

/// Excerpt length (in characters) when no end marker bounds the section.
pub const EXCERPT_LIMIT: usize = 500;

/// Start/end markers for a named section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionMarkers {
    pub start: &'static str,
    pub end: Option<&'static str>,
}

pub const REQUIREMENTS_SUMMARY: SectionMarkers = SectionMarkers {
    start: "## Requirements",
    end: Some("### Requirement 1"),
};

pub const ARCHITECTURE_OVERVIEW: SectionMarkers = SectionMarkers {
    start: "## Architecture",
    end: Some("### Component Structure"),
};

/// Return the trimmed text between `start` and `end`.
///
/// Without an end marker (or when it does not follow the start marker) the
/// result is the first [`EXCERPT_LIMIT`] characters after `start`.
pub fn extract_section(content: &str, start: &str, end: Option<&str>) -> String {
    let Some(idx) = content.find(start) else {
        return SECTION_PLACEHOLDER.to_string();
    };
    let after = &content[idx + start.len()..];

    if let Some(end_idx) = end.and_then(|end| after.find(end)) {
        return after[..end_idx].trim().to_string();
    }

    let cut = after
        .char_indices()
        .nth(EXCERPT_LIMIT)
        .map(|(i, _)| i)
        .unwrap_or(after.len());
    after[..cut].trim().to_string()
}

pub fn extract_named(content: &str, markers: SectionMarkers) -> String {
    extract_section(content, markers.start, markers.end)
}

/// Read a document and extract a section from it. Unreadable documents
/// produce the placeholder.
pub fn read_section(path: &Path, markers: SectionMarkers) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => extract_named(&content, markers),
        Err(e) => {
            warn!("could not read {}: {e}", path.display());
            SECTION_PLACEHOLDER.to_string()
        }
    }
}

/// Collect numbered acceptance criteria from every `#### Acceptance Criteria`
/// block of a requirements document, numbering stripped.
pub fn extract_acceptance_criteria(requirements: &str) -> Vec<String> {
    let mut criteria = Vec::new();
    let mut in_criteria = false;

    for line in requirements.lines() {
        let trimmed = line.trim();

        if trimmed == "#### Acceptance Criteria" {
            in_criteria = true;
            continue;
        }

        // A requirement or top-level heading closes the block
        if trimmed.starts_with("## ") || trimmed.starts_with("### ") {
            in_criteria = false;
            continue;
        }

        if !in_criteria {
            continue;
        }

        if let Some(text) = strip_numbering(trimmed) {
            criteria.push(text.to_string());
        }
    }

    criteria
}

fn strip_numbering(line: &str) -> Option<&str> {
    let digits_end = line.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let rest = line[digits_end..].strip_prefix('.')?;
    let text = rest.trim_start();
    (!text.is_empty()).then_some(text)
}

/// Which kinds of tests the design's `## Testing Strategy` section asks for.
pub fn extract_testing_requirements(design: &str) -> Vec<String> {
    const KINDS: [(&str, &str); 3] = [
        ("### Unit Tests", "Unit Tests Required"),
        ("### Integration Tests", "Integration Tests Required"),
        ("### E2E Tests", "E2E Tests Required"),
    ];

    let mut found = [false; 3];
    let mut in_strategy = false;

    for line in design.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("## Testing Strategy") {
            in_strategy = true;
            continue;
        }
        if in_strategy && (trimmed.starts_with("## ") || trimmed.starts_with("# ")) {
            in_strategy = false;
            continue;
        }
        if !in_strategy {
            continue;
        }
        for (i, (heading, _)) in KINDS.iter().enumerate() {
            if trimmed.starts_with(heading) {
                found[i] = true;
            }
        }
    }

    KINDS
        .iter()
        .zip(found)
        .filter(|(_, hit)| *hit)
        .map(|((_, label), _)| label.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_between_markers() {
        let doc = "## Requirements\nContent here\n### Requirement 1";
        assert_eq!(
            extract_section(doc, "## Requirements", Some("### Requirement 1")),
            "Content here"
        );
    }

    #[test]
    fn missing_start_marker_is_placeholder() {
        assert_eq!(
            extract_section("# Nothing", "## Architecture", None),
            SECTION_PLACEHOLDER
        );
    }

    #[test]
    fn missing_end_marker_takes_bounded_excerpt() {
        let body = "a".repeat(800);
        let doc = format!("## Architecture\n{body}");
        let excerpt = extract_section(&doc, "## Architecture", Some("### Component Structure"));
        // newline + 499 chars fit in the window, then trimming drops the newline
        assert_eq!(excerpt.chars().count(), EXCERPT_LIMIT - 1);
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        let body = "é".repeat(600);
        let doc = format!("## Requirements{body}");
        let excerpt = extract_section(&doc, "## Requirements", None);
        assert_eq!(excerpt.chars().count(), EXCERPT_LIMIT);
    }

    #[test]
    fn end_marker_before_start_is_ignored() {
        let doc = "### Requirement 1\n## Requirements\nshort";
        assert_eq!(
            extract_named(doc, REQUIREMENTS_SUMMARY),
            "short"
        );
    }

    #[test]
    fn read_section_missing_file() {
        assert_eq!(
            read_section(Path::new("/nonexistent/design.md"), ARCHITECTURE_OVERVIEW),
            SECTION_PLACEHOLDER
        );
    }

    #[test]
    fn acceptance_criteria_from_all_requirements() {
        let doc = r#"## Requirements

### Requirement 1

**User Story:** As a user, I want to upload files.

#### Acceptance Criteria

1. WHEN a file is dropped THEN the system SHALL upload it
2. WHEN upload fails THEN the system SHALL show an error

### Requirement 2

#### Acceptance Criteria

1. WHEN a file is selected THEN the action bar SHALL appear
Some prose that is not a criterion.
"#;
        let criteria = extract_acceptance_criteria(doc);
        assert_eq!(
            criteria,
            vec![
                "WHEN a file is dropped THEN the system SHALL upload it",
                "WHEN upload fails THEN the system SHALL show an error",
                "WHEN a file is selected THEN the action bar SHALL appear",
            ]
        );
    }

    #[test]
    fn criteria_outside_block_ignored() {
        let doc = "## Intro\n1. Not a criterion\n";
        assert!(extract_acceptance_criteria(doc).is_empty());
    }

    #[test]
    fn testing_requirements_from_strategy() {
        let doc = r#"# Design

## Testing Strategy

### Unit Tests
- services

### E2E Tests
- flows

## Deployment

### Integration Tests
"#;
        assert_eq!(
            extract_testing_requirements(doc),
            vec!["Unit Tests Required", "E2E Tests Required"]
        );
    }

    #[test]
    fn no_testing_strategy() {
        assert!(extract_testing_requirements("## Architecture\n### Unit Tests\n").is_empty());
    }
}
