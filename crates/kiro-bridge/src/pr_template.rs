use std::fmt::Write as _;

use kiro_bridge_core::{TaskNumber, TaskRecord};

use crate::sections::{extract_acceptance_criteria, extract_testing_requirements};

/// Number and title used for the repository-wide template.
pub const GENERIC_TASK: (&str, &str) = ("X", "Feature Implementation");

/// Checklist inputs for a PR description template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateInputs {
    pub acceptance_criteria: Vec<String>,
    pub testing_requirements: Vec<String>,
}

impl TemplateInputs {
    pub fn from_documents(requirements: &str, design: &str) -> Self {
        Self {
            acceptance_criteria: extract_acceptance_criteria(requirements),
            testing_requirements: extract_testing_requirements(design),
        }
    }
}

fn checklist(out: &mut String, items: &[String]) {
    for item in items {
        let _ = writeln!(out, "- [ ] {item}");
    }
}

/// Markdown PR template for one task, with placeholders for the issue and
/// epic numbers.
pub fn render_pr_template(task_number: &str, task_title: &str, inputs: &TemplateInputs) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "## Pull Request: Task {task_number} - {task_title}

### Description
Brief description of the changes implemented in this PR.

### Related Issues
- Resolves #[ISSUE_NUMBER]
- Related to Epic #[EPIC_NUMBER]

### Changes Made
- [ ] Component implementation
- [ ] Service implementation
- [ ] Template updates
- [ ] Styling updates
- [ ] API integration
- [ ] Tests added

### Acceptance Criteria Validation
"
    );
    checklist(&mut out, &inputs.acceptance_criteria);

    out.push_str("\n### Testing Requirements\n");
    checklist(&mut out, &inputs.testing_requirements);

    out.push_str(
        "
### Code Quality Checklist
- [ ] Code follows project standards
- [ ] No debug logging left in code
- [ ] Error handling implemented
- [ ] Loading states implemented
- [ ] Accessibility considerations addressed
- [ ] Types properly defined
- [ ] Comments added where necessary

### Testing Completed
- [ ] Unit tests pass
- [ ] Integration tests pass
- [ ] Manual testing completed
- [ ] Cross-browser testing (if applicable)
- [ ] Mobile responsive testing (if applicable)

### Performance Considerations
- [ ] No performance regressions identified
- [ ] Large file handling considered
- [ ] Memory leaks checked

### Security Considerations
- [ ] Input validation implemented
- [ ] XSS prevention measures
- [ ] File upload security (if applicable)
- [ ] Permission checks implemented

### Screenshots/Demo
<!-- Add screenshots or GIF demos of the functionality -->

### Deployment Notes
<!-- Any special deployment considerations -->

### Review Request
- [ ] Code review requested
- [ ] Design review requested (if applicable)
- [ ] Security review requested (if applicable)
",
    );
    out
}

/// The parsed task whose ordinal matches `number` (leading zeros ignored).
pub fn find_task<'a>(tasks: &'a [TaskRecord], number: &TaskNumber) -> Option<&'a TaskRecord> {
    tasks
        .iter()
        .find(|t| TaskNumber::parse_str(&t.number).as_ref() == Some(number))
}
