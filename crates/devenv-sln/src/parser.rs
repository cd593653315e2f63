//! Line-oriented solution parser
//!
//! Block nesting is tracked on an explicit stack of typed frames:
//!
//! ```text
//! Project("{TYPE}") = "Name", "Path", "{ID}"     push Project
//! 	ProjectSection(Name) = location               push Section
//! 		key = value                               entry
//! 	EndProjectSection                             pop Section
//! EndProject                                        pop Project
//! Global                                            push Global
//! 	GlobalSection(Name) = location                push Section
//! 	EndGlobalSection                              pop Section
//! EndGlobal                                         pop Global
//! ```
//!
//! Lines before the first block are kept verbatim as the header. Blank lines
//! between blocks are dropped. Anything else is a parse error.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{
    Entry, EntryLayout, LineEnding, Project, Section, Solution, SolutionFormat,
};
use crate::{Error, Result};

static PROJECT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^Project\("([^"]*)"\)\s*=\s*"([^"]*)"\s*,\s*"([^"]*)"\s*,\s*"([^"]*)"$"#)
        .expect("Invalid project regex")
});

static SECTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Project|Global)Section\(([^)]*)\)\s*=\s*(\S+)$").expect("Invalid section regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Project,
    Global,
}

impl SectionKind {
    fn end_marker(self) -> &'static str {
        match self {
            SectionKind::Project => "EndProjectSection",
            SectionKind::Global => "EndGlobalSection",
        }
    }
}

enum Frame {
    Project(Project),
    Global(Vec<Section>),
    Section(SectionKind, Section),
}

impl Frame {
    fn describe(&self) -> &'static str {
        match self {
            Frame::Project(_) => "Project",
            Frame::Global(_) => "Global",
            Frame::Section(SectionKind::Project, _) => "ProjectSection",
            Frame::Section(SectionKind::Global, _) => "GlobalSection",
        }
    }
}

/// Parse with the default quoted sections.
pub fn parse(text: &str) -> Result<Solution> {
    parse_with(text, SolutionFormat::default().quoted_sections)
}

/// Parse, unquoting the values of `quoted_sections`.
///
/// Line ending, byte order mark and trailing newline are detected from `text`
/// and carried on the returned [`Solution`] so it writes back the same way.
pub fn parse_with(
    text: &str,
    quoted_sections: impl IntoIterator<Item = impl Into<String>>,
) -> Result<Solution> {
    let (body, bom) = match text.strip_prefix('\u{feff}') {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    let format = SolutionFormat {
        quoted_sections: quoted_sections.into_iter().map(Into::into).collect(),
        line_ending: if body.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        },
        bom,
        trailing_newline: body.ends_with('\n'),
    };

    let mut solution = Solution {
        format,
        ..Solution::default()
    };
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_header = true;
    let mut last_line = 0;

    for (index, raw) in body.lines().enumerate() {
        let line_number = index + 1;
        last_line = line_number;
        let line = raw.trim();

        if in_header && !is_block_start(line) {
            solution.header.push(raw.to_string());
            continue;
        }
        in_header = false;

        if line.is_empty() {
            continue;
        }

        match stack.pop() {
            None => {
                if let Some(caps) = PROJECT_LINE.captures(line) {
                    let project = Project::new(&caps[1], &caps[2], &caps[3], &caps[4]);
                    stack.push(Frame::Project(project));
                } else if line == "Global" {
                    if solution.global.is_some() {
                        return Err(Error::parse(line_number, raw, "second Global block"));
                    }
                    stack.push(Frame::Global(Vec::new()));
                } else {
                    return Err(Error::parse(line_number, raw, "expected Project or Global"));
                }
            }
            Some(Frame::Project(project)) => {
                if line == "EndProject" {
                    solution.projects.push(project);
                } else {
                    let section = section_header(line, SectionKind::Project, line_number, raw)?;
                    stack.push(Frame::Project(project));
                    stack.push(Frame::Section(SectionKind::Project, section));
                }
            }
            Some(Frame::Global(sections)) => {
                if line == "EndGlobal" {
                    solution.global = Some(sections);
                } else {
                    let section = section_header(line, SectionKind::Global, line_number, raw)?;
                    stack.push(Frame::Global(sections));
                    stack.push(Frame::Section(SectionKind::Global, section));
                }
            }
            Some(Frame::Section(kind, mut section)) => {
                if line == kind.end_marker() {
                    match stack.last_mut() {
                        Some(Frame::Project(project)) => project.sections.push(section),
                        Some(Frame::Global(sections)) => sections.push(section),
                        _ => return Err(Error::parse(line_number, raw, "section outside a block")),
                    }
                } else {
                    let quoted = solution.format.is_quoted(&section.name);
                    section.entries.push(entry(line, quoted, line_number, raw)?);
                    stack.push(Frame::Section(kind, section));
                }
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::parse(
            last_line,
            body.lines().last().unwrap_or_default(),
            format!("unterminated {} block", open.describe()),
        ));
    }

    tracing::debug!(
        projects = solution.projects.len(),
        global = solution.global.is_some(),
        "Parsed solution"
    );
    Ok(solution)
}

fn is_block_start(line: &str) -> bool {
    line == "Global" || line.starts_with("Project(")
}

fn section_header(
    line: &str,
    expected: SectionKind,
    line_number: usize,
    raw: &str,
) -> Result<Section> {
    let kind = match SECTION_LINE.captures(line) {
        Some(caps) => {
            let kind = if &caps[1] == "Project" {
                SectionKind::Project
            } else {
                SectionKind::Global
            };
            if kind == expected {
                return Ok(Section::new(&caps[2], &caps[3]));
            }
            kind
        }
        None => {
            let message = match expected {
                SectionKind::Project => "expected ProjectSection or EndProject",
                SectionKind::Global => "expected GlobalSection or EndGlobal",
            };
            return Err(Error::parse(line_number, raw, message));
        }
    };
    let message = match kind {
        SectionKind::Project => "ProjectSection inside Global",
        SectionKind::Global => "GlobalSection inside Project",
    };
    Err(Error::parse(line_number, raw, message))
}

fn entry(line: &str, quoted: bool, line_number: usize, raw: &str) -> Result<Entry> {
    let (at, width) = line
        .find(" = ")
        .map(|i| (i, 3))
        .or_else(|| line.find('=').map(|i| (i, 1)))
        .ok_or_else(|| Error::parse(line_number, raw, "expected 'key = value'"))?;
    let (key_raw, rest) = line.split_at(at);
    let (eq, value_raw) = rest.split_at(width);

    let key = key_raw.trim_end();
    if key.is_empty() {
        return Err(Error::parse(line_number, raw, "empty key"));
    }
    let value = value_raw.trim_start();
    let separator = format!(
        "{}{}{}",
        &key_raw[key.len()..],
        eq,
        &value_raw[..value_raw.len() - value.len()]
    );

    let unquoted = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .filter(|_| quoted);
    Ok(Entry {
        key: key.to_string(),
        value: unquoted.unwrap_or(value).to_string(),
        layout: Some(EntryLayout {
            separator,
            quoted: unquoted.is_some(),
        }),
    })
}
