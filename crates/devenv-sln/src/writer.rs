//! Solution writer
//!
//! Each nesting level indents by one tab. Parsed entries are written back
//! as they were spelled; new entries in quoted sections are wrapped in
//! double quotes.

use std::fmt::{self, Write};
use std::path::Path;

use devenv_fs::io;

use crate::Result;
use crate::model::{Section, Solution};

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = self.header.clone();

        for project in &self.projects {
            lines.push(format!(
                "Project(\"{}\") = \"{}\", \"{}\", \"{}\"",
                project.type_id, project.name, project.path, project.id
            ));
            for section in &project.sections {
                self.write_section(&mut lines, "Project", section);
            }
            lines.push("EndProject".to_string());
        }

        if let Some(sections) = &self.global {
            lines.push("Global".to_string());
            for section in sections {
                self.write_section(&mut lines, "Global", section);
            }
            lines.push("EndGlobal".to_string());
        }

        if self.format.bom {
            f.write_char('\u{feff}')?;
        }
        let eol = self.format.line_ending.as_str();
        f.write_str(&lines.join(eol))?;
        if self.format.trailing_newline && !lines.is_empty() {
            f.write_str(eol)?;
        }
        Ok(())
    }
}

impl Solution {
    fn write_section(&self, lines: &mut Vec<String>, prefix: &str, section: &Section) {
        lines.push(format!(
            "\t{prefix}Section({}) = {}",
            section.name, section.location
        ));
        let quoted = self.format.is_quoted(&section.name);
        for entry in &section.entries {
            let (separator, quoted) = match &entry.layout {
                Some(layout) => (layout.separator.as_str(), layout.quoted),
                None => (" = ", quoted),
            };
            if quoted {
                lines.push(format!("\t\t{}{separator}\"{}\"", entry.key, entry.value));
            } else {
                lines.push(format!("\t\t{}{separator}{}", entry.key, entry.value));
            }
        }
        lines.push(format!("\tEnd{prefix}Section"));
    }

    /// Write the solution to `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        io::write_atomic(path, self.to_string().as_bytes())?;
        tracing::debug!(path = %path.display(), "Saved solution");
        Ok(())
    }
}

/// Read and parse a solution file.
pub fn load(path: &Path) -> Result<Solution> {
    let text = io::read_text(path)?;
    crate::parser::parse(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entry, LineEnding, Project, SolutionFormat};
    use pretty_assertions::assert_eq;

    fn lf() -> SolutionFormat {
        SolutionFormat {
            line_ending: LineEnding::Lf,
            bom: false,
            ..SolutionFormat::default()
        }
    }

    #[test]
    fn writes_tab_indented_blocks() {
        let mut project = Project::new("{T}", "RockWeb", "RockWeb\\", "{1}");
        let mut section = Section::new("WebsiteProperties", "preProject");
        section
            .entries
            .push(Entry::new("TargetFrameworkMoniker", ".NETFramework,Version%3Dv4.7.2"));
        project.sections.push(section);

        let mut config = Section::new("SolutionProperties", "preSolution");
        config.entries.push(Entry::new("HideSolutionNode", "FALSE"));

        let solution = Solution {
            header: vec!["Microsoft Visual Studio Solution File, Format Version 12.00".into()],
            projects: vec![project],
            global: Some(vec![config]),
            format: lf(),
        };

        assert_eq!(
            solution.to_string(),
            "Microsoft Visual Studio Solution File, Format Version 12.00\n\
             Project(\"{T}\") = \"RockWeb\", \"RockWeb\\\", \"{1}\"\n\
             \tProjectSection(WebsiteProperties) = preProject\n\
             \t\tTargetFrameworkMoniker = \".NETFramework,Version%3Dv4.7.2\"\n\
             \tEndProjectSection\n\
             EndProject\n\
             Global\n\
             \tGlobalSection(SolutionProperties) = preSolution\n\
             \t\tHideSolutionNode = FALSE\n\
             \tEndGlobalSection\n\
             EndGlobal\n"
        );
    }

    #[test]
    fn bom_and_crlf_are_written() {
        let solution = Solution {
            header: vec!["".into()],
            global: Some(vec![]),
            ..Solution::default()
        };
        assert_eq!(solution.to_string(), "\u{feff}\r\nGlobal\r\nEndGlobal\r\n");
    }

    #[test]
    fn save_and_load() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("Rock.sln");
        let mut solution = Solution {
            global: Some(vec![]),
            ..Solution::default()
        };
        solution.projects.push(Project::new("{T}", "A", "A\\A.csproj", "{1}"));
        solution.save(&path).unwrap();
        assert_eq!(load(&path).unwrap(), solution);
    }
}
