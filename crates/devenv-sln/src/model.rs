//! Solution document model

use std::collections::BTreeSet;

use uuid::Uuid;

/// Project type id of a classic C# project.
pub const CSHARP_PROJECT_TYPE: &str = "{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}";
/// Project type id of an SDK-style C# project.
pub const SDK_CSHARP_PROJECT_TYPE: &str = "{9A19103F-16F7-4668-BE54-9A1E7A4F7556}";
/// Project type id of a web site project.
pub const WEBSITE_PROJECT_TYPE: &str = "{E24C65DC-7377-472B-9ABA-BC803B73C61A}";
/// Project type id of a solution folder.
pub const SOLUTION_FOLDER_TYPE: &str = "{2150E333-8FDC-42A3-9474-1A3956D46DE8}";

pub(crate) const SOLUTION_CONFIGURATIONS: &str = "SolutionConfigurationPlatforms";
pub(crate) const PROJECT_CONFIGURATIONS: &str = "ProjectConfigurationPlatforms";
pub(crate) const NESTED_PROJECTS: &str = "NestedProjects";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    CrLf,
    Lf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::CrLf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }
}

/// Formatting conventions carried from parse to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionFormat {
    /// Sections whose values are wrapped in double quotes.
    pub quoted_sections: BTreeSet<String>,
    pub line_ending: LineEnding,
    /// Leading UTF-8 byte order mark.
    pub bom: bool,
    pub trailing_newline: bool,
}

impl Default for SolutionFormat {
    fn default() -> Self {
        Self {
            quoted_sections: ["WebsiteProperties".to_string()].into_iter().collect(),
            line_ending: LineEnding::CrLf,
            bom: true,
            trailing_newline: true,
        }
    }
}

impl SolutionFormat {
    pub fn is_quoted(&self, section: &str) -> bool {
        self.quoted_sections.contains(section)
    }
}

/// One `key = value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    /// Value with any surrounding quotes removed.
    pub value: String,
    /// How the line was spelled on disk. `None` for entries created in
    /// memory, which follow the section's convention.
    pub layout: Option<EntryLayout>,
}

/// Spelling of a parsed entry line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLayout {
    /// `=` with its surrounding whitespace, e.g. `" = "` or `"="`.
    pub separator: String,
    pub quoted: bool,
}

impl Entry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            layout: None,
        }
    }
}

/// A `ProjectSection(...)` or `GlobalSection(...)` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    /// `preProject`, `postSolution` and so on, kept verbatim.
    pub location: String,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub type_id: String,
    pub name: String,
    /// Path relative to the solution, backslash-separated as written.
    pub path: String,
    pub id: String,
    pub sections: Vec<Section>,
}

impl Project {
    pub fn new(
        type_id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            name: name.into(),
            path: path.into(),
            id: id.into(),
            sections: Vec::new(),
        }
    }

    /// A project with a fresh upper-case braced GUID.
    pub fn with_new_id(
        type_id: impl Into<String>,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let id = format!("{{{}}}", Uuid::new_v4()).to_uppercase();
        Self::new(type_id, name, path, id)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

/// A parsed solution file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Solution {
    /// Lines before the first block, verbatim.
    pub header: Vec<String>,
    pub projects: Vec<Project>,
    /// Sections of the `Global` block, if the file has one.
    pub global: Option<Vec<Section>>,
    pub format: SolutionFormat,
}

impl Solution {
    /// Find a project by name (case-insensitive) or by id.
    pub fn find_project(&self, name_or_id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| matches(p, name_or_id))
    }

    pub fn global_section(&self, name: &str) -> Option<&Section> {
        self.global.as_ref()?.iter().find(|s| s.name == name)
    }

    fn global_section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.global.as_mut()?.iter_mut().find(|s| s.name == name)
    }

    /// Append `project`, adding build entries for every solution configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateProject`](crate::Error::DuplicateProject) if a
    /// project with the same name or id exists.
    pub fn add_project(&mut self, project: Project) -> crate::Result<()> {
        if self.find_project(&project.name).is_some() || self.find_project(&project.id).is_some() {
            return Err(crate::Error::DuplicateProject { name: project.name });
        }

        let configurations: Vec<String> = self
            .global_section(SOLUTION_CONFIGURATIONS)
            .map(|s| s.entries.iter().map(|e| e.key.clone()).collect())
            .unwrap_or_default();
        let buildable = project.type_id != SOLUTION_FOLDER_TYPE;
        if buildable && let Some(section) = self.global_section_mut(PROJECT_CONFIGURATIONS) {
            for config in &configurations {
                section.entries.push(Entry::new(
                    format!("{}.{config}.ActiveCfg", project.id),
                    config.as_str(),
                ));
                section.entries.push(Entry::new(
                    format!("{}.{config}.Build.0", project.id),
                    config.as_str(),
                ));
            }
        }

        tracing::debug!(name = %project.name, id = %project.id, "Added project");
        self.projects.push(project);
        Ok(())
    }

    /// Remove a project with every global entry that refers to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProjectNotFound`](crate::Error::ProjectNotFound) if no
    /// project matches.
    pub fn remove_project(&mut self, name_or_id: &str) -> crate::Result<Project> {
        let index = self
            .projects
            .iter()
            .position(|p| matches(p, name_or_id))
            .ok_or_else(|| crate::Error::ProjectNotFound {
                name: name_or_id.to_string(),
            })?;
        let project = self.projects.remove(index);

        if let Some(sections) = self.global.as_mut() {
            let prefix = format!("{}.", project.id);
            for section in sections.iter_mut() {
                match section.name.as_str() {
                    PROJECT_CONFIGURATIONS => {
                        section.entries.retain(|e| !e.key.starts_with(&prefix))
                    }
                    NESTED_PROJECTS => section
                        .entries
                        .retain(|e| e.key != project.id && e.value != project.id),
                    _ => {}
                }
            }
        }

        tracing::debug!(name = %project.name, id = %project.id, "Removed project");
        Ok(project)
    }
}

fn matches(project: &Project, name_or_id: &str) -> bool {
    project.name.eq_ignore_ascii_case(name_or_id) || project.id.eq_ignore_ascii_case(name_or_id)
}
