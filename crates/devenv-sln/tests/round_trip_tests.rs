//! Round-trip behavior on a realistic solution file.

use devenv_sln::{CSHARP_PROJECT_TYPE, Entry, Error, Project, SOLUTION_FOLDER_TYPE, parse};
use pretty_assertions::assert_eq;

const ROCK_SLN: &str = "\u{feff}\r
Microsoft Visual Studio Solution File, Format Version 12.00\r
# Visual Studio Version 17\r
VisualStudioVersion = 17.0.31903.59\r
MinimumVisualStudioVersion = 10.0.40219.1\r
Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"Rock\", \"Rock\\Rock.csproj\", \"{185A31D7-3037-4DAE-8797-0459849A84BD}\"\r
EndProject\r
Project(\"{E24C65DC-7377-472B-9ABA-BC803B73C61A}\") = \"RockWeb\", \"RockWeb\\\", \"{1F9E2A5C-0000-4000-8000-000000000001}\"\r
\tProjectSection(WebsiteProperties) = preProject\r
\t\tTargetFrameworkMoniker = \".NETFramework,Version%3Dv4.7.2\"\r
\t\tDebug.AspNetCompiler.VirtualPath = \"/RockWeb\"\r
\tEndProjectSection\r
\tProjectSection(ProjectDependencies) = postProject\r
\t\t{185A31D7-3037-4DAE-8797-0459849A84BD} = {185A31D7-3037-4DAE-8797-0459849A84BD}\r
\tEndProjectSection\r
EndProject\r
Project(\"{2150E333-8FDC-42A3-9474-1A3956D46DE8}\") = \"Plugins\", \"Plugins\", \"{AAAA0000-0000-4000-8000-000000000002}\"\r
EndProject\r
Global\r
\tGlobalSection(SolutionConfigurationPlatforms) = preSolution\r
\t\tDebug|Any CPU = Debug|Any CPU\r
\t\tRelease|Any CPU = Release|Any CPU\r
\tEndGlobalSection\r
\tGlobalSection(ProjectConfigurationPlatforms) = postSolution\r
\t\t{185A31D7-3037-4DAE-8797-0459849A84BD}.Debug|Any CPU.ActiveCfg = Debug|Any CPU\r
\t\t{185A31D7-3037-4DAE-8797-0459849A84BD}.Debug|Any CPU.Build.0 = Debug|Any CPU\r
\tEndGlobalSection\r
\tGlobalSection(TeamFoundationVersionControl) = preSolution\r
\t\tSccNumberOfProjects = 2\r
\t\tSccLocalPath0 = .\r
\tEndGlobalSection\r
\tGlobalSection(NestedProjects) = preSolution\r
\tEndGlobalSection\r
EndGlobal\r
";

#[test]
fn unmodified_file_round_trips_exactly() {
    let solution = parse(ROCK_SLN).unwrap();
    assert_eq!(solution.to_string(), ROCK_SLN);
}

#[test]
fn hand_edited_entries_round_trip_unchanged() {
    let text = "Project(\"{E24C65DC-7377-472B-9ABA-BC803B73C61A}\") = \"RockWeb\", \"RockWeb\\\", \"{1}\"\n\
                \tProjectSection(WebsiteProperties) = preProject\n\
                \t\tDebug.AspNetCompiler.VirtualPath = /RockWeb\n\
                \t\tDebug.AspNetCompiler.Debug=\"True\"\n\
                \tEndProjectSection\n\
                EndProject\n\
                Global\n\
                \tGlobalSection(ExtensibilityGlobals) = postSolution\n\
                \t\tSolutionGuid=a=b\n\
                \tEndGlobalSection\n\
                EndGlobal\n";
    let mut solution = parse(text).unwrap();
    assert_eq!(solution.to_string(), text);

    let section = solution.projects[0].section("WebsiteProperties").unwrap();
    assert_eq!(section.get("Debug.AspNetCompiler.VirtualPath"), Some("/RockWeb"));
    assert_eq!(section.get("Debug.AspNetCompiler.Debug"), Some("True"));

    solution.projects[0].sections[0]
        .entries
        .push(Entry::new("Debug.AspNetCompiler.PhysicalPath", "RockWeb\\"));
    assert!(
        solution
            .to_string()
            .contains("\t\tDebug.AspNetCompiler.PhysicalPath = \"RockWeb\\\"\n")
    );
}

#[test]
fn unknown_section_survives_add_and_remove() {
    let mut solution = parse(ROCK_SLN).unwrap();
    solution
        .add_project(Project::new(
            CSHARP_PROJECT_TYPE,
            "com.spark.Checkin",
            "Plugins\\com.spark.Checkin\\com.spark.Checkin.csproj",
            "{BBBB0000-0000-4000-8000-000000000003}",
        ))
        .unwrap();
    let written = solution.to_string();
    assert!(written.contains("\tGlobalSection(TeamFoundationVersionControl) = preSolution\r\n\t\tSccNumberOfProjects = 2\r\n\t\tSccLocalPath0 = .\r\n\tEndGlobalSection\r\n"));
    assert!(written.contains(
        "{BBBB0000-0000-4000-8000-000000000003}.Release|Any CPU.Build.0 = Release|Any CPU"
    ));

    let mut reparsed = parse(&written).unwrap();
    reparsed.remove_project("com.spark.Checkin").unwrap();
    assert_eq!(reparsed.to_string(), ROCK_SLN);
}

#[test]
fn removing_a_project_drops_its_configuration_entries() {
    let mut solution = parse(ROCK_SLN).unwrap();
    let removed = solution.remove_project("rock").unwrap();
    assert_eq!(removed.id, "{185A31D7-3037-4DAE-8797-0459849A84BD}");

    let configs = solution
        .global_section("ProjectConfigurationPlatforms")
        .unwrap();
    assert!(configs.entries.is_empty());
    assert!(solution.find_project("Rock").is_none());
    assert!(solution.find_project("RockWeb").is_some());
}

#[test]
fn solution_folders_get_no_build_entries() {
    let mut solution = parse(ROCK_SLN).unwrap();
    solution
        .add_project(Project::new(
            SOLUTION_FOLDER_TYPE,
            "Tools",
            "Tools",
            "{CCCC0000-0000-4000-8000-000000000004}",
        ))
        .unwrap();
    let configs = solution
        .global_section("ProjectConfigurationPlatforms")
        .unwrap();
    assert_eq!(configs.entries.len(), 2);
}

#[test]
fn duplicate_and_missing_projects_are_errors() {
    let mut solution = parse(ROCK_SLN).unwrap();
    let duplicate = Project::new(
        CSHARP_PROJECT_TYPE,
        "RockWeb",
        "x",
        "{DDDD0000-0000-4000-8000-000000000005}",
    );
    assert!(matches!(
        solution.add_project(duplicate).unwrap_err(),
        Error::DuplicateProject { .. }
    ));
    assert!(matches!(
        solution.remove_project("Nope").unwrap_err(),
        Error::ProjectNotFound { .. }
    ));
}

#[test]
fn find_by_id() {
    let solution = parse(ROCK_SLN).unwrap();
    let project = solution
        .find_project("{1f9e2a5c-0000-4000-8000-000000000001}")
        .unwrap();
    assert_eq!(project.name, "RockWeb");
}

#[test]
fn generated_ids_are_braced_upper_case() {
    let project = Project::with_new_id(CSHARP_PROJECT_TYPE, "A", "A\\A.csproj");
    assert!(project.id.starts_with('{') && project.id.ends_with('}'));
    assert_eq!(project.id, project.id.to_uppercase());
    assert_eq!(project.id.len(), 38);
}
