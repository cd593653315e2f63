//! Solution file parser and writer
//!
//! Reads and rewrites Visual Studio style `.sln` files so that projects can
//! be added or removed without disturbing anything else in the file. Unknown
//! sections round-trip unchanged.
//!
//! # Example
//!
//! ```
//! use devenv_sln::{Project, CSHARP_PROJECT_TYPE};
//!
//! let mut solution = devenv_sln::parse("Global\nEndGlobal\n").unwrap();
//! solution
//!     .add_project(Project::new(
//!         CSHARP_PROJECT_TYPE,
//!         "com.spark.Plugin",
//!         "com.spark.Plugin\\com.spark.Plugin.csproj",
//!         "{1}",
//!     ))
//!     .unwrap();
//! assert!(solution.find_project("com.spark.plugin").is_some());
//! ```

pub mod error;
pub mod model;
pub mod parser;
pub mod writer;

pub use error::{Error, Result};
pub use model::{
    CSHARP_PROJECT_TYPE, Entry, EntryLayout, LineEnding, Project, SDK_CSHARP_PROJECT_TYPE,
    SOLUTION_FOLDER_TYPE, Section, Solution, SolutionFormat, WEBSITE_PROJECT_TYPE,
};
pub use parser::{parse, parse_with};
pub use writer::load;
