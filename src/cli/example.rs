//! The example models bundled with the program and the `example` subcommands.
use super::{RunOpts, handle_run_command};
use crate::settings::Settings;
use anyhow::{Context, Result, bail, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The example models, one per folder
static EXAMPLES_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// Every example has one of these describing it
const README_FILE_NAME: &str = "README.txt";

/// The available subcommands for managing example models.
#[derive(Subcommand)]
pub enum ExampleSubcommands {
    /// List the available examples.
    List,
    /// Describe an example.
    Info {
        /// The name of the example.
        name: String,
    },
    /// Copy an example model to a new folder.
    Extract {
        /// The name of the example to extract.
        name: String,
        /// Where to put the model (defaults to a folder named after the example).
        new_path: Option<PathBuf>,
    },
    /// Build regions for an example.
    Run {
        /// The name of the example to run.
        name: String,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
}

impl ExampleSubcommands {
    /// Execute the supplied example subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => {
                for (name, summary) in list_examples()? {
                    println!("{name}: {summary}");
                }
            }
            Self::Info { name } => println!("{}", example_readme(&name)?),
            Self::Extract { name, new_path } => {
                let dest = new_path.unwrap_or_else(|| PathBuf::from(&name));
                extract_example(&name, &dest)?;
                println!("Extracted example {name} to {}", dest.display());
            }
            Self::Run { name, opts } => handle_example_run_command(&name, &opts, None)?,
        }

        Ok(())
    }
}

/// The folder for the named example
fn example_dir(name: &str) -> Result<&'static Dir<'static>> {
    EXAMPLES_DIR
        .get_dir(name)
        .with_context(|| format!("Example not found: {name}"))
}

/// The contents of the example's README
fn example_readme(name: &str) -> Result<&'static str> {
    let path = example_dir(name)?.path().join(README_FILE_NAME);
    EXAMPLES_DIR
        .get_file(&path)
        .with_context(|| format!("Example {name} has no {README_FILE_NAME}"))?
        .contents_utf8()
        .with_context(|| format!("{README_FILE_NAME} for example {name} is not UTF-8 encoded"))
}

/// The name of each example along with the first line of its README
fn list_examples() -> Result<Vec<(String, String)>> {
    EXAMPLES_DIR
        .dirs()
        .map(|dir| {
            let name = dir.path().display().to_string();
            let summary = example_readme(&name)?.lines().next().unwrap_or_default();
            Ok((name, summary.to_string()))
        })
        .collect()
}

/// Copy the files for the named example into the new folder `new_path`
fn extract_example(name: &str, new_path: &Path) -> Result<()> {
    let dir = example_dir(name)?;
    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    fs::create_dir_all(new_path)
        .with_context(|| format!("Failed to create directory: {}", new_path.display()))?;
    for entry in dir.entries() {
        let DirEntry::File(file) = entry else {
            bail!("Subdirectories in examples not supported");
        };
        let file_name = file.path().file_name().context("Invalid file in example")?;
        fs::write(new_path.join(file_name), file.contents())?;
    }

    Ok(())
}

/// Handle the `example run` command.
///
/// The example is extracted to a temporary folder. Unless an output folder is given, results are
/// written to `blobs_results/<name>`.
pub fn handle_example_run_command(
    name: &str,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let model_path = temp_dir.path().join(name);
    extract_example(name, &model_path)?;
    handle_run_command(&model_path, opts, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use tempfile::tempdir;

    #[test]
    fn test_list_examples() {
        let examples = list_examples().unwrap();
        assert!(!examples.is_empty());
        assert!(examples.iter().any(|(name, _)| name == "grid"));
        assert!(examples.iter().all(|(_, summary)| !summary.is_empty()));
    }

    #[test]
    fn test_example_readme() {
        assert!(example_readme("grid").unwrap().contains("grid"));
        assert_error!(example_readme("nonexistent"), "Example not found: nonexistent");
    }

    #[test]
    fn test_extract_example() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("grid");
        extract_example("grid", &dest).unwrap();
        for file_name in ["areas.csv", "adjacency.csv", "model.toml", README_FILE_NAME] {
            assert!(dest.join(file_name).is_file());
        }

        // Can't extract over an existing folder
        assert!(extract_example("grid", &dest).is_err());
        assert!(extract_example("nonexistent", &dir.path().join("other")).is_err());
    }
}
