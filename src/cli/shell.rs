//! An interactive session for building regions one step at a time.
//!
//! The user chooses variables, sets up the floor, adjusts the run parameters, runs the solver and
//! finally clusters the regions. Each line of input is one command.
use crate::area::FloorVariable;
use crate::model::{ClusteringParameters, Model};
use crate::oracle::OracleOptions;
use crate::output::write_region_summaries;
use crate::pipeline::{
    ClusteringOutcome, RegionalisationConfig, RegionalisationOutcome, cluster_regions,
    regionalise,
};
use crate::regionalisation::SortMethod;
use crate::standardise::StandardisationMethod;
use anyhow::{Context, Result, bail, ensure};
use chrono::Local;
use itertools::Itertools;
use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Default number of times the solver is run
const DEFAULT_ITERATIONS: u32 = 10;

/// The commands understood by the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum Command {
    Select,
    Floor,
    Size,
    Iterations,
    Method,
    Weights,
    SaveData,
    Sort,
    Next,
    Run,
    Cluster,
    Show,
    Clear,
    Help,
    Exit,
}

impl Command {
    /// Usage and a short description for the help text
    fn usage(self) -> &'static str {
        match self {
            Self::Select => "select <variable>: add a variable to build regions from",
            Self::Floor => "floor <variable>: choose the floor variable (`areas` to count areas)",
            Self::Size => "size <n>: set the minimum total of the floor variable per region",
            Self::Iterations => "iterations <n>: set how many times to run the solver",
            Self::Method => "method <default|equal_votes|weighted>: set how variables are weighted",
            Self::Weights => "weights <w1> <w2> ...: set one weight per selected variable",
            Self::SaveData => "savedata <true|false>: whether to save region summaries on `run`",
            Self::Sort => "sort <objective|mean|none>: how to order regions after a run",
            Self::Next => "next: move on to the next step",
            Self::Run => "run: build regions",
            Self::Cluster => "cluster <n>: group regions into clusters of about n regions",
            Self::Show => "show: show the current settings",
            Self::Clear => "clear: start again",
            Self::Help => "help: show this message",
            Self::Exit => "exit: leave the shell",
        }
    }
}

/// The stages of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum Step {
    /// Choosing variables
    #[strum(to_string = "variable selection")]
    Variables = 1,
    /// Choosing the floor variable and its minimum
    #[strum(to_string = "floor set-up")]
    Floor,
    /// Adjusting how the solver runs
    #[strum(to_string = "run parameters")]
    RunParameters,
    /// Grouping regions into clusters
    #[strum(to_string = "clustering")]
    Clustering,
    /// The session is over
    #[strum(to_string = "exit")]
    Exit,
}

impl Step {
    /// The step number shown in the prompt
    pub fn number(self) -> u8 {
        self as u8
    }

    fn next(self) -> Self {
        match self {
            Self::Variables => Self::Floor,
            Self::Floor => Self::RunParameters,
            Self::RunParameters => Self::Clustering,
            Self::Clustering | Self::Exit => Self::Exit,
        }
    }
}

/// The state of one interactive session
pub struct Session<'a> {
    model: &'a Model,
    output_path: PathBuf,
    default_save_data: bool,
    oracle: OracleOptions,
    step: Step,
    variables: Vec<String>,
    floor_variable: Option<FloorVariable>,
    floor: Option<f64>,
    iterations: u32,
    method: StandardisationMethod,
    weights: Vec<f64>,
    save_data: bool,
    sort_regions: Option<SortMethod>,
    regions: Option<RegionalisationOutcome>,
    clusters: Option<ClusteringOutcome>,
}

impl<'a> Session<'a> {
    /// Start a new session.
    ///
    /// # Arguments
    ///
    /// * `model` - The model supplying the areas and adjacency
    /// * `output_path` - Where region summaries are saved
    /// * `save_data` - Whether region summaries are saved by default
    pub fn new(model: &'a Model, output_path: PathBuf, save_data: bool) -> Self {
        Self {
            model,
            output_path,
            default_save_data: save_data,
            oracle: model.parameters.oracle_options(),
            step: Step::Variables,
            variables: Vec::new(),
            floor_variable: None,
            floor: None,
            iterations: DEFAULT_ITERATIONS,
            method: StandardisationMethod::default(),
            weights: Vec::new(),
            save_data,
            sort_regions: None,
            regions: None,
            clusters: None,
        }
    }

    /// The current step
    pub fn step(&self) -> Step {
        self.step
    }

    /// The selected variables
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The regions from the last `run`, if any
    pub fn regions(&self) -> Option<&RegionalisationOutcome> {
        self.regions.as_ref()
    }

    /// The clusters from the last `cluster`, if any
    pub fn clusters(&self) -> Option<&ClusteringOutcome> {
        self.clusters.as_ref()
    }

    /// The prompt shown before each command
    fn prompt(&self) -> String {
        format!("[{}: {}] > ", self.step.number(), self.step)
    }

    /// Parse and run a single line of input
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> Result<()> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(());
        };
        let command = Command::from_str(name)
            .ok()
            .with_context(|| format!("Unknown command: {name}. Type `help` for a list of commands."))?;
        let args = words.collect_vec();

        match command {
            Command::Select => self.select(single_arg(command, &args)?, out),
            Command::Floor => self.set_floor_variable(single_arg(command, &args)?, out),
            Command::Size => self.set_size(single_arg(command, &args)?, out),
            Command::Iterations => {
                let arg = single_arg(command, &args)?;
                self.iterations = arg
                    .parse()
                    .with_context(|| format!("Invalid number of iterations: {arg}"))?;
                writeln!(out, "Iterations: {}", self.iterations)?;
                Ok(())
            }
            Command::Method => {
                // Allow "equal votes" as two words
                let arg = args.join(" ");
                self.method = StandardisationMethod::from_str(&arg)
                    .ok()
                    .with_context(|| format!("Unknown method: {arg}"))?;
                writeln!(out, "Method: {}", self.method)?;
                Ok(())
            }
            Command::Weights => self.set_weights(&args, out),
            Command::SaveData => {
                self.save_data = parse_bool(single_arg(command, &args)?)?;
                writeln!(out, "Save data: {}", self.save_data)?;
                Ok(())
            }
            Command::Sort => {
                let arg = single_arg(command, &args)?;
                self.sort_regions = if arg.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(
                        SortMethod::from_str(arg)
                            .ok()
                            .with_context(|| format!("Unknown sort method: {arg}"))?,
                    )
                };
                writeln!(out, "Sort regions by: {}", describe_sort(self.sort_regions))?;
                Ok(())
            }
            Command::Next => self.next(out),
            Command::Run => self.run(out),
            Command::Cluster => self.cluster(single_arg(command, &args)?, out),
            Command::Show => self.show(out),
            Command::Clear => {
                *self = Self::new(self.model, self.output_path.clone(), self.default_save_data);
                writeln!(out, "Session cleared")?;
                Ok(())
            }
            Command::Help => {
                for command in Command::iter() {
                    writeln!(out, "  {}", command.usage())?;
                }
                Ok(())
            }
            Command::Exit => {
                self.step = Step::Exit;
                Ok(())
            }
        }
    }

    fn select<W: Write>(&mut self, name: &str, out: &mut W) -> Result<()> {
        ensure!(
            self.model.areas.variable_index(name).is_some(),
            "Unknown variable: {name}. Available variables: {}",
            self.model.areas.variables().join(", ")
        );
        ensure!(
            !self.variables.iter().any(|v| v == name),
            "Variable {name} is already selected"
        );
        self.variables.push(name.to_string());
        self.discard_results();
        writeln!(out, "Selected variables: {}", self.variables.join(", "))?;
        Ok(())
    }

    fn set_floor_variable<W: Write>(&mut self, name: &str, out: &mut W) -> Result<()> {
        let floor_variable = FloorVariable::from(name.to_string());
        self.model
            .areas
            .floor_values(&floor_variable)
            .with_context(|| format!("Cannot use {name} as the floor variable"))?;
        writeln!(out, "Floor variable: {floor_variable}")?;
        self.floor_variable = Some(floor_variable);
        self.discard_results();
        self.step = self.step.max(Step::Floor);
        Ok(())
    }

    fn set_size<W: Write>(&mut self, arg: &str, out: &mut W) -> Result<()> {
        let floor_variable = self
            .floor_variable
            .as_ref()
            .context("Choose a floor variable with `floor` first")?;
        let floor: f64 = arg
            .parse()
            .with_context(|| format!("Invalid floor size: {arg}"))?;
        ensure!(
            floor.is_finite() && floor > 0.0,
            "Floor size must be a finite number greater than zero"
        );

        let total: f64 = self.model.areas.floor_values(floor_variable)?.values().sum();
        writeln!(
            out,
            "Each region must have {floor_variable} of at least {floor} (total {total})"
        )?;
        self.floor = Some(floor);
        self.discard_results();
        self.step = self.step.max(Step::RunParameters);
        Ok(())
    }

    fn set_weights<W: Write>(&mut self, args: &[&str], out: &mut W) -> Result<()> {
        let weights: Vec<f64> = args
            .iter()
            .map(|arg| {
                arg.parse::<f64>()
                    .with_context(|| format!("Invalid weight: {arg}"))
            })
            .try_collect()?;
        ensure!(
            weights.iter().all(|w| w.is_finite() && *w >= 0.0),
            "Weights must be finite and non-negative"
        );
        self.weights = weights;
        writeln!(out, "Weights: {}", self.weights.iter().join(", "))?;
        Ok(())
    }

    fn next<W: Write>(&mut self, out: &mut W) -> Result<()> {
        match self.step {
            Step::Variables => ensure!(
                !self.variables.is_empty(),
                "Select at least one variable with `select` first"
            ),
            Step::Floor => ensure!(
                self.floor.is_some(),
                "Set the floor size with `size` first"
            ),
            Step::RunParameters => ensure!(
                self.regions.is_some(),
                "Build regions with `run` first"
            ),
            Step::Clustering | Step::Exit => {}
        }
        self.step = self.step.next();
        writeln!(out, "Step {}: {}", self.step.number(), self.step)?;
        Ok(())
    }

    /// The configuration for a run with the current settings
    fn config(&self) -> Result<RegionalisationConfig> {
        ensure!(
            !self.variables.is_empty(),
            "Select at least one variable with `select` first"
        );
        let floor_variable = self
            .floor_variable
            .clone()
            .context("Choose a floor variable with `floor` first")?;
        let floor = self.floor.context("Set the floor size with `size` first")?;

        Ok(RegionalisationConfig {
            variables: self.variables.clone(),
            floor_variable,
            floor,
            iterations: self.iterations,
            method: self.method,
            weights: self.weights.clone(),
            oracle: self.oracle.clone(),
            sort_regions: self.sort_regions,
        })
    }

    fn run<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let config = self.config()?;
        let started = Local::now();
        let outcome = regionalise(&self.model.areas, &self.model.adjacency, &config)?;

        let solution = &outcome.regionalisation.solution;
        writeln!(
            out,
            "Built {} regions (score {:.3})",
            solution.n_regions(),
            solution.score()
        )?;
        for summary in &outcome.summaries {
            writeln!(
                out,
                "  region {}: {} areas, {} = {}",
                summary.region, summary.size, config.floor_variable, summary.floor_total
            )?;
        }

        if self.save_data {
            fs::create_dir_all(&self.output_path).with_context(|| {
                format!(
                    "Failed to create output directory: {}",
                    self.output_path.display()
                )
            })?;
            let file_path = write_region_summaries(
                &self.output_path,
                &outcome.summaries,
                &config.variables,
                &config.floor_variable,
                &started,
            )?;
            writeln!(out, "Region summaries saved to {}", file_path.display())?;
        }

        self.regions = Some(outcome);
        self.clusters = None;
        self.step = self.step.max(Step::Clustering);
        Ok(())
    }

    fn cluster<W: Write>(&mut self, arg: &str, out: &mut W) -> Result<()> {
        let regions_per_cluster: usize = arg
            .parse()
            .with_context(|| format!("Invalid number of regions per cluster: {arg}"))?;
        let regions = self
            .regions
            .as_ref()
            .context("Build regions with `run` first")?;
        let parameters = ClusteringParameters {
            n_clusters: None,
            regions_per_cluster: Some(regions_per_cluster),
            seed: self.oracle.seed,
        };
        let clusters = cluster_regions(&regions.summaries, &parameters)?;

        writeln!(
            out,
            "Grouped {} regions into {} clusters",
            regions.summaries.len(),
            clusters.sizing.n_clusters
        )?;
        for (cluster, members) in clusters
            .result
            .labels
            .iter()
            .enumerate()
            .into_group_map_by(|(_, label)| **label)
            .into_iter()
            .sorted_by_key(|(label, _)| *label)
        {
            let members = members.iter().map(|(region, _)| region).join(", ");
            writeln!(out, "  cluster {cluster}: regions {members}")?;
        }

        self.clusters = Some(clusters);
        Ok(())
    }

    fn show<W: Write>(&self, out: &mut W) -> Result<()> {
        let unset = || "(not set)".to_string();
        writeln!(out, "Step: {} ({})", self.step.number(), self.step)?;
        writeln!(
            out,
            "Available variables: {}",
            self.model.areas.variables().join(", ")
        )?;
        writeln!(out, "Selected variables: {}", self.variables.join(", "))?;
        writeln!(
            out,
            "Floor variable: {}",
            self.floor_variable
                .as_ref()
                .map_or_else(unset, ToString::to_string)
        )?;
        writeln!(
            out,
            "Floor size: {}",
            self.floor.map_or_else(unset, |floor| floor.to_string())
        )?;
        writeln!(out, "Iterations: {}", self.iterations)?;
        writeln!(out, "Method: {}", self.method)?;
        writeln!(out, "Weights: {}", self.weights.iter().join(", "))?;
        writeln!(out, "Save data: {}", self.save_data)?;
        writeln!(out, "Sort regions by: {}", describe_sort(self.sort_regions))?;
        if let Some(regions) = &self.regions {
            writeln!(
                out,
                "Last run: {} regions (score {:.3})",
                regions.regionalisation.solution.n_regions(),
                regions.regionalisation.solution.score()
            )?;
        }
        Ok(())
    }

    /// Results no longer match the settings once these change
    fn discard_results(&mut self) {
        self.regions = None;
        self.clusters = None;
    }
}

/// Get the only argument for `command`
fn single_arg<'a>(command: Command, args: &[&'a str]) -> Result<&'a str> {
    match args {
        [arg] => Ok(*arg),
        _ => bail!("Usage: {}", command.usage()),
    }
}

fn parse_bool(arg: &str) -> Result<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("Expected true or false but got {arg}"),
    }
}

fn describe_sort(sort_regions: Option<SortMethod>) -> String {
    sort_regions.map_or_else(|| "none".to_string(), |method| method.to_string())
}

/// Read commands from `input` until the user exits or the input ends.
///
/// Errors from individual commands are reported to `output` and the session carries on.
pub fn run_shell<R: BufRead, W: Write>(
    session: &mut Session,
    input: R,
    output: &mut W,
) -> Result<()> {
    writeln!(output, "Type `help` for a list of commands.")?;
    write!(output, "{}", session.prompt())?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        if let Err(err) = session.execute(&line, output) {
            writeln!(output, "Error: {err:#}")?;
        }
        if session.step() == Step::Exit {
            break;
        }
        write!(output, "{}", session.prompt())?;
        output.flush()?;
    }
    writeln!(output)?;

    Ok(())
}
