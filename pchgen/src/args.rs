// SPDX-License-Identifier: GPL-3.0-or-later

//! This module contains the command line interface of the application.
//!
//! The command line parsing is implemented using the `clap` library.
//! The module is defining types to represent a structured form of the
//! program invocation. The `Arguments` type is used to represent all
//! possible invocations of the program.

use anyhow::anyhow;
use clap::{ArgAction, ArgMatches, Command, arg, command};
use std::fmt;
use std::path::PathBuf;

const MODE_ARGUMENTS_SUBCOMMAND: &str = "arguments";
const MODE_FILTER_SUBCOMMAND: &str = "filter";
const MODE_GENERATE_SUBCOMMAND: &str = "generate";

/// Represents the command line arguments of the application.
#[derive(Debug, PartialEq)]
pub struct Arguments {
    // The number of `-v` flags.
    pub verbose: u8,
    // The path of the configuration file.
    pub config: Option<PathBuf>,
    // The mode of the application.
    pub mode: Mode,
}

/// Represents the mode of the application.
#[derive(Debug, PartialEq)]
pub enum Mode {
    /// Print the compiler arguments of a project part.
    Arguments {
        project: PathBuf,
        source: Option<PathBuf>,
        output: Option<PathBuf>,
        include_pch: Option<PathBuf>,
        json: bool,
    },
    /// Print the filtered header paths of a project part.
    Filter { project: PathBuf, json: bool },
    /// Generate the precompiled header of a project part.
    Generate { project: PathBuf },
}

impl TryFrom<ArgMatches> for Arguments {
    type Error = anyhow::Error;

    fn try_from(matches: ArgMatches) -> Result<Self, Self::Error> {
        let verbose = matches.get_count("verbose");
        let config = matches.get_one::<String>("config").map(PathBuf::from);

        let mode = match matches.subcommand() {
            Some((MODE_ARGUMENTS_SUBCOMMAND, matches)) => Mode::Arguments {
                project: project(matches)?,
                source: matches.get_one::<String>("source").map(PathBuf::from),
                output: matches.get_one::<String>("output").map(PathBuf::from),
                include_pch: matches.get_one::<String>("include-pch").map(PathBuf::from),
                json: matches.get_flag("json"),
            },
            Some((MODE_FILTER_SUBCOMMAND, matches)) => {
                Mode::Filter { project: project(matches)?, json: matches.get_flag("json") }
            }
            Some((MODE_GENERATE_SUBCOMMAND, matches)) => Mode::Generate { project: project(matches)? },
            _ => return Err(anyhow!("unrecognized subcommand")),
        };
        Ok(Arguments { verbose, config, mode })
    }
}

fn project(matches: &ArgMatches) -> anyhow::Result<PathBuf> {
    matches
        .get_one::<String>("PROJECT")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("missing project description"))
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arguments: verbose={}", self.verbose)?;
        if let Some(config) = &self.config {
            write!(f, ", config={}", config.display())?;
        }
        match &self.mode {
            Mode::Arguments { project, .. } => write!(f, ", mode=arguments {}", project.display()),
            Mode::Filter { project, .. } => write!(f, ", mode=filter {}", project.display()),
            Mode::Generate { project } => write!(f, ", mode=generate {}", project.display()),
        }
    }
}

/// Represents the command line interface of the application.
///
/// Every mode takes a project part description file (JSON), and the
/// tool chain settings from the configuration file.
pub fn cli() -> Command {
    let project = arg!(<PROJECT> "Path of the project part description (JSON)").required(true);
    let json = arg!(--json "Print the result as JSON").action(ArgAction::SetTrue);

    command!()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args(&[
            arg!(-v --verbose ... "Sets the level of verbosity").action(ArgAction::Count),
            arg!(-c --config <FILE> "Path of the config file"),
        ])
        .subcommand(
            Command::new(MODE_ARGUMENTS_SUBCOMMAND)
                .about("prints the compiler arguments of a project part")
                .args(&[
                    project.clone(),
                    arg!(--source <FILE> "Source file to compile"),
                    arg!(-o --output <FILE> "Output file of the compiler"),
                    arg!(--"include-pch" <FILE> "Precompiled header to include"),
                    json.clone(),
                ]),
        )
        .subcommand(
            Command::new(MODE_FILTER_SUBCOMMAND)
                .about("prints the filtered header paths of a project part")
                .args(&[project.clone(), json]),
        )
        .subcommand(
            Command::new(MODE_GENERATE_SUBCOMMAND)
                .about("generates the precompiled header of a project part")
                .arg(project),
        )
}
