// SPDX-License-Identifier: GPL-3.0-or-later

use crate::command_line::CommandLineBuilder;
use crate::file_paths::FilePathCache;
use crate::header_paths::FilteredHeaderPaths;
use crate::model::HeaderPath;
use crate::pch::registry::{PchRegistry, WatchRegistry};
use crate::pch::{LocalFileSystem, PchCreator, PchEnvironment, PchError, SystemProcessRunner};
use crate::project::{ProjectError, ProjectPart};
use crate::{args, config};
use signal_hook::consts::TERM_SIGNALS;
use signal_hook::flag;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Represent the modes the application can run in.
///
/// All modes work on a single project part. The first two only print what
/// would be passed to the compiler, the last one runs it.
pub enum Mode {
    Arguments {
        project_part: ProjectPart,
        toolchain: config::Toolchain,
        source: Option<PathBuf>,
        output: Option<PathBuf>,
        include_pch: Option<PathBuf>,
        json: bool,
    },
    Filter {
        project_part: ProjectPart,
        toolchain: config::Toolchain,
        json: bool,
    },
    Generate {
        project_part: ProjectPart,
        toolchain: config::Toolchain,
        pch: config::Pch,
    },
}

impl Mode {
    /// Configure the application mode based on the command line arguments and the configuration.
    ///
    /// Reads the project part description, so a missing or broken file is
    /// reported before anything runs.
    pub fn configure(args: args::Arguments, config: config::Main) -> Result<Self, ConfigurationError> {
        let config::Main { toolchain, pch, .. } = config;
        match args.mode {
            args::Mode::Arguments { project, source, output, include_pch, json } => {
                log::debug!("Mode: print compiler arguments");
                Ok(Self::Arguments {
                    project_part: ProjectPart::load(&project)?,
                    toolchain,
                    source,
                    output,
                    include_pch,
                    json,
                })
            }
            args::Mode::Filter { project, json } => {
                log::debug!("Mode: print filtered header paths");
                Ok(Self::Filter { project_part: ProjectPart::load(&project)?, toolchain, json })
            }
            args::Mode::Generate { project } => {
                log::debug!("Mode: generate precompiled header");
                Ok(Self::Generate { project_part: ProjectPart::load(&project)?, toolchain, pch })
            }
        }
    }

    /// It actually runs the application mode.
    ///
    /// The result goes to the standard output. A failed precompiled header
    /// generation is reported with a failure exit code.
    pub fn run(self) -> ExitCode {
        let mut stdout = io::stdout().lock();
        match self.execute(&mut stdout) {
            Ok(true) => ExitCode::SUCCESS,
            Ok(false) => ExitCode::FAILURE,
            Err(error) => {
                log::error!("pchgen: {error}");
                ExitCode::FAILURE
            }
        }
    }

    fn execute(self, out: &mut impl Write) -> Result<bool, RuntimeError> {
        match self {
            Self::Arguments { project_part, toolchain, source, output, include_pch, json } => {
                let request = project_part.compilation_request(&toolchain);
                let mut builder = CommandLineBuilder::new(&request, &toolchain.arguments);
                if let Some(source) = source.as_deref() {
                    builder = builder.source(source);
                }
                if let Some(output) = output.as_deref() {
                    builder = builder.output(output);
                }
                if let Some(include_pch) = include_pch.as_deref() {
                    builder = builder.include_pch(include_pch);
                }
                let arguments = builder.build();

                if json {
                    serde_json::to_writer(&mut *out, &arguments)?;
                    writeln!(out)?;
                } else {
                    writeln!(out, "{}", shell_words::join(&arguments))?;
                }
                Ok(true)
            }
            Self::Filter { project_part, toolchain, json } => {
                let filtered = project_part.filtered_header_paths(&toolchain);
                if json {
                    serde_json::to_writer_pretty(&mut *out, &filtered)?;
                    writeln!(out)?;
                } else {
                    write_filtered(out, &filtered)?;
                }
                Ok(true)
            }
            Self::Generate { project_part, toolchain, pch } => {
                let file_path_cache = Arc::new(FilePathCache::new());
                let task = project_part.pch_task(&toolchain, file_path_cache.as_ref());

                let interrupt = register_termination_signals()?;
                let mut creator = PchCreator::new(
                    PchEnvironment::new(pch.directory),
                    file_path_cache,
                    Arc::new(SystemProcessRunner::with_interrupt(interrupt)),
                    Arc::new(LocalFileSystem),
                    Box::new(PchRegistry::new()),
                    Box::new(WatchRegistry::new()),
                );
                creator.generate_pch(task)?;
                let project_part_pch = creator.finish()?;

                serde_json::to_writer_pretty(&mut *out, project_part_pch)?;
                writeln!(out)?;
                Ok(project_part_pch.is_valid())
            }
        }
    }
}

/// Installs handlers for the termination signals.
///
/// The first signal sets the returned flag, so the running compiler gets
/// killed and the task ends as failed. A second signal terminates the process.
fn register_termination_signals() -> Result<Arc<AtomicBool>, RuntimeError> {
    let interrupt = Arc::new(AtomicBool::new(false));
    for signal in TERM_SIGNALS {
        flag::register_conditional_shutdown(*signal, 1, Arc::clone(&interrupt))
            .map_err(RuntimeError::SignalRegistration)?;
        flag::register(*signal, Arc::clone(&interrupt)).map_err(RuntimeError::SignalRegistration)?;
    }
    Ok(interrupt)
}

fn write_filtered(out: &mut impl Write, filtered: &FilteredHeaderPaths) -> io::Result<()> {
    let sections: [(&str, &[HeaderPath]); 3] = [
        ("built-in", &filtered.built_in),
        ("system", &filtered.system),
        ("user", &filtered.user),
    ];
    for (name, header_paths) in sections {
        writeln!(out, "{name}:")?;
        for header_path in header_paths {
            writeln!(out, "  {}", header_path.path)?;
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error(transparent)]
    Project(#[from] ProjectError),
}

#[derive(Debug, thiserror::Error)]
enum RuntimeError {
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Failed to register signal handler: {0}")]
    SignalRegistration(#[source] io::Error),
    #[error(transparent)]
    Pch(#[from] PchError),
}
