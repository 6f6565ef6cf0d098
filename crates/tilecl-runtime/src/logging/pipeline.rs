use core::{fmt::Display, time::Duration};
use std::sync::Arc;

use super::Profiled;
use crate::config::{
    compilation::CompilationLogLevel, profiling::ProfilingLogLevel, GlobalConfig, Logger,
};

/// Control the amount of info being displayed when profiling.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProfileLevel {
    /// Only the summary table.
    Basic,
    /// The summary table and every launch.
    Full,
}

#[derive(Debug)]
enum PipelineLoggerOptions {
    /// Dump only the compiled sources.
    CompilationOnly,
    /// Profile each launch.
    ProfileOnly(ProfileLevel),
    /// Enable all options.
    All(ProfileLevel),
}

#[derive(Debug)]
enum LoggerState {
    Activated(Logger, PipelineLoggerOptions),
    None,
}

/// Logger of the compute pipeline, with a compilation and a profiling channel.
#[derive(Debug)]
pub struct PipelineLogger {
    state: LoggerState,
    profiled: Profiled,
}

impl Default for PipelineLogger {
    fn default() -> Self {
        Self::new(GlobalConfig::get())
    }
}

impl PipelineLogger {
    /// Create a logger from the given configuration.
    pub fn new(config: Arc<GlobalConfig>) -> Self {
        let profile = match config.profiling.logger.level {
            ProfilingLogLevel::Disabled => None,
            ProfilingLogLevel::Basic => Some(ProfileLevel::Basic),
            ProfilingLogLevel::Full => Some(ProfileLevel::Full),
        };
        let compilation = matches!(config.compilation.logger.level, CompilationLogLevel::Full);

        let option = match (profile, compilation) {
            (Some(level), true) => PipelineLoggerOptions::All(level),
            (Some(level), false) => PipelineLoggerOptions::ProfileOnly(level),
            (None, true) => PipelineLoggerOptions::CompilationOnly,
            (None, false) => {
                return Self {
                    state: LoggerState::None,
                    profiled: Profiled::default(),
                }
            }
        };

        Self {
            state: LoggerState::Activated(Logger::new(config), option),
            profiled: Profiled::default(),
        }
    }

    /// Returns the profile level, none if profiling is deactivated.
    pub fn profile_level(&self) -> Option<ProfileLevel> {
        match &self.state {
            LoggerState::Activated(_, option) => match option {
                PipelineLoggerOptions::CompilationOnly => None,
                PipelineLoggerOptions::ProfileOnly(level) => Some(*level),
                PipelineLoggerOptions::All(level) => Some(*level),
            },
            LoggerState::None => None,
        }
    }

    /// Returns true if compilation info should be logged.
    pub fn compilation_activated(&self) -> bool {
        matches!(
            &self.state,
            LoggerState::Activated(
                _,
                PipelineLoggerOptions::CompilationOnly | PipelineLoggerOptions::All(_)
            )
        )
    }

    /// Log the argument when the compilation channel is activated.
    pub fn log_compilation<I: Display>(&mut self, arg: I) -> I {
        if let LoggerState::Activated(logger, option) = &mut self.state {
            match option {
                PipelineLoggerOptions::CompilationOnly | PipelineLoggerOptions::All(_) => {
                    logger.log_compilation(&arg);
                }
                PipelineLoggerOptions::ProfileOnly(_) => (),
            }
        }
        arg
    }

    /// Register a profiled launch.
    pub fn register_profiled<Name: Display>(&mut self, name: Name, duration: Duration) {
        let name = name.to_string();
        self.profiled.update(&name, duration);

        if let Some(ProfileLevel::Full) = self.profile_level() {
            if let LoggerState::Activated(logger, _) = &mut self.state {
                logger.log_profiling(&format!("| {duration:<10?} | {name}"));
            }
        }
    }

    /// Launches profiled since the last summary.
    pub fn profiled(&self) -> &Profiled {
        &self.profiled
    }

    /// Show the profiling summary if activated and reset its state.
    pub fn profile_summary(&mut self) {
        if self.profile_level().is_none() {
            return;
        }

        let profiled = core::mem::take(&mut self.profiled);

        if let LoggerState::Activated(logger, _) = &mut self.state {
            if !profiled.is_empty() {
                logger.log_profiling(&profiled);
            }
        }
    }
}
