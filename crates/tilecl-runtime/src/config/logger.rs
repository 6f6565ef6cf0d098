use super::{compilation::CompilationLogLevel, profiling::ProfilingLogLevel, GlobalConfig};
use core::fmt::Display;
use hashbrown::HashMap;
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

/// Sinks of one logging channel and the channel's verbosity.
///
/// Any combination of sinks may be enabled.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Log file, if any.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Append to the log file instead of truncating it.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Print to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Print to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Forward to the `log` facade at this level.
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// Verbosity of the channel.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            file: None,
            append: append_default(),
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

fn append_default() -> bool {
    true
}

/// Level used when a channel is forwarded to the `log` facade.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum LogCrateLevel {
    /// `log::info!`.
    #[default]
    Info,
    /// `log::debug!`.
    Debug,
    /// `log::trace!`.
    Trace,
}

/// Verbosity of a logging channel.
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
}

/// A channel that is either off or fully on.
#[derive(Default, Copy, Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryLogLevel {
    /// Nothing is logged.
    #[default]
    Disabled,
    /// Everything is logged.
    Full,
}

impl LogLevel for BinaryLogLevel {}

#[derive(Debug, Clone, Copy)]
enum Channel {
    Compilation = 0,
    Profiling = 1,
}

/// Writes the compilation and profiling channels to their configured sinks.
///
/// A sink enabled on both channels is opened once and shared.
#[derive(Debug)]
pub struct Logger {
    sinks: Vec<Sink>,
    routes: [Vec<usize>; 2],
    /// Configuration the sinks were opened from.
    pub config: Arc<GlobalConfig>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(GlobalConfig::get())
    }
}

impl Logger {
    /// Open the sinks of every enabled channel.
    pub fn new(config: Arc<GlobalConfig>) -> Self {
        let mut logger = Self {
            sinks: Vec::new(),
            routes: [Vec::new(), Vec::new()],
            config: config.clone(),
        };
        let mut opened = HashMap::new();

        if let CompilationLogLevel::Full = config.compilation.logger.level {
            logger.route(Channel::Compilation, &config.compilation.logger, &mut opened);
        }

        if config.profiling.logger.level != ProfilingLogLevel::Disabled {
            logger.route(Channel::Profiling, &config.profiling.logger, &mut opened);
        }

        logger
    }

    fn route<L: LogLevel>(
        &mut self,
        channel: Channel,
        config: &LoggerConfig<L>,
        opened: &mut HashMap<SinkId, usize>,
    ) {
        let mut wanted = Vec::new();

        if let Some(path) = &config.file {
            wanted.push(SinkId::File(path.clone()));
        }
        if config.stdout {
            wanted.push(SinkId::Stdout);
        }
        if config.stderr {
            wanted.push(SinkId::Stderr);
        }
        if let Some(level) = config.log {
            wanted.push(SinkId::Log(level));
        }

        for id in wanted {
            let index = match opened.get(&id) {
                Some(index) => *index,
                None => {
                    let Some(sink) = Sink::open(&id, config.append) else {
                        continue;
                    };
                    self.sinks.push(sink);
                    opened.insert(id, self.sinks.len() - 1);
                    self.sinks.len() - 1
                }
            };
            self.routes[channel as usize].push(index);
        }
    }

    fn log<S: Display>(&mut self, channel: Channel, msg: &S) {
        let route = &self.routes[channel as usize];

        if let [index] = route.as_slice() {
            self.sinks[*index].write(msg);
            return;
        }

        let msg = msg.to_string();
        for index in route {
            self.sinks[*index].write(&msg);
        }
    }

    /// Write to every compilation sink.
    pub fn log_compilation<S: Display>(&mut self, msg: &S) {
        self.log(Channel::Compilation, msg);
    }

    /// Write to every profiling sink.
    pub fn log_profiling<S: Display>(&mut self, msg: &S) {
        self.log(Channel::Profiling, msg);
    }

    /// Whether at least one sink is open.
    pub fn is_active(&self) -> bool {
        !self.sinks.is_empty()
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum SinkId {
    File(PathBuf),
    Stdout,
    Stderr,
    Log(LogCrateLevel),
}

#[derive(Debug)]
enum Sink {
    File {
        path: PathBuf,
        writer: BufWriter<File>,
    },
    Stdout,
    Stderr,
    Log(LogCrateLevel),
}

impl Sink {
    // A file that can't be opened is skipped with a warning.
    fn open(id: &SinkId, append: bool) -> Option<Self> {
        let path = match id {
            SinkId::File(path) => path,
            SinkId::Stdout => return Some(Sink::Stdout),
            SinkId::Stderr => return Some(Sink::Stderr),
            SinkId::Log(level) => return Some(Sink::Log(*level)),
        };

        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path);

        match file {
            Ok(file) => Some(Sink::File {
                path: path.clone(),
                writer: BufWriter::new(file),
            }),
            Err(err) => {
                log::warn!("Unable to open log file {}: {err}", path.display());
                None
            }
        }
    }

    fn write<S: Display>(&mut self, msg: &S) {
        match self {
            Sink::File { path, writer } => {
                if let Err(err) = writeln!(writer, "{msg}").and_then(|_| writer.flush()) {
                    log::warn!("Unable to write to log file {}: {err}", path.display());
                }
            }
            Sink::Stdout => println!("{msg}"),
            Sink::Stderr => eprintln!("{msg}"),
            Sink::Log(LogCrateLevel::Info) => log::info!("{msg}"),
            Sink::Log(LogCrateLevel::Debug) => log::debug!("{msg}"),
            Sink::Log(LogCrateLevel::Trace) => log::trace!("{msg}"),
        }
    }
}
