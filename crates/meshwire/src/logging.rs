use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Overrides `--log-level` with full filter directives (e.g. `meshwire_frame=trace`).
pub const LOG_ENV: &str = "MESHWIRE_LOG";

/// Crates whose events follow `--log-level`. Everything else stays at warn or quieter.
const MESHWIRE_TARGETS: [&str; 4] = [
    "meshwire",
    "meshwire_transport",
    "meshwire_frame",
    "meshwire_session",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Filter directives for `level`: meshwire crates at `level`, serial and
/// other dependencies capped at warn.
pub fn directives(level: LogLevel) -> String {
    let level = level.as_filter();
    let mut out = level.min(LevelFilter::WARN).to_string();
    for target in MESHWIRE_TARGETS {
        out.push_str(&format!(",{target}={level}"));
    }
    out
}

/// Install the stderr subscriber. Thread names are kept so reader and
/// dispatcher events can be told apart.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let directives = std::env::var(LOG_ENV).unwrap_or_else(|_| directives(level));
    let filter = EnvFilter::builder().parse_lossy(directives);

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
