use std::env;

use tracing::Level;
pub use tracing::{debug, error, info, instrument, trace, warn};
use tracing_subscriber::{filter::Directive, fmt, prelude::*, EnvFilter};

pub const LOG_LEVEL_ENV: &str = "IGDL_LOG_LEVEL";

pub const COMPONENT_LEVELS: &[(&str, Level)] = &[
    ("downloader_cli", Level::INFO),
    ("app_config", Level::INFO),
    ("app_downloader", Level::INFO),
    ("app_extractor", Level::INFO),
    ("app_helpers", Level::INFO),
    ("app_logger", Level::INFO),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Initialize the logger with the default component levels
///
/// # Panics
/// Panics if a global subscriber was already installed
pub fn init() {
    init_with(COMPONENT_LEVELS.to_vec(), LogFormat::Pretty);
}

/// Same as [`init`], but every event is written as one JSON object per line
pub fn init_json() {
    init_with(COMPONENT_LEVELS.to_vec(), LogFormat::Json);
}

pub fn init_with_app_level(level: Level) {
    let levels = COMPONENT_LEVELS
        .iter()
        .map(|(k, _v)| (k.to_owned(), level))
        .collect::<Vec<_>>();

    init_with(levels, LogFormat::Pretty);
}

pub fn init_with<T>(levels: T, format: LogFormat)
where
    T: IntoIterator<Item = (&'static str, Level)>,
{
    let filter = build_filter(levels, env::var(LOG_LEVEL_ENV).unwrap_or_default().as_str());

    let registry = tracing_subscriber::registry().with(filter);

    let res = match format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    res.expect("setting default subscriber failed");
}

fn build_filter<T>(levels: T, extra_directives: &str) -> EnvFilter
where
    T: IntoIterator<Item = (&'static str, Level)>,
{
    let default_levels = levels
        .into_iter()
        .map(|(k, v)| {
            if k.is_empty() {
                v.to_string()
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect::<Vec<_>>()
        .join(",");

    let mut filter = EnvFilter::builder()
        .with_default_directive(Level::WARN.into())
        .parse_lossy(default_levels);

    let env_directives = extra_directives
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(d) => Some(d),
            Err(e) => {
                eprintln!("Failed to parse log level directive {s:?}: {e:?}");
                None
            }
        })
        .collect::<Vec<Directive>>();

    for d in env_directives {
        filter = filter.add_directive(d);
    }

    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_levels_end_up_in_filter() {
        let filter = build_filter(COMPONENT_LEVELS.to_vec(), "");
        let rendered = filter.to_string();

        assert!(rendered.contains("app_extractor=info"), "{rendered}");
        assert!(rendered.contains("app_downloader=info"), "{rendered}");
    }

    #[test]
    fn env_directives_are_appended_and_garbage_is_skipped() {
        let filter = build_filter(
            vec![("app_extractor", Level::INFO)],
            "app_extractor=trace, ,not a directive=%%",
        );
        let rendered = filter.to_string();

        assert!(rendered.contains("app_extractor=trace"), "{rendered}");
    }
}
