//! Ready-made subscribers for the spans and events the client emits.
//!
//! Nothing here is installed implicitly. Either hand the [Dispatch] to
//! [`ClientConfig::dispatch`](crate::ClientConfig) or install it globally with
//! [`LogConfig::init_global`].

use bon::Builder;
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt as _;

use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Builder, Debug, Clone)]
pub struct LogConfig {
    /// Used when `RUST_LOG` is unset or ignored
    #[builder(default = LevelFilter::INFO)]
    pub level: LevelFilter,
    /// Whether `RUST_LOG` overrides `level`
    #[builder(default = true)]
    pub from_env: bool,
    /// Append to this file through a background writer instead of writing to stdout
    #[builder(into)]
    pub file: Option<PathBuf>,
    #[builder(default = true)]
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl LogConfig {
    pub fn filter(&self) -> EnvFilter {
        let builder = EnvFilter::builder().with_default_directive(self.level.into());

        if self.from_env {
            builder.from_env_lossy()
        } else {
            builder.parse_lossy("")
        }
    }

    /// Builds the subscriber. With a log file the returned guard must be kept alive for as
    /// long as events should reach the file; dropping it flushes what is buffered.
    pub fn into_dispatch(self) -> io::Result<(Dispatch, Option<WorkerGuard>)> {
        let filter = self.filter();

        let (writer, guard) = match &self.file {
            Some(path) => {
                let file = File::options().create(true).append(true).open(path)?;
                let (writer, guard) = tracing_appender::non_blocking(file);

                (BoxMakeWriter::new(writer), Some(guard))
            }
            None => (BoxMakeWriter::new(io::stdout), None),
        };

        let subscriber = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(self.ansi && self.file.is_none())
                    .compact(),
            )
            .with(filter);

        Ok((Dispatch::new(subscriber), guard))
    }

    /// Installs the subscriber as the process-wide default. Fails if one is already set.
    pub fn init_global(self) -> io::Result<Option<WorkerGuard>> {
        let (dispatch, guard) = self.into_dispatch()?;
        tracing::dispatcher::set_global_default(dispatch).map_err(io::Error::other)?;

        Ok(guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mango-search-{}-{name}.log", std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn writes_events_to_file() {
        let path = log_file("events");
        let (dispatch, guard) = LogConfig::builder()
            .file(path.clone())
            .from_env(false)
            .build()
            .into_dispatch()
            .unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::info!("searching for manga with title: Chainsaw Man");
            tracing::debug!("filtered out");
        });
        drop(guard);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("searching for manga with title: Chainsaw Man"));
        assert!(!written.contains("filtered out"));
        assert!(!written.contains("\u{1b}["));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn level_applies_without_env() {
        let path = log_file("level");
        let (dispatch, guard) = LogConfig::builder()
            .file(path.clone())
            .from_env(false)
            .level(LevelFilter::ERROR)
            .build()
            .into_dispatch()
            .unwrap();

        tracing::dispatcher::with_default(&dispatch, || {
            tracing::warn!("not an error");
            tracing::error!("list_chapters: failed to fetch, status code: 404");
        });
        drop(guard);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("status code: 404"));
        assert!(!written.contains("not an error"));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn stdout_has_no_guard() {
        let (_dispatch, guard) = LogConfig::default().into_dispatch().unwrap();
        assert!(guard.is_none());
    }
}
