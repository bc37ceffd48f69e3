use std::sync::RwLock;

use serde_json::{Map, Value};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggerConfig;
use crate::utils::error::Result;

static LOCAL_TIME: RwLock<bool> = RwLock::new(false);

pub struct StructuredLogger;

impl StructuredLogger {
    /// Installs the global JSON subscriber. With a `LoggerConfig`, ERROR lines
    /// are also appended to `{dir}/{file_name}.error.log.YYYY-MM-DD`.
    pub fn init(level: &str, logger_config: Option<LoggerConfig>) -> Result<()> {
        let filter = match level.to_lowercase().as_str() {
            "error" => "error",
            "warn" => "warn",
            "info" => "info",
            "debug" => "debug",
            "trace" => "trace",
            _ => "info",
        };

        // only a LoggerConfig changes the timestamp zone; the latest one wins
        if let Some(config) = &logger_config {
            if let Ok(mut local_time) = LOCAL_TIME.write() {
                *local_time = config.local_time;
            }
        }

        let builder = tracing_subscriber::fmt()
            .json()
            .flatten_event(true)
            .with_env_filter(EnvFilter::new(filter));

        let installed = if let Some(config) = logger_config {
            std::fs::create_dir_all(&config.dir)?;
            let error_file = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(format!("{}.error.log", config.file_name))
                .build(&config.dir)?;

            builder
                .with_writer(std::io::stdout.and(error_file.with_max_level(Level::ERROR)))
                .try_init()
        } else {
            builder.try_init()
        };

        // a subscriber installed earlier (tests, host application) wins
        if let Err(e) = installed {
            tracing::debug!("structured logger already installed: {}", e);
        }

        Ok(())
    }

    pub fn log_error(error: &str, request_id: Option<&str>) {
        let request_id = request_id.unwrap_or("MAIN");
        tracing::error!(
            request_id = request_id,
            logged_at = %Self::timestamp(),
            "{}",
            error
        );
    }

    pub fn log_warning(message: &str, request_id: Option<&str>) {
        let request_id = request_id.unwrap_or("MAIN");
        tracing::warn!(
            request_id = request_id,
            logged_at = %Self::timestamp(),
            "{}",
            message
        );
    }

    pub fn log_info(message: &str, request_id: Option<&str>, additional_data: Option<Value>) {
        let request_id = request_id.unwrap_or("MAIN");
        let extra = additional_data
            .map(Self::flatten_extra)
            .unwrap_or_default();

        tracing::info!(
            request_id = request_id,
            logged_at = %Self::timestamp(),
            extra = %extra,
            "{}",
            message
        );
    }

    fn flatten_extra(data: Value) -> String {
        match data {
            object @ Value::Object(_) => object.to_string(),
            Value::Null => String::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Value::Object(map).to_string()
            }
        }
    }

    /// Whether `logged_at` fields use local time instead of UTC.
    pub fn uses_local_time() -> bool {
        LOCAL_TIME.read().map(|local_time| *local_time).unwrap_or(false)
    }

    fn timestamp() -> String {
        if Self::uses_local_time() {
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
        } else {
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
        }
    }
}
