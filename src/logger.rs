use std::{fs::File, path::PathBuf};

use anyhow::Context;
use time::{format_description::parse_borrowed, OffsetDateTime, UtcOffset};
use tracing::{subscriber::set_global_default, Level};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, FmtSubscriber};

/// Sends every `tracing` event to a new, timestamped log file in the current directory.
///
/// # Errors
/// Returned when the file cannot be created or a global subscriber is already set.
pub fn init_logger() -> anyhow::Result<PathBuf> {
    let file_name = PathBuf::from(get_log_file_name()?);
    let file = File::create(&file_name)
        .with_context(|| format!("could not create log file {}", file_name.display()))?;
    let writer = BoxMakeWriter::new(file);
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        local_offset,
        parse_borrowed::<2>("[year]-[month]-[day] [hour]:[minute]:[second]")?,
    );

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .with_thread_names(true)
        .with_timer(timer)
        .with_writer(writer)
        .finish();

    set_global_default(subscriber).context(
        "could not set global default tracing subscriber. Consider disabling logs if you are already setting a subscriber",
    )?;
    Ok(file_name)
}

fn get_log_file_name() -> anyhow::Result<String> {
    let format =
        parse_borrowed::<2>("[year]-[month]-[day]_[hour]:[minute]:[second]_training_log.txt")?;
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    Ok(now.format(&format)?)
}
