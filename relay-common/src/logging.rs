use chrono::Utc;
use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    filter::FilterFn, fmt::time::FormatTime, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt, Layer,
};

struct Time;

impl FormatTime for Time {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let time = Utc::now();
        w.write_fmt(format_args!("{:?}", time.timestamp_micros()))
    }
}

/// Initialize the process-wide `tracing` subscriber, reading `LOG_LEVEL`
/// itself.
///
/// Level is taken from `LOG_LEVEL` (`warn`/`info`/`trace`, else `error`),
/// falling back to `trace` in debug builds and `info` in release builds.
/// Output is restricted to this workspace's own crates (anything targeting
/// `relay`) so dependency chatter doesn't drown out the notification
/// pipeline's own events.
pub fn init() {
    init_at(std::env::var("LOG_LEVEL").ok().as_deref());
}

/// As [`init`], but takes the level explicitly rather than reading
/// `LOG_LEVEL` itself — used by `relay::config::Config`, the one
/// entry point that's allowed to read environment variables.
pub fn init_at(level: Option<&str>) {
    let level = if let Some(level) = level {
        match level.to_ascii_lowercase().as_str() {
            "warn" => LevelFilter::WARN,
            "info" => LevelFilter::INFO,
            "trace" => LevelFilter::TRACE,
            _ => LevelFilter::ERROR,
        }
    } else if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::Registry::default()
        .with(
            (if cfg!(debug_assertions) {
                tracing_subscriber::fmt::layer()
            } else {
                tracing_subscriber::fmt::layer()
                    .with_file(false)
                    .with_line_number(false)
            })
            .compact()
            .with_ansi(true)
            .with_timer(Time)
            .with_target(true)
            .with_level(true)
            .with_filter(level)
            .with_filter(FilterFn::new(|metadata| metadata.target().starts_with("relay"))),
        )
        .init();
}
