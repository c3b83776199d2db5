use std::fmt::Display;

use colored::Colorize;
use log::{Level, Metadata, SetLoggerError};

/// External crates only need to log warnings and errors
const ALLOWED_EXTERNAL_LEVELS: [Level; 2] = [Level::Warn, Level::Error];
const ALLOWED_LEVELS: [Level; 3] = [Level::Info, Level::Warn, Level::Error];

pub fn init_logger() -> Result<(), SetLoggerError> {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let target = Target::from_str(record.target());
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{:^5} {} {:^9} {}",
                level_to_string(&record.level()),
                now.format("%H:%M:%S").to_string().bright_black(),
                target,
                message
            ))
        })
        .filter(is_allowed)
        .chain(std::io::stdout())
        .apply()
}

fn is_allowed(meta: &Metadata) -> bool {
    let target = Target::from_str(meta.target());

    match target {
        // Only finished requests, the per request debug lines are noise
        Target::Http => meta.level() <= Level::Info,
        Target::External(_) => ALLOWED_EXTERNAL_LEVELS.contains(&meta.level()),
        _ => ALLOWED_LEVELS.contains(&meta.level()),
    }
}

#[derive(Debug, PartialEq)]
enum Target {
    External(String),
    Http,
    Server,
    Classroom,
    Core,
}

impl Target {
    fn from_str(str: &str) -> Self {
        let module = str.split("::").next().unwrap_or_default();

        match module {
            "tutor_core" | "ai_tutor" => Self::Core,
            "tutor_server" => Self::Server,
            "tutor_classroom" => Self::Classroom,
            "tower_http" => Self::Http,
            other => Target::External(other.to_string()),
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Target::External(x) => x.as_str().clear(),
            Target::Http => "HTTP".cyan(),
            Target::Server => "SERVER".bright_green(),
            Target::Classroom => "CLASSROOM".bright_purple(),
            Target::Core => "CORE".blue(),
        };

        Display::fmt(&result, f)
    }
}

fn level_to_string(level: &Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}

#[cfg(test)]
mod test {
    use log::MetadataBuilder;

    use super::*;

    fn meta(target: &str, level: Level) -> Metadata<'_> {
        MetadataBuilder::new().target(target).level(level).build()
    }

    #[test]
    fn test_targets() {
        assert_eq!(Target::from_str("tutor_server::errors"), Target::Server);
        assert_eq!(Target::from_str("tutor_classroom::db::pg"), Target::Classroom);
        assert_eq!(
            Target::from_str("tower_http::trace::on_response"),
            Target::Http
        );
        assert_eq!(
            Target::from_str("sqlx::query"),
            Target::External("sqlx".to_string())
        );
    }

    #[test]
    fn test_finished_requests_are_logged() {
        assert!(is_allowed(&meta("tower_http::trace::on_response", Level::Info)));
        assert!(!is_allowed(&meta("tower_http::trace::on_request", Level::Debug)));
        assert!(is_allowed(&meta("tower_http::trace::on_failure", Level::Error)));
    }

    #[test]
    fn test_external_crates_only_log_problems() {
        assert!(!is_allowed(&meta("sqlx::query", Level::Info)));
        assert!(is_allowed(&meta("hyper::proto", Level::Warn)));
        assert!(is_allowed(&meta("tutor_classroom::auth", Level::Info)));
        assert!(!is_allowed(&meta("tutor_server::errors", Level::Debug)));
    }
}
