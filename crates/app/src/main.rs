use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lingua_core::model::{CourseId, UserId};
use services::{AppServices, Clock, FeedbackConfig};

mod http;
mod seed;

/// Lesson progress tracking backend.
#[derive(Debug, Parser)]
#[command(name = "lingua")]
#[command(version)]
struct Cli {
    /// SQLite database URL or path
    #[arg(long, global = true, env = "LINGUA_DB_URL", default_value = "sqlite://lingua.sqlite3")]
    db: String,

    /// Log filter, e.g. `info` or `services=debug,tower_http=debug`
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "LINGUA_BIND", default_value = "127.0.0.1:8787")]
        bind: SocketAddr,
    },
    /// Upsert the demo catalog
    Seed,
    /// Print a learner's completion percentage for one course
    Progress {
        #[arg(long)]
        user: UserId,
        #[arg(long)]
        course: CourseId,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let db_url = normalize_sqlite_url(&cli.db);
    let services = AppServices::new_sqlite(&db_url, Clock::system(), FeedbackConfig::from_env())
        .await
        .with_context(|| format!("failed to open {db_url}"))?;

    match cli.command {
        Command::Serve { bind } => http::serve(services, bind).await?,
        Command::Seed => {
            let report = seed::seed_demo_catalog(&services).await?;
            println!(
                "seeded {} courses, {} lessons, {} materials",
                report.courses, report.lessons, report.materials
            );
        }
        Command::Progress { user, course } => {
            let progress = services
                .progress()
                .compute_course_progress(user, course)
                .await?;
            println!(
                "{}% ({}/{} lessons)",
                progress.percent, progress.completed_lessons, progress.total_lessons
            );
        }
    }

    Ok(())
}

/// Turn a bare path into an absolute `sqlite://` URL that creates the file on
/// first use. Full URLs pass through untouched.
fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("sqlite::memory:") || trimmed.starts_with("sqlite:file:") {
        return trimmed.to_string();
    }

    let rest = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let (path_str, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!(
        "sqlite://{}?{}",
        absolute.display(),
        query.unwrap_or("mode=rwc")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_pass_through() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:file:demo?mode=memory&cache=shared"),
            "sqlite:file:demo?mode=memory&cache=shared"
        );
    }

    #[test]
    fn relative_paths_become_absolute_and_creatable() {
        let url = normalize_sqlite_url("sqlite://lingua.sqlite3");
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("lingua.sqlite3?mode=rwc"));

        let url = normalize_sqlite_url("/tmp/lingua.db?mode=ro");
        assert_eq!(url, "sqlite:///tmp/lingua.db?mode=ro");
    }

    #[test]
    fn cli_parses_progress_command() {
        let user = UserId::random();
        let cli = Cli::try_parse_from([
            "lingua",
            "--db",
            "sqlite::memory:",
            "progress",
            "--user",
            &user.to_string(),
            "--course",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.db, "sqlite::memory:");
        match cli.command {
            Command::Progress { user: parsed, course } => {
                assert_eq!(parsed, user);
                assert_eq!(course, CourseId::new(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
