use crate::{
    cli::actions::Action,
    collectors::{
        COLLECTOR_NAMES, Collector, all_factories,
        util::{self, set_excluded_databases},
    },
};
use anyhow::{Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Turn parsed arguments into the action to run.
///
/// # Errors
///
/// Returns an error if a required argument is missing.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    // Set once, read by the stats collector on every scrape.
    if set_excluded_databases(excluded_databases(matches)) {
        info!(excluded = ?util::excluded_databases(), "excluded databases");
    }

    run_action(matches)
}

fn run_action(matches: &ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .ok_or_else(|| anyhow!("Port is required. Please provide it using the --port flag."))?;

    // None means auto-detect
    let listen = matches.get_one::<String>("listen").cloned();

    let url = SecretString::from(
        matches
            .get_one::<String>("url")
            .cloned()
            .ok_or_else(|| anyhow!("URL is required. Please provide it using the --url flag."))?,
    );

    let timeout = matches
        .get_one::<u64>("timeout")
        .copied()
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow!("Timeout is required. Please provide it using the --timeout flag."))?;

    let queries_dir = matches.get_one::<PathBuf>("queries-dir").cloned();

    Ok(Action::Run {
        port,
        listen,
        url,
        timeout,
        collectors: get_enabled_collectors(matches),
        queries_dir,
    })
}

fn excluded_databases(matches: &ArgMatches) -> Vec<String> {
    let Some(names) = matches.get_many::<String>("exclude-databases") else {
        return Vec::new();
    };

    names
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collectors left on once the toggle flags are applied over each
/// collector's default.
#[must_use]
pub fn get_enabled_collectors(matches: &ArgMatches) -> Vec<String> {
    let factories = all_factories();
    let flag = |prefix: &str, name: &str| matches.get_flag(&format!("{prefix}{name}"));

    COLLECTOR_NAMES
        .iter()
        .filter(|name| match (flag("collector.", name), flag("no-collector.", name)) {
            (_, true) => false,
            (true, false) => true,
            (false, false) => factories
                .get(**name)
                .is_some_and(|factory| factory().enabled_by_default()),
        })
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn matches(args: &[&str]) -> ArgMatches {
        let mut argv = vec!["ravendb_exporter"];
        argv.extend_from_slice(args);
        commands::new().get_matches_from(argv)
    }

    #[test]
    fn test_get_enabled_collectors_defaults() {
        assert_eq!(get_enabled_collectors(&matches(&[])), vec!["stats".to_string()]);
    }

    #[test]
    fn test_get_enabled_collectors_explicit_enable() {
        let enabled = get_enabled_collectors(&matches(&["--collector.exporter"]));

        assert!(enabled.contains(&"stats".to_string()));
        assert!(enabled.contains(&"exporter".to_string()));
    }

    #[test]
    fn test_get_enabled_collectors_explicit_disable() {
        let enabled = get_enabled_collectors(&matches(&["--no-collector.stats"]));

        assert!(enabled.is_empty());
    }

    #[test]
    fn test_excluded_databases_are_trimmed() {
        let excluded = excluded_databases(&matches(&["--exclude-databases", " Archive , ,Temp"]));
        assert_eq!(excluded, vec!["Archive".to_string(), "Temp".to_string()]);
    }

    #[test]
    fn test_handler_builds_run_action() -> Result<()> {
        let action = temp_env::with_vars_unset(
            ["RAVENDB_URL", "RAVENDB_EXPORTER_QUERIES_DIR", "RAVENDB_EXPORTER_LISTEN"],
            || {
                run_action(&matches(&[
                    "--port",
                    "9555",
                    "--url",
                    "http://raven:8080",
                    "--timeout",
                    "3",
                    "--queries-dir",
                    "/tmp/queries",
                ]))
            },
        )?;

        let Action::Run {
            port,
            listen,
            timeout,
            collectors,
            queries_dir,
            ..
        } = action;

        assert_eq!(port, 9555);
        assert_eq!(listen, None);
        assert_eq!(timeout, Duration::from_secs(3));
        assert_eq!(collectors, vec!["stats".to_string()]);
        assert_eq!(queries_dir, Some(PathBuf::from("/tmp/queries")));
        Ok(())
    }
}
