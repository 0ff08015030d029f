use crate::collectors::{COLLECTOR_NAMES, Collector, all_factories};
use clap::{Arg, ArgAction, Command};

/// Add a `--collector.<name>` / `--no-collector.<name>` pair per collector.
/// The last flag given wins.
pub fn add_collectors_args(cmd: Command) -> Command {
    let factories = all_factories();

    COLLECTOR_NAMES.iter().fold(cmd, |cmd, &name| {
        let enabled = factories
            .get(name)
            .is_some_and(|factory| factory().enabled_by_default());

        let (enable, disable) = toggle_args(name, enabled);
        cmd.arg(enable).arg(disable)
    })
}

fn toggle_args(name: &str, enabled_by_default: bool) -> (Arg, Arg) {
    let enable_id = leak(format!("collector.{name}"));
    let disable_id = leak(format!("no-collector.{name}"));

    let state = if enabled_by_default { "enabled" } else { "disabled" };

    let enable = Arg::new(enable_id)
        .long(enable_id)
        .help(leak(format!("Enable the {name} collector [default: {state}]")))
        .action(ArgAction::SetTrue)
        .default_value(if enabled_by_default { "true" } else { "false" });

    let disable = Arg::new(disable_id)
        .long(disable_id)
        .help(leak(format!("Disable the {name} collector")))
        .action(ArgAction::SetTrue)
        .overrides_with(enable_id);

    (enable, disable)
}

// clap ids and help built once at startup.
fn leak(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}
