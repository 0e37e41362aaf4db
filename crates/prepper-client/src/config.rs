//! Separates configuration flags from the subcommand.
//!
//! `ortho_config` owns the leading `--host`, `--port` and similar flags; the
//! remaining tokens are parsed by the `prepper` CLI definition.

use std::ffi::{OsStr, OsString};
use std::sync::Arc;

use ortho_config::OrthoError;

use prepper_config::Config;

/// Configuration flags understood by [`Config`]. They must precede the
/// subcommand.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--host",
    "--port",
    "--max-frame-bytes",
    "--request-timeout-secs",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, Arc<OrthoError>>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter(args.iter().cloned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Stop;
    }
    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Arguments split into the configuration part and the command part. Both
/// keep the program name in first position.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_arguments(args: &[OsString]) -> ArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ArgumentSplit {
            config_arguments: Vec::new(),
            command_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut remaining = rest.iter();
    let mut command_arguments = vec![program.clone()];
    while let Some(argument) = remaining.next() {
        match classify(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                if needs_value {
                    config_arguments.extend(remaining.next().cloned());
                }
            }
            FlagAction::Stop => {
                command_arguments.push(argument.clone());
                command_arguments.extend(remaining.cloned());
                break;
            }
        }
    }

    ArgumentSplit {
        config_arguments,
        command_arguments,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("--port", FlagAction::Include { needs_value: true })]
    #[case("--port=6000", FlagAction::Include { needs_value: false })]
    #[case("--unknown", FlagAction::Stop)]
    #[case("ping", FlagAction::Stop)]
    fn flags_are_classified(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify(OsStr::new(argument)), expected);
    }

    #[test]
    fn leading_configuration_flags_are_separated() {
        let split = split_arguments(&os(&[
            "prepper",
            "--host",
            "10.0.0.2",
            "--port=6000",
            "save",
            "1",
            "9",
        ]));
        assert_eq!(
            split.config_arguments,
            os(&["prepper", "--host", "10.0.0.2", "--port=6000"])
        );
        assert_eq!(split.command_arguments, os(&["prepper", "save", "1", "9"]));
    }

    #[test]
    fn flags_after_the_subcommand_stay_with_it() {
        let split = split_arguments(&os(&["prepper", "search", "x", "--port", "1"]));
        assert_eq!(split.config_arguments, os(&["prepper"]));
        assert_eq!(
            split.command_arguments,
            os(&["prepper", "search", "x", "--port", "1"])
        );
    }
}
