//! Minimal text ZapScript parser.
//!
//! Grammar: commands separated by `||`; an explicit command is
//! `**name:argtext`, bare text is an implicit `launch`. A trailing
//! `?key=value&key2=value2` group on the argtext becomes advanced args when
//! every pair parses as an identifier assignment; anything else (a URL
//! query string, say) stays part of the argument.

use std::collections::HashMap;

use super::{Command, Script};
use crate::error::ZapResult;

/// Current text schema version.
const SCHEMA_VERSION: i64 = 1;

fn is_adv_arg_group(group: &str) -> bool {
    !group.is_empty()
        && group.split('&').all(|pair| {
            pair.split_once('=').is_some_and(|(key, _)| {
                !key.is_empty()
                    && key
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
                    && key.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            })
        })
}

fn split_adv_args(argtext: &str) -> (String, HashMap<String, String>) {
    let Some(idx) = argtext.rfind('?') else {
        return (argtext.to_string(), HashMap::new());
    };
    let group = &argtext[idx + 1..];
    if !is_adv_arg_group(group) {
        return (argtext.to_string(), HashMap::new());
    }

    let adv = group
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect();
    (argtext[..idx].to_string(), adv)
}

fn parse_command(raw: &str) -> Command {
    let raw = raw.trim();
    let (name, argtext) = match raw.strip_prefix("**") {
        Some(explicit) => match explicit.split_once(':') {
            Some((name, argtext)) => (name.trim().to_ascii_lowercase(), argtext.trim()),
            None => {
                // Name-only command, possibly with adv args: `**stop?x=1`.
                let (name, adv) = split_adv_args(explicit.trim());
                return Command {
                    name: name.to_ascii_lowercase(),
                    args: Vec::new(),
                    adv_args: adv,
                };
            }
        },
        // Bare text is an implicit launch.
        None => ("launch".to_string(), raw),
    };

    let (arg, adv_args) = split_adv_args(argtext);
    let arg = arg.trim().to_string();
    let args = if arg.is_empty() { Vec::new() } else { vec![arg] };
    Command {
        name,
        args,
        adv_args,
    }
}

/// Parse a text script into its command sequence.
pub fn parse_script(text: &str) -> ZapResult<Script> {
    let commands = text
        .split("||")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(parse_command)
        .collect();

    Ok(Script {
        name: None,
        version: SCHEMA_VERSION,
        commands,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_command_with_arg() {
        let script = parse_script("**launch.system:snes").unwrap();
        assert_eq!(script.commands.len(), 1);
        assert_eq!(script.commands[0].name, "launch.system");
        assert_eq!(script.commands[0].args, vec!["snes"]);
    }

    #[test]
    fn bare_text_is_implicit_launch() {
        let script = parse_script("SNES/Mystic Quest").unwrap();
        assert_eq!(script.commands[0].name, "launch");
        assert_eq!(script.commands[0].args, vec!["SNES/Mystic Quest"]);
    }

    #[test]
    fn multiple_commands_in_order() {
        let script = parse_script("**launch.system:snes||**delay:500||**input.keyboard:f12").unwrap();
        let names: Vec<&str> = script.commands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["launch.system", "delay", "input.keyboard"]);
    }

    #[test]
    fn adv_args_parsed_from_suffix() {
        let script = parse_script("**launch:SNES/Mystic Quest?launcher=retroarch&system=SNES").unwrap();
        let cmd = &script.commands[0];
        assert_eq!(cmd.args, vec!["SNES/Mystic Quest"]);
        assert_eq!(cmd.adv_args.get("launcher").map(String::as_str), Some("retroarch"));
        assert_eq!(cmd.adv_args.get("system").map(String::as_str), Some("SNES"));
    }

    #[test]
    fn url_query_strings_stay_in_the_argument() {
        // `?q=1` would parse as an assignment, but `?q=1&x` would not;
        // either way a URL with a path query like `?id=abc-123` whose key
        // is valid is ambiguous, so the parser only strips the LAST group
        // and only when every pair is an assignment.
        let script = parse_script("**http.get:https://example.com/api?format=json&pretty").unwrap();
        let cmd = &script.commands[0];
        assert_eq!(cmd.args, vec!["https://example.com/api?format=json&pretty"]);
        assert!(cmd.adv_args.is_empty());
    }

    #[test]
    fn name_only_command() {
        let script = parse_script("**stop").unwrap();
        assert_eq!(script.commands[0].name, "stop");
        assert!(script.commands[0].args.is_empty());
    }

    #[test]
    fn empty_chunks_are_skipped() {
        let script = parse_script("**stop||  ||**delay:100").unwrap();
        assert_eq!(script.commands.len(), 2);
    }
}
