//! Localized help output for the CLI.
//!
//! Builds a clap `Command` with fully translated section headings,
//! subcommand descriptions, and argument help text.

use {clap::CommandFactory, rust_i18n::t, std::io};

use crate::Cli;

/// Supported locales for i18n.
pub(crate) const SUPPORTED_LOCALES: &[&str] = &["en", "zh-TW"];

/// Map a locale string onto one of [`SUPPORTED_LOCALES`].
///
/// - `zh_TW.UTF-8` -> `zh-TW`
/// - `zh`, `zh-CN`, `zh_HK` -> `zh-TW`
/// - `en_US.UTF-8`, `C`, `POSIX` and everything else -> `en`
pub(crate) fn match_locale(locale: &str) -> String {
    // Drop the encoding suffix and use BCP 47 separators
    let locale = locale.split('.').next().unwrap_or(locale);
    let locale = locale.replace('_', "-");

    if let Some(exact) = SUPPORTED_LOCALES
        .iter()
        .find(|supported| supported.eq_ignore_ascii_case(&locale))
    {
        return (*exact).to_string();
    }

    let lang_code = locale.split('-').next().unwrap_or(&locale);
    match lang_code.to_lowercase().as_str() {
        "zh" => "zh-TW".to_string(),
        _ => "en".to_string(),
    }
}

/// Detect the best matching locale from system settings.
pub(crate) fn detect_locale() -> String {
    let system_locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    match_locale(&system_locale)
}

/// Print localized help for the subcommand named in `raw_args`, or for the
/// top-level command.
pub(crate) fn print_localized_help(raw_args: &[String]) -> io::Result<()> {
    help_command_for(raw_args).print_help()
}

/// The localized command whose help `raw_args` asks for.
fn help_command_for(raw_args: &[String]) -> clap::Command {
    let app = build_localized_command();

    let found = raw_args.iter().skip(1).find_map(|token| {
        app.get_subcommands()
            .find(|s| s.get_name() == token.as_str())
            .cloned()
    });

    found.unwrap_or(app)
}

/// Build a clap `Command` with fully localized help output.
///
/// Uses clap as the single source of truth for structure (args, subcommands),
/// while replacing all user-visible text with translations from the locale
/// files.
pub(crate) fn build_localized_command() -> clap::Command {
    // Leak localized heading strings once (CLI runs once)
    let args_heading: &'static str =
        Box::leak(t!("help.arguments_heading").to_string().into_boxed_str());
    let opts_heading: &'static str =
        Box::leak(t!("help.options_heading").to_string().into_boxed_str());

    let tpl = format!(
        "{bin} {version}\n\n{about}\n\n\
         {usage_h}:\n  {usage}\n\n\
         {cmds_h}:\n{subcommands}\n\n\
         {all_args}\n\n\
         {after_help}\n",
        bin = "{bin}",
        version = "{version}",
        about = "{about}",
        usage_h = t!("help.usage_heading"),
        usage = "{usage}",
        cmds_h = t!("help.commands_heading"),
        subcommands = "{subcommands}",
        all_args = "{all-args}",
        after_help = "{after-help}",
    );

    let sub_tpl = format!(
        "{bin} {version}\n\n{about}\n\n\
         {usage_h}:\n  {usage}\n\n\
         {all_args}\n",
        bin = "{bin}",
        version = "{version}",
        about = "{about}",
        usage_h = t!("help.usage_heading"),
        usage = "{usage}",
        all_args = "{all-args}",
    );

    let place = move |arg: clap::Arg| {
        let arg = localize_arg(arg);
        if arg.get_short().is_none() && arg.get_long().is_none() {
            arg.help_heading(args_heading)
        } else {
            arg.help_heading(opts_heading)
        }
    };

    Cli::command()
        .help_template(&tpl)
        .about(t!("app.about").to_string())
        .after_help(t!("app.after_help").to_string())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            clap::Arg::new("help")
                .short('h')
                .long("help")
                .help(t!("arg.help_flag.help").to_string())
                .action(clap::ArgAction::Help)
                .global(true),
        )
        .arg(
            clap::Arg::new("version")
                .short('V')
                .long("version")
                .help(t!("arg.version_flag.help").to_string())
                .action(clap::ArgAction::Version)
                .global(true),
        )
        .mut_args(place)
        .mut_subcommands(move |sub| {
            let name = sub.get_name().to_string();
            let about_key = format!("cmd.{}.about", name.replace('-', "_"));
            let localized = t!(&about_key).to_string();
            let sub = if localized != about_key {
                sub.about(localized)
            } else {
                sub
            };
            sub.help_template(sub_tpl.clone()).mut_args(place)
        })
        .disable_help_subcommand(true)
        .subcommand(clap::Command::new("help").about(t!("cmd.help.about").to_string()))
}

/// Replace an arg's help text with its localized version if available.
///
/// Looks up `arg.<id>.help` in the current locale. If found, replaces the
/// arg's help text; otherwise keeps the original (English from doc comments).
pub(crate) fn localize_arg(arg: clap::Arg) -> clap::Arg {
    let key = format!("arg.{}.help", arg.get_id().as_str());
    let localized = t!(&key).to_string();
    if localized != key { arg.help(localized) } else { arg }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_chinese_variants() {
        assert_eq!(match_locale("zh_TW.UTF-8"), "zh-TW");
        assert_eq!(match_locale("zh-TW"), "zh-TW");
        assert_eq!(match_locale("zh-tw"), "zh-TW");
        assert_eq!(match_locale("zh_CN.UTF-8"), "zh-TW");
        assert_eq!(match_locale("zh"), "zh-TW");
    }

    #[test]
    fn test_locale_english_variants() {
        assert_eq!(match_locale("en_US.UTF-8"), "en");
        assert_eq!(match_locale("en_GB"), "en");
        assert_eq!(match_locale("en"), "en");
    }

    #[test]
    fn test_locale_posix_and_unsupported_fallback() {
        assert_eq!(match_locale("C"), "en");
        assert_eq!(match_locale("POSIX"), "en");
        assert_eq!(match_locale("C.UTF-8"), "en");
        assert_eq!(match_locale("de_DE.UTF-8"), "en");
        assert_eq!(match_locale("ja_JP"), "en");
    }

    #[test]
    fn test_build_localized_command_has_subcommands() {
        rust_i18n::set_locale("en");
        let cmd = build_localized_command();
        assert_eq!(cmd.get_name(), "flashcheck");
        let names: Vec<_> = cmd
            .get_subcommands()
            .map(|s| s.get_name().to_string())
            .collect();
        for expected in ["test", "list-ports", "completions", "help"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_help_command_for_picks_subcommand() {
        rust_i18n::set_locale("en");
        assert_eq!(
            help_command_for(&args(&["flashcheck", "test", "--help"])).get_name(),
            "test"
        );
        assert_eq!(
            help_command_for(&args(&["flashcheck", "-h"])).get_name(),
            "flashcheck"
        );
    }

    struct ClosedPipe;

    impl io::Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_help_write_failure_is_reported() {
        rust_i18n::set_locale("en");
        let mut cmd = help_command_for(&args(&["flashcheck", "--help"]));
        let err = cmd.write_help(&mut ClosedPipe).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_localize_arg_unknown_key_keeps_help() {
        let arg = clap::Arg::new("nonexistent_arg_xyz").help("keep this");
        let help = localize_arg(arg)
            .get_help()
            .map(ToString::to_string)
            .unwrap_or_default();
        assert_eq!(help, "keep this");
    }

    #[test]
    fn test_localize_arg_known_key() {
        let arg = clap::Arg::new("firmware").help("original help");
        let help = localize_arg(arg)
            .get_help()
            .map(ToString::to_string)
            .unwrap_or_default();
        assert!(!help.is_empty());
        assert_ne!(help, "original help");
    }
}
