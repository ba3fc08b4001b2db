//! Command tree of the `typed-wallet` binary.

mod amount;
mod config;
mod wallet;

use std::path::PathBuf;

use clap::{Arg, ArgMatches};
use typed_command_core::{CommandGroup, Context, RegistrationError};

use self::config::ConfigCmd;
use self::wallet::{SendCmd, ShowCmd};
use crate::config::WalletConfig;

/// Builds the full command tree. Fails only if a schema is malformed.
pub fn cli() -> Result<CommandGroup, RegistrationError> {
    let mut wallet = CommandGroup::new("wallet").with_about("Manage your wallet");
    wallet
        .register::<ShowCmd>("show", "Show wallet information")?
        .register_async::<SendCmd>("send", "Send XCH to an address")?;

    let mut cli = CommandGroup::new("typed-wallet")
        .with_about("Wallet commands built from typed schemas")
        .arg(
            Arg::new("root_path")
                .long("root-path")
                .value_name("PATH")
                .default_value(".")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Directory holding config.yaml"),
        )
        .setup(load_context);
    cli.register::<ConfigCmd>("config", "Show the loaded configuration")?
        .group(wallet);
    Ok(cli)
}

fn load_context(matches: &ArgMatches, context: &mut Context) -> anyhow::Result<()> {
    let root = matches
        .get_one::<PathBuf>("root_path")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let config = WalletConfig::load_or_default(&root)?;
    config.apply_to(&root, context)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_registers() {
        let cli = cli().unwrap();
        assert_eq!(cli.entry_names(), vec!["config", "wallet"]);

        let wallet = cli.subgroup("wallet").unwrap();
        assert!(!wallet.dispatcher("show").unwrap().is_async());
        assert!(wallet.dispatcher("send").unwrap().is_async());
        assert!(cli.dispatcher("config").unwrap().needs_context());
    }

    #[test]
    fn test_help_lists_nested_send_flags() {
        let mut cmd = cli().unwrap().command();
        let help = cmd
            .find_subcommand_mut("wallet")
            .and_then(|wallet| wallet.find_subcommand_mut("send"))
            .unwrap()
            .render_long_help()
            .to_string();

        for flag in ["--amount", "--address", "--fee", "--reuse", "--min-coin-amount", "--exclude-coin-id"] {
            assert!(help.contains(flag), "{flag} missing:\n{help}");
        }
    }
}
