//! `wallet show` and `wallet send`.

use serde_json::json;
use typed_command_core::{
    AsyncCommand, Command, Context, async_trait, command_schema, option,
};

use super::amount::{AmountParamType, MOJO_PER_XCH};

pub const WALLET_TYPES: [&str; 4] = ["standard_wallet", "cat", "nft", "did_wallet"];

struct WalletInfo {
    id: u32,
    name: &'static str,
    kind: &'static str,
}

const WALLETS: [WalletInfo; 3] = [
    WalletInfo {
        id: 1,
        name: "Chia Wallet",
        kind: "standard_wallet",
    },
    WalletInfo {
        id: 2,
        name: "Spacebucks",
        kind: "cat",
    },
    WalletInfo {
        id: 3,
        name: "Profile 1",
        kind: "did_wallet",
    },
];

command_schema! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct ShowCmd {
        option fingerprint: Option<u32> = option(["-f", "--fingerprint"])
            .with_help("Fingerprint of the wallet key to use"),
        option wallet_type: Option<String> = option(["-w", "--wallet-type"])
            .with_choices(WALLET_TYPES)
            .with_help("Only show wallets of this type"),
    }
}

impl Command for ShowCmd {
    fn run(&self) -> anyhow::Result<()> {
        match self.fingerprint {
            Some(fingerprint) => println!("Wallet keys for fingerprint: {fingerprint}"),
            None => println!("Wallet keys for default fingerprint"),
        }

        let wallet_type = self.wallet_type.as_deref();
        for wallet in WALLETS
            .iter()
            .filter(|wallet| wallet_type.is_none_or(|kind| kind == wallet.kind))
        {
            println!("{}:", wallet.name);
            println!("   -Wallet ID: {}", wallet.id);
            println!("   -Type: {}", wallet.kind);
        }
        Ok(())
    }
}

command_schema! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct CoinSelectionConfig {
        option min_coin_amount: u64 = option(["--min-coin-amount", "--min-amount"])
            .with_param(AmountParamType)
            .with_default(0)
            .with_help("Ignore coins worth less than this much XCH"),
        option excluded_coin_ids: Vec<[u8; 32]> = option(["--exclude-coin-id"])
            .allow_multiple()
            .with_help("Exclude this coin from being spent"),
    }
}

command_schema! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct TransactionConfig {
        option fee: Option<u64> = option(["-m", "--fee"])
            .with_param(AmountParamType)
            .with_help("Set the fees for the transaction, in XCH"),
        option reuse: bool = option(["--reuse"])
            .with_help("Reuse an existing address for the change"),
        group coin_selection: CoinSelectionConfig,
    }
}

command_schema! {
    #[derive(Debug, Clone, PartialEq)]
    pub struct SendCmd {
        option fingerprint: Option<u32> = option(["-f", "--fingerprint"])
            .with_help("Fingerprint of the wallet key to use"),
        option amount: u64 = option(["-a", "--amount"])
            .required()
            .with_param(AmountParamType)
            .with_help("How much XCH to send"),
        option address: String = option(["-t", "--address"])
            .required()
            .with_help("Address to send the XCH to"),
        group tx: TransactionConfig,
        context context: Context,
    }
}

impl SendCmd {
    fn address_prefix(&self) -> &'static str {
        match self.context.get_str("network") {
            Some("mainnet") | None => "xch1",
            Some(_) => "txch1",
        }
    }

    fn fee(&self) -> u64 {
        self.tx.fee.unwrap_or_else(|| {
            self.context
                .get("default_fee")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(0)
        })
    }
}

#[async_trait]
impl AsyncCommand for SendCmd {
    async fn run(&self) -> anyhow::Result<()> {
        let prefix = self.address_prefix();
        anyhow::ensure!(
            self.address.starts_with(prefix),
            "address {} is not valid on this network, expected prefix {prefix}",
            self.address
        );
        anyhow::ensure!(self.amount > 0, "amount must be greater than zero");

        let coin_selection = &self.tx.coin_selection;
        if coin_selection.min_coin_amount > self.amount {
            anyhow::bail!(
                "min coin amount {} exceeds the amount to send",
                format_xch(coin_selection.min_coin_amount)
            );
        }

        // Stands in for the wallet RPC round trip.
        tokio::task::yield_now().await;
        tracing::debug!(amount = self.amount, fee = self.fee(), "Transaction assembled");

        let excluded: Vec<String> = coin_selection.excluded_coin_ids.iter().map(hex::encode).collect();
        let summary = json!({
            "fingerprint": self.fingerprint,
            "network": self.context.get_str("network").unwrap_or("mainnet"),
            "address": self.address,
            "amount_mojos": self.amount,
            "amount_xch": format_xch(self.amount),
            "fee_mojos": self.fee(),
            "reuse_puzhash": self.tx.reuse,
            "min_coin_amount": coin_selection.min_coin_amount,
            "excluded_coin_ids": excluded,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        Ok(())
    }
}

fn format_xch(mojos: u64) -> String {
    let whole = mojos / MOJO_PER_XCH;
    let fraction = mojos % MOJO_PER_XCH;
    if fraction == 0 {
        return whole.to_string();
    }
    let fraction = format!("{fraction:012}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}
