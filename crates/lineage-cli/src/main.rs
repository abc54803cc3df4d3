//! Lineage CLI
//!
//! Command-line interface for a locally persisted Lineage registry.
//!
//! Addresses are given either as 64 hex characters or as a plain label,
//! which is hashed into an address (`alice` is the same account on every
//! call).

use anyhow::Context;
use clap::{Parser, Subcommand};
use lineage_core::{Address, Amount, Currency};
use lineage_economics::CurrencyStrategy;
use lineage_node::config::{expand_path, LoggingConfig};
use lineage_node::{NodeConfig, RegistryService};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "lineage")]
#[command(author = "Lineage Registry Developers")]
#[command(version)]
#[command(about = "Lineage - hierarchical name registry with ancestor rewards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "lineage.toml", env = "LINEAGE_CONFIG")]
    config: PathBuf,

    /// Data directory (overrides the configuration)
    #[arg(short, long, global = true, env = "LINEAGE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration file and create an empty registry
    Init {
        /// Administrator address or label
        #[arg(long, value_parser = parse_address)]
        admin: Address,

        /// Currency strategy: native or dual
        #[arg(long, default_value = "native")]
        currency: CurrencyStrategy,

        /// Registration fee (native units, or token units under dual)
        #[arg(long)]
        fee: Option<Amount>,

        /// Ancestor reward (same unit as the fee)
        #[arg(long)]
        reward: Option<Amount>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Register a name, paying in native currency
    Register {
        name: String,

        /// Registering account
        #[arg(long, value_parser = parse_address)]
        caller: Address,

        /// Payment; defaults to the current quote
        #[arg(long)]
        payment: Option<Amount>,
    },

    /// Register a name, paying in tokens
    RegisterToken {
        name: String,

        #[arg(long, value_parser = parse_address)]
        caller: Address,
    },

    /// Show the holder of a name
    Holder { name: String },

    /// List registered names
    Names,

    /// Show registry status
    Status,

    /// Fee operations
    Fee {
        #[command(subcommand)]
        fee: FeeCommands,
    },

    /// Ancestor reward operations
    Reward {
        #[command(subcommand)]
        reward: RewardCommands,
    },

    /// Withdraw collected fees to the administrator
    WithdrawFees {
        #[arg(long, value_parser = parse_address)]
        caller: Address,

        /// native or token
        #[arg(long, default_value = "native")]
        currency: Currency,
    },

    /// Hand the administrator role to another account
    TransferAdmin {
        #[arg(long, value_parser = parse_address)]
        caller: Address,

        #[arg(value_parser = parse_address)]
        new_admin: Address,
    },

    /// Local token ledger operations
    Token {
        #[command(subcommand)]
        token: TokenCommands,
    },
}

#[derive(Subcommand)]
enum FeeCommands {
    /// Show the fee and the native amount `register` requires now
    Show,
    /// Change the registration fee
    Set {
        amount: Amount,
        #[arg(long, value_parser = parse_address)]
        caller: Address,
    },
}

#[derive(Subcommand)]
enum RewardCommands {
    /// Change the ancestor reward
    Set {
        amount: Amount,
        #[arg(long, value_parser = parse_address)]
        caller: Address,
    },
    /// Show an account's accrued rewards
    Balance {
        #[arg(value_parser = parse_address)]
        address: Address,
        #[arg(long, default_value = "native")]
        currency: Currency,
    },
    /// Withdraw the caller's accrued rewards
    Withdraw {
        #[arg(long, value_parser = parse_address)]
        caller: Address,
        #[arg(long, default_value = "native")]
        currency: Currency,
    },
}

#[derive(Subcommand)]
enum TokenCommands {
    /// Check balance
    Balance {
        #[arg(value_parser = parse_address)]
        address: Address,
    },
    /// Mint tokens to an account
    Mint {
        #[arg(value_parser = parse_address)]
        to: Address,
        amount: Amount,
    },
}

fn parse_address(value: &str) -> Result<Address, String> {
    let hex = value.strip_prefix("0x").unwrap_or(value);
    if hex.len() == 64 {
        return Address::from_hex(hex).map_err(|e| e.to_string());
    }
    if value.is_empty() {
        return Err("address must not be empty".to_string());
    }
    Ok(Address::from_label(value))
}

fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = logging.format == "json";

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(logging.color)
                .with_writer(std::io::stderr)
        }))
        .init();
}

fn load_config(path: &Path, data_dir: Option<&Path>) -> anyhow::Result<NodeConfig> {
    let mut config = NodeConfig::load(path)
        .with_context(|| format!("loading {} (run `lineage init` first)", path.display()))?;
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir.to_string_lossy().into_owned();
    }
    Ok(config)
}

/// TOML literal for an amount; values past `i64` go in as strings
fn toml_amount(amount: Amount) -> String {
    match i64::try_from(amount) {
        Ok(_) => amount.to_string(),
        Err(_) => format!("\"{amount}\""),
    }
}

fn config_template(admin: &Address, currency: CurrencyStrategy, fee: Amount, reward: Amount, data_dir: &str) -> String {
    let fee = toml_amount(fee);
    let reward = toml_amount(reward);
    format!(
        r#"[registry]
admin = "{admin}"
max_name_length = 32
strict_lookup = false

[fees]
currency = "{currency}"
registration_fee = {fee}
reward_amount = {reward}

[oracle]
price = 200000000000
decimals = 8

[token]
symbol = "USDX"
decimals = 6

[storage]
data_dir = "{data_dir}"

[logging]
level = "info"
format = "text"
"#
    )
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = expand_path(&cli.config);
    let data_dir = cli.data_dir.as_deref().map(expand_path);

    if let Commands::Init {
        admin,
        currency,
        fee,
        reward,
        force,
    } = &cli.command
    {
        init_logging(&LoggingConfig::default(), cli.verbose);
        if config_path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", config_path.display());
        }
        let defaults = NodeConfig::default();
        let data_dir = data_dir
            .map(|d| d.to_string_lossy().into_owned())
            .unwrap_or(defaults.storage.data_dir);
        let fee = fee.unwrap_or(defaults.fees.registration_fee);
        let reward = reward.unwrap_or(defaults.fees.reward_amount);

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&config_path, config_template(admin, *currency, fee, reward, &data_dir))?;

        let config = load_config(&config_path, None)?;
        let service = RegistryService::open(config)?;
        println!("Configuration written to {}", config_path.display());
        println!("State: {}", service.config().storage.state_path().display());
        print_json(&service.status())?;
        return Ok(());
    }

    let config = load_config(&config_path, data_dir.as_deref())?;
    init_logging(&config.logging, cli.verbose);
    let service = RegistryService::open(config)?;
    let registry = service.registry();

    match cli.command {
        Commands::Init { .. } => {}

        Commands::Register {
            name,
            caller,
            payment,
        } => {
            let payment = match payment {
                Some(payment) => payment,
                None => registry.quote_fee()?,
            };
            service.register(&caller, &name, payment)?;
            println!("Registered {} to {} (paid {})", name, caller, payment);
        }

        Commands::RegisterToken { name, caller } => {
            service.register_with_token(&caller, &name)?;
            println!(
                "Registered {} to {} (paid {} tokens)",
                name,
                caller,
                registry.current_fee()
            );
        }

        Commands::Holder { name } => match registry.holder_of(&name)? {
            Some(holder) => println!("{}", holder),
            None => println!("{} is not registered", name),
        },

        Commands::Names => {
            for (name, holder) in registry.registrations() {
                println!("{:<32} {}", name, holder);
            }
        }

        Commands::Status => print_json(&service.status())?,

        Commands::Fee { fee } => match fee {
            FeeCommands::Show => {
                println!("Registration fee: {}", registry.current_fee());
                println!("Reward amount: {}", registry.current_reward_amount());
                println!("Strategy: {}", registry.strategy());
                match registry.quote_fee() {
                    Ok(quote) => println!("Native payment required: {}", quote),
                    Err(err) => println!("Native payment required: unavailable ({})", err),
                }
            }
            FeeCommands::Set { amount, caller } => {
                service.change_fee(&caller, amount)?;
                println!("Registration fee set to {}", amount);
            }
        },

        Commands::Reward { reward } => match reward {
            RewardCommands::Set { amount, caller } => {
                service.change_reward_amount(&caller, amount)?;
                println!("Reward amount set to {}", amount);
            }
            RewardCommands::Balance { address, currency } => {
                println!("{}", registry.reward_balance_of(currency, &address));
            }
            RewardCommands::Withdraw { caller, currency } => {
                let amount = service.withdraw_reward(&caller, currency)?;
                println!("Withdrew {} {} reward to {}", amount, currency, caller);
            }
        },

        Commands::WithdrawFees { caller, currency } => {
            let amount = match currency {
                Currency::Native => service.withdraw_collected_fees(&caller)?,
                Currency::Token => service.withdraw_collected_token_fees(&caller)?,
            };
            println!("Withdrew {} {} in collected fees", amount, currency);
        }

        Commands::TransferAdmin { caller, new_admin } => {
            service.transfer_admin(&caller, new_admin)?;
            println!("Administrator is now {}", new_admin);
        }

        Commands::Token { token } => match token {
            TokenCommands::Balance { address } => {
                println!("{}", service.token_balance_of(&address)?);
            }
            TokenCommands::Mint { to, amount } => {
                let balance = service.mint_tokens(&to, amount)?;
                println!("Minted {} to {} (balance {})", amount, to, balance);
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_accepts_hex_and_labels() {
        let alice = Address::from_label("alice");
        assert_eq!(parse_address(&alice.to_hex()).unwrap(), alice);
        assert_eq!(parse_address(&format!("0x{}", alice.to_hex())).unwrap(), alice);
        assert_eq!(parse_address("alice").unwrap(), alice);
        assert!(parse_address("").is_err());
    }

    #[test]
    fn test_template_parses() {
        let admin = Address::from_label("admin");
        let text = config_template(&admin, CurrencyStrategy::Dual, 15_000_000, 1_000_000, "/tmp/lineage");
        let config = NodeConfig::from_toml(&text).unwrap();
        config.validate().unwrap();
        assert_eq!(config.admin().unwrap(), admin);
        assert_eq!(config.fees.currency, CurrencyStrategy::Dual);
    }

    #[test]
    fn test_init_template_opens_service() {
        let dir = tempfile::TempDir::new().unwrap();
        let admin = Address::from_label("admin");
        let data_dir = dir.path().join("data");
        let config_path = dir.path().join("lineage.toml");
        let text = config_template(
            &admin,
            CurrencyStrategy::Native,
            15,
            1,
            &data_dir.to_string_lossy(),
        );
        std::fs::write(&config_path, text).unwrap();

        let config = load_config(&config_path, None).unwrap();
        let service = RegistryService::open(config).unwrap();
        let alice = Address::from_label("alice");
        service.register(&alice, "com", 15).unwrap();

        let status = service.status();
        assert_eq!(status.admin, admin);
        assert_eq!(status.registration_fee, 15);
        assert_eq!(status.registrations, 1);
        assert!(data_dir.join("state.json").exists());
    }

    #[test]
    fn test_template_quotes_wide_amounts() {
        let admin = Address::from_label("admin");
        let fee = 20_000_000_000_000_000_000;
        let text = config_template(&admin, CurrencyStrategy::Native, fee, 1, "/tmp/lineage");
        let config = NodeConfig::from_toml(&text).unwrap();
        assert_eq!(config.fees.registration_fee, fee);
        assert_eq!(config.fees.reward_amount, 1);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "lineage", "reward", "withdraw", "--caller", "alice", "--currency", "token",
        ])
        .unwrap();
        match cli.command {
            Commands::Reward {
                reward: RewardCommands::Withdraw { caller, currency },
            } => {
                assert_eq!(caller, Address::from_label("alice"));
                assert_eq!(currency, Currency::Token);
            }
            _ => panic!("unexpected command"),
        }
    }
}
