//! Command-line driver for the Baokim B2B gateway client.
//!
//! Runs one gateway operation per invocation and prints the classified
//! result as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Generate a merchant key pair to register with the gateway
//! baokim keygen --out-dir keys
//!
//! # Obtain a bearer token
//! baokim token
//!
//! # Create and look up an order
//! baokim order create --order-id ORD-1 --amount 100000 --description "Test order"
//! baokim order query --order-id ORD-1
//!
//! # Create a single-use virtual account
//! baokim va create-dynamic --name "SHOP" --order-id ORD-2 --amount 250000
//! ```
//!
//! # Environment Variables
//!
//! - `BAOKIM_CONFIG` - Path to TOML configuration file (default: `baokim.toml`)
//! - `BAOKIM_BASE_URL` - Override the gateway base URL
//! - `BAOKIM_TIMEOUT_MS` - Override the request timeout
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

use std::path::PathBuf;
use std::process::ExitCode;

use baokim::keys::{DEFAULT_KEY_BITS, generate_key_pair, write_key_pair};
use baokim::token::redact;
use baokim::{ApiResult, GatewayConfig};
use baokim_http::BaokimClient;
use baokim_http::order::{CreateOrder, CustomerInfo, PaymentMethod};
use baokim_http::va::VaTransactionQuery;
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value, json};

/// Signed-request client for the Baokim B2B payment gateway.
#[derive(Debug, Parser)]
#[command(name = "baokim", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "BAOKIM_CONFIG", default_value = baokim::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Request a bearer token and show its expiry
    Token {
        /// Ignore any cached token
        #[arg(long)]
        force: bool,
    },

    /// Order API (Basic Pro)
    Order {
        #[command(subcommand)]
        action: OrderCommand,
    },

    /// Virtual account API (host to host)
    Va {
        #[command(subcommand)]
        action: VaCommand,
    },

    /// Generate an RSA key pair to register with the gateway
    Keygen {
        /// Directory for `merchant_private.pem` and `merchant_public.pem`
        #[arg(long, default_value = "keys")]
        out_dir: PathBuf,

        /// Modulus size
        #[arg(long, default_value_t = DEFAULT_KEY_BITS)]
        bits: usize,
    },
}

#[derive(Debug, Subcommand)]
enum OrderCommand {
    /// Create a payment order
    Create(CreateOrderArgs),

    /// Look up an order
    Query {
        /// Merchant order id
        #[arg(long)]
        order_id: String,
    },

    /// Refund an order
    Refund {
        /// Merchant order id
        #[arg(long)]
        order_id: String,

        /// Amount to refund (VND)
        #[arg(long)]
        amount: u64,

        /// Refund description
        #[arg(long)]
        description: Option<String>,
    },

    /// Cancel an auto-debit agreement
    CancelAutoDebit {
        /// Auto-debit token from the registration webhook
        #[arg(long)]
        token: String,

        /// Redirect after success
        #[arg(long)]
        url_success: Option<String>,

        /// Redirect after failure
        #[arg(long)]
        url_fail: Option<String>,
    },
}

#[derive(Debug, Args)]
struct CreateOrderArgs {
    /// Merchant order id
    #[arg(long)]
    order_id: String,

    /// Amount (VND)
    #[arg(long)]
    amount: u64,

    /// Order description
    #[arg(long)]
    description: String,

    /// Payment method code (1 = VA, 6 = VNPay QR, 22 = auto-debit)
    #[arg(long)]
    payment_method: Option<u8>,

    /// Customer name
    #[arg(long, requires_all = ["customer_email", "customer_phone"])]
    customer_name: Option<String>,

    /// Customer email
    #[arg(long)]
    customer_email: Option<String>,

    /// Customer phone
    #[arg(long)]
    customer_phone: Option<String>,
}

#[derive(Debug, Subcommand)]
enum VaCommand {
    /// Create a single-use VA for a fixed amount
    CreateDynamic {
        /// Account holder name
        #[arg(long)]
        name: String,

        /// Merchant order id
        #[arg(long)]
        order_id: String,

        /// Amount to collect (VND)
        #[arg(long)]
        amount: u64,

        /// Description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Create a reusable VA
    CreateStatic {
        /// Account holder name
        #[arg(long)]
        name: String,

        /// Merchant order id
        #[arg(long)]
        order_id: String,

        /// Description
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Update a VA
    Update {
        /// Virtual account number
        #[arg(long)]
        acc_no: String,

        /// Field to change, as `key=value` (repeatable)
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },

    /// Look up VA transactions
    Query {
        /// Virtual account number
        #[arg(long)]
        acc_no: Option<String>,

        /// Merchant order id
        #[arg(long)]
        order_id: Option<String>,

        /// Range start, `YYYY-MM-DD HH:MM:SS`
        #[arg(long)]
        from: Option<String>,

        /// Range end, `YYYY-MM-DD HH:MM:SS`
        #[arg(long)]
        to: Option<String>,
    },
}

/// Parses `key=value`; the value is JSON when it parses, else a string.
fn parse_field(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok((key.to_owned(), value))
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            report_error(e.as_ref());
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "telemetry")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(not(feature = "telemetry"))]
const fn init_tracing() {}

#[cfg(feature = "telemetry")]
fn report_error(e: &dyn std::error::Error) {
    tracing::error!("Gateway command failed: {e}");
}

#[cfg(not(feature = "telemetry"))]
#[allow(clippy::print_stderr)]
fn report_error(e: &dyn std::error::Error) {
    eprintln!("Gateway command failed: {e}");
}

/// Returns whether the gateway reported success.
async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let result = match cli.command {
        Command::Keygen { out_dir, bits } => {
            keygen(&out_dir, bits).await?;
            return Ok(true);
        }
        Command::Token { force } => {
            run_token(&connect(&cli.config).await?, force).await?;
            return Ok(true);
        }
        Command::Order { action } => run_order(&connect(&cli.config).await?, action).await?,
        Command::Va { action } => run_va(&connect(&cli.config).await?, action).await?,
    };

    print_json(&serde_json::to_value(&result)?)?;
    Ok(result.success)
}

async fn connect(config_path: &std::path::Path) -> Result<BaokimClient, Box<dyn std::error::Error>> {
    let config = GatewayConfig::load_from(config_path)?;
    Ok(BaokimClient::connect(config).await?)
}

async fn run_token(client: &BaokimClient, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    client.tokens().get_token(force).await?;
    let token = client
        .tokens()
        .cached_token()
        .ok_or("gateway returned no token")?;
    print_json(&json!({
        "token": redact(token.value()),
        "expires_at": token.expires_at().to_rfc3339(),
        "valid": client.tokens().is_token_valid(),
    }))
}

async fn run_order(
    client: &BaokimClient,
    action: OrderCommand,
) -> Result<ApiResult, Box<dyn std::error::Error>> {
    let orders = client.orders();
    let result = match action {
        OrderCommand::Create(args) => {
            let mut order = CreateOrder::new(args.order_id, args.amount, args.description);
            if let Some(code) = args.payment_method {
                let method = PaymentMethod::try_from(code)
                    .map_err(|code| format!("unknown payment method {code}"))?;
                order = order.with_payment_method(method);
            }
            if let (Some(name), Some(email), Some(phone)) =
                (args.customer_name, args.customer_email, args.customer_phone)
            {
                order = order.with_customer_info(CustomerInfo::new(name, email, phone));
            }
            orders.create_order(order).await?
        }
        OrderCommand::Query { order_id } => orders.query_order(&order_id).await?,
        OrderCommand::Refund {
            order_id,
            amount,
            description,
        } => {
            orders
                .refund_order(&order_id, amount, description.as_deref())
                .await?
        }
        OrderCommand::CancelAutoDebit {
            token,
            url_success,
            url_fail,
        } => {
            orders
                .cancel_auto_debit(&token, url_success.as_deref(), url_fail.as_deref())
                .await?
        }
    };
    Ok(result)
}

async fn run_va(
    client: &BaokimClient,
    action: VaCommand,
) -> Result<ApiResult, Box<dyn std::error::Error>> {
    let accounts = client.virtual_accounts();
    let result = match action {
        VaCommand::CreateDynamic {
            name,
            order_id,
            amount,
            description,
        } => {
            accounts
                .create_dynamic_va(&name, &order_id, amount, &description)
                .await?
        }
        VaCommand::CreateStatic {
            name,
            order_id,
            description,
        } => {
            accounts
                .create_static_va(&name, &order_id, &description)
                .await?
        }
        VaCommand::Update { acc_no, fields } => {
            let fields: Map<String, Value> = fields.into_iter().collect();
            accounts.update_va(&acc_no, fields).await?
        }
        VaCommand::Query {
            acc_no,
            order_id,
            from,
            to,
        } => {
            let query = VaTransactionQuery {
                acc_no,
                mrc_order_id: order_id,
                from_date: from,
                to_date: to,
            };
            accounts.query_transaction(&query).await?
        }
    };
    Ok(result)
}

async fn keygen(out_dir: &std::path::Path, bits: usize) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(out_dir).await?;
    let private_path = out_dir.join("merchant_private.pem");
    let public_path = out_dir.join("merchant_public.pem");
    let pair = generate_key_pair(bits)?;
    write_key_pair(&pair, &private_path, &public_path).await?;

    #[cfg(feature = "telemetry")]
    tracing::info!(
        private_key = %private_path.display(),
        public_key = %public_path.display(),
        bits,
        "Generated key pair; register the public key with the gateway"
    );

    print_json(&json!({
        "private_key_path": private_path.display().to_string(),
        "public_key_path": public_path.display().to_string(),
        "public_key": pair.public_pem,
    }))
}

#[allow(clippy::print_stdout)]
fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
