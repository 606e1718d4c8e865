use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::PathBuf;

use card_ledger::{
    authenticate, choose_source, list_atms, list_cards, list_services, logging, open_store,
    owned_balance, pay_bill_multi_source, pay_bill_single_source, resolve_account_number,
    resolve_biller_name, seed_demo_data, setup_database, transfer_multi_source,
    transfer_single_source, AccountNumber, BankConfig, ClientId, SignIn,
    TransferReceipt,
};

const USAGE: &str = "usage: card-ledger <command>

commands:
  init [--seed]                                          create schema (and demo data)
  login <login> <secret>                                 check credentials
  balance <login> <secret> <account-number>              show one of your card balances
  cards <login> <secret>                                 list your cards
  atms                                                   list ATMs
  services                                               list billable services
  transfer <login> <secret> <receiver> <amount> [source] card-to-card transfer
  pay <login> <secret> <service> <amount> [source]       pay a bill

config: CARD_LEDGER_CONFIG=<file.json>, CARD_LEDGER_DB, CARD_LEDGER_SEED, CARD_LEDGER_LOG";

fn main() -> Result<()> {
    let config_path = env::var("CARD_LEDGER_CONFIG").ok().map(PathBuf::from);
    let config = BankConfig::load(config_path.as_deref())?;
    logging::init(&config.log_filter);

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let mut conn = open_store(&config.database_path, config.busy_timeout())?;
    setup_database(&conn)?;
    if config.seed_demo_data {
        seed_demo_data(&conn)?;
    }

    let result = match (command.as_str(), &args[1..]) {
        ("init", rest) => run_init(&conn, rest.iter().any(|a| a == "--seed")),
        ("login", [login, secret]) => run_login(&conn, login, secret),
        ("balance", [login, secret, number]) => run_balance(
            &conn,
            login,
            secret,
            parse_number(number, "account number")?,
        ),
        ("cards", [login, secret]) => run_cards(&conn, login, secret),
        ("atms", []) => run_atms(&conn),
        ("services", []) => run_services(&conn),
        ("transfer", [login, secret, receiver, amount, source @ ..]) if source.len() <= 1 => {
            run_transfer(
                &mut conn,
                login,
                secret,
                parse_number(receiver, "receiver")?,
                parse_number(amount, "amount")?,
                source.first().map(|s| parse_number(s, "source")).transpose()?,
            )
        }
        ("pay", [login, secret, service, amount, source @ ..]) if source.len() <= 1 => run_pay(
            &mut conn,
            login,
            secret,
            service,
            parse_number(amount, "amount")?,
            source.first().map(|s| parse_number(s, "source")).transpose()?,
        ),
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    if let Err(err) = &result {
        tracing::error!(command = %command, error = %err, "command failed");
    }
    result
}

fn parse_number(raw: &str, what: &str) -> Result<i64> {
    raw.parse()
        .with_context(|| format!("{} must be an integer, got {:?}", what, raw))
}

fn sign_in(conn: &Connection, login: &str, secret: &str) -> Result<ClientId> {
    match authenticate(conn, login, secret)? {
        SignIn::Authenticated { client_id } => Ok(client_id),
        SignIn::UnknownLogin => bail!("unknown login {:?}", login),
    }
}

fn print_receipt(receipt: &TransferReceipt) {
    println!("✓ Transfer {} committed", receipt.id);
    println!("  from {} -> {:?}, amount {}", receipt.source, receipt.target, receipt.amount);
}

fn run_init(conn: &Connection, seed: bool) -> Result<()> {
    if seed {
        seed_demo_data(conn)?;
        println!("✓ Demo data loaded");
    }
    println!("✓ Database ready");
    Ok(())
}

fn run_login(conn: &Connection, login: &str, secret: &str) -> Result<()> {
    let client_id = sign_in(conn, login, secret)?;
    println!("✓ Signed in as client {}", client_id);
    Ok(())
}

fn run_balance(conn: &Connection, login: &str, secret: &str, number: AccountNumber) -> Result<()> {
    let client_id = sign_in(conn, login, secret)?;
    let balance = owned_balance(conn, client_id, number)?;
    println!("Card {}: balance {}", number, balance);
    Ok(())
}

fn run_cards(conn: &Connection, login: &str, secret: &str) -> Result<()> {
    let client_id = sign_in(conn, login, secret)?;

    for card in list_cards(conn, client_id)? {
        println!(
            "{:>6}  {:<12} balance {:>12}  expires {:04}",
            card.account_number, card.holder_name, card.balance, card.expiry
        );
    }
    Ok(())
}

fn run_atms(conn: &Connection) -> Result<()> {
    for atm in list_atms(conn)? {
        println!("{:>4}  {}", atm.id, atm.address());
    }
    Ok(())
}

fn run_services(conn: &Connection) -> Result<()> {
    for service in list_services(conn)? {
        println!("{:>4}  {}", service.id, service.name);
    }
    Ok(())
}

fn run_transfer(
    conn: &mut Connection,
    login: &str,
    secret: &str,
    receiver: AccountNumber,
    amount: i64,
    source: Option<AccountNumber>,
) -> Result<()> {
    let client_id = sign_in(conn, login, secret)?;
    let receiver = resolve_account_number(conn, receiver)?;

    let receipt = match choose_source(conn, client_id, source)? {
        None => transfer_single_source(conn, client_id, receiver, amount)?,
        Some(payer) => transfer_multi_source(conn, payer, receiver, amount)?,
    };

    print_receipt(&receipt);
    Ok(())
}

fn run_pay(
    conn: &mut Connection,
    login: &str,
    secret: &str,
    service: &str,
    amount: i64,
    source: Option<AccountNumber>,
) -> Result<()> {
    let client_id = sign_in(conn, login, secret)?;
    let service = resolve_biller_name(conn, service)?;

    let receipt = match choose_source(conn, client_id, source)? {
        None => pay_bill_single_source(conn, &service, client_id, amount)?,
        Some(payer) => pay_bill_multi_source(conn, &service, payer, amount)?,
    };

    print_receipt(&receipt);
    Ok(())
}
