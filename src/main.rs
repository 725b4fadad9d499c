use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vinworth::models::{format_currency, ValuationRecord};
use vinworth::session::Session;
use vinworth::vin::is_valid_vin;

#[derive(Debug, Parser)]
#[command(name = "vinworth")]
#[command(about = "Look up a vehicle valuation by VIN")]
struct CliArgs {
    /// 17-character Vehicle Identification Number.
    #[arg(value_name = "VIN", value_parser = parse_vin_arg)]
    vin: String,

    /// Also generate a vehicle image for the resolved record.
    #[arg(long)]
    image: bool,
}

fn parse_vin_arg(input: &str) -> std::result::Result<String, String> {
    let candidate = input.trim();
    if is_valid_vin(candidate) {
        Ok(candidate.to_ascii_uppercase())
    } else {
        Err(
            "Invalid VIN. Expected 17 characters, letters (except I, O, Q) and numbers"
                .to_string(),
        )
    }
}

fn print_record(record: &ValuationRecord) {
    println!("{}", record.description());
    if let Some(trade_in) = record.trade_in_value {
        println!("  Trade-in value:  {}", format_currency(trade_in));
    }
    if let Some(retail) = record.retail_value {
        println!("  Retail value:    {}", format_currency(retail));
    }
    if let Some(cpo) = record.cpo_value {
        println!("  CPO value:       {}", format_currency(cpo));
    }
    println!("  Estimated value: {}", format_currency(record.estimated_value));
}

async fn run(session: &mut Session, args: &CliArgs) -> vinworth::Result<()> {
    let record = session.lookup(&args.vin).await?;
    print_record(&record);

    if args.image {
        match session.generate_image(&record).await? {
            Some(url) => println!("  Image:           {}", url),
            None => info!("Image generation was cancelled"),
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vinworth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();

    match Session::from_env() {
        Ok(mut session) => match run(&mut session, &args).await {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("Lookup failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to initialize session: {}", e);
            std::process::exit(1);
        }
    }
}
