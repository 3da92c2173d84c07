use anyhow::Context;
use clap::Parser;

use property_api::auth::{generate_jwt, Claims};
use property_api::config::AppConfig;
use property_api::database::models::UserId;

#[derive(Parser)]
#[command(name = "property-token")]
#[command(about = "Mint a bearer token for the property API (signs with the configured JWT_SECRET)")]
#[command(version)]
struct Cli {
    #[arg(long, help = "User id (UUID) to embed as the token's `id` claim")]
    user: UserId,

    #[arg(long, help = "Token lifetime in hours [default: JWT_EXPIRY_HOURS for the environment]")]
    hours: Option<u64>,

    #[arg(long, conflicts_with = "hours", help = "Omit the `exp` claim")]
    no_expiry: bool,
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let claims = if cli.no_expiry {
        Claims::without_expiry(cli.user)
    } else {
        Claims::issue(&config.security, cli.user, cli.hours)?
    };

    let token = generate_jwt(&config.security.jwt_secret, &claims)?;
    println!("{}", token);
    Ok(())
}
