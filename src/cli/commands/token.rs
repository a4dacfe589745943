use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims, ROOT_ACCESS};
use crate::cli::{utils, OutputFormat};
use crate::config;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, default_value = "admin", help = "Login recorded in the token")]
    pub user: String,

    #[arg(long, default_value = ROOT_ACCESS, help = "Access level (root grants system administration)")]
    pub access: String,
}

/// Mint a token for `user` with the configured secret and expiry
pub fn mint(user: &str, access: &str) -> anyhow::Result<String> {
    let claims = Claims::new(user.to_string(), access.to_string(), Uuid::new_v4());
    Ok(generate_jwt(&claims, &config::config().security.jwt_secret)?)
}

pub async fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let token = mint(&args.user, &args.access)?;

    match output_format {
        OutputFormat::Json => utils::output_success(
            &output_format,
            "Token generated",
            Some(json!({ "token": token, "user": args.user, "access": args.access })),
        ),
        // Bare token so it can be captured by shell substitution
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
