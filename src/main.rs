// src/main.rs

use color_eyre::eyre::{Result, eyre};

use mailposture::analyze;
use mailposture::logging::initialize_logging;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    initialize_logging()?;

    let domain = std::env::args()
        .nth(1)
        .ok_or_else(|| eyre!("usage: mailposture <domain>"))?;

    let report = analyze(&domain).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
