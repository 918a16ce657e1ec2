//! sharelink - mint capability share links from the gate configuration.
//!
//! Prints the link on stdout so it can be piped straight into whatever
//! delivers it. Everything else goes to stderr.

use chrono::Utc;
use sharegate::config::Config;
use sharegate_token::{ShareLink, TokenGenerator};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, subject, entitlement) = match args.as_slice() {
        [config, subject] => (config.as_str(), subject.as_str(), ""),
        [config, subject, entitlement] => {
            (config.as_str(), subject.as_str(), entitlement.as_str())
        }
        _ => {
            eprintln!("usage: sharelink <config.toml> <subject> [entitlement]");
            eprintln!();
            eprintln!("Without an entitlement the link grants access to every album,");
            eprintln!("with the shorter global validity window.");
            std::process::exit(2);
        }
    };

    let config = Config::load(config_path)?;
    let generator = TokenGenerator::new(&config.tokens.authentication_key_bytes()?);
    let link = ShareLink::mint(
        &generator,
        &config.server.public_url,
        subject,
        entitlement,
        Utc::now(),
    );

    let validity_days = if entitlement.is_empty() {
        config.tokens.global_validity_days
    } else {
        config.tokens.per_album_validity_days
    };
    eprintln!("share link for {subject}, valid {validity_days} days:");
    println!("{link}");

    Ok(())
}
