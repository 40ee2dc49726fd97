use crate::config::generate::generate_starter_config;
use std::fs;
use std::path::PathBuf;

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    // Prefer ~/.config/floe/config.yml, fall back to /etc/floe/config.yml.
    let config_path = dirs::home_dir()
        .map(|home| home.join(".config/floe/config.yml"))
        .unwrap_or_else(|| PathBuf::from("/etc/floe/config.yml"));

    if config_path.exists() {
        eprintln!(
            "Error: Config file already exists at {}",
            config_path.display()
        );
        eprintln!("Remove it first or use --stdout to print the config");
        std::process::exit(1);
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, config_content)?;
    println!("Wrote starter config to {}", config_path.display());
    println!("Edit it (bucket name, credentials, database path) before running 'floe run'.");

    Ok(())
}
