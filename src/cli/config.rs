use crate::config::generate::generate_starter_config;
use crate::config::user_config_dir;
use std::fs;
use std::path::PathBuf;

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    let config_path = user_config_dir()
        .map(|dir| dir.join("config.yml"))
        .unwrap_or_else(|| PathBuf::from("/etc/sumo-export/config.yml"));

    if config_path.exists() {
        return Err(format!(
            "config file already exists at {}; remove it first or use --stdout to print the config",
            config_path.display()
        )
        .into());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&config_path, config_content)?;

    println!("Config file written to {}", config_path.display());
    Ok(())
}

pub fn validate(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.ok_or("No config file found. Use --config to specify a path.")?;

    println!("Validating config file: {}", path.display());

    crate::config::load_config(&path)?;
    println!("✓ Config is valid");
    Ok(())
}
