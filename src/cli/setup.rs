use crate::credentials::{default_credentials_path, write_credentials_file, Credentials};
use dialoguer::{Confirm, Input, Password};
use std::io::{self, IsTerminal};

/// Prompt for an access id/key pair and store it for later exports.
pub fn setup() -> Result<(), Box<dyn std::error::Error>> {
    if !io::stdin().is_terminal() {
        return Err("setup requires a terminal (stdin is not a TTY)".into());
    }

    let path = default_credentials_path()
        .ok_or("cannot determine a home directory for the credentials file")?;

    if path.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!("Credentials already stored at {}. Replace them?", path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Keeping existing credentials.");
            return Ok(());
        }
    }

    let access_id: String = Input::new()
        .with_prompt("Access ID")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("access id cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let access_key = Password::new().with_prompt("Access key").interact()?;

    write_credentials_file(&path, &Credentials::new(access_id.trim(), access_key.trim()))?;
    println!("Credentials written to {}", path.display());
    Ok(())
}
