use std::io::stdin;

use anyhow::{bail, Result};
use dialoguer::theme::ColorfulTheme;
use ftpgate_common::Secret;

/// Prompts for a password when attended, otherwise reads one line from stdin.
pub(crate) fn read_password(prompt: &str, confirm: bool) -> Result<Secret<String>> {
    if console::user_attended() {
        let theme = ColorfulTheme::default();
        let mut input = dialoguer::Password::with_theme(&theme).with_prompt(prompt);
        if confirm {
            input = input.with_confirmation(
                "Confirm password",
                "Passwords do not match, please try again.",
            );
        }
        return Ok(Secret::new(input.interact()?));
    }

    let mut input = String::new();
    stdin().read_line(&mut input)?;
    let password = input.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("No password given on stdin");
    }
    Ok(Secret::new(password.to_owned()))
}
