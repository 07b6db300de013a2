//! Sign-in commands.

use std::io::{BufRead, Write};

use bookstore_storefront::Storefront;
use secrecy::SecretString;
use tracing::info;

use super::CommandError;

/// Sign in and report the account's cart.
///
/// Prompts for the password on stderr and reads it from stdin when it is not
/// given on the command line.
///
/// # Errors
///
/// Returns an error if the password cannot be read or sign-in fails.
#[allow(clippy::print_stdout)]
pub async fn login(
    storefront: &Storefront,
    email: &str,
    password: Option<String>,
) -> Result<(), CommandError> {
    let password = match password {
        Some(password) => SecretString::from(password),
        None => read_password()?,
    };

    storefront.login(email, password).await?;

    let cart = storefront.cart();
    info!(items = cart.total_items(), "Loaded account cart");
    println!("Signed in as {email}");
    println!("Cart: {} item(s)", cart.total_items());
    Ok(())
}

/// Sign out and report the guest cart.
///
/// # Errors
///
/// Returns an error if the stored token cannot be removed.
#[allow(clippy::print_stdout)]
pub async fn logout(storefront: &Storefront) -> Result<(), CommandError> {
    storefront.logout().await?;
    println!("Signed out");
    println!("Guest cart: {} item(s)", storefront.cart().total_items());
    Ok(())
}

fn read_password() -> Result<SecretString, CommandError> {
    let mut stderr = std::io::stderr();
    write!(stderr, "Password: ")?;
    stderr.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::from(line.trim_end_matches(['\r', '\n']).to_owned()))
}
