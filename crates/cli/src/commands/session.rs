//! Sign in, sign up and session inspection.

use std::io::Write;

use voltparts_storefront::Storefront;
use voltparts_storefront::error::add_breadcrumb;
use voltparts_storefront::services::RegisterRequest;

use super::{CliError, out};

pub async fn login(storefront: &Storefront, email: &str, password: &str) -> Result<(), CliError> {
    add_breadcrumb("auth", "login", None);
    let user = storefront.auth().login(email, password).await?;
    writeln!(out(), "Welcome back, {}!", user.first_name())?;
    Ok(())
}

pub async fn register(
    storefront: &Storefront,
    name: String,
    email: String,
    phone: Option<String>,
    password: String,
) -> Result<(), CliError> {
    add_breadcrumb("auth", "register", None);
    let user = storefront
        .auth()
        .register(RegisterRequest {
            name,
            email,
            phone,
            confirm_password: password.clone(),
            password,
        })
        .await?;
    writeln!(out(), "Account created. Welcome, {}!", user.first_name())?;
    Ok(())
}

pub fn logout(storefront: &Storefront) -> Result<(), CliError> {
    storefront.auth().logout()?;
    writeln!(out(), "Signed out")?;
    Ok(())
}

pub fn whoami(storefront: &Storefront) -> Result<(), CliError> {
    let mut out = out();
    match storefront.auth().current_user() {
        Some(user) => {
            writeln!(out, "{} <{}>", user.name, user.email)?;
            if let Some(phone) = &user.phone {
                writeln!(out, "Phone: {phone}")?;
            }
            if user.is_admin() {
                writeln!(out, "Role: admin")?;
            }
        }
        None => writeln!(out, "Not signed in")?,
    }
    Ok(())
}
