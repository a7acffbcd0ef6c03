//! Session handlers: login, logout, whoami.

use secrecy::SecretString;

use autouni_api::rest::models::{User, UserRole};
use autouni_config::ConfigError;

use crate::cli::{GlobalOpts, LoginArgs};
use crate::config::Resolved;
use crate::error::CliError;
use crate::output;

use super::util;

fn role_label(role: UserRole) -> String {
    serde_json::to_value(role)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_else(|| "UNKNOWN".into())
}

fn user_detail(user: &User) -> String {
    [
        format!("ID:    {}", user.id),
        format!("Name:  {}", user.name),
        format!("Email: {}", user.email),
        format!("Role:  {}", role_label(user.role)),
    ]
    .join("\n")
}

/// Password from env / keyring / profile, else an interactive prompt.
fn password_for(resolved: &Resolved, email: &str) -> Result<SecretString, CliError> {
    match autouni_config::resolve_password(&resolved.profile, &resolved.profile_name) {
        Ok(password) => Ok(password),
        Err(ConfigError::NoCredentials { .. }) => {
            let raw = rpassword::prompt_password(format!("Password for {email}: "))?;
            if raw.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            Ok(SecretString::from(raw))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn login(args: LoginArgs, resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let email = args
        .email
        .or_else(|| resolved.profile.email.clone())
        .ok_or_else(|| CliError::Validation {
            field: "email".into(),
            reason: "pass --email or set email in the profile".into(),
        })?;
    let password = password_for(resolved, &email)?;

    let controller = util::controller(resolved)?;
    let user = controller.login(&email, &password).await?;
    tracing::info!(profile = %resolved.profile_name, user = %user.email, "logged in");

    if args.save {
        autouni_config::store_password(&resolved.profile_name, &password)?;
        if !global.quiet {
            eprintln!("Password stored in system keyring");
        }
    }

    let out = output::render_single(&global.output, &user, user_detail, |u| u.email.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn logout(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let controller = util::controller(resolved)?;
    if !controller.api().is_authenticated() {
        if !global.quiet {
            eprintln!("Not logged in");
        }
        return Ok(());
    }
    controller.logout().await?;
    if !global.quiet {
        eprintln!("Logged out");
    }
    Ok(())
}

pub async fn whoami(resolved: &Resolved, global: &GlobalOpts) -> Result<(), CliError> {
    let controller = util::controller(resolved)?;
    util::ensure_session(&controller)?;
    let user = controller.api().me().await?;
    let out = output::render_single(&global.output, &user, user_detail, |u| u.email.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_label_uses_wire_name() {
        assert_eq!(role_label(UserRole::Coordinator), "COORDINATOR");
    }
}
