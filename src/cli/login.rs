use anyhow::{anyhow, Result};

use super::{ui, App, LoginArgs, SignupArgs};
use crate::auth::{FirebaseIdentity, IdentityUser, UserProfile};

fn identity_provider(app: &App) -> Result<FirebaseIdentity> {
    let key = app
        .config
        .identity_api_key
        .as_deref()
        .ok_or_else(|| anyhow!("Set CRM_IDENTITY_API_KEY to sign in with a password"))?;
    Ok(FirebaseIdentity::new(key))
}

/// Execute the login command
pub async fn run_login(app: &App, args: &LoginArgs) -> Result<()> {
    let user = match &args.id_token {
        Some(token) => {
            let identity = IdentityUser {
                email: args.email.clone(),
                display_name: args.name.clone(),
                id_token: token.clone(),
            };
            app.session
                .complete_federated(app.transport(), identity)
                .await?
        }
        None => {
            let provider = identity_provider(app)?;
            let password = match &args.password {
                Some(p) => p.clone(),
                None => ui::password("password:", false)?,
            };
            app.session
                .sign_in(&provider, &args.email, &password)
                .await?
        }
    };
    ui::status(&format!("Signed in as {}.", user.display_name()));
    Ok(())
}

pub async fn run_signup(app: &App, args: &SignupArgs) -> Result<()> {
    let provider = identity_provider(app)?;
    let profile = UserProfile {
        email: args.email.clone(),
        first_name: args.first_name.clone(),
        last_name: args.last_name.clone(),
    };
    let password = ui::password("password:", true)?;
    app.session
        .sign_up(&provider, app.transport(), &profile, &password)
        .await?;
    ui::status("Account created. Run `crmdesk login` to sign in.");
    Ok(())
}

pub fn run_logout(app: &App) -> Result<()> {
    app.session.sign_out()?;
    ui::status("Signed out.");
    Ok(())
}

pub fn run_whoami(app: &App) -> Result<()> {
    match app.session.handle().user() {
        Some(user) => ui::status(&format!("{} <{}>", user.display_name(), user.email)),
        None => ui::status("Not signed in."),
    }
    Ok(())
}
