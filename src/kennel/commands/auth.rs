use crate::commands::{Actor, CmdMessage, CmdResult};
use crate::credentials::CredentialProvider;
use crate::error::{KennelError, Result};
use crate::model::{Account, Role};
use crate::prompt::Prompter;
use crate::repository::Repository;
use crate::session::SessionManager;
use crate::store::transport::Transport;
use tracing::info;

/// Input of the registration form.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub confirm: String,
    pub email: String,
}

/// The logged-in user, resolved against the current account table.
pub fn current_actor<T: Transport>(
    repo: &Repository<T>,
    sessions: &SessionManager,
) -> Option<Actor> {
    let session = sessions.current()?;
    let (username, account) = repo.find_account(&session.username)?;
    Some(Actor {
        username: username.to_string(),
        role: account.role,
    })
}

pub fn login<T: Transport>(
    repo: &Repository<T>,
    credentials: &dyn CredentialProvider,
    sessions: &SessionManager,
    username: &str,
    password: &str,
    token: Option<&str>,
    remember: bool,
) -> Result<CmdResult> {
    let (key, account) = repo
        .find_account(username)
        .filter(|(_, account)| account.password == password)
        .ok_or_else(|| KennelError::Auth("wrong username or password".to_string()))?;

    let token = token.map(str::trim).filter(|t| !t.is_empty());
    match account.role {
        Role::Admin => {
            let token = token.ok_or_else(|| {
                KennelError::Auth("administrators must provide a GitHub token".to_string())
            })?;
            credentials.set(token)?;
        }
        Role::Guest => credentials.clear()?,
    }

    let session = sessions.start(key, remember)?;
    info!(username = key, role = %account.role, "logged in");
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Welcome, {key}! Role: {}",
        account.role
    )));
    result.session = Some(session);
    Ok(result)
}

pub fn logout(credentials: &dyn CredentialProvider, sessions: &SessionManager) -> Result<CmdResult> {
    sessions.clear()?;
    credentials.clear()?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success("Logged out"));
    Ok(result)
}

pub fn register<T: Transport>(
    repo: &mut Repository<T>,
    form: Registration,
    prompter: &dyn Prompter,
) -> Result<CmdResult> {
    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();
    validate_registration(&username, &form.password, &form.confirm, &email)?;

    if repo.find_account(&username).is_some() {
        return Err(KennelError::Validation(format!(
            "user '{username}' already exists"
        )));
    }
    let role = if username.eq_ignore_ascii_case("admin") {
        Role::Admin
    } else {
        Role::Guest
    };
    repo.add_account(
        &username,
        Account {
            password: form.password,
            role,
            email,
        },
    )?;
    let outcome = repo.save(prompter)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Registered '{username}' ({role}). You can log in now"
    )));
    Ok(result.with_save(outcome))
}

fn validate_registration(username: &str, password: &str, confirm: &str, email: &str) -> Result<()> {
    if username.chars().count() < 3 {
        return Err(KennelError::Validation(
            "username must be at least 3 characters".to_string(),
        ));
    }
    if !is_valid_email(email) {
        return Err(KennelError::Validation(format!("'{email}' is not a valid email")));
    }
    let strong = password.chars().count() >= 6
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit());
    if !strong {
        return Err(KennelError::Validation(
            "password must be at least 6 characters with letters and digits".to_string(),
        ));
    }
    if password != confirm {
        return Err(KennelError::Validation("passwords do not match".to_string()));
    }
    Ok(())
}

/// `local@domain.tld`, no whitespace, a top-level part of two or more characters.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .filter(|(_, c)| *c == '.')
        .any(|(i, _)| i > 0 && domain[i + 1..].chars().count() >= 2)
}
