//! Registration, login and user maintenance on top of a [`UserStore`].

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::store::{UserStore, EMAIL_TAKEN};
use crate::auth::token::TokenKeys;
use crate::errors::{AppError, FieldErrors};
use crate::models::user::{NewUser, User, UserChanges, UserRow};
use crate::validation::{
    is_plausible_email, non_blank, normalize_email, push_error, too_long, too_long_message,
};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Successful login: the public user and a freshly signed token.
#[derive(Debug, Serialize)]
pub struct LoginOutcome {
    pub user: User,
    pub token: String,
}

struct ValidRegistration {
    name: String,
    email: String,
    password: String,
}

fn validate_registration(req: RegisterRequest) -> Result<ValidRegistration, AppError> {
    let mut errors = FieldErrors::new();

    let name = non_blank(req.name.as_deref()).map(str::to_string);
    match &name {
        None => push_error(&mut errors, "name", "Please enter your name."),
        Some(n) if too_long(n) => push_error(&mut errors, "name", too_long_message("Name")),
        Some(_) => {}
    }

    let email = non_blank(req.email.as_deref()).map(normalize_email);
    match &email {
        None => push_error(&mut errors, "email", "Please enter your email."),
        Some(e) if too_long(e) => push_error(&mut errors, "email", too_long_message("Email")),
        Some(e) if !is_plausible_email(e) => {
            push_error(&mut errors, "email", "Please enter a valid email address.")
        }
        Some(_) => {}
    }

    let password = req.password.filter(|p| !p.is_empty());
    match &password {
        None => push_error(&mut errors, "password", "Please enter a password."),
        Some(p) if p.chars().count() < MIN_PASSWORD_LEN => push_error(
            &mut errors,
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters."),
        ),
        Some(_) => {}
    }

    match (name, email, password) {
        (Some(name), Some(email), Some(password)) if errors.is_empty() => Ok(ValidRegistration {
            name,
            email,
            password,
        }),
        _ => Err(AppError::validation(
            "Missing or invalid fields. Failed to register.",
            errors,
        )),
    }
}

/// Creates a user after checking the email is free. Returns the user without its hash.
pub async fn register(store: &dyn UserStore, req: RegisterRequest) -> Result<User, AppError> {
    let valid = validate_registration(req)?;

    if store.find_by_email(&valid.email).await?.is_some() {
        info!("Registration rejected: email already registered");
        return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
    }

    let password_hash = hash_password(valid.password).await?;
    let row = store
        .insert(NewUser {
            name: valid.name,
            email: valid.email,
            password_hash,
        })
        .await?;

    info!("Registered user {}", row.id);
    Ok(User::from(row))
}

/// Returns the stored user when `password` matches its hash.
pub async fn verify_credentials(
    store: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<Option<UserRow>, AppError> {
    let Some(row) = store.find_by_email(&normalize_email(email)).await? else {
        return Ok(None);
    };
    let matches = verify_password(password.to_string(), row.password.clone()).await?;
    Ok(matches.then_some(row))
}

/// Checks credentials and issues a signed session token.
pub async fn login(
    store: &dyn UserStore,
    tokens: &TokenKeys,
    req: LoginRequest,
) -> Result<LoginOutcome, AppError> {
    let mut errors = FieldErrors::new();
    let email = non_blank(req.email.as_deref()).map(normalize_email);
    if email.is_none() {
        push_error(&mut errors, "email", "Please enter your email.");
    }
    let password = req.password.filter(|p| !p.is_empty());
    if password.is_none() {
        push_error(&mut errors, "password", "Please enter your password.");
    }
    let (Some(email), Some(password)) = (email, password) else {
        return Err(AppError::validation(
            "Please fill in all required fields.",
            errors,
        ));
    };

    let Some(row) = store.find_by_email(&email).await? else {
        info!("Login rejected: unknown email");
        return Err(AppError::Unauthorized("Email not registered".to_string()));
    };

    if !verify_password(password, row.password.clone()).await? {
        info!("Login rejected for user {}: password mismatch", row.id);
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let user = User::from(row);
    let token = tokens.issue(&user)?;
    info!("User {} logged in", user.id);
    Ok(LoginOutcome { user, token })
}

/// Updates the provided fields. A new password is re-hashed.
pub async fn update_user(
    store: &dyn UserStore,
    id: Uuid,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    let mut errors = FieldErrors::new();

    let name = match req.name.as_deref() {
        None => None,
        Some(raw) => match non_blank(Some(raw)) {
            Some(n) if too_long(n) => {
                push_error(&mut errors, "name", too_long_message("Name"));
                None
            }
            Some(n) => Some(n.to_string()),
            None => {
                push_error(&mut errors, "name", "Name cannot be empty.");
                None
            }
        },
    };

    let email = req.email.as_deref().map(normalize_email);
    match &email {
        Some(e) if too_long(e) => push_error(&mut errors, "email", too_long_message("Email")),
        Some(e) if !is_plausible_email(e) => {
            push_error(&mut errors, "email", "Please enter a valid email address.")
        }
        _ => {}
    }

    if let Some(p) = &req.password {
        if p.chars().count() < MIN_PASSWORD_LEN {
            push_error(
                &mut errors,
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters."),
            );
        }
    }

    if !errors.is_empty() {
        return Err(AppError::validation(
            "Invalid fields. Failed to update user.",
            errors,
        ));
    }

    let password_hash = match req.password {
        Some(p) => Some(hash_password(p).await?),
        None => None,
    };

    let row = store
        .update(
            id,
            UserChanges {
                name,
                email,
                password_hash,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {id} not found")))?;

    info!("Updated user {id}");
    Ok(User::from(row))
}

pub async fn delete_user(store: &dyn UserStore, id: Uuid) -> Result<(), AppError> {
    if !store.delete(id).await? {
        return Err(AppError::NotFound(format!("User {id} not found")));
    }
    info!("Deleted user {id}");
    Ok(())
}
