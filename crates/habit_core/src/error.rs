use thiserror::Error;

use crate::habit::HabitId;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Form-level problems. These are surfaced inline and never cross the store boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("select at least one day")]
    EmptySchedule,

    #[error("email must not be empty")]
    EmptyEmail,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("unknown {field} `{value}`")]
    UnknownValue { field: &'static str, value: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("email already registered")]
    AlreadyRegistered,

    #[error("not signed in")]
    NotSignedIn,

    #[error("identity provider error: {0}")]
    Provider(String),
}

impl AuthError {
    /// Maps a provider error code (or, failing that, its message) onto the fixed variants.
    pub fn from_provider(code: Option<&str>, message: &str) -> Self {
        match code {
            Some("invalid_credentials") => return Self::InvalidCredentials,
            Some("user_already_exists") | Some("email_exists") => return Self::AlreadyRegistered,
            _ => {}
        }
        if message == "Invalid login credentials" {
            Self::InvalidCredentials
        } else if message.contains("already registered") {
            Self::AlreadyRegistered
        } else {
            Self::Provider(message.to_string())
        }
    }

    /// Banner text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => {
                "The email or password you entered is incorrect. \
                 Please try again or sign up for a new account."
                    .to_string()
            }
            Self::AlreadyRegistered => {
                "This email is already registered. Please try signing in instead.".to_string()
            }
            Self::NotSignedIn => "Please sign in to continue.".to_string(),
            Self::Provider(message) => message.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("habit `{0}` not found")]
    NotFound(HabitId),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum HabitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HabitError {
    /// Text for the user-facing surface; auth failures get their friendly banner.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HabitError>;
