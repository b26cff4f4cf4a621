//! User account use-case service.
//!
//! Credentials live outside this crate; users here are profile records.

use super::{repo_error_class, ErrorClass};
use crate::model::user::{normalize_email, User, UserId, UserRole};
use crate::model::{now_epoch_ms, ValidationError};
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

#[derive(Debug)]
pub enum UserServiceError {
    Validation(ValidationError),
    InvalidEmail(String),
    EmailTaken(String),
    UserNotFound(UserId),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl UserServiceError {
    pub fn error_class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) | Self::InvalidEmail(_) => ErrorClass::Client,
            Self::EmailTaken(_) => ErrorClass::Conflict,
            Self::UserNotFound(_) => ErrorClass::NotFound,
            Self::Repo(err) => repo_error_class(err),
            Self::InconsistentState(_) => ErrorClass::Server,
        }
    }
}

impl Display for UserServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidEmail(email) => write!(f, "invalid email address: `{email}`"),
            Self::EmailTaken(email) => write!(f, "email already in use: `{email}`"),
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent user state: {details}"),
        }
    }
}

impl Error for UserServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for UserServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "user", id } => Self::UserNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for UserServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Partial profile update. `bio: Some(None)` clears the bio.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub bio: Option<Option<String>>,
}

pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        role: UserRole,
    ) -> Result<User, UserServiceError> {
        let user = User::new(name, email, role, now_epoch_ms());
        user.validate()?;
        if !EMAIL_RE.is_match(&user.email) {
            return Err(UserServiceError::InvalidEmail(user.email));
        }
        if self.repo.get_user_by_email(&user.email)?.is_some() {
            return Err(UserServiceError::EmailTaken(user.email));
        }

        self.repo.create_user(&user).map_err(|err| match err {
            RepoError::Duplicate(_) => UserServiceError::EmailTaken(user.email.clone()),
            other => UserServiceError::from(other),
        })?;

        info!(
            "event=user_create module=service status=ok user_id={} role={}",
            user.id,
            user.role.as_str()
        );
        self.repo
            .get_user(user.id)?
            .ok_or(UserServiceError::InconsistentState(
                "created user not found in read-back",
            ))
    }

    pub fn get_user(&self, id: UserId) -> Result<User, UserServiceError> {
        self.repo
            .get_user(id)?
            .ok_or(UserServiceError::UserNotFound(id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self.repo.get_user_by_email(&normalize_email(email))?)
    }

    pub fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User, UserServiceError> {
        let mut user = self.get_user(id)?;
        if let Some(name) = patch.name {
            user.name = name.trim().to_string();
        }
        if let Some(bio) = patch.bio {
            user.bio = bio;
        }
        user.validate()?;
        user.updated_at = now_epoch_ms();
        self.repo.update_user(&user)?;

        info!("event=user_update module=service status=ok user_id={id}");
        self.get_user(id)
    }

    pub fn delete_user(&self, id: UserId) -> Result<(), UserServiceError> {
        self.repo.soft_delete_user(id)?;
        info!("event=user_delete module=service status=ok user_id={id}");
        Ok(())
    }
}
