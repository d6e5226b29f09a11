use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{generate_jwt, hash_password, verify_password, Claims};
use crate::config::SecurityConfig;
use crate::database::models::{NewUser, User, UserPatch, UserView};
use crate::database::{FieldFilter, Repository};
use crate::error::ApiError;
use crate::services::non_blank;

const NOT_FOUND: &str = "User not found.";
const BAD_CREDENTIALS: &str = "Invalid email or password.";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserView,
    pub token: String,
}

#[derive(Clone)]
pub struct UserService {
    users: Repository<User>,
    security: SecurityConfig,
}

impl UserService {
    pub fn new(users: Repository<User>, security: SecurityConfig) -> Self {
        Self { users, security }
    }

    pub async fn list(&self) -> Result<Vec<UserView>, ApiError> {
        let users = self.users.list(FieldFilter::all()).await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    pub async fn get(&self, id: &str) -> Result<UserView, ApiError> {
        self.users
            .get(id)
            .await?
            .map(UserView::from)
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<UserView, ApiError> {
        let (Some(email), Some(name), Some(password), Some(phone)) = (
            non_blank(request.email),
            non_blank(request.name),
            request.password.filter(|p| !p.is_empty()),
            non_blank(request.phone),
        ) else {
            return Err(ApiError::bad_request(
                "Email, name, password, and phone are required.",
            ));
        };

        if self.find_by_email(&email).await?.is_some() {
            return Err(ApiError::bad_request("Email already exists."));
        }

        let new = NewUser {
            email,
            name,
            password: hash_password(&password)?,
            phone,
            is_admin: request.is_admin.unwrap_or(false),
            is_super_admin: false,
        };
        let user = self.users.create(&new).await?;

        info!("Registered user {}", user.id);
        Ok(UserView::from(user))
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApiError> {
        let user = self
            .find_by_email(request.email.trim())
            .await?
            .filter(|user| verify_password(&request.password, &user.password))
            .ok_or_else(|| ApiError::unauthorized(BAD_CREDENTIALS))?;

        let token = generate_jwt(&Claims::for_user(&user, &self.security), &self.security)?;
        Ok(LoginResponse {
            user: UserView::from(user),
            token,
        })
    }

    /// Token for an existing account without a password check. Only reachable
    /// from the admin CLI.
    pub async fn issue_token(&self, email: &str) -> Result<String, ApiError> {
        let user = self
            .find_by_email(email.trim())
            .await?
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;
        Ok(generate_jwt(&Claims::for_user(&user, &self.security), &self.security)?)
    }

    pub async fn update(&self, id: &str, request: UpdateUserRequest) -> Result<UserView, ApiError> {
        let (Some(email), Some(name), Some(password), Some(phone)) = (
            non_blank(request.email),
            non_blank(request.name),
            request.password.filter(|p| !p.is_empty()),
            non_blank(request.phone),
        ) else {
            return Err(ApiError::bad_request(
                "Name, email, password, and phone are required.",
            ));
        };

        if let Some(existing) = self.find_by_email(&email).await? {
            if existing.id != id {
                return Err(ApiError::bad_request("Email already exists."));
            }
        }

        let patch = UserPatch {
            email: Some(email),
            name: Some(name),
            password: Some(hash_password(&password)?),
            phone: Some(phone),
            is_admin: request.is_admin,
        };

        self.users
            .update(id, &patch)
            .await?
            .map(UserView::from)
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    pub async fn delete(&self, id: &str) -> Result<UserView, ApiError> {
        self.users
            .delete(id)
            .await?
            .map(UserView::from)
            .ok_or_else(|| ApiError::not_found(NOT_FOUND))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        Ok(self.users.find_one(FieldFilter::all().eq("email", email)).await?)
    }
}
