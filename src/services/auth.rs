// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, User},
};

const TOKEN_VALIDITY_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String) -> Self {
        Self { user_repo, jwt_secret }
    }

    pub async fn register_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        password: &str,
        company_name: &str,
    ) -> Result<String, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // bcrypt is CPU-bound, keep it off the runtime threads
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("password hashing task failed: {}", e))??;

        let new_user = self
            .user_repo
            .create_user(executor, email, &hashed_password, company_name)
            .await?;

        tracing::info!(user_id = %new_user.id, "operator registered");
        self.create_token(new_user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("password verification task failed: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn validate_token<'e, E>(&self, executor: E, token: &str) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let claims = self.decode_claims(token)?;

        self.user_repo
            .find_by_id(executor, claims.sub)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(token_data.claims)
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_VALIDITY_DAYS);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn service(secret: &str) -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        AuthService::new(UserRepository::new(pool), secret.to_string())
    }

    #[tokio::test]
    async fn issued_tokens_decode_to_the_same_user() {
        let auth = service("s3cret");
        let user_id = Uuid::new_v4();

        let token = auth.create_token(user_id).unwrap();
        let claims = auth.decode_claims(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let token = service("one").create_token(Uuid::new_v4()).unwrap();

        let err = service("two").decode_claims(&token).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }
}
