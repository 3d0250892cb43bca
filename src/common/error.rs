// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use crate::{common::i18n::I18nStore, middleware::i18n::Locale, models::receipt::ReceiptStatus};

// SQLSTATE codes we classify on
const DUPLICATE_PREPARED_STATEMENT: &str = "42P05";
const UNDEFINED_TABLE: &str = "42P01";

// =============================================================================
//  SERVICE / REPOSITORY ERROR
// =============================================================================

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erreur de validation")]
    ValidationError(#[from] ValidationErrors),

    #[error("E-mail déjà utilisé")]
    EmailAlreadyExists,

    #[error("Identifiants invalides")]
    InvalidCredentials,

    #[error("Jeton invalide")]
    InvalidToken,

    #[error("Utilisateur introuvable")]
    UserNotFound,

    #[error("{0} introuvable")]
    NotFound(&'static str),

    #[error("Ticket non réclamable (statut {0:?})")]
    ReceiptNotClaimable(ReceiptStatus),

    #[error("Contrainte d'unicité violée: {0}")]
    UniqueConstraintViolation(String),

    #[error("Base de données indisponible: {0}")]
    DatabaseUnavailable(sqlx::Error),

    #[error("Erreur transitoire de base de données: {0}")]
    TransientDatabase(sqlx::Error),

    #[error("Schéma de base de données absent: {0}")]
    SchemaMissing(sqlx::Error),

    #[error("Erreur de base de données: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Erreur interne du serveur: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erreur Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erreur JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Erreur CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Police introuvable: {0}")]
    FontNotFound(String),

    #[error("Erreur PDF: {0}")]
    PdfError(String),
}

// Structural classification of driver errors, no message matching.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => AppError::DatabaseUnavailable(err),
            sqlx::Error::RowNotFound => AppError::NotFound("resource"),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                    return match constraint.as_str() {
                        "users_email_key" => AppError::EmailAlreadyExists,
                        _ => AppError::UniqueConstraintViolation(constraint),
                    };
                }
                match db_err.code().as_deref() {
                    Some(DUPLICATE_PREPARED_STATEMENT) => AppError::TransientDatabase(err),
                    Some(UNDEFINED_TABLE) => AppError::SchemaMissing(err),
                    _ => AppError::DatabaseError(err),
                }
            }
            _ => AppError::DatabaseError(err),
        }
    }
}

impl AppError {
    /// Single-field validation failure, for checks `validator` cannot express.
    pub fn invalid_field(field: &'static str, code: &'static str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, ValidationError::new(code));
        AppError::ValidationError(errors)
    }

    // Errors worth another attempt under a RetryPolicy
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::TransientDatabase(_) | AppError::DatabaseUnavailable(sqlx::Error::PoolTimedOut)
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) | AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists
            | AppError::ReceiptNotClaimable(_)
            | AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::DatabaseUnavailable(_)
            | AppError::TransientDatabase(_)
            | AppError::SchemaMissing(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code sent next to the localized message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_failed",
            AppError::InvalidCredentials | AppError::InvalidToken => "unauthorized",
            AppError::NotFound(_) | AppError::UserNotFound => "not_found",
            AppError::EmailAlreadyExists
            | AppError::ReceiptNotClaimable(_)
            | AppError::UniqueConstraintViolation(_) => "conflict",
            AppError::DatabaseUnavailable(_) | AppError::TransientDatabase(_) => "database_unavailable",
            AppError::SchemaMissing(_) => "schema_missing",
            _ => "internal_error",
        }
    }

    fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "error.validation_failed",
            AppError::EmailAlreadyExists => "error.email_exists",
            AppError::InvalidCredentials => "error.invalid_credentials",
            AppError::InvalidToken => "error.invalid_token",
            AppError::UserNotFound => "error.user_not_found",
            AppError::NotFound(_) => "error.not_found",
            AppError::ReceiptNotClaimable(_) => "error.receipt_not_claimable",
            AppError::UniqueConstraintViolation(_) => "error.conflict",
            AppError::DatabaseUnavailable(_) | AppError::TransientDatabase(_) => "error.database_unavailable",
            AppError::SchemaMissing(_) => "error.schema_missing",
            _ => "error.internal",
        }
    }

    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        }

        let message = match self {
            AppError::NotFound(entity) => {
                let entity_name = i18n.translate(lang, &format!("entity.{}", entity));
                i18n.translate(lang, "error.not_found").replace("{entity}", &entity_name)
            }
            AppError::ReceiptNotClaimable(current) => i18n
                .translate(lang, "error.receipt_not_claimable")
                .replace("{status}", current.as_str()),
            other => i18n.translate(lang, other.message_key()),
        };

        let details = match self {
            AppError::ValidationError(errors) => Some(validation_details(errors, lang, i18n)),
            _ => None,
        };

        ApiError {
            status,
            message,
            code: self.code(),
            details,
        }
    }
}

// field -> list of localized messages
fn validation_details(errors: &ValidationErrors, lang: &str, i18n: &I18nStore) -> Value {
    let mut details = Map::new();
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<Value> = field_errors
            .iter()
            .map(|e| {
                let code = e.message.as_deref().unwrap_or(e.code.as_ref());
                Value::String(i18n.translate(lang, &format!("validation.{}", code)))
            })
            .collect();
        details.insert(field.to_string(), Value::Array(messages));
    }
    Value::Object(details)
}

// =============================================================================
//  HTTP ERROR
// =============================================================================

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub code: &'static str,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.message,
            "code": self.code,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fr() -> Locale {
        Locale("fr".to_string())
    }

    #[test]
    fn pool_timeout_is_unavailable_and_retryable() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::DatabaseUnavailable(_)));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "database_unavailable");
        assert!(err.is_transient());
    }

    #[test]
    fn pool_closed_is_unavailable_but_not_retried() {
        let err = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.is_transient());
    }

    #[test]
    fn row_not_found_maps_to_404() {
        let err = AppError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn protocol_errors_are_internal() {
        let err = AppError::from(sqlx::Error::Protocol("boom".into()));
        assert!(matches!(err, AppError::DatabaseError(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_transient());
    }

    #[test]
    fn claim_conflict_mentions_current_status() {
        let i18n = I18nStore::new();
        let api = AppError::ReceiptNotClaimable(ReceiptStatus::Claimed).to_api_error(&fr(), &i18n);
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.code, "conflict");
        assert!(api.message.contains("CLAIMED"));
    }

    #[test]
    fn not_found_names_the_entity() {
        let i18n = I18nStore::new();
        let api = AppError::NotFound("receipt").to_api_error(&fr(), &i18n);
        assert_eq!(api.message, "Ticket introuvable.");

        let api = AppError::NotFound("receipt").to_api_error(&Locale("en".into()), &i18n);
        assert_eq!(api.message, "Receipt not found.");
    }

    #[test]
    fn validation_details_are_localized_per_field() {
        let i18n = I18nStore::new();
        let api = AppError::invalid_field("name", "required").to_api_error(&fr(), &i18n);

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.code, "validation_failed");
        let details = api.details.expect("details");
        assert_eq!(details["name"][0], "Ce champ est obligatoire.");
    }
}
