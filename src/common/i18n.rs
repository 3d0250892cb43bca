// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "fr";

// (key, fr, en)
const MESSAGES: &[(&str, &str, &str)] = &[
    // --- errors ---
    ("error.validation_failed", "Un ou plusieurs champs sont invalides.", "One or more fields are invalid."),
    ("error.email_exists", "Cet e-mail est déjà utilisé.", "This e-mail is already in use."),
    ("error.invalid_credentials", "E-mail ou mot de passe invalide.", "Invalid e-mail or password."),
    ("error.invalid_token", "Jeton d'authentification invalide ou absent.", "Missing or invalid authentication token."),
    ("error.user_not_found", "Utilisateur introuvable.", "User not found."),
    ("error.not_found", "{entity} introuvable.", "{entity} not found."),
    (
        "error.receipt_not_claimable",
        "Ce ticket ne peut pas être réclamé (statut actuel : {status}).",
        "This receipt cannot be claimed (current status: {status}).",
    ),
    ("error.conflict", "Cette ressource existe déjà.", "This resource already exists."),
    (
        "error.database_unavailable",
        "Base de données indisponible, veuillez réessayer plus tard.",
        "Database unavailable, please try again later.",
    ),
    (
        "error.schema_missing",
        "Le schéma de la base de données n'est pas initialisé.",
        "The database schema has not been initialized.",
    ),
    ("error.internal", "Une erreur inattendue est survenue.", "An unexpected error occurred."),
    // --- entities ---
    ("entity.receipt", "Ticket", "Receipt"),
    ("entity.store", "Magasin", "Store"),
    ("entity.terminal", "Terminal", "Terminal"),
    ("entity.customer", "Client", "Customer"),
    ("entity.program", "Programme de fidélité", "Loyalty program"),
    ("entity.resource", "Ressource", "Resource"),
    // --- validation codes ---
    ("validation.required", "Ce champ est obligatoire.", "This field is required."),
    ("validation.invalid_email", "Adresse e-mail invalide.", "Invalid e-mail address."),
    (
        "validation.password_too_short",
        "Le mot de passe doit contenir au moins 6 caractères.",
        "Password must be at least 6 characters long.",
    ),
    (
        "validation.out_of_range",
        "Pourcentage hors limites (-100 à 1000).",
        "Percentage out of range (-100 to 1000).",
    ),
    ("validation.must_be_positive", "La valeur doit être strictement positive.", "Value must be strictly positive."),
    (
        "validation.invalid_band",
        "Tranche invalide : bornes positives et maximum supérieur au minimum.",
        "Invalid band: bounds must be non-negative and max greater than min.",
    ),
    (
        "validation.terminal_not_in_store",
        "Ce terminal n'appartient pas au magasin indiqué.",
        "This terminal does not belong to the given store.",
    ),
    ("validation.empty_items", "Le ticket doit contenir au moins un article.", "A receipt needs at least one item."),
    ("validation.invalid_quantity", "La quantité doit être au moins 1.", "Quantity must be at least 1."),
    ("validation.invalid_price", "Le prix unitaire ne peut pas être négatif.", "Unit price cannot be negative."),
    ("validation.invalid_currency", "Code devise ISO à 3 lettres attendu.", "Expected a 3-letter ISO currency code."),
];

/// Message catalog per language. Unknown languages fall back to French,
/// unknown keys are returned as-is.
#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut fr = HashMap::new();
        let mut en = HashMap::new();
        for (key, fr_text, en_text) in MESSAGES {
            fr.insert(*key, *fr_text);
            en.insert(*key, *en_text);
        }

        let mut catalogs = HashMap::new();
        catalogs.insert("fr", fr);
        catalogs.insert("en", en);
        Self { catalogs }
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.catalogs.contains_key(lang)
    }

    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.catalogs
            .get(lang)
            .and_then(|catalog| catalog.get(key))
            .or_else(|| self.catalogs.get(DEFAULT_LANG).and_then(|c| c.get(key)))
            .map(|text| text.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_known_languages() {
        let store = I18nStore::new();
        assert_eq!(store.translate("fr", "error.user_not_found"), "Utilisateur introuvable.");
        assert_eq!(store.translate("en", "error.user_not_found"), "User not found.");
    }

    #[test]
    fn unknown_language_falls_back_to_french() {
        let store = I18nStore::new();
        assert!(!store.supports("de"));
        assert_eq!(store.translate("de", "error.internal"), "Une erreur inattendue est survenue.");
    }

    #[test]
    fn unknown_key_is_echoed() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "validation.whatever"), "validation.whatever");
    }
}
