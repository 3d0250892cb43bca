// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Health ---
        handlers::health::health,
        handlers::health::health_db,

        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Dashboard ---
        handlers::dashboard::get_overview,
        handlers::dashboard::get_receipts_by_day,

        // --- Stores & terminals ---
        handlers::stores::list_stores,
        handlers::stores::create_store,
        handlers::stores::list_terminals,
        handlers::stores::create_terminal,

        // --- Receipts ---
        handlers::receipts::list_receipts,
        handlers::receipts::issue_receipt,
        handlers::receipts::get_receipt,
        handlers::receipts::claim_receipt,
        handlers::receipts::get_receipt_pdf,

        // --- Customers ---
        handlers::customers::list_customers,
        handlers::customers::get_customer,

        // --- Analytics ---
        handlers::analytics::get_categories,
        handlers::analytics::get_segments,
        handlers::analytics::get_loyalty_comparison,
        handlers::analytics::get_environment,
        handlers::analytics::export_receipts,

        // --- Loyalty ---
        handlers::loyalty::get_program,
        handlers::loyalty::initialize_program,
        handlers::loyalty::update_program,
        handlers::loyalty::replace_tiers,
        handlers::loyalty::get_top_members,
        handlers::loyalty::list_campaigns,
        handlers::loyalty::create_campaign,
        handlers::loyalty::simulate,
        handlers::loyalty::preview_change,

        // --- Demo ---
        handlers::demo::seed_demo_data,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Stores ---
            models::store::TerminalStatus,
            models::store::Store,
            models::store::PosTerminal,
            models::store::TerminalWithStore,
            models::store::StoreWithStats,
            models::store::CreateStorePayload,
            models::store::CreateTerminalPayload,

            // --- Receipts ---
            models::receipt::ReceiptStatus,
            models::receipt::Receipt,
            models::receipt::LineItem,
            models::receipt::ReceiptWithItems,
            models::receipt::ReceiptListEntry,
            models::receipt::ReceiptDetail,
            models::receipt::NewLineItem,
            models::receipt::IssueReceiptPayload,
            models::receipt::ClaimReceiptPayload,
            models::receipt::ClaimOutcome,

            // --- Customers ---
            models::customer::Customer,
            models::customer::CustomerListEntry,
            models::customer::CustomerStats,
            models::customer::CustomerProfile,

            // --- Analytics ---
            models::analytics::SegmentKind,
            models::analytics::SegmentSummary,
            models::analytics::CategoryAnalytics,
            models::analytics::DailyReceipts,
            models::analytics::StorePerformance,
            models::analytics::DashboardOverview,
            models::analytics::LoyaltyComparison,
            models::analytics::StorePaperSaving,
            models::analytics::EnvironmentalImpact,

            // --- Loyalty ---
            models::loyalty::CampaignChannel,
            models::loyalty::OfferType,
            models::loyalty::CampaignStatus,
            models::loyalty::LoyaltyProgram,
            models::loyalty::LoyaltyTier,
            models::loyalty::CampaignStats,
            models::loyalty::EstimatedImpact,
            models::loyalty::LoyaltyCampaign,
            models::loyalty::ProgramRulesUpdate,
            models::loyalty::TierInput,
            models::loyalty::CreateCampaignPayload,
            models::loyalty::TierDistributionEntry,
            models::loyalty::LoyaltyStats,
            models::loyalty::LoyaltyOverview,
            models::loyalty::InitializeOutcome,
            models::loyalty::TopMember,
            models::loyalty::BonusCategory,
            models::loyalty::SimulationRequest,
            models::loyalty::SimulationResult,
            models::loyalty::ProgramChangePreviewRequest,
            models::loyalty::ProgramChangePreview,

            // --- Demo ---
            models::demo::DemoSeedSummary,
        )
    ),
    tags(
        (name = "Health", description = "État du service"),
        (name = "Auth", description = "Inscription et connexion des opérateurs"),
        (name = "Dashboard", description = "Indicateurs du tableau de bord"),
        (name = "Magasins", description = "Magasins et terminaux de caisse"),
        (name = "Tickets", description = "Émission, réclamation et export des tickets"),
        (name = "Clients", description = "Fiches et historiques clients"),
        (name = "Analytique", description = "Catégories, segments et impact environnemental"),
        (name = "Fidélité", description = "Programme, paliers, campagnes et simulations"),
        (name = "Démo", description = "Données de démonstration")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/receipts/{id}/claim"));
        assert!(doc.paths.paths.contains_key("/api/loyalty/simulate"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
