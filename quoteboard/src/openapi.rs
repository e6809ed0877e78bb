//! OpenAPI documentation configuration, rendered at `/admin/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api::handlers;
use crate::api::models::{
    auth::{ChangePasswordRequest, LoginData, LoginRequest, RefreshData, RegisterRequest},
    registration_codes::RegistrationCodeResponse,
    status::BannerStatus,
    users::{CapabilityWindow, Role, UserResponse, VendorEditGrant},
    vendors::{VendorCreate, VendorResponse, VendorUpdate},
};
use crate::errors::FieldViolation;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_token",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "quoteboard API",
        description = "Sessions, role gating and delegated vendor-edit capabilities for the quotation store"
    ),
    paths(
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::register,
        handlers::auth::change_password,
        handlers::users::list_users,
        handlers::users::delete_user,
        handlers::users::reset_password,
        handlers::users::grant_vendor_edit,
        handlers::registration_codes::create_code,
        handlers::registration_codes::list_codes,
        handlers::registration_codes::delete_code,
        handlers::vendors::list_vendors,
        handlers::vendors::create_vendor,
        handlers::vendors::update_vendor,
        handlers::status::get_maintenance,
        handlers::status::get_announcement,
    ),
    components(schemas(
        LoginRequest,
        LoginData,
        RefreshData,
        RegisterRequest,
        ChangePasswordRequest,
        UserResponse,
        CapabilityWindow,
        Role,
        VendorEditGrant,
        RegistrationCodeResponse,
        VendorResponse,
        VendorCreate,
        VendorUpdate,
        BannerStatus,
        FieldViolation,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, refresh, registration, password changes"),
        (name = "users", description = "User administration"),
        (name = "registration-codes", description = "Single-use onboarding codes"),
        (name = "vendors", description = "Vendor records"),
        (name = "status", description = "Public banner polling"),
    )
)]
pub struct ApiDoc;
