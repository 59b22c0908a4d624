use utoipa::OpenApi;

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const PROFILES_TAG: &str = "Customer Profile API";

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::health::health_check,
        crate::api::profiles::list_profiles,
        crate::api::profiles::get_profile,
        crate::api::profiles::create_profile,
        crate::api::profiles::update_profile,
        crate::api::profiles::delete_profile,
    ),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = PROFILES_TAG, description = "Customer profile endpoints"),
    ),
    info(
        title = "Customer Profile API",
        description = "OAuth2-protected customer profile service",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;
