use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    middleware::{from_fn, from_fn_with_state, map_response_with_state},
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{Clock, TokenCodec};
use crate::config::AppConfig;
use crate::database::models::catalog;
use crate::database::{CredentialStore, DatabaseManager, PgCredentialStore, ProductRepository, ReportRepository};
use crate::error::ApiError;
use crate::handlers::{elevated, protected, public};
use crate::middleware::{
    authenticate, expose_internal_errors, require_admin, require_granted_permission, require_token_permission,
    PermissionGate,
};
use crate::services::{AccountService, DelegationService};

/// Everything a request handler may touch. Cheap to clone; built once at
/// startup and handed to the router.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub database: DatabaseManager,
    pub store: Arc<dyn CredentialStore>,
    pub clock: Arc<dyn Clock>,
    pub codec: TokenCodec,
    pub delegation: DelegationService,
    pub accounts: AccountService,
    pub products: ProductRepository,
    pub reports: ReportRepository,
}

impl AppState {
    pub fn new(config: AppConfig, database: DatabaseManager, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(PgCredentialStore::new(database.pool().clone()));
        Self::with_store(config, database, store, clock)
    }

    pub fn with_store(
        config: AppConfig,
        database: DatabaseManager,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let codec = TokenCodec::new(&config.security.jwt_secret, clock.clone());
        let delegation = DelegationService::new(store.clone(), codec.clone(), config.security.delegated_token_hours);
        let accounts = AccountService::new(store.clone(), codec.clone(), config.security.session_token_hours);
        let products = ProductRepository::new(database.pool().clone());
        let reports = ReportRepository::new(database.pool().clone());

        Self {
            config: Arc::new(config),
            database,
            store,
            clock,
            codec,
            delegation,
            accounts,
            products,
            reports,
        }
    }

    fn permission_gate(&self, required: &[&'static str]) -> PermissionGate {
        PermissionGate::new(self.store.clone(), self.delegation.clone(), required)
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes(&state))
        .merge(product_routes(&state))
        .merge(access_routes(&state))
        // Administrator only
        .merge(admin_routes(&state))
        .merge(report_routes(&state))
        .fallback(not_found)
        // Global middleware; the first layer listed is the outermost
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(map_response_with_state(state.clone(), expose_internal_errors)),
        )
        .with_state(state)
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/api/auth/register", post(public::auth::register_post))
        .route("/api/auth/login", post(public::auth::login_post));

    let guarded = Router::new()
        .route("/api/auth/profile", get(protected::profile::profile_get))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    open.merge(guarded)
}

fn product_routes(state: &AppState) -> Router<AppState> {
    let open = Router::new()
        .route("/api/products", get(public::products::list_get))
        .route("/api/products/:id", get(public::products::show_get));

    let guarded = Router::new()
        .route("/api/products", post(protected::products::create_post))
        .route(
            "/api/products/:id",
            put(protected::products::update_put).delete(protected::products::delete_delete),
        )
        .route_layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.clone(), authenticate))
                .layer(from_fn_with_state(
                    state.permission_gate(&[catalog::EDIT_PRODUCTS]),
                    require_granted_permission,
                )),
        );

    open.merge(guarded)
}

fn access_routes(state: &AppState) -> Router<AppState> {
    let open = Router::new().route("/api/access/verify", post(public::access::verify_post));

    let guarded = Router::new()
        .route("/api/access/generate", post(elevated::access::generate_post))
        .route("/api/access/revoke", post(elevated::access::revoke_post))
        .route("/api/access/permissions", get(elevated::access::permissions_get))
        .route_layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.clone(), authenticate))
                .layer(from_fn(require_admin)),
        );

    open.merge(guarded)
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/admin/dashboard", get(elevated::admin::dashboard_get))
        .route("/api/admin/users", get(elevated::admin::users_get))
        .route("/api/admin/users/role", put(elevated::admin::role_put))
        .route_layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.clone(), authenticate))
                .layer(from_fn(require_admin)),
        )
}

/// Admins, or holders of a live delegated token embedding `view_reports`.
fn report_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/reports/sales", get(protected::reports::sales_get))
        .route("/api/reports/top-products", get(protected::reports::top_products_get))
        .route("/api/reports/top-customers", get(protected::reports::top_customers_get))
        .route_layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.clone(), authenticate))
                .layer(from_fn_with_state(
                    state.permission_gate(&[catalog::VIEW_REPORTS]),
                    require_token_permission,
                )),
        )
}

async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Feria API",
            "version": env!("CARGO_PKG_VERSION"),
            "serverInfo": {
                "ip": state.config.server.server_ip,
                "time": state.clock.now(),
                "environment": state.config.environment.as_str(),
            },
            "endpoints": {
                "auth": "/api/auth/{register,login} (public), /api/auth/profile (token)",
                "products": "/api/products[/:id] (GET public; POST/PUT/DELETE need edit_products)",
                "access": "/api/access/verify (public), /api/access/{generate,revoke,permissions} (admin)",
                "admin": "/api/admin/{dashboard,users,users/role} (admin)",
                "reports": "/api/reports/{sales,top-products,top-customers} (admin or view_reports token)",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = state.clock.now();

    match state.database.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {} {}", method, uri.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::testing::{send, TestApp};
    use chrono::Duration;
    use serde_json::Value;

    fn issue_body(user_id: i64, permissions: Value, duration: &str) -> Option<Value> {
        Some(json!({ "userId": user_id, "permissions": permissions, "duration": duration }))
    }

    #[tokio::test]
    async fn root_and_fallback_speak_json() {
        let app = TestApp::new();
        let router = app.router();

        let (status, body) = send(&router, "GET", "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["serverInfo"]["environment"], "development");

        let (status, body) = send(&router, "GET", "/api/nowhere", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn missing_token_is_401_and_bad_token_is_403() {
        let app = TestApp::new();
        let router = app.router();

        let (status, _) = send(&router, "GET", "/api/access/permissions", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&router, "GET", "/api/access/permissions", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn embedded_expiry_is_enforced_by_the_gate() {
        let app = TestApp::new();
        let admin = app.store.seed_user(1, "admin", Role::Admin);
        let token = app.session_token(&admin);
        let router = app.router();

        app.clock.advance(Duration::hours(3));
        let (status, body) = send(&router, "GET", "/api/access/permissions", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn delegated_token_lifecycle_over_http() {
        let app = TestApp::new();
        let admin = app.store.seed_user(1, "admin", Role::Admin);
        app.store.seed_user(7, "ivan", Role::Vendor);
        let admin_token = app.session_token(&admin);
        let router = app.router();

        let (status, body) = send(
            &router,
            "POST",
            "/api/access/generate",
            Some(&admin_token),
            issue_body(7, json!(["edit_products"]), "1h"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["permissions"], json!(["edit_products"]));
        let delegated = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = send(
            &router,
            "POST",
            "/api/access/verify",
            None,
            Some(json!({ "token": delegated })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["permissions"], json!(["edit_products"]));
        assert_eq!(body["data"]["user"]["role"], "vendedor");

        for _ in 0..2 {
            let (status, _) = send(
                &router,
                "POST",
                "/api/access/revoke",
                Some(&admin_token),
                Some(json!({ "userId": 7 })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(
            &router,
            "POST",
            "/api/access/verify",
            None,
            Some(json!({ "token": delegated })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn verify_reports_database_side_expiry() {
        let app = TestApp::new();
        let admin = app.store.seed_user(1, "admin", Role::Admin);
        app.store.seed_user(7, "ivan", Role::Vendor);
        let router = app.router();

        let (_, body) = send(
            &router,
            "POST",
            "/api/access/generate",
            Some(&app.session_token(&admin)),
            issue_body(7, json!(["edit_products"]), "1h"),
        )
        .await;
        let delegated = body["data"]["token"].as_str().unwrap().to_string();

        app.clock.advance(Duration::hours(2));
        let (status, body) = send(&router, "POST", "/api/access/verify", None, Some(json!({ "token": delegated }))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "TOKEN_EXPIRED");
        assert!(body["message"].as_str().unwrap().contains("stored"));
    }

    #[tokio::test]
    async fn vendors_cannot_manage_access_tokens() {
        let app = TestApp::new();
        let vendor = app.store.seed_user(7, "ivan", Role::Vendor);
        let token = app.session_token(&vendor);
        let router = app.router();

        for body in [issue_body(7, json!(["edit_products"]), "8h"), Some(json!({}))] {
            let (status, _) = send(&router, "POST", "/api/access/generate", Some(&token), body).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn generate_lists_valid_permissions_on_failure() {
        let app = TestApp::new();
        let admin = app.store.seed_user(1, "admin", Role::Admin);
        app.store.seed_user(7, "ivan", Role::Vendor);
        let router = app.router();

        let (status, body) = send(
            &router,
            "POST",
            "/api/access/generate",
            Some(&app.session_token(&admin)),
            issue_body(7, json!(["view_reports", "launch_rockets"]), "2h"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["validPermissions"], json!(["view_reports"]));
    }

    #[tokio::test]
    async fn oversized_duration_is_a_400() {
        let app = TestApp::new();
        let admin = app.store.seed_user(1, "admin", Role::Admin);
        app.store.seed_user(7, "ivan", Role::Vendor);
        let router = app.router();
        let token = app.session_token(&admin);

        for duration in [json!(1_000_000_000_000_i64), json!("1000000000000h")] {
            let (status, body) = send(
                &router,
                "POST",
                "/api/access/generate",
                Some(&token),
                Some(json!({ "userId": 7, "permissions": ["edit_products"], "duration": duration })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
        }
        assert_eq!(app.store.stored_token(7), (None, None));
    }

    #[tokio::test]
    async fn malformed_json_is_a_400() {
        let app = TestApp::new();
        let router = app.router();
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/access/verify")
            .header("content-type", "application/json")
            .body(axum::body::Body::from("{not json"))
            .unwrap();

        let response = tower::ServiceExt::oneshot(router, request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn product_mutations_follow_the_assignment_table() {
        let app = TestApp::new();
        let seller = app.store.seed_user(5, "rosa", Role::Vendor);
        let token = app.session_token(&seller);
        let router = app.router();
        let product = Some(json!({ "name": "Quinua", "price": "12.50", "category": "Granos" }));

        let (status, _) = send(&router, "POST", "/api/products", None, product.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&router, "POST", "/api/products", Some(&token), product.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Grant takes effect on the next request without a new token.
        app.store.grant(5, "edit_products");
        let (status, body) = send(&router, "POST", "/api/products", Some(&token), Some(json!({ "name": "Quinua" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["missing"], json!(["price", "category"]));
    }

    #[tokio::test]
    async fn delegated_claims_do_not_satisfy_the_assignment_gate() {
        let app = TestApp::new();
        let admin = app.store.seed_user(1, "admin", Role::Admin);
        app.store.seed_user(7, "ivan", Role::User);
        let router = app.router();

        let (_, body) = send(
            &router,
            "POST",
            "/api/access/generate",
            Some(&app.session_token(&admin)),
            issue_body(7, json!(["edit_products"]), "8h"),
        )
        .await;
        let delegated = body["data"]["token"].as_str().unwrap().to_string();

        let (status, _) = send(&router, "DELETE", "/api/products/3", Some(&delegated), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reports_need_admin_or_a_live_view_reports_token() {
        let app = TestApp::new();
        let admin = app.store.seed_user(1, "admin", Role::Admin);
        let user = app.store.seed_user(7, "ivan", Role::User);
        app.store.grant(7, "view_reports");
        let router = app.router();
        let admin_token = app.session_token(&admin);

        // An assignment row alone is not enough for the embedded-claim gate.
        let (status, _) = send(&router, "GET", "/api/reports/top-products", Some(&app.session_token(&user)), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, body) = send(
            &router,
            "POST",
            "/api/access/generate",
            Some(&admin_token),
            issue_body(7, json!(["view_reports"]), "8h"),
        )
        .await;
        let delegated = body["data"]["token"].as_str().unwrap().to_string();

        // Passes the gate, then fails on the unreachable database.
        let (status, _) = send(&router, "GET", "/api/reports/top-products", Some(&delegated), None).await;
        assert!(status.is_server_error(), "{status}");

        send(&router, "POST", "/api/access/revoke", Some(&admin_token), Some(json!({ "userId": 7 }))).await;
        let (status, body) = send(&router, "GET", "/api/reports/top-products", Some(&delegated), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "INVALID_TOKEN");
    }

    #[tokio::test]
    async fn sales_report_validates_dates_before_querying() {
        let app = TestApp::new();
        let admin = app.store.seed_user(1, "admin", Role::Admin);
        let token = app.session_token(&admin);
        let router = app.router();

        for uri in [
            "/api/reports/sales",
            "/api/reports/sales?startDate=2024-05-01",
            "/api/reports/sales?startDate=2024-05-10&endDate=2024-05-01",
            "/api/reports/sales?startDate=yesterday&endDate=2024-05-01",
        ] {
            let (status, _) = send(&router, "GET", uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn admin_user_management() {
        let app = TestApp::new();
        let admin = app.store.seed_user(1, "admin", Role::Admin);
        app.store.seed_user(7, "ivan", Role::User);
        let token = app.session_token(&admin);
        let router = app.router();

        let (status, body) = send(&router, "GET", "/api/admin/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert!(body["data"][0].get("password").is_none());

        let (status, _) = send(
            &router,
            "PUT",
            "/api/admin/users/role",
            Some(&token),
            Some(json!({ "userId": 7, "newRole": "superuser" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &router,
            "PUT",
            "/api/admin/users/role",
            Some(&token),
            Some(json!({ "userId": 99, "newRole": "vendedor" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &router,
            "PUT",
            "/api/admin/users/role",
            Some(&token),
            Some(json!({ "userId": 7, "newRole": "vendedor" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "vendedor");

        let ivan = app.store.seed_user(8, "pablo", Role::Vendor);
        let (status, _) = send(&router, "GET", "/api/admin/users", Some(&app.session_token(&ivan)), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn register_login_and_profile() {
        let app = TestApp::new();
        let router = app.router();

        let (status, body) = send(
            &router,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "lucia", "email": "lucia@feria.pe", "password": "totora-1234" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["role"], "usuario");

        let (status, _) = send(
            &router,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "lucia", "email": "other@feria.pe", "password": "totora-1234" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &router,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "lucia", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &router,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "lucia", "password": "totora-1234" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = send(&router, "GET", "/api/auth/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["username"], "lucia");
    }
}
