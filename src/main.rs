//src/main.rs

use std::net::SocketAddr;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod integrations;
mod middleware;
mod models;
mod services;
#[cfg(test)]
mod testing;

// Importações principais
use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::{
    auth::auth_guard,
    rate_limit::{limit_auth, limit_guest, limit_password_reset},
};

/// Monta todas as rotas sobre um `AppState` já pronto.
pub fn router(app_state: AppState) -> Router {
    // Rotas de autenticação (públicas, com rate limit)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), limit_auth))
        .merge(
            Router::new()
                .route("/forgot-password", post(handlers::auth::forgot_password))
                .route("/reset-password", post(handlers::auth::reset_password))
                .route_layer(axum_middleware::from_fn_with_state(
                    app_state.clone(),
                    limit_password_reset,
                )),
        )
        .merge(
            Router::new()
                .route("/change-password", post(handlers::auth::change_password))
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), limit_auth))
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard)),
        );

    // Tudo abaixo exige token válido
    let protected_routes = Router::new()
        .route("/users/me", get(handlers::auth::get_me))
        .route("/users/me/workspaces", get(handlers::auth::get_my_workspaces))
        .route("/users/me/workspace", post(handlers::auth::switch_workspace))
        .route(
            "/customers",
            post(handlers::customers::create_customer).get(handlers::customers::list_customers),
        )
        .route(
            "/customers/{id}",
            get(handlers::customers::get_customer).put(handlers::customers::update_customer),
        )
        .route(
            "/invoices",
            post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
        )
        .route("/invoices/{id}", get(handlers::invoices::get_invoice))
        .route("/invoices/{id}/status", post(handlers::invoices::update_status))
        .route("/invoices/{id}/send", post(handlers::invoices::send_invoice))
        .route("/invoices/{id}/payment-link", post(handlers::invoices::issue_payment_link))
        .route("/invoices/{id}/payments", get(handlers::invoices::list_payments))
        .route("/invoices/{id}/pdf", get(handlers::invoices::invoice_pdf))
        .route("/dashboard/summary", get(handlers::dashboard::get_summary))
        .route("/billing/status", get(handlers::billing::get_status))
        .route("/billing/usage", post(handlers::billing::track_usage))
        .route("/billing/cancel", post(handlers::billing::cancel_subscription))
        .route("/billing/reactivate", post(handlers::billing::reactivate_subscription))
        .route(
            "/settings/workspace",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route("/admin/domains", get(handlers::admin::list_domains))
        .route("/admin/domains/{id}", get(handlers::admin::get_domain))
        .route("/admin/domains/{id}/verify", post(handlers::admin::verify_domain))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let public_routes = Router::new()
        .route("/track/open/{invoice_id}", get(handlers::tracking::open_pixel))
        .route(
            "/guest/send-invoice",
            post(handlers::guest::send_guest_invoice)
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), limit_guest)),
        );

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health))
        .nest("/api/auth", auth_routes)
        .nest("/api", protected_routes.merge(public_routes))
        .with_state(app_state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Falha ao escutar o sinal de desligamento: {}", e);
    }
    tracing::info!("Desligando o servidor...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logger: RUST_LOG manda; sem ele, info.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let (app_state, pool) = AppState::new(config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    app_state.rate_limiter.spawn_cleanup();
    let tasks = app_state.tasks.clone();
    let app = router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Espera os efeitos colaterais em andamento (uso do trial, eventos, sync de clientes)
    tasks.drain().await;
    pool.close().await;
    tracing::info!("✅ Servidor encerrado");
    Ok(())
}
