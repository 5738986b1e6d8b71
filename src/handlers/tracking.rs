// src/handlers/tracking.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use axum_extra::{headers::UserAgent, TypedHeader};

use crate::{config::AppState, middleware::rate_limit::ClientIp};

/// GIF transparente de 1x1.
pub static TRACKING_PIXEL: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

// GET /api/track/open/{invoice_id}
// Sempre devolve o pixel: falha ao registrar a abertura nunca chega ao cliente de e-mail.
#[utoipa::path(
    get,
    path = "/api/track/open/{invoice_id}",
    tag = "Tracking",
    params(("invoice_id" = String, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "GIF 1x1 transparente", body = Vec<u8>, content_type = "image/gif")
    )
)]
pub async fn open_pixel(
    State(app_state): State<AppState>,
    Path(invoice_id): Path<String>,
    ClientIp(ip): ClientIp,
    user_agent: Option<TypedHeader<UserAgent>>,
) -> impl IntoResponse {
    let user_agent = user_agent.map(|TypedHeader(ua)| ua.as_str().to_string());
    app_state.invoice_service.record_open(&invoice_id, Some(ip), user_agent);

    (
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate, private"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        &TRACKING_PIXEL[..],
    )
}
