// src/handlers/health.rs
// DOCUMENTATION: Health check and map legend handlers
// PURPOSE: Liveness plus the static category/day color tables map clients render

use crate::models::{MarkerCategory, DAY_COLORS};
use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "service": "trip-locations",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /legend
pub async fn legend() -> impl Responder {
    let categories: Vec<_> = MarkerCategory::ALL
        .iter()
        .map(|category| {
            let style = category.style();
            json!({
                "category": style.category,
                "label": style.label,
                "color": style.color,
                "glyph": style.glyph,
                "zIndex": category.z_index(),
            })
        })
        .collect();

    HttpResponse::Ok().json(json!({
        "categories": categories,
        "dayColors": DAY_COLORS,
    }))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/legend", web::get().to(legend));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_rt::test]
    async fn test_health_and_legend() {
        let app = test::init_service(App::new().configure(config)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");

        let req = test::TestRequest::get().uri("/legend").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["categories"].as_array().unwrap().len(), 7);
        assert_eq!(body["categories"][0]["category"], "hotel");
        assert_eq!(body["dayColors"].as_array().unwrap().len(), 15);
    }
}
