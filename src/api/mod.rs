// ============================================================================
// HTTP API - actix-web adapter over the order lifecycle engine
// ============================================================================

pub mod error;
pub mod handlers;
pub mod identity;

use actix_web::{web, HttpServer, App};
use std::sync::Arc;

pub use error::{ApiError, ErrorBody};
pub use handlers::AppState;

/// Register every route under `/api/v1`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()))
        .app_data(web::QueryConfig::default().error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()))
        .service(
            web::scope("/api/v1")
                .route("/orders", web::post().to(handlers::create_order))
                // Must precede /orders/{id}
                .route("/orders/me", web::get().to(handlers::my_orders))
                .route("/orders/{id}", web::get().to(handlers::get_order))
                .route("/orders/{id}/cancel", web::post().to(handlers::cancel_order))
                .route("/orders/{id}/history", web::get().to(handlers::order_history))
                .route("/admin/orders", web::get().to(handlers::all_orders))
                .route("/admin/orders/{id}", web::put().to(handlers::advance_status))
                .route("/admin/orders/{id}", web::delete().to(handlers::delete_order))
                .route("/products", web::get().to(handlers::search_products)),
        );
}

pub async fn start_api_server(state: Arc<AppState>, port: u16) -> std::io::Result<()> {
    tracing::info!("🛒 Starting order API on http://0.0.0.0:{}/api/v1", port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::from(state.clone()))
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inventory::{InventoryLedger, Product};
    use crate::domain::order::OrderCommandHandler;
    use crate::metrics::Metrics;
    use crate::store::{InMemoryInventory, InMemoryOrderStore};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rust_decimal_macros::dec;
    use serde_json::{json, Value};
    use uuid::Uuid;

    async fn fixture() -> (Arc<AppState>, Arc<InMemoryInventory>, Uuid) {
        let inventory = Arc::new(InMemoryInventory::new());
        let lamp = Product::new("Brass desk lamp", "lighting", dec!(25), 10);
        let lamp_id = lamp.id;
        inventory.upsert_product(lamp).await;
        inventory.upsert_product(Product::new("Linen lampshade", "lighting", dec!(12), 4)).await;
        inventory.upsert_product(Product::new("Oak bookshelf", "furniture", dec!(180), 2)).await;

        let metrics = Arc::new(Metrics::new().unwrap());
        let orders = OrderCommandHandler::new(Arc::new(InMemoryOrderStore::new()), inventory.clone(), metrics);
        let state = Arc::new(AppState { orders: Arc::new(orders), catalog: inventory.clone() });
        (state, inventory, lamp_id)
    }

    fn checkout(product_id: Uuid, quantity: u32, total: &str) -> Value {
        json!({
            "items": [{ "product_id": product_id, "name": "Brass desk lamp", "quantity": quantity, "unit_price": "25" }],
            "shipping_info": {
                "address": "4 Canal Street",
                "city": "Manchester",
                "state": "Greater Manchester",
                "country": "UK",
                "postal_code": "M1 3HE",
                "phone": "0161 555 0199"
            },
            "pricing": {
                "items_price": total,
                "tax_price": "0",
                "shipping_price": "0",
                "total_price": total
            }
        })
    }

    fn as_user(req: test::TestRequest, user_id: Uuid, role: &str) -> test::TestRequest {
        req.insert_header(("x-user-id", user_id.to_string()))
            .insert_header(("x-user-role", role))
    }

    #[actix_web::test]
    async fn test_order_lifecycle_over_http() {
        let (state, inventory, lamp) = fixture().await;
        let app = test::init_service(App::new().app_data(web::Data::from(state)).configure(configure)).await;
        let (customer, admin) = (Uuid::new_v4(), Uuid::new_v4());

        let req = as_user(test::TestRequest::post().uri("/api/v1/orders"), customer, "customer")
            .set_json(checkout(lamp, 3, "75"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let order: Value = test::read_body_json(resp).await;
        let order_id = order["id"].as_str().unwrap().to_string();
        assert_eq!(order["status"], "Processing");

        let req = as_user(test::TestRequest::put().uri(&format!("/api/v1/admin/orders/{order_id}")), admin, "admin")
            .set_json(json!({ "status": "shipped" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(inventory.stock(lamp).await.unwrap(), 7);

        let req = as_user(test::TestRequest::put().uri(&format!("/api/v1/admin/orders/{order_id}")), admin, "admin")
            .set_json(json!({ "status": "Shipped" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.error.code, "ALREADY_IN_STATE");

        let req = as_user(test::TestRequest::post().uri(&format!("/api/v1/orders/{order_id}/cancel")), customer, "customer")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(inventory.stock(lamp).await.unwrap(), 10);

        let req = as_user(test::TestRequest::get().uri(&format!("/api/v1/orders/{order_id}/history")), customer, "customer")
            .to_request();
        let history: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(history.len(), 3);
    }

    #[actix_web::test]
    async fn test_identity_and_role_are_enforced() {
        let (state, _, lamp) = fixture().await;
        let app = test::init_service(App::new().app_data(web::Data::from(state)).configure(configure)).await;
        let customer = Uuid::new_v4();

        let anonymous = test::TestRequest::post()
            .uri("/api/v1/orders")
            .set_json(checkout(lamp, 1, "25"))
            .to_request();
        assert_eq!(test::call_service(&app, anonymous).await.status(), StatusCode::UNAUTHORIZED);

        let req = as_user(test::TestRequest::get().uri("/api/v1/admin/orders"), customer, "customer").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = as_user(test::TestRequest::post().uri("/api/v1/orders"), customer, "customer")
            .set_json(checkout(lamp, 1, "25"))
            .to_request();
        let order: Value = test::call_and_read_body_json(&app, req).await;

        let stranger = Uuid::new_v4();
        let req = as_user(test::TestRequest::get().uri(&format!("/api/v1/orders/{}", order["id"].as_str().unwrap())), stranger, "customer")
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = as_user(test::TestRequest::get().uri("/api/v1/orders/me"), customer, "customer").to_request();
        let mine: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(mine.len(), 1);
    }

    #[actix_web::test]
    async fn test_bad_input_is_rejected_with_400() {
        let (state, _, lamp) = fixture().await;
        let app = test::init_service(App::new().app_data(web::Data::from(state)).configure(configure)).await;
        let (customer, admin) = (Uuid::new_v4(), Uuid::new_v4());

        let req = as_user(test::TestRequest::post().uri("/api/v1/orders"), customer, "customer")
            .set_json(checkout(lamp, 1, "99"))
            .to_request();
        let mut inconsistent = checkout(lamp, 1, "25");
        inconsistent["pricing"]["total_price"] = json!("30");
        let req_inconsistent = as_user(test::TestRequest::post().uri("/api/v1/orders"), customer, "customer")
            .set_json(inconsistent)
            .to_request();

        // items_price is taken as given, so only the total must add up
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
        let resp = test::call_service(&app, req_inconsistent).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.error.code, "VALIDATION_ERROR");

        let req = as_user(test::TestRequest::get().uri("/api/v1/orders/not-a-uuid"), customer, "customer").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = as_user(test::TestRequest::put().uri(&format!("/api/v1/admin/orders/{}", Uuid::new_v4())), admin, "admin")
            .set_json(json!({ "status": "teleported" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = as_user(test::TestRequest::put().uri(&format!("/api/v1/admin/orders/{}", Uuid::new_v4())), admin, "admin")
            .set_json(json!({ "status": "Shipped" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_product_search() {
        let (state, _, _) = fixture().await;
        let app = test::init_service(App::new().app_data(web::Data::from(state)).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/products?keyword=LAMP&price_max=20").to_request();
        let page: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(page["total_matches"], 1);
        assert_eq!(page["products"][0]["name"], "Linen lampshade");

        let req = test::TestRequest::get().uri("/api/v1/products?price_min=50&price_max=10").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
