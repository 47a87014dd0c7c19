use crate::errors::ApiError;
use crate::metrics;
use crate::models::OperationRequest;
use crate::services::WalletService;
use actix_web::{error::InternalError, web, HttpResponse, ResponseError};
use serde_json::json;
use std::sync::Arc;
use wallet_core::WalletId;

/// Health check endpoint
pub async fn health_check(service: web::Data<Arc<WalletService>>) -> HttpResponse {
    let status = match service.health_check().await {
        Ok(()) => "healthy",
        Err(_) => "degraded",
    };

    HttpResponse::Ok().json(json!({
        "status": status,
        "service": "wallet-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn parse_wallet_id(raw: &str) -> Result<WalletId, ApiError> {
    raw.parse::<WalletId>()
        .map_err(|e| ApiError::Validation(format!("invalid wallet id `{}`: {}", raw, e)))
}

/// Get wallet balance endpoint
pub async fn get_wallet(
    service: web::Data<Arc<WalletService>>,
    wallet_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let wallet_id = parse_wallet_id(&wallet_id)?;
    let response = service.get_wallet(wallet_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Wallet ledger endpoint
pub async fn list_operations(
    service: web::Data<Arc<WalletService>>,
    wallet_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let wallet_id = parse_wallet_id(&wallet_id)?;
    let response = service.list_operations(wallet_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Deposit/withdraw endpoint
pub async fn add_operation(
    service: web::Data<Arc<WalletService>>,
    request: web::Json<OperationRequest>,
) -> Result<HttpResponse, ApiError> {
    let response = service.apply_operation(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Prometheus metrics endpoint
pub async fn metrics_endpoint() -> HttpResponse {
    match metrics::metrics_handler() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => ApiError::Internal(format!("failed to gather metrics: {}", e)).error_response(),
    }
}

/// Body parse failures use the same error envelope as everything else
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = ApiError::Validation(err.to_string()).error_response();
        InternalError::from_response(err, response).into()
    })
}

/// Configure routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(
            web::scope("/api/v1")
                .route("/wallets/{wallet_id}", web::get().to(get_wallet))
                .route(
                    "/wallets/{wallet_id}/operations",
                    web::get().to(list_operations),
                )
                .route("/wallet", web::post().to(add_operation)),
        )
        .route("/metrics", web::get().to(metrics_endpoint))
        .route("/health", web::get().to(health_check));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;
    use wallet_core::{MemoryStore, WalletStore};

    async fn seeded_service(balance: i64) -> (Arc<WalletService>, WalletId) {
        let store = MemoryStore::new();
        let id = WalletId::generate();
        store.create_wallet(id, balance).await.unwrap();
        (Arc::new(WalletService::new(Arc::new(store))), id)
    }

    macro_rules! app {
        ($service:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($service.clone()))
                    .configure(configure_routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_get_wallet() {
        let (service, id) = seeded_service(4_200).await;
        let app = app!(service);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/wallets/{}", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["id"], id.to_string());
        assert_eq!(body["balance"], 4_200);
    }

    #[actix_web::test]
    async fn test_get_wallet_invalid_id() {
        let (service, _) = seeded_service(0).await;
        let app = app!(service);

        let req = test::TestRequest::get()
            .uri("/api/v1/wallets/not-a-uuid")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "validation_error");
    }

    #[actix_web::test]
    async fn test_get_wallet_not_found() {
        let (service, _) = seeded_service(0).await;
        let app = app!(service);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/wallets/{}", WalletId::generate()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "wallet_not_found");
        assert_eq!(body["error"]["retryable"], false);
    }

    #[actix_web::test]
    async fn test_deposit() {
        let (service, id) = seeded_service(0).await;
        let app = app!(service);

        let req = test::TestRequest::post()
            .uri("/api/v1/wallet")
            .set_json(json!({
                "wallet_id": id,
                "operation_type": "DEPOSIT",
                "amount": 100
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["wallet"]["id"], id.to_string());
        assert_eq!(body["wallet"]["balance"], 10_000);
    }

    #[actix_web::test]
    async fn test_withdraw_insufficient_funds() {
        let (service, id) = seeded_service(5_000).await;
        let app = app!(service);

        let req = test::TestRequest::post()
            .uri("/api/v1/wallet")
            .set_json(json!({
                "wallet_id": id,
                "operation_type": "WITHDRAW",
                "amount": 51
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "insufficient_funds");
        assert_eq!(service.get_wallet(id).await.unwrap().balance, 5_000);
    }

    #[actix_web::test]
    async fn test_operation_on_unknown_wallet() {
        let (service, _) = seeded_service(0).await;
        let app = app!(service);

        let req = test::TestRequest::post()
            .uri("/api/v1/wallet")
            .set_json(json!({
                "wallet_id": WalletId::generate(),
                "operation_type": "DEPOSIT",
                "amount": 1
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_bad_request_bodies() {
        let (service, id) = seeded_service(1_000).await;
        let app = app!(service);

        let bodies = [
            json!({ "wallet_id": id, "operation_type": "DEPOSIT", "amount": 0 }),
            json!({ "wallet_id": id, "operation_type": "DEPOSIT", "amount": -100 }),
            json!({ "wallet_id": id, "operation_type": "TRANSFER", "amount": 10 }),
            json!({ "wallet_id": "not-a-uuid", "operation_type": "DEPOSIT", "amount": 10 }),
            json!({ "operation_type": "DEPOSIT", "amount": 10 }),
        ];

        for body in bodies {
            let req = test::TestRequest::post()
                .uri("/api/v1/wallet")
                .set_json(&body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");

            let error: Value = test::read_body_json(resp).await;
            assert_eq!(error["error"]["type"], "validation_error");
        }

        assert_eq!(service.get_wallet(id).await.unwrap().balance, 1_000);
    }

    #[actix_web::test]
    async fn test_unknown_operation_type_names_valid_kinds() {
        let (service, id) = seeded_service(0).await;
        let app = app!(service);

        let req = test::TestRequest::post()
            .uri("/api/v1/wallet")
            .set_json(json!({ "wallet_id": id, "operation_type": "REFUND", "amount": 1 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains("DEPOSIT") && message.contains("WITHDRAW"));
    }

    #[actix_web::test]
    async fn test_list_operations() {
        let (service, id) = seeded_service(5_000).await;
        let app = app!(service);

        for (kind, amount) in [("DEPOSIT", 10), ("WITHDRAW", 15), ("DEPOSIT", 25)] {
            let req = test::TestRequest::post()
                .uri("/api/v1/wallet")
                .set_json(json!({ "wallet_id": id, "operation_type": kind, "amount": amount }))
                .to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/wallets/{}/operations", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        let operations = body["operations"].as_array().unwrap();
        assert_eq!(operations.len(), 4);
        assert_eq!(operations[2]["operation_type"], "WITHDRAW");
        assert_eq!(operations[2]["amount"], 1_500);
        assert_eq!(service.get_wallet(id).await.unwrap().balance, 7_000);
    }

    #[actix_web::test]
    async fn test_health_and_metrics() {
        let (service, _) = seeded_service(0).await;
        let app = app!(service);

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "wallet-api");

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
