//! HTTP client tests against a mock registration backend.
//!
//! `HttpRegistrationApi` wraps `reqwest::blocking`, which owns its own
//! runtime and cannot be built or dropped inside an async context, so every
//! client call runs inside `tokio::task::spawn_blocking`.

use std::time::Duration;

use bnreg::domain::{
    DocumentSlot, EncodedDocument, FieldUpdate, RegistrationState, TextField, build_submission,
};
use bnreg::infrastructure::{
    ApiError, HttpRegistrationApi, NameCheckRequest, PaymentRequest, RegistrationApi,
};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn blocking<T, F>(server: &MockServer, call: F) -> T
where
    F: FnOnce(HttpRegistrationApi) -> T + Send + 'static,
    T: Send + 'static,
{
    let base = format!("{}/api/merchant", server.uri());
    tokio::task::spawn_blocking(move || {
        let api = HttpRegistrationApi::new(&base, Duration::from_secs(5)).expect("client builds");
        call(api)
    })
    .await
    .expect("task")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn name_check_posts_proposed_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/merchant/check-bn"))
        .and(body_json(json!({"proposedName": "Ada Ventures", "lineOfBusiness": "Retail"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Name is available for registration",
            "data": {"recommendedNames": ["Ada Ventures Global"]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = blocking(&server, |api| {
        api.check_name(&NameCheckRequest {
            proposed_name: "Ada Ventures".to_string(),
            line_of_business: "Retail".to_string(),
        })
    })
    .await
    .expect("name check");

    assert!(outcome.available);
    assert_eq!(outcome.recommendations, vec!["Ada Ventures Global".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn payment_initialize_returns_checkout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/merchant/payments/initialize"))
        .and(body_json(json!({
            "amount": 12900,
            "walletId": "wallet-1",
            "currency": "NGN",
            "metadata": {"businessName": "Ada Ventures"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "checkout": {"data": {
                "authorization_url": "https://checkout.example/pay/xyz",
                "reference": "PSK-991"
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let checkout = blocking(&server, |api| {
        api.initialize_payment(&PaymentRequest {
            amount: 12_900,
            wallet_id: "wallet-1".to_string(),
            currency: "NGN".to_string(),
            metadata: json!({"businessName": "Ada Ventures"}),
        })
    })
    .await
    .expect("initialize");

    assert_eq!(checkout.authorization_url, "https://checkout.example/pay/xyz");
    assert_eq!(checkout.reference, "PSK-991");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn payment_status_is_lowercased() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/merchant/payments/checkout/status/PSK-991"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"checkout": {"data": {"status": "SUCCESS"}}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let status = blocking(&server, |api| api.payment_status("PSK-991"))
        .await
        .expect("status");
    assert_eq!(status, "success");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn error_responses_carry_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/merchant/check-status/MISSING"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Application not found"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/merchant/payments/checkout/status/DOWN"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let (missing, down) = blocking(&server, |api| {
        (api.application_status("MISSING"), api.payment_status("DOWN"))
    })
    .await;

    match missing {
        Err(ApiError::Status { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Application not found");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert_eq!(
        down.expect_err("503 is an error").to_string(),
        "503: Service Unavailable"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn application_status_reads_entity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/merchant/check-status/BN-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Status retrieved",
            "data": {
                "status": "APPROVED",
                "transactionRef": "BN-1",
                "data": {"rcNumber": "BN 1234567", "entityName": "ADA VENTURES"}
            }
        })))
        .mount(&server)
        .await;

    let status = blocking(&server, |api| api.application_status("BN-1"))
        .await
        .expect("status");
    assert_eq!(status.status, "APPROVED");
    assert_eq!(status.message, "Status retrieved");
    assert_eq!(status.entity.expect("entity").entity_name, "ADA VENTURES");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn registration_is_sent_as_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/merchant/reg-bn"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"data": {"transactionRef": "CAC-42"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut state = RegistrationState::default();
    state
        .apply(FieldUpdate::Text(TextField::FirstName, "Ada".to_string()))
        .unwrap();
    state
        .apply(FieldUpdate::Text(
            TextField::ResidentialAddress,
            "41 Limpopo Street".to_string(),
        ))
        .unwrap();
    state
        .apply(FieldUpdate::Document(
            DocumentSlot::Passport,
            Some(EncodedDocument::from_bytes("image/png", b"\x89PNG")),
        ))
        .unwrap();
    let payload = build_submission(&state, "ABCDEFGH12345678").unwrap();

    let ack = blocking(&server, move |api| api.register(&payload))
        .await
        .expect("register");
    assert_eq!(ack.transaction_ref.as_deref(), Some("CAC-42"));

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let content_type = requests[0]
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"));

    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"proprietorFirstname\"\r\n\r\nAda\r\n"));
    assert!(body.contains("name=\"proprietorStreetNumber\"\r\n\r\n41\r\n"));
    assert!(body.contains("name=\"transactionRef\"\r\n\r\nABCDEFGH12345678\r\n"));
    assert!(body.contains("name=\"passport\"; filename=\"passport.png\""));
    assert!(body.contains("Content-Type: image/png"));
    assert!(!body.contains("name=\"signature\""));
}

#[test]
fn base_url_is_rooted_under_merchant_path() {
    let api = HttpRegistrationApi::new("http://127.0.0.1:1/api/merchant", Duration::from_secs(1))
        .expect("client builds");
    assert_eq!(api.base_url().as_str(), "http://127.0.0.1:1/api/merchant/");
}
