use crate::dispatcher::Dispatch;
use crate::error::ProxyError;
use crate::item::{Customer, MAX_BATCH};
use crate::strategy::Strategy;
use actix_web::{HttpRequest, HttpResponse, Responder, get, post, web};
use serde::Deserialize;

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

#[derive(Deserialize)]
struct ProxyRequest {
    sequences: Vec<String>,
}

#[post("/proxy_classify")]
async fn proxy_classify(
    dispatch: web::Data<Dispatch>,
    req: HttpRequest,
    body: web::Json<ProxyRequest>,
) -> Result<impl Responder, ProxyError> {
    let body = body.into_inner();
    if body.sequences.is_empty() || body.sequences.len() > MAX_BATCH {
        return Err(ProxyError::Validation);
    }

    let customer = Customer::from_header(req.headers().get("X-Customer-Id").and_then(|v| v.to_str().ok()));

    let (results, proxy_latency_ms) = dispatch.request(customer, body.sequences).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "results": results,
        "proxy_latency_ms": proxy_latency_ms,
    })))
}

#[derive(Deserialize)]
struct StrategyQuery {
    new_strategy: String,
}

#[post("/strategy")]
async fn set_strategy(
    dispatch: web::Data<Dispatch>,
    query: web::Query<StrategyQuery>,
) -> Result<impl Responder, ProxyError> {
    let strategy: Strategy = query
        .new_strategy
        .parse()
        .map_err(|_| ProxyError::InvalidStrategy(query.new_strategy.clone()))?;
    dispatch.set_strategy(strategy);
    Ok(HttpResponse::Ok().json(serde_json::json!({ "active_strategy": strategy.to_string() })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(proxy_classify).service(set_strategy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downstream::DownstreamClient;
    use crate::queue::QueueSet;
    use crate::strategy::StrategyRegister;
    use actix_web::{App, test};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    fn bare_dispatch(initial: Strategy) -> Dispatch {
        let queues = Arc::new(Mutex::new(QueueSet::new()));
        let strategy = Arc::new(StrategyRegister::new(initial));
        Dispatch::new(queues, strategy)
    }

    #[actix_web::test]
    async fn health_ok() {
        let app = test::init_service(App::new().service(health)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

        let body = test::read_body(resp).await;
        assert_eq!(body, "ok");
    }

    #[actix_web::test]
    async fn proxy_classify_rejects_empty_sequences() {
        let dispatch = bare_dispatch(Strategy::Sjf);
        let app = test::init_service(App::new().app_data(web::Data::new(dispatch)).service(proxy_classify)).await;

        let req = test::TestRequest::post()
            .uri("/proxy_classify")
            .set_json(serde_json::json!({ "sequences": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
        let body = test::read_body(resp).await;
        assert!(String::from_utf8_lossy(&body).contains("Need 1"));
    }

    #[actix_web::test]
    async fn proxy_classify_rejects_six_sequences() {
        let dispatch = bare_dispatch(Strategy::Sjf);
        let app = test::init_service(App::new().app_data(web::Data::new(dispatch)).service(proxy_classify)).await;

        let req = test::TestRequest::post()
            .uri("/proxy_classify")
            .set_json(serde_json::json!({ "sequences": ["a", "a", "a", "a", "a", "a"] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn strategy_switch_is_idempotent_and_rejects_invalid() {
        let dispatch = bare_dispatch(Strategy::Sjf);
        let app = test::init_service(App::new().app_data(web::Data::new(dispatch)).service(set_strategy)).await;

        let req = test::TestRequest::post().uri("/strategy?new_strategy=fair").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["active_strategy"], "fair");

        let req = test::TestRequest::post().uri("/strategy?new_strategy=invalid").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNPROCESSABLE_ENTITY);
    }

    /// Spins up a local toy classifier on an ephemeral port, wires a real
    /// Dispatch + Dispatcher against it, and drives `/proxy_classify`
    /// end to end.
    async fn live_dispatch(strategy: Strategy) -> Dispatch {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = actix_web::HttpServer::new(|| {
            actix_web::App::new().route(
                "/classify",
                web::post().to(|body: web::Json<serde_json::Value>| async move {
                    let seqs = body["sequences"].as_array().cloned().unwrap_or_default();
                    let results: Vec<String> = seqs
                        .iter()
                        .map(|s| {
                            let text = s.as_str().unwrap_or_default();
                            if [";", "{", "}", "def ", "class "].iter().any(|tok| text.contains(tok)) {
                                "code".to_string()
                            } else {
                                "not code".to_string()
                            }
                        })
                        .collect();
                    HttpResponse::Ok().json(serde_json::json!({ "results": results }))
                }),
            )
        })
        .listen(listener)
        .unwrap()
        .run();
        tokio::spawn(server);

        let queues = Arc::new(Mutex::new(QueueSet::new()));
        let strategy_reg = Arc::new(StrategyRegister::new(strategy));
        let downstream = Arc::new(DownstreamClient::new(
            format!("http://{addr}/classify"),
            Duration::from_secs(10),
        ));
        let shutdown = Arc::new(std::sync::atomic::AtomicBool::new(false));
        crate::dispatcher::Dispatcher::new(
            queues.clone(),
            strategy_reg.clone(),
            downstream,
            Duration::from_millis(5),
            Duration::from_millis(50),
            shutdown,
        )
        .run();

        Dispatch::new(queues, strategy_reg)
    }

    #[actix_web::test]
    async fn end_to_end_single_small_request() {
        let dispatch = live_dispatch(Strategy::Sjf).await;
        let app = test::init_service(App::new().app_data(web::Data::new(dispatch)).service(proxy_classify)).await;

        let req = test::TestRequest::post()
            .uri("/proxy_classify")
            .insert_header(("X-Customer-Id", "A"))
            .set_json(serde_json::json!({ "sequences": ["def foo(): pass"] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["results"], serde_json::json!(["code"]));
        assert!(body["proxy_latency_ms"].as_i64().unwrap() >= 0);
    }

    #[actix_web::test]
    async fn end_to_end_mixed_request() {
        let dispatch = live_dispatch(Strategy::Fcfs).await;
        let app = test::init_service(App::new().app_data(web::Data::new(dispatch)).service(proxy_classify)).await;

        let req = test::TestRequest::post()
            .uri("/proxy_classify")
            .set_json(serde_json::json!({
                "sequences": ["def foo(): pass", "hello world", "class Bar:", "just text", "{code}"]
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(
            body["results"],
            serde_json::json!(["code", "not code", "code", "not code", "code"])
        );
    }
}
