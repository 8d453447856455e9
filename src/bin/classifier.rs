//! Toy downstream classification server, a stand-in for the real
//! classifier the proxy fronts. Labels text as "code" or "not code"
//! and sleeps `(longest_len^2) / 1_000_000` seconds per call to
//! simulate super-linear cost in the longest sequence.
use actix_web::{App, HttpResponse, HttpServer, post, web};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const CODE_TOKENS: [&str; 5] = [";", "{", "}", "def ", "class "];

#[derive(Deserialize)]
struct ClassifyRequest {
    sequences: Vec<String>,
}

#[derive(Serialize)]
struct ClassifyResponse {
    results: Vec<String>,
}

fn is_code(text: &str) -> bool {
    CODE_TOKENS.iter().any(|tok| text.contains(tok))
}

#[post("/classify")]
async fn classify(body: web::Json<ClassifyRequest>) -> Result<HttpResponse, actix_web::Error> {
    if !(1..=5).contains(&body.sequences.len()) {
        return Ok(HttpResponse::BadRequest().body("Need 1 - 5 sequences per request"));
    }

    let longest = body.sequences.iter().map(|s| s.len()).max().unwrap_or(0);
    let delay_micros = (longest as u64).saturating_pow(2);
    tokio::time::sleep(Duration::from_micros(delay_micros)).await;

    let results = body
        .sequences
        .iter()
        .map(|s| if is_code(s) { "code".to_string() } else { "not code".to_string() })
        .collect();

    Ok(HttpResponse::Ok().json(ClassifyResponse { results }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let bind_addr = env::var("CLASSIFIER_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8001".into());

    tracing::info!("starting toy classifier on {bind_addr}");
    HttpServer::new(|| App::new().service(classify)).bind(bind_addr)?.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_code_tokens() {
        assert!(is_code("def foo(): pass"));
        assert!(is_code("class Bar:"));
        assert!(is_code("{code}"));
        assert!(!is_code("hello world"));
        assert!(!is_code("just text"));
    }
}
