//! Synthetic load generator. Emits traffic from two fake customers:
//! A bursts several short snippets, B sends one large block, both
//! against a running proxy, and reports observed end-to-end latency
//! alongside the proxy's own self-reported `proxy_latency_ms`.
use clap::Parser;
use rand::Rng;
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the proxy's /proxy_classify endpoint.
    #[arg(long, default_value = "http://localhost:8000/proxy_classify")]
    url: String,

    /// How many burst/block cycles each simulated customer sends.
    #[arg(short, long, default_value_t = 20)]
    rounds: usize,

    /// Customer A's burst size (snippets per request).
    #[arg(long, default_value_t = 5)]
    burst_size: usize,
}

fn random_snippet(rng: &mut impl Rng) -> &'static str {
    if rng.random_bool(0.5) { "def foo(): pass" } else { "hello world" }
}

async fn customer_a(client: Client, url: String, rounds: usize, burst_size: usize, successes: Arc<AtomicUsize>) {
    let mut rng = rand::rng();
    for _ in 0..rounds {
        let sequences: Vec<String> = (0..burst_size)
            .map(|_| random_snippet(&mut rng).chars().take(5).collect())
            .collect();

        let t0 = Instant::now();
        let resp = client
            .post(&url)
            .header("X-Customer-Id", "A")
            .json(&serde_json::json!({ "sequences": sequences }))
            .send()
            .await;
        report("A", t0.elapsed(), resp, &successes).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
}

async fn customer_b(client: Client, url: String, rounds: usize, successes: Arc<AtomicUsize>) {
    for _ in 0..rounds {
        let block = format!("class X:\n{}", "    pass\n".repeat(80));

        let t0 = Instant::now();
        let resp = client
            .post(&url)
            .header("X-Customer-Id", "B")
            .json(&serde_json::json!({ "sequences": [block] }))
            .send()
            .await;
        report("B", t0.elapsed(), resp, &successes).await;
        tokio::time::sleep(Duration::from_millis(450)).await;
    }
}

async fn report(label: &str, elapsed: Duration, resp: reqwest::Result<reqwest::Response>, successes: &Arc<AtomicUsize>) {
    match resp {
        Ok(r) if r.status().is_success() => {
            successes.fetch_add(1, Ordering::Relaxed);
            let body: serde_json::Value = r.json().await.unwrap_or_default();
            println!(
                "{label}: done in {:6.1} ms (proxy said {} ms)",
                elapsed.as_secs_f64() * 1_000.0,
                body["proxy_latency_ms"]
            );
        }
        Ok(r) => {
            let status = r.status();
            let text = r.text().await.unwrap_or_default();
            println!("{label}: error {status}: {text}");
        }
        Err(e) => println!("{label}: request failed: {e}"),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let client = Client::builder().build().expect("reqwest client");
    let successes = Arc::new(AtomicUsize::new(0));

    let a = tokio::spawn(customer_a(
        client.clone(),
        args.url.clone(),
        args.rounds,
        args.burst_size,
        successes.clone(),
    ));
    let b = tokio::spawn(customer_b(client, args.url, args.rounds, successes.clone()));

    let _ = tokio::join!(a, b);
    println!("total successful requests: {}", successes.load(Ordering::Relaxed));
}
