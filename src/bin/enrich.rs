// src/bin/enrich.rs
// Operator CLI: resolve missing coordinates for stored trips.
//
//   enrich <trip-id>...
//   enrich --owner someone@example.com
use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::time::{Duration, Instant};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct EnrichResponse {
    trip_id: String,
    #[serde(default)]
    candidates: usize,
    #[serde(default)]
    resolved: usize,
    #[serde(default)]
    written: usize,
}

#[derive(Deserialize)]
struct TripSummary {
    id: String,
}

#[derive(Debug)]
struct EnrichResult {
    trip_id: String,
    success: bool,
    candidates: usize,
    resolved: usize,
    written: usize,
    duration_secs: f64,
}

enum Target {
    Trips(Vec<String>),
    Owner(String),
}

fn parse_args(args: &[String]) -> Result<Target> {
    match args {
        [] => bail!("usage: enrich <trip-id>... | enrich --owner <email>"),
        [flag, owner] if flag == "--owner" => Ok(Target::Owner(owner.clone())),
        [flag, ..] if flag == "--owner" => bail!("--owner takes exactly one email"),
        ids => Ok(Target::Trips(ids.to_vec())),
    }
}

struct TripEnricher {
    base_url: String,
    client: Client,
    results: Vec<EnrichResult>,
}

impl TripEnricher {
    fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url,
            client,
            results: Vec::new(),
        })
    }

    async fn check_service_health(&self) -> bool {
        match self.client.get(format!("{}/health", self.base_url)).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn trips_of(&self, owner: &str) -> Result<Vec<String>> {
        let trips: Vec<TripSummary> = self
            .client
            .get(format!("{}/trips", self.base_url))
            .query(&[("owner", owner)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse trip list")?;
        Ok(trips.into_iter().map(|t| t.id).collect())
    }

    async fn enrich_trip(&self, trip_id: &str) -> Result<EnrichResponse> {
        let response = self
            .client
            .post(format!("{}/trips/{}/enrich", self.base_url, trip_id))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("HTTP {} - {}", status, body);
        }
        response
            .json::<EnrichResponse>()
            .await
            .context("Failed to parse response JSON")
    }

    async fn run(&mut self, trip_ids: Vec<String>) {
        println!("\n{}Enriching {} trips{}\n", BOLD, trip_ids.len(), RESET);

        let total = trip_ids.len();
        for (i, trip_id) in trip_ids.into_iter().enumerate() {
            let started = Instant::now();
            println!("{}[{}/{}] {}...{}", CYAN, i + 1, total, trip_id, RESET);

            let outcome = self.enrich_trip(&trip_id).await;
            let duration_secs = started.elapsed().as_secs_f64();

            match outcome {
                Ok(resp) => {
                    println!(
                        "{}  {} missing, {} found, {} saved ({:.1}s){}",
                        GREEN, resp.candidates, resp.resolved, resp.written, duration_secs, RESET
                    );
                    self.results.push(EnrichResult {
                        trip_id: resp.trip_id,
                        success: true,
                        candidates: resp.candidates,
                        resolved: resp.resolved,
                        written: resp.written,
                        duration_secs,
                    });
                }
                Err(e) => {
                    println!("{}  failed: {}{}", RED, e, RESET);
                    self.results.push(EnrichResult {
                        trip_id,
                        success: false,
                        candidates: 0,
                        resolved: 0,
                        written: 0,
                        duration_secs,
                    });
                }
            }

            // Spread lookups out; the server rate-limits outbound calls anyway
            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        self.print_summary();
    }

    fn print_summary(&self) {
        println!("\n{}Summary{}", BOLD, RESET);
        println!("{:<20} {:<8} {:>8} {:>8} {:>8} {:>9}", "Trip", "Status", "Missing", "Found", "Saved", "Duration");

        for res in &self.results {
            println!(
                "{:<20} {:<8} {:>8} {:>8} {:>8} {:>8.1}s",
                res.trip_id,
                if res.success { "ok" } else { "failed" },
                res.candidates,
                res.resolved,
                res.written,
                res.duration_secs
            );
        }

        let failed = self.results.iter().filter(|r| !r.success).count();
        let written: usize = self.results.iter().map(|r| r.written).sum();
        println!("\nSaved coordinates for {} entities", written);
        if failed > 0 {
            println!("{}{} trips failed{}", YELLOW, failed, RESET);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    let target = parse_args(&args)?;
    let base_url = env::var("TRIP_LOCATIONS_URL").unwrap_or_else(|_| "http://localhost:8003".to_string());

    let mut enricher = TripEnricher::new(base_url)?;
    if !enricher.check_service_health().await {
        bail!("Service unavailable at {}", enricher.base_url);
    }

    let trip_ids = match target {
        Target::Trips(ids) => ids,
        Target::Owner(owner) => enricher.trips_of(&owner).await?,
    };
    if trip_ids.is_empty() {
        println!("{}No trips to enrich{}", YELLOW, RESET);
        return Ok(());
    }

    enricher.run(trip_ids).await;
    Ok(())
}
