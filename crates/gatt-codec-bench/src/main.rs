//! Benchmark for batch decoding of GATT records.
//!
//! Usage: `bench-records [batch.json] [iterations]`
//!
//! The batch file is a JSON array of `{ "record": "0x2A19", "value": "64" }`
//! entries; `record` is an identifier or record name, `value` the payload in
//! hex. Without a file a glucose / heart-rate batch is synthesised.

use std::fs;
use std::hint::black_box;
use std::time::Instant;

use gatt_codec::catalog::{
    BatteryLevel, BodySensorLocation, GlucoseMeasurement, GlucoseMeasurementContext,
    HeartRateMeasurement, Humidity, Pressure, Temperature,
};
use gatt_codec::{Batch, Engine, KnownRecord, Registry};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ITERATIONS: usize = 100_000;

// =============================================================================
// JSON DATA STRUCTURES
// =============================================================================

#[derive(Debug, Deserialize)]
struct RecordEntry {
    record: String,
    value: String,
}

fn load_batch(engine: &Engine<&'static Registry>, path: &str) -> Batch {
    let json = fs::read_to_string(path).expect("Failed to read batch file");
    let entries: Vec<RecordEntry> = serde_json::from_str(&json).expect("Failed to parse JSON");

    let mut batch = Batch::with_capacity(entries.len());
    for entry in entries {
        let Some(id) = engine.lookup(&entry.record) else {
            warn!(record = %entry.record, "unknown record, skipping");
            continue;
        };
        match hex::decode(entry.value.trim()) {
            Ok(raw) => {
                batch.insert(id, raw);
            }
            Err(err) => warn!(record = %entry.record, error = %err, "invalid hex payload, skipping"),
        }
    }
    batch
}

fn synthetic_batch() -> Batch {
    Batch::new()
        // Context first: the engine has to reorder it behind its measurement
        .with(GlucoseMeasurementContext::ID, hex_payload("4e07000151100e3244f2"))
        .with(
            GlucoseMeasurement::ID,
            hex_payload("1307 00e8070301081e00f1ffb6b312"),
        )
        .with(HeartRateMeasurement::ID, hex_payload("1648 0a000003"))
        .with(BodySensorLocation::ID, hex_payload("01"))
        .with(BatteryLevel::ID, hex_payload("64"))
        .with(Temperature::ID, hex_payload("6608"))
        .with(Humidity::ID, hex_payload("c611"))
        .with(Pressure::ID, hex_payload("02760f00"))
}

fn hex_payload(s: &str) -> Vec<u8> {
    let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(digits).expect("Invalid built-in payload")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().expect("valid directive")))
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next();
    let iterations = args
        .next()
        .map(|n| n.parse::<usize>().expect("iterations must be a number"))
        .unwrap_or(DEFAULT_ITERATIONS);

    let engine = Engine::new(Registry::standard());
    let batch = match path.as_deref() {
        Some(path) => {
            info!(path, "loading batch");
            load_batch(&engine, path)
        }
        None => synthetic_batch(),
    };
    let total_bytes: usize = batch.iter().map(|(_, raw)| raw.len()).sum();
    println!("Batch: {} records, {} bytes", batch.len(), total_bytes);

    // Warm up, and keep one result for the summary
    let results = engine.decode_batch(batch.clone());

    let start = Instant::now();
    for _ in 0..iterations {
        black_box(engine.decode_batch(black_box(batch.clone())));
    }
    let elapsed = start.elapsed();

    let per_batch = elapsed / iterations.max(1) as u32;
    let records = (batch.len() * iterations) as f64;
    println!("\nDecoded {} batches in {:?}", iterations, elapsed);
    println!("  Per batch: {:?}", per_batch);
    println!("  Throughput: {:.0} records/s", records / elapsed.as_secs_f64());

    println!("\nDecode order:");
    for id in results.decode_order() {
        println!("  {}", id);
    }
    if results.has_cycles() {
        println!("  cycles: {:?}", results.cycles());
    }

    println!("\nResults:");
    for result in &results {
        let name = result.name().unwrap_or("(unknown)");
        match result.outcome() {
            Ok(value) => println!("  {} {:<30} ok   {:?}", result.id(), name, value),
            Err(err) => println!("  {} {:<30} FAIL {}", result.id(), name, err),
        }
    }
    println!(
        "\n{} succeeded, {} failed",
        results.succeeded().count(),
        results.failed().count()
    );
}
