//! pir-bench: end-to-end hypercube PIR benchmark
//!
//! Builds a random database, runs one private retrieval through the wire
//! format, checks the result against a copy, and reports network sizes and
//! client/server timings.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hypercube_pir::params::{gen_params, PirParams, SchemeParams};
use hypercube_pir::pir::{
    deserialize_query, deserialize_reply, serialize_query, serialize_reply, PhaseTimings,
    PirClient, PirServer, TimingSnapshot,
};

#[derive(Parser)]
#[command(name = "pir-bench")]
#[command(about = "Benchmark one hypercube PIR retrieval")]
#[command(version)]
struct Args {
    /// Number of items in the database
    #[arg(long, default_value = "96151")]
    items: u64,

    /// Bytes per item
    #[arg(long, default_value = "15360")]
    item_size: usize,

    /// Ring dimension N
    #[arg(long, default_value = "4096")]
    ring_dim: usize,

    /// Plaintext bit-width (recommended: 12 with d=2, or 8 with d=1)
    #[arg(long, default_value = "30")]
    logt: u32,

    /// Hypercube dimension count d
    #[arg(long, short = 'd', default_value = "2")]
    dims: usize,

    /// Item to retrieve (random if omitted)
    #[arg(long)]
    index: Option<u64>,

    /// Seed for the database, keys and index (OS entropy if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Write a JSON report to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report {
    scheme: SchemeParams,
    pir: PirParams,
    item_index: u64,
    fv_index: u64,
    fv_offset: u64,
    galois_key_bytes: usize,
    query_bytes: usize,
    reply_bytes: usize,
    reply_ciphertexts: usize,
    query_gen_us: u64,
    decode_us: u64,
    preprocess_us: u64,
    reply_blackbox_us: u64,
    phases: TimingSnapshot,
    sum_of_components_us: u64,
    noise_budget_bits: u32,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Hypercube PIR benchmark");
    info!(
        "items={} item_size={} N={} logt={} d={}",
        args.items, args.item_size, args.ring_dim, args.logt, args.dims
    );

    let (scheme, pir) = gen_params(args.items, args.item_size, args.ring_dim, args.logt, args.dims)
        .wrap_err("Failed to derive parameters")?;
    info!(
        "Parameters: moduli={} dims={:?} elements/pt={} expansion_ratio={}",
        scheme.moduli.len(),
        pir.dims,
        pir.elements_per_plaintext,
        pir.expansion_ratio
    );

    let mut rng = match args.seed {
        Some(seed) => ChaCha20Rng::seed_from_u64(seed),
        None => ChaCha20Rng::from_entropy(),
    };

    info!("Initializing the database (this may take some time)...");
    let db = random_database(&mut rng, args.items, args.item_size)?;
    let db_copy = db.clone();

    let timings = Arc::new(PhaseTimings::new());
    let mut server = PirServer::with_metrics(scheme.clone(), pir.clone(), timings.clone())
        .wrap_err("Failed to create server")?;
    let mut client = PirClient::with_seed(scheme.clone(), pir.clone(), rng.gen())
        .wrap_err("Failed to create client")?;

    let galois_keys = client.generate_galois_keys();
    let galois_key_bytes = galois_keys.size();
    info!("Galois key size: {} bytes", galois_key_bytes);
    server.set_galois_key(0, galois_keys);

    let pre_start = Instant::now();
    server
        .set_database(db, args.items, args.item_size)
        .wrap_err("Failed to load database")?;
    server
        .preprocess_database()
        .wrap_err("Failed to preprocess database")?;
    let preprocess_us = micros(pre_start);
    info!("Database preprocessed");

    let item_index = args.index.unwrap_or_else(|| rng.gen_range(0..args.items));
    let fv_index = client.get_fv_index(item_index, args.item_size)?;
    let fv_offset = client.get_fv_offset(item_index, args.item_size)?;
    info!("Element index = {} from [0, {}]", item_index, args.items - 1);
    info!("FV index = {}, FV offset = {}", fv_index, fv_offset);

    let query_start = Instant::now();
    let query = client.generate_query(fv_index)?;
    let query_gen_us = micros(query_start);

    let query_wire = serialize_query(&query)?;
    let query = deserialize_query(&query_wire, pir.num_dims(), &scheme)
        .wrap_err("Query did not survive the wire format")?;

    let server_start = Instant::now();
    let reply = server.generate_reply(&query, 0)?;
    let reply_blackbox_us = micros(server_start);

    let reply_wire = serialize_reply(&reply)?;
    let reply = deserialize_reply(&reply_wire, &scheme)?;

    let decode_start = Instant::now();
    let item = client.decode_item(&reply, item_index)?;
    let decode_us = micros(decode_start);

    let base = item_index as usize * args.item_size;
    let expected = &db_copy[base..base + args.item_size];
    if let Some(pos) = item.iter().zip(expected).position(|(a, b)| a != b) {
        eyre::bail!(
            "PIR result wrong at byte {}: got {}, expected {}",
            pos,
            item[pos],
            expected[pos]
        );
    }
    info!("PIR result correct!");

    let phases = timings.snapshot();
    let report = Report {
        reply_ciphertexts: reply.len(),
        noise_budget_bits: client.reply_noise_budget(&reply),
        scheme,
        pir,
        item_index,
        fv_index,
        fv_offset,
        galois_key_bytes,
        query_bytes: query_wire.len(),
        reply_bytes: reply_wire.len(),
        query_gen_us,
        decode_us,
        preprocess_us,
        reply_blackbox_us,
        sum_of_components_us: phases.total_us(),
        phases,
    };
    print_report(&report);

    if let Some(path) = &args.json {
        let file = File::create(path)
            .wrap_err_with(|| format!("Failed to create report file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &report).wrap_err("Failed to write report")?;
        writer.flush()?;
        info!("Report saved to {}", path.display());
    }

    Ok(())
}

fn random_database(rng: &mut ChaCha20Rng, items: u64, item_size: usize) -> Result<Vec<u8>> {
    let pb = ProgressBar::new(items);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let mut db = vec![0u8; items as usize * item_size];
    for (idx, item) in db.chunks_mut(item_size).enumerate() {
        rng.fill_bytes(item);
        if idx % 10000 == 0 {
            pb.set_position(idx as u64);
        }
    }
    pb.finish_with_message("Done");
    Ok(db)
}

fn micros(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

fn print_report(report: &Report) {
    println!();
    println!("Network:");
    println!("\tquery size (bytes): {}", report.query_bytes);
    println!(
        "\tresponse size (bytes): {} ({} ciphertexts)",
        report.reply_bytes, report.reply_ciphertexts
    );
    println!("\tgalois key size (bytes): {}", report.galois_key_bytes);

    println!();
    println!("Client CPU:");
    println!("\tquery generation time (us): {}", report.query_gen_us);
    println!("\tresponse decode time (us): {}", report.decode_us);

    println!();
    println!("Server CPU:");
    println!("\tDB pre-processing time (us): {}", report.preprocess_us);
    println!("\treply generation time (blackbox): {}", report.reply_blackbox_us);
    for (name, us) in report.phases.entries() {
        println!("\t{} time (us): {}", name, us);
    }
    println!("\tsum of components: {}", report.sum_of_components_us);

    println!();
    println!("Noise budget left: {} bits", report.noise_budget_bits);
}
