//! ## Example usage of the [`bioauth`] crate.
//!
//! Each session runs the two parties on their own worker threads, connected by
//! an [`InMemoryChannel`] pair. The main thread enrolls a random template
//! database, derives a noisy query from one enrolled template, starts the
//! workers and collects their reports.
//!
//! # Warning: Trust Model
//! The similarity stage is the in-process [`ClearDotProduct`] stand-in and
//! the comparison gate is [`SimulatedDrelu`]; neither hides anything. The
//! example shows the message flow and the cost of the tournament, not its
//! privacy.
//!
//! Logging is controlled through `RUST_LOG`, for example
//! `RUST_LOG=bioauth=debug cargo run --example threaded`.
// Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

use anyhow::anyhow;
use bioauth::{
    party::{Initiator, Responder},
    ClearDotProduct, FaultyChannel, InMemoryChannel, Party, ProtocolConfig, ResponderReport,
    Score, SessionId, SessionReport, SimulatedDrelu,
};
use clap::{command, Parser};
use itertools::Itertools;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::thread;
use tracing::{info, instrument, span, warn, Level};
use tracing_subscriber::{self, EnvFilter};
use uuid::Uuid;

/// Range of one template coordinate.
const COORDINATE_RANGE: std::ops::RangeInclusive<Score> = -64..=64;
/// Range of the noise added to every coordinate of the query.
const NOISE_RANGE: std::ops::RangeInclusive<Score> = -4..=4;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of authentication sessions to run.
    #[arg(short, long, default_value_t = 3)]
    sessions: usize,
    /// Width of the comparison ring. Scores are only ordered exactly when
    /// they differ by less than 2^(bits - 1).
    #[arg(short, long, default_value_t = 32)]
    bits: u32,
    /// Score the best match must reach to authenticate.
    #[arg(short, long, default_value_t = 1_000_000)]
    threshold: Score,
    /// Number of enrolled identities.
    #[arg(short, long, default_value_t = 512)]
    database_size: usize,
    /// Length of one template.
    #[arg(long, default_value_t = 1024)]
    dimension: usize,
    /// First comparison seed of every session.
    #[arg(long, default_value_t = 12345)]
    seed_offset: u64,
    /// Index of the enrolled identity the query is taken from. Random if
    /// omitted.
    #[arg(short, long)]
    enrolled: Option<usize>,
    /// Drop the Initiator's n-th receive to exercise the local fallback.
    #[arg(long)]
    drop_receive: Option<usize>,
}

/// 1) Set up logging.
/// 2) Enroll a random database and pick the query identity.
/// 3) Run each session on two worker threads and report the outcome.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // Set up logging.
    let filter = EnvFilter::from_default_env();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .compact()
        .init();
    let span = span!(Level::INFO, "main");
    let _enter = span.entered();

    let config = ProtocolConfig::new(cli.bits, cli.threshold, cli.database_size, cli.dimension)?
        .with_seed_offset(cli.seed_offset);
    let rng = &mut StdRng::from_entropy();

    let database = enroll(rng, &config);
    let enrolled = cli
        .enrolled
        .unwrap_or_else(|| rng.gen_range(0..config.database_size()));
    let query = noisy_query(
        rng,
        database
            .get(enrolled)
            .ok_or_else(|| anyhow!("identity {enrolled} is not enrolled"))?,
    );
    info!(
        "Enrolled {} identities of dimension {}; the query comes from identity {enrolled}",
        config.database_size(),
        config.template_dimension()
    );

    let engine = ClearDotProduct::new(query, database)?;
    let mut outcomes = Vec::with_capacity(cli.sessions);
    for _ in 0..cli.sessions {
        let (report, served) = run_session(&config, &engine, cli.drop_receive)?;
        log_reports(&report, &served);
        outcomes.push(report);
    }

    let winners = outcomes
        .iter()
        .map(|report| report.decision().winner_index())
        .join(", ");
    let authenticated = outcomes
        .iter()
        .filter(|report| report.decision().authenticated())
        .count();
    info!(
        "{authenticated} of {} sessions authenticated; winners: [{winners}]",
        outcomes.len()
    );
    if outcomes
        .iter()
        .any(|report| report.decision().winner_index() != enrolled)
    {
        warn!("Some sessions did not pick identity {enrolled}; is `bits` wide enough for these scores?");
    }

    Ok(())
}

/// Sample one random template per enrolled identity.
fn enroll(rng: &mut StdRng, config: &ProtocolConfig) -> Vec<Vec<Score>> {
    (0..config.database_size())
        .map(|_| {
            (0..config.template_dimension())
                .map(|_| rng.gen_range(COORDINATE_RANGE))
                .collect()
        })
        .collect()
}

/// A fresh reading of `template`.
fn noisy_query(rng: &mut StdRng, template: &[Score]) -> Vec<Score> {
    template
        .iter()
        .map(|x| x + rng.gen_range(NOISE_RANGE))
        .collect()
}

/// Run one session with each party on its own worker thread.
#[instrument(skip_all)]
fn run_session(
    config: &ProtocolConfig,
    engine: &ClearDotProduct,
    drop_receive: Option<usize>,
) -> anyhow::Result<(SessionReport, ResponderReport)> {
    // Both parties must agree on the session ID before starting.
    let sid = SessionId::from_uuid(Uuid::new_v4());
    let (initiator_channel, responder_channel) = InMemoryChannel::pair();

    let mut responder = Party::<Responder, _>::new(
        sid,
        config.clone(),
        responder_channel,
        SimulatedDrelu::new(config.bits())?,
    )?;
    let mut responder_engine = engine.clone();
    let responder_worker = thread::Builder::new()
        .name("responder".into())
        .spawn(move || responder.serve(&mut responder_engine))?;

    let mut initiator = Party::<Initiator, _>::simulated(
        sid,
        config.clone(),
        FaultyChannel::new(initiator_channel, drop_receive),
    )?;
    let mut initiator_engine = engine.clone();
    let initiator_worker = thread::Builder::new()
        .name("initiator".into())
        .spawn(move || initiator.authenticate(&mut initiator_engine))?;

    let report = initiator_worker
        .join()
        .map_err(|_| anyhow!("the initiator worker panicked"))??;
    let served = responder_worker
        .join()
        .map_err(|_| anyhow!("the responder worker panicked"))??;
    Ok((report, served))
}

fn log_reports(report: &SessionReport, served: &ResponderReport) {
    let decision = report.decision();
    let tournament = report.tournament();
    info!(
        "Session {}: winner {} with score {} (plausible: {}, authenticated: {})",
        report.sid(),
        decision.winner_index(),
        decision.winner_score(),
        decision.plausible(),
        decision.authenticated()
    );
    info!(
        "Tournament: {} comparisons in {} rounds, {} degraded",
        tournament.comparisons(),
        tournament.rounds(),
        tournament.degraded()
    );
    info!(
        "Initiator cost: similarity {:.2} ms, comparison {:.2} ms / {:.2} KiB, total {:.2} ms",
        report.similarity().millis(),
        report.comparison().millis(),
        report.comparison().kib(),
        report.total().millis()
    );
    info!(
        "Responder answered {} of {} comparisons, sending {:.2} KiB in {:.2} ms",
        served.served(),
        served.expected(),
        served.comparison().kib(),
        served.comparison().millis()
    );
}
