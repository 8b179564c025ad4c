//! Stage graph wiring (§4.1-§4.7), ground truth `mq/handler.py`'s
//! `MQ_HANDLER` registry: six named tasks, each registered once at startup
//! and started/stopped independently through the Task Supervisor.

pub mod dedup_persist;
pub mod extraction;
pub mod ingest;
pub mod match_consumer;
pub mod match_producer;
pub mod outbound;

use crate::config::PipelineConfig;
use crate::geocoder::RemoteGeocoder;
use crate::mail::MailSource;
use crate::oracle::ExtractionOracle;
use crate::realtime::LiveLog;
use crate::store::Store;
use crate::supervisor::TaskSupervisor;
use crate::supervisor::queues::Queues;
use std::sync::Arc;
use tera::Tera;

pub const TASK_INGEST: &str = "mailbox_read_producer";
pub const TASK_DEDUP_PERSIST: &str = "mailbox_read_consumer";
pub const TASK_EXTRACTION: &str = "6_gpt_email_consumer";
pub const TASK_MATCH_PRODUCER: &str = "item_matching_producer";
pub const TASK_MATCH_CONSUMER: &str = "item_matching_consumer";
pub const TASK_OUTBOUND: &str = "email_send_producer";

/// Register every pipeline stage under its ground-truth name. None of the
/// tasks are started here — the operator control surface (§4.1, §4.8)
/// drives start/stop by name. Returns the queues so the caller can
/// construct the same-named routes/health views.
pub fn register(
    supervisor: &TaskSupervisor,
    config: &PipelineConfig,
    store: Store,
    mail: Arc<dyn MailSource>,
    oracle: Arc<dyn ExtractionOracle>,
    geocoder: Arc<dyn RemoteGeocoder>,
    templates: Arc<Tera>,
    log: LiveLog,
) -> Queues {
    let queues = Queues::new();
    let default_extraction_workers = config.extraction_workers;

    {
        let q1_tx = queues.q1_tx.clone();
        let mail = mail.clone();
        let log = log.clone();
        supervisor.register(TASK_INGEST, move |stop, _n| {
            let q1_tx = q1_tx.clone();
            let mail = mail.clone();
            let log = log.clone();
            tokio::spawn(async move { ingest::run(stop, mail, q1_tx, log, true).await })
        });
    }

    {
        let q1_rx = queues.q1_rx.clone();
        let q2_tx = queues.q2_tx.clone();
        let store = store.clone();
        let log = log.clone();
        supervisor.register(TASK_DEDUP_PERSIST, move |stop, _n| {
            let q1_rx = q1_rx.clone();
            let q2_tx = q2_tx.clone();
            let store = store.clone();
            let log = log.clone();
            tokio::spawn(async move { dedup_persist::run(stop, q1_rx, q2_tx, store, log).await })
        });
    }

    {
        let q2_rx = queues.q2_rx.clone();
        let store = store.clone();
        let oracle = oracle.clone();
        let geocoder = geocoder.clone();
        let log = log.clone();
        supervisor.register(TASK_EXTRACTION, move |stop, n| {
            let q2_rx = q2_rx.clone();
            let store = store.clone();
            let oracle = oracle.clone();
            let geocoder = geocoder.clone();
            let log = log.clone();
            let n_workers = n.map(|n| n as usize).unwrap_or(default_extraction_workers);
            tokio::spawn(async move {
                extraction::run(stop, q2_rx, store, oracle, geocoder, log, n_workers).await
            })
        });
    }

    {
        let q3_tx = queues.q3_tx.clone();
        let store = store.clone();
        let log = log.clone();
        supervisor.register(TASK_MATCH_PRODUCER, move |stop, _n| {
            let q3_tx = q3_tx.clone();
            let store = store.clone();
            let log = log.clone();
            tokio::spawn(async move { match_producer::run(stop, q3_tx, store, log).await })
        });
    }

    {
        let q3_rx = queues.q3_rx.clone();
        let q4_tx = queues.q4_tx.clone();
        let store = store.clone();
        let log = log.clone();
        supervisor.register(TASK_MATCH_CONSUMER, move |stop, _n| {
            let q3_rx = q3_rx.clone();
            let q4_tx = q4_tx.clone();
            let store = store.clone();
            let log = log.clone();
            tokio::spawn(async move { match_consumer::run(stop, q3_rx, q4_tx, store, log).await })
        });
    }

    {
        let q4_rx = queues.q4_rx.clone();
        let store = store.clone();
        let mail = mail.clone();
        let templates = templates.clone();
        let log = log.clone();
        supervisor.register(TASK_OUTBOUND, move |stop, _n| {
            let q4_rx = q4_rx.clone();
            let store = store.clone();
            let mail = mail.clone();
            let templates = templates.clone();
            let log = log.clone();
            tokio::spawn(async move { outbound::run(stop, q4_rx, store, mail, templates, log).await })
        });
    }

    queues
}
