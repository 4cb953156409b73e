use crate::infrastructure::queue::rabbitmq::RabbitMqService;
use crate::modules::pipeline::error::PipelineError;
use crate::modules::pipeline::events::parse_object_created;
use crate::modules::pipeline::service::{IngestOutcome, PipelineService};
use anyhow::anyhow;
use futures_util::StreamExt;
use lapin::options::{BasicAckOptions, BasicNackOptions};
use std::time::Duration;
use tracing::{error, info, warn};

const CONSUMER_TAG: &str = "ingest_worker";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Ack,
    /// Put back on the queue for another attempt.
    Requeue,
    /// Dropped, or dead-lettered when the queue has a dead-letter exchange.
    Reject,
}

/// Retryable failures get one redelivery; everything else is settled for good.
pub fn settle(result: &Result<Vec<IngestOutcome>, PipelineError>, redelivered: bool) -> Settlement {
    match result {
        Ok(_) => Settlement::Ack,
        Err(e) if e.is_retryable() && !redelivered => Settlement::Requeue,
        Err(_) => Settlement::Reject,
    }
}

pub async fn process(
    service: &PipelineService,
    payload: &[u8],
) -> Result<Vec<IngestOutcome>, PipelineError> {
    let events = parse_object_created(payload)?;
    let mut outcomes = Vec::with_capacity(events.len());
    for event in &events {
        outcomes.push(service.on_object_created(event).await?);
    }
    Ok(outcomes)
}

/// Consumes object-created notifications until the process exits,
/// reconnecting whenever the channel or consumer goes away.
pub async fn start_ingest_worker(
    queue: RabbitMqService,
    service: PipelineService,
    queue_name: String,
    dead_letter_exchange: Option<String>,
) {
    info!("📥 Starting ingest worker...");

    loop {
        if let Err(e) = consume(&queue, &service, &queue_name, dead_letter_exchange.as_deref()).await {
            error!(error = %e, "Ingest worker interrupted");
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
        if let Err(e) = queue.reconnect().await {
            error!(error = %e, "RabbitMQ reconnect failed");
        }
    }
}

async fn consume(
    queue: &RabbitMqService,
    service: &PipelineService,
    queue_name: &str,
    dead_letter_exchange: Option<&str>,
) -> anyhow::Result<()> {
    queue.declare_queue(queue_name, dead_letter_exchange).await?;
    let mut consumer = queue.consume(queue_name, CONSUMER_TAG).await?;

    info!(queue = %queue_name, "📥 Ingest worker listening");

    while let Some(delivery) = consumer.next().await {
        let delivery = delivery?;

        let result = process(service, &delivery.data).await;
        let settlement = settle(&result, delivery.redelivered);

        match (&result, settlement) {
            (Ok(outcomes), _) => info!(events = outcomes.len(), "Delivery processed"),
            (Err(e), Settlement::Requeue) => warn!(error = %e, "Delivery failed, requeueing"),
            (Err(e), _) => error!(
                error = %e,
                redelivered = delivery.redelivered,
                "Delivery rejected"
            ),
        }

        match settlement {
            Settlement::Ack => {
                delivery.ack(BasicAckOptions::default()).await?;
            }
            Settlement::Requeue => {
                delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..BasicNackOptions::default()
                    })
                    .await?;
            }
            Settlement::Reject => {
                delivery
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..BasicNackOptions::default()
                    })
                    .await?;
            }
        }
    }

    Err(anyhow!("consumer stream for {} ended", queue_name))
}
