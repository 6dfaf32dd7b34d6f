//! In-process execution queue.
//!
//! Producers get an acknowledgement as soon as a request is accepted; the
//! consumer hands each delivery to the [`Dispatcher`] on its own task, with
//! at most `concurrency` executions in flight.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::core_types::ExecutionRequest;
use crate::dispatcher::Dispatcher;
use crate::errors::QueueError;

pub const QUEUED_STATUS: &str = "QUEUED";

#[derive(Debug, Clone)]
struct Delivery {
    id: Uuid,
    request: ExecutionRequest,
}

/// Returned to the producer once a request is on the queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueAck {
    pub message_id: Uuid,
    pub queue: String,
    pub status: String,
    pub queued_at: DateTime<Utc>,
}

pub struct ExecutionQueue;

impl ExecutionQueue {
    pub fn bounded(name: impl Into<String>, capacity: usize) -> (QueueProducer, QueueConsumer) {
        let name = name.into();
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            QueueProducer {
                name: name.clone(),
                sender,
            },
            QueueConsumer { name, receiver },
        )
    }
}

#[derive(Clone)]
pub struct QueueProducer {
    name: String,
    sender: mpsc::Sender<Delivery>,
}

impl QueueProducer {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits only for queue capacity, never for execution.
    pub async fn enqueue(&self, request: ExecutionRequest) -> Result<EnqueueAck, QueueError> {
        let delivery = Delivery {
            id: Uuid::new_v4(),
            request,
        };
        let message_id = delivery.id;
        self.sender
            .send(delivery)
            .await
            .map_err(|_| QueueError::Closed(self.name.clone()))?;

        log::debug!("Queued message {} on '{}'", message_id, self.name);
        Ok(EnqueueAck {
            message_id,
            queue: self.name.clone(),
            status: QUEUED_STATUS.to_string(),
            queued_at: Utc::now(),
        })
    }

    /// Decodes a JSON queue message and enqueues it.
    pub async fn enqueue_message(&self, bytes: &[u8]) -> Result<EnqueueAck, QueueError> {
        let request = decode_message(bytes)?;
        self.enqueue(request).await
    }
}

pub struct QueueConsumer {
    name: String,
    receiver: mpsc::Receiver<Delivery>,
}

impl QueueConsumer {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consumes until every producer is dropped, then drains in-flight work.
    /// Returns the number of deliveries handled.
    pub async fn run(mut self, dispatcher: Arc<Dispatcher>, concurrency: usize) -> usize {
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut in_flight = JoinSet::new();
        let mut handled = 0usize;

        log::info!(
            "Consuming '{}' with {} concurrent executions",
            self.name,
            concurrency.max(1)
        );

        while let Some(delivery) = self.receiver.recv().await {
            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let dispatcher = dispatcher.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                dispatcher.handle(delivery.request).await;
                delivery.id
            });

            while let Some(done) = in_flight.try_join_next() {
                handled += Self::acknowledge(&self.name, done);
            }
        }

        while let Some(done) = in_flight.join_next().await {
            handled += Self::acknowledge(&self.name, done);
        }
        log::info!("Queue '{}' drained after {} deliveries", self.name, handled);
        handled
    }

    fn acknowledge(queue: &str, done: Result<Uuid, tokio::task::JoinError>) -> usize {
        match done {
            Ok(id) => {
                log::debug!("Acknowledged message {} on '{}'", id, queue);
                1
            }
            Err(e) => {
                log::error!("Execution task on '{}' aborted: {}", queue, e);
                0
            }
        }
    }
}

/// Parses a queue message body.
pub fn decode_message(bytes: &[u8]) -> Result<ExecutionRequest, QueueError> {
    Ok(serde_json::from_slice(bytes)?)
}
