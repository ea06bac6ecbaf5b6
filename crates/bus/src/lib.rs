use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum BusError {
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("bus is closed")]
    Closed,
}

/// What a consumer handler tells the bus to do with the delivery it just
/// processed. Every branch of every handler must resolve to one of these —
/// losing a message is preferred to redelivering it forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDisposition {
    Ack,
    Requeue,
    Drop,
}

type Handler = Arc<dyn Fn(Vec<u8>) -> BoxFuture<'static, AckDisposition> + Send + Sync>;

struct Inner {
    connection: Connection,
    channel: Channel,
}

/// Durable, fair-dispatch AMQP client. Reconnects transparently on
/// transport faults encountered mid-run; a failure on the very first connect
/// is surfaced to the caller instead, so the process can exit per the
/// documented exit-code contract.
pub struct MessageBus {
    amqp_url: String,
    inner: Mutex<Option<Inner>>,
}

impl MessageBus {
    pub async fn connect(amqp_url: &str) -> Result<Self, BusError> {
        let inner = Self::dial(amqp_url).await?;
        Ok(Self {
            amqp_url: amqp_url.to_string(),
            inner: Mutex::new(Some(inner)),
        })
    }

    async fn dial(amqp_url: &str) -> Result<Inner, BusError> {
        let connection =
            Connection::connect(amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .basic_qos(1, BasicQosOptions::default())
            .await?;
        Ok(Inner { connection, channel })
    }

    async fn declare(channel: &Channel, queue: &str) -> Result<(), BusError> {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    /// Publishes with persistent delivery mode. Returns `false` (never an
    /// error) on transport fault, so callers can decide whether to abort a
    /// send loop instead of duplicating work on the next run.
    pub async fn publish(&self, queue: &str, payload: &[u8]) -> bool {
        let guard = self.inner.lock().await;
        let Some(inner) = guard.as_ref() else {
            return false;
        };
        if Self::declare(&inner.channel, queue).await.is_err() {
            return false;
        }
        let props = BasicProperties::default().with_delivery_mode(2);
        match inner
            .channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                props,
            )
            .await
        {
            Ok(confirm) => confirm.await.is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, queue, "publish failed");
                false
            }
        }
    }

    /// Consumes `queue` until `stop` is cancelled, invoking `handler` for
    /// each delivery and honoring its `AckDisposition`. On a mid-flight
    /// transport fault the connection is rebuilt after a fixed backoff and
    /// consumption resumes; the method only returns once `stop` fires.
    pub async fn consume(
        &self,
        queue: &str,
        stop: CancellationToken,
        handler: Handler,
    ) -> Result<(), BusError> {
        let was_consuming_before = AtomicBool::new(false);

        loop {
            if stop.is_cancelled() {
                return Ok(());
            }

            let channel = {
                let guard = self.inner.lock().await;
                guard.as_ref().map(|i| i.channel.clone())
            };
            let Some(channel) = channel else {
                return Err(BusError::Closed);
            };

            match self
                .run_consumer(&channel, queue, &stop, &handler, &was_consuming_before)
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, queue, "consumer loop faulted");
                    if !was_consuming_before.load(Ordering::SeqCst) {
                        // first-ever start failed: surface to caller
                        return Err(e);
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(RECONNECT_BACKOFF) => {}
                        _ = stop.cancelled() => return Ok(()),
                    }
                    if let Err(e) = self.reconnect().await {
                        tracing::warn!(error = %e, "reconnect attempt failed, retrying");
                        continue;
                    }
                }
            }
        }
    }

    async fn run_consumer(
        &self,
        channel: &Channel,
        queue: &str,
        stop: &CancellationToken,
        handler: &Handler,
        was_consuming_before: &AtomicBool,
    ) -> Result<(), BusError> {
        Self::declare(channel, queue).await?;
        let mut consumer = channel
            .basic_consume(
                queue,
                "nyx-consumer",
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        // Consumption has actually started: any fault from here on is
        // mid-flight, not a first-ever-start failure.
        was_consuming_before.store(true, Ordering::SeqCst);

        loop {
            tokio::select! {
                _ = stop.cancelled() => return Ok(()),
                delivery = consumer.next() => {
                    let Some(delivery) = delivery else {
                        return Err(BusError::Closed);
                    };
                    let delivery = delivery?;
                    let disposition = handler(delivery.data.clone()).await;
                    match disposition {
                        AckDisposition::Ack | AckDisposition::Drop => {
                            delivery.ack(BasicAckOptions::default()).await?;
                        }
                        AckDisposition::Requeue => {
                            delivery
                                .nack(BasicNackOptions {
                                    requeue: true,
                                    ..Default::default()
                                })
                                .await?;
                        }
                    }
                }
            }
        }
    }

    async fn reconnect(&self) -> Result<(), BusError> {
        let inner = Self::dial(&self.amqp_url).await?;
        *self.inner.lock().await = Some(inner);
        Ok(())
    }

    /// Idempotent: safe to call more than once, including from a signal
    /// handler path.
    pub async fn close(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(inner) = guard.take() {
            let _ = inner.channel.close(200, "bye").await;
            let _ = inner.connection.close(200, "bye").await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_disposition_variants_are_distinct() {
        assert_ne!(AckDisposition::Ack, AckDisposition::Requeue);
        assert_ne!(AckDisposition::Ack, AckDisposition::Drop);
    }
}
