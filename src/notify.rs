use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::{Customer, Subscription};

const CHANNEL_CAPACITY: usize = 256;

/// Payload emitted for a subscription that has gone unused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedSubscription {
    pub subscription: Subscription,
    pub customer: Customer,
}

impl UnusedSubscription {
    /// JSON body handed to whatever delivers the message.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "kind": "unused_subscription",
            "subscription_id": self.subscription.id.to_string(),
            "customer_id": self.customer.id.to_string(),
            "customer_name": self.customer.name,
            "email": self.customer.email,
            "buy_date": self.subscription.buy_date,
            "notified_at": self.subscription.last_notified_unused,
        })
        .to_string()
    }
}

#[derive(Debug)]
pub enum NotifyError {
    /// Nobody is there to deliver the message.
    NoReceivers,
    Delivery(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::NoReceivers => write!(f, "no notification receivers"),
            NotifyError::Delivery(e) => write!(f, "delivery failed: {e}"),
        }
    }
}

impl std::error::Error for NotifyError {}

/// Receives notifications from the rules. Delivery (email etc.) is up to the implementor.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn unused_subscription(&self, notification: UnusedSubscription) -> Result<(), NotifyError>;
}

/// Broadcast hub: every subscriber gets every notification.
pub struct NotifyHub {
    sender: broadcast::Sender<UnusedSubscription>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            sender: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UnusedSubscription> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl Notifier for NotifyHub {
    async fn unused_subscription(&self, notification: UnusedSubscription) -> Result<(), NotifyError> {
        self.sender
            .send(notification)
            .map(|_| ())
            .map_err(|_| NotifyError::NoReceivers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn notification() -> UnusedSubscription {
        let customer = Customer {
            id: Ulid::new(),
            name: "Grace".into(),
            email: "grace@example.com".into(),
        };
        UnusedSubscription {
            subscription: Subscription {
                id: Ulid::new(),
                customer_id: customer.id,
                buy_date: 1_000,
                is_fully_used: false,
                last_notified_unused: Some(2_000),
            },
            customer,
        }
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe();
        assert_eq!(hub.receiver_count(), 1);

        let n = notification();
        hub.unused_subscription(n.clone()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), n);
    }

    #[tokio::test]
    async fn send_without_subscribers_fails() {
        let hub = NotifyHub::new();
        let result = hub.unused_subscription(notification()).await;
        assert!(matches!(result, Err(NotifyError::NoReceivers)));
    }

    #[test]
    fn every_subscriber_gets_a_copy() {
        let hub = NotifyHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        let n = notification();
        tokio_test::assert_ok!(tokio_test::block_on(hub.unused_subscription(n.clone())));
        assert_eq!(tokio_test::assert_ok!(a.try_recv()), n);
        assert_eq!(tokio_test::assert_ok!(b.try_recv()), n);
    }

    #[test]
    fn json_payload() {
        let n = notification();
        let v: serde_json::Value = serde_json::from_str(&n.to_json()).unwrap();
        assert_eq!(v["kind"], "unused_subscription");
        assert_eq!(v["email"], "grace@example.com");
        assert_eq!(v["subscription_id"], n.subscription.id.to_string());
        assert_eq!(v["notified_at"], 2_000);
    }
}
