//! Conversations submitted to the analyzer.

use serde::{Deserialize, Serialize};

/// Placeholder customer identity for ad-hoc input.
pub const PLACEHOLDER_CUSTOMER: &str = "Test Customer";

/// Placeholder agent identity for ad-hoc input.
pub const PLACEHOLDER_AGENT: &str = "Test Agent";

/// Who sent a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Customer,
    Agent,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Customer => "customer",
            Sender::Agent => "agent",
        }
    }
}

/// A single sender-tagged message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn customer(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Customer,
            text: text.into(),
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Agent,
            text: text.into(),
        }
    }
}

/// An ordered exchange of messages. This is exactly the request body of `analyze`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub messages: Vec<Message>,
    pub customer_name: String,
    pub agent_name: String,
}

impl Conversation {
    pub fn new(
        messages: Vec<Message>,
        customer_name: impl Into<String>,
        agent_name: impl Into<String>,
    ) -> Self {
        Self {
            messages,
            customer_name: customer_name.into(),
            agent_name: agent_name.into(),
        }
    }

    /// One customer message with placeholder identities.
    pub fn single_customer(text: impl Into<String>) -> Self {
        Self::new(
            vec![Message::customer(text)],
            PLACEHOLDER_CUSTOMER,
            PLACEHOLDER_AGENT,
        )
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
