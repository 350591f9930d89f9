//! Integrations with the serialization ecosystem.

mod serde;
