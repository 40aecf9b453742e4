//! Wire contract between the parking controller and its endpoints.
//!
//! Payloads ([`Command`], [`StatusSnapshot`], [`Reply`]) are JSON documents
//! carried in minimal HTTP/1.1 messages ([`HttpRequest`], [`HttpResponse`]).
//! [`AgentCodec`] frames the device side of a connection and [`LinkCodec`]
//! frames the controller side, both for use with `tokio_util::codec::Framed`.

pub mod action;
pub mod codec;
pub mod command;
pub mod http;
pub mod reply;
pub mod snapshot;

pub use action::Action;
pub use codec::{AgentCodec, LinkCodec};
pub use command::Command;
pub use http::{HttpRequest, HttpResponse, Method};
pub use reply::Reply;
pub use snapshot::StatusSnapshot;
