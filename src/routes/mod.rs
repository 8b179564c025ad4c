//! HTTP route handlers: the operator control surface (§4.8) and service
//! health checks. Domain entities (ships, cargoes, emails, failed entries)
//! have no browsing API of their own — the pipeline's only operator-facing
//! surface is starting/stopping stages and watching the log stream.

pub mod control;
pub mod health;
pub mod realtime;
