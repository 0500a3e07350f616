//! Analysis pipeline: request/response models, the orchestrator, and the
//! `POST /analyze` handler.

pub mod handlers;
pub mod models;
pub mod orchestrator;
