//! Remote interaction layer: the HTTP client for the generation service.

pub mod http_generation_service;

pub use http_generation_service::HttpGenerationService;
