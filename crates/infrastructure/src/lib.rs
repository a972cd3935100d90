//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_subject_state_repository;
mod redis_subject_state_repository;

pub use in_memory_subject_state_repository::{InMemoryApiKeyRepository, InMemoryIpRepository};
pub use redis_subject_state_repository::{RedisApiKeyRepository, RedisIpRepository};
