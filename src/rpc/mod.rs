//! RPC endpoint pools, health checking, and failover

mod health;
mod pool;

pub use health::{HealthCheck, HealthReport, RpcHealthChecker};
pub use pool::RpcPools;
