//! Engine configuration
//!
//! Built once at startup and handed to the stores by value. Nothing in this
//! crate reads configuration from the environment on its own.

use crate::error::{Result, WalletError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on the per-wallet lock wait
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest wait accepted; PostgreSQL's `lock_timeout` is an int of milliseconds
pub const MAX_LOCK_TIMEOUT_MS: u64 = i32::MAX as u64;

/// How a unit of work acquires the per-wallet lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockPolicy {
    /// Block until the lock is free, give up after `timeout`
    Wait {
        /// Maximum time spent waiting for the lock
        timeout: Duration,
    },

    /// Fail immediately if another unit of work holds the lock
    NoWait,
}

impl LockPolicy {
    /// Build from a mode string (`wait` | `nowait`) and a timeout in ms
    pub fn from_parts(mode: &str, timeout_ms: u64) -> Result<Self> {
        match mode.to_ascii_lowercase().as_str() {
            "wait" => {
                if timeout_ms == 0 {
                    return Err(WalletError::InvalidInput(
                        "lock timeout must be positive in wait mode".to_string(),
                    ));
                }
                if timeout_ms > MAX_LOCK_TIMEOUT_MS {
                    return Err(WalletError::InvalidInput(format!(
                        "lock timeout {}ms exceeds the maximum of {}ms",
                        timeout_ms, MAX_LOCK_TIMEOUT_MS
                    )));
                }
                Ok(LockPolicy::Wait {
                    timeout: Duration::from_millis(timeout_ms),
                })
            }
            "nowait" | "no_wait" => Ok(LockPolicy::NoWait),
            other => Err(WalletError::InvalidInput(format!(
                "unknown lock mode `{}`, expected wait or nowait",
                other
            ))),
        }
    }

    /// Timeout in whole milliseconds, `None` for no-wait
    pub fn timeout_ms(&self) -> Option<u64> {
        match self {
            LockPolicy::Wait { timeout } => Some(timeout.as_millis() as u64),
            LockPolicy::NoWait => None,
        }
    }
}

impl Default for LockPolicy {
    fn default() -> Self {
        LockPolicy::Wait {
            timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Locking discipline for read-for-mutation
    pub lock_policy: LockPolicy,
}

impl EngineConfig {
    /// Config with the given lock policy
    pub fn with_lock_policy(lock_policy: LockPolicy) -> Self {
        Self { lock_policy }
    }
}
