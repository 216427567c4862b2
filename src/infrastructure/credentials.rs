//! Credential Registry
//!
//! Short-lived one-shot codes: room invites (24 h) and transfer bundles
//! (1 h). Both tables are in-memory regardless of the storage backend;
//! codes are ephemeral by design and do not survive a restart.
//!
//! Consumption is check-and-remove under a single lock, so two concurrent
//! consumers of the same code see at most one success. Entries past expiry
//! behave as absent whether or not the sweeper has run; the hourly sweep only
//! reclaims memory.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Invite codes live for 24 hours.
pub const INVITE_TTL: chrono::Duration = chrono::Duration::hours(24);

/// Transfer codes live for 1 hour.
pub const TRANSFER_TTL: chrono::Duration = chrono::Duration::hours(1);

/// Cadence of the background sweep.
const SWEEP_PERIOD: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct InviteEntry {
    room_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct TransferEntry {
    user_ids: Vec<Uuid>,
    expires_at: DateTime<Utc>,
}

/// TTL tables for invite and transfer codes.
pub struct CredentialRegistry {
    invites: Mutex<HashMap<Uuid, InviteEntry>>,
    transfers: Mutex<HashMap<Uuid, TransferEntry>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Default for CredentialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialRegistry {
    pub fn new() -> Self {
        Self {
            invites: Mutex::new(HashMap::new()),
            transfers: Mutex::new(HashMap::new()),
            sweeper: Mutex::new(None),
        }
    }

    /// Mint a room-scoped invite code valid for [`INVITE_TTL`].
    pub fn mint_invite(&self, room_id: Uuid) -> Uuid {
        let code = Uuid::new_v4();
        self.invites.lock().expect("invite table poisoned").insert(
            code,
            InviteEntry {
                room_id,
                expires_at: Utc::now() + INVITE_TTL,
            },
        );
        code
    }

    /// Look at an invite without consuming it. Used before side effects that
    /// must not burn the code (display-name collision checks).
    pub fn peek_invite(&self, code: Uuid) -> Option<Uuid> {
        let table = self.invites.lock().expect("invite table poisoned");
        table
            .get(&code)
            .filter(|entry| Utc::now() < entry.expires_at)
            .map(|entry| entry.room_id)
    }

    /// One-shot redemption: the code is removed in the same critical section
    /// that observes it.
    pub fn consume_invite(&self, code: Uuid) -> Option<Uuid> {
        let mut table = self.invites.lock().expect("invite table poisoned");
        let entry = table.remove(&code)?;
        if Utc::now() < entry.expires_at {
            Some(entry.room_id)
        } else {
            None
        }
    }

    /// Mint a transfer code bundling the given user ids, valid for
    /// [`TRANSFER_TTL`].
    pub fn mint_transfer(&self, user_ids: Vec<Uuid>) -> Uuid {
        let code = Uuid::new_v4();
        self.transfers
            .lock()
            .expect("transfer table poisoned")
            .insert(
                code,
                TransferEntry {
                    user_ids,
                    expires_at: Utc::now() + TRANSFER_TTL,
                },
            );
        code
    }

    /// One-shot redemption of a transfer bundle.
    pub fn consume_transfer(&self, code: Uuid) -> Option<Vec<Uuid>> {
        let mut table = self.transfers.lock().expect("transfer table poisoned");
        let entry = table.remove(&code)?;
        if Utc::now() < entry.expires_at {
            Some(entry.user_ids)
        } else {
            None
        }
    }

    /// Drop expired entries from both tables.
    pub fn sweep(&self) {
        let now = Utc::now();
        let mut invites = self.invites.lock().expect("invite table poisoned");
        let before = invites.len();
        invites.retain(|_, entry| now < entry.expires_at);
        let swept_invites = before - invites.len();
        drop(invites);

        let mut transfers = self.transfers.lock().expect("transfer table poisoned");
        let before = transfers.len();
        transfers.retain(|_, entry| now < entry.expires_at);
        let swept_transfers = before - transfers.len();
        drop(transfers);

        if swept_invites > 0 || swept_transfers > 0 {
            tracing::debug!(
                invites = swept_invites,
                transfers = swept_transfers,
                "swept expired credentials"
            );
        }
    }

    /// Start the hourly sweep task. Idempotent; the previous task is
    /// replaced, and the task ends on its own once the registry is dropped.
    pub fn start_sweeper(registry: &std::sync::Arc<Self>) {
        let weak = std::sync::Arc::downgrade(registry);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_PERIOD);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so startup stays quiet.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = weak.upgrade() else { break };
                registry.sweep();
            }
        });
        if let Some(old) = registry
            .sweeper
            .lock()
            .expect("sweeper handle poisoned")
            .replace(handle)
        {
            old.abort();
        }
    }

    /// Stop the sweep task.
    pub fn stop_sweeper(&self) {
        if let Some(handle) = self.sweeper.lock().expect("sweeper handle poisoned").take() {
            handle.abort();
        }
    }

    #[cfg(test)]
    fn insert_invite_expiring_at(&self, code: Uuid, room_id: Uuid, expires_at: DateTime<Utc>) {
        self.invites
            .lock()
            .unwrap()
            .insert(code, InviteEntry { room_id, expires_at });
    }

    #[cfg(test)]
    fn insert_transfer_expiring_at(
        &self,
        code: Uuid,
        user_ids: Vec<Uuid>,
        expires_at: DateTime<Utc>,
    ) {
        self.transfers
            .lock()
            .unwrap()
            .insert(code, TransferEntry { user_ids, expires_at });
    }
}

impl Drop for CredentialRegistry {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.lock().expect("sweeper handle poisoned").take() {
            handle.abort();
        }
    }
}
