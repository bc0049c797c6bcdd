use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    api::DirectoryApi,
    domain::MemberId,
    error::{AppError, Result},
    store::SharedStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The backend confirmed the new state and it has been applied.
    Toggled { is_approved: bool },
    /// A toggle for this member was already outstanding; nothing was sent.
    AlreadyInFlight,
}

/// Admin approval toggling. At most one request per member is outstanding,
/// and state changes only once the backend has answered.
pub struct ApprovalService {
    api: Arc<dyn DirectoryApi>,
    store: SharedStore,
    in_flight: Mutex<HashSet<MemberId>>,
}

/// Releases the member's in-flight slot however the toggle ends.
struct InFlight<'a> {
    service: &'a ApprovalService,
    id: MemberId,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.service.in_flight().remove(&self.id);
    }
}

impl ApprovalService {
    pub fn new(api: Arc<dyn DirectoryApi>, store: SharedStore) -> Self {
        Self {
            api,
            store,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, HashSet<MemberId>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, id: &MemberId) -> Option<InFlight<'_>> {
        self.in_flight().insert(id.clone()).then(|| InFlight {
            service: self,
            id: id.clone(),
        })
    }

    pub fn is_in_flight(&self, id: &MemberId) -> bool {
        self.in_flight().contains(id)
    }

    pub async fn toggle(&self, id: &MemberId) -> Result<ToggleOutcome> {
        let Some(_slot) = self.claim(id) else {
            tracing::debug!("Toggle for member {} already in flight", id);
            return Ok(ToggleOutcome::AlreadyInFlight);
        };

        match self.api.toggle_approval(id).await {
            Ok(member) => {
                let is_approved = member.is_approved;
                let mut store = self.store.write().await;
                if !store.confirm_approval(id, is_approved) {
                    store.upsert_member(member);
                }
                tracing::info!("Member {} is now {}", id, if is_approved { "approved" } else { "pending" });
                Ok(ToggleOutcome::Toggled { is_approved })
            }
            Err(e) if e.is_auth_failure() => Err(e),
            Err(e) => {
                tracing::warn!("Approval toggle for member {} failed: {}", id, e);
                self.store.write().await.record_toggle_error(id, e.clone());
                Err(AppError::ApprovalToggle {
                    member_id: id.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }
}
