use std::sync::Arc;

use async_trait::async_trait;

use hrdesk_auth::{Subject, SubjectDirectory};
use hrdesk_core::UserId;

use crate::store::DirectoryStore;

/// Serves gate targets from the current directory state.
pub struct StoreSubjects<S: ?Sized>(pub Arc<S>);

#[async_trait]
impl<S> SubjectDirectory for StoreSubjects<S>
where
    S: DirectoryStore + ?Sized,
{
    async fn find_subject(&self, user_id: UserId) -> Result<Option<Subject>, String> {
        let profile = self.0.find_profile(user_id).await.map_err(|e| e.to_string())?;
        Ok(profile.map(|p| p.subject()))
    }
}
