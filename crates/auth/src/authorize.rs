//! Authorization gate: per-operation enforcement entry point.
//!
//! ```text
//! Unauthenticated ─decode─▶ Authenticated ─registry─▶ PermissionChecked
//!        ─(target present)─▶ TargetChecked ─▶ Authorized
//! ```
//!
//! Level-0 actors jump from `Authenticated` straight to `Authorized`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use hrdesk_core::UserId;

use crate::access;
use crate::error::AuthError;
use crate::permissions::{Permission, PermissionRegistry};
use crate::principal::{ActorSnapshot, Subject};
use crate::token::TokenService;

/// Source of fresh target records for hierarchy/department checks.
#[async_trait]
pub trait SubjectDirectory: Send + Sync {
    async fn find_subject(&self, user_id: UserId) -> Result<Option<Subject>, String>;
}

#[async_trait]
impl<D> SubjectDirectory for Arc<D>
where
    D: SubjectDirectory + ?Sized,
{
    async fn find_subject(&self, user_id: UserId) -> Result<Option<Subject>, String> {
        (**self).find_subject(user_id).await
    }
}

/// Outcome class of a gate failure, used for transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    Internal,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("authentication failed: {0}")]
    Unauthenticated(AuthError),

    #[error("permission denied: missing '{0}'")]
    MissingPermission(Permission),

    #[error("cross-department access denied")]
    CrossDepartmentDenied,

    #[error("insufficient role hierarchy")]
    InsufficientHierarchy,

    #[error("user {0} not found")]
    TargetNotFound(UserId),

    #[error("directory lookup failed: {0}")]
    Directory(String),
}

impl GateError {
    pub fn kind(&self) -> DenialKind {
        match self {
            GateError::Unauthenticated(_) => DenialKind::Unauthenticated,
            GateError::MissingPermission(_)
            | GateError::CrossDepartmentDenied
            | GateError::InsufficientHierarchy => DenialKind::Forbidden,
            GateError::TargetNotFound(_) => DenialKind::NotFound,
            GateError::Directory(_) => DenialKind::Internal,
        }
    }
}

/// Gate stages, reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    Unauthenticated,
    Authenticated,
    PermissionChecked,
    TargetChecked,
    Authorized,
}

/// Per-operation enforcement: token → permission → target checks.
#[derive(Debug, Clone)]
pub struct AuthorizationGate {
    tokens: Arc<TokenService>,
    registry: Arc<PermissionRegistry>,
}

impl AuthorizationGate {
    pub fn new(tokens: Arc<TokenService>, registry: Arc<PermissionRegistry>) -> Self {
        Self { tokens, registry }
    }

    pub fn registry(&self) -> &PermissionRegistry {
        &self.registry
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Step 1: decode the access token.
    pub fn authenticate(&self, token: &str) -> Result<ActorSnapshot, GateError> {
        self.tokens
            .decode_access(token)
            .map_err(GateError::Unauthenticated)
    }

    /// Steps 2-5 for an already authenticated actor.
    ///
    /// Returns the actor snapshot unchanged on success; the re-fetched target is
    /// only used for the decision.
    pub async fn authorize<D>(
        &self,
        operation: &str,
        actor: ActorSnapshot,
        target: Option<UserId>,
        directory: &D,
    ) -> Result<ActorSnapshot, GateError>
    where
        D: SubjectDirectory + ?Sized,
    {
        if access::is_unrestricted(&actor) {
            trace_stage(operation, &actor, GateStage::Authorized);
            return Ok(actor);
        }

        if let Some(required) = self.registry.required_permission(operation) {
            if !access::has_permission(&actor, required.as_str()) {
                return Err(deny(operation, &actor, GateError::MissingPermission(required.clone())));
            }
        }
        trace_stage(operation, &actor, GateStage::PermissionChecked);

        if let Some(target_id) = target {
            let subject = directory
                .find_subject(target_id)
                .await
                .map_err(GateError::Directory)?
                .ok_or(GateError::TargetNotFound(target_id))?;

            if !access::same_or_cross_department(&actor, &subject) {
                return Err(deny(operation, &actor, GateError::CrossDepartmentDenied));
            }
            if !access::hierarchy_allows(&actor, &subject) {
                return Err(deny(operation, &actor, GateError::InsufficientHierarchy));
            }
            trace_stage(operation, &actor, GateStage::TargetChecked);
        }

        trace_stage(operation, &actor, GateStage::Authorized);
        Ok(actor)
    }

    /// Full pipeline from a raw bearer token.
    pub async fn enforce<D>(
        &self,
        operation: &str,
        token: &str,
        target: Option<UserId>,
        directory: &D,
    ) -> Result<ActorSnapshot, GateError>
    where
        D: SubjectDirectory + ?Sized,
    {
        let actor = self.authenticate(token)?;
        trace_stage(operation, &actor, GateStage::Authenticated);
        self.authorize(operation, actor, target, directory).await
    }
}

fn trace_stage(operation: &str, actor: &ActorSnapshot, stage: GateStage) {
    tracing::trace!(operation, actor = %actor.user_id, ?stage, "gate stage");
}

fn deny(operation: &str, actor: &ActorSnapshot, err: GateError) -> GateError {
    tracing::warn!(operation, actor = %actor.user_id, reason = %err, "authorization denied");
    err
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use super::*;
    use crate::config::AuthConfig;
    use crate::principal::Identity;
    use crate::roles::RoleGrant;

    #[derive(Default)]
    struct StaticDirectory {
        subjects: HashMap<UserId, Subject>,
    }

    impl StaticDirectory {
        fn with(mut self, subject: Subject) -> Self {
            self.subjects.insert(subject.user_id, subject);
            self
        }
    }

    #[async_trait]
    impl SubjectDirectory for StaticDirectory {
        async fn find_subject(&self, user_id: UserId) -> Result<Option<Subject>, String> {
            Ok(self.subjects.get(&user_id).cloned())
        }
    }

    fn gate() -> AuthorizationGate {
        let tokens = TokenService::new(&AuthConfig {
            access_secret: "gate-access".into(),
            refresh_secret: "gate-refresh".into(),
            ..AuthConfig::default()
        })
        .unwrap();
        let registry = PermissionRegistry::from_table(&[
            ("update_user", "update_user"),
            ("get_user", "get_user"),
        ])
        .unwrap();
        AuthorizationGate::new(Arc::new(tokens), Arc::new(registry))
    }

    fn token_for(gate: &AuthorizationGate, grants: Vec<RoleGrant>, perms: &[&'static str], dept: Option<&str>) -> (UserId, String) {
        let identity = Identity {
            user_id: UserId::new(),
            roles: grants,
            permissions: perms.iter().map(|p| Permission::new(*p)).collect::<BTreeSet<_>>(),
            department: dept.map(str::to_string),
            reports_to: None,
        };
        let pair = gate.tokens().issue_pair(&identity).unwrap();
        (identity.user_id, pair.access_token)
    }

    fn subject(dept: Option<&str>, levels: Vec<i32>) -> Subject {
        Subject {
            user_id: UserId::new(),
            department: dept.map(str::to_string),
            role_levels: levels,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn invalid_token_is_unauthenticated() {
        let gate = gate();
        let err = gate
            .enforce("get_user", "garbage", None, &StaticDirectory::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DenialKind::Unauthenticated);
    }

    #[tokio::test]
    async fn missing_permission_is_forbidden() {
        let gate = gate();
        let (_, token) = token_for(&gate, vec![RoleGrant::new("staff", 5, false)], &["get_user"], Some("ops"));

        let err = gate
            .enforce("update_user", &token, None, &StaticDirectory::default())
            .await
            .unwrap_err();
        assert_eq!(err, GateError::MissingPermission(Permission::new("update_user")));
        assert_eq!(err.kind(), DenialKind::Forbidden);
    }

    #[tokio::test]
    async fn unregistered_operation_is_open_to_authenticated_actors() {
        let gate = gate();
        let (id, token) = token_for(&gate, vec![], &[], None);

        let actor = gate
            .enforce("whoami", &token, None, &StaticDirectory::default())
            .await
            .unwrap();
        assert_eq!(actor.user_id, id);
    }

    #[tokio::test]
    async fn level_zero_bypasses_everything() {
        let gate = gate();
        let (_, token) = token_for(&gate, vec![RoleGrant::new("root", 0, false)], &[], None);

        // Even a missing target does not matter for an unrestricted actor.
        let actor = gate
            .enforce("update_user", &token, Some(UserId::new()), &StaticDirectory::default())
            .await
            .unwrap();
        assert!(actor.is_unrestricted());
    }

    #[tokio::test]
    async fn missing_target_is_not_found() {
        let gate = gate();
        let (_, token) = token_for(&gate, vec![RoleGrant::new("lead", 2, false)], &["get_user"], Some("ops"));
        let missing = UserId::new();

        let err = gate
            .enforce("get_user", &token, Some(missing), &StaticDirectory::default())
            .await
            .unwrap_err();
        assert_eq!(err, GateError::TargetNotFound(missing));
        assert_eq!(err.kind(), DenialKind::NotFound);
    }

    #[tokio::test]
    async fn other_department_is_denied() {
        let gate = gate();
        let (_, token) = token_for(&gate, vec![RoleGrant::new("lead", 2, false)], &["get_user"], Some("ops"));
        let target = subject(Some("sales"), vec![5]);
        let dir = StaticDirectory::default().with(target.clone());

        let err = gate.enforce("get_user", &token, Some(target.user_id), &dir).await.unwrap_err();
        assert_eq!(err, GateError::CrossDepartmentDenied);
    }

    #[tokio::test]
    async fn more_senior_target_is_denied() {
        let gate = gate();
        let (_, token) = token_for(&gate, vec![RoleGrant::new("lead", 2, false)], &["get_user"], Some("ops"));
        let boss = subject(Some("ops"), vec![1]);
        let dir = StaticDirectory::default().with(boss.clone());

        let err = gate.enforce("get_user", &token, Some(boss.user_id), &dir).await.unwrap_err();
        assert_eq!(err, GateError::InsufficientHierarchy);
        assert_eq!(err.kind(), DenialKind::Forbidden);
    }

    #[tokio::test]
    async fn authorized_call_returns_the_actor_not_the_target() {
        let gate = gate();
        let (actor_id, token) =
            token_for(&gate, vec![RoleGrant::new("lead", 2, false)], &["get_user"], Some("ops"));
        let peer = subject(Some("ops"), vec![2]);
        let dir = StaticDirectory::default().with(peer.clone());

        let actor = gate.enforce("get_user", &token, Some(peer.user_id), &dir).await.unwrap();
        assert_eq!(actor.user_id, actor_id);
    }

    const PERMS: [&str; 3] = ["update_user", "get_user", "punch_in"];

    proptest::proptest! {
        #[test]
        fn level_zero_passes_every_check(
            held in proptest::collection::vec(proptest::bool::ANY, PERMS.len()),
            extra_levels in proptest::collection::vec(0i32..1000, 0..3),
            actor_dept in proptest::option::of("[a-c]"),
            target_dept in proptest::option::of("[a-c]"),
            target_levels in proptest::collection::vec(0i32..1000, 0..3),
            target_known in proptest::bool::ANY,
            target_active in proptest::bool::ANY,
        ) {
            let gate = gate();
            let mut grants = vec![RoleGrant::new("root", 0, false)];
            grants.extend(extra_levels.into_iter().map(|l| RoleGrant::new(format!("r{l}"), l, false)));
            let perms: Vec<&'static str> =
                PERMS.iter().zip(&held).filter(|&(_, h)| *h).map(|(p, _)| *p).collect();
            let (_, token) = token_for(&gate, grants, &perms, actor_dept.as_deref());

            let mut target = subject(target_dept.as_deref(), target_levels);
            target.is_active = target_active;
            let target_id = target.user_id;
            let dir = if target_known {
                StaticDirectory::default().with(target)
            } else {
                StaticDirectory::default()
            };

            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            for op in ["update_user", "get_user", "unregistered_op"] {
                for t in [None, Some(target_id)] {
                    let outcome = rt.block_on(gate.enforce(op, &token, t, &dir));
                    proptest::prop_assert!(outcome.is_ok(), "{op} with {t:?} denied: {outcome:?}");
                }
            }
        }
    }
}
