//! Caller identity extractor.
//!
//! The gateway in front of this service authenticates the caller and
//! forwards `x-user-id` and `x-user-role` (customer, merchant or admin).

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::domain::value_objects::{Actor, ActorType};
use crate::OrderError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Authenticated caller of a request
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

impl CurrentActor {
    /// Rejects callers whose role is not `kind`.
    pub fn require(self, kind: ActorType) -> Result<Actor, OrderError> {
        if self.0.kind == kind {
            Ok(self.0)
        } else {
            tracing::warn!(actor_id = %self.0.id, role = %self.0.kind, required = %kind, "Role not permitted");
            Err(OrderError::UnauthorizedOrderAccess(format!("{} access required", kind)))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = OrderError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());

        let id = header(USER_ID_HEADER)
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(OrderError::Unauthenticated)?;
        let kind: ActorType = header(USER_ROLE_HEADER).ok_or(OrderError::Unauthenticated)?.parse()?;

        Ok(CurrentActor(Actor { id, kind }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<CurrentActor, OrderError> {
        let (mut parts, _) = req.into_parts();
        CurrentActor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_reads_identity_headers() {
        let id = Uuid::new_v4();
        let req = Request::builder()
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_ROLE_HEADER, "Merchant")
            .body(())
            .unwrap();
        let CurrentActor(actor) = extract(req).await.unwrap();
        assert_eq!(actor, Actor::merchant(id));
    }

    #[tokio::test]
    async fn test_missing_or_bad_headers() {
        let no_role = Request::builder().header(USER_ID_HEADER, Uuid::new_v4().to_string()).body(()).unwrap();
        assert!(matches!(extract(no_role).await, Err(OrderError::Unauthenticated)));

        let bad_id = Request::builder()
            .header(USER_ID_HEADER, "42")
            .header(USER_ROLE_HEADER, "customer")
            .body(())
            .unwrap();
        assert!(matches!(extract(bad_id).await, Err(OrderError::Unauthenticated)));

        let bad_role = Request::builder()
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .header(USER_ROLE_HEADER, "root")
            .body(())
            .unwrap();
        assert!(matches!(extract(bad_role).await, Err(OrderError::Unauthenticated)));
    }

    #[test]
    fn test_require_role() {
        let actor = CurrentActor(Actor::customer(Uuid::new_v4()));
        assert!(actor.require(ActorType::Customer).is_ok());
        assert!(matches!(actor.require(ActorType::Admin), Err(OrderError::UnauthorizedOrderAccess(_))));
    }
}
