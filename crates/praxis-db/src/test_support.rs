//! Shared test utilities for praxis-db repository tests.

pub(crate) mod helpers {
    use praxis_core::entities::User;

    use crate::PraxisDb;
    use crate::repos::user::NewUser;
    use crate::service::PraxisService;

    /// Create an in-memory `PraxisService`.
    pub async fn test_service() -> PraxisService {
        let db = PraxisDb::open_local(":memory:").await.unwrap();
        PraxisService::from_db(db)
    }

    /// Register a doctor with a throwaway password hash.
    pub async fn create_test_user(svc: &PraxisService, name: &str) -> User {
        let email = format!("{}@praxis.test", name.to_lowercase().replace(' ', "."));
        svc.create_user(&NewUser {
            email,
            name: name.to_string(),
            slug: None,
            password_hash: "$argon2id$test".to_string(),
            specialty: None,
            phone: None,
        })
        .await
        .unwrap()
    }

    /// Service plus one registered doctor; returns the doctor's id.
    pub async fn service_with_user() -> (PraxisService, String) {
        let svc = test_service().await;
        let user = create_test_user(&svc, "Ana Souza").await;
        (svc, user.id)
    }
}
