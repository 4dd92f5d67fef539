use crate::constants::{TRAVELER_LOGGED_IN, TRAVELER_REGISTERED};
use crate::core::errors::LedgerError;
use crate::tests::{create_test_service, register};

#[tokio::test]
async fn test_register_traveler() {
    let service = create_test_service();
    let traveler = service
        .register_traveler("Ana", "Ana@Example.com", "secret")
        .await
        .unwrap();
    assert_eq!(traveler.email, "ana@example.com");
    assert_ne!(traveler.password_hash, "secret");

    let fetched = service.get_traveler(&traveler.id).await.unwrap();
    assert_eq!(fetched, traveler);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let service = create_test_service();
    register(&service, "Ana").await;
    let result = service.register_traveler("Other Ana", "ana@example.com", "pw").await;
    assert!(matches!(result, Err(LedgerError::EmailAlreadyRegistered(_))));
}

#[tokio::test]
async fn test_register_invalid_input() {
    let service = create_test_service();
    assert!(matches!(
        service.register_traveler("Ana", "invalid", "pw").await,
        Err(LedgerError::InvalidEmail(_))
    ));
    assert!(matches!(
        service.register_traveler("Ana", "", "pw").await,
        Err(LedgerError::MissingEmail)
    ));
    assert!(matches!(
        service.register_traveler("<Ana>", "ana@example.com", "pw").await,
        Err(LedgerError::InvalidInput(..))
    ));
    assert!(matches!(
        service.register_traveler("Ana", "ana@example.com", "").await,
        Err(LedgerError::InvalidInput(..))
    ));
}

#[tokio::test]
async fn test_login_issues_token_for_traveler() {
    let service = create_test_service();
    let ana = register(&service, "Ana").await;

    let token = service.authenticate("ana@example.com", "password").await.unwrap();
    let claims = service.validate_token(&token).unwrap();
    assert_eq!(claims.sub, ana.id);

    assert!(matches!(
        service.authenticate("ana@example.com", "wrong").await,
        Err(LedgerError::InvalidCredentials)
    ));
    assert!(matches!(
        service.authenticate("nobody@example.com", "password").await,
        Err(LedgerError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_get_unknown_traveler() {
    let service = create_test_service();
    assert!(matches!(
        service.get_traveler("missing").await,
        Err(LedgerError::TravelerNotFound(_))
    ));
}

#[tokio::test]
async fn test_app_logs_are_scoped_to_the_caller() {
    let service = create_test_service();
    let ana = register(&service, "Ana").await;
    let ben = register(&service, "Ben").await;
    service.authenticate("ana@example.com", "password").await.unwrap();

    let logs = service.get_app_logs(&ana.id).await.unwrap();
    let actions: Vec<&str> = logs.iter().map(|log| log.action.as_str()).collect();
    assert_eq!(actions, vec![TRAVELER_REGISTERED, TRAVELER_LOGGED_IN]);
    assert!(logs.iter().all(|log| log.details["email"] != ben.email.as_str()));

    assert_eq!(service.get_app_logs(&ben.id).await.unwrap().len(), 1);
}
