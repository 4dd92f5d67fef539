use crate::constants::{MEMBER_ADDED, TRIP_CREATED};
use crate::core::convert::ZeroTotalPolicy;
use crate::core::errors::{ErrorKind, LedgerError};
use crate::core::models::expense::{Expense, MoneyShare, SplitType, Splits};
use crate::core::models::trip::Role;
use crate::core::money::Cents;
use crate::core::services::NewExpense;
use crate::infrastructure::storage::{Storage, in_memory::InMemoryStorage};
use crate::tests::{create_test_service, create_test_service_with, register, trip_with};
use chrono::Utc;

#[tokio::test]
async fn test_create_trip_makes_creator_owner() {
    let service = create_test_service();
    let (trip, travelers) = trip_with(&service, &["Ana", "Ben"]).await;

    assert_eq!(trip.members.len(), 2);
    assert_eq!(trip.members[0].traveler_id, travelers[0].id);
    assert_eq!(trip.members[0].role, Role::Owner);
    assert_eq!(trip.members[1].role, Role::Member);
    assert!(trip.is_owner(&travelers[0].id));

    let fetched = service.get_trip(&trip.id, &travelers[1].id).await.unwrap();
    assert_eq!(fetched, trip);

    let audits = service.get_trip_audits(&trip.id, &travelers[0].id).await.unwrap();
    assert_eq!(audits[0].action, TRIP_CREATED);
}

#[tokio::test]
async fn test_create_trip_ignores_duplicate_members() {
    let service = create_test_service();
    let ana = register(&service, "Ana").await;
    let ben = register(&service, "Ben").await;
    let trip = service
        .create_trip("Alps", &[ben.id.clone(), ben.id.clone(), ana.id.clone()], &ana.id)
        .await
        .unwrap();
    assert_eq!(trip.members.len(), 2);
}

#[tokio::test]
async fn test_create_trip_with_unknown_member() {
    let service = create_test_service();
    let ana = register(&service, "Ana").await;
    let result = service.create_trip("Alps", &["ghost".to_string()], &ana.id).await;
    assert!(matches!(result, Err(LedgerError::TravelerNotFound(_))));
}

#[tokio::test]
async fn test_outsider_cannot_read_trip() {
    let service = create_test_service();
    let (trip, _) = trip_with(&service, &["Ana", "Ben"]).await;
    let eve = register(&service, "Eve").await;

    let err = service.get_trip(&trip.id, &eve.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(matches!(
        service.get_balances(&trip.id, &eve.id).await,
        Err(LedgerError::NotTripMember(_))
    ));
}

#[tokio::test]
async fn test_add_member_by_id_and_email() {
    let service = create_test_service();
    let (trip, travelers) = trip_with(&service, &["Ana"]).await;
    let ben = register(&service, "Ben").await;
    let cleo = register(&service, "Cleo").await;
    let owner = &travelers[0].id;

    service.add_member(&trip.id, &ben.id, owner).await.unwrap();
    let trip = service
        .add_member_by_email(&trip.id, "CLEO@example.com", owner)
        .await
        .unwrap();
    assert!(trip.is_member(&ben.id));
    assert!(trip.is_member(&cleo.id));

    assert!(matches!(
        service.add_member(&trip.id, &ben.id, owner).await,
        Err(LedgerError::AlreadyTripMember(_))
    ));
    assert!(matches!(
        service.add_member(&trip.id, &ben.id, &cleo.id).await,
        Err(LedgerError::NotTripOwner(_))
    ));

    let audits = service.get_trip_audits(&trip.id, owner).await.unwrap();
    assert_eq!(audits.iter().filter(|a| a.action == MEMBER_ADDED).count(), 2);
}

#[tokio::test]
async fn test_new_member_appears_in_cached_balances() {
    let service = create_test_service();
    let (trip, travelers) = trip_with(&service, &["Ana", "Ben"]).await;
    let owner = &travelers[0].id;

    let before = service.get_balances(&trip.id, owner).await.unwrap();
    assert_eq!(before.balances.len(), 2);

    let cleo = register(&service, "Cleo").await;
    service.add_member(&trip.id, &cleo.id, owner).await.unwrap();

    let after = service.get_balances(&trip.id, owner).await.unwrap();
    assert_eq!(after.balance_of(&cleo.id), Some(Cents::ZERO));
}

#[tokio::test]
async fn test_remove_member_rules() {
    let service = create_test_service();
    let (trip, travelers) = trip_with(&service, &["Ana", "Ben", "Cleo"]).await;
    let (ana, ben, cleo) = (&travelers[0], &travelers[1], &travelers[2]);

    service
        .create_equal_split_expense(
            &trip.id,
            NewExpense {
                title: "Dinner".to_string(),
                payer_id: ana.id.clone(),
                total_cost: Cents::new(6_000),
            },
            vec![ana.id.clone(), ben.id.clone()],
            SplitType::Money,
            &ana.id,
        )
        .await
        .unwrap();

    assert!(matches!(
        service.remove_member(&trip.id, &ana.id, &ana.id).await,
        Err(LedgerError::OwnerCannotRemoveSelf)
    ));
    assert!(matches!(
        service.remove_member(&trip.id, &cleo.id, &ben.id).await,
        Err(LedgerError::NotTripOwner(_))
    ));
    let err = service.remove_member(&trip.id, &ben.id, &ana.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::MemberHasExpenses(_)));
    assert_eq!(err.kind(), ErrorKind::ValidationError);

    let trip = service.remove_member(&trip.id, &cleo.id, &ana.id).await.unwrap();
    assert!(!trip.is_member(&cleo.id));
    let sheet = service.get_balances(&trip.id, &ana.id).await.unwrap();
    assert_eq!(sheet.balance_of(&cleo.id), None);
}

#[tokio::test]
async fn test_delete_trip_removes_its_expenses() {
    let service = create_test_service();
    let (trip, travelers) = trip_with(&service, &["Ana", "Ben"]).await;
    let (ana, ben) = (&travelers[0], &travelers[1]);

    let expense = service
        .create_equal_split_expense(
            &trip.id,
            NewExpense {
                title: "Fuel".to_string(),
                payer_id: ben.id.clone(),
                total_cost: Cents::new(8_000),
            },
            Vec::new(),
            SplitType::Money,
            &ben.id,
        )
        .await
        .unwrap();
    service.get_balances(&trip.id, &ana.id).await.unwrap();

    assert!(matches!(
        service.delete_trip(&trip.id, &ben.id).await,
        Err(LedgerError::NotTripOwner(_))
    ));
    service.delete_trip(&trip.id, &ana.id).await.unwrap();

    assert!(matches!(
        service.get_expense_details(&expense.id, &ana.id).await,
        Err(LedgerError::ExpenseNotFound(_))
    ));
    assert!(matches!(
        service.get_balances(&trip.id, &ana.id).await,
        Err(LedgerError::TripNotFound(_))
    ));
    assert!(matches!(
        service.delete_trip(&trip.id, &ana.id).await,
        Err(LedgerError::TripNotFound(_))
    ));
}

#[tokio::test]
async fn test_member_removal_and_expense_writes_do_not_interleave() {
    let storage = InMemoryStorage::new();
    let service = create_test_service_with(storage.clone(), ZeroTotalPolicy::default());
    let (trip, travelers) = trip_with(&service, &["Ana", "Ben", "Cleo"]).await;
    let (ana, ben, cleo) = (&travelers[0], &travelers[1], &travelers[2]);

    let shares = |ids: &[&str], cost: i64| {
        Splits::Money(
            ids.iter()
                .map(|id| MoneyShare {
                    member_id: id.to_string(),
                    cost: Cents::new(cost),
                })
                .collect(),
        )
    };

    // Expense lands after the service-level membership checks passed.
    let lunch = service
        .create_custom_split_expense(
            &trip.id,
            NewExpense {
                title: "Lunch".to_string(),
                payer_id: ana.id.clone(),
                total_cost: Cents::new(2_000),
            },
            shares(&[ana.id.as_str(), ben.id.as_str()], 1_000),
            &ana.id,
        )
        .await
        .unwrap();
    assert!(matches!(
        storage.remove_trip_member(&trip.id, &ben.id).await,
        Err(LedgerError::MemberHasExpenses(_))
    ));

    // Writes validated against a trip that still listed Cleo.
    service.remove_member(&trip.id, &cleo.id, &ana.id).await.unwrap();
    let now = Utc::now();
    let stale = Expense {
        id: "stale".to_string(),
        trip_id: trip.id.clone(),
        title: "Museum".to_string(),
        total_cost: Cents::new(2_000),
        payer_id: ana.id.clone(),
        splits: shares(&[ana.id.as_str(), cleo.id.as_str()], 1_000),
        version: 1,
        created_by: ana.id.clone(),
        created_at: now,
        updated_at: now,
    };
    assert_eq!(
        storage.insert_expense(stale).await,
        Err(LedgerError::InvalidSplitMember(cleo.id.clone()))
    );

    let mut modified = lunch.clone();
    modified.splits = shares(&[ana.id.as_str(), cleo.id.as_str()], 1_000);
    assert_eq!(
        storage.replace_expense(modified, lunch.version).await,
        Err(LedgerError::InvalidSplitMember(cleo.id.clone()))
    );
    let mut repaid = lunch.clone();
    repaid.payer_id = cleo.id.clone();
    assert!(matches!(
        storage.replace_expense(repaid, lunch.version).await,
        Err(LedgerError::InvalidInput(..))
    ));

    let sheet = service.get_balances(&trip.id, &ana.id).await.unwrap();
    assert!(sheet.skipped.is_empty());
    assert_eq!(sheet.balance_of(&ben.id), Some(Cents::new(-1_000)));
}
