mod traveler_tests;
mod trip_tests;

use crate::core::convert::ZeroTotalPolicy;
use crate::core::models::{traveler::Traveler, trip::Trip};
use crate::core::services::{LedgerService, ServiceSettings};
use crate::infrastructure::cache::in_memory::InMemoryCache;
use crate::infrastructure::logging::in_memory::InMemoryLogging;
use crate::infrastructure::storage::in_memory::InMemoryStorage;

pub type TestService = LedgerService<InMemoryLogging, InMemoryStorage, InMemoryCache>;

// Lowest cost bcrypt accepts; keeps hashing fast in tests.
const TEST_BCRYPT_COST: u32 = 4;

pub fn test_settings() -> ServiceSettings {
    ServiceSettings {
        password_cost: TEST_BCRYPT_COST,
        ..ServiceSettings::new("test-secret")
    }
}

pub fn create_test_service() -> TestService {
    create_test_service_with(InMemoryStorage::new(), ZeroTotalPolicy::default())
}

/// Builds a service over `storage`, which tests may keep a clone of to reach
/// past the service's validation.
pub fn create_test_service_with(storage: InMemoryStorage, zero_cost_policy: ZeroTotalPolicy) -> TestService {
    let logging = InMemoryLogging::new();
    let cache = InMemoryCache::new();
    let settings = ServiceSettings {
        zero_cost_policy,
        ..test_settings()
    };
    LedgerService::new(storage, logging, cache, settings)
}

pub async fn register(service: &TestService, name: &str) -> Traveler {
    service
        .register_traveler(name, &format!("{}@example.com", name.to_lowercase()), "password")
        .await
        .unwrap()
}

/// Registers one traveler per name and puts them all on a trip owned by the
/// first one.
pub async fn trip_with(service: &TestService, names: &[&str]) -> (Trip, Vec<Traveler>) {
    let mut travelers = Vec::new();
    for name in names {
        travelers.push(register(service, name).await);
    }
    let member_ids: Vec<String> = travelers[1..].iter().map(|t| t.id.clone()).collect();
    let trip = service
        .create_trip("Road trip", &member_ids, &travelers[0].id)
        .await
        .unwrap();
    (trip, travelers)
}
