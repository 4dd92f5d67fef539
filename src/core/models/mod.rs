pub mod audit;
pub mod expense;
pub mod traveler;
pub mod trip;
