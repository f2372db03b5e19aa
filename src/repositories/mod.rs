pub mod assignment_repository;
pub mod trip_repository;
