pub mod assignment_controller;
pub mod trip_controller;
