pub mod odometer_guard;
