pub mod assignment;
pub mod trip;
