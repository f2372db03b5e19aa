pub mod trip_dto;
