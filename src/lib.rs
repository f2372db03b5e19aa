//! Fleet trip tracker
//!
//! Motor de ciclo de vida de viajes y consistencia de asignaciones para
//! una flota de transporte: apertura/mutación/cierre de viajes con
//! invariantes de odómetro, rosters many-to-many y asignación vigente
//! por conductor, todo dentro de transacciones atómicas.

pub mod config;
pub mod controllers;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
