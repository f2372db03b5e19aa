//! Modelo de Assignment
//!
//! Asignación vigente de vehículo/planta por conductor o ayudante.
//! Una sola fila por persona; la última escritura siempre gana y nunca
//! se historiza.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub driver_id: i64,
    /// NULL cuando la asignación fue limpiada explícitamente
    pub vehicle_id: Option<i64>,
    pub plant_id: i64,
    pub assigned_date: NaiveDate,
}
