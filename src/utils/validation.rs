//! Helpers de validación y normalización de entrada
//!
//! Normalización de nombres de cliente y parsing de parámetros
//! de query antes de tocar la base de datos.

use crate::utils::errors::{AppError, AppResult};

/// Límite duro de página para listados de viajes
pub const MAX_PAGE_SIZE: i64 = 100;

/// Normalizar nombres de cliente: recorta espacios y descarta entradas vacías.
/// El orden de llegada se conserva.
pub fn normalize_customer_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Nombres de `incoming` que aún no figuran en `existing`, comparados sin
/// distinguir mayúsculas. También de-duplica dentro del propio lote.
pub fn names_to_append(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = existing.iter().map(|n| n.to_lowercase()).collect();
    let mut result = Vec::new();

    for name in incoming {
        let key = name.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            result.push(name.clone());
        }
    }

    result
}

/// Diferencia de conjuntos para rosters: (a insertar, a borrar) al pasar
/// del roster `current` al roster `target`.
pub fn roster_diff(current: &[i64], target: &[i64]) -> (Vec<i64>, Vec<i64>) {
    let to_insert = target
        .iter()
        .filter(|id| !current.contains(id))
        .copied()
        .collect();
    let to_delete = current
        .iter()
        .filter(|id| !target.contains(id))
        .copied()
        .collect();
    (to_insert, to_delete)
}

/// Parsear el parámetro `driver_ids` de la query string ("3,5,9")
pub fn parse_driver_ids_param(raw: &str) -> AppResult<Vec<i64>> {
    raw.split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|_| {
                AppError::ValidationError(format!("invalid driver id '{}' in filter", part))
            })
        })
        .collect()
}

/// Acotar el tamaño de página pedido al rango [1, MAX_PAGE_SIZE]
pub fn clamp_page_size(requested: Option<i64>) -> i64 {
    requested.unwrap_or(20).clamp(1, MAX_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_drops_empty_and_trims() {
        let input = names(&["  Acme SA ", "", "   ", "Bodega Norte"]);
        assert_eq!(
            normalize_customer_names(&input),
            names(&["Acme SA", "Bodega Norte"])
        );
    }

    #[test]
    fn test_names_to_append_is_case_insensitive() {
        let existing = names(&["Acme SA"]);
        let incoming = names(&["ACME sa", "Bodega Norte"]);
        assert_eq!(
            names_to_append(&existing, &incoming),
            names(&["Bodega Norte"])
        );
    }

    #[test]
    fn test_names_to_append_dedupes_within_batch() {
        let incoming = names(&["Acme SA", "acme sa", "Bodega Norte"]);
        assert_eq!(
            names_to_append(&[], &incoming),
            names(&["Acme SA", "Bodega Norte"])
        );
    }

    #[test]
    fn test_roster_diff() {
        let (insert, delete) = roster_diff(&[1, 2, 3], &[2, 3, 4]);
        assert_eq!(insert, vec![4]);
        assert_eq!(delete, vec![1]);
    }

    #[test]
    fn test_roster_diff_identical_is_noop() {
        let (insert, delete) = roster_diff(&[1, 2], &[2, 1]);
        assert!(insert.is_empty());
        assert!(delete.is_empty());
    }

    #[test]
    fn test_parse_driver_ids_param() {
        assert_eq!(parse_driver_ids_param("3, 5,9").unwrap(), vec![3, 5, 9]);
        assert!(parse_driver_ids_param("3,x").is_err());
        assert_eq!(parse_driver_ids_param("").unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn test_clamp_page_size() {
        assert_eq!(clamp_page_size(None), 20);
        assert_eq!(clamp_page_size(Some(500)), 100);
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(Some(50)), 50);
    }
}
