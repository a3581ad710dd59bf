use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{plan::Plan, purchase::CatalogPlatform},
};

/// Canonical tariff id: lowercase, runs of characters outside `[a-z0-9_-]`
/// replaced by a single `-`, no leading or trailing `-`.
pub fn normalize_tariff_id(value: &str) -> AppResult<String> {
    let mut out = String::with_capacity(value.len());
    for ch in value.trim().to_lowercase().chars() {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-' {
            ch
        } else {
            '-'
        };
        if ch == '-' && out.ends_with('-') {
            continue;
        }
        out.push(ch);
    }

    let normalized = out.trim_matches('-');
    if normalized.is_empty() {
        return Err(AppError::InvalidInput("Invalid tariff_id".into()));
    }
    Ok(normalized.to_string())
}

/// Strict plan name for administrative input.
pub fn parse_plan(value: &str) -> AppResult<Plan> {
    value
        .trim()
        .parse::<Plan>()
        .map_err(|_| AppError::InvalidInput("Invalid plan".into()))
}

pub fn parse_platform(value: &str) -> AppResult<CatalogPlatform> {
    value
        .trim()
        .parse::<CatalogPlatform>()
        .map_err(|_| AppError::InvalidInput("Invalid platform".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tariff_id_normalization() {
        assert_eq!(normalize_tariff_id("premium-monthly").unwrap(), "premium-monthly");
        assert_eq!(normalize_tariff_id("  Premium Monthly ").unwrap(), "premium-monthly");
        assert_eq!(normalize_tariff_id("Pro!!  Yearly__v2").unwrap(), "pro-yearly__v2");
        assert_eq!(normalize_tariff_id("--a---b--").unwrap(), "a-b");
        assert_eq!(normalize_tariff_id("Prämie").unwrap(), "pr-mie");
    }

    #[test]
    fn tariff_id_rejects_empty_result() {
        assert!(matches!(normalize_tariff_id(""), Err(AppError::InvalidInput(_))));
        assert!(matches!(normalize_tariff_id("!!!"), Err(AppError::InvalidInput(_))));
        assert!(matches!(normalize_tariff_id(" - "), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn plan_parsing_is_strict() {
        assert_eq!(parse_plan(" Premium ").unwrap(), Plan::Premium);
        assert_eq!(parse_plan("free").unwrap(), Plan::Free);
        assert!(matches!(parse_plan("gold"), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_plan(""), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn platform_parsing() {
        assert_eq!(parse_platform("Android").unwrap(), CatalogPlatform::Android);
        assert!(matches!(parse_platform("web"), Err(AppError::InvalidInput(_))));
    }
}
