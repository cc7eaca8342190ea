use common::domain::{DomainError, DomainResult, DEVICE_NAME_COLUMN, TIMESTAMP_COLUMN};

/// Column name for a property identifier: `tempMax` → `temp_max`, `HTTPServer` → `http_server`
///
/// The store is case-insensitive and lowercase by convention, so the result is
/// lowercase and restricted to `[a-z0-9_]`.
pub fn to_column_name(identifier: &str) -> DomainResult<String> {
    let chars: Vec<char> = identifier.chars().collect();
    let mut name = String::with_capacity(identifier.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            let starts_word = if prev == '_' {
                false
            } else if prev.is_lowercase() {
                true
            } else {
                // Inside an acronym run; split only where a lowercase word begins
                next.is_some_and(|n| n.is_lowercase())
            };
            if starts_word {
                name.push('_');
            }
        }
        name.extend(c.to_lowercase());
    }

    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(DomainError::ValidationError(format!(
            "identifier {:?} cannot be used as a column name",
            identifier
        )));
    }

    if name == TIMESTAMP_COLUMN || name == DEVICE_NAME_COLUMN {
        return Err(DomainError::ValidationError(format!(
            "identifier {:?} collides with the {} column",
            identifier, name
        )));
    }

    Ok(name)
}

/// Property table of a product: `product_property_{productKey}`
pub fn product_table_name(product_key: &str) -> DomainResult<String> {
    let name = format!("product_property_{}", product_key).to_lowercase();
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(DomainError::ValidationError(format!(
            "product key {:?} cannot be used in a table name",
            product_key
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_identifiers() {
        assert_eq!(to_column_name("temp").unwrap(), "temp");
        assert_eq!(to_column_name("tempMax").unwrap(), "temp_max");
        assert_eq!(to_column_name("Temperature").unwrap(), "temperature");
        assert_eq!(to_column_name("batteryLevelPct").unwrap(), "battery_level_pct");
    }

    #[test]
    fn test_acronyms_stay_together() {
        assert_eq!(to_column_name("HTTPServer").unwrap(), "http_server");
        assert_eq!(to_column_name("deviceID").unwrap(), "device_id");
        assert_eq!(to_column_name("CO2").unwrap(), "co2");
    }

    #[test]
    fn test_existing_underscores_and_digits() {
        assert_eq!(to_column_name("my_Value").unwrap(), "my_value");
        assert_eq!(to_column_name("temp2Max").unwrap(), "temp2_max");
        assert_eq!(to_column_name("pm2_5").unwrap(), "pm2_5");
    }

    #[test]
    fn test_unusable_identifiers_are_rejected() {
        assert!(matches!(to_column_name(""), Err(DomainError::ValidationError(_))));
        assert!(matches!(to_column_name("temp-max"), Err(DomainError::ValidationError(_))));
        assert!(matches!(to_column_name("温度"), Err(DomainError::ValidationError(_))));
        assert!(matches!(to_column_name("TS"), Err(DomainError::ValidationError(_))));
        assert!(matches!(to_column_name("deviceName"), Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_table_names() {
        assert_eq!(product_table_name("P1abc").unwrap(), "product_property_p1abc");
        assert!(product_table_name("p?1").is_err());
    }
}
