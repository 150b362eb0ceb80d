use crate::config::CategoryConfig;
use crate::error::MapError;
use crate::types::DemographicRecord;

/// Population size-tier thresholds, largest first. Strictly greater-than:
/// a total of exactly 10,000,000 lands in tier 1.
const TIER_THRESHOLDS: [u64; 2] = [10_000_000, 1_000_000];

/// Name of the category with the strictly greatest count. Ties keep the
/// earliest category in the configured ordering, so the result depends only
/// on that ordering, never on record shape.
pub fn dominant_category<'a>(
    categories: &'a [CategoryConfig],
    record: &DemographicRecord,
) -> Result<&'a str, MapError> {
    if categories.is_empty() {
        return Err(MapError::NoCategories);
    }
    let mut best = 0;
    let mut best_count = record.count(0);
    for index in 1..categories.len() {
        let count = record.count(index);
        if count > best_count {
            best = index;
            best_count = count;
        }
    }
    Ok(categories[best].name.as_str())
}

/// Tier 0, 1 or 2 for a total population count.
pub fn size_tier(total: u64) -> usize {
    if total > TIER_THRESHOLDS[0] {
        0
    } else if total > TIER_THRESHOLDS[1] {
        1
    } else {
        2
    }
}

/// Marker radius grows with the base-10 log of the total, compressing the
/// heavy-tailed population distribution into a usable range.
pub fn marker_radius(total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        2.0 * (total as f64).log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(names: &[&str]) -> Vec<CategoryConfig> {
        names
            .iter()
            .map(|name| CategoryConfig {
                name: name.to_string(),
                color: "#ccc".to_string(),
                columns: vec![],
            })
            .collect()
    }

    fn record(counts: &[u64]) -> DemographicRecord {
        DemographicRecord {
            id: "1".to_string(),
            name: "Test".to_string(),
            counts: counts.to_vec(),
            total: counts.iter().sum(),
        }
    }

    const RACES: [&str; 5] = ["White", "Latino", "Asian", "Black", "Other"];

    #[test]
    fn picks_the_strict_maximum() {
        let schema = categories(&RACES);
        let result = dominant_category(&schema, &record(&[100, 50, 200, 10, 5])).unwrap();
        assert_eq!(result, "Asian");
    }

    #[test]
    fn ties_resolve_to_the_earliest_category() {
        let schema = categories(&RACES);
        let result = dominant_category(&schema, &record(&[50, 50, 0, 0, 0])).unwrap();
        assert_eq!(result, "White");
    }

    #[test]
    fn empty_schema_is_a_configuration_error() {
        let result = dominant_category(&[], &record(&[1, 2, 3]));
        assert_eq!(result, Err(MapError::NoCategories));
    }

    #[test]
    fn missing_counts_read_as_zero() {
        let schema = categories(&RACES);
        let result = dominant_category(&schema, &record(&[7])).unwrap();
        assert_eq!(result, "White");
    }

    #[test]
    fn size_tiers_use_strict_thresholds() {
        assert_eq!(size_tier(15_000_000), 0);
        assert_eq!(size_tier(5_000_000), 1);
        assert_eq!(size_tier(50_000), 2);
        assert_eq!(size_tier(10_000_000), 1);
        assert_eq!(size_tier(1_000_000), 2);
    }

    #[test]
    fn radius_is_strictly_monotonic_for_positive_totals() {
        let totals = [10, 1_000, 99_999, 5_000_000, 80_000_000];
        for pair in totals.windows(2) {
            assert!(marker_radius(pair[0]) < marker_radius(pair[1]));
        }
    }

    #[test]
    fn zero_total_has_zero_radius() {
        assert_eq!(marker_radius(0), 0.0);
    }
}
