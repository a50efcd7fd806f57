//! Water demand scaled linearly from a fixed reference city.

use crate::population::PopulationEstimate;
use crate::query::Interval;
use serde::{Deserialize, Serialize};

/// Baseline city whose population, area and demand anchor every estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reference {
    pub city: &'static str,
    pub population: u64,
    pub area_km2: f64,
    /// Liters per day
    pub daily_demand_l: f64,
}

/// Bangalore: 12 million people, 740 km², 1.44 billion liters a day.
pub const REFERENCE: Reference = Reference {
    city: "Bangalore",
    population: 12_000_000,
    area_km2: 740.0,
    daily_demand_l: 1.44e9,
};

impl Reference {
    /// People per km².
    pub fn density(&self) -> f64 {
        self.population as f64 / self.area_km2
    }

    /// Reference demand for one interval: a day, a 30-day month or a 365-day year.
    pub fn demand_for(&self, interval: Interval) -> f64 {
        match interval {
            Interval::Daily => self.daily_demand_l,
            Interval::Monthly => self.daily_demand_l * 30.0,
            Interval::Yearly => self.daily_demand_l * 365.0,
        }
    }
}

/// Demand figure with a provenance tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandEstimate {
    #[serde(rename = "demand_L")]
    pub value_liters: f64,
    #[serde(rename = "demand_source")]
    pub source: String,
}

/// Liters needed by `population` people over one `interval`.
///
/// `None` when the population is missing or zero.
pub fn demand(reference: &Reference, population: Option<u64>, interval: Interval) -> Option<f64> {
    let population = population.filter(|p| *p > 0)?;
    let factor = population as f64 / reference.population as f64;
    Some(reference.demand_for(interval) * factor)
}

/// Scale the reference demand by `population`, or fall back to the raw
/// reference constant for the interval.
pub fn estimate_demand(
    reference: &Reference,
    population: &PopulationEstimate,
    interval: Interval,
) -> DemandEstimate {
    match demand(reference, Some(population.value), interval) {
        Some(value_liters) => DemandEstimate {
            value_liters,
            source: format!("scaled_from_{}_{}", reference.city, population.source.tag()),
        },
        None => DemandEstimate {
            value_liters: reference.demand_for(interval),
            source: format!("fallback_constant_{interval}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::PopulationSource;

    #[test]
    fn reference_city_demands_reference_constant() {
        let daily = demand(&REFERENCE, Some(REFERENCE.population), Interval::Daily).unwrap();
        assert_eq!(daily, 1.44e9);
        let monthly = demand(&REFERENCE, Some(REFERENCE.population), Interval::Monthly).unwrap();
        assert_eq!(monthly, 1.44e9 * 30.0);
        let yearly = demand(&REFERENCE, Some(REFERENCE.population), Interval::Yearly).unwrap();
        assert_eq!(yearly, 1.44e9 * 365.0);
    }

    #[test]
    fn demand_is_linear_in_population() {
        for interval in [Interval::Daily, Interval::Monthly, Interval::Yearly] {
            for p in [1u64, 3_517, 840_000, 12_000_000, 31_000_000] {
                let single = demand(&REFERENCE, Some(p), interval).unwrap();
                let double = demand(&REFERENCE, Some(2 * p), interval).unwrap();
                assert!(((double - 2.0 * single) / double).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn missing_population_has_no_demand() {
        assert_eq!(demand(&REFERENCE, None, Interval::Daily), None);
        assert_eq!(demand(&REFERENCE, Some(0), Interval::Daily), None);
    }

    #[test]
    fn scaled_estimate_is_tagged_with_population_source() {
        let population = PopulationEstimate {
            value: 6_000_000,
            source: PopulationSource::ExternalLookup,
        };
        let estimate = estimate_demand(&REFERENCE, &population, Interval::Daily);
        assert_eq!(estimate.value_liters, 0.72e9);
        assert_eq!(estimate.source, "scaled_from_Bangalore_external_lookup");
    }

    #[test]
    fn zero_population_falls_back_to_constant() {
        let population = PopulationEstimate {
            value: 0,
            source: PopulationSource::DensityFallback,
        };
        let estimate = estimate_demand(&REFERENCE, &population, Interval::Monthly);
        assert_eq!(estimate.value_liters, 1.44e9 * 30.0);
        assert_eq!(estimate.source, "fallback_constant_monthly");
    }
}
