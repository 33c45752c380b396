//! Annual cost comparison between a current policy and an optimized one.

use crate::error::{DemandError, Result};
use crate::inventory::{CostParams, InventoryPolicy};
use serde::Serialize;

const MONTHS_PER_YEAR: usize = 12;

/// The replenishment practice currently in place, as reported by the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentPolicy {
    pub order_quantity: f64,
    pub safety_stock: f64,
    /// Service level the current safety stock is believed to achieve.
    pub service_level: f64,
}

impl CurrentPolicy {
    fn validate(&self) -> Result<()> {
        if !self.order_quantity.is_finite() || self.order_quantity <= 0.0 {
            return Err(DemandError::Configuration(format!(
                "current order quantity {} must be positive and finite",
                self.order_quantity
            )));
        }
        if !self.safety_stock.is_finite() || self.safety_stock < 0.0 {
            return Err(DemandError::Configuration(format!(
                "current safety stock {} must be non-negative and finite",
                self.safety_stock
            )));
        }
        if !(self.service_level > 0.0 && self.service_level < 1.0) {
            return Err(DemandError::Configuration(format!(
                "current service level {} must be in (0, 1)",
                self.service_level
            )));
        }
        Ok(())
    }
}

/// Annual cost of running one policy, broken down by component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyCost {
    /// Carrying cost of cycle stock plus safety stock.
    pub holding: f64,
    /// Fixed ordering cost across the year's replenishments.
    pub ordering: f64,
    /// Expected cost of unmet demand at the policy's service level.
    pub stockout: f64,
    pub total: f64,
}

impl PolicyCost {
    /// Annual cost of a policy: average cycle stock of half an order plus
    /// the full safety stock carried year-round, `annual / q` orders, and a
    /// stockout exposure proportional to the demand left uncovered by the
    /// service level.
    fn annual(
        order_quantity: f64,
        safety_stock: f64,
        service_level: f64,
        annual_demand: f64,
        costs: &CostParams,
    ) -> Self {
        let holding = (order_quantity / 2.0 + safety_stock) * costs.holding_rate;
        let ordering = if order_quantity > 0.0 {
            annual_demand / order_quantity * costs.ordering_cost
        } else {
            0.0
        };
        // The normal service level is the CDF at the safety factor, so the
        // tail probability of a shortfall is its complement.
        let shortfall_probability = 1.0 - service_level;
        let stockout = shortfall_probability * annual_demand * costs.stockout_cost;
        Self {
            holding,
            ordering,
            stockout,
            total: holding + ordering + stockout,
        }
    }
}

/// Projected financial impact of switching to the optimized policy.
#[derive(Debug, Clone, Serialize)]
pub struct CostBenefitReport {
    /// Annual cost of the current practice; absent when none was supplied.
    pub current: Option<PolicyCost>,
    pub optimized: PolicyCost,
    /// Current minus optimized annual total; positive means savings.
    pub annual_savings: Option<f64>,
    /// Cumulative savings at the end of each of the next twelve months,
    /// accrued linearly and net of the transition cost.
    pub cumulative_savings: Option<Vec<f64>>,
    /// Months until savings cover the transition cost; absent when no
    /// transition cost was supplied or monthly savings are not positive.
    pub payback_months: Option<f64>,
}

/// Compare the current replenishment practice against the optimized policy.
///
/// Without a current policy only the optimized cost is reported. The savings
/// projection accrues linearly over twelve months; a transition cost (system
/// changes, retraining, stock rebalancing) is deducted up front and sets the
/// payback horizon.
pub fn cost_benefit(
    current: Option<&CurrentPolicy>,
    optimized: &InventoryPolicy,
    costs: &CostParams,
    transition_cost: Option<f64>,
) -> Result<CostBenefitReport> {
    costs.validate()?;
    if let Some(cost) = transition_cost {
        if !cost.is_finite() || cost < 0.0 {
            return Err(DemandError::Configuration(format!(
                "transition cost {cost} must be non-negative and finite"
            )));
        }
    }

    let annual_demand = optimized.annual_demand();
    let optimized_cost = PolicyCost::annual(
        optimized.order_quantity,
        optimized.safety_stock,
        optimized.service_level,
        annual_demand,
        costs,
    );

    let current_cost = match current {
        Some(policy) => {
            policy.validate()?;
            Some(PolicyCost::annual(
                policy.order_quantity,
                policy.safety_stock,
                policy.service_level,
                annual_demand,
                costs,
            ))
        }
        None => None,
    };

    let annual_savings = current_cost
        .as_ref()
        .map(|c| c.total - optimized_cost.total);

    let transition = transition_cost.unwrap_or(0.0);
    let cumulative_savings = annual_savings.map(|annual| {
        let monthly = annual / MONTHS_PER_YEAR as f64;
        (1..=MONTHS_PER_YEAR)
            .map(|month| monthly * month as f64 - transition)
            .collect()
    });
    // A payback horizon only exists when a transition cost was given and
    // the switch actually saves money month over month.
    let payback_months = match (transition_cost, annual_savings) {
        (Some(transition), Some(annual)) => {
            let monthly = annual / MONTHS_PER_YEAR as f64;
            if monthly > 0.0 {
                Some(transition / monthly)
            } else {
                None
            }
        }
        _ => None,
    };

    Ok(CostBenefitReport {
        current: current_cost,
        optimized: optimized_cost,
        annual_savings,
        cumulative_savings,
        payback_months,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ForecastResult;
    use crate::inventory::optimize_inventory;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDate};

    fn costs() -> CostParams {
        CostParams {
            holding_rate: 2.0,
            ordering_cost: 50.0,
            stockout_cost: 10.0,
        }
    }

    fn optimized_policy() -> InventoryPolicy {
        let start = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let dates: Vec<NaiveDate> = (0..30).map(|i| start + Duration::days(i)).collect();
        let forecast = ForecastResult::new(
            "TrendSeasonal",
            dates,
            vec![100.0; 30],
            vec![80.0; 30],
            vec![120.0; 30],
            0.95,
        )
        .unwrap();
        optimize_inventory(&forecast, 7, 0.95, &costs(), 1000.0).unwrap()
    }

    #[test]
    fn optimized_cost_components_match_formulas() {
        let policy = optimized_policy();
        let report = cost_benefit(None, &policy, &costs(), None).unwrap();
        let annual = policy.annual_demand();

        assert_relative_eq!(
            report.optimized.holding,
            (policy.order_quantity / 2.0 + policy.safety_stock) * 2.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            report.optimized.ordering,
            annual / policy.order_quantity * 50.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            report.optimized.stockout,
            0.05 * annual * 10.0,
            epsilon = 1e-6
        );
        assert_relative_eq!(
            report.optimized.total,
            report.optimized.holding + report.optimized.ordering + report.optimized.stockout,
            epsilon = 1e-9
        );
        assert!(report.current.is_none());
        assert!(report.annual_savings.is_none());
        assert!(report.payback_months.is_none());
    }

    #[test]
    fn wasteful_current_policy_shows_savings() {
        let policy = optimized_policy();
        // Far-too-large orders and excess safety stock.
        let current = CurrentPolicy {
            order_quantity: policy.order_quantity * 8.0,
            safety_stock: policy.safety_stock + 5000.0,
            service_level: 0.95,
        };
        let report = cost_benefit(Some(&current), &policy, &costs(), None).unwrap();
        let savings = report.annual_savings.unwrap();
        assert!(savings > 0.0);

        let cumulative = report.cumulative_savings.unwrap();
        assert_eq!(cumulative.len(), 12);
        assert_relative_eq!(cumulative[11], savings, epsilon = 1e-9);
        assert_relative_eq!(cumulative[0], savings / 12.0, epsilon = 1e-9);
        // Linear accrual: equal monthly increments.
        assert_relative_eq!(
            cumulative[5] - cumulative[4],
            cumulative[1] - cumulative[0],
            epsilon = 1e-9
        );
        // No transition cost supplied, so no payback horizon to report.
        assert!(report.payback_months.is_none());
    }

    #[test]
    fn payback_requires_a_transition_cost() {
        let policy = optimized_policy();
        let current = CurrentPolicy {
            order_quantity: policy.order_quantity * 8.0,
            safety_stock: policy.safety_stock + 5000.0,
            service_level: 0.95,
        };
        // Positive savings alone do not define a payback horizon.
        let report = cost_benefit(Some(&current), &policy, &costs(), None).unwrap();
        assert!(report.annual_savings.unwrap() > 0.0);
        assert!(report.payback_months.is_none());
        // An explicit zero transition cost pays back immediately.
        let report = cost_benefit(Some(&current), &policy, &costs(), Some(0.0)).unwrap();
        assert_relative_eq!(report.payback_months.unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn transition_cost_sets_payback_horizon() {
        let policy = optimized_policy();
        let current = CurrentPolicy {
            order_quantity: policy.order_quantity * 8.0,
            safety_stock: policy.safety_stock + 5000.0,
            service_level: 0.95,
        };
        let transition = 3000.0;
        let report = cost_benefit(Some(&current), &policy, &costs(), Some(transition)).unwrap();
        let savings = report.annual_savings.unwrap();
        let monthly = savings / 12.0;

        assert_relative_eq!(
            report.payback_months.unwrap(),
            transition / monthly,
            epsilon = 1e-9
        );
        let cumulative = report.cumulative_savings.unwrap();
        assert_relative_eq!(cumulative[11], savings - transition, epsilon = 1e-9);
    }

    #[test]
    fn no_payback_when_current_policy_already_better() {
        let policy = optimized_policy();
        // Same order quantity and safety stock but a higher believed service
        // level, so the current stockout exposure is lower.
        let current = CurrentPolicy {
            order_quantity: policy.order_quantity,
            safety_stock: policy.safety_stock,
            service_level: 0.99,
        };
        let report = cost_benefit(Some(&current), &policy, &costs(), Some(1000.0)).unwrap();
        assert!(report.annual_savings.unwrap() < 0.0);
        assert!(report.payback_months.is_none());
    }

    #[test]
    fn rejects_invalid_inputs() {
        let policy = optimized_policy();
        let bad = CurrentPolicy {
            order_quantity: 0.0,
            safety_stock: 10.0,
            service_level: 0.9,
        };
        assert!(matches!(
            cost_benefit(Some(&bad), &policy, &costs(), None),
            Err(DemandError::Configuration(_))
        ));
        assert!(matches!(
            cost_benefit(None, &policy, &costs(), Some(-1.0)),
            Err(DemandError::Configuration(_))
        ));
    }
}
