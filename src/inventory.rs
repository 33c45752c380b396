//! Inventory policy derivation from a demand forecast.

use crate::core::ForecastResult;
use crate::error::{DemandError, Result};
use crate::utils::{normal_quantile, std_dev};
use chrono::NaiveDate;
use serde::Serialize;

const DAYS_PER_YEAR: f64 = 365.0;
/// Average daily risk above which a recommendation is issued.
const HIGH_RISK_THRESHOLD: f64 = 0.3;

/// Cost structure of holding and replenishing a product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostParams {
    /// Cost of holding one unit for a year.
    pub holding_rate: f64,
    /// Fixed cost per replenishment order.
    pub ordering_cost: f64,
    /// Cost per unit of unmet demand.
    pub stockout_cost: f64,
}

impl CostParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value, strict) in [
            ("holding rate", self.holding_rate, true),
            ("ordering cost", self.ordering_cost, true),
            ("stockout cost", self.stockout_cost, false),
        ] {
            if !value.is_finite() || value < 0.0 || (strict && value == 0.0) {
                return Err(DemandError::Configuration(format!(
                    "{name} {value} must be {} and finite",
                    if strict { "positive" } else { "non-negative" }
                )));
            }
        }
        Ok(())
    }
}

/// One simulated day of inventory movement.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryDay {
    pub date: NaiveDate,
    pub demand: f64,
    /// Stock received from an earlier order arriving today.
    pub received: f64,
    /// On-hand stock at end of day.
    pub on_hand: f64,
    /// Stock on order but not yet arrived, end of day.
    pub on_order: f64,
    /// Quantity ordered today, zero on most days.
    pub ordered: f64,
    pub stockout: bool,
}

/// How urgently a recommendation should be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// An actionable adjustment suggested by the simulated trajectory.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub severity: Severity,
    pub title: String,
    pub action: String,
}

/// A recommended replenishment policy with its simulated trajectory.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryPolicy {
    /// Mean forecast daily demand.
    pub daily_demand: f64,
    /// Daily demand standard deviation implied by the forecast interval.
    pub demand_std: f64,
    pub safety_stock: f64,
    pub reorder_point: f64,
    /// Economic order quantity per replenishment.
    pub order_quantity: f64,
    pub service_level: f64,
    pub lead_time_days: u32,
    /// Fraction of simulated days with unmet demand.
    pub stockout_probability: f64,
    /// Starting inventory expressed in days of mean demand; undefined when
    /// the forecast demand is zero.
    pub days_of_supply: Option<f64>,
    /// Day-by-day simulation over the forecast horizon.
    pub trajectory: Vec<InventoryDay>,
}

impl InventoryPolicy {
    /// Forecast annual demand.
    pub fn annual_demand(&self) -> f64 {
        self.daily_demand * DAYS_PER_YEAR
    }

    /// Expected demand over one replenishment lead time.
    pub fn lead_time_demand(&self) -> f64 {
        self.daily_demand * self.lead_time_days as f64
    }

    /// Average risk of running short over the simulated horizon. A day
    /// scores 1.0 when its closing stock is below a tenth of that day's
    /// demand, 0.5 below a fifth, and 0 otherwise.
    pub fn shortage_risk(&self) -> f64 {
        self.mean_risk(|day| {
            if day.on_hand < 0.1 * day.demand {
                1.0
            } else if day.on_hand < 0.2 * day.demand {
                0.5
            } else {
                0.0
            }
        })
    }

    /// Average risk of carrying excess stock. A day scores 1.0 when its
    /// closing stock exceeds three times that day's demand, 0.5 above
    /// twice, and 0 otherwise.
    pub fn overstock_risk(&self) -> f64 {
        self.mean_risk(|day| {
            if day.on_hand > 3.0 * day.demand {
                1.0
            } else if day.on_hand > 2.0 * day.demand {
                0.5
            } else {
                0.0
            }
        })
    }

    fn mean_risk(&self, score: impl Fn(&InventoryDay) -> f64) -> f64 {
        if self.trajectory.is_empty() {
            return 0.0;
        }
        self.trajectory.iter().map(&score).sum::<f64>() / self.trajectory.len() as f64
    }

    /// Adjustments suggested by the simulated stock levels.
    pub fn recommendations(&self) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();
        if self.shortage_risk() > HIGH_RISK_THRESHOLD {
            recommendations.push(Recommendation {
                severity: Severity::Critical,
                title: "High stockout risk".to_string(),
                action: "Increase safety stock by 20% and review supplier lead times"
                    .to_string(),
            });
        }
        if self.overstock_risk() > HIGH_RISK_THRESHOLD {
            recommendations.push(Recommendation {
                severity: Severity::Warning,
                title: "High overstock risk".to_string(),
                action: "Reduce the order quantity by 15% to cut carrying cost".to_string(),
            });
        }
        recommendations
    }
}

/// Derive an inventory policy from a forecast.
///
/// Safety stock covers demand variability over the replenishment lead time
/// at the requested service level: `z * sigma * sqrt(lead_time)`. The
/// reorder point adds expected lead-time demand, and the order quantity is
/// the economic order quantity for the forecast annual demand. The policy is
/// then simulated over the forecast horizon, ordering whenever the inventory
/// position falls to the reorder point, to estimate the realized stockout
/// frequency.
pub fn optimize_inventory(
    forecast: &ForecastResult,
    lead_time_days: u32,
    service_level: f64,
    costs: &CostParams,
    current_inventory: f64,
) -> Result<InventoryPolicy> {
    if !(service_level > 0.0 && service_level < 1.0) {
        return Err(DemandError::Configuration(format!(
            "service level {service_level} must be in (0, 1)"
        )));
    }
    if !current_inventory.is_finite() || current_inventory < 0.0 {
        return Err(DemandError::Configuration(format!(
            "current inventory {current_inventory} must be non-negative and finite"
        )));
    }
    costs.validate()?;

    let daily_demand = forecast.mean_daily();
    let implied = forecast.implied_daily_std();
    let demand_std = if implied.is_finite() {
        implied
    } else {
        // Interval-free forecast: fall back to the point spread.
        let fallback = std_dev(forecast.point());
        if fallback.is_finite() {
            fallback
        } else {
            0.0
        }
    };

    let z = normal_quantile(service_level);
    let lead_time = lead_time_days as f64;
    let safety_stock = (z * demand_std * lead_time.sqrt()).max(0.0);
    let reorder_point = daily_demand * lead_time + safety_stock;

    let annual_demand = daily_demand * DAYS_PER_YEAR;
    let order_quantity = if annual_demand > 0.0 {
        (2.0 * annual_demand * costs.ordering_cost / costs.holding_rate).sqrt()
    } else {
        0.0
    };

    let (trajectory, stockout_probability) = simulate(
        forecast,
        current_inventory,
        reorder_point,
        order_quantity,
        lead_time_days,
    );

    let days_of_supply = if daily_demand > 0.0 {
        Some(current_inventory / daily_demand)
    } else {
        None
    };

    Ok(InventoryPolicy {
        daily_demand,
        demand_std,
        safety_stock,
        reorder_point,
        order_quantity,
        service_level,
        lead_time_days,
        stockout_probability,
        days_of_supply,
        trajectory,
    })
}

/// Day-by-day replenishment simulation over the forecast horizon.
///
/// Orders are placed when the inventory position (on hand plus on order)
/// falls to the reorder point, and arrive after the lead time. Unmet demand
/// is lost, not backordered.
fn simulate(
    forecast: &ForecastResult,
    starting_inventory: f64,
    reorder_point: f64,
    order_quantity: f64,
    lead_time_days: u32,
) -> (Vec<InventoryDay>, f64) {
    let horizon = forecast.horizon();
    let mut on_hand = starting_inventory;
    let mut pending: Vec<(usize, f64)> = Vec::new();
    let mut trajectory = Vec::with_capacity(horizon);
    let mut stockout_days = 0usize;

    for (day, (&date, &demand)) in forecast
        .dates()
        .iter()
        .zip(forecast.point())
        .enumerate()
    {
        let mut received = 0.0;
        pending.retain(|&(arrival, quantity)| {
            if arrival == day {
                received += quantity;
                false
            } else {
                true
            }
        });
        on_hand += received;

        let satisfied = demand.min(on_hand);
        let stockout = demand - satisfied > 1e-9;
        on_hand -= satisfied;
        if stockout {
            stockout_days += 1;
        }

        let on_order: f64 = pending.iter().map(|&(_, q)| q).sum();
        let mut ordered = 0.0;
        if order_quantity > 0.0 && on_hand + on_order <= reorder_point {
            ordered = order_quantity;
            if lead_time_days == 0 {
                // Instant replenishment: stock is usable the same day.
                on_hand += ordered;
            } else {
                pending.push((day + lead_time_days as usize, ordered));
            }
        }

        let on_order_end: f64 = pending.iter().map(|&(_, q)| q).sum();
        trajectory.push(InventoryDay {
            date,
            demand,
            received,
            on_hand,
            on_order: on_order_end,
            ordered,
            stockout,
        });
    }

    let probability = if horizon > 0 {
        stockout_days as f64 / horizon as f64
    } else {
        0.0
    };
    (trajectory, probability)
}
