//! Tiered adjustment policy.
//!
//! An ordered table of `(predicate, adjustment)` rules keyed on the overshoot
//! ratio (produced size / ceiling). The first rule whose predicate holds is
//! applied. Every adjustment only ever lowers parameters and never crosses
//! the configured minimums.

use crate::params::{EncodeParameters, FitConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentTier {
    Severe,
    Moderate,
    Fine,
}

impl fmt::Display for AdjustmentTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdjustmentTier::Severe => "severe",
            AdjustmentTier::Moderate => "moderate",
            AdjustmentTier::Fine => "fine",
        })
    }
}

pub struct AdjustmentRule {
    pub tier: AdjustmentTier,
    pub applies: fn(f64, &FitConfig) -> bool,
    pub adjust: fn(EncodeParameters, &FitConfig) -> EncodeParameters,
}

/// Evaluated top to bottom.
pub static ADJUSTMENT_RULES: [AdjustmentRule; 3] = [
    AdjustmentRule {
        tier: AdjustmentTier::Severe,
        applies: is_severe,
        adjust: adjust_severe,
    },
    AdjustmentRule {
        tier: AdjustmentTier::Moderate,
        applies: is_moderate,
        adjust: adjust_moderate,
    },
    AdjustmentRule {
        tier: AdjustmentTier::Fine,
        applies: is_fine,
        adjust: adjust_fine,
    },
];

fn is_severe(ratio: f64, config: &FitConfig) -> bool {
    ratio > config.severe_ratio
}

fn is_moderate(ratio: f64, config: &FitConfig) -> bool {
    ratio > config.moderate_ratio && ratio <= config.severe_ratio
}

fn is_fine(ratio: f64, config: &FitConfig) -> bool {
    ratio <= config.moderate_ratio
}

/// Scales `width` by `factor`, truncating, but never below `floor`. A width
/// already at or below the floor is left alone.
pub fn shrink_width(width: u32, factor: f64, floor: u32) -> u32 {
    if width <= floor {
        return width;
    }
    ((width as f64 * factor) as u32).max(floor)
}

/// Lowers `rate` by `step`, never below `floor`. A rate already at or below
/// the floor is left alone.
pub fn lower_rate(rate: u32, step: u32, floor: u32) -> u32 {
    if rate <= floor {
        return rate;
    }
    rate.saturating_sub(step).max(floor)
}

fn adjust_severe(p: EncodeParameters, c: &FitConfig) -> EncodeParameters {
    EncodeParameters {
        sample_rate: lower_rate(p.sample_rate, c.severe_rate_step, c.min_sample_rate),
        target_width: shrink_width(p.target_width, c.severe_width_factor, c.min_width),
        quality: p.quality.step_down(),
    }
}

fn adjust_moderate(p: EncodeParameters, c: &FitConfig) -> EncodeParameters {
    EncodeParameters {
        sample_rate: lower_rate(p.sample_rate, c.moderate_rate_step, c.min_sample_rate),
        target_width: shrink_width(p.target_width, c.moderate_width_factor, c.min_width),
        quality: p.quality,
    }
}

/// Smallest single step: palette, then sample rate, then width.
fn adjust_fine(p: EncodeParameters, c: &FitConfig) -> EncodeParameters {
    if !p.quality.is_lowest() {
        EncodeParameters {
            quality: p.quality.step_down(),
            ..p
        }
    } else if p.sample_rate > c.min_sample_rate {
        EncodeParameters {
            sample_rate: lower_rate(p.sample_rate, c.fine_rate_step, c.min_sample_rate),
            ..p
        }
    } else {
        EncodeParameters {
            target_width: shrink_width(p.target_width, c.fine_width_factor, c.min_width),
            ..p
        }
    }
}

pub fn select_rule(overshoot_ratio: f64, config: &FitConfig) -> &'static AdjustmentRule {
    ADJUSTMENT_RULES
        .iter()
        .find(|rule| (rule.applies)(overshoot_ratio, config))
        .unwrap_or(&ADJUSTMENT_RULES[2])
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub tier: AdjustmentTier,
    pub next: EncodeParameters,
    /// The selected tier could not move any parameter (width and rate
    /// already at their minimums), so the fine-tier step was used instead.
    pub fell_back_to_fine: bool,
}

impl Adjustment {
    pub fn changed(&self, from: &EncodeParameters) -> bool {
        self.next != *from
    }

    /// The tier whose step produced `next`.
    pub fn applied_tier(&self) -> AdjustmentTier {
        if self.fell_back_to_fine {
            AdjustmentTier::Fine
        } else {
            self.tier
        }
    }
}

/// Picks the tier for `overshoot_ratio` and computes the next parameters.
pub fn plan_adjustment(
    current: EncodeParameters,
    overshoot_ratio: f64,
    config: &FitConfig,
) -> Adjustment {
    let rule = select_rule(overshoot_ratio, config);
    let next = (rule.adjust)(current, config);

    if next == current && rule.tier != AdjustmentTier::Fine {
        return Adjustment {
            tier: rule.tier,
            next: adjust_fine(current, config),
            fell_back_to_fine: true,
        };
    }

    Adjustment {
        tier: rule.tier,
        next,
        fell_back_to_fine: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::QualityTier;
    use proptest::prelude::*;

    fn params(rate: u32, width: u32, quality: QualityTier) -> EncodeParameters {
        EncodeParameters::new(rate, width, quality)
    }

    #[test]
    fn test_rule_table_order() {
        let tiers: Vec<_> = ADJUSTMENT_RULES.iter().map(|r| r.tier).collect();
        assert_eq!(
            tiers,
            vec![
                AdjustmentTier::Severe,
                AdjustmentTier::Moderate,
                AdjustmentTier::Fine
            ]
        );
    }

    #[test]
    fn test_select_rule_boundaries() {
        let config = FitConfig::default();
        assert_eq!(select_rule(2.5, &config).tier, AdjustmentTier::Severe);
        assert_eq!(select_rule(2.0, &config).tier, AdjustmentTier::Moderate);
        assert_eq!(select_rule(1.51, &config).tier, AdjustmentTier::Moderate);
        assert_eq!(select_rule(1.5, &config).tier, AdjustmentTier::Fine);
        assert_eq!(select_rule(1.01, &config).tier, AdjustmentTier::Fine);
        assert_eq!(select_rule(f64::NAN, &config).tier, AdjustmentTier::Fine);
    }

    #[test]
    fn test_severe_scenario() {
        // 25 MB against a 10 MB ceiling.
        let config = FitConfig::default();
        let adj = plan_adjustment(params(10, 480, QualityTier::Medium), 2.5, &config);
        assert_eq!(adj.tier, AdjustmentTier::Severe);
        assert_eq!(adj.next, params(8, 288, QualityTier::Low));
        assert!(!adj.fell_back_to_fine);
    }

    #[test]
    fn test_moderate_keeps_quality() {
        let config = FitConfig::default();
        let adj = plan_adjustment(params(10, 480, QualityTier::High), 1.8, &config);
        assert_eq!(adj.tier, AdjustmentTier::Moderate);
        assert_eq!(adj.next, params(9, 360, QualityTier::High));
    }

    #[test]
    fn test_fine_scenario_steps_quality_only() {
        // 13 MB against a 10 MB ceiling.
        let config = FitConfig::default();
        let adj = plan_adjustment(params(10, 480, QualityTier::Medium), 1.3, &config);
        assert_eq!(adj.tier, AdjustmentTier::Fine);
        assert_eq!(adj.next, params(10, 480, QualityTier::Low));
    }

    #[test]
    fn test_fine_precedence_rate_then_width() {
        let config = FitConfig::default();
        let adj = plan_adjustment(params(10, 480, QualityTier::Low), 1.2, &config);
        assert_eq!(adj.next, params(8, 480, QualityTier::Low));

        let adj = plan_adjustment(params(6, 480, QualityTier::Low), 1.2, &config);
        assert_eq!(adj.next, params(5, 480, QualityTier::Low));

        let adj = plan_adjustment(params(5, 480, QualityTier::Low), 1.2, &config);
        assert_eq!(adj.next, params(5, 384, QualityTier::Low));
    }

    #[test]
    fn test_floors_clamp() {
        let config = FitConfig::default();
        let adj = plan_adjustment(params(6, 200, QualityTier::Low), 3.0, &config);
        assert_eq!(adj.next, params(5, 160, QualityTier::Low));
    }

    #[test]
    fn test_floor_is_fixed_point() {
        let config = FitConfig::default();
        let floor = config.floor();
        for ratio in [1.1, 1.8, 5.0] {
            let adj = plan_adjustment(floor, ratio, &config);
            assert!(!adj.changed(&floor));
        }
    }

    #[test]
    fn test_moderate_at_min_geometry_falls_back_to_fine() {
        let config = FitConfig::default();
        let adj = plan_adjustment(params(5, 160, QualityTier::High), 1.8, &config);
        assert_eq!(adj.tier, AdjustmentTier::Moderate);
        assert!(adj.fell_back_to_fine);
        assert_eq!(adj.applied_tier(), AdjustmentTier::Fine);
        assert_eq!(adj.next, params(5, 160, QualityTier::Medium));
    }

    #[test]
    fn test_below_floor_is_never_raised() {
        let config = FitConfig::default();
        let start = params(3, 100, QualityTier::High);
        let adj = plan_adjustment(start, 4.0, &config);
        assert_eq!(adj.next, params(3, 100, QualityTier::Medium));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(shrink_width(480, 0.6, 160), 288);
        assert_eq!(shrink_width(200, 0.6, 160), 160);
        assert_eq!(shrink_width(120, 0.6, 160), 120);
        assert_eq!(lower_rate(10, 2, 5), 8);
        assert_eq!(lower_rate(6, 2, 5), 5);
        assert_eq!(lower_rate(1, 2, 5), 1);
    }

    fn quality_strategy() -> impl Strategy<Value = QualityTier> {
        prop_oneof![
            Just(QualityTier::Low),
            Just(QualityTier::Medium),
            Just(QualityTier::High)
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn adjustment_never_increases(
            rate in 1u32..120,
            width in 1u32..4096,
            quality in quality_strategy(),
            ratio in 1.0001f64..20.0,
        ) {
            let config = FitConfig::default();
            let current = params(rate, width, quality);
            let adj = plan_adjustment(current, ratio, &config);
            prop_assert!(adj.next.never_exceeds(&current));
        }

        #[test]
        fn adjustment_respects_floors(
            rate in 1u32..120,
            width in 1u32..4096,
            quality in quality_strategy(),
            ratio in 1.0001f64..20.0,
        ) {
            let config = FitConfig::default();
            let current = params(rate, width, quality);
            let next = plan_adjustment(current, ratio, &config).next;
            prop_assert!(next.target_width >= config.min_width.min(width));
            prop_assert!(next.sample_rate >= config.min_sample_rate.min(rate));
        }

        #[test]
        fn adjustment_progresses_until_floor(
            rate in 1u32..120,
            width in 1u32..4096,
            quality in quality_strategy(),
            ratio in 1.0001f64..20.0,
        ) {
            let config = FitConfig::default();
            let current = params(rate, width, quality);
            let adj = plan_adjustment(current, ratio, &config);
            prop_assert_eq!(adj.changed(&current), !current.is_floor(&config));
        }
    }
}
