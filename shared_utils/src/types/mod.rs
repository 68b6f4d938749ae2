//! Type-Safe Wrappers Module
//!
//! ## 模块列表
//! - `file_size`: 文件大小类型安全包装
//! - `iteration`: 迭代次数守卫

pub mod file_size;
pub mod iteration;

pub use file_size::FileSize;
pub use iteration::{IterationError, IterationGuard, DEFAULT_MAX_ATTEMPTS, EMERGENCY_MAX_ATTEMPTS};

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn file_size_saturating_sub_property(a in 0u64..u64::MAX/2, b in 0u64..u64::MAX/2) {
            let result = FileSize::new(a).saturating_sub(FileSize::new(b));
            if b > a {
                prop_assert_eq!(result.bytes(), 0);
            } else {
                prop_assert_eq!(result.bytes(), a - b);
            }
        }

        #[test]
        fn file_size_ratio_matches_ceiling_comparison(
            produced in 0u64..1_000_000_000,
            ceiling in 1u64..1_000_000_000,
        ) {
            let ratio = FileSize::new(produced).ratio_to(FileSize::new(ceiling)).unwrap();
            prop_assert!(ratio >= 0.0);
            prop_assert_eq!(ratio <= 1.0, produced <= ceiling);
        }

        #[test]
        fn iteration_guard_termination_property(max in 1u32..100) {
            let mut guard = IterationGuard::new(max, "test");
            for i in 1..=max {
                prop_assert!(guard.increment().is_ok(), "Iteration {} of {} should succeed", i, max);
            }
            prop_assert!(guard.increment().is_err());
        }
    }
}
