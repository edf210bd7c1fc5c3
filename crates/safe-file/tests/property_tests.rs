use proptest::prelude::*;
use safe_file::{IoBudget, NormalizeFlags, normalize};
use std::time::Duration;

proptest! {
    #[test]
    fn normalized_paths_are_forward_slash_absolute(s in "\\PC*") {
        if let Ok(path) = normalize(&s, NormalizeFlags::default()) {
            let as_str = path.as_str();
            prop_assert!(!as_str.contains('\\'));
            // Either Unix-rooted or drive-rooted; nothing relative survives
            // normalization with the default flags.
            let drive_rooted = as_str.len() >= 2
                && as_str.as_bytes()[0].is_ascii_alphabetic()
                && as_str.as_bytes()[1] == b':';
            prop_assert!(as_str.starts_with('/') || drive_rooted);
        }
    }

    #[test]
    fn normalization_is_idempotent(s in "/[a-zA-Z0-9/._-]{0,40}") {
        if let Ok(path) = normalize(&s, NormalizeFlags::default()) {
            let again = normalize(path.as_str(), NormalizeFlags::default());
            prop_assert!(again.is_ok());
            let again = again.unwrap();
            prop_assert_eq!(path.as_str(), again.as_str());
        }
    }

    #[test]
    fn normalized_paths_contain_no_dot_components(s in "/[a-z./]{0,30}") {
        if let Ok(path) = normalize(&s, NormalizeFlags::default()) {
            for component in path.as_str().split('/') {
                prop_assert_ne!(component, ".");
                prop_assert_ne!(component, "..");
            }
        }
    }

    #[test]
    fn io_budgets_are_sane_for_all_sizes(size in 0u64..=(1 << 34)) {
        let budget = IoBudget::for_size(size);
        prop_assert!(budget.buffer_size >= 4096);
        prop_assert_eq!(budget.buffer_size % 4096, 0);
        // log2 bucketing keeps buffers far below the payload scale.
        prop_assert!(budget.buffer_size <= 36 * 4096);
        prop_assert!(budget.timeout >= Duration::from_secs(2));
    }

    #[test]
    fn larger_estimates_never_shrink_the_budget(a in 1u64..=(1 << 30), b in 1u64..=(1 << 30)) {
        let (small, large) = if a <= b { (a, b) } else { (b, a) };
        let small_budget = IoBudget::for_size(small);
        let large_budget = IoBudget::for_size(large);
        prop_assert!(large_budget.buffer_size >= small_budget.buffer_size);
        prop_assert!(large_budget.timeout >= small_budget.timeout);
    }
}
