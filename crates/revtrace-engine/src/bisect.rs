use crate::context::SearchContext;
use crate::error::{Error, Result};
use crate::oracle::Oracle;
use revtrace_types::{Baseline, Transition};

/// Binary search `[0, upper_bound]` for the smallest offset whose identity
/// differs from `baseline`, and describe that commit.
///
/// Expects the identity at offset 0 to match the baseline and the identity
/// at `upper_bound` to differ. The midpoint rounds up so `hi` keeps
/// shrinking until `lo + 1 == hi`, at which point `mid == hi` is the answer.
pub fn locate_boundary<O: Oracle>(
    ctx: &mut SearchContext<O>,
    baseline: &Baseline,
    upper_bound: u64,
) -> Result<Transition> {
    if upper_bound == 0 {
        return Err(Error::InvariantViolation(
            "upper bound must be at least one commit past the baseline".to_string(),
        ));
    }

    let mut lo = 0;
    let mut hi = upper_bound;
    loop {
        let mid = lo + (hi - lo).div_ceil(2);
        let reading = ctx.read(baseline, mid)?;
        let differs = !baseline.matches(&reading.identity);

        if mid == hi {
            if !differs {
                return Err(Error::InvariantViolation(format!(
                    "identity at offset {} matches the baseline at depth {}",
                    mid, baseline.depth
                )));
            }
            let (date, revision) = ctx.describe_checkout()?;
            let depth = baseline.depth_at(mid).ok_or_else(|| {
                Error::InvariantViolation(format!("offset {} has no valid depth", mid))
            })?;
            return Ok(Transition {
                version: reading.version,
                identity: reading.identity,
                date,
                revision,
                depth,
            });
        }

        if differs {
            hi = mid;
        } else {
            lo = mid;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::AbortSignal;
    use crate::context::tests::TableOracle;

    fn baseline_at_zero(identity: &str) -> Baseline {
        Baseline::from(Transition {
            version: format!("v-{}", identity),
            identity: identity.to_string(),
            date: String::new(),
            revision: "rev-0".to_string(),
            depth: 0,
        })
    }

    #[test]
    fn test_converges_on_leftmost_change() {
        let oracle = TableOracle::from_identities(&["A", "A", "A", "A", "A", "A", "A", "B", "B"]);
        let mut ctx = SearchContext::new(oracle, AbortSignal::new(), "start");

        let transition = locate_boundary(&mut ctx, &baseline_at_zero("A"), 7).unwrap();
        assert_eq!(transition.depth, 7);
        assert_eq!(transition.identity, "B");
        assert_eq!(transition.version, "v-B");
        assert_eq!(transition.revision, "rev-7");
        assert_eq!(ctx.oracle().checkouts, vec![4, 6, 7]);
    }

    #[test]
    fn test_boundary_before_upper_bound() {
        let oracle = TableOracle::from_identities(&["A", "A", "B", "B", "C", "C", "C", "C"]);
        let mut ctx = SearchContext::new(oracle, AbortSignal::new(), "start");

        let transition = locate_boundary(&mut ctx, &baseline_at_zero("A"), 7).unwrap();
        assert_eq!(transition.depth, 2);
        assert_eq!(transition.identity, "B");
    }

    #[test]
    fn test_window_of_one() {
        let oracle = TableOracle::from_identities(&["A", "B"]);
        let mut ctx = SearchContext::new(oracle, AbortSignal::new(), "start");

        let transition = locate_boundary(&mut ctx, &baseline_at_zero("A"), 1).unwrap();
        assert_eq!(transition.depth, 1);
        assert_eq!(ctx.oracle().checkouts, vec![1]);
    }

    #[test]
    fn test_zero_upper_bound_is_rejected() {
        let oracle = TableOracle::from_identities(&["A"]);
        let mut ctx = SearchContext::new(oracle, AbortSignal::new(), "start");

        let err = locate_boundary(&mut ctx, &baseline_at_zero("A"), 0).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn test_upper_bound_that_matches_is_rejected() {
        let oracle = TableOracle::from_identities(&["A", "A", "A"]);
        let mut ctx = SearchContext::new(oracle, AbortSignal::new(), "start");

        let err = locate_boundary(&mut ctx, &baseline_at_zero("A"), 2).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }
}
