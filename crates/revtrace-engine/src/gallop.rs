use crate::context::SearchContext;
use crate::error::Result;
use crate::oracle::Oracle;
use revtrace_types::Baseline;
use tracing::debug;

/// Find an offset past `baseline` whose identity differs from it, stepping
/// with doubling strides (1, 3, 7, 15, ...).
///
/// When this returns `d` after a final step `s`, the identity at `d - s`
/// still matched the baseline, so the boundary lies in `(d - s, d]`.
pub fn find_upper_bound<O: Oracle>(ctx: &mut SearchContext<O>, baseline: &Baseline) -> Result<u64> {
    let mut offset = 0;
    let mut step = 1;
    loop {
        offset += step;
        let reading = ctx.read(baseline, offset)?;
        if !baseline.matches(&reading.identity) {
            debug!(offset, step, "Found upper bound");
            return Ok(offset);
        }
        step *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::AbortSignal;
    use crate::context::tests::TableOracle;
    use revtrace_types::Transition;

    fn baseline_at(depth: u64, identity: &str) -> Baseline {
        Baseline::from(Transition {
            version: format!("v-{}", identity),
            identity: identity.to_string(),
            date: String::new(),
            revision: format!("rev-{}", depth),
            depth,
        })
    }

    #[test]
    fn test_doubling_steps() {
        // offsets 1..=8 from depth 0: A A A A A A B B
        let oracle = TableOracle::from_identities(&["A", "A", "A", "A", "A", "A", "A", "B", "B"]);
        let mut ctx = SearchContext::new(oracle, AbortSignal::new(), "start");

        let bound = find_upper_bound(&mut ctx, &baseline_at(0, "A")).unwrap();
        assert_eq!(bound, 7);
        assert_eq!(ctx.oracle().checkouts, vec![1, 3, 7]);
    }

    #[test]
    fn test_immediate_change() {
        let oracle = TableOracle::from_identities(&["A", "B"]);
        let mut ctx = SearchContext::new(oracle, AbortSignal::new(), "start");

        let bound = find_upper_bound(&mut ctx, &baseline_at(0, "A")).unwrap();
        assert_eq!(bound, 1);
    }

    #[test]
    fn test_seed_differs_on_first_step() {
        let oracle = TableOracle::from_identities(&["A", "A"]);
        let mut ctx = SearchContext::new(oracle, AbortSignal::new(), "start");

        let bound = find_upper_bound(&mut ctx, &Baseline::seed("start", 0)).unwrap();
        assert_eq!(bound, 1);
        assert_eq!(ctx.oracle().checkouts, vec![0]);
    }

    #[test]
    fn test_running_off_history_is_fatal() {
        let oracle = TableOracle::from_identities(&["A", "A", "A"]);
        let mut ctx = SearchContext::new(oracle, AbortSignal::new(), "start");

        let err = find_upper_bound(&mut ctx, &baseline_at(0, "A")).unwrap_err();
        assert!(!err.is_cancelled());
        assert_eq!(ctx.oracle().checkouts, vec![1, 3]);
    }
}
