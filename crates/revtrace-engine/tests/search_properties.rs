//! Properties of gallop + bisect over generated linear histories.

use proptest::prelude::*;
use revtrace_engine::{
    AbortSignal, Baseline, ChangeFinder, RunOutcome, SearchContext, Transition, find_changes,
    find_upper_bound, locate_boundary,
};
use revtrace_testing::ScriptedOracle;

/// One run of commits sharing an identity.
#[derive(Debug, Clone)]
struct Segment {
    len: usize,
    /// Same version as the previous segment (a rebuild)
    rebuild: bool,
}

#[derive(Debug, Clone)]
struct History {
    readings: Vec<(String, String)>,
    starts: Vec<usize>,
    versions: Vec<String>,
}

impl History {
    fn build(segments: &[Segment]) -> Self {
        let longest = segments.iter().map(|s| s.len).max().unwrap_or(1);
        let mut readings = Vec::new();
        let mut starts = Vec::new();
        let mut versions: Vec<String> = Vec::new();
        let mut version = 0;

        for (i, segment) in segments.iter().enumerate() {
            if i == 0 || !segment.rebuild {
                version += 1;
            }
            let v = format!("1.{}", version);
            starts.push(readings.len());
            versions.push(v.clone());

            // pad the last segment so probing never walks off the history
            let len = if i + 1 == segments.len() {
                segment.len + 2 * longest + 2
            } else {
                segment.len
            };
            for _ in 0..len {
                readings.push((v.clone(), format!("drv-{}", i)));
            }
        }
        Self {
            readings,
            starts,
            versions,
        }
    }

    fn oracle(&self) -> ScriptedOracle {
        ScriptedOracle::new(self.readings.clone())
    }

    fn identity(&self, depth: u64) -> &str {
        &self.readings[depth as usize].1
    }

    fn baseline_at_segment(&self, index: usize) -> Baseline {
        let depth = self.starts[index];
        let (version, identity) = self.readings[depth].clone();
        Baseline::from(Transition {
            version,
            identity,
            date: String::new(),
            revision: ScriptedOracle::revision_at(depth as u64),
            depth: depth as u64,
        })
    }

    /// Number of segments whose version differs from the one before
    fn distinct_versions(&self) -> usize {
        let mut count = 0;
        let mut previous: Option<&String> = None;
        for version in &self.versions {
            if previous != Some(version) {
                count += 1;
            }
            previous = Some(version);
        }
        count
    }
}

fn segments() -> impl Strategy<Value = Vec<Segment>> {
    prop::collection::vec(
        (1usize..40, any::<bool>()).prop_map(|(len, rebuild)| Segment { len, rebuild }),
        2..8,
    )
}

fn run_all(history: &History) -> (RunOutcome, Vec<Transition>, Vec<u64>) {
    let ctx = SearchContext::new(history.oracle(), AbortSignal::new(), "start");
    let mut finder = ChangeFinder::new(ctx, 0);
    let mut found = Vec::new();
    let outcome = finder
        .run(history.distinct_versions(), &mut found)
        .expect("search over generated history");
    let depths = finder.into_context().into_oracle().checked_out_depths();
    (outcome, found, depths)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_gallop_brackets_boundary(segments in segments()) {
        let history = History::build(&segments);
        let baseline = history.baseline_at_segment(0);
        let mut ctx = SearchContext::new(history.oracle(), AbortSignal::new(), "start");

        let bound = find_upper_bound(&mut ctx, &baseline).unwrap();
        // steps land on 1, 3, 7, ..., so the final step is (bound + 1) / 2
        let step = bound.div_ceil(2);

        prop_assert!(!baseline.matches(history.identity(bound)));
        prop_assert!(baseline.matches(history.identity(bound - step)));
    }

    #[test]
    fn prop_bisect_finds_leftmost_change(segments in segments(), extra in 0usize..64) {
        let history = History::build(&segments);
        let baseline = history.baseline_at_segment(0);
        let boundary = history.starts[1] as u64;
        let last = history.readings.len() as u64 - 1;
        let upper_bound = (boundary + extra as u64).min(last);
        let mut ctx = SearchContext::new(history.oracle(), AbortSignal::new(), "start");

        let transition = locate_boundary(&mut ctx, &baseline, upper_bound).unwrap();

        prop_assert_eq!(transition.depth, boundary);
        prop_assert_eq!(transition.identity.as_str(), history.identity(boundary));
        prop_assert_eq!(transition.revision, ScriptedOracle::revision_at(boundary));
    }

    #[test]
    fn prop_run_records_every_segment_in_depth_order(segments in segments()) {
        let history = History::build(&segments);
        let (outcome, found, _) = run_all(&history);

        let depths: Vec<u64> = found.iter().map(|t| t.depth).collect();
        prop_assert!(depths.windows(2).all(|w| w[0] < w[1]));

        let expected: Vec<u64> = history
            .starts
            .iter()
            .take(found.len())
            .map(|s| *s as u64)
            .collect();
        prop_assert_eq!(depths, expected);
        prop_assert_eq!(outcome.summary().versions, history.distinct_versions());
        prop_assert_eq!(outcome.summary().transitions, found.len());
    }

    #[test]
    fn prop_rebuilds_never_count(segments in segments()) {
        let history = History::build(&segments);
        let (_, found, _) = run_all(&history);

        let mut counted = 0;
        let mut previous: Option<&str> = None;
        for transition in &found {
            if previous != Some(transition.version.as_str()) {
                counted += 1;
            }
            previous = Some(transition.version.as_str());
        }
        prop_assert_eq!(counted, history.distinct_versions());
    }

    #[test]
    fn prop_search_is_deterministic(segments in segments()) {
        let history = History::build(&segments);
        let (first_outcome, first_found, first_calls) = run_all(&history);
        let (second_outcome, second_found, second_calls) = run_all(&history);

        prop_assert_eq!(first_outcome, second_outcome);
        prop_assert_eq!(first_found, second_found);
        prop_assert_eq!(first_calls, second_calls);
    }
}

#[test]
fn test_gallop_then_bisect_walkthrough() {
    // baseline "A" at depth 0, offsets 1..=8 read A A A A A A B B
    let mut readings = vec![("1.0", "A"); 7];
    readings.extend([("1.1", "B"), ("1.1", "B")]);
    let oracle = ScriptedOracle::new(readings);
    let mut ctx = SearchContext::new(oracle, AbortSignal::new(), "start");
    let baseline = Baseline::from(Transition {
        version: "1.0".to_string(),
        identity: "A".to_string(),
        date: String::new(),
        revision: ScriptedOracle::revision_at(0),
        depth: 0,
    });

    let bound = find_upper_bound(&mut ctx, &baseline).unwrap();
    assert_eq!(bound, 7);
    let transition = locate_boundary(&mut ctx, &baseline, bound).unwrap();
    assert_eq!(transition.depth, 7);
    assert_eq!(transition.identity, "B");
    assert_eq!(transition.version, "1.1");
    assert!(baseline.is_new_version(&transition.version));

    let oracle = ctx.into_oracle();
    assert_eq!(oracle.checked_out_depths(), vec![1, 3, 7, 4, 6, 7]);
}

#[test]
fn test_start_depth_shifts_the_seed() {
    let oracle = ScriptedOracle::from_identities(&["a", "a", "b", "b", "c", "c", "c", "c"]);
    let ctx = SearchContext::new(oracle, AbortSignal::new(), "start");
    let mut finder = ChangeFinder::new(ctx, 3);
    let mut found = Vec::new();

    finder.run(2, &mut found).unwrap();
    let depths: Vec<u64> = found.iter().map(|t| t.depth).collect();
    assert_eq!(depths, vec![3, 4]);
    assert_eq!(found[0].identity, "b");
    assert_eq!(found[1].identity, "c");
}

#[test]
fn test_cancelled_run_is_a_prefix_of_full_run() {
    let identities = ["a", "a", "b", "c", "c", "c", "d", "d", "d", "d", "d", "d", "d", "d"];

    let ctx = SearchContext::new(
        ScriptedOracle::from_identities(&identities),
        AbortSignal::new(),
        "start",
    );
    let mut full = Vec::new();
    find_changes(ctx, 0, 4, &mut full).unwrap();
    assert_eq!(full.len(), 4);

    let abort = AbortSignal::new();
    let oracle = ScriptedOracle::from_identities(&identities).abort_after(5, abort.clone());
    let ctx = SearchContext::new(oracle, abort, "start");
    let mut partial = Vec::new();
    let outcome = ChangeFinder::new(ctx, 0).run(4, &mut partial).unwrap();

    assert!(outcome.is_cancelled());
    assert!(partial.len() < full.len());
    assert_eq!(partial[..], full[..partial.len()]);
}

#[test]
fn test_failure_leaves_earlier_transitions_recorded() {
    let oracle = ScriptedOracle::from_identities(&["a", "b", "b", "b", "c", "c", "c", "c", "c"])
        .fail_checkout_at(3);
    let ctx = SearchContext::new(oracle, AbortSignal::new(), "start");
    let mut found = Vec::new();

    let err = ChangeFinder::new(ctx, 0).run(3, &mut found).unwrap_err();
    assert!(err.to_string().contains("start~3"));
    assert_eq!(
        found.iter().map(|t| t.depth).collect::<Vec<_>>(),
        vec![0, 1]
    );
}
