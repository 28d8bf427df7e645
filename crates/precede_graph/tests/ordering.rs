//! Ordering tests: chains built through the registration API run their
//! groups in exactly the order the builder calls describe.
//!
//! Entries of one group run concurrently, so assertions compare tiers
//! (sets of names) rather than a single total order.


use precede_call::{Signature, args};
use precede_graph::{Chain, ChainError, ChainExecutor, GroupId};
use test_utils::{Recorder, assert_before, mark};

/// Builds the reference chain:
///
/// ```text
/// first | evenmore, same-as-evenmore | after-evenmore | before | startup | last
/// ```
fn reference_chain() -> Result<Chain, ChainError> {
    let mut chain = Chain::typed(Signature::of::<(Recorder,)>());

    let startup = chain.register(mark("startup"))?;
    let before = chain.before_at(startup, mark("before"))?;
    chain.last_at(before, mark("last"))?;
    let evenmore = chain.before_at(before, mark("evenmore"))?;
    chain.after_at(evenmore, mark("after-evenmore"))?;
    chain.register_at(evenmore, mark("same-as-evenmore"))?;
    chain.first_at(evenmore, mark("first"))?;

    Ok(chain)
}

fn group_sizes(chain: &Chain) -> Vec<usize> {
    chain.groups().map(|group| group.len()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Reference chain
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn reference_chain_layout() {
    let chain = reference_chain().unwrap();

    assert_eq!(chain.len(), 6);
    assert_eq!(chain.entry_count(), 7);
    assert_eq!(group_sizes(&chain), vec![1, 2, 1, 1, 1, 1]);
    assert_eq!(chain.position(chain.origin()).unwrap(), 4);
}

#[tokio::test]
async fn reference_chain_runs_in_tier_order() {
    let chain = reference_chain().unwrap();
    let recorder = Recorder::new();

    let report = ChainExecutor::new()
        .run(&chain, args![recorder.clone()])
        .await;

    assert_eq!(report.invoked, 7);
    assert!(report.is_clean());

    let tiers: [&[&str]; 6] = [
        &["first"],
        &["evenmore", "same-as-evenmore"],
        &["after-evenmore"],
        &["before"],
        &["startup"],
        &["last"],
    ];
    for pair in tiers.windows(2) {
        assert_before(&recorder, pair[0], pair[1]);
    }
}

#[tokio::test]
async fn inserting_before_the_middle() {
    let mut chain = reference_chain().unwrap();
    let middle = chain.middle();
    assert_eq!(chain.position(middle).unwrap(), 3);

    chain.before_at(middle, mark("near-middle")).unwrap();
    assert_eq!(chain.len(), 7);

    let recorder = Recorder::new();
    ChainExecutor::new()
        .run(&chain, args![recorder.clone()])
        .await;

    assert_before(&recorder, &["after-evenmore"], &["near-middle"]);
    assert_before(&recorder, &["near-middle"], &["before"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Splicing rules
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_before_keeps_registration_order() {
    let mut chain = Chain::new();
    chain.register(mark("origin")).unwrap();
    chain.before(mark("b1")).unwrap();
    chain.before(mark("b2")).unwrap();
    chain.before(mark("b3")).unwrap();

    let recorder = Recorder::new();
    ChainExecutor::new()
        .run(&chain, args![recorder.clone()])
        .await;

    assert_eq!(recorder.entries(), vec!["b1", "b2", "b3", "origin"]);
}

#[tokio::test]
async fn repeated_after_and_first_reverse_registration_order() {
    let mut chain = Chain::new();
    chain.register(mark("origin")).unwrap();
    chain.after(mark("a1")).unwrap();
    chain.after(mark("a2")).unwrap();
    chain.first(mark("f1")).unwrap();
    chain.first(mark("f2")).unwrap();
    chain.last(mark("l1")).unwrap();
    chain.last(mark("l2")).unwrap();

    let recorder = Recorder::new();
    ChainExecutor::new()
        .run(&chain, args![recorder.clone()])
        .await;

    assert_eq!(
        recorder.entries(),
        vec!["f2", "f1", "origin", "a2", "a1", "l1", "l2"]
    );
}

#[test]
fn link_cursor_follows_each_new_group() {
    let mut chain = Chain::new();
    let evenmore = chain
        .origin_link()
        .register(mark("startup"))
        .and_then(|link| link.before(mark("before")))
        .and_then(|link| link.before(mark("evenmore")))
        .unwrap()
        .id();

    let after = chain
        .link(evenmore)
        .and_then(|link| link.after(mark("after-evenmore")))
        .unwrap()
        .id();

    let order: Vec<GroupId> = chain.groups().map(|group| group.id()).collect();
    assert_eq!(order.len(), 4);
    assert_eq!(order[0], evenmore);
    assert_eq!(order[1], after);
    assert_eq!(order[3], chain.origin());
}

#[test]
fn head_tail_and_middle_track_splices() {
    let mut chain = Chain::new();
    assert_eq!(chain.head(), chain.origin());
    assert_eq!(chain.tail(), chain.origin());
    assert_eq!(chain.middle(), chain.origin());

    let first = chain.first(|| {}).unwrap();
    let last = chain.last(|| {}).unwrap();

    assert_eq!(chain.head(), first);
    assert_eq!(chain.tail(), last);
    assert_eq!(chain.middle(), chain.origin());
}

#[test]
fn empty_chain_has_one_group() {
    let chain = Chain::new();
    assert_eq!(chain.len(), 1);
    assert!(chain.is_empty());
    assert_eq!(group_sizes(&chain), vec![0]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY TESTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Random builder sequences are checked against a plain `Vec` model of the
/// group order. Targets are arena indices taken modulo the current group
/// count, so every generated handle is valid.
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Register(usize),
        Before(usize),
        After(usize),
        First(usize),
        Last(usize),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<usize>().prop_map(Op::Register),
            any::<usize>().prop_map(Op::Before),
            any::<usize>().prop_map(Op::After),
            any::<usize>().prop_map(Op::First),
            any::<usize>().prop_map(Op::Last),
        ]
    }

    /// Group order and per-group entry counts, indexed by arena position.
    struct Model {
        order: Vec<usize>,
        sizes: Vec<usize>,
    }

    impl Model {
        fn new() -> Self {
            Self {
                order: vec![0],
                sizes: vec![0],
            }
        }

        fn spawn(&mut self, position: usize) -> usize {
            let id = self.sizes.len();
            self.order.insert(position, id);
            self.sizes.push(1);
            id
        }

        fn apply(&mut self, op: Op) -> usize {
            let count = self.sizes.len();
            let pos = |model: &Self, target: usize| {
                model
                    .order
                    .iter()
                    .position(|id| *id == target % count)
                    .unwrap()
            };
            match op {
                Op::Register(t) => {
                    self.sizes[t % count] += 1;
                    t % count
                }
                Op::Before(t) => {
                    let at = pos(self, t);
                    self.spawn(at)
                }
                Op::After(t) => {
                    let at = pos(self, t) + 1;
                    self.spawn(at)
                }
                Op::First(_) => self.spawn(0),
                Op::Last(_) => {
                    let end = self.order.len();
                    self.spawn(end)
                }
            }
        }
    }

    /// Applies `op` to `chain`; the registered entry records the ID of the
    /// group it landed in.
    fn apply(chain: &mut Chain, op: Op) -> GroupId {
        let count = chain.len();
        let target = |t: usize| GroupId::new(t % count);
        let entry = |id: usize| move |recorder: &Recorder| recorder.push(id.to_string());
        let next = count;

        match op {
            Op::Register(t) => chain.register_at(target(t), entry(t % count)),
            Op::Before(t) => chain.before_at(target(t), entry(next)),
            Op::After(t) => chain.after_at(target(t), entry(next)),
            Op::First(t) => chain.first_at(target(t), entry(next)),
            Op::Last(t) => chain.last_at(target(t), entry(next)),
        }
        .expect("registration")
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// The chain's head-to-tail order matches the model after every
        /// operation, and so do the group sizes.
        #[test]
        fn prop_order_matches_model(ops in prop::collection::vec(arb_op(), 1..40)) {
            let mut chain = Chain::new();
            let mut model = Model::new();

            for op in ops {
                let landed = apply(&mut chain, op);
                let expected = model.apply(op);
                prop_assert_eq!(landed.index(), expected);

                let order: Vec<usize> = chain.groups().map(|g| g.id().index()).collect();
                prop_assert_eq!(&order, &model.order);
            }

            let sizes: Vec<usize> = chain.groups().map(|g| g.len()).collect();
            let expected: Vec<usize> = model.order.iter().map(|id| model.sizes[*id]).collect();
            prop_assert_eq!(sizes, expected);
            prop_assert_eq!(chain.head().index(), model.order[0]);
            prop_assert_eq!(chain.tail().index(), *model.order.last().unwrap());
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Running a random chain never lets an entry run before an entry of
        /// an earlier group.
        #[test]
        fn prop_runs_respect_group_order(ops in prop::collection::vec(arb_op(), 1..24)) {
            let mut chain = Chain::new();
            for op in ops {
                apply(&mut chain, op);
            }
            let position: Vec<usize> = {
                let mut position = vec![0; chain.len()];
                for (i, group) in chain.groups().enumerate() {
                    position[group.id().index()] = i;
                }
                position
            };

            let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
            let recorder = Recorder::new();
            let report = rt.block_on(ChainExecutor::new().run(&chain, args![recorder.clone()]));

            prop_assert_eq!(report.invoked, chain.entry_count());
            let tiers: Vec<usize> = recorder
                .entries()
                .iter()
                .map(|id| position[id.parse::<usize>().unwrap()])
                .collect();
            prop_assert!(
                tiers.windows(2).all(|w| w[0] <= w[1]),
                "out of order: {:?}",
                tiers
            );
        }
    }
}
