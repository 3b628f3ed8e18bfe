// tests/property_scheduler.rs

mod common;
use crate::common::*;

use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;

use bootqueue::engine::Jobs;
use bootqueue::ids::JobId;
use bootqueue::state::Job;

#[derive(Debug, Clone)]
enum Op {
    Put(u16),
    Enqueue(usize),
    Dequeue,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u16>().prop_map(Op::Put),
        any::<usize>().prop_map(Op::Enqueue),
        Just(Op::Dequeue),
    ]
}

// Random DAG: job N may only depend on jobs 0..N, which keeps it acyclic.
fn dag_strategy(max_jobs: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_jobs).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        let deps: BTreeSet<usize> = deps
                            .into_iter()
                            .filter(|_| i > 0)
                            .map(|d| d % i.max(1))
                            .collect();
                        deps.into_iter().collect()
                    })
                    .collect()
            },
        )
    })
}

proptest! {
    #[test]
    fn pending_counter_tracks_puts_minus_dequeues(ops in proptest::collection::vec(op_strategy(), 0..60)) {
        let ledger = Ledger::new();
        let (_db, mut scheduler) = mem_scheduler(&ledger);

        let mut stored: Vec<JobId> = Vec::new();
        let mut seen: HashSet<u16> = HashSet::new();
        let mut queued: HashSet<JobId> = HashSet::new();
        let mut puts = 0u64;
        let mut dequeues = 0u64;

        for op in ops {
            match op {
                Op::Put(n) => {
                    if !seen.insert(n) {
                        continue;
                    }
                    let job = TestJob::root(&n.to_be_bytes(), &ledger);
                    stored.push(job.id());
                    scheduler.put_job(job).unwrap();
                    puts += 1;
                }
                Op::Enqueue(i) => {
                    if stored.is_empty() {
                        continue;
                    }
                    let id = stored[i % stored.len()];
                    if scheduler.has_job(&id).unwrap() {
                        scheduler.add_runnable_job(id).unwrap();
                        queued.insert(id);
                    }
                }
                Op::Dequeue => {
                    match scheduler.remove_runnable_job() {
                        Ok(job) => {
                            prop_assert!(queued.remove(&job.id()));
                            prop_assert!(!scheduler.has_job(&job.id()).unwrap());
                            dequeues += 1;
                        }
                        Err(err) => {
                            prop_assert!(err.is_not_found());
                            prop_assert!(queued.is_empty());
                        }
                    }
                }
            }
            prop_assert_eq!(scheduler.pending_jobs(), puts - dequeues);
        }
    }

    #[test]
    fn draining_returns_each_dependent_exactly_once(
        edges in proptest::collection::vec((0u8..4, 0u8..16), 0..40)
    ) {
        let ledger = Ledger::new();
        let (_db, mut scheduler) = mem_scheduler(&ledger);

        let id = |tag: &str, n: u8| JobId::from_content(format!("{tag}-{n}").as_bytes());
        for &(dep, dependent) in &edges {
            scheduler.add_dependency(id("dep", dep), id("job", dependent)).unwrap();
        }

        for dep in 0u8..4 {
            let expected: HashSet<JobId> = edges
                .iter()
                .filter(|(d, _)| *d == dep)
                .map(|(_, x)| id("job", *x))
                .collect();

            let drained = scheduler.remove_dependencies(id("dep", dep)).unwrap();
            let unique: HashSet<JobId> = drained.iter().copied().collect();
            prop_assert_eq!(unique.len(), drained.len());
            prop_assert_eq!(unique, expected);
            prop_assert!(scheduler.remove_dependencies(id("dep", dep)).unwrap().is_empty());
        }
    }

    #[test]
    fn every_dag_executes_in_dependency_order(
        dag in dag_strategy(12),
        push_order in any::<u64>(),
    ) {
        let ledger = Ledger::new();
        let (_db, scheduler) = mem_scheduler(&ledger);
        let mut jobs = Jobs::new(scheduler, 1000);

        let mut built: Vec<TestJob> = Vec::with_capacity(dag.len());
        for (i, deps) in dag.iter().enumerate() {
            let dep_ids: Vec<JobId> = deps.iter().map(|&d| built[d].id()).collect();
            built.push(TestJob::new(format!("node-{i}").as_bytes(), &dep_ids, &ledger));
        }

        // Deterministic shuffle of the push order.
        let mut order: Vec<usize> = (0..built.len()).collect();
        let mut state = push_order | 1;
        for i in (1..order.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            order.swap(i, (state % (i as u64 + 1)) as usize);
        }

        // Nothing has executed yet, so every non-root job parks behind its
        // dependencies regardless of push order.
        for &i in &order {
            jobs.push(built[i].clone()).unwrap();
        }

        let mut executor = RecordingExecutor::new(ledger.clone());
        jobs.execute_all(&mut executor).unwrap();

        prop_assert_eq!(executor.executed().len(), built.len());
        prop_assert_eq!(jobs.pending_jobs(), 0);
    }
}
