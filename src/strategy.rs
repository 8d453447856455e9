use crate::item::{Item, MAX_BATCH};
use crate::queue::QueueSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

/// The three scheduling policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Sjf,
    Fair,
    Fcfs,
}

impl Strategy {
    fn to_u8(self) -> u8 {
        match self {
            Strategy::Sjf => 0,
            Strategy::Fair => 1,
            Strategy::Fcfs => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => Strategy::Sjf,
            1 => Strategy::Fair,
            _ => Strategy::Fcfs,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::Sjf => "sjf",
            Strategy::Fair => "fair",
            Strategy::Fcfs => "fcfs",
        };
        f.write_str(s)
    }
}

impl FromStr for Strategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sjf" => Ok(Strategy::Sjf),
            "fair" => Ok(Strategy::Fair),
            "fcfs" => Ok(Strategy::Fcfs),
            _ => Err(()),
        }
    }
}

/// Process-wide atomically-readable active strategy. Mutation is a
/// single atomic store; readers never see a torn value.
pub struct StrategyRegister(AtomicU8);

impl StrategyRegister {
    pub fn new(initial: Strategy) -> Self {
        Self(AtomicU8::new(initial.to_u8()))
    }

    pub fn get(&self) -> Strategy {
        Strategy::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, s: Strategy) {
        self.0.store(s.to_u8(), Ordering::SeqCst);
    }
}

/// Shortest-job-first: snapshot every queue (home and stranded alike),
/// stably sort by `(max_len, arrived_at)` ascending, then admit
/// best-fit-after-sort, scanning past items that don't fit rather
/// than stopping at the first miss, since the batch cap is on
/// sequence count, not on `max_len`.
pub fn select_sjf(qs: &mut QueueSet) -> Vec<Item> {
    let mut candidates: Vec<Item> = qs.fifo.drain(..).chain(qs.q_a.drain(..)).chain(qs.q_b.drain(..)).collect();
    candidates.sort_by(|a, b| a.max_len.cmp(&b.max_len).then(a.arrived_at.cmp(&b.arrived_at)));

    let mut batch = Vec::new();
    let mut leftover = Vec::new();
    let mut total = 0usize;
    for item in candidates {
        if total + item.seq_count() <= MAX_BATCH {
            total += item.seq_count();
            batch.push(item);
        } else {
            leftover.push(item);
        }
    }
    qs.fifo.extend(leftover);
    batch
}

/// Alternating-customer-class fairness. `turn` flips from the class
/// that went last; the head of `primary` is admitted first (updating
/// `last_turn` only if it actually fit), then `primary` is drained
/// further, then `secondary`. Falls back to draining the global FIFO
/// for items stranded there by a prior non-FAIR strategy.
pub fn select_fair(qs: &mut QueueSet) -> Vec<Item> {
    let mut batch = Vec::new();
    let mut total = 0usize;

    let turn = if qs.last_turn == crate::item::Customer::B {
        crate::item::Customer::A
    } else {
        crate::item::Customer::B
    };

    let (primary, secondary) = match turn {
        crate::item::Customer::A => (&mut qs.q_a, &mut qs.q_b),
        crate::item::Customer::B => (&mut qs.q_b, &mut qs.q_a),
    };

    let mut turn_served = false;
    if let Some(front) = primary.front() {
        if total + front.seq_count() <= MAX_BATCH {
            let item = primary.pop_front().unwrap();
            total += item.seq_count();
            batch.push(item);
            turn_served = true;
        }
    }

    while let Some(front) = primary.front() {
        if total + front.seq_count() > MAX_BATCH {
            break;
        }
        let item = primary.pop_front().unwrap();
        total += item.seq_count();
        batch.push(item);
    }

    while let Some(front) = secondary.front() {
        if total + front.seq_count() > MAX_BATCH {
            break;
        }
        let item = secondary.pop_front().unwrap();
        total += item.seq_count();
        batch.push(item);
    }

    if turn_served {
        qs.last_turn = turn;
    }

    while let Some(front) = qs.fifo.front() {
        if total + front.seq_count() > MAX_BATCH {
            break;
        }
        let item = qs.fifo.pop_front().unwrap();
        total += item.seq_count();
        batch.push(item);
    }

    batch
}

/// One FCFS packing pass: pop heads while they fit, global FIFO first
/// then any stranded per-customer queues. Mutates `batch`/`total` in
/// place so the dispatcher can call this twice (before and after the
/// micro-batch top-up delay) against the same accumulator.
pub fn pack_fcfs(qs: &mut QueueSet, batch: &mut Vec<Item>, total: &mut usize) {
    while let Some(front) = qs.fifo.front() {
        if *total + front.seq_count() > MAX_BATCH {
            break;
        }
        let item = qs.fifo.pop_front().unwrap();
        *total += item.seq_count();
        batch.push(item);
    }

    for q in [&mut qs.q_a, &mut qs.q_b] {
        while let Some(front) = q.front() {
            if *total + front.seq_count() > MAX_BATCH {
                break;
            }
            let item = q.pop_front().unwrap();
            *total += item.seq_count();
            batch.push(item);
        }
    }
}
