use std::sync::atomic::{AtomicU64, Ordering};

/// Report ids must stay exactly representable as IEEE doubles on every client.
pub const MAX_SAFE_REPORT_ID: u64 = 1 << 53;

/// Source of provisional identifiers for optimistic records.
pub trait IdGenerator: Send + Sync {
    fn action_id(&self) -> String;

    fn report_id(&self) -> String;

    fn transaction_id(&self) -> String {
        self.action_id()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn action_id(&self) -> String {
        rand::random::<u64>().to_string()
    }

    fn report_id(&self) -> String {
        rand::random_range(1..MAX_SAFE_REPORT_ID).to_string()
    }
}

/// Hands out increasing numbers. Deterministic, for replays and tests.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    fn take(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdGenerator for SequentialIds {
    fn action_id(&self) -> String {
        self.take()
    }

    fn report_id(&self) -> String {
        self.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids_are_shared_across_kinds() {
        let ids = SequentialIds::starting_at(10);
        assert_eq!(ids.action_id(), "10");
        assert_eq!(ids.report_id(), "11");
        assert_eq!(ids.transaction_id(), "12");
    }

    #[test]
    fn test_random_report_id_in_range() {
        for _ in 0..100 {
            let id: u64 = RandomIds.report_id().parse().unwrap();
            assert!(id > 0 && id < MAX_SAFE_REPORT_ID);
        }
    }
}
