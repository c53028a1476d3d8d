//! Message delivery priority.

use serde::{Deserialize, Serialize};

/// Delivery priority. Variant declaration order is the ordering: `Urgent` is
/// the greatest value so the priority queue's "highest first" dequeue is a
/// plain `Ord` comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Lowest priority tier.
    Low,
    /// Default priority tier.
    Normal,
    /// Elevated priority tier.
    High,
    /// Most urgent tier; always dequeued first.
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl Priority {
    /// All tiers, lowest to highest, for lane indexing in the priority queue.
    pub const ALL: [Self; 4] = [Self::Low, Self::Normal, Self::High, Self::Urgent];

    /// Lane index (0 = lowest priority) for array-backed queue storage.
    #[must_use]
    pub const fn lane(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::High => 2,
            Self::Urgent => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Priority;

    #[test]
    fn urgent_outranks_all_others() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }

    #[test]
    fn default_is_normal() {
        assert_eq!(Priority::default(), Priority::Normal);
    }
}
