//! Violation counting and the global warning suppression flag.

use tracing::debug;

use crate::adapter::IntegrityEvent;

pub const VIOLATION_BUDGET: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Auto-submission has begun; the event changes nothing.
    Suppressed,
    /// Warn only; the event does not count toward the budget.
    Warn,
    Counted { count: u32, remaining: u32 },
    /// The count just reached the budget.
    BudgetExhausted { count: u32 },
}

#[derive(Debug, Clone)]
pub struct ViolationTracker {
    count: u32,
    budget: u32,
    suppressed: bool,
}

impl Default for ViolationTracker {
    fn default() -> Self {
        Self::new(VIOLATION_BUDGET)
    }
}

impl ViolationTracker {
    pub fn new(budget: u32) -> Self {
        Self {
            count: 0,
            budget: budget.max(1),
            suppressed: false,
        }
    }

    pub fn assess(&mut self, event: IntegrityEvent) -> Verdict {
        if self.suppressed {
            debug!(event = event.as_str(), "event ignored while auto-submitting");
            return Verdict::Suppressed;
        }
        if !event.counts_toward_budget() {
            return Verdict::Warn;
        }
        self.count = (self.count + 1).min(self.budget);
        if self.count >= self.budget {
            Verdict::BudgetExhausted { count: self.count }
        } else {
            Verdict::Counted {
                count: self.count,
                remaining: self.remaining(),
            }
        }
    }

    /// Silences every later event. There is no way back.
    pub fn suppress(&mut self) {
        self.suppressed = true;
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn remaining(&self) -> u32 {
        self.budget.saturating_sub(self.count)
    }
}
