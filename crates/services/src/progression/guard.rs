use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Operation, ProgressionError};

/// One flag per guarded operation kind.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    open: AtomicBool,
    advance: AtomicBool,
    submit: AtomicBool,
}

impl InFlight {
    fn flag(&self, op: Operation) -> &AtomicBool {
        match op {
            Operation::Open => &self.open,
            Operation::Advance => &self.advance,
            Operation::Submit => &self.submit,
        }
    }

    /// Claim `op` until the returned guard is dropped.
    pub(crate) fn acquire(&self, op: Operation) -> Result<InFlightGuard<'_>, ProgressionError> {
        let flag = self.flag(op);
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ProgressionError::Busy(op))?;
        Ok(InFlightGuard { flag })
    }

    pub(crate) fn is_running(&self, op: Operation) -> bool {
        self.flag(op).load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub(crate) struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_of_same_kind_is_busy() {
        let in_flight = InFlight::default();
        let _advance = in_flight.acquire(Operation::Advance).unwrap();
        let err = in_flight.acquire(Operation::Advance).unwrap_err();
        assert!(matches!(err, ProgressionError::Busy(Operation::Advance)));
        assert!(in_flight.acquire(Operation::Submit).is_ok());
    }

    #[test]
    fn dropping_guard_releases_claim() {
        let in_flight = InFlight::default();
        {
            let _submit = in_flight.acquire(Operation::Submit).unwrap();
            assert!(in_flight.is_running(Operation::Submit));
        }
        assert!(!in_flight.is_running(Operation::Submit));
        assert!(in_flight.acquire(Operation::Submit).is_ok());
    }
}
