// Panic isolation for worker safety
use std::any::Any;
use tracing::error;

/// Human-readable message from a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Outcome of one job in the pool
#[derive(Debug)]
pub enum JobOutcome<T> {
    /// Job ran to completion (its own result may still be an error)
    Done(T),
    /// Job panicked; the panic was contained
    Panicked(String),
    /// Job never ran or was aborted because of shutdown
    Cancelled,
}

impl<T> JobOutcome<T> {
    pub fn into_done(self) -> Option<T> {
        match self {
            JobOutcome::Done(value) => Some(value),
            _ => None,
        }
    }
}

/// Convert a join result into a job outcome, logging panics
pub fn from_join<T>(label: &str, result: Result<T, tokio::task::JoinError>) -> JobOutcome<T> {
    match result {
        Ok(value) => JobOutcome::Done(value),
        Err(join_err) if join_err.is_panic() => {
            let msg = panic_message(join_err.into_panic().as_ref());
            error!(stage = %label, panic_msg = %msg, "Worker job panicked");
            JobOutcome::Panicked(msg)
        }
        Err(_) => JobOutcome::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }
}
