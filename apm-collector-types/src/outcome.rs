use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
/// The result of processing one record.
///
/// A `Retryable` outcome means the record is intact and may succeed later (e.g. an
/// identifier is not registered yet, or a queue is full): the caller keeps it for
/// redelivery. A `Fatal` outcome means the record can never succeed (e.g. it cannot be
/// decoded) and must not be retried indefinitely.
pub enum Outcome {
    Success,
    Retryable(String),
    Fatal(String),
}

impl Outcome {
    pub fn retryable<S: Into<String>>(reason: S) -> Self {
        Self::Retryable(reason.into())
    }

    pub fn fatal<S: Into<String>>(reason: S) -> Self {
        Self::Fatal(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    /// Evaluate `f` only if this is a success, otherwise keep the failure.
    pub fn and_then<F: FnOnce() -> Outcome>(self, f: F) -> Outcome {
        match self {
            Self::Success => f(),
            failure => failure,
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::Retryable(reason) => write!(f, "Retryable({reason})"),
            Self::Fatal(reason) => write!(f, "Fatal({reason})"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_and_then() {
        assert_eq!(Outcome::Success.and_then(|| Outcome::Success), Outcome::Success);
        assert_eq!(
            Outcome::retryable("later").and_then(|| Outcome::Success),
            Outcome::Retryable("later".to_owned())
        );
        assert!(Outcome::Success.and_then(|| Outcome::fatal("bad")).is_fatal());
        assert_eq!(Outcome::retryable("queue full").to_string(), "Retryable(queue full)");
    }
}
