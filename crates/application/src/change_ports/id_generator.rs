use tracklog_core::{AppError, AppResult};
use uuid::{Builder, Uuid};

/// Source of change record identifiers.
pub trait ChangeIdGenerator: Send + Sync {
    /// Returns a fresh identifier that has never been handed out before.
    fn next_id(&self) -> AppResult<Uuid>;
}

/// Random v4 identifiers backed by the operating system entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomChangeIdGenerator;

impl ChangeIdGenerator for RandomChangeIdGenerator {
    fn next_id(&self) -> AppResult<Uuid> {
        let mut bytes = [0u8; 16];
        getrandom::fill(&mut bytes).map_err(|error| {
            AppError::Internal(format!("failed to generate change record id: {error}"))
        })?;

        Ok(Builder::from_random_bytes(bytes).into_uuid())
    }
}

#[cfg(test)]
mod tests {
    use super::{ChangeIdGenerator, RandomChangeIdGenerator};

    #[test]
    fn generates_distinct_v4_identifiers() {
        let generator = RandomChangeIdGenerator;
        let first = generator.next_id();
        let second = generator.next_id();
        assert!(first.is_ok());
        assert!(second.is_ok());

        let first = first.unwrap_or_default();
        assert_eq!(first.get_version_num(), 4);
        assert_ne!(first, second.unwrap_or_default());
    }
}
