//! Expiration timestamps for resource writes.
//!
//! An explicit `$expires` must be strictly in the future at write time; when
//! the type declares an `expires` duration and the payload supplies nothing,
//! the deadline is recomputed from `now` on every write. The matching read
//! side (`expires_at IS NULL OR expires_at > now`) is applied by the
//! storage layer on every read path.

use std::time::Duration;

use time::OffsetDateTime;

use crate::domain::error::ResourceError;

pub fn resolve_expires_at(
    type_duration: Option<Duration>,
    requested: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> Result<Option<OffsetDateTime>, ResourceError> {
    match requested {
        Some(at) if at <= now => Err(ResourceError::ExpirationInPast),
        Some(at) => Ok(Some(at)),
        None => Ok(type_duration.map(|d| now + d)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-03-01 12:00 UTC);

    #[test]
    fn explicit_future_value_wins_over_type_duration() {
        let at = datetime!(2024-06-01 12:00 UTC);
        let resolved =
            resolve_expires_at(Some(Duration::from_secs(600)), Some(at), NOW).unwrap();
        assert_eq!(resolved, Some(at));
    }

    #[test]
    fn past_or_present_value_is_rejected() {
        let err = resolve_expires_at(None, Some(datetime!(2024-02-01 12:00 UTC)), NOW).unwrap_err();
        assert!(matches!(err, ResourceError::ExpirationInPast));

        // Exactly "now" is not strictly in the future.
        let err = resolve_expires_at(None, Some(NOW), NOW).unwrap_err();
        assert!(matches!(err, ResourceError::ExpirationInPast));
    }

    #[test]
    fn type_duration_fills_in_when_absent() {
        let resolved = resolve_expires_at(Some(Duration::from_secs(600)), None, NOW).unwrap();
        assert_eq!(resolved, Some(datetime!(2024-03-01 12:10 UTC)));
    }

    #[test]
    fn no_duration_and_no_request_means_no_expiry() {
        assert_eq!(resolve_expires_at(None, None, NOW).unwrap(), None);
    }
}
