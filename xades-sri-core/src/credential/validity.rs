use crate::sign::SigningError;
use chrono::{DateTime, Utc};
use x509_cert::{Certificate, time::Time};

/// `[notBefore, notAfter]` of a certificate, both bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl ValidityWindow {
    pub fn new(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        Self {
            not_before,
            not_after,
        }
    }

    pub fn of(certificate: &Certificate) -> Result<Self, SigningError> {
        let validity = &certificate.tbs_certificate.validity;
        Ok(Self {
            not_before: to_utc(&validity.not_before)?,
            not_after: to_utc(&validity.not_after)?,
        })
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    pub fn ensure_contains(&self, now: DateTime<Utc>) -> Result<(), SigningError> {
        if self.contains(now) {
            return Ok(());
        }
        Err(SigningError::ExpiredCertificate {
            now,
            not_before: self.not_before,
            not_after: self.not_after,
        })
    }
}

fn to_utc(time: &Time) -> Result<DateTime<Utc>, SigningError> {
    let secs = i64::try_from(time.to_unix_duration().as_secs()).map_err(|e| {
        SigningError::Credential(format!("Certificate validity out of range: {e:?}"))
    })?;
    DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        SigningError::Credential(format!("Certificate validity out of range: {secs}"))
    })
}
