use anyhow::{anyhow, Result};
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use uuid::Uuid;

const TOKEN_TYPE: &str = "access";

/// Resolves bearer tokens minted by the identity provider into user ids.
/// Tokens are PASETO v4.local under a shared symmetric key; the issuer is
/// also the expected audience.
#[derive(Clone)]
pub struct SessionKeys {
    key: [u8; 32],
    issuer: String,
}

impl SessionKeys {
    pub fn new(key: [u8; 32], issuer: impl Into<String>) -> Self {
        Self {
            key,
            issuer: issuer.into(),
        }
    }

    /// `Ok(None)` for anything that is not a valid, unexpired access token.
    pub fn verify(&self, token: &str) -> Result<Option<Uuid>> {
        let key = SymmetricKey::<V4>::from(&self.key)?;
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(&self.issuer);
        rules.validate_audience_with(&self.issuer);

        let untrusted = match UntrustedToken::<Local, V4>::try_from(token) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let trusted = match local::decrypt(&key, &untrusted, &rules, None, None) {
            Ok(token) => token,
            Err(_) => return Ok(None),
        };
        let Some(claims) = trusted.payload_claims() else {
            return Ok(None);
        };

        let is_access = claims
            .get_claim("typ")
            .and_then(|value| value.as_str())
            .is_some_and(|value| value == TOKEN_TYPE);
        if !is_access {
            return Ok(None);
        }

        let subject = claims
            .get_claim("sub")
            .and_then(|value| value.as_str())
            .and_then(|value| Uuid::parse_str(value).ok());
        Ok(subject)
    }

    /// Mints an access token. The service itself never logs anyone in; this
    /// exists for operator tooling and tests.
    pub fn issue(&self, user_id: Uuid, ttl: std::time::Duration) -> Result<String> {
        let mut claims = Claims::new_expires_in(&ttl)?;
        claims.issuer(&self.issuer)?;
        claims.audience(&self.issuer)?;
        claims.subject(&user_id.to_string())?;
        claims.add_additional("typ", TOKEN_TYPE)?;

        let key = SymmetricKey::<V4>::from(&self.key)?;
        local::encrypt(&key, &claims, None, None)
            .map_err(|err| anyhow!("failed to encrypt session token: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const KEY: [u8; 32] = *b"0123456789abcdef0123456789abcdef";

    #[test]
    fn issued_token_verifies() {
        let keys = SessionKeys::new(KEY, "lions");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, Duration::from_secs(60)).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), Some(user_id));
    }

    #[test]
    fn wrong_issuer_or_garbage_is_rejected() {
        let keys = SessionKeys::new(KEY, "lions");
        let other = SessionKeys::new(KEY, "someone-else");
        let token = other.issue(Uuid::new_v4(), Duration::from_secs(60)).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), None);
        assert_eq!(keys.verify("not-a-token").unwrap(), None);
    }
}
