//! HMAC-signed issuance and validation of session tokens.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{
	Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind as JwtErrorKind,
};
// self
use crate::{
	_prelude::*,
	config::IssuerConfig,
	error::ConfigError,
	token::{IssuedToken, SessionClaims, SessionTokens, TokenError, TokenKind},
};

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Issues and validates session tokens with a symmetric key supplied at construction.
#[derive(Clone)]
pub struct TokenIssuer {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
	access_ttl: Duration,
	refresh_ttl: Duration,
}
impl TokenIssuer {
	/// Builds an issuer from validated configuration.
	pub fn new(config: &IssuerConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		let secret = config.secret.expose().as_bytes();
		let mut validation = Validation::new(SIGNING_ALGORITHM);

		// Any HMAC variant keyed with our secret is accepted; other families are not.
		validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
		validation.leeway = 0;
		validation.validate_aud = false;
		validation.set_required_spec_claims(&["exp"]);

		Ok(Self {
			encoding: EncodingKey::from_secret(secret),
			decoding: DecodingKey::from_secret(secret),
			validation,
			access_ttl: config.access_ttl,
			refresh_ttl: config.refresh_ttl,
		})
	}

	/// Lifetime applied to newly issued tokens of `kind`.
	pub fn lifetime(&self, kind: TokenKind) -> Duration {
		match kind {
			TokenKind::Access => self.access_ttl,
			TokenKind::Refresh => self.refresh_ttl,
		}
	}

	/// Issues an access token for an external identity.
	pub fn issue_access(&self, subject: &str) -> Result<IssuedToken> {
		self.issue_at(TokenKind::Access, subject, OffsetDateTime::now_utc())
	}

	/// Issues a refresh token for an internal user.
	pub fn issue_refresh(&self, subject: &str) -> Result<IssuedToken> {
		self.issue_at(TokenKind::Refresh, subject, OffsetDateTime::now_utc())
	}

	/// Issues both tokens of a session in one step.
	pub fn issue_pair(&self, external_subject: &str, user_subject: &str) -> Result<SessionTokens> {
		let now = OffsetDateTime::now_utc();

		Ok(SessionTokens {
			access: self.issue_at(TokenKind::Access, external_subject, now)?,
			refresh: self.issue_at(TokenKind::Refresh, user_subject, now)?,
		})
	}

	/// Issues a token of `kind` stamped with an explicit issued-at instant.
	pub fn issue_at(
		&self,
		kind: TokenKind,
		subject: &str,
		issued_at: OffsetDateTime,
	) -> Result<IssuedToken> {
		let claims = SessionClaims::new(kind, subject, issued_at, self.lifetime(kind));
		let compact =
			jsonwebtoken::encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding)
				.map_err(|source| ConfigError::TokenSigning { source })?;

		Ok(IssuedToken::new(compact, claims))
	}

	/// Verifies signature and expiry and returns the full claim set.
	///
	/// The token class is not checked here; call [`SessionClaims::extract_subject`].
	pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
		// Algorithm names unknown to the decoder (`none` included) fail header parsing.
		if let Err(err) = jsonwebtoken::decode_header(token) {
			return Err(if names_foreign_algorithm(token) {
				TokenError::BadSignature
			} else {
				map_jwt_error(err)
			});
		}

		jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &self.validation)
			.map(|data| data.claims)
			.map_err(map_jwt_error)
	}
}
impl Debug for TokenIssuer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenIssuer")
			.field("algorithm", &SIGNING_ALGORITHM)
			.field("access_ttl", &self.access_ttl)
			.field("refresh_ttl", &self.refresh_ttl)
			.finish()
	}
}

// Reads the raw `alg` header field; `false` when the header is not base64url JSON.
fn names_foreign_algorithm(token: &str) -> bool {
	let Some(header) = token.split('.').next() else {
		return false;
	};
	let Ok(bytes) = URL_SAFE_NO_PAD.decode(header) else {
		return false;
	};
	let Ok(header) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
		return false;
	};

	match header.get("alg").and_then(serde_json::Value::as_str) {
		Some(alg) => !matches!(
			alg.parse::<Algorithm>(),
			Ok(algorithm) if ACCEPTED_ALGORITHMS.contains(&algorithm)
		),
		None => false,
	}
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
	match err.kind() {
		JwtErrorKind::ExpiredSignature => TokenError::Expired,
		JwtErrorKind::InvalidSignature
		| JwtErrorKind::InvalidAlgorithm
		| JwtErrorKind::InvalidAlgorithmName
		| JwtErrorKind::InvalidKeyFormat => TokenError::BadSignature,
		_ => TokenError::Malformed { reason: err.to_string() },
	}
}
