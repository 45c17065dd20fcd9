//! Provider strategy hooks that classify upstream failures.
//!
//! Implementations normalize error mapping without tying the live adapter to any
//! particular HTTP client.

// self
use crate::{_prelude::*, provider::ProviderOperation};

/// Strategy hook that allows providers to classify errors.
///
/// Implementors are required to be `Send + Sync`, and the hook uses crate-owned data
/// types so downstream crates never depend on reqwest-specific structures.
pub trait ProviderStrategy: Send + Sync {
	/// Maps an upstream failure into the crate taxonomy.
	fn classify(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Provider rejected the code, secret, or scope.
	Rejected,
	/// Client authentication failed.
	InvalidClient,
	/// Failure is temporary; the caller may try again later.
	Transient,
}

/// Context passed to provider strategies when classifying errors.
///
/// Only primitive data (status codes, OAuth fields, body preview) is kept so strategies
/// stay decoupled from any HTTP client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Operation associated with the failing request.
	pub operation: ProviderOperation,
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
	/// Indicates whether the failure originated from the network/transport layer.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context scoped to the provided operation.
	pub fn new(operation: ProviderOperation) -> Self {
		Self {
			operation,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Convenience constructor for transport-level/network failures.
	pub fn network_failure(operation: ProviderOperation) -> Self {
		Self { network_error: true, ..Self::new(operation) }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth error code string returned by the provider.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview for providers that return non-JSON payloads.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}
}

/// Default strategy that applies RFC-guided heuristics.
///
/// Structured OAuth fields win over body text hints, which win over the HTTP status.
/// Network failures are always transient.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}
		if let Some(kind) = ctx
			.oauth_error
			.as_deref()
			.and_then(match_exact_value)
			.or_else(|| ctx.error_description.as_deref().and_then(classify_text))
			.or_else(|| ctx.body_preview.as_deref().and_then(classify_text))
		{
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ProviderErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = body.chars().take(ProviderErrorContext::BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

fn match_exact_value(value: &str) -> Option<ProviderErrorKind> {
	if value.eq_ignore_ascii_case("invalid_grant")
		|| value.eq_ignore_ascii_case("access_denied")
		|| value.eq_ignore_ascii_case("invalid_scope")
		|| value.eq_ignore_ascii_case("invalid_token")
	{
		Some(ProviderErrorKind::Rejected)
	} else if value.eq_ignore_ascii_case("invalid_client")
		|| value.eq_ignore_ascii_case("unauthorized_client")
	{
		Some(ProviderErrorKind::InvalidClient)
	} else if value.eq_ignore_ascii_case("temporarily_unavailable")
		|| value.eq_ignore_ascii_case("server_error")
	{
		Some(ProviderErrorKind::Transient)
	} else {
		None
	}
}

fn classify_text(text: &str) -> Option<ProviderErrorKind> {
	let lowered = text.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("invalid_grant") || text.contains("invalid_token") =>
			Some(ProviderErrorKind::Rejected),
		text if text.contains("invalid_client") => Some(ProviderErrorKind::InvalidClient),
		text if text.contains("temporarily_unavailable") || text.contains("retry") =>
			Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 401 | 403 | 404 | 410) => ProviderErrorKind::Rejected,
		_ => ProviderErrorKind::Transient,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn classify(ctx: ProviderErrorContext) -> ProviderErrorKind {
		DefaultProviderStrategy.classify(&ctx)
	}

	#[test]
	fn oauth_fields_take_precedence_over_status() {
		let ctx = ProviderErrorContext::new(ProviderOperation::ExchangeCode)
			.with_http_status(503)
			.with_oauth_error("invalid_grant");

		assert_eq!(classify(ctx), ProviderErrorKind::Rejected);

		let ctx = ProviderErrorContext::new(ProviderOperation::RefreshCredential)
			.with_http_status(400)
			.with_oauth_error("invalid_client");

		assert_eq!(classify(ctx), ProviderErrorKind::InvalidClient);
	}

	#[test]
	fn body_and_status_fallbacks() {
		let ctx = ProviderErrorContext::new(ProviderOperation::FetchProfile)
			.with_body_preview("{\"error\":\"invalid_token\"}");

		assert_eq!(classify(ctx), ProviderErrorKind::Rejected);
		assert_eq!(
			classify(ProviderErrorContext::new(ProviderOperation::FetchProfile).with_http_status(401)),
			ProviderErrorKind::Rejected
		);
		assert_eq!(
			classify(ProviderErrorContext::new(ProviderOperation::FetchProfile).with_http_status(502)),
			ProviderErrorKind::Transient
		);
		assert_eq!(
			classify(ProviderErrorContext::network_failure(ProviderOperation::ExchangeCode)),
			ProviderErrorKind::Transient
		);
	}

	#[test]
	fn body_preview_is_truncated() {
		let ctx = ProviderErrorContext::new(ProviderOperation::FetchProfile)
			.with_body_preview("x".repeat(1_000));
		let preview = ctx.body_preview.expect("Preview should be recorded.");

		assert_eq!(preview.chars().count(), ProviderErrorContext::BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}
}
