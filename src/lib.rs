//! Federate a third-party OAuth 2.0 login into locally issued access/refresh sessions.
//!
//! The crate turns an authorization code into a durable internal session, discriminates the
//! two session token classes, and lazily rotates both the session tokens and the upstream
//! provider credential. Persistence and the provider's wire protocol sit behind the
//! [`store::SessionStore`] and [`provider::IdentityProvider`] traits.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod store;
pub mod token;

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::{
		context::CallContext,
		error::{Error, Result},
	};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
