//! Fixed-path resource services layered over [`Client`].
//!
//! Each service owns a clone of the client it was derived from, so overlays applied before the
//! call (`client.with_host(..)?.user()`) carry over to every request it makes.

pub mod app;
pub mod suite;
pub mod user;

pub use app::AppService;
pub use suite::SuiteService;
pub use user::UserService;

// self
use crate::client::Client;

impl Client {
	/// User endpoints (`/v1/users/...`), authenticated with the application's own token.
	pub fn user(&self) -> UserService {
		UserService::new(self.clone())
	}

	/// App endpoints (`/v1/apps/...`), authenticated with the application's own token.
	pub fn app(&self) -> AppService {
		AppService::new(self.clone())
	}

	/// Suite endpoints (`/v1/suites/...`), authenticated with caller-provided tokens.
	pub fn suite(&self) -> SuiteService {
		SuiteService::new(self.clone())
	}
}
