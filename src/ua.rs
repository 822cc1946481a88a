//! User-Agent composition.

/// Builds `tws-auth/{version} ({os}/{arch}; {app}/{app_version}; pid/{pid})`.
///
/// The consumer application segment is omitted when `app` is `None`.
pub fn user_agent(app: Option<(&str, &str)>) -> String {
	let mut extensions = vec![format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH)];

	if let Some((name, version)) = app {
		extensions.push(format!("{name}/{version}"));
	}

	extensions.push(format!("pid/{}", std::process::id()));

	format!("{}/{} ({})", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), extensions.join("; "))
}
