//! Allowlist sanitization of untrusted markup.
//!
//! Two profiles are provided: [`sanitize`] for editor content and
//! [`sanitize_for_paste`] for clipboard content. Traversal goes through a
//! [`TreeAdapter`]: the host tree (html5ever, behind the `host-tree` feature)
//! when it passes a startup probe, otherwise the tolerant fallback parser.
//! Both paths share the same filtering code and the same serializer.

mod clean;
#[cfg(feature = "host-tree")]
mod host;
mod pattern;
mod policy;
mod tree;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use tracing::{debug, warn};

pub use clean::{clean_style, filter_attributes};
#[cfg(feature = "host-tree")]
pub use host::HostTree;
pub use pattern::is_dangerous;
pub use policy::{AllowlistPolicy, PolicyBuilder, DEFAULT_DANGEROUS_SCHEMES, WILDCARD};
pub use tree::{FallbackTree, NodeView, TreeAdapter};

static DEFAULT_SANITIZER: LazyLock<Sanitizer> = LazyLock::new(Sanitizer::new);

/// Sanitizes editor content with the process-wide default sanitizer.
pub fn sanitize(markup: &str) -> String {
    DEFAULT_SANITIZER.sanitize(markup)
}

/// Sanitizes pasted content with the process-wide default sanitizer.
pub fn sanitize_for_paste(markup: &str) -> String {
    DEFAULT_SANITIZER.sanitize_for_paste(markup)
}

/// Which tree the sanitizer walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Host tree if it is compiled in and passes the probe.
    #[default]
    Auto,
    Fallback,
    Host,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Auto => "auto",
            BackendKind::Fallback => "fallback",
            BackendKind::Host => "host",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendKind::Auto),
            "fallback" => Ok(BackendKind::Fallback),
            "host" => Ok(BackendKind::Host),
            other => Err(format!(
                "unknown tree backend '{other}' (expected auto, fallback or host)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Backend {
    Fallback,
    #[cfg(feature = "host-tree")]
    Host(HostTree),
}

/// A sanitizer bound to a traversal backend and a pair of policies.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    backend: Backend,
    content: Cow<'static, AllowlistPolicy>,
    paste: Cow<'static, AllowlistPolicy>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sanitizer {
    /// Probes for the host tree and uses the built-in profiles.
    pub fn new() -> Self {
        Self::with_backend(BackendKind::Auto)
    }

    /// Uses the requested backend. `Host` falls back to the parser with a
    /// warning when the host tree is unavailable.
    pub fn with_backend(kind: BackendKind) -> Self {
        Self {
            backend: select_backend(kind),
            content: Cow::Borrowed(AllowlistPolicy::content()),
            paste: Cow::Borrowed(AllowlistPolicy::paste()),
        }
    }

    /// Replaces the content and paste policies.
    pub fn with_policies(mut self, content: AllowlistPolicy, paste: AllowlistPolicy) -> Self {
        self.content = Cow::Owned(content);
        self.paste = Cow::Owned(paste);
        self
    }

    /// The backend actually in use (never `Auto`).
    pub fn backend(&self) -> BackendKind {
        match self.backend {
            Backend::Fallback => BackendKind::Fallback,
            #[cfg(feature = "host-tree")]
            Backend::Host(_) => BackendKind::Host,
        }
    }

    pub fn content_policy(&self) -> &AllowlistPolicy {
        &self.content
    }

    pub fn paste_policy(&self) -> &AllowlistPolicy {
        &self.paste
    }

    /// Sanitizes with the content profile.
    pub fn sanitize(&self, markup: &str) -> String {
        self.sanitize_with(markup, &self.content)
    }

    /// Sanitizes with the paste profile.
    pub fn sanitize_for_paste(&self, markup: &str) -> String {
        self.sanitize_with(markup, &self.paste)
    }

    /// Sanitizes with an arbitrary policy.
    pub fn sanitize_with(&self, markup: &str, policy: &AllowlistPolicy) -> String {
        match &self.backend {
            Backend::Fallback => clean::clean(&FallbackTree, markup, policy),
            #[cfg(feature = "host-tree")]
            Backend::Host(host) => clean::clean(host, markup, policy),
        }
    }
}

fn select_backend(kind: BackendKind) -> Backend {
    if kind == BackendKind::Fallback {
        return Backend::Fallback;
    }

    #[cfg(feature = "host-tree")]
    {
        if tree::probe(&HostTree) {
            debug!("using host tree for sanitization");
            return Backend::Host(HostTree);
        }
        warn!("host tree failed its probe, using the fallback parser");
    }

    #[cfg(not(feature = "host-tree"))]
    if kind == BackendKind::Host {
        warn!("host tree support is not compiled in, using the fallback parser");
    }

    debug!("using fallback parser for sanitization");
    Backend::Fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("auto".parse::<BackendKind>(), Ok(BackendKind::Auto));
        assert_eq!(" Host ".parse::<BackendKind>(), Ok(BackendKind::Host));
        assert!("dom".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Fallback.to_string(), "fallback");
    }

    #[test]
    fn test_forced_fallback() {
        let sanitizer = Sanitizer::with_backend(BackendKind::Fallback);
        assert_eq!(sanitizer.backend(), BackendKind::Fallback);
        assert_eq!(sanitizer.sanitize("<p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn test_resolved_backend_is_never_auto() {
        assert_ne!(Sanitizer::new().backend(), BackendKind::Auto);
    }

    #[cfg(not(feature = "host-tree"))]
    #[test]
    fn test_host_request_degrades_without_feature() {
        let sanitizer = Sanitizer::with_backend(BackendKind::Host);
        assert_eq!(sanitizer.backend(), BackendKind::Fallback);
    }

    #[cfg(feature = "host-tree")]
    #[test]
    fn test_auto_picks_host_when_compiled_in() {
        assert_eq!(Sanitizer::new().backend(), BackendKind::Host);
    }

    #[test]
    fn test_injected_policies() {
        let strict = PolicyBuilder::new().tags(&["p"]).build();
        let sanitizer = Sanitizer::with_backend(BackendKind::Fallback)
            .with_policies(strict.clone(), strict);
        assert_eq!(sanitizer.sanitize("<p><b>x</b></p>"), "<p>x</p>");
        assert_eq!(sanitizer.sanitize_for_paste("<h1>t</h1>"), "t");
    }

    #[test]
    fn test_profiles_differ() {
        let sanitizer = Sanitizer::with_backend(BackendKind::Fallback);
        let markup = r#"<p class="c" style="font-family: serif">x</p>"#;
        assert_eq!(
            sanitizer.sanitize(markup),
            r#"<p class="c" style="font-family: serif">x</p>"#
        );
        assert_eq!(sanitizer.sanitize_for_paste(markup), "<p>x</p>");
    }
}
