//! Container image references
//!
//! Parsing and normalization of image references such as `nginx`,
//! `quay.io/org/app:v1` or `localhost:5000/team/api@sha256:…`. Every parsed
//! [`ImageReference`] is fully qualified: the registry is never empty,
//! Docker Hub aliases collapse onto `docker.io`, and single-segment Docker Hub
//! repositories gain the `library/` namespace.
//!
//! Parsing never panics; every malformed component is reported as a
//! [`ParseError`] carrying the offending substring.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Registry assumed for references that do not name one.
pub const DEFAULT_REGISTRY: &str = "docker.io";
/// Legacy hostname of Docker Hub, normalized to [`DEFAULT_REGISTRY`].
pub const LEGACY_DEFAULT_REGISTRY: &str = "index.docker.io";
/// Namespace of official images on Docker Hub.
pub const DEFAULT_NAMESPACE: &str = "library";
/// Tag filled in when a string reference has neither tag nor digest.
pub const DEFAULT_TAG: &str = "latest";

static REPOSITORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+((\.|_|__|-+)[a-z0-9]+)*(/[a-z0-9]+((\.|_|__|-+)[a-z0-9]+)*)*$")
        .expect("repository pattern is valid")
});

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("tag pattern is valid")
});

static DIGEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sha256:[A-Fa-f0-9]{64}$").expect("digest pattern is valid"));

static REGISTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9.-]*[a-z0-9])?(:[0-9]+)?$").expect("registry pattern is valid")
});

/// Why a reference could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty image reference")]
    Empty,

    #[error("invalid digest '{digest}': expected 'sha256:' followed by 64 hex characters")]
    InvalidDigest { digest: String },

    #[error("invalid tag '{tag}'")]
    InvalidTag { tag: String },

    #[error("invalid repository '{repository}'")]
    InvalidRepository { repository: String },

    #[error("invalid registry host '{registry}'")]
    InvalidRegistry { registry: String },

    #[error("'{reference}' specifies both a tag and a digest")]
    TagAndDigest { reference: String },
}

/// A fully qualified container image reference.
///
/// At most one of tag and digest is set. When neither is, the reference
/// implicitly means the registry's default tag; call
/// [`with_default_tag`](Self::with_default_tag) to make that explicit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageReference {
    registry: String,
    repository: String,
    tag: Option<String>,
    digest: Option<String>,
}

/// The `name[:tag][@digest]` split of a raw reference, before registry handling.
struct Components<'a> {
    name: &'a str,
    tag: Option<&'a str>,
    digest: Option<&'a str>,
}

fn split_components(raw: &str) -> Result<Components<'_>, ParseError> {
    let (name, digest) = match raw.rsplit_once('@') {
        Some((name, digest)) => {
            if !DIGEST_RE.is_match(digest) {
                return Err(ParseError::InvalidDigest {
                    digest: digest.to_string(),
                });
            }
            (name, Some(digest))
        }
        None => (raw, None),
    };

    // A colon before the last slash belongs to a registry host:port.
    let last_slash = name.rfind('/');
    let (name, tag) = match name.rfind(':') {
        Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
            let tag = &name[colon + 1..];
            if !TAG_RE.is_match(tag) {
                return Err(ParseError::InvalidTag {
                    tag: tag.to_string(),
                });
            }
            (&name[..colon], Some(tag))
        }
        _ => (name, None),
    };

    Ok(Components { name, tag, digest })
}

/// True when the first `/` segment of `name` is a registry host.
///
/// A segment is a host when it contains `.` or `:`, or is `localhost`.
pub fn has_registry_prefix(name: &str) -> bool {
    match name.split_once('/') {
        Some((first, _)) => looks_like_host(first),
        None => false,
    }
}

/// True when a single path segment looks like a registry host.
pub fn looks_like_host(segment: &str) -> bool {
    segment.contains('.') || segment.contains(':') || segment.eq_ignore_ascii_case("localhost")
}

/// Normalize a registry host for comparison and output.
///
/// Lower-cases, strips an `http(s)://` scheme and trailing slashes, and
/// collapses `index.docker.io` onto `docker.io`. Ports are kept.
pub fn normalize_registry(registry: &str) -> String {
    let trimmed = registry.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let host = without_scheme.trim_end_matches('/').to_ascii_lowercase();
    if host == LEGACY_DEFAULT_REGISTRY {
        DEFAULT_REGISTRY.to_string()
    } else {
        host
    }
}

/// Turn a registry host into a single repository path component.
///
/// `docker.io` becomes `docker-io`, `localhost:5000` becomes `localhost-5000`.
pub fn sanitize_registry_for_path(registry: &str) -> String {
    registry.replace(['.', ':'], "-")
}

impl ImageReference {
    /// Parse a string reference.
    ///
    /// No default tag is filled in; see [`with_default_tag`](Self::with_default_tag).
    ///
    /// # Examples
    ///
    /// ```
    /// use irr::reference::ImageReference;
    ///
    /// let reference = ImageReference::parse("nginx:1.25").unwrap();
    /// assert_eq!(reference.registry(), "docker.io");
    /// assert_eq!(reference.repository(), "library/nginx");
    /// assert_eq!(reference.tag(), Some("1.25"));
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        if raw.is_empty() {
            return Err(ParseError::Empty);
        }

        let components = split_components(raw)?;
        if components.tag.is_some() && components.digest.is_some() {
            return Err(ParseError::TagAndDigest {
                reference: raw.to_string(),
            });
        }

        let (registry, repository) = match components.name.split_once('/') {
            Some((first, rest)) if looks_like_host(first) => (Some(first), rest),
            _ => (None, components.name),
        };

        Self::build(registry, repository, components.tag, components.digest)
    }

    /// Build a reference from the fields of a structured values map.
    ///
    /// Empty fields count as absent. When `registry` is absent, the repository
    /// may carry a registry host prefix (`quay.io/org/app`); a tag or digest
    /// embedded in the repository is honoured when the map has no separate
    /// `tag`/`digest` field.
    pub fn from_structured(
        registry: Option<&str>,
        repository: &str,
        tag: Option<&str>,
        digest: Option<&str>,
    ) -> Result<Self, ParseError> {
        fn present(field: Option<&str>) -> Option<&str> {
            field.map(str::trim).filter(|v| !v.is_empty())
        }

        let registry = present(registry);
        let tag = present(tag);
        let digest = present(digest);
        let repository = repository.trim();

        if repository.is_empty() {
            return Err(ParseError::InvalidRepository {
                repository: String::new(),
            });
        }
        if let Some(tag) = tag {
            if !TAG_RE.is_match(tag) {
                return Err(ParseError::InvalidTag {
                    tag: tag.to_string(),
                });
            }
        }
        if let Some(digest) = digest {
            if !DIGEST_RE.is_match(digest) {
                return Err(ParseError::InvalidDigest {
                    digest: digest.to_string(),
                });
            }
        }

        let embedded = split_components(repository)?;
        let (tag, digest) = if tag.is_some() || digest.is_some() {
            (tag, digest)
        } else {
            (embedded.tag, embedded.digest)
        };
        if tag.is_some() && digest.is_some() {
            return Err(ParseError::TagAndDigest {
                reference: repository.to_string(),
            });
        }

        let (registry, repository) = match registry {
            Some(registry) => (Some(registry), embedded.name),
            None => match embedded.name.split_once('/') {
                Some((first, rest)) if looks_like_host(first) => (Some(first), rest),
                _ => (None, embedded.name),
            },
        };

        Self::build(registry, repository, tag, digest)
    }

    fn build(
        registry: Option<&str>,
        repository: &str,
        tag: Option<&str>,
        digest: Option<&str>,
    ) -> Result<Self, ParseError> {
        let registry = normalize_registry(registry.unwrap_or(DEFAULT_REGISTRY));
        if !REGISTRY_RE.is_match(&registry) {
            return Err(ParseError::InvalidRegistry { registry });
        }

        if !REPOSITORY_RE.is_match(repository) {
            return Err(ParseError::InvalidRepository {
                repository: repository.to_string(),
            });
        }

        let repository = if registry == DEFAULT_REGISTRY && !repository.contains('/') {
            format!("{}/{}", DEFAULT_NAMESPACE, repository)
        } else {
            repository.to_string()
        };

        Ok(Self {
            registry,
            repository,
            tag: tag.map(str::to_string),
            digest: digest.map(str::to_string),
        })
    }

    /// Fill in the `latest` tag when neither tag nor digest is set.
    pub fn with_default_tag(mut self) -> Self {
        if self.tag.is_none() && self.digest.is_none() {
            self.tag = Some(DEFAULT_TAG.to_string());
        }
        self
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// The `:tag` or `@digest` suffix, or an empty string.
    pub fn identifier_suffix(&self) -> String {
        match (&self.tag, &self.digest) {
            (_, Some(digest)) => format!("@{}", digest),
            (Some(tag), None) => format!(":{}", tag),
            (None, None) => String::new(),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}{}",
            self.registry,
            self.repository,
            self.identifier_suffix()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn test_canonical_docker_hub_forms() {
        for raw in [
            "nginx:1.25",
            "library/nginx:1.25",
            "docker.io/library/nginx:1.25",
            "index.docker.io/library/nginx:1.25",
            "docker.io/nginx:1.25",
        ] {
            let reference = ImageReference::parse(raw).unwrap();
            assert_eq!(reference.registry(), "docker.io", "{}", raw);
            assert_eq!(reference.repository(), "library/nginx", "{}", raw);
            assert_eq!(reference.tag(), Some("1.25"), "{}", raw);
        }
    }

    #[test]
    fn test_untagged_reference_has_no_tag_until_defaulted() {
        let reference = ImageReference::parse("nginx").unwrap();
        assert_eq!(reference.tag(), None);
        assert_eq!(reference.digest(), None);

        let defaulted = reference.with_default_tag();
        assert_eq!(defaulted.tag(), Some("latest"));
        assert_eq!(defaulted.to_string(), "docker.io/library/nginx:latest");
    }

    #[test]
    fn test_digest_reference() {
        let raw = format!("quay.io/org/app@{}", DIGEST);
        let reference = ImageReference::parse(&raw).unwrap();
        assert_eq!(reference.registry(), "quay.io");
        assert_eq!(reference.repository(), "org/app");
        assert_eq!(reference.digest(), Some(DIGEST));
        assert_eq!(reference.tag(), None);
        assert_eq!(reference.to_string(), raw);
    }

    #[test]
    fn test_registry_with_port() {
        let reference = ImageReference::parse("localhost:5000/team/api:2.0").unwrap();
        assert_eq!(reference.registry(), "localhost:5000");
        assert_eq!(reference.repository(), "team/api");
        assert_eq!(reference.tag(), Some("2.0"));

        let untagged = ImageReference::parse("registry.example.com:8443/app").unwrap();
        assert_eq!(untagged.registry(), "registry.example.com:8443");
        assert_eq!(untagged.tag(), None);
    }

    #[test]
    fn test_registry_is_lowercased_and_not_namespaced() {
        let reference = ImageReference::parse("Quay.IO/app:v1").unwrap();
        assert_eq!(reference.registry(), "quay.io");
        assert_eq!(reference.repository(), "app");
    }

    #[test]
    fn test_parse_errors_carry_offending_part() {
        assert_eq!(ImageReference::parse(""), Err(ParseError::Empty));
        assert_eq!(
            ImageReference::parse("app@sha256:abc"),
            Err(ParseError::InvalidDigest {
                digest: "sha256:abc".to_string()
            })
        );
        assert_eq!(
            ImageReference::parse("app:-bad"),
            Err(ParseError::InvalidTag {
                tag: "-bad".to_string()
            })
        );
        assert_eq!(
            ImageReference::parse("Org/App:v1"),
            Err(ParseError::InvalidRepository {
                repository: "Org/App".to_string()
            })
        );
        assert!(matches!(
            ImageReference::parse(&format!("app:v1@{}", DIGEST)),
            Err(ParseError::TagAndDigest { .. })
        ));
        assert!(matches!(
            ImageReference::parse("bad_host.io:x/app"),
            Err(ParseError::InvalidRegistry { .. })
        ));
    }

    #[test]
    fn test_from_structured_splits_host_from_repository() {
        let reference =
            ImageReference::from_structured(None, "quay.io/org/app", Some("v1"), None).unwrap();
        assert_eq!(reference.registry(), "quay.io");
        assert_eq!(reference.repository(), "org/app");
        assert_eq!(reference.tag(), Some("v1"));
    }

    #[test]
    fn test_from_structured_never_defaults_tag() {
        let reference =
            ImageReference::from_structured(Some("docker.io"), "bitnami/redis", None, Some(""))
                .unwrap();
        assert_eq!(reference.tag(), None);
        assert_eq!(reference.digest(), None);
    }

    #[test]
    fn test_from_structured_explicit_registry_without_dots() {
        let reference =
            ImageReference::from_structured(Some("myregistry"), "team/app", Some("1.0"), None)
                .unwrap();
        assert_eq!(reference.registry(), "myregistry");
        assert_eq!(reference.repository(), "team/app");
    }

    #[test]
    fn test_from_structured_embedded_tag() {
        let reference = ImageReference::from_structured(None, "nginx:1.25", None, None).unwrap();
        assert_eq!(reference.repository(), "library/nginx");
        assert_eq!(reference.tag(), Some("1.25"));
    }

    #[test]
    fn test_from_structured_rejects_tag_and_digest() {
        let err =
            ImageReference::from_structured(None, "org/app", Some("v1"), Some(DIGEST)).unwrap_err();
        assert!(matches!(err, ParseError::TagAndDigest { .. }));
    }

    #[test]
    fn test_from_structured_rejects_empty_repository() {
        assert!(matches!(
            ImageReference::from_structured(Some("quay.io"), "  ", Some("v1"), None),
            Err(ParseError::InvalidRepository { .. })
        ));
    }

    #[test]
    fn test_registry_helpers() {
        assert_eq!(normalize_registry("Index.Docker.IO"), "docker.io");
        assert_eq!(normalize_registry("https://ghcr.io/"), "ghcr.io");
        assert_eq!(sanitize_registry_for_path("docker.io"), "docker-io");
        assert_eq!(sanitize_registry_for_path("localhost:5000"), "localhost-5000");
        assert!(has_registry_prefix("quay.io/org/app"));
        assert!(has_registry_prefix("localhost/app"));
        assert!(!has_registry_prefix("bitnami/redis"));
        assert!(!has_registry_prefix("nginx"));
    }
}
