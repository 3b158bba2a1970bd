//! Location Classifier (§4.1): infers an endpoint's storage kind and whether
//! its literal path denotes a single object or a collection.

use std::path::Path;

use crate::errors::ConfigurationError;

/// The four endpoint kinds this planner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Local,
    Container,
    FileShare,
    HierarchicalNamespace,
}

impl EndpointKind {
    /// Service-specific host suffixes used when no explicit hint is given.
    /// These are the Azure Storage account suffixes the spec's "object
    /// container", "file share", and "hierarchical namespace" kinds map to.
    const CONTAINER_SUFFIX: &'static str = ".blob.core.windows.net";
    const FILE_SHARE_SUFFIX: &'static str = ".file.core.windows.net";
    const HNS_SUFFIX: &'static str = ".dfs.core.windows.net";

    pub fn parse_hint(hint: &str) -> Option<Self> {
        match hint {
            "local" => Some(Self::Local),
            "container" | "blob" => Some(Self::Container),
            "file-share" | "fileshare" => Some(Self::FileShare),
            "hierarchical-namespace" | "hns" | "adls" => Some(Self::HierarchicalNamespace),
            _ => None,
        }
    }

    fn from_host(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        if host.ends_with(Self::CONTAINER_SUFFIX) {
            Some(Self::Container)
        } else if host.ends_with(Self::FILE_SHARE_SUFFIX) {
            Some(Self::FileShare)
        } else if host.ends_with(Self::HNS_SUFFIX) {
            Some(Self::HierarchicalNamespace)
        } else {
            None
        }
    }

    pub fn is_remote(self) -> bool {
        !matches!(self, Self::Local)
    }
}

/// Probes whether a remote endpoint string denotes an existing single object
/// (as opposed to a prefix/collection). Implemented by the concrete
/// traverser/lister for each remote kind; a real implementation issues a
/// metadata (HEAD-style) request, which is the external HTTP pipeline's job,
/// not the planner's (§1).
pub trait RemoteExistenceProbe {
    fn is_single_object(&self, kind: EndpointKind, literal: &str) -> bool;
}

/// A probe that always reports "not a single object", used whenever the
/// caller has no remote backend wired up (e.g. classifying only, or a
/// destination that is known to be a collection already).
pub struct NeverSingleObject;

impl RemoteExistenceProbe for NeverSingleObject {
    fn is_single_object(&self, _kind: EndpointKind, _literal: &str) -> bool {
        false
    }
}

/// Outcome of classification: the endpoint kind plus whether the literal
/// path denotes a single object, and whether the user wrote a trailing
/// separator (used later to disambiguate a virtual directory from a
/// same-named blob, §4.4).
#[derive(Debug, Clone)]
pub struct ClassifiedLocation {
    pub kind: EndpointKind,
    pub is_single_object: bool,
    pub had_trailing_separator: bool,
    pub literal: String,
}

/// Classify an endpoint string, honoring an optional explicit hint (`--location`).
pub fn classify(
    endpoint: &str,
    explicit_hint: Option<&str>,
    probe: &dyn RemoteExistenceProbe,
) -> Result<ClassifiedLocation, ConfigurationError> {
    let had_trailing_separator = endpoint.ends_with('/') || endpoint.ends_with('\\');

    let kind = match explicit_hint.filter(|h| !h.is_empty()).and_then(EndpointKind::parse_hint) {
        Some(kind) => kind,
        None => infer_kind(endpoint).ok_or_else(|| ConfigurationError::UnknownLocation {
            endpoint: endpoint.to_string(),
        })?,
    };

    let is_single_object = match kind {
        EndpointKind::Local => {
            let path = Path::new(endpoint);
            path.symlink_metadata()
                .map(|md| !md.is_dir())
                .unwrap_or(false)
        }
        _ => probe.is_single_object(kind, endpoint),
    };

    Ok(ClassifiedLocation {
        kind,
        is_single_object,
        had_trailing_separator,
        literal: endpoint.to_string(),
    })
}

fn infer_kind(endpoint: &str) -> Option<EndpointKind> {
    if let Some((scheme, rest)) = endpoint.split_once("://") {
        if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") {
            let host = rest.split(['/', '?']).next().unwrap_or(rest);
            let host = host.rsplit_once('@').map(|(_, h)| h).unwrap_or(host);
            return EndpointKind::from_host(host);
        }
        return None;
    }
    Some(EndpointKind::Local)
}
