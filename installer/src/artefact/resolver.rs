//! Resolution of versions, assets, and platform artifacts.
//!
//! A [`PlatformArtifact`] only exists when both its archive and its proof
//! of authenticity were published; an archive that cannot be verified is
//! dropped during resolution and never constructed.

use std::collections::BTreeMap;

use log::debug;

use super::error::ResolveError;
use super::naming::{ARCHIVE_SUFFIX, AssetNameGrammar, PRODUCT, PlatformKey};
use super::target::Platform;
use crate::catalog::{ReleaseAsset, ReleaseInfo};

/// One fully verifiable, platform-specific download unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformArtifact {
    /// Lower-cased operating system token.
    pub operating_system: String,
    /// Lower-cased CPU architecture token.
    pub cpu_architecture: String,
    /// The `.tar.xz` archive.
    pub archive_asset: ReleaseAsset,
    /// The proof of authenticity paired with the archive.
    pub signature_asset: ReleaseAsset,
}

/// Select the single release whose version equals `version`.
///
/// # Errors
///
/// Returns [`ResolveError::VersionNotFound`] when no release matches and
/// [`ResolveError::MultipleVersionsFound`] when more than one does.
pub fn find_release<'r>(
    releases: &'r [ReleaseInfo],
    version: &str,
) -> Result<&'r ReleaseInfo, ResolveError> {
    exactly_one(
        releases.iter().filter(|release| release.version == version),
        || ResolveError::VersionNotFound {
            version: version.to_owned(),
        },
        |count| ResolveError::MultipleVersionsFound {
            version: version.to_owned(),
            count,
        },
    )
}

/// Select the single asset named exactly `name`.
///
/// # Errors
///
/// Returns [`ResolveError::AssetNotFound`] (listing the names that do
/// exist) when no asset matches and [`ResolveError::MultipleAssetsFound`]
/// when more than one does.
pub fn asset_with_name<'a>(
    assets: &'a [ReleaseAsset],
    name: &str,
) -> Result<&'a ReleaseAsset, ResolveError> {
    exactly_one(
        assets.iter().filter(|asset| asset.name == name),
        || {
            let mut existing: Vec<&str> = assets.iter().map(|asset| asset.name.as_str()).collect();
            existing.sort_unstable();
            ResolveError::AssetNotFound {
                name: name.to_owned(),
                existing: existing.join(", "),
            }
        },
        |count| ResolveError::MultipleAssetsFound {
            name: name.to_owned(),
            count,
        },
    )
}

/// Derive the verifiable platform artifacts of one release.
///
/// Every asset is classified against the archive grammar
/// (`LLVM-<version>-<os>-<arch>.tar.xz`) and the signature grammar (the
/// same with `signature_suffix` appended). Archives and signatures are
/// keyed by lower-cased `(os, arch)`; a later asset with the same key
/// replaces an earlier one. One artifact is emitted, in key order, per key
/// present in both maps.
///
/// # Errors
///
/// Returns [`ResolveError::AmbiguousAssetClassification`] if an asset name
/// matches both grammars.
pub fn artifacts_for_version(
    version: &str,
    assets: &[ReleaseAsset],
    signature_suffix: &str,
) -> Result<Vec<PlatformArtifact>, ResolveError> {
    let archive_grammar = AssetNameGrammar::new(PRODUCT, version, ARCHIVE_SUFFIX);
    let signature_grammar = AssetNameGrammar::new(
        PRODUCT,
        version,
        &format!("{ARCHIVE_SUFFIX}{signature_suffix}"),
    );

    let mut archives: BTreeMap<PlatformKey, &ReleaseAsset> = BTreeMap::new();
    let mut signatures: BTreeMap<PlatformKey, &ReleaseAsset> = BTreeMap::new();

    for asset in assets {
        let (destination, key) = match (
            archive_grammar.parse(&asset.name),
            signature_grammar.parse(&asset.name),
        ) {
            (Some(key), None) => (&mut archives, key),
            (None, Some(key)) => (&mut signatures, key),
            (None, None) => continue,
            (Some(_), Some(_)) => {
                return Err(ResolveError::AmbiguousAssetClassification {
                    name: asset.name.clone(),
                });
            }
        };
        if let Some(replaced) = destination.insert(key, asset) {
            debug!("Asset {} replaces {} for the same platform", asset.name, replaced.name);
        }
    }

    let artifacts = archives
        .into_iter()
        .filter_map(|(key, archive)| {
            let Some(signature) = signatures.get(&key) else {
                debug!("Skipping {} because it has no signature asset", archive.name);
                return None;
            };
            Some(PlatformArtifact {
                operating_system: key.os,
                cpu_architecture: key.arch,
                archive_asset: archive.clone(),
                signature_asset: (*signature).clone(),
            })
        })
        .collect();

    Ok(artifacts)
}

/// Select the single artifact built for `platform`.
///
/// # Errors
///
/// Returns [`ResolveError::ArtifactNotFound`] when no artifact matches and
/// [`ResolveError::AmbiguousArtifact`] when more than one does.
pub fn select_for_platform(
    artifacts: &[PlatformArtifact],
    platform: &Platform,
) -> Result<PlatformArtifact, ResolveError> {
    exactly_one(
        artifacts.iter().filter(|artifact| {
            artifact.operating_system == platform.os()
                && artifact.cpu_architecture == platform.arch()
        }),
        || ResolveError::ArtifactNotFound {
            os: platform.os().to_owned(),
            arch: platform.arch().to_owned(),
        },
        |count| ResolveError::AmbiguousArtifact {
            os: platform.os().to_owned(),
            arch: platform.arch().to_owned(),
            count,
        },
    )
    .cloned()
}

/// Select the single artifact built for the running host.
///
/// # Errors
///
/// Returns [`ResolveError::UnsupportedPlatform`] if the host is not in the
/// platform table, otherwise the errors of [`select_for_platform`].
pub fn select_for_current_platform(
    artifacts: &[PlatformArtifact],
) -> Result<PlatformArtifact, ResolveError> {
    select_for_platform(artifacts, &Platform::current()?)
}

/// Apply the exactly-one policy to `candidates`.
fn exactly_one<T>(
    mut candidates: impl Iterator<Item = T>,
    none: impl FnOnce() -> ResolveError,
    many: impl FnOnce(usize) -> ResolveError,
) -> Result<T, ResolveError> {
    let Some(first) = candidates.next() else {
        return Err(none());
    };
    let extra = candidates.count();
    if extra == 0 {
        Ok(first)
    } else {
        Err(many(extra + 1))
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
