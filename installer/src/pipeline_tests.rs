//! Unit tests for the list, download, and install operations.

use super::*;
use crate::artefact::extraction::{ExtractionError, XzTarExtractor};
use crate::download::DownloadError;
use crate::error::InstallerError;
use crate::install::InstallError;
use crate::progress::NoProgress;
use crate::test_utils::{
    ArchiveEntry, RELEASES_URL, ReleaseFixture, StubTransport, StubVerifier, StubVerifierFactory,
    asset_url, release_listing, tar_xz_bytes,
};
use crate::verification::BUNDLE_SUFFIX;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const VERSION: &str = "18.1.8";
const ARCHIVE: &str = "LLVM-18.1.8-Linux-X64.tar.xz";
const BUNDLE: &str = "LLVM-18.1.8-Linux-X64.tar.xz.jsonl";
const BINARY: &[u8] = b"\x7fELF clang-format 18.1.8";

struct Fixture {
    transport: StubTransport,
    verifiers: StubVerifierFactory,
    platform: Platform,
    scratch: ScratchSpace,
    dir: TempDir,
}

impl Fixture {
    fn new(verifier: StubVerifier) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        Self {
            transport: StubTransport::new(),
            verifiers: StubVerifierFactory::new(BUNDLE_SUFFIX, verifier),
            platform: Platform::from_host("linux", "x86_64").expect("supported"),
            scratch: ScratchSpace::Persistent(dir.path().join("scratch")),
            dir,
        }
    }

    fn publish(&mut self, releases: &[ReleaseFixture]) {
        self.transport.serve(RELEASES_URL, release_listing(releases));
    }

    /// Publish `VERSION` with an archive built from `entries` and its bundle.
    fn publish_archive(&mut self, entries: &[ArchiveEntry]) -> u64 {
        let archive = tar_xz_bytes(entries).expect("archive");
        let size = archive.len() as u64;
        self.transport.serve(asset_url(ARCHIVE), archive);
        self.transport.serve(asset_url(BUNDLE), b"{\"bundle\":true}".to_vec());
        self.publish(&[ReleaseFixture::new(VERSION)
            .asset(ARCHIVE, size)
            .asset(BUNDLE, 15)]);
        size
    }

    fn context(&self) -> PipelineContext<'_> {
        PipelineContext {
            transport: &self.transport,
            releases_url: RELEASES_URL,
            verifiers: &self.verifiers,
            extractor: &XzTarExtractor,
            platform: &self.platform,
            scratch: &self.scratch,
            progress: &NoProgress,
        }
    }

    fn utf8(&self, name: &str) -> Utf8PathBuf {
        Utf8PathBuf::try_from(self.dir.path().join(name)).expect("utf-8 temp dir")
    }
}

fn release_archive() -> Vec<ArchiveEntry> {
    vec![
        ArchiveEntry::dir("LLVM-18.1.8-Linux-X64/bin"),
        ArchiveEntry::file("LLVM-18.1.8-Linux-X64/bin/clang", b"clang"),
        ArchiveEntry::file("LLVM-18.1.8-Linux-X64/bin/clang-format", BINARY),
    ]
}

#[fixture]
fn published() -> Fixture {
    let mut fixture = Fixture::new(StubVerifier::accepting());
    fixture.publish_archive(&release_archive());
    fixture
}

#[rstest]
fn list_all_reports_versions_with_a_verifiable_artifact() {
    let mut fixture = Fixture::new(StubVerifier::accepting());
    fixture.publish(&[
        ReleaseFixture::new("18.1.8").asset(ARCHIVE, 10).asset(BUNDLE, 1),
        ReleaseFixture::new("18.1.7").asset("LLVM-18.1.7-Linux-X64.tar.xz", 10),
        ReleaseFixture::new("18.1.6")
            .asset("LLVM-18.1.6-macOS-ARM64.tar.xz", 10)
            .asset("LLVM-18.1.6-macOS-ARM64.tar.xz.jsonl", 1),
        ReleaseFixture::new("17.0.6"),
        ReleaseFixture::new("17.0.5")
            .asset("LLVM-17.0.5-Linux-X64.tar.xz", 10)
            .asset("LLVM-17.0.5-Linux-X64.tar.xz.jsonl", 1),
    ]);

    let versions = list_all(&fixture.context()).expect("list");
    assert_eq!(versions, vec!["18.1.8", "17.0.5"]);
}

#[rstest]
fn download_extracts_binary_into_download_dir(published: Fixture) {
    let download_dir = published.utf8("download");

    let report = download(&published.context(), VERSION, &download_dir, StopAfter::Extract)
        .expect("download");

    let binary = download_dir.join("clang-format");
    assert_eq!(report, DownloadReport::Extracted { binary: binary.clone() });
    assert_eq!(std::fs::read(&binary).expect("read"), BINARY);
    assert_eq!(published.transport.request_count(&asset_url(ARCHIVE)), 1);
    assert_eq!(published.transport.request_count(&asset_url(BUNDLE)), 1);
    assert_eq!(published.verifiers.verifier().calls(), 1);
    assert_eq!(published.verifiers.versions(), vec![VERSION]);
}

#[rstest]
fn download_then_install_places_binary_in_bin(published: Fixture) {
    let download_dir = published.utf8("download");
    let install_dir = published.utf8("install");

    download(&published.context(), VERSION, &download_dir, StopAfter::Extract)
        .expect("download");
    let installed = install(VERSION, &download_dir, &install_dir).expect("install");

    assert_eq!(installed, install_dir.join("bin/clang-format"));
    assert_eq!(std::fs::read(&installed).expect("read"), BINARY);
}

#[rstest]
fn stop_after_verify_leaves_download_dir_untouched(published: Fixture) {
    let download_dir = published.utf8("download");

    let report = download(&published.context(), VERSION, &download_dir, StopAfter::Verify)
        .expect("download");

    assert_eq!(
        report,
        DownloadReport::Verified {
            version: VERSION.to_owned()
        }
    );
    assert!(published.dir.path().join("scratch/v18_1_8").join(ARCHIVE).is_file());
    assert!(!download_dir.exists());
}

#[rstest]
fn stop_after_verify_with_ephemeral_scratch_reports_version(mut published: Fixture) {
    published.scratch = ScratchSpace::Ephemeral;
    let download_dir = published.utf8("download");

    let report = download(&published.context(), VERSION, &download_dir, StopAfter::Verify)
        .expect("download");

    assert_eq!(
        report,
        DownloadReport::Verified {
            version: VERSION.to_owned()
        }
    );
    assert_eq!(published.verifiers.verifier().calls(), 1);
}

#[rstest]
fn second_download_reuses_verified_archive(published: Fixture) {
    let download_dir = published.utf8("download");

    for _ in 0..2 {
        download(&published.context(), VERSION, &download_dir, StopAfter::Extract)
            .expect("download");
    }

    assert_eq!(published.transport.request_count(&asset_url(ARCHIVE)), 1);
    assert_eq!(published.transport.request_count(&asset_url(BUNDLE)), 2);
    assert_eq!(published.verifiers.verifier().calls(), 2);

    let mut kept: Vec<_> = std::fs::read_dir(published.dir.path().join("scratch/v18_1_8"))
        .expect("scratch dir")
        .map(|entry| entry.expect("entry").file_name())
        .collect();
    kept.sort();
    assert_eq!(kept, [ARCHIVE, BUNDLE, "clang_format_bin"]);
}

#[rstest]
fn rejected_cache_is_downloaded_again() {
    let mut fixture = Fixture::new(StubVerifier::scripted([true, false, true]));
    fixture.publish_archive(&release_archive());
    let download_dir = fixture.utf8("download");

    for _ in 0..2 {
        download(&fixture.context(), VERSION, &download_dir, StopAfter::Extract)
            .expect("download");
    }

    assert_eq!(fixture.transport.request_count(&asset_url(ARCHIVE)), 2);
    assert_eq!(fixture.verifiers.verifier().calls(), 3);
}

#[rstest]
fn missing_signature_asset_means_no_artifact() {
    let mut fixture = Fixture::new(StubVerifier::accepting());
    fixture.publish(&[ReleaseFixture::new(VERSION).asset(ARCHIVE, 1000)]);

    let result = download(
        &fixture.context(),
        VERSION,
        &fixture.utf8("download"),
        StopAfter::Extract,
    );
    assert!(
        matches!(
            result,
            Err(InstallerError::Resolve(ResolveError::ArtifactNotFound { .. }))
        ),
        "got {result:?}"
    );
    assert_eq!(fixture.transport.request_count(&asset_url(ARCHIVE)), 0);
}

#[rstest]
fn unknown_version_is_reported(published: Fixture) {
    let result = download(
        &published.context(),
        "99.9.9",
        &published.utf8("download"),
        StopAfter::Extract,
    );
    assert!(
        matches!(
            result,
            Err(InstallerError::Resolve(ResolveError::VersionNotFound { ref version }))
                if version == "99.9.9"
        ),
        "got {result:?}"
    );
}

#[rstest]
fn archive_without_binary_fails_extraction() {
    let mut fixture = Fixture::new(StubVerifier::accepting());
    fixture.publish_archive(&[ArchiveEntry::file("LLVM-18.1.8-Linux-X64/bin/clang", b"clang")]);

    let result = download(
        &fixture.context(),
        VERSION,
        &fixture.utf8("download"),
        StopAfter::Extract,
    );
    assert!(
        matches!(
            result,
            Err(InstallerError::Extraction(ExtractionError::FileNotFoundInArchive { .. }))
        ),
        "got {result:?}"
    );
}

#[rstest]
fn rejected_fresh_download_is_fatal() {
    let mut fixture = Fixture::new(StubVerifier::scripted([false]));
    fixture.publish_archive(&release_archive());

    let result = download(
        &fixture.context(),
        VERSION,
        &fixture.utf8("download"),
        StopAfter::Extract,
    );
    assert!(
        matches!(&result, Err(InstallerError::Download(err)) if err.is_signature_rejection()),
        "got {result:?}"
    );
    assert_eq!(fixture.transport.request_count(&asset_url(ARCHIVE)), 1);
}

#[rstest]
fn oversized_archive_is_rejected() {
    let mut fixture = Fixture::new(StubVerifier::accepting());
    let size = fixture.publish_archive(&release_archive());
    fixture.publish(&[ReleaseFixture::new(VERSION)
        .asset(ARCHIVE, size - 1)
        .asset(BUNDLE, 15)]);

    let result = download(
        &fixture.context(),
        VERSION,
        &fixture.utf8("download"),
        StopAfter::Extract,
    );
    assert!(
        matches!(
            result,
            Err(InstallerError::Download(DownloadError::TooManyBytesDownloaded { .. }))
        ),
        "got {result:?}"
    );
}

#[rstest]
fn install_before_download_is_reported(published: Fixture) {
    let result = install(VERSION, &published.utf8("download"), &published.utf8("install"));
    assert!(
        matches!(
            result,
            Err(InstallerError::Install(InstallError::SourceFileMissing { .. }))
        ),
        "got {result:?}"
    );
}

#[rstest]
#[case::plain("LLVM-18.1.8-Linux-X64.tar.xz", "LLVM-18.1.8-Linux-X64.tar.xz")]
#[case::nested("dir/LLVM.tar.xz", "LLVM.tar.xz")]
#[case::parent("..", "asset")]
#[case::trailing_slash("dir/", "asset")]
fn local_file_name_keeps_last_component(#[case] name: &str, #[case] expected: &str) {
    assert_eq!(local_file_name(name), expected);
}
