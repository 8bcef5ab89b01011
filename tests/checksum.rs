//! Checksum sidecar generation.

use kodegen_bundler_staging::staging::checksum::sidecar_path;
use kodegen_bundler_staging::staging::{DigestAlgorithm, calculate_digest, write_digest};

#[tokio::test]
async fn digests_match_known_vectors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("abc.txt");
    std::fs::write(&path, "abc").unwrap();

    assert_eq!(
        calculate_digest(&path, DigestAlgorithm::Md5).await.unwrap(),
        "900150983cd24fb0d6963f7d28e17f72"
    );
    assert_eq!(
        calculate_digest(&path, DigestAlgorithm::Sha1).await.unwrap(),
        "a9993e364706816aba3e25717850c26c9cd0d89d"
    );
}

#[tokio::test]
async fn sidecar_holds_only_the_hex_digest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lib-1.0.0.jar");
    // Larger than one read chunk
    std::fs::write(&path, vec![7u8; 20_000]).unwrap();

    for algorithm in [DigestAlgorithm::Md5, DigestAlgorithm::Sha1] {
        let sidecar = write_digest(&path, algorithm).await.unwrap();
        assert_eq!(
            sidecar.file_name().unwrap().to_str().unwrap(),
            format!("lib-1.0.0.jar.{}", algorithm.extension())
        );

        let contents = std::fs::read_to_string(&sidecar).unwrap();
        assert_eq!(contents, calculate_digest(&path, algorithm).await.unwrap());
        assert!(contents.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

#[tokio::test]
async fn one_byte_changes_the_digest() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("a.jar");
    let second = dir.path().join("b.jar");
    std::fs::write(&first, b"artifact-bytes-0").unwrap();
    std::fs::write(&second, b"artifact-bytes-1").unwrap();

    for algorithm in [DigestAlgorithm::Md5, DigestAlgorithm::Sha1] {
        let a = calculate_digest(&first, algorithm).await.unwrap();
        assert_eq!(a, calculate_digest(&first, algorithm).await.unwrap());
        assert_ne!(a, calculate_digest(&second, algorithm).await.unwrap());
    }
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = write_digest(&dir.path().join("absent.jar"), DigestAlgorithm::Sha1)
        .await
        .unwrap_err();
    assert!(matches!(err, kodegen_bundler_staging::StagingError::Io(_)));
}

#[test]
fn sidecar_path_keeps_original_extension() {
    assert_eq!(
        sidecar_path(std::path::Path::new("/out/lib-1.0.0.pom"), "asc"),
        std::path::PathBuf::from("/out/lib-1.0.0.pom.asc")
    );
}
