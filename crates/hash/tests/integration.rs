//! Integration tests for hash crate

#[cfg(test)]
mod tests {
    use repofetch_hash::*;
    use tempfile::tempdir;
    use tokio::fs;

    #[tokio::test]
    async fn test_published_checksum_matches_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("lib-1.0.jar");
        let data = b"verify this content";
        fs::write(&file_path, data).await.unwrap();

        let digests = DigestSet::hash_file(&file_path).await.unwrap();
        for algorithm in ChecksumAlgorithm::ALL {
            let published = format!(
                "{}  lib-1.0.jar\n",
                digests.get(algorithm).to_ascii_uppercase()
            );
            let expected = parse_checksum(&published).unwrap();
            assert_eq!(expected.len(), algorithm.hex_len());
            assert!(checksum_matches(&expected, digests.get(algorithm)));
        }
    }

    #[tokio::test]
    async fn test_changed_content_does_not_match() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("data.bin");
        fs::write(&file_path, b"original").await.unwrap();
        let before = DigestSet::hash_file(&file_path).await.unwrap();

        fs::write(&file_path, b"tampered").await.unwrap();
        let after = DigestSet::hash_file(&file_path).await.unwrap();

        assert!(!checksum_matches(
            before.get(ChecksumAlgorithm::Sha1),
            after.get(ChecksumAlgorithm::Sha1)
        ));
    }

    #[test]
    fn test_digest_set_serialization() {
        let digests = DigestSet::from_data(b"test");
        let json = serde_json::to_string(&digests).unwrap();
        let back: DigestSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digests);
    }
}
