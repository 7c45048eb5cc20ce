//! Unit tests for the transcoder and its decode cache

#[cfg(test)]
mod tests {
    use crate::audio::transcode::Transcoder;
    use crate::error::AudioError;
    use std::path::Path;
    use tempfile::TempDir;

    fn cache_in(dir: &TempDir) -> std::path::PathBuf {
        dir.path().join("cache")
    }

    #[test]
    fn test_artifact_path_strips_extension() {
        let dir = TempDir::new().unwrap();
        let transcoder = Transcoder::with_decoder(None, cache_in(&dir));

        let artifact = transcoder
            .artifact_path(Path::new("/media/clips/airhorn.mp3"))
            .unwrap();

        assert_eq!(artifact, cache_in(&dir).join("airhorn.pcm"));
    }

    #[test]
    fn test_artifact_path_same_stem_collides() {
        let dir = TempDir::new().unwrap();
        let transcoder = Transcoder::with_decoder(None, cache_in(&dir));

        // Base-name keying is the documented cache limitation: different
        // directories and extensions fold onto one artifact.
        let a = transcoder.artifact_path(Path::new("/a/clip.mp3")).unwrap();
        let b = transcoder.artifact_path(Path::new("/b/clip.wav")).unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_decoder() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);

        // No decoder at all; only the cache can satisfy this.
        let transcoder = Transcoder::with_decoder(None, cache.clone());

        std::fs::write(cache.join("greeting.pcm"), b"decoded bytes").unwrap();

        let artifact = transcoder
            .ensure_decoded(Path::new("/somewhere/greeting.ogg"))
            .await
            .unwrap();

        assert_eq!(artifact, cache.join("greeting.pcm"));
        assert_eq!(std::fs::read(&artifact).unwrap(), b"decoded bytes");
    }

    #[tokio::test]
    async fn test_cache_miss_without_decoder_is_configuration_missing() {
        let dir = TempDir::new().unwrap();
        let transcoder = Transcoder::with_decoder(None, cache_in(&dir));

        let result = transcoder
            .ensure_decoded(Path::new("/somewhere/unknown.ogg"))
            .await;

        assert!(matches!(result, Err(AudioError::ConfigurationMissing)));
    }

    #[tokio::test]
    async fn test_unspawnable_decoder_is_transcode_failure() {
        let dir = TempDir::new().unwrap();

        // The path exists but is a directory, so spawning it fails.
        let bogus = dir.path().join("not-a-binary");
        std::fs::create_dir(&bogus).unwrap();

        let transcoder = Transcoder::with_decoder(Some(bogus), cache_in(&dir));

        let result = transcoder.ensure_decoded(Path::new("/media/x.mp3")).await;

        match result {
            Err(AudioError::Transcode { input, .. }) => assert!(input.contains("x.mp3")),
            other => panic!("expected Transcode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_input_without_base_name_is_rejected() {
        let dir = TempDir::new().unwrap();
        let transcoder = Transcoder::with_decoder(None, cache_in(&dir));

        let result = transcoder.ensure_decoded(Path::new("/")).await;
        assert!(matches!(result, Err(AudioError::Transcode { .. })));
    }
}
