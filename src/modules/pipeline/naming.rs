use crate::config::settings::PipelineSettings;
use crate::infrastructure::storage::ObjectLocation;

/// The one output naming convention shared by dispatch and completion.
///
/// For an original `videos/<path>/<name>.<ext>`:
/// - the engine writes to `<staging>/<path>/<name><modifier>.mp4`
/// - the canonical key is `videos/<path>/<name>.mp4`
#[derive(Debug, Clone)]
pub struct OutputNaming {
    videos_prefix: String,
    staging_bucket: String,
    staging_prefix: String,
    name_modifier: String,
}

impl OutputNaming {
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            videos_prefix: settings.videos_prefix.clone(),
            staging_bucket: settings.staging_bucket.clone(),
            staging_prefix: settings.staging_prefix.clone(),
            name_modifier: settings.name_modifier.clone(),
        }
    }

    pub fn name_modifier(&self) -> &str {
        &self.name_modifier
    }

    /// Staging prefix plus the original's directory below the videos root.
    pub fn output_prefix(&self, original_key: &str) -> String {
        let (dir, _) = split_key(original_key);
        let relative = dir.strip_prefix(&self.videos_prefix).unwrap_or(dir);
        format!("{}{}", self.staging_prefix, relative)
    }

    pub fn destination_uri(&self, original_key: &str) -> String {
        format!("s3://{}/{}", self.staging_bucket, self.output_prefix(original_key))
    }

    /// Where the engine leaves its output for `original_key`.
    pub fn staged_location(&self, original_key: &str) -> ObjectLocation {
        let (_, filename) = split_key(original_key);
        let key = format!(
            "{}{}{}.mp4",
            self.output_prefix(original_key),
            file_stem(filename),
            self.name_modifier
        );
        ObjectLocation::new(&self.staging_bucket, key)
    }

    /// Final public key: same path, extension replaced by `.mp4`.
    pub fn canonical_key(&self, original_key: &str) -> String {
        let (dir, filename) = split_key(original_key);
        format!("{}{}.mp4", dir, file_stem(filename))
    }
}

/// `("videos/a/", "clip.ts")`; the directory keeps its trailing slash.
fn split_key(key: &str) -> (&str, &str) {
    match key.rfind('/') {
        Some(idx) => (&key[..=idx], &key[idx + 1..]),
        None => ("", key),
    }
}

fn file_stem(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming() -> OutputNaming {
        OutputNaming::new(&PipelineSettings::for_bucket("b"))
    }

    #[test]
    fn flat_original() {
        let naming = naming();
        assert_eq!(
            naming.staged_location("videos/meu_video_cao.ts"),
            ObjectLocation::new("b", "staging/meu_video_cao_converted.mp4")
        );
        assert_eq!(naming.canonical_key("videos/meu_video_cao.ts"), "videos/meu_video_cao.mp4");
        assert_eq!(naming.destination_uri("videos/meu_video_cao.ts"), "s3://b/staging/");
    }

    #[test]
    fn nested_paths_do_not_collide_in_staging() {
        let naming = naming();
        let a = naming.staged_location("videos/a/clip.mov");
        let b = naming.staged_location("videos/b/clip.mov");
        assert_eq!(a.key, "staging/a/clip_converted.mp4");
        assert_eq!(b.key, "staging/b/clip_converted.mp4");
        assert_eq!(naming.canonical_key("videos/a/clip.mov"), "videos/a/clip.mp4");
    }

    #[test]
    fn only_last_extension_is_replaced() {
        let naming = naming();
        assert_eq!(naming.canonical_key("videos/x/show.s01e02.mkv"), "videos/x/show.s01e02.mp4");
        assert_eq!(
            naming.staged_location("videos/x/show.s01e02.mkv").key,
            "staging/x/show.s01e02_converted.mp4"
        );
    }

    #[test]
    fn large_mp4_maps_onto_itself() {
        assert_eq!(naming().canonical_key("videos/big.mp4"), "videos/big.mp4");
    }

    #[test]
    fn separate_staging_bucket() {
        let mut settings = PipelineSettings::for_bucket("media");
        settings.staging_bucket = "scratch".to_string();
        let naming = OutputNaming::new(&settings);
        assert_eq!(
            naming.staged_location("videos/a.ts"),
            ObjectLocation::new("scratch", "staging/a_converted.mp4")
        );
        assert_eq!(naming.destination_uri("videos/a.ts"), "s3://scratch/staging/");
    }
}
