use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Used when nothing printable survives sanitization.
pub const FALLBACK_NAME: &str = "video";

/// Upper bound for the name portion. Leaves room under the 1024-byte S3 key
/// limit for the folder prefix.
pub const MAX_NAME_LEN: usize = 200;

const TRUNCATED_HEAD_LEN: usize = 150;
const MAX_EXTENSION_LEN: usize = 16;

/// Turns an untrusted filename into a storage-safe key segment.
///
/// The result only contains `[A-Za-z0-9._-]`, is never empty and keeps the
/// (lower-cased) extension. Accents are folded to their base letter, so
/// `"meu vídeo ção.ts"` becomes `"meu_video_cao.ts"`.
pub fn sanitize_filename(filename: &str) -> String {
    let (name, extension) = split_extension(filename);
    let extension = extension.map(clean_extension).filter(|ext| !ext.is_empty());

    // Without a usable extension any dot left in the name would be read as
    // one on the next pass.
    let name = match extension {
        Some(_) => clean_segment(name),
        None => clean_segment(&name.replace('.', "_")),
    };
    let name = if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        truncate_name(name)
    };

    match extension {
        Some(ext) => format!("{}.{}", name, ext),
        None => name,
    }
}

/// Sanitizes every segment of a folder path, dropping empty, `.` and `..`
/// segments. Both `/` and `\` are accepted as separators.
pub fn sanitize_folder_path(folder_path: &str) -> String {
    folder_path
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .map(clean_segment)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Splits at the last dot. A leading or trailing dot is not an extension separator.
fn split_extension(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < filename.len() => {
            (&filename[..idx], Some(&filename[idx + 1..]))
        }
        _ => (filename, None),
    }
}

fn fold_accents(input: &str) -> impl Iterator<Item = char> + '_ {
    input.nfd().filter(|c| !is_combining_mark(*c))
}

fn clean_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in fold_accents(segment) {
        let c = if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches(|c| c == '_' || c == '.').to_string()
}

fn clean_extension(extension: &str) -> String {
    fold_accents(extension)
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_EXTENSION_LEN)
        .collect()
}

/// Keeps a readable head and tail of over-long names.
fn truncate_name(name: String) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    // clean_segment only emits ASCII, byte slicing is safe.
    let tail_len = MAX_NAME_LEN - TRUNCATED_HEAD_LEN - 1;
    let head = &name[..TRUNCATED_HEAD_LEN];
    let tail = &name[name.len() - tail_len..];
    clean_segment(&format!("{}_{}", head, tail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn is_safe(s: &str) -> bool {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
    }

    #[test]
    fn folds_accents_and_spaces() {
        assert_eq!(sanitize_filename("meu vídeo ção.ts"), "meu_video_cao.ts");
        assert_eq!(sanitize_filename("Relatório Final.PDF"), "Relatorio_Final.pdf");
    }

    #[test]
    fn strips_emoji_and_punctuation() {
        assert_eq!(sanitize_filename("🎬 party!!! (final).MOV"), "party_final.mov");
        assert_eq!(sanitize_filename("a<>b:c\"d|e?.mkv"), "a_b_c_d_e.mkv");
    }

    #[test]
    fn falls_back_when_nothing_survives() {
        assert_eq!(sanitize_filename(""), FALLBACK_NAME);
        assert_eq!(sanitize_filename("🎉🎉🎉"), FALLBACK_NAME);
        assert_eq!(sanitize_filename("..."), FALLBACK_NAME);
        assert_eq!(sanitize_filename("???.mp4"), "video.mp4");
    }

    #[test]
    fn leading_dot_is_not_an_extension() {
        assert_eq!(sanitize_filename(".bashrc"), "bashrc");
        assert_eq!(sanitize_filename("archive.tar.gz"), "archive.tar.gz");
    }

    #[test]
    fn unusable_extension_is_dropped() {
        assert_eq!(sanitize_filename("notes.日本"), "notes");
        assert_eq!(sanitize_filename("A.B.日"), "A_B");
    }

    #[test]
    fn long_names_keep_head_and_tail() {
        let long = format!("{}{}.mp4", "a".repeat(300), "END");
        let out = sanitize_filename(&long);
        let (name, ext) = out.rsplit_once('.').unwrap();
        assert_eq!(ext, "mp4");
        assert!(name.len() <= MAX_NAME_LEN);
        assert!(name.starts_with("aaaa"));
        assert!(name.ends_with("END"));
    }

    #[test]
    fn folder_path_drops_traversal() {
        assert_eq!(sanitize_folder_path("../Férias 2024/./fotos\\"), "Ferias_2024/fotos");
        assert_eq!(sanitize_folder_path(""), "");
        assert_eq!(sanitize_folder_path("/../.."), "");
    }

    proptest! {
        #[test]
        fn output_is_always_safe(input in any::<String>()) {
            prop_assert!(is_safe(&sanitize_filename(&input)));
        }

        #[test]
        fn sanitizing_twice_changes_nothing(input in any::<String>()) {
            let once = sanitize_filename(&input);
            prop_assert_eq!(sanitize_filename(&once), once);
        }

        #[test]
        fn name_portion_is_bounded(input in "\\PC{0,600}") {
            let out = sanitize_filename(&input);
            let name = out.rsplit_once('.').map(|(n, _)| n).unwrap_or(&out);
            prop_assert!(name.len() <= MAX_NAME_LEN);
        }
    }
}
