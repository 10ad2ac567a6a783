use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Stem used when the owner name yields nothing usable.
pub const DEFAULT_STEM: &str = "resume";
pub const PDF_EXTENSION: &str = "pdf";
const MAX_STEM_LEN: usize = 64;

/// Turns an owner display name into a filesystem-safe stem.
///
/// Accents are folded (`María` → `Maria`), every run of characters outside
/// `[A-Za-z0-9]` becomes one `_`, and leading/trailing `_` are trimmed.
pub fn sanitize_stem(owner_name: &str) -> String {
    let mut stem = String::with_capacity(owner_name.len());
    let mut pending_sep = false;

    for c in owner_name.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !stem.is_empty() {
                stem.push('_');
            }
            pending_sep = false;
            stem.push(c);
        } else {
            pending_sep = true;
        }
        if stem.len() >= MAX_STEM_LEN {
            break;
        }
    }

    stem.truncate(MAX_STEM_LEN);
    let stem = stem.trim_end_matches('_');
    if stem.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// `<sanitized owner name or "resume">.pdf`
pub fn export_filename(owner_name: &str) -> String {
    format!("{}.{PDF_EXTENSION}", sanitize_stem(owner_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_safe(name: &str) -> bool {
        name.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    }

    #[test]
    fn test_accented_name() {
        assert_eq!(export_filename("Ana María Ruiz"), "Ana_Maria_Ruiz.pdf");
    }

    #[test]
    fn test_empty_and_symbol_only_names_fall_back() {
        assert_eq!(export_filename(""), "resume.pdf");
        assert_eq!(export_filename("   "), "resume.pdf");
        assert_eq!(export_filename("*** /// ***"), "resume.pdf");
        assert_eq!(export_filename("李小龙"), "resume.pdf");
    }

    #[test]
    fn test_separators_collapse_and_trim() {
        assert_eq!(sanitize_stem("  Jean--Luc  O'Neil. "), "Jean_Luc_O_Neil");
        assert_eq!(sanitize_stem("../../etc/passwd"), "etc_passwd");
    }

    #[test]
    fn test_output_is_always_safe() {
        for name in ["Zoë Saldaña", "A/B\\C:D*E?F\"G<H>I|J", "Ñandú 42", "\u{0}\n\t"] {
            let file = export_filename(name);
            assert!(is_safe(&file), "{file:?} has unsafe characters");
            assert!(file.ends_with(".pdf"));
            assert!(file.len() > ".pdf".len());
        }
    }

    #[test]
    fn test_long_names_are_capped() {
        let name = "a".repeat(500);
        assert_eq!(sanitize_stem(&name).len(), MAX_STEM_LEN);
    }
}
