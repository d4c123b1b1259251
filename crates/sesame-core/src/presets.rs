//! Password templates consumed by the password-synthesis component
//!
//! This is data only. Each template character names a character class; a
//! preset lists the templates that describe one password policy. Turning a
//! template plus KGK-derived bytes into a password happens elsewhere.

/// Template character → the characters it may expand to.
pub const TEMPLATE_CHARACTERS: &[(char, &str)] = &[
    ('V', "AEIOUY"),
    ('v', "aeiuoy"),
    ('C', "BCDFGHJKLMNPQRSTVWXZ"),
    ('c', "bcdfghjklmnpqrstvwxz"),
    ('A', "ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
    // Upper-case 'J' is part of the deployed data; derived passwords depend on it.
    ('a', "abcdefghiJklmnopqrstuvwxyz"),
    ('n', "0123456789"),
    ('o', "@&%?,=[]_:-+*$#!'^~;()/."),
    (
        'x',
        "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789@&%?,=[]_:-+*$#!'^~;()/.",
    ),
];

/// A named password policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub templates: &'static [&'static str],
    /// Whether the synthesis component may pick pseudo-randomly among
    /// equivalent templates.
    pub randomizable: bool,
}

impl Preset {
    /// Length of the passwords this preset produces.
    pub fn password_len(&self) -> usize {
        self.templates.first().map_or(0, |t| t.chars().count())
    }
}

const EASY_18: &[&str] = &[
    "CvcvnoCvcvCvcvCvcv", "CvcvCvcvnoCvcvcvno", "CvcvCvcvCvcvnocvCv", "CvccnoCvcvCvcvCvcv",
    "CvccCvcvnoCvcvcvno", "CvccCvcvCvcvnocvCv", "CvcvnoCvccCvcvCvcc", "CvcvCvccnoCvcvccno",
    "CvcvCvccCvcvnoccCv", "CvcvnoCvcvCvccCvcv", "CvcvCvcvnoCvcccvno", "CvcvCvcvCvccnocvCv",
    "CvccnoCvccCvcvCvcc", "CvccCvccnoCvcvccno", "CvccCvccCvcvnoccCv", "CvcvnoCvccCvccCvcc",
    "CvcvCvccnoCvccccno", "CvcvCvccCvccnoccCv", "CvccnoCvcvCvccCvcv", "CvccCvcvnoCvcccvno",
    "CvccCvcvCvccnocvCv", "CVVVCvvvnnnnCvcvvo", "ocvvcvvvCvCvCvvvCv", "cvcvnoCvcvcvcvCvcv",
    "cvcvCvcvnocvcvcvno", "cvcvCvcvCvcvnocvCv", "cvccnoCvcvcvcvCvcv", "cvccCvcvnocvcvcvno",
    "cvccCvcvCvcvnocvCv", "cvcvnoCvcccvcvCvcc", "cvcvCvccnocvcvccno", "cvcvCvccCvcvnoccCv",
    "cvcvnoCvcvcvccCvcv", "cvcvCvcvnocvcccvno", "cvcvCvcvCvccnocvCv", "cvccnoCvcccvcvCvcc",
    "cvccCvccnocvcvccno", "cvccCvccCvcvnoccCv", "cvcvnoCvcccvccCvcc", "cvcvCvccnocvccccno",
    "cvcvCvccCvccnoccCv", "cvccnoCvcvcvccCvcv", "cvccCvcvnocvcccvno", "cvccCvcvCvccnocvCv",
    "cVVVCvvvnnnnCvcvvo",
];

const EASY_12: &[&str] = &[
    "CvcvnoCvcvcv", "CvcvCvCvcvno", "CvcvCvcvnoCv", "CvccnoCvcvcv", "CvccCvCvcvno",
    "CvccCvcvnoCv", "CvcvnoCvcvcc", "CvcvCvCvcvno", "CvcvCvcvnoCv", "CvcvnoCvcccv",
    "CvcvCvCvccno", "CvcvCvccnoCv", "CvccnoCvcvcc", "CvccCvCvcvno", "CvccCvcvnoCv",
    "CvcvnoCvcccc", "CvcvCvCvccno", "CvcvCvccnoCv", "CvccnoCvcccv", "CvccCvCvccno",
    "CvccCvccnoCv", "CVVVCvnnCvvo", "ocvvcvCvCvCv",
];

const EASY_8: &[&str] = &[
    "noCvcvcv", "CvCvcvno", "CvcvnoCv", "noCvcvcv", "CvCvcvno", "CvcvnoCv", "noCvcvcc",
    "CvCvcvno", "CvcvnoCv", "noCvcccv", "CvCvccno", "CvccnoCv", "noCvcvcc", "CvCvcvno",
    "CvcvnoCv", "noCvcccc", "CvCvccno", "CvccnoCv", "noCvcccv", "CvCvccno", "CvccnoCv",
    "CvnnCvvo", "cvCvvvCn",
];

/// All presets, strongest first.
pub const PRESETS: &[Preset] = &[
    // The template is 36 characters despite the name; kept as deployed.
    Preset {
        name: "Extreme security (32 chars)",
        templates: &["Aanoxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx"],
        randomizable: true,
    },
    Preset {
        name: "Very high security (24 chars)",
        templates: &["Aanoxxxxxxxxxxxxxxxxxxxx"],
        randomizable: true,
    },
    Preset {
        name: "High security (18 chars)",
        templates: &["Aanoxxxxxxxxxxxxxx"],
        randomizable: true,
    },
    Preset {
        name: "Medium security (12 chars)",
        templates: &["Aanoxxxxxxxx"],
        randomizable: true,
    },
    Preset {
        name: "Low security (6 chars)",
        templates: &["Aanoxx"],
        randomizable: true,
    },
    Preset {
        name: "High security (18 chars, easy to type)",
        templates: EASY_18,
        randomizable: false,
    },
    Preset {
        name: "Medium security (12 chars, easy to type)",
        templates: EASY_12,
        randomizable: false,
    },
    Preset {
        name: "Basic security (8 chars, easy to type)",
        templates: EASY_8,
        randomizable: false,
    },
    Preset {
        name: "4-digit PIN",
        templates: &["nnnn"],
        randomizable: false,
    },
    Preset {
        name: "5-digit PIN",
        templates: &["nnnnn"],
        randomizable: false,
    },
];

/// Character class for a template character.
pub fn charset_for(ch: char) -> Option<&'static str> {
    TEMPLATE_CHARACTERS
        .iter()
        .find(|(c, _)| *c == ch)
        .map(|(_, set)| *set)
}

/// Look up a preset by its display name.
pub fn preset_for(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_lookup() {
        assert_eq!(charset_for('n'), Some("0123456789"));
        assert_eq!(charset_for('V'), Some("AEIOUY"));
        assert_eq!(charset_for('?'), None);
    }

    #[test]
    fn test_full_set_is_union_of_classes() {
        let full = charset_for('x').unwrap();
        for class in ['A', 'a', 'n', 'o'] {
            for ch in charset_for(class).unwrap().chars() {
                assert!(full.contains(ch), "'{ch}' from class '{class}' missing in 'x'");
            }
        }
    }

    #[test]
    fn test_every_template_char_is_known() {
        for preset in PRESETS {
            for template in preset.templates {
                for ch in template.chars() {
                    assert!(
                        charset_for(ch).is_some(),
                        "unknown template char '{ch}' in preset {}",
                        preset.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_templates_within_preset_share_length() {
        for preset in PRESETS {
            let len = preset.password_len();
            assert!(
                preset.templates.iter().all(|t| t.chars().count() == len),
                "preset {} mixes template lengths",
                preset.name
            );
        }
    }

    #[test]
    fn test_deployed_data_is_pinned() {
        assert_eq!(charset_for('a'), Some("abcdefghiJklmnopqrstuvwxyz"));

        let extreme = preset_for("Extreme security (32 chars)").unwrap();
        assert_eq!(extreme.templates, &["Aanoxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx"]);
        assert_eq!(extreme.password_len(), 36);
        assert!(extreme.randomizable);

        assert_eq!(preset_for("Very high security (24 chars)").unwrap().templates, &["Aanoxxxxxxxxxxxxxxxxxxxx"]);
        assert_eq!(preset_for("Low security (6 chars)").unwrap().templates, &["Aanoxx"]);
        assert_eq!(preset_for("4-digit PIN").unwrap().templates, &["nnnn"]);

        let easy = preset_for("High security (18 chars, easy to type)").unwrap();
        assert_eq!(easy.templates.len(), 45);
        assert_eq!(easy.templates[0], "CvcvnoCvcvCvcvCvcv");
        assert_eq!(easy.templates[44], "cVVVCvvvnnnnCvcvvo");
        assert!(!easy.randomizable);

        assert_eq!(preset_for("Medium security (12 chars, easy to type)").unwrap().templates.len(), 23);
        assert_eq!(preset_for("Basic security (8 chars, easy to type)").unwrap().password_len(), 8);
        assert!(preset_for("No such preset").is_none());
    }

    #[test]
    fn test_preset_names_unique() {
        let mut names: Vec<_> = PRESETS.iter().map(|p| p.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), PRESETS.len());
    }
}
