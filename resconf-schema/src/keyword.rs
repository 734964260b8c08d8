use anyhow::{anyhow, Result};

/// A fixed table of `(keyword, code)` pairs backing a [`FieldKind::Keyword`](crate::FieldKind::Keyword) field
///
/// Several keywords may share a code; the first one listed is the canonical spelling.
#[derive(Debug)]
pub struct KeywordTable {
    /// What the keywords name, for error messages
    pub what: &'static str,
    pub entries: &'static [(&'static str, u32)],
}

impl KeywordTable {
    pub fn lookup(&self, word: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(keyword, _)| keyword.eq_ignore_ascii_case(word))
            .map(|(_, code)| *code)
    }

    pub fn parse(&self, word: &str) -> Result<u32> {
        self.lookup(word)
            .ok_or_else(|| anyhow!("Expected a {} keyword, got: {}", self.what, word))
    }

    /// The canonical spelling of a code
    pub fn name(&self, code: u32) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(keyword, _)| *keyword)
    }
}

/// Declares an enum whose variants are selected by keyword, together with its [`KeywordTable`]
///
/// ```
/// use resconf_schema::keyword_enum;
///
/// keyword_enum! {
///     /// How loudly to complain
///     pub enum Volume in VOLUMES ("volume") {
///         Quiet => ["quiet", "silent"],
///         Loud => ["loud"],
///     }
/// }
///
/// assert_eq!("SILENT".parse::<Volume>()?, Volume::Quiet);
/// assert_eq!(Volume::Quiet.to_string(), "quiet");
/// assert_eq!(VOLUMES.lookup("loud"), Some(Volume::Loud.code()));
/// # Ok::<(), anyhow::Error>(())
/// ```
#[macro_export]
macro_rules! keyword_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident in $table:ident ($what:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => [$($word:literal),+ $(,)?] ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        $vis static $table: $crate::KeywordTable = $crate::KeywordTable {
            what: $what,
            entries: &[ $( $( ($word, $name::$variant as u32), )+ )+ ],
        };

        impl $name {
            const ALL: &'static [$name] = &[ $( $name::$variant ),+ ];

            pub fn from_code(code: u32) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| *v as u32 == code)
            }

            pub fn code(self) -> u32 {
                self as u32
            }

            pub fn table() -> &'static $crate::KeywordTable {
                &$table
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::__private::anyhow::Error;

            fn from_str(word: &str) -> Result<Self, Self::Err> {
                let code = $table.parse(word)?;
                Self::from_code(code).ok_or_else(|| {
                    $crate::__private::anyhow::anyhow!("No {} for code {}", $what, code)
                })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($table.name(self.code()).unwrap_or_default())
            }
        }
    };
}

keyword_enum! {
    /// File compression algorithms
    pub enum Compression in COMPRESSION ("compression") {
        Gzip1 => ["gzip1"],
        Gzip2 => ["gzip2"],
        Gzip3 => ["gzip3"],
        Gzip4 => ["gzip4"],
        Gzip5 => ["gzip5"],
        Gzip6 => ["gzip", "gzip6"],
        Gzip7 => ["gzip7"],
        Gzip8 => ["gzip8"],
        Gzip9 => ["gzip9"],
        Lzo => ["lzo"],
        LzFast => ["lzfast"],
        Lz4 => ["lz4"],
        Lz4Hc => ["lz4hc"],
    }
}

keyword_enum! {
    /// File encryption ciphers
    pub enum Encryption in ENCRYPTION ("cipher") {
        Blowfish => ["blowfish"],
        TripleDes => ["tdes", "3des"],
        Aes128 => ["aes128"],
        Aes192 => ["aes192"],
        Aes256 => ["aes256"],
        Camellia128 => ["camellia128"],
        Camellia192 => ["camellia192"],
        Camellia256 => ["camellia256"],
        Aes128HmacSha1 => ["aes128hmacsha1"],
        Aes256HmacSha1 => ["aes256hmacsha1"],
    }
}

keyword_enum! {
    /// File content checksum algorithms
    pub enum Checksum in CHECKSUM ("signature") {
        Md5 => ["md5"],
        Sha1 => ["sha1"],
        Sha256 => ["sha256"],
        Sha512 => ["sha512"],
        Xxh128 => ["xxh128"],
    }
}

keyword_enum! {
    /// What to do when one include path shadows another
    pub enum Shadowing in SHADOWING ("shadowing") {
        None => ["none"],
        LocalWarn => ["localwarn"],
        LocalRemove => ["localremove"],
        GlobalWarn => ["globalwarn"],
        GlobalRemove => ["globalremove"],
    }
}

keyword_enum! {
    /// When a restore overwrites an existing file
    pub enum Replace in REPLACE ("replace") {
        Always => ["always"],
        IfNewer => ["ifnewer"],
        IfOlder => ["ifolder"],
        Never => ["never"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_round_trips(table: &KeywordTable) {
        for (keyword, code) in table.entries {
            let stored = table.parse(keyword).unwrap();
            assert_eq!(stored, *code);
            let canonical = table.name(stored).unwrap();
            assert_eq!(table.lookup(canonical), Some(*code), "{keyword} -> {canonical}");
        }
    }

    #[test]
    fn tables_round_trip() {
        for table in [&COMPRESSION, &ENCRYPTION, &CHECKSUM, &SHADOWING, &REPLACE] {
            assert_round_trips(table);
        }
    }

    #[test]
    fn aliases_share_a_canonical_spelling() {
        assert_eq!("gzip6".parse::<Compression>().unwrap(), Compression::Gzip6);
        assert_eq!("GZIP".parse::<Compression>().unwrap(), Compression::Gzip6);
        assert_eq!(Compression::Gzip6.to_string(), "gzip");
        assert_eq!("3des".parse::<Encryption>().unwrap().to_string(), "tdes");
    }

    #[test]
    fn unknown_keyword_names_the_table() {
        let error = "zstd".parse::<Compression>().unwrap_err();
        assert_eq!(error.to_string(), "Expected a compression keyword, got: zstd");
    }

    #[test]
    fn codes_convert_back_to_variants() {
        for checksum in Checksum::ALL {
            assert_eq!(Checksum::from_code(checksum.code()), Some(*checksum));
        }
        assert_eq!(Checksum::from_code(99), None);
    }
}
