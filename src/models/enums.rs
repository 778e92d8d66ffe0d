use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// Repertory abbreviations as they appear in the OOREP `abbrev` columns.
str_enum!(RepertoryType {
    Kent => "kent",
    Bbcr => "bbcr",
    Boericke => "boericke",
    Synthesis => "synthesis",
    Publicum => "publicum",
});

str_enum!(RemedyCategory {
    Plant => "Plant Kingdom",
    Mineral => "Mineral Kingdom",
    Animal => "Animal Kingdom",
    Nosode => "Nosode",
    Sarcode => "Sarcode",
    Imponderabilia => "Imponderabilia",
    Unknown => "Unknown",
});

impl RemedyCategory {
    /// Map a lowercase kingdom token (`plant`, `mineral`, ...) to its display category.
    pub fn from_kingdom_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "plant" => Self::Plant,
            "mineral" => Self::Mineral,
            "animal" => Self::Animal,
            "nosode" => Self::Nosode,
            "sarcode" => Self::Sarcode,
            "imponderabilia" => Self::Imponderabilia,
            _ => Self::Unknown,
        }
    }
}
