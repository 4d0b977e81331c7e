use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The wire name doubles as the serde name.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
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

str_enum!(AssetClass {
    Bond => "BOND",
    StructuredProduct => "STRUCTURED_PRODUCT",
    Equity => "EQUITY",
    Cash => "CASH",
    Other => "OTHER",
});

str_enum!(ExtractionStatus {
    Success => "success",
    Error => "error",
});

str_enum!(ExtractionMethod {
    TesseractOcr => "tesseract_ocr",
    VisionModel => "vision_model",
});

impl Default for AssetClass {
    fn default() -> Self {
        Self::Other
    }
}
