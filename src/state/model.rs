use serde::Deserialize;

/// Tool family currently active in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    #[default]
    Crop,
    Effects,
    #[serde(alias = "ai")]
    AiTools,
}

impl EditMode {
    pub const ALL: [EditMode; 3] = [Self::Crop, Self::Effects, Self::AiTools];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Effects => "effects",
            Self::AiTools => "ai tools",
        }
    }
}

impl std::fmt::Display for EditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
